use crate::error::{EstimateError, Result};
use crate::models::{
    CourseDemandRecord, EnrichedCourseRisk, RiskAssessment, RiskLevel, RiskSummary,
};

pub const DEFAULT_RISK_THRESHOLD: f64 = 0.45;
pub const CRITICAL_RISK: f64 = 0.70;
/// One part-time instructor carries one section.
pub const SECTIONS_PER_PT: f64 = 1.0;
/// One full-time-equivalent part-timer covers roughly four sections.
pub const SECTIONS_PER_FTE: f64 = 4.0;

const GAP_WEIGHT: f64 = 0.6;
const DIFFICULTY_WEIGHT: f64 = 0.4;

pub fn compute_risk(records: &[CourseDemandRecord], threshold: f64) -> Result<RiskAssessment> {
    // Validate the whole batch before enriching anything.
    for record in records {
        validate(record)?;
    }

    let rows: Vec<EnrichedCourseRisk> = records.iter().map(enrich).collect();
    let at_risk: Vec<EnrichedCourseRisk> = rows
        .iter()
        .filter(|row| row.risk >= threshold)
        .cloned()
        .collect();

    let total_gap: f64 = at_risk.iter().map(|row| row.gap).sum();
    let expected_gap = round1(total_gap).max(0.0);
    let fte_need = (expected_gap / SECTIONS_PER_FTE).ceil() as u32;

    let summary = RiskSummary {
        course_count: rows.len(),
        at_risk_count: at_risk.len(),
        threshold,
        expected_gap,
        fte_need,
    };

    Ok(RiskAssessment {
        rows,
        at_risk,
        summary,
    })
}

pub fn validate(record: &CourseDemandRecord) -> Result<()> {
    let id = record.course_id.as_str();

    if record.cap_per_section <= 0 {
        return Err(EstimateError::invalid(
            id,
            format!("cap_per_section must be positive, got {}", record.cap_per_section),
        ));
    }

    let counts = [
        ("sections_planned", record.sections_planned),
        ("forecast_enrollees", record.forecast_enrollees),
        ("qualified_ft_count", record.qualified_ft_count),
        ("qualified_pt_pool", record.qualified_pt_pool),
    ];
    for (field, value) in counts {
        if value < 0 {
            return Err(EstimateError::invalid(
                id,
                format!("{field} must not be negative, got {value}"),
            ));
        }
    }

    let reals = [
        ("avg_sections_per_ft", record.avg_sections_per_ft),
        ("leave_probability", record.leave_probability),
        ("historical_fill_rate", record.historical_fill_rate),
    ];
    for (field, value) in reals {
        if !value.is_finite() {
            return Err(EstimateError::invalid(id, format!("{field} is not a finite number")));
        }
    }

    if record.avg_sections_per_ft < 0.0 {
        return Err(EstimateError::invalid(
            id,
            format!(
                "avg_sections_per_ft must not be negative, got {}",
                record.avg_sections_per_ft
            ),
        ));
    }

    Ok(())
}

/// Derives the coverage figures for a record that already passed [`validate`].
pub fn enrich(record: &CourseDemandRecord) -> EnrichedCourseRisk {
    let enrollees = i64::from(record.forecast_enrollees);
    let cap = i64::from(record.cap_per_section);
    let req_sections = (enrollees + cap - 1) / cap;

    let effective_ft =
        f64::from(record.qualified_ft_count) * (1.0 - clamp(record.leave_probability, 0.0, 1.0));
    let ft_capacity = effective_ft * record.avg_sections_per_ft;
    let pt_capacity = f64::from(record.qualified_pt_pool) * SECTIONS_PER_PT;

    let gap_raw = req_sections as f64 - (ft_capacity + pt_capacity);
    let gap = non_negative(round1(gap_raw));

    let difficulty = 1.0 - record.historical_fill_rate;
    let risk = clamp(GAP_WEIGHT * gap_raw.tanh() + DIFFICULTY_WEIGHT * difficulty, 0.0, 1.0);

    EnrichedCourseRisk {
        record: record.clone(),
        req_sections,
        effective_ft,
        ft_capacity,
        pt_capacity,
        gap_raw,
        gap,
        risk,
    }
}

pub fn risk_level(row: &EnrichedCourseRisk, threshold: f64) -> RiskLevel {
    if row.risk >= CRITICAL_RISK {
        RiskLevel::Critical
    } else if row.risk >= threshold {
        RiskLevel::Elevated
    } else {
        RiskLevel::Normal
    }
}

/// Shown instead of an action for courses below the risk threshold.
pub const NO_ACTION: &str = "—";

pub fn recommended_action(row: &EnrichedCourseRisk, threshold: f64) -> String {
    if row.risk < threshold {
        NO_ACTION.to_string()
    } else if row.gap > 0.0 {
        let sections = row.gap.ceil() as i64;
        let plural = if sections == 1 { "" } else { "s" };
        format!("{sections} PT section{plural}")
    } else {
        "OK".to_string()
    }
}

pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn percent(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

// Keeps `-0.0` out of the output.
fn non_negative(value: f64) -> f64 {
    if value > 0.0 {
        value
    } else {
        0.0
    }
}
