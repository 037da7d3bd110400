use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseDemandRecord {
    pub course_id: String,
    pub course_code: String,
    pub course_name: String,
    pub sections_planned: i32,
    pub cap_per_section: i32,
    pub forecast_enrollees: i32,
    pub qualified_ft_count: i32,
    pub qualified_pt_pool: i32,
    pub avg_sections_per_ft: f64,
    pub leave_probability: f64,
    pub historical_fill_rate: f64,
    pub program_area: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedCourseRisk {
    #[serde(flatten)]
    pub record: CourseDemandRecord,
    pub req_sections: i64,
    pub effective_ft: f64,
    pub ft_capacity: f64,
    pub pt_capacity: f64,
    pub gap_raw: f64,
    /// Sections short, rounded to one decimal and never negative.
    pub gap: f64,
    /// Bounded to `[0, 1]`.
    pub risk: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskSummary {
    pub course_count: usize,
    pub at_risk_count: usize,
    pub threshold: f64,
    pub expected_gap: f64,
    pub fte_need: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub rows: Vec<EnrichedCourseRisk>,
    pub at_risk: Vec<EnrichedCourseRisk>,
    pub summary: RiskSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Normal,
    Elevated,
    Critical,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Normal => "normal",
            RiskLevel::Elevated => "elevated",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Flat, display-rounded view of one row. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub course_code: String,
    pub course_name: String,
    pub program_area: String,
    pub req_sections: i64,
    pub planned_sections: i32,
    #[serde(serialize_with = "plain_number")]
    pub ft_capacity: f64,
    #[serde(serialize_with = "plain_number")]
    pub pt_capacity: f64,
    #[serde(serialize_with = "plain_number")]
    pub coverage_gap: f64,
    pub historical_fill_rate_pct: i64,
    pub leave_probability_pct: i64,
    pub risk_pct: i64,
}

/// Whole numbers are written without a trailing `.0` (`3`, not `3.0`).
fn plain_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartBucket {
    pub label: String,
    pub percent: i64,
}

#[derive(Debug, Clone)]
pub struct AreaSummary {
    pub program_area: String,
    pub course_count: usize,
    pub at_risk_count: usize,
    pub total_gap: f64,
    pub avg_risk: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DemandSnapshot {
    pub term_label: String,
    pub courses: Vec<CourseDemandRecord>,
}

#[derive(Debug, Clone)]
pub struct Term {
    pub term_id: String,
    pub acad_year_start: Option<i32>,
    pub term_number: Option<i32>,
}

impl Term {
    /// `AY 2025-2026 T1`, or empty when the year or term number is unknown.
    pub fn label(&self) -> String {
        match (self.acad_year_start, self.term_number) {
            (Some(year), Some(number)) if year > 0 => {
                format!("AY {}-{} T{}", year, year + 1, number)
            }
            _ => String::new(),
        }
    }
}
