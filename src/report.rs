use std::fmt::Write;

use crate::export::bucket_risk_for_chart;
use crate::models::{AreaSummary, ChartBucket, RiskAssessment};
use crate::risk::{self, percent, round1};

const CHART_WIDTH: usize = 40;

pub fn summarize_by_area(assessment: &RiskAssessment) -> Vec<AreaSummary> {
    let threshold = assessment.summary.threshold;
    let mut map: std::collections::HashMap<String, (usize, usize, f64, f64)> =
        std::collections::HashMap::new();

    for row in &assessment.rows {
        let entry = map
            .entry(row.record.program_area.clone())
            .or_insert((0, 0, 0.0, 0.0));
        entry.0 += 1;
        if row.risk >= threshold {
            entry.1 += 1;
            entry.2 += row.gap;
        }
        entry.3 += row.risk;
    }

    let mut summaries: Vec<AreaSummary> = map
        .into_iter()
        .map(
            |(program_area, (course_count, at_risk_count, total_gap, total_risk))| AreaSummary {
                program_area,
                course_count,
                at_risk_count,
                total_gap: round1(total_gap),
                avg_risk: if course_count == 0 {
                    0.0
                } else {
                    total_risk / course_count as f64
                },
            },
        )
        .collect();

    summaries.sort_by(|a, b| {
        b.at_risk_count
            .cmp(&a.at_risk_count)
            .then_with(|| {
                b.total_gap
                    .partial_cmp(&a.total_gap)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.program_area.cmp(&b.program_area))
    });
    summaries
}

/// Text bars on a 0..100 scale, one line per course.
pub fn render_bar_chart(buckets: &[ChartBucket], width: usize) -> String {
    let mut output = String::new();
    let label_width = buckets.iter().map(|b| b.label.chars().count()).max().unwrap_or(0);

    for bucket in buckets {
        let value = bucket.percent.clamp(0, 100) as usize;
        let filled = value * width / 100;
        let _ = writeln!(
            output,
            "{:<label_width$} |{}{} {:>3}%",
            bucket.label,
            "#".repeat(filled),
            " ".repeat(width - filled),
            bucket.percent,
        );
    }

    output
}

pub fn build_report(term_label: &str, assessment: &RiskAssessment) -> String {
    let summary = &assessment.summary;
    let areas = summarize_by_area(assessment);

    let mut output = String::new();
    let term = if term_label.is_empty() {
        "current term"
    } else {
        term_label
    };

    let _ = writeln!(output, "# Course Load Risk Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} courses, risk threshold {}%)",
        term,
        summary.course_count,
        percent(summary.threshold)
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Coverage Outlook");
    let _ = writeln!(
        output,
        "- Predicted at-risk courses: {}",
        summary.at_risk_count
    );
    let _ = writeln!(
        output,
        "- Expected section deficit: {:.1}",
        summary.expected_gap
    );
    let _ = writeln!(
        output,
        "- Estimated part-timer need: {} FTE (~1 FTE = {} sections)",
        summary.fte_need,
        risk::SECTIONS_PER_FTE
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Program Areas");

    if areas.is_empty() {
        let _ = writeln!(output, "No courses in this snapshot.");
    } else {
        for area in areas.iter() {
            let _ = writeln!(
                output,
                "- {}: {} courses, {} at risk, gap {:.1} (avg risk {}%)",
                area.program_area,
                area.course_count,
                area.at_risk_count,
                area.total_gap,
                percent(area.avg_risk)
            );
        }
    }

    let mut at_risk = assessment.at_risk.clone();
    at_risk.sort_by(|a, b| b.risk.partial_cmp(&a.risk).unwrap_or(std::cmp::Ordering::Equal));
    let _ = writeln!(output);
    let _ = writeln!(output, "## At-Risk Courses");

    if at_risk.is_empty() {
        let _ = writeln!(output, "No courses at or above the risk threshold.");
    } else {
        let _ = writeln!(
            output,
            "| Course | Area | Sections (req/planned) | FT cap | PT cap | Gap | Risk | Level | Action |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|---|---|---|");
        for row in at_risk.iter() {
            let _ = writeln!(
                output,
                "| {} {} | {} | {}/{} | {:.1} | {:.1} | {:.1} | {}% | {} | {} |",
                row.record.course_code,
                row.record.course_name,
                row.record.program_area,
                row.req_sections,
                row.record.sections_planned,
                row.ft_capacity,
                row.pt_capacity,
                row.gap,
                percent(row.risk),
                risk::risk_level(row, summary.threshold).label(),
                risk::recommended_action(row, summary.threshold)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk by Course");

    if assessment.rows.is_empty() {
        let _ = writeln!(output, "No courses in this snapshot.");
    } else {
        let _ = writeln!(output, "```");
        output.push_str(&render_bar_chart(
            &bucket_risk_for_chart(&assessment.rows),
            CHART_WIDTH,
        ));
        let _ = writeln!(output, "```");
    }

    output
}
