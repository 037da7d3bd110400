use std::io::Write;

use chrono::NaiveDate;

use crate::models::{ChartBucket, EnrichedCourseRisk, ExportRow, RiskAssessment};
use crate::risk::{percent, round1};

pub const CSV_COLUMNS: [&str; 11] = [
    "course_code",
    "course_name",
    "program_area",
    "req_sections",
    "planned_sections",
    "ft_capacity",
    "pt_capacity",
    "coverage_gap",
    "historical_fill_rate_pct",
    "leave_probability_pct",
    "risk_pct",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportScope {
    AtRisk,
    All,
}

impl ExportScope {
    pub fn slug(self) -> &'static str {
        match self {
            ExportScope::AtRisk => "at-risk",
            ExportScope::All => "all",
        }
    }

    pub fn select(self, assessment: &RiskAssessment) -> &[EnrichedCourseRisk] {
        match self {
            ExportScope::AtRisk => &assessment.at_risk,
            ExportScope::All => &assessment.rows,
        }
    }
}

pub fn project_for_export(rows: &[EnrichedCourseRisk]) -> Vec<ExportRow> {
    rows.iter()
        .map(|row| ExportRow {
            course_code: row.record.course_code.clone(),
            course_name: row.record.course_name.clone(),
            program_area: row.record.program_area.clone(),
            req_sections: row.req_sections,
            planned_sections: row.record.sections_planned,
            ft_capacity: round1(row.ft_capacity),
            pt_capacity: round1(row.pt_capacity),
            coverage_gap: row.gap,
            historical_fill_rate_pct: percent(row.record.historical_fill_rate),
            leave_probability_pct: percent(row.record.leave_probability),
            risk_pct: percent(row.risk),
        })
        .collect()
}

pub fn bucket_risk_for_chart(rows: &[EnrichedCourseRisk]) -> Vec<ChartBucket> {
    rows.iter()
        .map(|row| ChartBucket {
            label: row.record.course_code.clone(),
            percent: percent(row.risk),
        })
        .collect()
}

/// Writes quoted CSV with a header row. Nothing is written for an empty slice.
pub fn write_csv<W: Write>(writer: W, rows: &[ExportRow]) -> anyhow::Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .has_headers(false)
        .from_writer(writer);

    writer.write_record(CSV_COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn export_file_name(scope: ExportScope, date: NaiveDate) -> String {
    format!("load-risk_{}_{}.csv", scope.slug(), date.format("%Y-%m-%d"))
}
