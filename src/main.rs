use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use course_load_risk::export::{self, ExportScope};
use course_load_risk::models::{DemandSnapshot, RiskAssessment, Term};
use course_load_risk::{report, risk, source};

mod db;

#[derive(Parser)]
#[command(name = "load-risk")]
#[command(about = "Faculty load risk and section coverage estimates per term", long_about = None)]
struct Cli {
    /// Postgres connection string; only needed when no --input file is given
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Read demand records from a .csv or .json file instead of the database
    #[arg(long)]
    input: Option<PathBuf>,
    /// Term to analyse; defaults to the active term
    #[arg(long, conflicts_with = "input")]
    term: Option<String>,
    #[arg(
        long,
        env = "LOAD_RISK_THRESHOLD",
        default_value_t = risk::DEFAULT_RISK_THRESHOLD,
        value_parser = parse_threshold
    )]
    threshold: f64,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Create or update an academic term
    AddTerm {
        #[arg(long)]
        id: String,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        number: Option<i32>,
        #[arg(long, default_value = "planned")]
        status: String,
        /// Mark this term as the current one
        #[arg(long)]
        current: bool,
    },
    /// Import course demand rows for a term from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        term: String,
    },
    /// Print coverage KPIs and the riskiest courses
    Score {
        #[command(flatten)]
        source: SourceArgs,
        /// List every course, not only the at-risk ones
        #[arg(long)]
        all: bool,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Emit the full assessment as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export course risk rows as CSV
    Export {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, value_enum, default_value_t = ExportScope::AtRisk)]
        scope: ExportScope,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value = "load-risk-report.md")]
        out: PathBuf,
    },
    /// Draw risk per course as text bars
    Chart {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value_t = 40)]
        width: usize,
    },
}

fn parse_threshold(value: &str) -> Result<f64, String> {
    let threshold: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(format!("threshold must be between 0 and 1, got {threshold}"))
    }
}

async fn connect(database_url: Option<&str>) -> anyhow::Result<PgPool> {
    let database_url = database_url
        .context("DATABASE_URL must be set (or pass --input) to read demand records")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn load_snapshot(
    database_url: Option<&str>,
    args: &SourceArgs,
) -> anyhow::Result<DemandSnapshot> {
    match &args.input {
        Some(path) => source::load_snapshot(path),
        None => {
            let pool = connect(database_url).await?;
            db::fetch_snapshot(&pool, args.term.as_deref()).await
        }
    }
}

async fn assess(
    database_url: Option<&str>,
    args: &SourceArgs,
) -> anyhow::Result<(String, RiskAssessment)> {
    let snapshot = load_snapshot(database_url, args).await?;
    let assessment = risk::compute_risk(&snapshot.courses, args.threshold)?;
    tracing::debug!(
        courses = assessment.summary.course_count,
        at_risk = assessment.summary.at_risk_count,
        "assessment computed"
    );
    Ok((snapshot.term_label, assessment))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "course_load_risk=info,load_risk=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let database_url = cli.database_url.as_deref();

    match cli.command {
        Commands::InitDb => {
            let pool = connect(database_url).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::AddTerm {
            id,
            year,
            number,
            status,
            current,
        } => {
            let pool = connect(database_url).await?;
            let term = Term {
                term_id: id,
                acad_year_start: year,
                term_number: number,
            };
            db::upsert_term(&pool, &term, &status, current).await?;
            println!("Term {} saved.", term.term_id);
        }
        Commands::Import { csv, term } => {
            let pool = connect(database_url).await?;
            let written = db::import_csv(&pool, &csv, &term).await?;
            println!("Wrote {written} course rows for {term} from {}.", csv.display());
        }
        Commands::Score {
            source,
            all,
            limit,
            json,
        } => {
            let (term_label, assessment) = assess(database_url, &source).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&assessment)?);
                return Ok(());
            }

            let summary = &assessment.summary;
            if !term_label.is_empty() {
                println!("Term: {term_label}");
            }
            println!(
                "Predicted at-risk courses (risk >= {}%): {}",
                risk::percent(summary.threshold),
                summary.at_risk_count
            );
            println!("Expected section deficit: {:.1}", summary.expected_gap);
            println!("Estimated part-timer need: {} FTE", summary.fte_need);

            let mut rows = if all {
                assessment.rows.clone()
            } else {
                assessment.at_risk.clone()
            };
            if rows.is_empty() {
                println!("No courses to list.");
                return Ok(());
            }
            rows.sort_by(|a, b| {
                b.risk
                    .partial_cmp(&a.risk)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            println!();
            println!("Courses by risk:");
            for row in rows.iter().take(limit) {
                println!(
                    "- {} {} ({}) risk {}% [{}], sections {}/{}, gap {:.1}: {}",
                    row.record.course_code,
                    row.record.course_name,
                    row.record.program_area,
                    risk::percent(row.risk),
                    risk::risk_level(row, summary.threshold).label(),
                    row.req_sections,
                    row.record.sections_planned,
                    row.gap,
                    risk::recommended_action(row, summary.threshold)
                );
            }
        }
        Commands::Export { source, scope, out } => {
            let (_, assessment) = assess(database_url, &source).await?;
            let rows = export::project_for_export(scope.select(&assessment));
            let out = out.unwrap_or_else(|| {
                PathBuf::from(export::export_file_name(scope, Utc::now().date_naive()))
            });

            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            export::write_csv(file, &rows)?;
            tracing::info!(path = %out.display(), rows = rows.len(), "csv export written");
            println!("Exported {} rows to {}.", rows.len(), out.display());
        }
        Commands::Report { source, out } => {
            let (term_label, assessment) = assess(database_url, &source).await?;
            let report = report::build_report(&term_label, &assessment);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Chart { source, width } => {
            let (_, assessment) = assess(database_url, &source).await?;
            let buckets = export::bucket_risk_for_chart(&assessment.rows);
            if buckets.is_empty() {
                println!("No courses to chart.");
            } else {
                print!("{}", report::render_bar_chart(&buckets, width));
            }
        }
    }

    Ok(())
}
