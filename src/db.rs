use anyhow::{bail, Context};
use sqlx::{PgPool, Row};

use course_load_risk::models::{CourseDemandRecord, DemandSnapshot, Term};
use course_load_risk::{risk, source};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn upsert_term(
    pool: &PgPool,
    term: &Term,
    status: &str,
    make_current: bool,
) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    if make_current {
        sqlx::query("UPDATE load_risk.terms SET is_current = FALSE WHERE term_id <> $1")
            .bind(&term.term_id)
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO load_risk.terms (term_id, acad_year_start, term_number, status, is_current)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (term_id) DO UPDATE
        SET acad_year_start = EXCLUDED.acad_year_start,
            term_number = EXCLUDED.term_number,
            status = EXCLUDED.status,
            is_current = load_risk.terms.is_current OR EXCLUDED.is_current
        "#,
    )
    .bind(&term.term_id)
    .bind(term.acad_year_start)
    .bind(term.term_number)
    .bind(status)
    .bind(make_current)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(term_id = %term.term_id, make_current, "term saved");
    Ok(())
}

pub async fn active_term(pool: &PgPool) -> anyhow::Result<Option<Term>> {
    let row = sqlx::query(
        r#"
        SELECT term_id, acad_year_start, term_number
        FROM load_risk.terms
        WHERE status = 'active' OR is_current
        ORDER BY is_current DESC, term_id DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| term_from_row(&row)))
}

async fn find_term(pool: &PgPool, term_id: &str) -> anyhow::Result<Option<Term>> {
    let row = sqlx::query(
        "SELECT term_id, acad_year_start, term_number FROM load_risk.terms WHERE term_id = $1",
    )
    .bind(term_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| term_from_row(&row)))
}

fn term_from_row(row: &sqlx::postgres::PgRow) -> Term {
    Term {
        term_id: row.get("term_id"),
        acad_year_start: row.get("acad_year_start"),
        term_number: row.get("term_number"),
    }
}

pub async fn fetch_snapshot(pool: &PgPool, term_id: Option<&str>) -> anyhow::Result<DemandSnapshot> {
    let term = match term_id {
        Some(id) => find_term(pool, id)
            .await?
            .with_context(|| format!("unknown term {id}"))?,
        None => active_term(pool)
            .await?
            .context("no active term; pass --term or mark one current with add-term")?,
    };

    let records = sqlx::query(
        r#"
        SELECT course_id, course_code, course_name, sections_planned, cap_per_section,
               forecast_enrollees, qualified_ft_count, qualified_pt_pool,
               avg_sections_per_ft, leave_probability, historical_fill_rate, program_area
        FROM load_risk.course_demand
        WHERE term_id = $1
        ORDER BY course_id
        "#,
    )
    .bind(&term.term_id)
    .fetch_all(pool)
    .await?;

    let mut courses = Vec::new();

    for row in records {
        courses.push(CourseDemandRecord {
            course_id: row.get("course_id"),
            course_code: row.get("course_code"),
            course_name: row.get("course_name"),
            sections_planned: row.get("sections_planned"),
            cap_per_section: row.get("cap_per_section"),
            forecast_enrollees: row.get("forecast_enrollees"),
            qualified_ft_count: row.get("qualified_ft_count"),
            qualified_pt_pool: row.get("qualified_pt_pool"),
            avg_sections_per_ft: row.get("avg_sections_per_ft"),
            leave_probability: row.get("leave_probability"),
            historical_fill_rate: row.get("historical_fill_rate"),
            program_area: row.get("program_area"),
        });
    }

    tracing::info!(term_id = %term.term_id, courses = courses.len(), "fetched demand snapshot");

    Ok(DemandSnapshot {
        term_label: term.label(),
        courses,
    })
}

pub async fn import_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
    term_id: &str,
) -> anyhow::Result<usize> {
    if find_term(pool, term_id).await?.is_none() {
        bail!("unknown term {term_id}; create it with add-term first");
    }

    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let records = source::read_csv(file)?;

    for record in &records {
        risk::validate(record)?;
    }

    let mut tx = pool.begin().await?;
    let mut written = 0usize;

    for record in &records {
        let result = sqlx::query(
            r#"
            INSERT INTO load_risk.course_demand
            (term_id, course_id, course_code, course_name, sections_planned, cap_per_section,
             forecast_enrollees, qualified_ft_count, qualified_pt_pool, avg_sections_per_ft,
             leave_probability, historical_fill_rate, program_area)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (term_id, course_id) DO UPDATE
            SET course_code = EXCLUDED.course_code,
                course_name = EXCLUDED.course_name,
                sections_planned = EXCLUDED.sections_planned,
                cap_per_section = EXCLUDED.cap_per_section,
                forecast_enrollees = EXCLUDED.forecast_enrollees,
                qualified_ft_count = EXCLUDED.qualified_ft_count,
                qualified_pt_pool = EXCLUDED.qualified_pt_pool,
                avg_sections_per_ft = EXCLUDED.avg_sections_per_ft,
                leave_probability = EXCLUDED.leave_probability,
                historical_fill_rate = EXCLUDED.historical_fill_rate,
                program_area = EXCLUDED.program_area,
                updated_at = now()
            "#,
        )
        .bind(term_id)
        .bind(&record.course_id)
        .bind(&record.course_code)
        .bind(&record.course_name)
        .bind(record.sections_planned)
        .bind(record.cap_per_section)
        .bind(record.forecast_enrollees)
        .bind(record.qualified_ft_count)
        .bind(record.qualified_pt_pool)
        .bind(record.avg_sections_per_ft)
        .bind(record.leave_probability)
        .bind(record.historical_fill_rate)
        .bind(&record.program_area)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() > 0 {
            written += 1;
        }
    }

    tx.commit().await?;
    Ok(written)
}
