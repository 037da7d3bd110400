use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;

use crate::models::{CourseDemandRecord, DemandSnapshot};

/// Shape of the analytics `load-risk` endpoint response.
#[derive(Debug, Deserialize)]
pub struct LoadRiskPayload {
    pub ok: bool,
    #[serde(default)]
    pub meta: Option<PayloadMeta>,
    #[serde(default)]
    pub courses: Vec<CourseDemandRecord>,
    #[serde(default)]
    pub generated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PayloadMeta {
    #[serde(default)]
    pub term_label: Option<String>,
}

pub fn load_snapshot(path: &Path) -> anyhow::Result<DemandSnapshot> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    let snapshot = match extension.as_deref() {
        Some("json") => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            parse_payload(file).with_context(|| format!("failed to read {}", path.display()))?
        }
        Some("csv") => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            DemandSnapshot {
                term_label: String::new(),
                courses: read_csv(file)
                    .with_context(|| format!("failed to read {}", path.display()))?,
            }
        }
        _ => bail!(
            "unsupported input {}: expected a .csv or .json file",
            path.display()
        ),
    };

    tracing::info!(
        path = %path.display(),
        courses = snapshot.courses.len(),
        "loaded demand snapshot"
    );
    Ok(snapshot)
}

pub fn read_csv<R: Read>(reader: R) -> anyhow::Result<Vec<CourseDemandRecord>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();

    for (index, result) in reader.deserialize::<CourseDemandRecord>().enumerate() {
        let record = result.with_context(|| format!("invalid CSV row {}", index + 1))?;
        records.push(record);
    }

    Ok(records)
}

pub fn parse_payload<R: Read>(reader: R) -> anyhow::Result<DemandSnapshot> {
    let payload: LoadRiskPayload = serde_json::from_reader(reader)?;

    if !payload.ok {
        bail!("source returned ok=false");
    }
    if let Some(generated_at) = payload.generated_at.as_deref() {
        tracing::debug!(generated_at, "payload timestamp");
    }

    Ok(DemandSnapshot {
        term_label: payload
            .meta
            .and_then(|meta| meta.term_label)
            .unwrap_or_default(),
        courses: payload.courses,
    })
}
