use std::path::Path;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::models::{SessionDataset, SessionRecord};

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

pub fn parse_login_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

pub fn deserialize_login_date<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_login_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognised login_date `{raw}`")))
}

pub fn read_sessions<R: std::io::Read>(reader: R) -> anyhow::Result<Vec<SessionRecord>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for (index, result) in reader.deserialize::<SessionRecord>().enumerate() {
        // Header is line 1.
        let record = result.with_context(|| format!("invalid session on line {}", index + 2))?;
        records.push(record);
    }
    Ok(records)
}

pub fn load_csv(path: &Path) -> anyhow::Result<SessionDataset> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let records =
        read_sessions(file).with_context(|| format!("failed to read {}", path.display()))?;
    info!(path = %path.display(), sessions = records.len(), "loaded session table");

    let dataset = SessionDataset::new(records);
    if !dataset.is_chronological() {
        debug!(path = %path.display(), "session table is not ordered by login_date");
    }
    Ok(dataset)
}
