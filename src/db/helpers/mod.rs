use std::convert::TryFrom;

use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};

use crate::db::models::PhraseStatus;

pub fn to_i64(value: usize) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn to_millis(value: DateTime<Utc>) -> i64 {
    value.timestamp_millis()
}

pub fn from_millis(value: i64, field: &str) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(value)
        .single()
        .ok_or_else(|| anyhow!("{field} holds out-of-range timestamp {value}"))
}

pub fn parse_status(value: &str) -> Result<PhraseStatus> {
    match value {
        "Pending" => Ok(PhraseStatus::Pending),
        "Reviewed" => Ok(PhraseStatus::Reviewed),
        "Deleted" => Ok(PhraseStatus::Deleted),
        other => Err(anyhow!("unknown phrase status {other}")),
    }
}
