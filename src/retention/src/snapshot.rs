//! Snapshot identifiers.
//!
//! A snapshot is stored as a directory-style prefix whose name encodes the UTC
//! minute it was taken, e.g. `snapshots/2026-02-27-14-30/`.

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc, Weekday};
use std::fmt;
use thiserror::Error;

/// Literal namespace every snapshot identifier lives under.
pub const SNAPSHOT_PREFIX: &str = "snapshots/";

/// `chrono` format of the timestamp segment.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M";

/// Byte layout of `YYYY-MM-DD-HH-mm`; `-` marks separator positions, `9` digits.
const TIMESTAMP_SHAPE: &[u8; 16] = b"9999-99-99-99-99";

/// A validated snapshot identifier together with its decoded instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotId {
    raw: String,
    instant: DateTime<Utc>,
}

impl SnapshotId {
    /// Parse an identifier. The trailing slash is optional.
    pub fn parse(raw: &str) -> Result<Self, InvalidSnapshotId> {
        let trimmed = raw.trim_end_matches('/');
        let timestamp = trimmed
            .strip_prefix(SNAPSHOT_PREFIX)
            .ok_or_else(|| InvalidSnapshotId::MissingPrefix(raw.to_string()))?;

        if timestamp.contains('/') {
            return Err(InvalidSnapshotId::NestedPath(raw.to_string()));
        }

        if !has_timestamp_shape(timestamp) {
            return Err(InvalidSnapshotId::MalformedTimestamp {
                id: raw.to_string(),
                message: format!("expected YYYY-MM-DD-HH-mm, got '{timestamp}'"),
            });
        }

        let naive = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).map_err(|e| {
            InvalidSnapshotId::MalformedTimestamp {
                id: raw.to_string(),
                message: e.to_string(),
            }
        })?;

        Ok(Self {
            raw: raw.to_string(),
            instant: naive.and_utc(),
        })
    }

    /// Canonical identifier for an instant, truncated to the minute.
    pub fn format(instant: DateTime<Utc>) -> String {
        format!("{SNAPSHOT_PREFIX}{}/", instant.format(TIMESTAMP_FORMAT))
    }

    /// The identifier exactly as supplied.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    pub fn into_string(self) -> String {
        self.raw
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn has_timestamp_shape(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == TIMESTAMP_SHAPE.len()
        && bytes
            .iter()
            .zip(TIMESTAMP_SHAPE.iter())
            .all(|(b, shape)| match shape {
                b'-' => *b == b'-',
                _ => b.is_ascii_digit(),
            })
}

/// True when the instant's time of day is exactly 00:00 UTC.
pub fn is_daily_checkpoint(instant: DateTime<Utc>) -> bool {
    instant.hour() == 0 && instant.minute() == 0
}

/// True when the instant falls on `day` (UTC).
pub fn is_weekly_checkpoint(instant: DateTime<Utc>, day: Weekday) -> bool {
    instant.weekday() == day
}

/// Reasons an identifier is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidSnapshotId {
    #[error("'{0}' is not under the 'snapshots/' namespace")]
    MissingPrefix(String),

    #[error("'{0}' is nested below a snapshot directory")]
    NestedPath(String),

    #[error("'{id}' has a malformed timestamp: {message}")]
    MalformedTimestamp { id: String, message: String },
}
