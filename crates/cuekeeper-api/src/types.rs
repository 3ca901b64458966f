//! Shared types for the cuekeeperd API

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use cuekeeper_util::TableId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle phase of a table, as reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Available,
    Running,
    Paused,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Available => "available",
            TableStatus::Running => "running",
            TableStatus::Paused => "paused",
        }
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase of a session. Only a running session carries a start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Available,
    Running { started_at: DateTime<Local> },
    Paused,
}

/// Session state of one table
///
/// On the wire (and on disk) this is the flat record
/// `{status, start_time, total_time, rate}`; see [`SessionRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SessionRecord", into = "SessionRecord")]
pub struct TableSession {
    pub phase: SessionPhase,

    /// Seconds of running time folded in so far. Not updated while running.
    pub total_time: f64,

    /// Billing rate per hour
    pub rate: f64,
}

impl TableSession {
    /// A fresh, available session billed at `rate`
    pub fn fresh(rate: f64) -> Self {
        Self {
            phase: SessionPhase::Available,
            total_time: 0.0,
            rate,
        }
    }

    pub fn status(&self) -> TableStatus {
        match self.phase {
            SessionPhase::Available => TableStatus::Available,
            SessionPhase::Running { .. } => TableStatus::Running,
            SessionPhase::Paused => TableStatus::Paused,
        }
    }

    pub fn start_time(&self) -> Option<DateTime<Local>> {
        match self.phase {
            SessionPhase::Running { started_at } => Some(started_at),
            _ => None,
        }
    }
}

/// Flat wire/storage shape of a [`TableSession`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub status: TableStatus,
    #[serde(default, with = "start_time_format")]
    pub start_time: Option<DateTime<Local>>,
    pub total_time: f64,
    pub rate: f64,
}

/// A flat record that does not describe a valid session
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidSessionRecord {
    #[error("running session has no start_time")]
    RunningWithoutStart,

    #[error("{0} session must not carry a start_time")]
    UnexpectedStart(TableStatus),

    #[error("total_time must be a non-negative number, got {0}")]
    BadTotalTime(f64),

    #[error("rate must be a non-negative number, got {0}")]
    BadRate(f64),
}

impl TryFrom<SessionRecord> for TableSession {
    type Error = InvalidSessionRecord;

    fn try_from(record: SessionRecord) -> Result<Self, Self::Error> {
        if !(record.total_time.is_finite() && record.total_time >= 0.0) {
            return Err(InvalidSessionRecord::BadTotalTime(record.total_time));
        }
        if !(record.rate.is_finite() && record.rate >= 0.0) {
            return Err(InvalidSessionRecord::BadRate(record.rate));
        }

        let phase = match (record.status, record.start_time) {
            (TableStatus::Running, Some(started_at)) => SessionPhase::Running { started_at },
            (TableStatus::Running, None) => return Err(InvalidSessionRecord::RunningWithoutStart),
            (status, Some(_)) => return Err(InvalidSessionRecord::UnexpectedStart(status)),
            (TableStatus::Available, None) => SessionPhase::Available,
            (TableStatus::Paused, None) => SessionPhase::Paused,
        };

        Ok(Self {
            phase,
            total_time: record.total_time,
            rate: record.rate,
        })
    }
}

impl From<TableSession> for SessionRecord {
    fn from(session: TableSession) -> Self {
        Self {
            status: session.status(),
            start_time: session.start_time(),
            total_time: session.total_time,
            rate: session.rate,
        }
    }
}

/// Parse a stored timestamp.
///
/// Accepts RFC 3339 as well as naive ISO-8601 without an offset
/// (`2025-03-01T19:05:12.482113`), which is read as local time.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Local>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Local));
    }

    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| format!("invalid timestamp '{}': {}", s, e))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| format!("timestamp '{}' does not exist in the local timezone", s))
}

mod start_time_format {
    use chrono::{DateTime, Local};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Local>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Local>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| super::parse_timestamp(&s).map_err(D::Error::custom))
            .transpose()
    }
}

/// Reply to a mutating command (start/pause/resume/end)
///
/// Serializes as `{"success": false}` on failure, and on success as
/// `success` plus the operation's fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionReply {
    pub success: bool,
    #[serde(flatten)]
    pub detail: Option<TransitionDetail>,
}

/// Operation-specific fields of a successful transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransitionDetail {
    /// Start and resume
    Running {
        start_time: DateTime<Local>,
        status: TableStatus,
    },
    /// Pause
    Paused { total_time: f64, status: TableStatus },
    /// End
    Ended { total_cost: f64, total_hours: f64 },
}

impl TransitionReply {
    pub fn failed() -> Self {
        Self {
            success: false,
            detail: None,
        }
    }

    pub fn succeeded(detail: TransitionDetail) -> Self {
        Self {
            success: true,
            detail: Some(detail),
        }
    }
}

/// Reply to a status lookup: the session itself, or `{"error": "..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusReply {
    Found(TableSession),
    NotFound { error: String },
}

impl StatusReply {
    pub fn not_found() -> Self {
        StatusReply::NotFound {
            error: "Table not found".into(),
        }
    }
}

impl From<Option<TableSession>> for StatusReply {
    fn from(lookup: Option<TableSession>) -> Self {
        lookup.map(StatusReply::Found).unwrap_or_else(StatusReply::not_found)
    }
}

/// One row of a table listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    pub table_id: TableId,
    pub session: TableSession,
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub store_ok: bool,
    pub table_count: usize,
}
