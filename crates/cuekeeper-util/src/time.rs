//! Wall-clock time utilities for cuekeeper
//!
//! Session timing is measured between wall-clock instants, so everything
//! that stamps a transition goes through [`now`].
//!
//! # Mock Time for Development
//!
//! In debug builds, the `CUEKEEPER_MOCK_TIME` environment variable can be set
//! to shift the clock seen by the service. The mock clock keeps advancing at
//! the real rate, which makes it possible to reproduce late-night sessions
//! during the day.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 23:30:00`)
//!
//! Example:
//! ```bash
//! CUEKEEPER_MOCK_TIME="2025-12-25 23:30:00" cargo run -p cuekeeperd
//! ```

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::sync::OnceLock;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "CUEKEEPER_MOCK_TIME";

/// Format accepted by `CUEKEEPER_MOCK_TIME`
pub const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Offset between mock time and real time, computed once at first use.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            let mock_time_str = std::env::var(MOCK_TIME_ENV_VAR).ok()?;
            let Ok(naive_dt) = NaiveDateTime::parse_from_str(&mock_time_str, MOCK_TIME_FORMAT)
            else {
                tracing::warn!(
                    mock_time = %mock_time_str,
                    expected_format = MOCK_TIME_FORMAT,
                    "Invalid mock time format"
                );
                return None;
            };

            match Local.from_local_datetime(&naive_dt).single() {
                Some(mock_dt) => {
                    let offset = mock_dt.signed_duration_since(chrono::Local::now());
                    tracing::info!(
                        mock_time = %mock_time_str,
                        offset_secs = offset.num_seconds(),
                        "Mock time enabled"
                    );
                    Some(offset)
                }
                None => {
                    tracing::warn!(
                        mock_time = %mock_time_str,
                        "Failed to convert mock time to local timezone"
                    );
                    None
                }
            }
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Seconds elapsed between two instants, as a fraction.
///
/// Returns 0.0 when `to` precedes `from` (wall clock stepped backwards), so
/// accumulated time can never shrink.
pub fn elapsed_secs(from: DateTime<Local>, to: DateTime<Local>) -> f64 {
    let delta = to.signed_duration_since(from);
    match delta.to_std() {
        Ok(d) => d.as_secs_f64(),
        Err(_) => 0.0,
    }
}

/// Format a DateTime for display with full date and time.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format fractional seconds as a `HH:MM:SS` table timer
pub fn format_timer(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
