//! Table state machine
//!
//! ```text
//!              start            pause
//!  Available ---------> Running -------> Paused
//!      ^                   ^               |
//!      |                   +---------------+
//!      |                        resume
//!      +---- end (from any phase) ----+
//! ```
//!
//! Elapsed time is folded into `total_time` lazily: only pause and end read
//! the clock against `started_at`. Resume never touches `total_time`.

use chrono::{DateTime, Local};
use cuekeeper_api::{SessionPhase, TableSession, TableStatus};
use cuekeeper_util::elapsed_secs;
use std::fmt;

use crate::Bill;

/// A mutating operation on one table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAction {
    Start,
    Pause,
    Resume,
    End,
}

impl TableAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableAction::Start => "start",
            TableAction::Pause => "pause",
            TableAction::Resume => "resume",
            TableAction::End => "end",
        }
    }
}

impl fmt::Display for TableAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a successful action did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Started { start_time: DateTime<Local> },
    Paused { total_time: f64 },
    Resumed { start_time: DateTime<Local> },
    Ended(Bill),
}

/// The action is not allowed from the session's current status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejected {
    pub status: TableStatus,
    pub action: TableAction,
}

/// Apply `action` to `session` at instant `now`.
///
/// Returns the successor session and the transition taken. `session` itself
/// is not modified, so a rejected action leaves no trace. Ending resets the
/// table to a fresh session billed at `default_rate`.
pub fn apply_action(
    session: &TableSession,
    action: TableAction,
    now: DateTime<Local>,
    default_rate: f64,
) -> Result<(TableSession, Transition), Rejected> {
    let rejected = Rejected {
        status: session.status(),
        action,
    };

    match (action, session.phase) {
        (TableAction::Start, SessionPhase::Available) => {
            let next = TableSession {
                phase: SessionPhase::Running { started_at: now },
                ..session.clone()
            };
            Ok((next, Transition::Started { start_time: now }))
        }

        (TableAction::Pause, SessionPhase::Running { started_at }) => {
            let total_time = session.total_time + elapsed_secs(started_at, now);
            let next = TableSession {
                phase: SessionPhase::Paused,
                total_time,
                rate: session.rate,
            };
            Ok((next, Transition::Paused { total_time }))
        }

        (TableAction::Resume, SessionPhase::Paused) => {
            let next = TableSession {
                phase: SessionPhase::Running { started_at: now },
                ..session.clone()
            };
            Ok((next, Transition::Resumed { start_time: now }))
        }

        (TableAction::End, phase) => {
            let total_time = match phase {
                SessionPhase::Running { started_at } => {
                    session.total_time + elapsed_secs(started_at, now)
                }
                SessionPhase::Available | SessionPhase::Paused => session.total_time,
            };
            let bill = Bill::compute(total_time, session.rate);
            Ok((TableSession::fresh(default_rate), Transition::Ended(bill)))
        }

        _ => Err(rejected),
    }
}

/// Running time including any open interval, for display
pub fn live_elapsed(session: &TableSession, now: DateTime<Local>) -> f64 {
    match session.phase {
        SessionPhase::Running { started_at } => session.total_time + elapsed_secs(started_at, now),
        SessionPhase::Available | SessionPhase::Paused => session.total_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 1, 19, 0, 0).unwrap()
    }

    fn step(
        session: &TableSession,
        action: TableAction,
        now: DateTime<Local>,
    ) -> (TableSession, Transition) {
        apply_action(session, action, now, 50.0).unwrap()
    }

    #[test]
    fn test_start_from_available() {
        let (next, transition) = step(&TableSession::fresh(50.0), TableAction::Start, t0());

        assert_eq!(next.status(), TableStatus::Running);
        assert_eq!(next.start_time(), Some(t0()));
        assert_eq!(next.total_time, 0.0);
        assert_eq!(transition, Transition::Started { start_time: t0() });
    }

    #[test]
    fn test_pause_folds_elapsed() {
        let (running, _) = step(&TableSession::fresh(50.0), TableAction::Start, t0());
        let (paused, transition) = step(&running, TableAction::Pause, t0() + Duration::seconds(90));

        assert_eq!(paused.status(), TableStatus::Paused);
        assert_eq!(paused.start_time(), None);
        assert_eq!(paused.total_time, 90.0);
        assert_eq!(transition, Transition::Paused { total_time: 90.0 });
    }

    #[test]
    fn test_resume_keeps_total_time() {
        let paused = TableSession {
            phase: SessionPhase::Paused,
            total_time: 90.0,
            rate: 50.0,
        };
        let later = t0() + Duration::minutes(10);
        let (running, transition) = step(&paused, TableAction::Resume, later);

        assert_eq!(running.total_time, 90.0);
        assert_eq!(running.start_time(), Some(later));
        assert_eq!(transition, Transition::Resumed { start_time: later });
    }

    #[test]
    fn test_total_time_never_decreases_across_cycles() {
        let (s, _) = step(&TableSession::fresh(50.0), TableAction::Start, t0());
        let (s, _) = step(&s, TableAction::Pause, t0() + Duration::seconds(60));
        let first = s.total_time;
        let (s, _) = step(&s, TableAction::Resume, t0() + Duration::seconds(120));
        let (s, _) = step(&s, TableAction::Pause, t0() + Duration::seconds(150));

        assert!(s.total_time >= first);
        assert_eq!(s.total_time, 90.0);
    }

    #[test]
    fn test_backwards_clock_folds_as_zero() {
        let (running, _) = step(&TableSession::fresh(50.0), TableAction::Start, t0());
        let (paused, _) = step(&running, TableAction::Pause, t0() - Duration::seconds(30));

        assert_eq!(paused.total_time, 0.0);
    }

    #[test]
    fn test_end_while_running_bills_open_interval() {
        let running = TableSession {
            phase: SessionPhase::Running { started_at: t0() },
            total_time: 1800.0,
            rate: 50.0,
        };
        let (next, transition) = step(&running, TableAction::End, t0() + Duration::seconds(1800));

        assert_eq!(next, TableSession::fresh(50.0));
        assert_eq!(
            transition,
            Transition::Ended(Bill {
                total_hours: 1.0,
                total_cost: 50.0
            })
        );
    }

    #[test]
    fn test_end_resets_custom_rate() {
        let paused = TableSession {
            phase: SessionPhase::Paused,
            total_time: 3600.0,
            rate: 80.0,
        };
        let (next, transition) = step(&paused, TableAction::End, t0());

        // billed at the session's own rate, reset to the default
        assert_eq!(next.rate, 50.0);
        assert_eq!(
            transition,
            Transition::Ended(Bill {
                total_hours: 1.0,
                total_cost: 80.0
            })
        );
    }

    #[test]
    fn test_end_from_available_is_free() {
        let (next, transition) = step(&TableSession::fresh(50.0), TableAction::End, t0());

        assert_eq!(next, TableSession::fresh(50.0));
        assert_eq!(
            transition,
            Transition::Ended(Bill {
                total_hours: 0.0,
                total_cost: 0.0
            })
        );
    }

    #[test]
    fn test_rejected_transitions() {
        let available = TableSession::fresh(50.0);
        let (running, _) = step(&available, TableAction::Start, t0());
        let (paused, _) = step(&running, TableAction::Pause, t0());

        let cases = [
            (&available, TableAction::Pause, TableStatus::Available),
            (&available, TableAction::Resume, TableStatus::Available),
            (&running, TableAction::Start, TableStatus::Running),
            (&running, TableAction::Resume, TableStatus::Running),
            (&paused, TableAction::Start, TableStatus::Paused),
            (&paused, TableAction::Pause, TableStatus::Paused),
        ];

        for (session, action, status) in cases {
            assert_eq!(
                apply_action(session, action, t0(), 50.0),
                Err(Rejected { status, action }),
                "{} from {}",
                action,
                status
            );
        }
    }

    #[test]
    fn test_live_elapsed() {
        let running = TableSession {
            phase: SessionPhase::Running { started_at: t0() },
            total_time: 100.0,
            rate: 50.0,
        };
        assert_eq!(live_elapsed(&running, t0() + Duration::seconds(20)), 120.0);

        let paused = TableSession {
            phase: SessionPhase::Paused,
            total_time: 100.0,
            rate: 50.0,
        };
        assert_eq!(live_elapsed(&paused, t0() + Duration::hours(5)), 100.0);
    }
}
