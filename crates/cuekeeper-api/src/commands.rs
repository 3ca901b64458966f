//! Command types for the cuekeeperd protocol

use cuekeeper_util::{ClientId, TableId};
use serde::{Deserialize, Serialize};

use crate::{HealthStatus, StatusReply, TableEntry, TransitionReply, API_VERSION};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Protocol-level error information.
///
/// Ledger preconditions never surface here: a refused transition is a
/// successful response carrying `{"success": false}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    UnsupportedVersion,
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Open a session on an available table
    StartTable { table_id: TableId },

    /// Pause a running table, folding elapsed time
    PauseTable { table_id: TableId },

    /// Resume a paused table
    ResumeTable { table_id: TableId },

    /// Close the session, bill it, and reset the table
    EndTable { table_id: TableId },

    /// Snapshot of a single table
    GetTableStatus { table_id: TableId },

    /// Snapshot of every table
    ListTables,

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    /// Unsubscribe from events
    UnsubscribeEvents,

    /// Get health status
    GetHealth,

    /// Ping for keepalive
    Ping,
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    Transition(TransitionReply),
    Status(StatusReply),
    Tables { tables: Vec<TableEntry> },
    Subscribed { client_id: ClientId },
    Unsubscribed,
    Health(HealthStatus),
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TableSession, TableStatus, TransitionDetail};

    #[test]
    fn request_serialization() {
        let req = Request::new(1, Command::StartTable {
            table_id: TableId::new("table_4"),
        });
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"type\":\"start_table\""));

        let parsed: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.request_id, 1);
        assert!(matches!(
            parsed.command,
            Command::StartTable { table_id } if table_id == TableId::new("table_4")
        ));
    }

    #[test]
    fn transition_response_round_trip() {
        let resp = Response::success(
            7,
            ResponsePayload::Transition(TransitionReply::succeeded(TransitionDetail::Paused {
                total_time: 12.5,
                status: TableStatus::Paused,
            })),
        );

        let json = serde_json::to_string(&resp).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.request_id, 7);
        match parsed.result {
            ResponseResult::Ok(ResponsePayload::Transition(reply)) => {
                assert!(reply.success);
                assert_eq!(
                    reply.detail,
                    Some(TransitionDetail::Paused {
                        total_time: 12.5,
                        status: TableStatus::Paused
                    })
                );
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn table_listing_round_trip() {
        let resp = Response::success(
            2,
            ResponsePayload::Tables {
                tables: vec![TableEntry {
                    table_id: TableId::new("table_1"),
                    session: TableSession::fresh(50.0),
                }],
            },
        );

        let json = serde_json::to_string(&resp).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            parsed.result,
            ResponseResult::Ok(ResponsePayload::Tables { ref tables }) if tables.len() == 1
        ));
    }

    #[test]
    fn status_not_found_round_trip() {
        let resp = Response::success(3, ResponsePayload::Status(StatusReply::not_found()));

        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("Table not found"));

        let parsed: Response = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            parsed.result,
            ResponseResult::Ok(ResponsePayload::Status(StatusReply::NotFound { .. }))
        ));
    }
}
