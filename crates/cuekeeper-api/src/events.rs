//! Event types for cuekeeperd -> client streaming

use chrono::{DateTime, Local};
use cuekeeper_util::TableId;
use serde::{Deserialize, Serialize};

use crate::{TableSession, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: cuekeeper_util::now(),
            payload,
        }
    }
}

/// All possible events from the service to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A table changed state; carries the new session snapshot
    TableChanged {
        table_id: TableId,
        session: TableSession,
    },

    /// A session was closed and billed
    TableEnded {
        table_id: TableId,
        total_cost: f64,
        total_hours: f64,
    },

    /// Service is shutting down
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TableStatus;

    #[test]
    fn event_serialization() {
        let event = Event::new(EventPayload::TableChanged {
            table_id: TableId::new("table_9"),
            session: TableSession::fresh(50.0),
        });

        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.api_version, API_VERSION);
        match parsed.payload {
            EventPayload::TableChanged { table_id, session } => {
                assert_eq!(table_id.as_str(), "table_9");
                assert_eq!(session.status(), TableStatus::Available);
            }
            other => panic!("Expected TableChanged, got {:?}", other),
        }
    }

    #[test]
    fn ended_event_carries_bill() {
        let event = Event::new(EventPayload::TableEnded {
            table_id: TableId::new("table_1"),
            total_cost: 50.0,
            total_hours: 1.0,
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["payload"]["type"], "table_ended");
        assert_eq!(value["payload"]["total_cost"], 50.0);
    }
}
