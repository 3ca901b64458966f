//! Core events emitted by the ledger

use cuekeeper_api::{EventPayload, TableSession, TransitionDetail, TransitionReply};
use cuekeeper_util::TableId;

use crate::Transition;

/// A successful transition on one table, with the table's session afterwards
#[derive(Debug, Clone, PartialEq)]
pub struct CoreEvent {
    pub table_id: TableId,
    pub transition: Transition,
    pub session: TableSession,
}

impl CoreEvent {
    /// Reply to the client that requested the transition
    pub fn reply(&self) -> TransitionReply {
        let status = self.session.status();
        let detail = match self.transition {
            Transition::Started { start_time } | Transition::Resumed { start_time } => {
                TransitionDetail::Running { start_time, status }
            }
            Transition::Paused { total_time } => TransitionDetail::Paused { total_time, status },
            Transition::Ended(bill) => TransitionDetail::Ended {
                total_cost: bill.total_cost,
                total_hours: bill.total_hours,
            },
        };
        TransitionReply::succeeded(detail)
    }

    /// Payloads to broadcast to subscribers
    pub fn broadcasts(&self) -> Vec<EventPayload> {
        let mut payloads = vec![EventPayload::TableChanged {
            table_id: self.table_id.clone(),
            session: self.session.clone(),
        }];

        if let Transition::Ended(bill) = self.transition {
            payloads.push(EventPayload::TableEnded {
                table_id: self.table_id.clone(),
                total_cost: bill.total_cost,
                total_hours: bill.total_hours,
            });
        }

        payloads
    }
}
