use fhescore_types::{ActivityKind, Identity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LedgerEventKind {
    Registered,
    ActivitySubmitted { kind: ActivityKind },
    ScoreCalculated,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEvent {
    pub sequence: u64,
    pub identity: Identity,
    pub kind: LedgerEventKind,
}

/// Append-only history of state mutations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<LedgerEvent>,
}

impl EventLog {
    pub fn from_events(events: Vec<LedgerEvent>) -> Self {
        Self { events }
    }

    pub fn emit(&mut self, identity: Identity, kind: LedgerEventKind) -> LedgerEvent {
        let event = LedgerEvent {
            sequence: self.events.last().map_or(0, |e| e.sequence + 1),
            identity,
            kind,
        };
        self.events.push(event);
        event
    }

    pub fn all(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn for_identity(&self, identity: Identity) -> Vec<LedgerEvent> {
        self.events
            .iter()
            .filter(|e| e.identity == identity)
            .copied()
            .collect()
    }
}
