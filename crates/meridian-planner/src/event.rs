//! Structured planner events.
//!
//! Plan nodes report intermediate estimates through a [`PlanEventSink`]
//! instead of logging directly. [`TracingSink`] forwards events to
//! `tracing`; [`RecordingSink`] keeps them for inspection in tests and tools.

use std::fmt;

use parking_lot::Mutex;

use meridian_common::types::PlanNodeId;

/// An event raised while a plan is initialized or costed.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanEvent {
    /// A node finished computing its statistics.
    StatsComputed {
        /// Node id.
        node_id: PlanNodeId,
        /// Node display name.
        display_name: String,
        /// Estimated output rows, `-1` if unknown.
        cardinality: i64,
        /// Estimated bytes per row.
        avg_row_size: f64,
    },
    /// A node finished computing its memory cost.
    CostsComputed {
        /// Node id.
        node_id: PlanNodeId,
        /// Node display name.
        display_name: String,
        /// Estimated per-host memory in bytes.
        per_host_mem_cost: u64,
    },
    /// A scan reads a table whose statistics are incomplete.
    TableMissingStats {
        /// Node id.
        node_id: PlanNodeId,
        /// Table name.
        table: String,
    },
}

impl PlanEvent {
    /// Returns the node the event concerns.
    pub fn node_id(&self) -> PlanNodeId {
        match self {
            PlanEvent::StatsComputed { node_id, .. }
            | PlanEvent::CostsComputed { node_id, .. }
            | PlanEvent::TableMissingStats { node_id, .. } => *node_id,
        }
    }
}

impl fmt::Display for PlanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanEvent::StatsComputed {
                node_id,
                display_name,
                cardinality,
                avg_row_size,
            } => write!(
                f,
                "{}:{} stats: cardinality={} avg_row_size={}",
                node_id, display_name, cardinality, avg_row_size
            ),
            PlanEvent::CostsComputed {
                node_id,
                display_name,
                per_host_mem_cost,
            } => write!(
                f,
                "{}:{} costs: per_host_mem_cost={}",
                node_id, display_name, per_host_mem_cost
            ),
            PlanEvent::TableMissingStats { node_id, table } => {
                write!(f, "{}: table {} is missing stats", node_id, table)
            }
        }
    }
}

/// Receiver of planner events.
pub trait PlanEventSink: Send + Sync + fmt::Debug {
    /// Handles one event.
    fn on_event(&self, event: &PlanEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl PlanEventSink for TracingSink {
    fn on_event(&self, event: &PlanEvent) {
        match event {
            PlanEvent::TableMissingStats { .. } => tracing::warn!("{}", event),
            _ => tracing::debug!("{}", event),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PlanEvent>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events received so far.
    pub fn events(&self) -> Vec<PlanEvent> {
        self.events.lock().clone()
    }

    /// Removes and returns the events received so far.
    pub fn take(&self) -> Vec<PlanEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl PlanEventSink for RecordingSink {
    fn on_event(&self, event: &PlanEvent) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink() {
        let sink = RecordingSink::new();
        sink.on_event(&PlanEvent::CostsComputed {
            node_id: PlanNodeId::new(1),
            display_name: "SORT".into(),
            per_host_mem_cost: 1024,
        });
        sink.on_event(&PlanEvent::TableMissingStats {
            node_id: PlanNodeId::new(0),
            table: "db.t".into(),
        });
        assert_eq!(sink.events().len(), 2);
        let events = sink.take();
        assert_eq!(events[0].node_id(), PlanNodeId::new(1));
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_display() {
        let event = PlanEvent::StatsComputed {
            node_id: PlanNodeId::new(1),
            display_name: "TOP-N".into(),
            cardinality: 10,
            avg_row_size: 50.0,
        };
        assert_eq!(
            event.to_string(),
            "01:TOP-N stats: cardinality=10 avg_row_size=50"
        );
    }
}
