//! Type definitions shared by the planner crates.
//!
//! This module contains the identifier newtypes and the structured
//! network address consumed by the execution coordinator.

mod address;
mod ids;

pub use address::NetworkAddress;
pub use ids::{PlanNodeId, SlotId, TupleId};
