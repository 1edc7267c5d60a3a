//! Error handling for the planner.
//!
//! This module provides the planning error type and result alias used
//! across all Meridian crates.

mod planner;

pub use planner::{ErrorCode, PlannerError};

/// Result type alias for planning operations.
pub type PlannerResult<T> = std::result::Result<T, PlannerError>;
