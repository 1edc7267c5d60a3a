//! Configuration for the planner.
//!
//! This module provides the runtime and query option structures consumed
//! by cost computation and plan rendering.

mod planner;

pub use planner::{ExplainLevel, PlannerConfig, QueryOptions, RuntimeOptions};
