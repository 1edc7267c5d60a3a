//! # meridian-planner
//!
//! Physical planning for the Meridian query engine.
//!
//! This crate turns an analyzed query into a tree of executable operators
//! annotated with cardinality, row width and per-host memory estimates:
//! - Descriptors: frozen tuple, slot and table metadata with statistics
//! - Expressions: resolved expressions and substitution maps
//! - Plan nodes: scans and sorts, their lifecycle and cost model
//! - Explain: multi-level plan rendering
//! - Wire: the message set handed to the execution runtime
//!
//! Planning is single-threaded and synchronous. Intermediate estimates are
//! reported through a [`event::PlanEventSink`].

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Conjunct registry and descriptor access
pub mod analyzer;

/// Tuple, slot and table descriptors
pub mod descriptor;

/// Planner events
pub mod event;

/// Resolved expressions
pub mod expr;

/// Plan nodes and plan trees
pub mod plan;

/// Wire messages
pub mod wire;

pub use analyzer::Analyzer;
pub use plan::{NodeIndex, PlanNode, PlanTree};
