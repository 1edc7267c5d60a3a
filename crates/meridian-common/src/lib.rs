//! # meridian-common
//!
//! Common types, errors, and configuration for the Meridian planner.
//!
//! This crate provides the foundational types shared by the planner and
//! its tools:
//!
//! - **Types**: Identifier newtypes (`PlanNodeId`, `TupleId`, `SlotId`) and
//!   `NetworkAddress`
//! - **Errors**: Planning failures as `PlannerError` with stable `ErrorCode`s
//! - **Config**: Runtime and query options, loadable from TOML
//! - **Constants**: Byte units, read-size defaults, slot sizes
//!
//! ## Example
//!
//! ```rust
//! use meridian_common::config::RuntimeOptions;
//! use meridian_common::error::PlannerResult;
//! use meridian_common::types::NetworkAddress;
//!
//! fn example() -> PlannerResult<()> {
//!     let addr: NetworkAddress = "worker-1:22000".parse()?;
//!     let runtime = RuntimeOptions::default().with_read_size(1 << 20);
//!     assert_eq!(addr.port, 22000);
//!     assert_eq!(runtime.read_size(), 1 << 20);
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at the crate root
pub use config::{ExplainLevel, PlannerConfig, QueryOptions, RuntimeOptions};
pub use error::{ErrorCode, PlannerError, PlannerResult};
pub use types::{NetworkAddress, PlanNodeId, SlotId, TupleId};
