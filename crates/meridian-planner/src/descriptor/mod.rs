//! Schema and statistics descriptors.
//!
//! Analysis produces a [`DescriptorTable`]: tuples (row shapes), their
//! slots, the base tables behind scanned tuples, and column statistics.
//! The planner reads it through `Arc` and never mutates it; derived facts
//! such as the in-memory [`TupleLayout`] live on the plan nodes instead.

mod layout;
mod stats;
mod table;
mod types;

pub use layout::{compute_mem_layout, SlotPosition, TupleLayout};
pub use stats::ColumnStats;
pub use table::{
    DescriptorTable, DescriptorTableBuilder, SlotDescriptor, SlotSpec, TableDescriptor,
    TupleDescriptor,
};
pub use types::ColumnType;
