//! Physical plan nodes.
//!
//! A [`PlanTree`] owns its nodes; [`PlanNode`] carries the state every
//! operator shares and dispatches the rest to [`PlanNodeKind`].

mod explain;
mod file_scan;
mod node;
mod scan;
mod sort;
mod tree;

pub use explain::{print_bytes, print_cardinality};
pub use file_scan::{FileScanSource, FileSplit};
pub use node::{NodeIndex, Phase, PlanNode, PlanNodeKind};
pub use scan::{
    parse_network_address, ScanNode, ScanRange, ScanRangeLocations, ScanRangeSource,
    DEFAULT_SELECTIVITY,
};
pub use sort::{external_sort_mem_cost, top_n_mem_cost, SortInfo, SortNode};
pub use tree::PlanTree;
