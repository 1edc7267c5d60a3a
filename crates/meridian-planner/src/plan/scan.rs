//! Scan node: access to one base table.
//!
//! The node itself only knows the scanned tuple and its statistics. Where
//! the data lives and which hosts hold it comes from a [`ScanRangeSource`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use meridian_common::constants::UNKNOWN_CARDINALITY;
use meridian_common::error::PlannerResult;
use meridian_common::types::NetworkAddress;

use crate::descriptor::{TableDescriptor, TupleDescriptor};

/// Fraction of rows assumed to pass one conjunct.
pub const DEFAULT_SELECTIVITY: f64 = 0.1;

/// A contiguous byte range of one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanRange {
    /// File path.
    pub path: String,
    /// Start offset in bytes.
    pub offset: u64,
    /// Length in bytes.
    pub length: u64,
}

/// A scan range and the hosts that can read it locally.
///
/// An empty `locations` list means any host may read the range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRangeLocations {
    /// The range.
    pub scan_range: ScanRange,
    /// Candidate hosts.
    pub locations: Vec<NetworkAddress>,
}

/// Produces the scan ranges of a table access.
///
/// Implementations must return every range of the scanned data exactly once.
pub trait ScanRangeSource: Send + Sync + fmt::Debug {
    /// Name printed in explain headers, e.g. `SCAN FILE`.
    fn display_name(&self) -> &str;

    /// Returns all scan ranges with their candidate hosts.
    fn scan_range_locations(&self) -> PlannerResult<Vec<ScanRangeLocations>>;

    /// Returns source-specific explain lines, each starting with
    /// `detail_prefix` and ending with a newline.
    fn explain_detail(&self, detail_prefix: &str) -> String;
}

/// Parses a `"host:port"` locality hint.
pub fn parse_network_address(address: &str) -> PlannerResult<NetworkAddress> {
    address.parse()
}

/// Operator payload of a scan.
#[derive(Debug, Clone)]
pub struct ScanNode {
    tuple: Arc<TupleDescriptor>,
    table: Arc<TableDescriptor>,
    source: Arc<dyn ScanRangeSource>,
}

impl ScanNode {
    pub(crate) fn new(
        tuple: Arc<TupleDescriptor>,
        table: Arc<TableDescriptor>,
        source: Arc<dyn ScanRangeSource>,
    ) -> Self {
        Self {
            tuple,
            table,
            source,
        }
    }

    /// Returns the scanned tuple.
    pub fn tuple(&self) -> &Arc<TupleDescriptor> {
        &self.tuple
    }

    /// Returns the scanned table.
    pub fn table(&self) -> &TableDescriptor {
        &self.table
    }

    /// Returns the scan range source.
    pub fn source(&self) -> &Arc<dyn ScanRangeSource> {
        &self.source
    }

    /// Returns all scan ranges with their candidate hosts.
    pub fn scan_range_locations(&self) -> PlannerResult<Vec<ScanRangeLocations>> {
        self.source.scan_range_locations()
    }

    /// Returns true if the table row count is unknown or any materialized
    /// slot of the scanned tuple lacks column stats.
    pub fn is_table_missing_stats(&self) -> bool {
        !self.table.has_row_count() || self.tuple.materialized_slots().any(|s| !s.stats.has_stats())
    }

    /// Renders the table and column stats lines, each starting with `prefix`.
    ///
    /// The second line carries no trailing newline.
    pub fn stats_explain_text(&self, prefix: &str) -> String {
        let mut output = if self.table.has_row_count() {
            format!("{}table stats: {} rows total\n", prefix, self.table.num_rows)
        } else {
            format!("{}table stats: unavailable\n", prefix)
        };

        let slots: Vec<_> = self.tuple.materialized_slots().collect();
        let missing: Vec<&str> = slots
            .iter()
            .filter(|s| !s.stats.has_stats())
            .map(|s| s.display_name())
            .collect();
        if missing.is_empty() {
            output.push_str(&format!("{}column stats: all", prefix));
        } else if missing.len() == slots.len() {
            output.push_str(&format!("{}column stats: unavailable", prefix));
        } else {
            output.push_str(&format!(
                "{}columns missing stats: {}",
                prefix,
                missing.join(", ")
            ));
        }
        output
    }

    /// Estimates output rows before any limit: the table row count reduced by
    /// [`DEFAULT_SELECTIVITY`] per conjunct.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_possible_wrap)]
    pub(crate) fn estimate_cardinality(&self, num_conjuncts: usize) -> i64 {
        if !self.table.has_row_count() {
            return UNKNOWN_CARDINALITY;
        }
        let selectivity = DEFAULT_SELECTIVITY.powi(num_conjuncts as i32);
        (self.table.num_rows as f64 * selectivity).round() as i64
    }

    /// Counts the distinct hosts named by the scan ranges, at least one.
    pub(crate) fn num_hosts(&self) -> PlannerResult<u32> {
        let hosts: BTreeSet<NetworkAddress> = self
            .scan_range_locations()?
            .into_iter()
            .flat_map(|l| l.locations)
            .collect();
        Ok(u32::try_from(hosts.len()).unwrap_or(u32::MAX).max(1))
    }

    pub(crate) fn debug_fields(&self) -> String {
        format!("tid={} tbl_name={}", self.tuple.id, self.table.name)
    }
}
