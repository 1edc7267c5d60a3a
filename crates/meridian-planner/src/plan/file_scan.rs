//! Scan ranges over plain file splits.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use meridian_common::error::{PlannerError, PlannerResult};

use super::explain::print_bytes;
use super::scan::{parse_network_address, ScanRange, ScanRangeLocations, ScanRangeSource};

/// One split of a file, with replica hints as `"host:port"` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSplit {
    /// File path.
    pub path: String,
    /// Start offset in bytes.
    #[serde(default)]
    pub offset: u64,
    /// Length in bytes.
    pub length: u64,
    /// Hosts holding a replica.
    #[serde(default)]
    pub hosts: Vec<String>,
}

impl FileSplit {
    /// Creates a split with no locality hints.
    pub fn new(path: impl Into<String>, offset: u64, length: u64) -> Self {
        Self {
            path: path.into(),
            offset,
            length,
            hosts: Vec::new(),
        }
    }

    /// Adds a replica hint.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.hosts.push(host.into());
        self
    }
}

/// A [`ScanRangeSource`] backed by an explicit list of file splits.
#[derive(Debug, Clone, Default)]
pub struct FileScanSource {
    splits: Vec<FileSplit>,
}

impl FileScanSource {
    /// Creates a source from splits.
    pub fn new(splits: Vec<FileSplit>) -> Self {
        Self { splits }
    }

    /// Returns the splits.
    pub fn splits(&self) -> &[FileSplit] {
        &self.splits
    }

    /// Total bytes across all splits.
    pub fn total_bytes(&self) -> u64 {
        self.splits.iter().map(|s| s.length).sum()
    }
}

impl ScanRangeSource for FileScanSource {
    fn display_name(&self) -> &str {
        "SCAN FILE"
    }

    fn scan_range_locations(&self) -> PlannerResult<Vec<ScanRangeLocations>> {
        let mut seen = BTreeSet::new();
        let mut result = Vec::with_capacity(self.splits.len());
        for split in &self.splits {
            if !seen.insert((split.path.as_str(), split.offset)) {
                return Err(PlannerError::InvalidScanRanges {
                    message: format!(
                        "split {}@{} listed more than once",
                        split.path, split.offset
                    ),
                });
            }
            let locations = split
                .hosts
                .iter()
                .map(|h| parse_network_address(h))
                .collect::<PlannerResult<Vec<_>>>()?;
            result.push(ScanRangeLocations {
                scan_range: ScanRange {
                    path: split.path.clone(),
                    offset: split.offset,
                    length: split.length,
                },
                locations,
            });
        }
        Ok(result)
    }

    fn explain_detail(&self, detail_prefix: &str) -> String {
        format!(
            "{}splits={} size={}\n",
            detail_prefix,
            self.splits.len(),
            print_bytes(self.total_bytes())
        )
    }
}
