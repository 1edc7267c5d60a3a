//! Table and column statistics.

use serde::{Deserialize, Serialize};

/// Statistics for a single column.
///
/// Every field uses `-1` for "unknown", the convention of the metastore the
/// numbers come from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    /// Number of distinct values.
    pub num_distinct_values: i64,
    /// Number of NULLs.
    pub num_nulls: i64,
    /// Average serialized size in bytes.
    pub avg_size: f64,
    /// Maximum serialized size in bytes.
    pub max_size: i64,
}

impl Default for ColumnStats {
    fn default() -> Self {
        Self::unavailable()
    }
}

impl ColumnStats {
    /// Stats for a column that has never been analyzed.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self {
            num_distinct_values: -1,
            num_nulls: -1,
            avg_size: -1.0,
            max_size: -1,
        }
    }

    /// Creates stats with a known NDV and average size.
    #[must_use]
    pub const fn new(num_distinct_values: i64, avg_size: f64) -> Self {
        Self {
            num_distinct_values,
            num_nulls: -1,
            avg_size,
            max_size: -1,
        }
    }

    /// Sets the NULL count.
    #[must_use]
    pub const fn with_num_nulls(mut self, num_nulls: i64) -> Self {
        self.num_nulls = num_nulls;
        self
    }

    /// Sets the maximum size.
    #[must_use]
    pub const fn with_max_size(mut self, max_size: i64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Returns true if the column has been analyzed.
    #[inline]
    #[must_use]
    pub fn has_stats(&self) -> bool {
        self.num_distinct_values != -1
    }

    /// Returns the average size if known.
    #[inline]
    #[must_use]
    pub fn known_avg_size(&self) -> Option<f64> {
        (self.avg_size >= 0.0).then_some(self.avg_size)
    }
}
