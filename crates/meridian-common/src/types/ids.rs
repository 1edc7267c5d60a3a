//! Core identifier types for the planner.
//!
//! These types provide type-safe wrappers around numeric identifiers,
//! preventing accidental misuse of plan node, tuple, and slot ids.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Plan node identifier - unique within a single plan.
///
/// # Example
///
/// ```rust
/// use meridian_common::types::PlanNodeId;
///
/// let id = PlanNodeId::new(3);
/// assert_eq!(id.as_u32(), 3);
/// assert_eq!(id.to_string(), "03");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PlanNodeId(u32);

impl PlanNodeId {
    /// First id handed out by a plan id generator.
    pub const FIRST: Self = Self(0);

    /// Creates a new `PlanNodeId` from a raw u32 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw u32 value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the next plan node id.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Debug for PlanNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlanNodeId({})", self.0)
    }
}

/// Plan node ids render zero-padded to two digits, the form used in
/// explain output (`01:SORT`).
impl fmt::Display for PlanNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl From<u32> for PlanNodeId {
    #[inline]
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

impl From<PlanNodeId> for u32 {
    #[inline]
    fn from(id: PlanNodeId) -> Self {
        id.0
    }
}

/// Tuple identifier - identifies a row shape in the descriptor table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TupleId(u32);

impl TupleId {
    /// Creates a new `TupleId` from a raw u32 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw u32 value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for TupleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TupleId({})", self.0)
    }
}

impl fmt::Display for TupleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TupleId {
    #[inline]
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

/// Slot identifier - identifies one slot across all tuples of a query.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SlotId(u32);

impl SlotId {
    /// Creates a new `SlotId` from a raw u32 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw u32 value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotId({})", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SlotId {
    #[inline]
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}
