//! System-wide constants for the planner.
//!
//! This module defines byte units, I/O sizing defaults, and the in-memory
//! slot sizes the tuple layout is computed from.

// =============================================================================
// Byte Units
// =============================================================================

/// One kibibyte.
pub const KILOBYTE: u64 = 1024;

/// One mebibyte.
pub const MEGABYTE: u64 = 1024 * KILOBYTE;

/// One gibibyte.
pub const GIGABYTE: u64 = 1024 * MEGABYTE;

/// One tebibyte.
pub const TERABYTE: u64 = 1024 * GIGABYTE;

// =============================================================================
// I/O Sizing
// =============================================================================

/// Default I/O read size in bytes (8 MB).
///
/// The external sorter allocates blocks of exactly this size, so it is also
/// the unit of the sort memory estimate.
pub const DEFAULT_READ_SIZE: u64 = 8 * MEGABYTE;

/// Minimum accepted read size (64 KB).
pub const MIN_READ_SIZE: u64 = 64 * KILOBYTE;

/// Maximum accepted read size (1 GB).
pub const MAX_READ_SIZE: u64 = GIGABYTE;

// =============================================================================
// Slot Sizes
// =============================================================================

/// In-tuple size of a variable-length value (pointer + length).
pub const STRING_VALUE_SIZE: usize = 16;

/// In-tuple size of a timestamp (time of day nanos + date).
pub const TIMESTAMP_VALUE_SIZE: usize = 16;

/// Largest alignment the tuple layout applies to a slot.
pub const MAX_SLOT_ALIGNMENT: usize = 8;

/// Sentinel for an unknown cardinality or row count.
pub const UNKNOWN_CARDINALITY: i64 = -1;
