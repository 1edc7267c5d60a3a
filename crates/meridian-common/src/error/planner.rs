//! Planner error types.
//!
//! Every variant here is a planning failure: the current query cannot be
//! planned, but the process is healthy. Broken internal invariants (costs
//! computed before stats, a sort with more than one output tuple) are not
//! represented here; they panic.

use std::fmt;
use thiserror::Error;

use crate::types::{SlotId, TupleId};

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Invalid argument provided.
    InvalidArgument = 0x0003,
    /// General I/O error.
    Io = 0x0004,

    // Analysis errors (0x0100 - 0x01FF)
    /// Tuple id not present in the descriptor table.
    TupleNotFound = 0x0100,
    /// Slot id not present in the descriptor table.
    SlotNotFound = 0x0101,
    /// Conjunct could not be bound to any plan node.
    UnresolvedConjunct = 0x0102,

    // Configuration errors (0x0200 - 0x02FF)
    /// Invalid configuration value.
    InvalidConfig = 0x0200,
    /// Configuration file could not be parsed.
    ConfigParse = 0x0201,

    // Plan errors (0x0300 - 0x03FF)
    /// Malformed `host:port` string.
    InvalidAddress = 0x0300,
    /// Scan ranges violate the exactly-once contract.
    InvalidScanRanges = 0x0301,
    /// Query planning failed.
    PlanningFailed = 0x0302,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "Analysis",
            0x02 => "Config",
            0x03 => "Plan",
            _ => "Reserved",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The planning error type.
///
/// # Example
///
/// ```rust
/// use meridian_common::error::{PlannerError, PlannerResult};
/// use meridian_common::types::TupleId;
///
/// fn lookup(tuple_id: TupleId) -> PlannerResult<()> {
///     Err(PlannerError::TupleNotFound { tuple_id })
/// }
/// assert!(lookup(TupleId::new(3)).is_err());
/// ```
#[derive(Debug, Error)]
pub enum PlannerError {
    // ==========================================================================
    // General Errors
    // ==========================================================================
    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Error message.
        message: String,
    },

    /// I/O error from the underlying system.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    // ==========================================================================
    // Analysis Errors
    // ==========================================================================
    /// Tuple id unknown to the descriptor table.
    #[error("tuple {tuple_id} not found in descriptor table")]
    TupleNotFound {
        /// The missing tuple.
        tuple_id: TupleId,
    },

    /// Slot id unknown to the descriptor table.
    #[error("slot {slot_id} not found in descriptor table")]
    SlotNotFound {
        /// The missing slot.
        slot_id: SlotId,
    },

    /// A conjunct references tuples that no node in the plan produces.
    #[error("conjunct '{conjunct}' could not be bound: {reason}")]
    UnresolvedConjunct {
        /// SQL text of the conjunct.
        conjunct: String,
        /// Reason binding failed.
        reason: String,
    },

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },

    /// Configuration text could not be parsed.
    #[error("failed to parse configuration: {source}")]
    ConfigParse {
        /// The underlying TOML error.
        #[from]
        source: toml::de::Error,
    },

    // ==========================================================================
    // Plan Errors
    // ==========================================================================
    /// A `host:port` string could not be parsed.
    #[error("invalid network address '{address}': {reason}")]
    InvalidAddress {
        /// The offending string.
        address: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Scan ranges produced by a source break the exactly-once contract.
    #[error("invalid scan ranges: {message}")]
    InvalidScanRanges {
        /// Error message.
        message: String,
    },

    /// Query planning failed.
    #[error("query planning failed: {reason}")]
    PlanningFailed {
        /// Reason for failure.
        reason: String,
    },
}

impl PlannerError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Self::Io { .. } => ErrorCode::Io,
            Self::TupleNotFound { .. } => ErrorCode::TupleNotFound,
            Self::SlotNotFound { .. } => ErrorCode::SlotNotFound,
            Self::UnresolvedConjunct { .. } => ErrorCode::UnresolvedConjunct,
            Self::InvalidConfig { .. } => ErrorCode::InvalidConfig,
            Self::ConfigParse { .. } => ErrorCode::ConfigParse,
            Self::InvalidAddress { .. } => ErrorCode::InvalidAddress,
            Self::InvalidScanRanges { .. } => ErrorCode::InvalidScanRanges,
            Self::PlanningFailed { .. } => ErrorCode::PlanningFailed,
        }
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an invalid address error.
    #[must_use]
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = PlannerError::TupleNotFound {
            tuple_id: TupleId::new(42),
        };
        assert_eq!(err.code(), ErrorCode::TupleNotFound);
        assert_eq!(err.code().category(), "Analysis");
        assert_eq!(ErrorCode::InvalidAddress.category(), "Plan");
        assert_eq!(ErrorCode::InvalidAddress.as_u16(), 0x0300);
    }

    #[test]
    fn test_error_display() {
        let err = PlannerError::SlotNotFound {
            slot_id: SlotId::new(5),
        };
        assert_eq!(err.to_string(), "slot 5 not found in descriptor table");

        let err = PlannerError::invalid_address("nohost", "missing ':' separator");
        assert_eq!(
            err.to_string(),
            "invalid network address 'nohost': missing ':' separator"
        );
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PlannerError = io_err.into();
        assert_eq!(err.code(), ErrorCode::Io);
    }
}
