//! Column types as seen by the planner.
//!
//! The planner only needs two facts about a type: how many bytes its slot
//! occupies inside a tuple, and whether its payload is fixed- or
//! variable-length.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use meridian_common::constants::{STRING_VALUE_SIZE, TIMESTAMP_VALUE_SIZE};
use meridian_common::error::PlannerError;

/// Scalar column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// Boolean.
    Boolean,
    /// 8-bit signed integer.
    TinyInt,
    /// 16-bit signed integer.
    SmallInt,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    BigInt,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Fixed-point decimal.
    Decimal {
        /// Total digits.
        precision: u8,
        /// Digits after the decimal point.
        scale: u8,
    },
    /// Calendar date.
    Date,
    /// Timestamp.
    Timestamp,
    /// Fixed-length, blank-padded string.
    Char(u32),
    /// Bounded variable-length string.
    Varchar(u32),
    /// Unbounded string.
    String,
    /// Unbounded binary.
    Binary,
}

impl ColumnType {
    /// Returns the number of bytes a slot of this type occupies in a tuple.
    #[must_use]
    pub fn slot_size(&self) -> usize {
        match self {
            ColumnType::Boolean | ColumnType::TinyInt => 1,
            ColumnType::SmallInt => 2,
            ColumnType::Int | ColumnType::Float | ColumnType::Date => 4,
            ColumnType::BigInt | ColumnType::Double => 8,
            ColumnType::Decimal { precision, .. } => match precision {
                0..=9 => 4,
                10..=18 => 8,
                _ => 16,
            },
            ColumnType::Timestamp => TIMESTAMP_VALUE_SIZE,
            ColumnType::Char(len) => *len as usize,
            ColumnType::Varchar(_) | ColumnType::String | ColumnType::Binary => STRING_VALUE_SIZE,
        }
    }

    /// Returns true if values of this type are stored entirely in the slot.
    #[must_use]
    pub fn is_fixed_length(&self) -> bool {
        !matches!(
            self,
            ColumnType::Varchar(_) | ColumnType::String | ColumnType::Binary
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Boolean => write!(f, "BOOLEAN"),
            ColumnType::TinyInt => write!(f, "TINYINT"),
            ColumnType::SmallInt => write!(f, "SMALLINT"),
            ColumnType::Int => write!(f, "INT"),
            ColumnType::BigInt => write!(f, "BIGINT"),
            ColumnType::Float => write!(f, "FLOAT"),
            ColumnType::Double => write!(f, "DOUBLE"),
            ColumnType::Decimal { precision, scale } => {
                write!(f, "DECIMAL({},{})", precision, scale)
            }
            ColumnType::Date => write!(f, "DATE"),
            ColumnType::Timestamp => write!(f, "TIMESTAMP"),
            ColumnType::Char(len) => write!(f, "CHAR({})", len),
            ColumnType::Varchar(len) => write!(f, "VARCHAR({})", len),
            ColumnType::String => write!(f, "STRING"),
            ColumnType::Binary => write!(f, "BINARY"),
        }
    }
}

impl FromStr for ColumnType {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let (name, args) = match normalized.split_once('(') {
            Some((name, rest)) => {
                let args = rest.strip_suffix(')').ok_or_else(|| {
                    PlannerError::invalid_argument(format!("unterminated type '{s}'"))
                })?;
                (name.trim(), Some(args))
            }
            None => (normalized.as_str(), None),
        };

        let parse_len = |args: Option<&str>| -> Result<u32, PlannerError> {
            args.ok_or_else(|| PlannerError::invalid_argument(format!("type '{s}' needs a length")))?
                .trim()
                .parse::<u32>()
                .map_err(|e| PlannerError::invalid_argument(format!("bad length in '{s}': {e}")))
        };

        let ty = match (name, args) {
            ("boolean" | "bool", None) => ColumnType::Boolean,
            ("tinyint", None) => ColumnType::TinyInt,
            ("smallint", None) => ColumnType::SmallInt,
            ("int" | "integer", None) => ColumnType::Int,
            ("bigint", None) => ColumnType::BigInt,
            ("float", None) => ColumnType::Float,
            ("double", None) => ColumnType::Double,
            ("date", None) => ColumnType::Date,
            ("timestamp", None) => ColumnType::Timestamp,
            ("string", None) => ColumnType::String,
            ("binary", None) => ColumnType::Binary,
            ("char", args) => ColumnType::Char(parse_len(args)?),
            ("varchar", args) => ColumnType::Varchar(parse_len(args)?),
            ("decimal", None) => ColumnType::Decimal {
                precision: 9,
                scale: 0,
            },
            ("decimal", Some(args)) => {
                let mut parts = args.split(',').map(|p| p.trim().parse::<u8>());
                let precision = parts.next().and_then(Result::ok);
                let scale = parts.next().map_or(Some(0), Result::ok);
                match (precision, scale, parts.next()) {
                    (Some(precision), Some(scale), None) if scale <= precision => {
                        ColumnType::Decimal { precision, scale }
                    }
                    _ => {
                        return Err(PlannerError::invalid_argument(format!(
                            "bad decimal type '{s}'"
                        )))
                    }
                }
            }
            _ => {
                return Err(PlannerError::invalid_argument(format!(
                    "unknown column type '{s}'"
                )))
            }
        };
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_sizes() {
        assert_eq!(ColumnType::Boolean.slot_size(), 1);
        assert_eq!(ColumnType::SmallInt.slot_size(), 2);
        assert_eq!(ColumnType::Int.slot_size(), 4);
        assert_eq!(ColumnType::BigInt.slot_size(), 8);
        assert_eq!(ColumnType::Timestamp.slot_size(), 16);
        assert_eq!(ColumnType::String.slot_size(), 16);
        assert_eq!(ColumnType::Char(3).slot_size(), 3);
        assert_eq!(
            ColumnType::Decimal {
                precision: 38,
                scale: 2
            }
            .slot_size(),
            16
        );
    }

    #[test]
    fn test_fixed_length() {
        assert!(ColumnType::BigInt.is_fixed_length());
        assert!(ColumnType::Char(10).is_fixed_length());
        assert!(ColumnType::Timestamp.is_fixed_length());
        assert!(!ColumnType::String.is_fixed_length());
        assert!(!ColumnType::Varchar(20).is_fixed_length());
    }

    #[test]
    fn test_parse() {
        assert_eq!("BIGINT".parse::<ColumnType>().unwrap(), ColumnType::BigInt);
        assert_eq!(
            "varchar(25)".parse::<ColumnType>().unwrap(),
            ColumnType::Varchar(25)
        );
        assert_eq!(
            "decimal(12, 2)".parse::<ColumnType>().unwrap(),
            ColumnType::Decimal {
                precision: 12,
                scale: 2
            }
        );
        assert!("varchar".parse::<ColumnType>().is_err());
        assert!("decimal(2,5)".parse::<ColumnType>().is_err());
        assert!("geometry".parse::<ColumnType>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let ty = ColumnType::Decimal {
            precision: 10,
            scale: 3,
        };
        assert_eq!(ty.to_string().parse::<ColumnType>().unwrap(), ty);
    }
}
