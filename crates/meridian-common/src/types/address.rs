//! Structured worker network addresses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PlannerError;

/// A worker address as consumed by the execution coordinator.
///
/// Data-locality hints are usually recorded as `"host:port"` strings; use
/// [`str::parse`] to convert them.
///
/// # Example
///
/// ```rust
/// use meridian_common::types::NetworkAddress;
///
/// let addr: NetworkAddress = "worker-3:22000".parse().unwrap();
/// assert_eq!(addr.hostname, "worker-3");
/// assert_eq!(addr.port, 22000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetworkAddress {
    /// Host name or IP literal.
    pub hostname: String,
    /// Port number.
    pub port: u16,
}

impl NetworkAddress {
    /// Creates a new address.
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
        }
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hostname, self.port)
    }
}

impl FromStr for NetworkAddress {
    type Err = PlannerError;

    /// Splits on the last `:` so bracketed IPv6 literals keep their colons.
    fn from_str(address: &str) -> Result<Self, Self::Err> {
        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| PlannerError::invalid_address(address, "missing ':' separator"))?;
        if host.is_empty() {
            return Err(PlannerError::invalid_address(address, "empty host"));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| PlannerError::invalid_address(address, format!("bad port: {e}")))?;
        Ok(Self::new(host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_parse_host_port() {
        let addr: NetworkAddress = "10.0.0.7:22000".parse().unwrap();
        assert_eq!(addr, NetworkAddress::new("10.0.0.7", 22000));
        assert_eq!(addr.to_string(), "10.0.0.7:22000");
    }

    #[test]
    fn test_parse_ipv6_literal() {
        let addr: NetworkAddress = "[::1]:9000".parse().unwrap();
        assert_eq!(addr.hostname, "[::1]");
        assert_eq!(addr.port, 9000);
    }

    #[test]
    fn test_parse_missing_separator() {
        let err = "worker-1".parse::<NetworkAddress>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAddress);
        assert!(err.to_string().contains("worker-1"));
    }

    #[test]
    fn test_parse_bad_port() {
        assert!("worker-1:http".parse::<NetworkAddress>().is_err());
        assert!("worker-1:70000".parse::<NetworkAddress>().is_err());
        assert!("worker-1:".parse::<NetworkAddress>().is_err());
        assert!(":8080".parse::<NetworkAddress>().is_err());
    }
}
