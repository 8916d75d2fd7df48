//! Domain primitives: TimeSec, Address, TxHash, LoanId.

use serde::{Deserialize, Serialize};

/// Time in seconds since Unix epoch (ledger block time resolution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeSec(pub i64);

impl TimeSec {
    /// Create a TimeSec from seconds.
    pub fn new(secs: i64) -> Self {
        TimeSec(secs)
    }

    /// Get the underlying seconds value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Saturating difference in seconds (`self - earlier`).
    pub fn secs_since(&self, earlier: TimeSec) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Ledger address (0x-prefixed hex string).
///
/// Normalized to lowercase on construction so map keys and topic filters
/// compare consistently regardless of the checksum casing a caller passes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Create an Address from a string, normalizing to lowercase.
    pub fn new(addr: impl Into<String>) -> Self {
        Address(addr.into().to_lowercase())
    }

    /// Get the address as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex digits without the 0x prefix.
    pub fn hex_digits(&self) -> &str {
        self.0.strip_prefix("0x").unwrap_or(&self.0)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Address {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Address::new(s))
    }
}

/// Transaction hash (0x-prefixed hex string), half of the event dedup key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxHash(String);

impl TxHash {
    /// Create a TxHash from a string, normalizing to lowercase.
    pub fn new(hash: impl Into<String>) -> Self {
        TxHash(hash.into().to_lowercase())
    }

    /// Get the hash as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Loan identity, assigned by the ledger at creation. Immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LoanId(pub u64);

impl LoanId {
    /// Create a LoanId.
    pub fn new(id: u64) -> Self {
        LoanId(id)
    }

    /// Get the underlying id value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for LoanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_normalizes_case() {
        let a = Address::new("0xAbCd12");
        let b = Address::new("0xabcd12");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "0xabcd12");
    }

    #[test]
    fn test_address_hex_digits_strips_prefix() {
        let a = Address::new("0xabcd12");
        assert_eq!(a.hex_digits(), "abcd12");
    }

    #[test]
    fn test_txhash_normalizes_case() {
        let h = TxHash::new("0xFF00");
        assert_eq!(h.as_str(), "0xff00");
    }

    #[test]
    fn test_timesec_ordering() {
        let t1 = TimeSec::new(1000);
        let t2 = TimeSec::new(2000);
        assert!(t1 < t2);
        assert_eq!(t2.secs_since(t1), 1000);
    }

    #[test]
    fn test_loan_id_display() {
        assert_eq!(LoanId::new(7).to_string(), "7");
    }
}
