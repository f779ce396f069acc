//! Address and 32-byte word types.

use crate::error::ChainError;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decodes a `0x`-prefixed hex string of exactly `N` bytes.
fn decode_fixed<const N: usize>(value: &str) -> Result<[u8; N], String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| "missing 0x prefix".to_string())?;
    if digits.len() != N * 2 {
        return Err(format!("expected {} hex digits, got {}", N * 2, digits.len()));
    }
    let mut bytes = [0u8; N];
    for (i, byte) in bytes.iter_mut().enumerate() {
        let pair = digits
            .get(i * 2..i * 2 + 2)
            .ok_or_else(|| "non-ascii input".to_string())?;
        if !pair.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("invalid hex digits '{pair}'"));
        }
        *byte = u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex digits '{pair}'"))?;
    }
    Ok(bytes)
}

/// Renders bytes as `0x`-prefixed lowercase hex.
#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// A 20-byte account or contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    /// Creates an address from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parses an address, reporting failures as [`ChainError`].
    ///
    /// # Errors
    ///
    /// Returns an error unless `value` is `0x` followed by 40 hex digits.
    pub fn parse(value: &str) -> Result<Self, Report<ChainError>> {
        value.parse().map_err(Report::from)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_hex(&self.0))
    }
}

impl FromStr for Address {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<20>(s)
            .map(Self)
            .map_err(|reason| ChainError::InvalidAddress {
                value: s.to_string(),
                reason,
            })
    }
}

impl TryFrom<String> for Address {
    type Error = ChainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

/// A 32-byte word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bytes32([u8; 32]);

impl Bytes32 {
    /// Creates a word from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Places an address in the high-order bytes, zero-filling the rest.
    #[must_use]
    pub fn right_padded(address: &Address) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..20].copy_from_slice(address.as_bytes());
        Self(bytes)
    }

    /// Places ASCII text in the high-order bytes, truncated to 32 bytes.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let mut bytes = [0u8; 32];
        let len = text.len().min(32);
        bytes[..len].copy_from_slice(&text.as_bytes()[..len]);
        Self(bytes)
    }

    /// Encodes an integer as a big-endian word.
    #[must_use]
    pub fn from_u128(value: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }
}

impl fmt::Display for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_hex(&self.0))
    }
}

impl FromStr for Bytes32 {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<32>(s)
            .map(Self)
            .map_err(|reason| ChainError::InvalidHex {
                value: s.to_string(),
                reason,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_case_and_displays_lowercase() {
        let address: Address = "0x26B831D2Bf4C41D6C942784aDD61D4414a777a63"
            .parse()
            .expect("valid");
        assert_eq!(
            address.to_string(),
            "0x26b831d2bf4c41d6c942784add61d4414a777a63"
        );
    }

    #[test]
    fn rejects_malformed_addresses() {
        for value in ["26b831d2bf4c41d6c942784add61d4414a777a63", "0x1234", "0xzz", ""] {
            assert!(value.parse::<Address>().is_err(), "{value}");
        }
        let err = Address::parse("0x12").unwrap_err();
        assert!(matches!(
            err.current_context(),
            ChainError::InvalidAddress { .. }
        ));
    }

    #[test]
    fn signed_hex_pairs_are_rejected() {
        let address = format!("0x+f{}", "00".repeat(19));
        assert!(address.parse::<Address>().is_err());
        let word = format!("0x+f{}", "00".repeat(31));
        assert!(word.parse::<Bytes32>().is_err());
        let word = format!("0x{}-1", "00".repeat(31));
        assert!(word.parse::<Bytes32>().is_err());
    }

    #[test]
    fn account_padded_to_bytes32() {
        let address: Address = "0x9f2b4eeb926d8de19289e93cbf524b6522397b05"
            .parse()
            .expect("valid");
        assert_eq!(
            Bytes32::right_padded(&address).to_string(),
            "0x9f2b4eeb926d8de19289e93cbf524b6522397b05000000000000000000000000"
        );
    }

    #[test]
    fn text_word_matches_protocol_tag() {
        assert_eq!(
            Bytes32::from_text("fujidao").to_string(),
            "0x66756a6964616f00000000000000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn bytes32_round_trips_through_text() {
        let word = Bytes32::from_u128(1);
        let parsed: Bytes32 = word.to_string().parse().expect("valid");
        assert_eq!(parsed, word);
        assert!(word.to_string().ends_with("01"));
    }

    #[test]
    fn address_serializes_as_string() {
        let json = serde_json::to_string(&Address::from_bytes([0xab; 20])).expect("serialize");
        assert_eq!(json, format!("\"0x{}\"", "ab".repeat(20)));
    }
}
