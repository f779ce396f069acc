//! Calldata for the contract calls the top-up pipeline makes.
//!
//! Every argument involved is a static type, so encoding is a selector
//! followed by one 32-byte word per argument, tuples inlined.

use crate::address::{Address, Bytes32};
use crate::error::ChainError;
use rootcause::Report;

/// `approve(address,uint256)`.
pub const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];
/// `balanceOf(address)`.
pub const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];
/// `exchangeRate()`.
pub const EXCHANGE_RATE_SELECTOR: [u8; 4] = [0x3b, 0xa0, 0xb9, 0xa9];
/// `register(bytes32,bytes32,uint128,(uint64,uint64,uint64,address,address,uint128,uint128,uint128,bytes32))`.
pub const REGISTER_SELECTOR: [u8; 4] = [0x7b, 0xaf, 0x9e, 0x94];

/// Builds calldata word by word.
#[derive(Debug, Clone)]
pub struct CallEncoder {
    data: Vec<u8>,
}

impl CallEncoder {
    /// Starts calldata for a function selector.
    #[must_use]
    pub fn new(selector: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(4 + 32 * 12);
        data.extend_from_slice(&selector);
        Self { data }
    }

    /// Appends an address, left-padded.
    #[must_use]
    pub fn address(mut self, address: &Address) -> Self {
        self.data.extend_from_slice(&[0u8; 12]);
        self.data.extend_from_slice(address.as_bytes());
        self
    }

    /// Appends an unsigned integer.
    #[must_use]
    pub fn uint(mut self, value: u128) -> Self {
        self.data.extend_from_slice(Bytes32::from_u128(value).as_bytes());
        self
    }

    /// Appends a raw word.
    #[must_use]
    pub fn word(mut self, word: &Bytes32) -> Self {
        self.data.extend_from_slice(word.as_bytes());
        self
    }

    /// Returns the encoded calldata.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}

/// Calldata for `approve(spender, amount)`.
#[must_use]
pub fn approve(spender: &Address, amount: u128) -> Vec<u8> {
    CallEncoder::new(APPROVE_SELECTOR)
        .address(spender)
        .uint(amount)
        .finish()
}

/// Calldata for `balanceOf(owner)`.
#[must_use]
pub fn balance_of(owner: &Address) -> Vec<u8> {
    CallEncoder::new(BALANCE_OF_SELECTOR).address(owner).finish()
}

/// Calldata for `exchangeRate()`.
#[must_use]
pub fn exchange_rate() -> Vec<u8> {
    CallEncoder::new(EXCHANGE_RATE_SELECTOR).finish()
}

/// Decodes a single `uint256` return value that must fit in a `u128`.
///
/// # Errors
///
/// Returns an error if the data is not a hex word or the value exceeds `u128`.
pub fn decode_uint(data: &str) -> Result<u128, Report<ChainError>> {
    let word: Bytes32 = data.parse()?;
    let bytes = word.as_bytes();
    if bytes[..16].iter().any(|b| *b != 0) {
        return Err(ChainError::AmountOverflow {
            what: format!("return value {data}"),
        }
        .into());
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&bytes[16..]);
    Ok(u128::from_be_bytes(low))
}
