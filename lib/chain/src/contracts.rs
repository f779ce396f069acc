//! Fixed on-chain collaborators of the top-up automation.

use crate::address::{Address, Bytes32};

const fn address(bytes: [u8; 20]) -> Address {
    Address::from_bytes(bytes)
}

/// LP token deposited into the automation (`0x9f2b4eeb926d8de19289e93cbf524b6522397b05`).
pub const LP_TOKEN: Address = address([
    0x9f, 0x2b, 0x4e, 0xeb, 0x92, 0x6d, 0x8d, 0xe1, 0x92, 0x89, 0xe9, 0x3c, 0xbf, 0x52, 0x4b, 0x65,
    0x22, 0x39, 0x7b, 0x05,
]);

/// Deposit pool issuing the LP token (`0xCE7cb549c42Ba8a6654AdE82f3d77D6F7d2BCD78`).
pub const DEPOSIT_POOL: Address = address([
    0xce, 0x7c, 0xb5, 0x49, 0xc4, 0x2b, 0xa8, 0xa6, 0x65, 0x4a, 0xde, 0x82, 0xf3, 0xd7, 0x7d, 0x6f,
    0x7d, 0x2b, 0xcd, 0x78,
]);

/// Price oracle (`0x707c7C644a733E71E97C54Ee0F9686468d74b9B4`).
pub const ORACLE: Address = address([
    0x70, 0x7c, 0x7c, 0x64, 0x4a, 0x73, 0x3e, 0x71, 0xe9, 0x7c, 0x54, 0xee, 0x0f, 0x96, 0x86, 0x46,
    0x8d, 0x74, 0xb9, 0xb4,
]);

/// Token the automation tops positions up with (`0x9c1dcacb57ada1e9e2d3a8280b7cfc7eb936186f`).
pub const ACTION_TOKEN: Address = address([
    0x9c, 0x1d, 0xca, 0xcb, 0x57, 0xad, 0xa1, 0xe9, 0xe2, 0xd3, 0xa8, 0x28, 0x0b, 0x7c, 0xfc, 0x7e,
    0xb9, 0x36, 0x18, 0x6f,
]);

/// Top-up action contract (`0x26B831D2Bf4C41D6C942784aDD61D4414a777a63`).
pub const TOPUP_ACTION: Address = address([
    0x26, 0xb8, 0x31, 0xd2, 0xbf, 0x4c, 0x41, 0xd6, 0xc9, 0x42, 0x78, 0x4a, 0xdd, 0x61, 0xd4, 0x41,
    0x4a, 0x77, 0x7a, 0x63,
]);

/// Protocol tag registered with the top-up action contract.
pub const PROTOCOL_TAG: &str = "fujidao";

/// Returns [`PROTOCOL_TAG`] as a bytes32 word.
#[must_use]
pub fn protocol_tag() -> Bytes32 {
    Bytes32::from_text(PROTOCOL_TAG)
}

/// Wei sent with the registration to cover the keeper's gas.
pub const REGISTRATION_GAS_DEPOSIT: u128 = 1_000_000_000_000;

/// Decimals of the LP token and of the health factor threshold.
pub const TOKEN_DECIMALS: u32 = 18;
