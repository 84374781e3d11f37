//! # Domain Services
//!
//! Pure functions used by the diamond: hashing, selector derivation,
//! calldata splitting and deterministic address derivation.
//!
//! ## Architecture Compliance
//!
//! - NO I/O operations
//! - NO async code
//! - Pure functions only

use crate::domain::value_objects::{Address, Bytes, Selector};
use sha3::{Digest, Keccak256};

// =============================================================================
// KECCAK256 UTILITY
// =============================================================================

/// Computes keccak256 hash of data.
#[must_use]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

// =============================================================================
// SELECTORS
// =============================================================================

/// Computes the 4-byte selector of a canonical function signature.
///
/// Selector = keccak256(signature)\[0:4\]
#[must_use]
pub fn function_selector(signature: &str) -> Selector {
    let hash = keccak256(signature.as_bytes());
    Selector::new([hash[0], hash[1], hash[2], hash[3]])
}

/// Splits raw calldata into its selector and argument payload.
///
/// Returns `None` when the calldata is shorter than a selector.
#[must_use]
pub fn split_calldata(calldata: &[u8]) -> Option<(Selector, Bytes)> {
    if calldata.len() < 4 {
        return None;
    }
    let selector = Selector::new([calldata[0], calldata[1], calldata[2], calldata[3]]);
    Some((selector, Bytes::from_slice(&calldata[4..])))
}

/// Joins a selector and argument payload into raw calldata.
#[must_use]
pub fn join_calldata(selector: Selector, payload: &[u8]) -> Bytes {
    let mut data = Vec::with_capacity(4 + payload.len());
    data.extend_from_slice(selector.as_bytes());
    data.extend_from_slice(payload);
    Bytes::from_vec(data)
}

// =============================================================================
// CONTRACT ADDRESS COMPUTATION
// =============================================================================

/// Computes the address a deployer's `nonce`-th deployment lands at.
///
/// Address = keccak256(rlp(\[sender, nonce\]))\[12:\]
///
/// Per Ethereum Yellow Paper, section 7. Used to give the diamond and its
/// facets deterministic addresses at deployment time.
#[must_use]
pub fn compute_contract_address(sender: Address, nonce: u64) -> Address {
    let mut content = Vec::with_capacity(32);

    // RLP encode address (20 bytes, 0x80 + 20 = 0x94)
    content.push(0x94);
    content.extend_from_slice(sender.as_bytes());

    // RLP encode nonce
    if nonce == 0 {
        content.push(0x80);
    } else if nonce < 128 {
        content.push(nonce as u8);
    } else {
        let nonce_bytes = strip_leading_zeros(nonce);
        content.push(0x80 + nonce_bytes.len() as u8);
        content.extend_from_slice(&nonce_bytes);
    }

    // Content is at most 30 bytes, so the short list header always applies.
    let mut rlp_data = Vec::with_capacity(content.len() + 1);
    rlp_data.push(0xc0 + content.len() as u8);
    rlp_data.extend_from_slice(&content);

    let hash = keccak256(&rlp_data);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..32]);
    Address::new(addr)
}

fn strip_leading_zeros(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(7);
    bytes[start..].to_vec()
}

// =============================================================================
// TESTS
// =============================================================================
