//! Solidity ABI helpers
//!
//! Calldata is assembled by hand from 32-byte words, the same way the EVM relay code builds
//! its calls. Decoders check every offset and length against the buffer and return an error
//! instead of panicking on short or hostile input.

use crate::address::TronAddress;
use anyhow::{bail, Result};
use ethereum_types::U256;
use sha3::{Digest, Keccak256};

pub const WORD: usize = 32;

/// First four bytes of `keccak256(signature)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Full `keccak256(signature)`, the topic-0 of an event.
pub fn event_topic(signature: &str) -> [u8; 32] {
    Keccak256::digest(signature.as_bytes()).into()
}

/// Left-pads the 20-byte EVM view of an address into a word.
pub fn encode_address(address: &TronAddress) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&address.evm_bytes());
    word
}

pub fn encode_u256(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

pub fn encode_usize(value: usize) -> [u8; 32] {
    encode_u256(U256::from(value))
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD) * WORD
}

fn push_padded(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(bytes);
    out.resize(out.len() + padded_len(bytes.len()) - bytes.len(), 0);
}

/// Encodes a `bytes32[]` as the tail of a dynamic argument (length word followed by elements).
pub fn encode_bytes32_array(items: &[[u8; 32]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(WORD * (items.len() + 1));
    out.extend_from_slice(&encode_usize(items.len()));
    for item in items {
        out.extend_from_slice(item);
    }
    out
}

/// Encodes a `bytes[]` as the tail of a dynamic argument.
///
/// Layout: length word, one offset word per element (relative to the first offset word),
/// then each element as a length word plus right-padded data.
pub fn encode_bytes_array(items: &[Vec<u8>]) -> Vec<u8> {
    let mut heads = Vec::with_capacity(WORD * items.len());
    let mut tails = Vec::new();
    let head_size = WORD * items.len();
    for item in items {
        heads.extend_from_slice(&encode_usize(head_size + tails.len()));
        tails.extend_from_slice(&encode_usize(item.len()));
        push_padded(&mut tails, item);
    }

    let mut out = Vec::with_capacity(WORD + heads.len() + tails.len());
    out.extend_from_slice(&encode_usize(items.len()));
    out.extend_from_slice(&heads);
    out.extend_from_slice(&tails);
    out
}

/// Builds `selector || head words || dynamic tail`, where the single dynamic argument sits
/// after `static_words` and its offset is filled in automatically.
pub fn encode_call_with_dynamic(
    selector: [u8; 4],
    static_words: &[[u8; 32]],
    dynamic_tail: &[u8],
) -> Vec<u8> {
    let offset = WORD * (static_words.len() + 1);
    let mut out = Vec::with_capacity(4 + offset + dynamic_tail.len());
    out.extend_from_slice(&selector);
    for word in static_words {
        out.extend_from_slice(word);
    }
    out.extend_from_slice(&encode_usize(offset));
    out.extend_from_slice(dynamic_tail);
    out
}

/// Builds `selector || words` for calls with only static arguments.
pub fn encode_call(selector: [u8; 4], words: &[[u8; 32]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + WORD * words.len());
    out.extend_from_slice(&selector);
    for word in words {
        out.extend_from_slice(word);
    }
    out
}

// ============================================================================
// DECODING
// ============================================================================

/// Returns the word starting at byte `offset`.
pub fn word_at(data: &[u8], offset: usize) -> Result<&[u8]> {
    let end = offset
        .checked_add(WORD)
        .filter(|end| *end <= data.len());
    match end {
        Some(end) => Ok(&data[offset..end]),
        None => bail!(
            "ABI data too short: need word at {}, have {} bytes",
            offset,
            data.len()
        ),
    }
}

/// Returns the `index`-th head word.
pub fn decode_word(data: &[u8], index: usize) -> Result<[u8; 32]> {
    let mut word = [0u8; 32];
    word.copy_from_slice(word_at(data, index * WORD)?);
    Ok(word)
}

pub fn decode_u256(data: &[u8], index: usize) -> Result<U256> {
    Ok(U256::from_big_endian(&decode_word(data, index)?))
}

/// Reads the `index`-th head word as an address, rejecting dirty upper bytes.
pub fn decode_address(data: &[u8], index: usize) -> Result<TronAddress> {
    let word = decode_word(data, index)?;
    if word[..12].iter().any(|b| *b != 0) {
        bail!("ABI word {} is not an address: 0x{}", index, hex::encode(word));
    }
    Ok(TronAddress::from_evm_bytes(&word[12..])?)
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize> {
    let value = U256::from_big_endian(word_at(data, offset)?);
    if value > U256::from(data.len()) {
        bail!("ABI length/offset {} exceeds data length {}", value, data.len());
    }
    Ok(value.as_usize())
}

/// Reads a length-prefixed byte string located at byte `offset`.
fn bytes_at(data: &[u8], offset: usize) -> Result<Vec<u8>> {
    let len = read_usize(data, offset)?;
    let start = offset + WORD;
    let end = start
        .checked_add(len)
        .filter(|end| *end <= data.len());
    match end {
        Some(end) => Ok(data[start..end].to_vec()),
        None => bail!("ABI bytes of length {} overrun data at {}", len, start),
    }
}

/// Decodes a dynamic `bytes` whose offset is the `index`-th head word.
pub fn decode_bytes(data: &[u8], index: usize) -> Result<Vec<u8>> {
    let offset = read_usize(data, index * WORD)?;
    bytes_at(data, offset)
}

/// Decodes a dynamic `string` whose offset is the `index`-th head word.
pub fn decode_string(data: &[u8], index: usize) -> Result<String> {
    Ok(String::from_utf8(decode_bytes(data, index)?)?)
}

/// Decodes a dynamic `bytes[]` whose offset is the `index`-th head word.
pub fn decode_bytes_array(data: &[u8], index: usize) -> Result<Vec<Vec<u8>>> {
    let array = read_usize(data, index * WORD)?;
    let count = read_usize(data, array)?;
    let base = array + WORD;
    let mut items = Vec::with_capacity(count);
    for i in 0..count {
        let offset = read_usize(data, base + i * WORD)?;
        items.push(bytes_at(data, base + offset)?);
    }
    Ok(items)
}

/// Decodes a dynamic `bytes32[]` whose offset is the `index`-th head word.
pub fn decode_bytes32_array(data: &[u8], index: usize) -> Result<Vec<[u8; 32]>> {
    let array = read_usize(data, index * WORD)?;
    let count = read_usize(data, array)?;
    let mut items = Vec::with_capacity(count);
    for i in 0..count {
        let mut item = [0u8; 32];
        item.copy_from_slice(word_at(data, array + WORD * (i + 1))?);
        items.push(item);
    }
    Ok(items)
}
