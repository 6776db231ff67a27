//! Tron address encodings
//!
//! A Tron account is identified by 21 bytes: the `0x41` prefix followed by the same 20-byte
//! hash an EVM address uses. The same account is written as base58check (`T...`), as 21-byte
//! hex (`41...`), or as a stripped 20-byte EVM address.

use crate::error::TronError;
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// Prefix byte of every mainnet/testnet Tron address.
pub const ADDRESS_PREFIX: u8 = 0x41;

/// A validated 21-byte Tron address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TronAddress([u8; 21]);

impl TronAddress {
    /// Builds an address from its raw 21-byte form, checking length and prefix.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TronError> {
        if bytes.len() != 21 {
            return Err(TronError::InvalidAddress(format!(
                "expected 21 bytes, got {}",
                bytes.len()
            )));
        }
        if bytes[0] != ADDRESS_PREFIX {
            return Err(TronError::InvalidAddress(format!(
                "expected prefix 0x41, got 0x{:02x}",
                bytes[0]
            )));
        }
        let mut raw = [0u8; 21];
        raw.copy_from_slice(bytes);
        Ok(Self(raw))
    }

    /// Builds an address from the 20-byte EVM form.
    pub fn from_evm_bytes(bytes: &[u8]) -> Result<Self, TronError> {
        if bytes.len() != 20 {
            return Err(TronError::InvalidAddress(format!(
                "expected 20-byte EVM address, got {} bytes",
                bytes.len()
            )));
        }
        let mut raw = [0u8; 21];
        raw[0] = ADDRESS_PREFIX;
        raw[1..].copy_from_slice(bytes);
        Ok(Self(raw))
    }

    /// Decodes a base58check string (`T...`).
    pub fn from_base58(value: &str) -> Result<Self, TronError> {
        let payload = bs58::decode(value)
            .with_check(None)
            .into_vec()
            .map_err(|e| TronError::InvalidAddress(format!("{}: {}", value, e)))?;
        Self::from_bytes(&payload)
    }

    /// Decodes hex in either the 21-byte (`41...`) or the 20-byte EVM form, with or without `0x`.
    pub fn from_hex(value: &str) -> Result<Self, TronError> {
        let stripped = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .unwrap_or(value);
        let bytes = hex::decode(stripped)
            .map_err(|e| TronError::InvalidAddress(format!("{}: {}", value, e)))?;
        match bytes.len() {
            20 => Self::from_evm_bytes(&bytes),
            _ => Self::from_bytes(&bytes),
        }
    }

    /// Derives the address of an uncompressed secp256k1 public key.
    ///
    /// Accepts the 65-byte SEC1 form (`0x04 || X || Y`) or the bare 64-byte `X || Y`.
    pub fn from_public_key(public_key: &[u8]) -> Result<Self, TronError> {
        let xy = match public_key.len() {
            65 if public_key[0] == 0x04 => &public_key[1..],
            64 => public_key,
            n => {
                return Err(TronError::InvalidKeyFormat(format!(
                    "expected uncompressed public key, got {} bytes",
                    n
                )))
            }
        };
        let hash = Keccak256::digest(xy);
        Self::from_evm_bytes(&hash[12..])
    }

    pub fn as_bytes(&self) -> &[u8; 21] {
        &self.0
    }

    /// The 20-byte EVM view of this account.
    pub fn evm_bytes(&self) -> [u8; 20] {
        let mut out = [0u8; 20];
        out.copy_from_slice(&self.0[1..]);
        out
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).with_check().into_string()
    }

    /// 21-byte hex form as the full-node HTTP API expects it (`41...`, no `0x`).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// 20-byte EVM form (`0x...`).
    pub fn to_evm_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0[1..]))
    }
}

impl FromStr for TronAddress {
    type Err = TronError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.starts_with('T') {
            Self::from_base58(value)
        } else {
            Self::from_hex(value)
        }
    }
}

impl fmt::Display for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TronAddress({})", self.to_base58())
    }
}
