//! Tron transaction signing
//!
//! Tron signs the SHA-256 digest of the protobuf-encoded `raw_data` with recoverable
//! secp256k1 ECDSA. The 65-byte signature is `r || s || v` where `v` is the bare y-parity
//! bit (0 or 1), not the 27/28 form Ethereum uses.

use crate::address::TronAddress;
use crate::error::TronError;
use crate::protocol::{Transaction, TransactionRaw};
use k256::ecdsa::SigningKey;
use prost::Message;
use sha2::{Digest, Sha256};
use std::fmt;

/// Normalizes a hex private key (optional `0x` prefix) to 32 bytes.
pub fn normalize_private_key(value: &str) -> Result<[u8; 32], TronError> {
    let trimmed = value.trim();
    let stripped = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(stripped)
        .map_err(|e| TronError::InvalidKeyFormat(format!("not hex: {}", e)))?;
    if bytes.len() != 32 {
        return Err(TronError::InvalidKeyFormat(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

/// SHA-256 of the canonical raw-data encoding. This is both the signing pre-image and the txid.
pub fn raw_data_digest(raw: &TransactionRaw) -> [u8; 32] {
    Sha256::digest(raw.encode_to_vec()).into()
}

/// Hex txid of a raw transaction, as the full node reports it.
pub fn transaction_id(raw: &TransactionRaw) -> String {
    hex::encode(raw_data_digest(raw))
}

/// Holds the relayer key and its derived Tron address.
#[derive(Clone)]
pub struct TronSigner {
    signing_key: SigningKey,
    address: TronAddress,
}

impl TronSigner {
    /// Creates a signer from a hex private key.
    ///
    /// # Arguments
    ///
    /// * `private_key` - 32-byte key as hex, `0x` prefix optional
    ///
    /// # Returns
    ///
    /// * `Ok(TronSigner)` - Signer with its derived address
    /// * `Err(TronError::InvalidKeyFormat)` - Key is not 32 bytes of hex or not a valid scalar
    pub fn from_hex(private_key: &str) -> Result<Self, TronError> {
        let bytes = normalize_private_key(private_key)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, TronError> {
        let signing_key = SigningKey::from_slice(bytes)
            .map_err(|e| TronError::InvalidKeyFormat(format!("not a secp256k1 scalar: {}", e)))?;
        let public_key = signing_key.verifying_key().to_encoded_point(false);
        let address = TronAddress::from_public_key(public_key.as_bytes())?;
        Ok(Self {
            signing_key,
            address,
        })
    }

    pub fn address(&self) -> TronAddress {
        self.address
    }

    /// Uncompressed SEC1 public key (65 bytes, `0x04 || X || Y`).
    pub fn public_key(&self) -> Vec<u8> {
        self.signing_key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    /// Signs a 32-byte digest, returning `r || s || v` with `v` in {0, 1}.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<[u8; 65], TronError> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| TronError::MalformedTransaction(format!("signing failed: {}", e)))?;

        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = recovery_id.is_y_odd() as u8;
        Ok(out)
    }

    /// Signs the transaction's raw data and replaces its signature list with the result.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Hex txid of the signed transaction
    /// * `Err(TronError::MalformedTransaction)` - Transaction has no raw data
    pub fn sign_transaction(&self, tx: &mut Transaction) -> Result<String, TronError> {
        let raw = tx
            .raw_data
            .as_ref()
            .ok_or_else(|| TronError::MalformedTransaction("missing raw_data".to_string()))?;
        let digest = raw_data_digest(raw);
        let signature = self.sign_digest(&digest)?;
        tx.signature = vec![signature.to_vec()];
        Ok(hex::encode(digest))
    }
}

impl fmt::Debug for TronSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TronSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
