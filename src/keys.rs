//! Private key lookup by public key or public key hash

use crate::error::{Result, SigningError};
use crate::hashes::hash160;
use crate::types::PrivateKey;
use secp256k1::{All, PublicKey, Secp256k1, SecretKey};

/// A secret key with both public key encodings
#[derive(Clone)]
pub struct KeyEntry {
    pub secret: SecretKey,
    pub compressed: [u8; 33],
    pub uncompressed: [u8; 65],
    compressed_hash: [u8; 20],
    uncompressed_hash: [u8; 20],
}

/// Signing keys supplied with a request
pub struct KeyStore {
    secp: Secp256k1<All>,
    entries: Vec<KeyEntry>,
}

impl KeyStore {
    pub fn new(keys: &[PrivateKey]) -> Result<Self> {
        let secp = Secp256k1::new();
        let mut entries = Vec::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            let secret = SecretKey::from_slice(&key.0)
                .map_err(|e| SigningError::InvalidRequest(format!("private key {} is invalid: {}", i, e)))?;
            let public = PublicKey::from_secret_key(&secp, &secret);
            let compressed = public.serialize();
            let uncompressed = public.serialize_uncompressed();
            entries.push(KeyEntry {
                secret,
                compressed,
                uncompressed,
                compressed_hash: hash160(&compressed),
                uncompressed_hash: hash160(&uncompressed),
            });
        }
        Ok(KeyStore { secp, entries })
    }

    pub fn secp(&self) -> &Secp256k1<All> {
        &self.secp
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key whose compressed or uncompressed HASH160 equals `hash`, with the matching encoding
    pub fn find_by_hash(&self, hash: &[u8; 20]) -> Option<(&SecretKey, Vec<u8>)> {
        self.entries.iter().find_map(|entry| {
            if entry.compressed_hash == *hash {
                Some((&entry.secret, entry.compressed.to_vec()))
            } else if entry.uncompressed_hash == *hash {
                Some((&entry.secret, entry.uncompressed.to_vec()))
            } else {
                None
            }
        })
    }

    /// Key for a serialized public key in either encoding
    pub fn find_by_public_key(&self, pubkey: &[u8]) -> Option<&SecretKey> {
        self.entries
            .iter()
            .find(|entry| entry.compressed[..] == *pubkey || entry.uncompressed[..] == *pubkey)
            .map(|entry| &entry.secret)
    }
}
