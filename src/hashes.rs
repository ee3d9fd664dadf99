//! Hash functions used by addresses, scripts and signature digests

use crate::types::Hash;
use bitcoin_hashes::{sha256d, Hash as BitcoinHash};
use groestl::Groestl512;
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hash used for transaction ids and signature digests on a given chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxHasher {
    /// SHA256(SHA256(x))
    Sha256d,
    /// Single SHA256 (Groestlcoin)
    Sha256,
}

impl TxHasher {
    pub fn hash(&self, data: &[u8]) -> Hash {
        match self {
            TxHasher::Sha256d => double_sha256(data),
            TxHasher::Sha256 => sha256(data),
        }
    }
}

pub fn sha256(data: &[u8]) -> Hash {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(data));
    out
}

pub fn double_sha256(data: &[u8]) -> Hash {
    sha256d::Hash::hash(data).into_inner()
}

/// HASH160(x) = RIPEMD160(SHA256(x))
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(&Ripemd160::digest(Sha256::digest(data)));
    out
}

/// RIPEMD160 of an already computed SHA256 digest, used to key P2WSH witness scripts
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(&Ripemd160::digest(data));
    out
}

/// Groestl-512 applied twice, truncated by callers to the Base58 checksum
pub fn double_groestl512(data: &[u8]) -> Vec<u8> {
    Groestl512::digest(Groestl512::digest(data)).to_vec()
}

/// BLAKE2b-256 with a 16-byte personalisation string
pub fn blake2b_personal(personal: &[u8], data: &[u8]) -> Hash {
    let digest = blake2b_simd::Params::new()
        .hash_length(32)
        .personal(personal)
        .hash(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(digest.as_bytes());
    out
}
