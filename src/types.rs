//! Core types for UTXO transaction planning and signing

use crate::chain::ChainId;
use crate::constants::SEQUENCE_FINAL;
use crate::error::{Result, SigningError};
use crate::segwit::Witness;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Hash type: 256-bit hash in internal (wire) byte order
pub type Hash = [u8; 32];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Amount in the chain's smallest unit
pub type Amount = i64;

/// Opaque script bytes
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Script(#[serde(with = "hex::serde")] ByteString);

impl Script {
    pub fn new(bytes: ByteString) -> Self {
        Script(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        hex::decode(s)
            .map(Script)
            .map_err(|e| SigningError::UnsupportedScript(format!("invalid script hex: {}", e)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> ByteString {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl AsRef<[u8]> for Script {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

fn default_sequence() -> u32 {
    SEQUENCE_FINAL
}

/// OutPoint: previous transaction hash, output index and the sequence the spending input carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    #[serde(with = "hex::serde")]
    pub hash: Hash,
    pub index: u32,
    #[serde(default = "default_sequence")]
    pub sequence: u32,
}

impl OutPoint {
    pub fn new(hash: Hash, index: u32) -> Self {
        OutPoint { hash, index, sequence: SEQUENCE_FINAL }
    }
}

/// Unspent output supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentOutput {
    pub out_point: OutPoint,
    pub amount: Amount,
    pub script: Script,
}

/// 32-byte secp256k1 secret key. `Debug` never prints the key material.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrivateKey(#[serde(with = "hex::serde")] pub [u8; 32]);

impl PrivateKey {
    pub fn from_hex(s: &str) -> Result<Self> {
        let mut key = [0u8; 32];
        hex::decode_to_slice(s, &mut key)
            .map_err(|e| SigningError::InvalidRequest(format!("invalid private key hex: {}", e)))?;
        Ok(PrivateKey(key))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Recent block committed to by replay-protected scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayAnchor {
    #[serde(with = "hex::serde")]
    pub block_hash: Hash,
    pub block_height: u32,
}

/// Everything the planner and signer need for one transaction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningRequest {
    pub chain: ChainId,
    pub private_keys: Vec<PrivateKey>,
    pub utxos: Vec<UnspentOutput>,
    pub to_address: String,
    pub change_address: String,
    pub amount: Amount,
    /// Fee rate in smallest unit per virtual byte
    pub byte_fee: Amount,
    pub use_max_amount: bool,
    /// Signature hash flags; the chain default applies when absent
    pub hash_type: Option<u32>,
    /// Explicit fee overriding the estimator
    pub fixed_fee: Option<Amount>,
    pub lock_time: u32,
    /// Redeem and witness scripts keyed by lowercase HASH160 hex
    pub scripts: HashMap<String, Script>,
    /// Payload of an optional OP_RETURN output
    #[serde(with = "hex::serde")]
    pub output_op_return: ByteString,
    /// Transaction time for time-bound chains
    pub time: Option<u32>,
    /// Zcash expiry height
    pub expiry_height: u32,
    /// Zcash consensus branch id; the chain default applies when absent
    pub branch_id: Option<u32>,
    pub replay_anchor: Option<ReplayAnchor>,
}

impl SigningRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SigningError::InvalidRequest(format!("malformed request: {}", e)))
    }
}

/// Result of planning: which UTXOs to spend and how the value is split
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionPlan {
    pub utxos: Vec<UnspentOutput>,
    /// Sum of all eligible UTXOs
    pub available_amount: Amount,
    pub amount: Amount,
    pub fee: Amount,
    pub change: Amount,
    pub error: Option<SigningError>,
}

impl TransactionPlan {
    pub fn failed(error: SigningError) -> Self {
        TransactionPlan { error: Some(error), ..Default::default() }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Sum of the selected UTXOs, saturating at the `Amount` bounds
    pub fn selected_total(&self) -> Amount {
        self.utxos.iter().fold(0, |total: Amount, u| total.saturating_add(u.amount))
    }
}

/// Digest to be signed for one signature slot, produced by hash-only signing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreimageHash {
    pub input_index: usize,
    #[serde(with = "hex::serde")]
    pub digest: Hash,
    /// HASH160 of the public key expected to sign `digest`
    #[serde(with = "hex::serde")]
    pub key_hash: [u8; 20],
}

/// Signature made outside this crate: DER without the hash type byte, plus the signing public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSignature {
    #[serde(with = "hex::serde")]
    pub signature: ByteString,
    #[serde(with = "hex::serde")]
    pub public_key: ByteString,
}

/// Transaction Input; the sequence travels with the outpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInput {
    pub prevout: OutPoint,
    pub script_sig: Script,
    pub witness: Witness,
}

/// Transaction Output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutput {
    pub value: Amount,
    pub script_pubkey: Script,
}

/// Chain-specific transaction fields outside the common Bitcoin layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainExtras {
    #[default]
    None,
    /// 4-byte time following the version (Verge, Nebl)
    Timestamp(u32),
    /// Zcash Sapling v4 fields
    Zcash {
        version_group_id: u32,
        expiry_height: u32,
        branch_id: u32,
    },
}

/// Transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
    pub extras: ChainExtras,
}

impl Transaction {
    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|input| !input.witness.is_empty())
    }
}

/// Fully signed transaction ready for broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub encoded: ByteString,
    /// Transaction id in internal byte order
    pub txid: Hash,
    pub weight: u64,
    pub vsize: u64,
}

impl SignedTransaction {
    pub fn encoded_hex(&self) -> String {
        hex::encode(&self.encoded)
    }

    /// Transaction id in the conventional display order (byte-reversed)
    pub fn txid_hex(&self) -> String {
        let mut reversed = self.txid;
        reversed.reverse();
        hex::encode(reversed)
    }
}
