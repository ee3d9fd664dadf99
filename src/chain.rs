//! Chain registry and per-chain capabilities
//!
//! Every supported chain is described by a [`ChainParams`] entry in a process-wide
//! registry that is initialised once and read-only afterwards. Behaviour that differs
//! between chains (replay-protected scripts, extra transaction fields, the signature
//! digest) is reached through a [`ChainCapability`] object built from those params.

use crate::address::Destination;
use crate::constants::*;
use crate::error::Result;
use crate::hashes::TxHasher;
use crate::script;
use crate::sighash::{self, SignatureVersion};
use crate::transaction::write_varint;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Supported UTXO chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainId {
    #[default]
    Bitcoin,
    Litecoin,
    Dogecoin,
    Dash,
    Viacoin,
    DigiByte,
    Qtum,
    Ravencoin,
    Groestlcoin,
    BitcoinCash,
    BitcoinGold,
    Zcash,
    Zen,
    Verge,
    Nebl,
}

impl ChainId {
    pub const ALL: [ChainId; 15] = [
        ChainId::Bitcoin,
        ChainId::Litecoin,
        ChainId::Dogecoin,
        ChainId::Dash,
        ChainId::Viacoin,
        ChainId::DigiByte,
        ChainId::Qtum,
        ChainId::Ravencoin,
        ChainId::Groestlcoin,
        ChainId::BitcoinCash,
        ChainId::BitcoinGold,
        ChainId::Zcash,
        ChainId::Zen,
        ChainId::Verge,
        ChainId::Nebl,
    ];
}

/// Checksum appended to Base58 address payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Base58Checksum {
    Sha256d,
    Groestl512d,
}

/// Wire layout family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxFormat {
    Bitcoin,
    /// Bitcoin layout with a 4-byte time after the version
    Timestamped,
    /// Zcash Sapling v4
    ZcashSapling,
}

/// Per-chain constants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    pub chain: ChainId,
    pub p2pkh_prefix: Vec<u8>,
    pub p2sh_prefix: Vec<u8>,
    /// Bech32 human-readable part; `None` for chains without segwit addresses
    pub hrp: Option<String>,
    pub base58_checksum: Base58Checksum,
    pub hasher: TxHasher,
    pub default_hash_type: u32,
    /// Change below this amount is folded into the fee
    pub dust_threshold: Amount,
    /// Upper bound for any single amount and for the sum of a request's UTXOs
    #[serde(default = "default_max_money")]
    pub max_money: Amount,
    pub version: u32,
    pub format: TxFormat,
    /// Scripts commit to a recent block (`OP_CHECKBLOCKATHEIGHT`)
    pub replay_protected: bool,
}

fn default_max_money() -> Amount {
    MAX_MONEY
}

impl ChainParams {
    fn bitcoin_like(chain: ChainId, p2pkh: u8, p2sh: u8, hrp: Option<&str>) -> Self {
        ChainParams {
            chain,
            p2pkh_prefix: vec![p2pkh],
            p2sh_prefix: vec![p2sh],
            hrp: hrp.map(str::to_string),
            base58_checksum: Base58Checksum::Sha256d,
            hasher: TxHasher::Sha256d,
            default_hash_type: SIGHASH_ALL,
            dust_threshold: 546,
            max_money: MAX_MONEY,
            version: 1,
            format: TxFormat::Bitcoin,
            replay_protected: false,
        }
    }

    /// Built-in parameters for `chain`
    pub fn defaults(chain: ChainId) -> Self {
        match chain {
            ChainId::Bitcoin => Self::bitcoin_like(chain, 0x00, 0x05, Some("bc")),
            ChainId::Litecoin => Self::bitcoin_like(chain, 0x30, 0x32, Some("ltc")),
            ChainId::Dogecoin => ChainParams {
                dust_threshold: 1_000_000,
                max_money: 10_000_000_000 * 100_000_000,
                ..Self::bitcoin_like(chain, 0x1e, 0x16, None)
            },
            ChainId::Dash => Self::bitcoin_like(chain, 0x4c, 0x10, None),
            ChainId::Viacoin => Self::bitcoin_like(chain, 0x47, 0x21, Some("via")),
            ChainId::DigiByte => Self::bitcoin_like(chain, 0x1e, 0x3f, Some("dgb")),
            ChainId::Qtum => Self::bitcoin_like(chain, 0x3a, 0x32, Some("qc")),
            ChainId::Ravencoin => Self::bitcoin_like(chain, 0x3c, 0x7a, None),
            ChainId::Groestlcoin => ChainParams {
                base58_checksum: Base58Checksum::Groestl512d,
                hasher: TxHasher::Sha256,
                ..Self::bitcoin_like(chain, 0x24, 0x05, Some("grs"))
            },
            ChainId::BitcoinCash => ChainParams {
                default_hash_type: SIGHASH_ALL | SIGHASH_FORKID,
                ..Self::bitcoin_like(chain, 0x00, 0x05, None)
            },
            ChainId::BitcoinGold => ChainParams {
                default_hash_type: SIGHASH_ALL | SIGHASH_FORKID | (BITCOIN_GOLD_FORK_ID << 8),
                ..Self::bitcoin_like(chain, 0x26, 0x17, Some("btg"))
            },
            ChainId::Zcash => ChainParams {
                p2pkh_prefix: vec![0x1c, 0xb8],
                p2sh_prefix: vec![0x1c, 0xbd],
                version: ZCASH_SAPLING_VERSION,
                format: TxFormat::ZcashSapling,
                ..Self::bitcoin_like(chain, 0, 0, None)
            },
            ChainId::Zen => ChainParams {
                p2pkh_prefix: vec![0x20, 0x89],
                p2sh_prefix: vec![0x20, 0x96],
                replay_protected: true,
                ..Self::bitcoin_like(chain, 0, 0, None)
            },
            ChainId::Verge => ChainParams {
                format: TxFormat::Timestamped,
                ..Self::bitcoin_like(chain, 0x1e, 0x21, Some("vg"))
            },
            ChainId::Nebl => ChainParams {
                format: TxFormat::Timestamped,
                ..Self::bitcoin_like(chain, 0x35, 0x70, None)
            },
        }
    }
}

/// Process-wide table of chain parameters
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    params: HashMap<ChainId, ChainParams>,
}

impl ChainRegistry {
    pub fn with_defaults() -> Self {
        let params = ChainId::ALL
            .iter()
            .map(|&chain| (chain, ChainParams::defaults(chain)))
            .collect();
        ChainRegistry { params }
    }

    /// Defaults with `overrides` replacing the entries of the chains they name
    pub fn with_overrides(overrides: Vec<ChainParams>) -> Self {
        let mut registry = Self::with_defaults();
        for params in overrides {
            registry.params.insert(params.chain, params);
        }
        registry
    }

    pub fn params(&self, chain: ChainId) -> &ChainParams {
        // Every ChainId is inserted by with_defaults
        &self.params[&chain]
    }
}

static REGISTRY: OnceLock<ChainRegistry> = OnceLock::new();

/// Install the registry. Returns `false` if it was already initialised.
pub fn init_registry(overrides: Vec<ChainParams>) -> bool {
    let installed = REGISTRY.set(ChainRegistry::with_overrides(overrides)).is_ok();
    if !installed {
        log::warn!("chain registry already initialised; overrides ignored");
    }
    installed
}

pub fn registry() -> &'static ChainRegistry {
    REGISTRY.get_or_init(ChainRegistry::with_defaults)
}

pub fn chain_params(chain: ChainId) -> &'static ChainParams {
    registry().params(chain)
}

/// Chain-specific behaviour used by the assembler and signer
pub trait ChainCapability: fmt::Debug {
    fn params(&self) -> &ChainParams;

    /// Locking script paying to `destination`
    fn lock_script(&self, destination: &Destination, _anchor: Option<&ReplayAnchor>) -> Script {
        script::lock_script_for_destination(destination)
    }

    /// Non-value outputs appended after the destination and change outputs
    fn extra_outputs(&self, request: &SigningRequest) -> Vec<TransactionOutput> {
        if request.output_op_return.is_empty() {
            return Vec::new();
        }
        vec![TransactionOutput {
            value: 0,
            script_pubkey: script::op_return(&request.output_op_return),
        }]
    }

    fn chain_extras(&self, _request: &SigningRequest) -> ChainExtras {
        ChainExtras::None
    }

    /// The 4-byte version field as serialized
    fn version_word(&self, tx: &Transaction) -> u32 {
        tx.version
    }

    /// Fields serialized between the version and the inputs
    fn write_header_extras(&self, _tx: &Transaction, _out: &mut Vec<u8>) {}

    /// Fields serialized after the lock time
    fn write_trailer_extras(&self, _tx: &Transaction, _out: &mut Vec<u8>) {}

    /// Serialized size of header and trailer extras
    fn extras_size(&self) -> usize {
        0
    }

    fn supports_witness(&self) -> bool {
        true
    }

    /// Digest signed for input `index`
    fn signature_hash(
        &self,
        tx: &Transaction,
        index: usize,
        script_code: &Script,
        amount: Amount,
        hash_type: u32,
        version: SignatureVersion,
    ) -> Result<Hash> {
        let hasher = self.params().hasher;
        if version == SignatureVersion::WitnessV0 || hash_type & SIGHASH_FORKID != 0 {
            sighash::witness_v0_signature_hash(tx, index, script_code, amount, hash_type, hasher)
        } else {
            sighash::legacy_signature_hash(self, tx, index, script_code, hash_type)
        }
    }
}

/// Plain Bitcoin layout
#[derive(Debug)]
pub struct StandardChain {
    params: &'static ChainParams,
}

impl ChainCapability for StandardChain {
    fn params(&self) -> &ChainParams {
        self.params
    }
}

/// Bitcoin layout with a time field after the version
#[derive(Debug)]
pub struct TimestampedChain {
    params: &'static ChainParams,
}

impl ChainCapability for TimestampedChain {
    fn params(&self) -> &ChainParams {
        self.params
    }

    fn chain_extras(&self, request: &SigningRequest) -> ChainExtras {
        ChainExtras::Timestamp(request.time.unwrap_or(0))
    }

    fn write_header_extras(&self, tx: &Transaction, out: &mut Vec<u8>) {
        if let ChainExtras::Timestamp(time) = tx.extras {
            out.extend_from_slice(&time.to_le_bytes());
        }
    }

    fn extras_size(&self) -> usize {
        4
    }
}

/// P2PKH/P2SH outputs commit to a recent block
#[derive(Debug)]
pub struct ReplayProtectedChain {
    params: &'static ChainParams,
}

impl ChainCapability for ReplayProtectedChain {
    fn params(&self) -> &ChainParams {
        self.params
    }

    fn lock_script(&self, destination: &Destination, anchor: Option<&ReplayAnchor>) -> Script {
        let base = script::lock_script_for_destination(destination);
        match (destination, anchor) {
            (Destination::PubKeyHash(_) | Destination::ScriptHash(_), Some(anchor)) => {
                script::with_replay_protection(&base, anchor)
            }
            _ => base,
        }
    }
}

/// Zcash Sapling v4 transactions with the ZIP-243 digest
#[derive(Debug)]
pub struct ZcashSaplingChain {
    params: &'static ChainParams,
}

impl ChainCapability for ZcashSaplingChain {
    fn params(&self) -> &ChainParams {
        self.params
    }

    fn chain_extras(&self, request: &SigningRequest) -> ChainExtras {
        ChainExtras::Zcash {
            version_group_id: ZCASH_SAPLING_VERSION_GROUP_ID,
            expiry_height: request.expiry_height,
            branch_id: request.branch_id.unwrap_or(ZCASH_SAPLING_BRANCH_ID),
        }
    }

    fn version_word(&self, tx: &Transaction) -> u32 {
        tx.version | ZCASH_OVERWINTERED_FLAG
    }

    fn write_header_extras(&self, tx: &Transaction, out: &mut Vec<u8>) {
        if let ChainExtras::Zcash { version_group_id, .. } = tx.extras {
            out.extend_from_slice(&version_group_id.to_le_bytes());
        }
    }

    fn write_trailer_extras(&self, tx: &Transaction, out: &mut Vec<u8>) {
        if let ChainExtras::Zcash { expiry_height, .. } = tx.extras {
            out.extend_from_slice(&expiry_height.to_le_bytes());
            // valueBalance, then empty shielded spends, shielded outputs and joinsplits
            out.extend_from_slice(&0i64.to_le_bytes());
            write_varint(out, 0);
            write_varint(out, 0);
            write_varint(out, 0);
        }
    }

    fn extras_size(&self) -> usize {
        4 + 4 + 8 + 3
    }

    fn supports_witness(&self) -> bool {
        false
    }

    fn signature_hash(
        &self,
        tx: &Transaction,
        index: usize,
        script_code: &Script,
        amount: Amount,
        hash_type: u32,
        _version: SignatureVersion,
    ) -> Result<Hash> {
        sighash::zip243_signature_hash(tx, index, script_code, amount, hash_type)
    }
}

/// Capability object for `chain`, backed by the registry
pub fn capability(chain: ChainId) -> Box<dyn ChainCapability> {
    let params = chain_params(chain);
    match (params.format, params.replay_protected) {
        (TxFormat::ZcashSapling, _) => Box::new(ZcashSaplingChain { params }),
        (TxFormat::Timestamped, _) => Box::new(TimestampedChain { params }),
        (TxFormat::Bitcoin, true) => Box::new(ReplayProtectedChain { params }),
        (TxFormat::Bitcoin, false) => Box::new(StandardChain { params }),
    }
}
