//! Script opcodes, signature-hash flags and size constants

// Opcodes used when building and matching standard scripts
pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1NEGATE: u8 = 0x4f;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKMULTISIG: u8 = 0xae;
/// Horizen replay protection: `<block hash> <height> OP_CHECKBLOCKATHEIGHT`
pub const OP_CHECKBLOCKATHEIGHT: u8 = 0xb4;

// Signature hash flags
pub const SIGHASH_ALL: u32 = 0x01;
pub const SIGHASH_NONE: u32 = 0x02;
pub const SIGHASH_SINGLE: u32 = 0x03;
pub const SIGHASH_FORKID: u32 = 0x40;
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;
/// Mask selecting the base type (ALL / NONE / SINGLE)
pub const SIGHASH_BASE_MASK: u32 = 0x1f;

/// Bitcoin Gold fork id, carried in bits 8..32 of the hash type
pub const BITCOIN_GOLD_FORK_ID: u32 = 79;

/// Sequence number for final input
pub const SEQUENCE_FINAL: u32 = 0xffffffff;

/// Maximum money supply: 21,000,000 BTC in satoshis
pub const MAX_MONEY: i64 = 21_000_000 * 100_000_000;

/// Placeholder signature size used by fee estimation: 71-byte DER upper bound plus the flag byte
pub const SIGNATURE_SIZE: usize = 72;

/// Compressed public key size
pub const PUBLIC_KEY_SIZE: usize = 33;

/// Uncompressed public key size
pub const UNCOMPRESSED_PUBLIC_KEY_SIZE: usize = 65;

/// Outpoint (32-byte hash + 4-byte index) plus 4-byte sequence
pub const INPUT_BASE_SIZE: usize = 32 + 4 + 4;

/// Version (4) + input count (1) + output count (1) + lock time (4)
pub const TX_OVERHEAD_SIZE: usize = 10;

/// Segwit marker and flag, counted in weight units
pub const SEGWIT_MARKER_WEIGHT: usize = 2;

/// Weight units per non-witness byte
pub const WITNESS_SCALE_FACTOR: usize = 4;

// Zcash Sapling (v4) transaction format
pub const ZCASH_SAPLING_VERSION: u32 = 4;
pub const ZCASH_OVERWINTERED_FLAG: u32 = 0x8000_0000;
pub const ZCASH_SAPLING_VERSION_GROUP_ID: u32 = 0x892f_2085;
pub const ZCASH_SAPLING_BRANCH_ID: u32 = 0x76b8_09bb;
pub const ZCASH_BLOSSOM_BRANCH_ID: u32 = 0x2bb4_0e60;

// ZIP-243 BLAKE2b personalisation strings
pub const ZCASH_PREVOUTS_HASH_PERSONALIZATION: &[u8; 16] = b"ZcashPrevoutHash";
pub const ZCASH_SEQUENCE_HASH_PERSONALIZATION: &[u8; 16] = b"ZcashSequencHash";
pub const ZCASH_OUTPUTS_HASH_PERSONALIZATION: &[u8; 16] = b"ZcashOutputsHash";
pub const ZCASH_SIGHASH_PERSONALIZATION_PREFIX: &[u8; 12] = b"ZcashSigHash";
