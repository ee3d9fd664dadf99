//! Script builder: standard locking scripts, unlocking scripts and script matchers

use crate::address::{decode_address, Destination};
use crate::chain::{self, ChainId};
use crate::constants::*;
use crate::error::Result;
use crate::hashes::hash160;
use crate::types::*;

/// Classification of a locking (or redeem) script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptKind {
    PayToPublicKey(Vec<u8>),
    /// Plain or replay-protected P2PKH
    PayToPublicKeyHash([u8; 20]),
    /// Plain or replay-protected P2SH
    PayToScriptHash([u8; 20]),
    PayToWitnessPublicKeyHash([u8; 20]),
    PayToWitnessScriptHash([u8; 32]),
    Multisig { required: usize, keys: Vec<Vec<u8>> },
    WitnessProgram { version: u8, program: Vec<u8> },
    NullData,
    NonStandard,
}

/// Append a data push using the smallest push opcode
pub fn push_data(out: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len < OP_PUSHDATA1 as usize {
        out.push(len as u8);
    } else if len <= 0xff {
        out.push(OP_PUSHDATA1);
        out.push(len as u8);
    } else if len <= 0xffff {
        out.push(OP_PUSHDATA2);
        out.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        out.push(OP_PUSHDATA4);
        out.extend_from_slice(&(len as u32).to_le_bytes());
    }
    out.extend_from_slice(data);
}

/// Minimal little-endian script number encoding
pub fn script_num(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let negative = value < 0;
    let mut abs = value.unsigned_abs();
    let mut result = Vec::new();
    while abs > 0 {
        result.push((abs & 0xff) as u8);
        abs >>= 8;
    }
    // Sign bit lives in the top bit of the last byte
    if result.last().map_or(false, |b| b & 0x80 != 0) {
        result.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        if let Some(last) = result.last_mut() {
            *last |= 0x80;
        }
    }
    result
}

/// Append an integer push: OP_0, OP_1NEGATE, OP_1..OP_16 or a script number
pub fn push_int(out: &mut Vec<u8>, value: i64) {
    match value {
        0 => out.push(OP_0),
        -1 => out.push(OP_1NEGATE),
        1..=16 => out.push(OP_1 + (value as u8) - 1),
        _ => push_data(out, &script_num(value)),
    }
}

/// Unlocking script pushing every item, with OP_0 for empty items and OP_N for small numbers
pub fn push_all(items: &[&[u8]]) -> Script {
    let mut out = Vec::new();
    for item in items {
        match item {
            [] => out.push(OP_0),
            [n] if (1..=16).contains(n) => out.push(OP_1 + n - 1),
            _ => push_data(&mut out, item),
        }
    }
    Script::new(out)
}

/// OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG
pub fn pay_to_public_key_hash(hash: &[u8; 20]) -> Script {
    let mut out = vec![OP_DUP, OP_HASH160];
    push_data(&mut out, hash);
    out.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    Script::new(out)
}

/// OP_HASH160 <hash> OP_EQUAL
pub fn pay_to_script_hash(hash: &[u8; 20]) -> Script {
    let mut out = vec![OP_HASH160];
    push_data(&mut out, hash);
    out.push(OP_EQUAL);
    Script::new(out)
}

/// OP_0 <20-byte key hash>
pub fn pay_to_witness_public_key_hash(hash: &[u8; 20]) -> Script {
    pay_to_witness_program(0, hash)
}

/// OP_0 <32-byte script hash>
pub fn pay_to_witness_script_hash(hash: &[u8; 32]) -> Script {
    pay_to_witness_program(0, hash)
}

/// OP_n <program>
pub fn pay_to_witness_program(version: u8, program: &[u8]) -> Script {
    let mut out = vec![if version == 0 { OP_0 } else { OP_1 + version - 1 }];
    push_data(&mut out, program);
    Script::new(out)
}

/// <pubkey> OP_CHECKSIG
pub fn pay_to_public_key(pubkey: &[u8]) -> Script {
    let mut out = Vec::new();
    push_data(&mut out, pubkey);
    out.push(OP_CHECKSIG);
    Script::new(out)
}

/// OP_RETURN <data>
pub fn op_return(data: &[u8]) -> Script {
    let mut out = vec![OP_RETURN];
    push_data(&mut out, data);
    Script::new(out)
}

/// Append `<block hash> <height> OP_CHECKBLOCKATHEIGHT`
pub fn with_replay_protection(script: &Script, anchor: &ReplayAnchor) -> Script {
    let mut out = script.as_bytes().to_vec();
    push_data(&mut out, &anchor.block_hash);
    push_int(&mut out, anchor.block_height as i64);
    out.push(OP_CHECKBLOCKATHEIGHT);
    Script::new(out)
}

pub fn lock_script_for_destination(destination: &Destination) -> Script {
    match destination {
        Destination::PubKeyHash(hash) => pay_to_public_key_hash(hash),
        Destination::ScriptHash(hash) => pay_to_script_hash(hash),
        Destination::WitnessPubKeyHash(hash) => pay_to_witness_public_key_hash(hash),
        Destination::WitnessScriptHash(hash) => pay_to_witness_script_hash(hash),
        Destination::WitnessProgram { version, program } => pay_to_witness_program(*version, program),
    }
}

/// Locking script for `address` on `chain`
///
/// On replay-protected chains P2PKH and P2SH scripts commit to the given block when
/// both the fork height and hash are supplied.
pub fn lock_script_for_address(
    address: &str,
    chain: ChainId,
    fork_height: Option<u32>,
    fork_hash: Option<&Hash>,
) -> Result<Script> {
    let capability = chain::capability(chain);
    let destination = decode_address(address, capability.params())?;
    let anchor = match (fork_height, fork_hash) {
        (Some(block_height), Some(hash)) => Some(ReplayAnchor { block_hash: *hash, block_height }),
        _ => None,
    };
    Ok(capability.lock_script(&destination, anchor.as_ref()))
}

/// Read one push operation at `pos`, returning the pushed data and the next position
fn read_push(script: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    let opcode = *script.get(pos)?;
    let (len, start) = match opcode {
        0x01..=0x4b => (opcode as usize, pos + 1),
        OP_PUSHDATA1 => (*script.get(pos + 1)? as usize, pos + 2),
        OP_PUSHDATA2 => {
            let bytes = script.get(pos + 1..pos + 3)?;
            (u16::from_le_bytes([bytes[0], bytes[1]]) as usize, pos + 3)
        }
        OP_PUSHDATA4 => {
            let bytes = script.get(pos + 1..pos + 5)?;
            (u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize, pos + 5)
        }
        _ => return None,
    };
    let data = script.get(start..start.checked_add(len)?)?;
    Some((data, start + len))
}

/// Whether `suffix` is `<32-byte hash> <height> OP_CHECKBLOCKATHEIGHT`
fn is_replay_suffix(suffix: &[u8]) -> bool {
    let Some((hash, pos)) = read_push(suffix, 0) else {
        return false;
    };
    if hash.len() != 32 {
        return false;
    }
    let pos = match suffix.get(pos) {
        Some(&op) if op == OP_0 || op == OP_1NEGATE || (OP_1..=OP_16).contains(&op) => pos + 1,
        Some(_) => match read_push(suffix, pos) {
            Some((height, next)) if height.len() <= 4 => next,
            _ => return false,
        },
        None => return false,
    };
    suffix.len() == pos + 1 && suffix[pos] == OP_CHECKBLOCKATHEIGHT
}

pub fn match_pay_to_public_key_hash(script: &[u8]) -> Option<[u8; 20]> {
    if script.len() < 25
        || script[..3] != [OP_DUP, OP_HASH160, 20]
        || script[23..25] != [OP_EQUALVERIFY, OP_CHECKSIG]
    {
        return None;
    }
    if script.len() > 25 && !is_replay_suffix(&script[25..]) {
        return None;
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&script[3..23]);
    Some(hash)
}

pub fn match_pay_to_script_hash(script: &[u8]) -> Option<[u8; 20]> {
    if script.len() < 23 || script[..2] != [OP_HASH160, 20] || script[22] != OP_EQUAL {
        return None;
    }
    if script.len() > 23 && !is_replay_suffix(&script[23..]) {
        return None;
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&script[2..22]);
    Some(hash)
}

pub fn match_pay_to_witness_public_key_hash(script: &[u8]) -> Option<[u8; 20]> {
    if script.len() != 22 || script[..2] != [OP_0, 20] {
        return None;
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&script[2..]);
    Some(hash)
}

pub fn match_pay_to_witness_script_hash(script: &[u8]) -> Option<[u8; 32]> {
    if script.len() != 34 || script[..2] != [OP_0, 32] {
        return None;
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&script[2..]);
    Some(hash)
}

pub fn match_pay_to_public_key(script: &[u8]) -> Option<Vec<u8>> {
    let key_len = match script.len() {
        35 => PUBLIC_KEY_SIZE,
        67 => UNCOMPRESSED_PUBLIC_KEY_SIZE,
        _ => return None,
    };
    if script[0] as usize != key_len || script[script.len() - 1] != OP_CHECKSIG {
        return None;
    }
    Some(script[1..1 + key_len].to_vec())
}

/// OP_m <pubkey>... OP_n OP_CHECKMULTISIG
pub fn match_multisig(script: &[u8]) -> Option<(usize, Vec<Vec<u8>>)> {
    if script.len() < 3 || script[script.len() - 1] != OP_CHECKMULTISIG {
        return None;
    }
    let decode_small = |op: u8| (OP_1..=OP_16).contains(&op).then(|| (op - OP_1 + 1) as usize);
    let required = decode_small(script[0])?;
    let declared = decode_small(script[script.len() - 2])?;

    let mut keys = Vec::new();
    let mut pos = 1;
    let end = script.len() - 2;
    while pos < end {
        let (key, next) = read_push(script, pos)?;
        if key.len() != PUBLIC_KEY_SIZE && key.len() != UNCOMPRESSED_PUBLIC_KEY_SIZE {
            return None;
        }
        keys.push(key.to_vec());
        pos = next;
    }
    if pos != end || keys.len() != declared || required > declared {
        return None;
    }
    Some((required, keys))
}

/// Witness version and program of a native witness output
pub fn match_witness_program(script: &[u8]) -> Option<(u8, &[u8])> {
    if script.len() < 4 || script.len() > 42 {
        return None;
    }
    let version = match script[0] {
        OP_0 => 0,
        op if (OP_1..=OP_16).contains(&op) => op - OP_1 + 1,
        _ => return None,
    };
    if script[1] as usize + 2 != script.len() {
        return None;
    }
    Some((version, &script[2..]))
}

pub fn classify(script: &[u8]) -> ScriptKind {
    if let Some(hash) = match_pay_to_public_key_hash(script) {
        ScriptKind::PayToPublicKeyHash(hash)
    } else if let Some(hash) = match_pay_to_script_hash(script) {
        ScriptKind::PayToScriptHash(hash)
    } else if let Some(hash) = match_pay_to_witness_public_key_hash(script) {
        ScriptKind::PayToWitnessPublicKeyHash(hash)
    } else if let Some(hash) = match_pay_to_witness_script_hash(script) {
        ScriptKind::PayToWitnessScriptHash(hash)
    } else if let Some((version, program)) = match_witness_program(script) {
        ScriptKind::WitnessProgram { version, program: program.to_vec() }
    } else if let Some(pubkey) = match_pay_to_public_key(script) {
        ScriptKind::PayToPublicKey(pubkey)
    } else if let Some((required, keys)) = match_multisig(script) {
        ScriptKind::Multisig { required, keys }
    } else if script.first() == Some(&OP_RETURN) {
        ScriptKind::NullData
    } else {
        ScriptKind::NonStandard
    }
}

/// Key into the caller's redeem-script map: lowercase HASH160 hex of the script
pub fn script_key(script: &Script) -> String {
    hex::encode(hash160(script.as_bytes()))
}
