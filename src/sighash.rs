//! Signature hash (sighash) computation
//!
//! Three digest algorithms are supported:
//! - legacy: the transaction re-serialized with the script code in the signed input
//! - witness v0 (BIP143): amount-committing digest, also used for every input on
//!   chains that set the FORKID bit
//! - ZIP-243: Zcash Sapling digest over personalised BLAKE2b hashes

use crate::chain::ChainCapability;
use crate::constants::*;
use crate::error::{Result, SigningError};
use crate::hashes::{blake2b_personal, TxHasher};
use crate::transaction::{write_outpoint, write_output, write_var_bytes, write_varint};
use crate::types::*;

/// Digest algorithm selected for an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureVersion {
    Base,
    WitnessV0,
}

fn base_type(hash_type: u32) -> u32 {
    hash_type & SIGHASH_BASE_MASK
}

fn is_anyone_can_pay(hash_type: u32) -> bool {
    hash_type & SIGHASH_ANYONECANPAY != 0
}

fn check_index(tx: &Transaction, index: usize, hash_type: u32) -> Result<()> {
    if index >= tx.inputs.len() {
        return Err(SigningError::SignatureFailure(format!(
            "input index {} out of range ({} inputs)",
            index,
            tx.inputs.len()
        )));
    }
    if base_type(hash_type) == SIGHASH_SINGLE && index >= tx.outputs.len() {
        return Err(SigningError::SignatureFailure(format!(
            "SIGHASH_SINGLE input {} has no matching output",
            index
        )));
    }
    Ok(())
}

/// Legacy preimage
///
/// Other inputs carry empty scripts; under NONE/SINGLE their sequences are zeroed and
/// the outputs are truncated (NONE: none, SINGLE: up to the signed index with earlier
/// outputs blanked to value -1).
pub fn legacy_preimage<C: ChainCapability + ?Sized>(
    chain: &C,
    tx: &Transaction,
    index: usize,
    script_code: &Script,
    hash_type: u32,
) -> Result<Vec<u8>> {
    check_index(tx, index, hash_type)?;
    let base = base_type(hash_type);
    let mut data = Vec::new();

    // 1. Version and chain header fields
    data.extend_from_slice(&chain.version_word(tx).to_le_bytes());
    chain.write_header_extras(tx, &mut data);

    // 2. Inputs
    if is_anyone_can_pay(hash_type) {
        write_varint(&mut data, 1);
        let input = &tx.inputs[index];
        write_outpoint(&mut data, &input.prevout);
        write_var_bytes(&mut data, script_code.as_bytes());
        data.extend_from_slice(&input.prevout.sequence.to_le_bytes());
    } else {
        write_varint(&mut data, tx.inputs.len() as u64);
        for (i, input) in tx.inputs.iter().enumerate() {
            write_outpoint(&mut data, &input.prevout);
            if i == index {
                write_var_bytes(&mut data, script_code.as_bytes());
            } else {
                write_varint(&mut data, 0);
            }
            let sequence = if i != index && (base == SIGHASH_NONE || base == SIGHASH_SINGLE) {
                0
            } else {
                input.prevout.sequence
            };
            data.extend_from_slice(&sequence.to_le_bytes());
        }
    }

    // 3. Outputs
    match base {
        SIGHASH_NONE => write_varint(&mut data, 0),
        SIGHASH_SINGLE => {
            write_varint(&mut data, index as u64 + 1);
            for _ in 0..index {
                data.extend_from_slice(&(-1i64).to_le_bytes());
                write_varint(&mut data, 0);
            }
            write_output(&mut data, &tx.outputs[index]);
        }
        _ => {
            write_varint(&mut data, tx.outputs.len() as u64);
            for output in &tx.outputs {
                write_output(&mut data, output);
            }
        }
    }

    // 4. Lock time and hash type
    data.extend_from_slice(&tx.lock_time.to_le_bytes());
    data.extend_from_slice(&hash_type.to_le_bytes());
    Ok(data)
}

pub fn legacy_signature_hash<C: ChainCapability + ?Sized>(
    chain: &C,
    tx: &Transaction,
    index: usize,
    script_code: &Script,
    hash_type: u32,
) -> Result<Hash> {
    let preimage = legacy_preimage(chain, tx, index, script_code, hash_type)?;
    Ok(chain.params().hasher.hash(&preimage))
}

/// Commitments shared by the witness v0 and ZIP-243 digests
struct InputCommitments {
    prevouts: Vec<u8>,
    sequences: Vec<u8>,
    outputs: Vec<u8>,
    /// `None` when the digest uses 32 zero bytes
    single_output: Option<Vec<u8>>,
}

fn input_commitments(tx: &Transaction, index: usize) -> InputCommitments {
    let mut prevouts = Vec::new();
    let mut sequences = Vec::new();
    for input in &tx.inputs {
        write_outpoint(&mut prevouts, &input.prevout);
        sequences.extend_from_slice(&input.prevout.sequence.to_le_bytes());
    }
    let mut outputs = Vec::new();
    for output in &tx.outputs {
        write_output(&mut outputs, output);
    }
    let single_output = tx.outputs.get(index).map(|output| {
        let mut data = Vec::new();
        write_output(&mut data, output);
        data
    });
    InputCommitments { prevouts, sequences, outputs, single_output }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Commitment {
    Prevouts,
    Sequences,
    Outputs,
}

/// Digest triple (hashPrevouts, hashSequence, hashOutputs) for the given hash type
fn commitment_hashes(
    commitments: &InputCommitments,
    hash_type: u32,
    hash: impl Fn(Commitment, &[u8]) -> Hash,
) -> (Hash, Hash, Hash) {
    let base = base_type(hash_type);
    let anyone_can_pay = is_anyone_can_pay(hash_type);
    let zero = [0u8; 32];

    let hash_prevouts = if anyone_can_pay {
        zero
    } else {
        hash(Commitment::Prevouts, &commitments.prevouts)
    };
    let hash_sequence = if anyone_can_pay || base == SIGHASH_SINGLE || base == SIGHASH_NONE {
        zero
    } else {
        hash(Commitment::Sequences, &commitments.sequences)
    };
    let hash_outputs = match (base, &commitments.single_output) {
        (SIGHASH_NONE, _) | (SIGHASH_SINGLE, None) => zero,
        (SIGHASH_SINGLE, Some(output)) => hash(Commitment::Outputs, output),
        _ => hash(Commitment::Outputs, &commitments.outputs),
    };
    (hash_prevouts, hash_sequence, hash_outputs)
}

/// Witness v0 (BIP143) preimage
pub fn witness_v0_preimage(
    tx: &Transaction,
    index: usize,
    script_code: &Script,
    amount: Amount,
    hash_type: u32,
    hasher: TxHasher,
) -> Result<Vec<u8>> {
    let input = tx.inputs.get(index).ok_or_else(|| {
        SigningError::SignatureFailure(format!("input index {} out of range", index))
    })?;
    let commitments = input_commitments(tx, index);
    let (hash_prevouts, hash_sequence, hash_outputs) =
        commitment_hashes(&commitments, hash_type, |_, data| hasher.hash(data));

    let mut data = Vec::new();
    data.extend_from_slice(&tx.version.to_le_bytes());
    data.extend_from_slice(&hash_prevouts);
    data.extend_from_slice(&hash_sequence);
    write_outpoint(&mut data, &input.prevout);
    write_var_bytes(&mut data, script_code.as_bytes());
    data.extend_from_slice(&amount.to_le_bytes());
    data.extend_from_slice(&input.prevout.sequence.to_le_bytes());
    data.extend_from_slice(&hash_outputs);
    data.extend_from_slice(&tx.lock_time.to_le_bytes());
    data.extend_from_slice(&hash_type.to_le_bytes());
    Ok(data)
}

pub fn witness_v0_signature_hash(
    tx: &Transaction,
    index: usize,
    script_code: &Script,
    amount: Amount,
    hash_type: u32,
    hasher: TxHasher,
) -> Result<Hash> {
    let preimage = witness_v0_preimage(tx, index, script_code, amount, hash_type, hasher)?;
    Ok(hasher.hash(&preimage))
}

/// ZIP-243 preimage for a transparent input of a Sapling transaction
pub fn zip243_preimage(
    tx: &Transaction,
    index: usize,
    script_code: &Script,
    amount: Amount,
    hash_type: u32,
) -> Result<Vec<u8>> {
    let ChainExtras::Zcash { version_group_id, expiry_height, .. } = tx.extras else {
        return Err(SigningError::SignatureFailure(
            "transaction has no Zcash Sapling fields".to_string(),
        ));
    };
    let input = tx.inputs.get(index).ok_or_else(|| {
        SigningError::SignatureFailure(format!("input index {} out of range", index))
    })?;

    let commitments = input_commitments(tx, index);
    let (hash_prevouts, hash_sequence, hash_outputs) =
        commitment_hashes(&commitments, hash_type, |commitment, data| {
            let personal = match commitment {
                Commitment::Prevouts => ZCASH_PREVOUTS_HASH_PERSONALIZATION,
                Commitment::Sequences => ZCASH_SEQUENCE_HASH_PERSONALIZATION,
                Commitment::Outputs => ZCASH_OUTPUTS_HASH_PERSONALIZATION,
            };
            blake2b_personal(personal, data)
        });

    let mut data = Vec::new();
    data.extend_from_slice(&(tx.version | ZCASH_OVERWINTERED_FLAG).to_le_bytes());
    data.extend_from_slice(&version_group_id.to_le_bytes());
    data.extend_from_slice(&hash_prevouts);
    data.extend_from_slice(&hash_sequence);
    data.extend_from_slice(&hash_outputs);
    // hashJoinSplits, hashShieldedSpends, hashShieldedOutputs
    data.extend_from_slice(&[0u8; 96]);
    data.extend_from_slice(&tx.lock_time.to_le_bytes());
    data.extend_from_slice(&expiry_height.to_le_bytes());
    // valueBalance
    data.extend_from_slice(&0i64.to_le_bytes());
    data.extend_from_slice(&hash_type.to_le_bytes());
    write_outpoint(&mut data, &input.prevout);
    write_var_bytes(&mut data, script_code.as_bytes());
    data.extend_from_slice(&amount.to_le_bytes());
    data.extend_from_slice(&input.prevout.sequence.to_le_bytes());
    Ok(data)
}

pub fn zip243_signature_hash(
    tx: &Transaction,
    index: usize,
    script_code: &Script,
    amount: Amount,
    hash_type: u32,
) -> Result<Hash> {
    let ChainExtras::Zcash { branch_id, .. } = tx.extras else {
        return Err(SigningError::SignatureFailure(
            "transaction has no Zcash Sapling fields".to_string(),
        ));
    };
    let preimage = zip243_preimage(tx, index, script_code, amount, hash_type)?;
    let mut personal = [0u8; 16];
    personal[..12].copy_from_slice(ZCASH_SIGHASH_PERSONALIZATION_PREFIX);
    personal[12..].copy_from_slice(&branch_id.to_le_bytes());
    Ok(blake2b_personal(&personal, &preimage))
}
