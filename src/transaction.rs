//! Transaction wire serialization and transaction ids

use crate::chain::ChainCapability;
use crate::segwit;
use crate::types::*;

/// Encode a number as a Bitcoin varint
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(9);
    write_varint(&mut out, value);
    out
}

pub fn write_varint(out: &mut Vec<u8>, value: u64) {
    if value < 0xfd {
        out.push(value as u8);
    } else if value <= 0xffff {
        out.push(0xfd);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffffffff {
        out.push(0xfe);
        out.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        out.push(0xff);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Serialized length of a varint
pub fn varint_size(value: u64) -> usize {
    match value {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Varint length prefix followed by the bytes
pub fn write_var_bytes(out: &mut Vec<u8>, data: &[u8]) {
    write_varint(out, data.len() as u64);
    out.extend_from_slice(data);
}

pub fn write_outpoint(out: &mut Vec<u8>, outpoint: &OutPoint) {
    out.extend_from_slice(&outpoint.hash);
    out.extend_from_slice(&outpoint.index.to_le_bytes());
}

pub fn write_output(out: &mut Vec<u8>, output: &TransactionOutput) {
    out.extend_from_slice(&output.value.to_le_bytes());
    write_var_bytes(out, output.script_pubkey.as_bytes());
}

/// Serialize `tx` in the chain's wire format
///
/// The segwit marker and witnesses are written only when `with_witness` is set, the
/// chain supports witnesses and at least one input carries witness data.
pub fn encode_transaction<C: ChainCapability + ?Sized>(tx: &Transaction, chain: &C, with_witness: bool) -> Vec<u8> {
    let segwit = with_witness && chain.supports_witness() && tx.has_witness();
    let mut data = Vec::new();

    // Version (4 bytes, little-endian)
    data.extend_from_slice(&chain.version_word(tx).to_le_bytes());
    chain.write_header_extras(tx, &mut data);

    if segwit {
        data.extend_from_slice(&[0x00, 0x01]);
    }

    // Inputs
    write_varint(&mut data, tx.inputs.len() as u64);
    for input in &tx.inputs {
        write_outpoint(&mut data, &input.prevout);
        write_var_bytes(&mut data, input.script_sig.as_bytes());
        data.extend_from_slice(&input.prevout.sequence.to_le_bytes());
    }

    // Outputs
    write_varint(&mut data, tx.outputs.len() as u64);
    for output in &tx.outputs {
        write_output(&mut data, output);
    }

    if segwit {
        for input in &tx.inputs {
            segwit::write_witness(&mut data, &input.witness);
        }
    }

    // Lock time (4 bytes, little-endian)
    data.extend_from_slice(&tx.lock_time.to_le_bytes());
    chain.write_trailer_extras(tx, &mut data);

    data
}

/// Transaction id: the chain hash of the witness-stripped serialization
pub fn transaction_id<C: ChainCapability + ?Sized>(tx: &Transaction, chain: &C) -> Hash {
    chain.params().hasher.hash(&encode_transaction(tx, chain, false))
}
