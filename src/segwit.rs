//! Segregated Witness serialization and transaction weight

use crate::chain::ChainCapability;
use crate::constants::WITNESS_SCALE_FACTOR;
use crate::transaction::{encode_transaction, write_var_bytes, write_varint};
use crate::types::*;

/// Witness Data: stack of witness elements
pub type Witness = Vec<ByteString>;

pub fn write_witness(out: &mut Vec<u8>, witness: &Witness) {
    write_varint(out, witness.len() as u64);
    for item in witness {
        write_var_bytes(out, item);
    }
}

/// Calculate transaction weight
/// Weight(tx) = 3 × |Serialize(tx ∖ witness)| + |Serialize(tx)|
pub fn calculate_transaction_weight<C: ChainCapability + ?Sized>(tx: &Transaction, chain: &C) -> u64 {
    let base_size = encode_transaction(tx, chain, false).len() as u64;
    let total_size = encode_transaction(tx, chain, true).len() as u64;
    (WITNESS_SCALE_FACTOR as u64 - 1) * base_size + total_size
}

/// Virtual size: ⌈Weight(tx) / 4⌉
pub fn calculate_virtual_size(weight: u64) -> u64 {
    weight.div_ceil(WITNESS_SCALE_FACTOR as u64)
}
