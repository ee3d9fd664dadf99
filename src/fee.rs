//! Fee estimation from a hypothesized input/output mix
//!
//! Sizes are upper bounds computed before any signature exists: every signature is
//! counted as [`SIGNATURE_SIZE`] bytes and every public key as a compressed key.
//!
//! Fee(tx) = ⌈Weight(tx) × rate / 4⌉ where
//! Weight(tx) = 4 × |non-witness bytes| + |witness bytes|

use crate::constants::*;
use crate::hashes::ripemd160;
use crate::script::{self, ScriptKind};
use crate::transaction::varint_size;
use crate::types::*;
use std::collections::HashMap;

/// Spend profile of one input, derived from the script it spends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputProfile {
    PayToPublicKey,
    PayToPublicKeyHash,
    PayToWitnessPublicKeyHash,
    /// P2SH wrapping a P2WPKH program
    NestedWitnessPublicKeyHash,
    /// P2SH with a non-witness redeem script
    ScriptHash { signatures: usize, redeem_len: usize },
    WitnessScriptHash { signatures: usize, script_len: usize },
    /// P2SH wrapping a P2WSH program
    NestedWitnessScriptHash { signatures: usize, script_len: usize },
    BareMultisig { signatures: usize },
}

fn signatures_required(script: &[u8]) -> usize {
    match script::classify(script) {
        ScriptKind::Multisig { required, .. } => required,
        _ => 1,
    }
}

/// Witness script for a P2WSH program, looked up by RIPEMD160 of the program
fn witness_script<'a>(program: &[u8; 32], scripts: &'a HashMap<String, Script>) -> Option<&'a Script> {
    scripts.get(&hex::encode(ripemd160(program)))
}

impl InputProfile {
    /// Profile for spending `locking_script`; unknown P2SH redeem scripts are priced as nested P2WPKH
    pub fn for_script(locking_script: &Script, scripts: &HashMap<String, Script>) -> InputProfile {
        match script::classify(locking_script.as_bytes()) {
            ScriptKind::PayToPublicKey(_) => InputProfile::PayToPublicKey,
            ScriptKind::PayToWitnessPublicKeyHash(_) => InputProfile::PayToWitnessPublicKeyHash,
            ScriptKind::PayToWitnessScriptHash(program) => match witness_script(&program, scripts) {
                Some(ws) => InputProfile::WitnessScriptHash {
                    signatures: signatures_required(ws.as_bytes()),
                    script_len: ws.len(),
                },
                None => InputProfile::PayToWitnessPublicKeyHash,
            },
            ScriptKind::PayToScriptHash(hash) => {
                let Some(redeem) = scripts.get(&hex::encode(hash)) else {
                    return InputProfile::NestedWitnessPublicKeyHash;
                };
                match script::classify(redeem.as_bytes()) {
                    ScriptKind::PayToWitnessPublicKeyHash(_) => InputProfile::NestedWitnessPublicKeyHash,
                    ScriptKind::PayToWitnessScriptHash(program) => {
                        let (signatures, script_len) = witness_script(&program, scripts)
                            .map(|ws| (signatures_required(ws.as_bytes()), ws.len()))
                            .unwrap_or((1, 0));
                        InputProfile::NestedWitnessScriptHash { signatures, script_len }
                    }
                    _ => InputProfile::ScriptHash {
                        signatures: signatures_required(redeem.as_bytes()),
                        redeem_len: redeem.len(),
                    },
                }
            }
            ScriptKind::Multisig { required, .. } => InputProfile::BareMultisig { signatures: required },
            _ => InputProfile::PayToPublicKeyHash,
        }
    }

    fn script_sig_len(&self) -> usize {
        let sig_push = 1 + SIGNATURE_SIZE;
        match *self {
            InputProfile::PayToPublicKey => sig_push,
            InputProfile::PayToPublicKeyHash => sig_push + 1 + PUBLIC_KEY_SIZE,
            InputProfile::PayToWitnessPublicKeyHash | InputProfile::WitnessScriptHash { .. } => 0,
            // push of the 22-byte witness program
            InputProfile::NestedWitnessPublicKeyHash => 1 + 22,
            // push of the 34-byte witness program
            InputProfile::NestedWitnessScriptHash { .. } => 1 + 34,
            InputProfile::ScriptHash { signatures, redeem_len } => {
                1 + signatures * sig_push + push_size(redeem_len)
            }
            InputProfile::BareMultisig { signatures } => 1 + signatures * sig_push,
        }
    }

    /// Non-witness bytes: outpoint, sequence and the length-prefixed scriptSig
    pub fn base_size(&self) -> usize {
        let script_sig = self.script_sig_len();
        INPUT_BASE_SIZE + varint_size(script_sig as u64) + script_sig
    }

    /// Witness bytes including the item count; zero for non-witness inputs
    pub fn witness_size(&self) -> usize {
        let sig_item = 1 + SIGNATURE_SIZE;
        match *self {
            InputProfile::PayToWitnessPublicKeyHash | InputProfile::NestedWitnessPublicKeyHash => {
                1 + sig_item + 1 + PUBLIC_KEY_SIZE
            }
            InputProfile::WitnessScriptHash { signatures, script_len }
            | InputProfile::NestedWitnessScriptHash { signatures, script_len } => {
                // multisig dummy item, signatures, witness script
                let items = signatures + 2;
                varint_size(items as u64) + 1 + signatures * sig_item + varint_size(script_len as u64) + script_len
            }
            _ => 0,
        }
    }

    pub fn is_witness(&self) -> bool {
        self.witness_size() > 0
    }

    pub fn weight(&self) -> usize {
        self.base_size() * WITNESS_SCALE_FACTOR + self.witness_size()
    }
}

fn push_size(len: usize) -> usize {
    match len {
        0..=0x4b => 1 + len,
        0x4c..=0xff => 2 + len,
        0x100..=0xffff => 3 + len,
        _ => 5 + len,
    }
}

/// Serialized size of an output paying to `script`
pub fn output_size(script: &Script) -> usize {
    8 + varint_size(script.len() as u64) + script.len()
}

/// Estimated weight of a transaction with the given inputs and output scripts
///
/// `extras_size` covers chain-specific header and trailer fields.
pub fn estimate_weight(inputs: &[InputProfile], outputs: &[Script], extras_size: usize) -> usize {
    let base = 4
        + extras_size
        + varint_size(inputs.len() as u64)
        + inputs.iter().map(InputProfile::base_size).sum::<usize>()
        + varint_size(outputs.len() as u64)
        + outputs.iter().map(output_size).sum::<usize>()
        + 4;

    let witness = if inputs.iter().any(InputProfile::is_witness) {
        // inputs without witness data still serialize an empty stack
        SEGWIT_MARKER_WEIGHT
            + inputs
                .iter()
                .map(|input| if input.is_witness() { input.witness_size() } else { 1 })
                .sum::<usize>()
    } else {
        0
    };

    base * WITNESS_SCALE_FACTOR + witness
}

/// ⌈weight / 4⌉
pub fn virtual_size(weight: usize) -> usize {
    weight.div_ceil(WITNESS_SCALE_FACTOR)
}

/// ⌈weight × rate / 4⌉
pub fn fee_for_weight(weight: usize, byte_fee: Amount) -> Amount {
    let scaled = weight as i128 * byte_fee.max(0) as i128;
    let fee = (scaled + WITNESS_SCALE_FACTOR as i128 - 1) / WITNESS_SCALE_FACTOR as i128;
    fee.min(Amount::MAX as i128) as Amount
}

/// Fee model for one request: fixed outputs, variable inputs
#[derive(Debug, Clone)]
pub struct FeeEstimator<'a> {
    byte_fee: Amount,
    outputs: Vec<Script>,
    extras_size: usize,
    scripts: &'a HashMap<String, Script>,
}

impl<'a> FeeEstimator<'a> {
    pub fn new(
        byte_fee: Amount,
        outputs: Vec<Script>,
        extras_size: usize,
        scripts: &'a HashMap<String, Script>,
    ) -> Self {
        FeeEstimator { byte_fee, outputs, extras_size, scripts }
    }

    pub fn profile(&self, utxo: &UnspentOutput) -> InputProfile {
        InputProfile::for_script(&utxo.script, self.scripts)
    }

    /// Fee for a transaction spending exactly `utxos`
    pub fn fee(&self, utxos: &[UnspentOutput]) -> Amount {
        let profiles: Vec<InputProfile> = utxos.iter().map(|u| self.profile(u)).collect();
        fee_for_weight(estimate_weight(&profiles, &self.outputs, self.extras_size), self.byte_fee)
    }

    /// Marginal cost of adding `utxo` as an input
    pub fn input_fee(&self, utxo: &UnspentOutput) -> Amount {
        fee_for_weight(self.profile(utxo).weight(), self.byte_fee)
    }
}
