//! Unsigned transaction assembly from a plan

use crate::address::decode_address;
use crate::chain::{self, ChainCapability};
use crate::error::Result;
use crate::types::*;

/// Build the unsigned transaction described by `plan`
///
/// Inputs follow the plan's UTXO order with empty scripts. Outputs are the destination,
/// the change output when `change > 0`, then any non-value outputs. A zero-amount
/// destination output is left out when the transaction only carries data.
pub fn build_transaction(request: &SigningRequest, plan: &TransactionPlan) -> Result<Transaction> {
    let chain = chain::capability(request.chain);
    build_transaction_for(chain.as_ref(), request, plan)
}

pub fn build_transaction_for<C: ChainCapability + ?Sized>(
    chain: &C,
    request: &SigningRequest,
    plan: &TransactionPlan,
) -> Result<Transaction> {
    let params = chain.params();
    let anchor = request.replay_anchor.as_ref();
    let extra_outputs = chain.extra_outputs(request);

    let mut outputs = Vec::with_capacity(2 + extra_outputs.len());
    let destination = decode_address(&request.to_address, params)?;
    if plan.amount > 0 || extra_outputs.is_empty() {
        outputs.push(TransactionOutput {
            value: plan.amount,
            script_pubkey: chain.lock_script(&destination, anchor),
        });
    }

    if plan.change > 0 {
        let change = decode_address(&request.change_address, params)?;
        outputs.push(TransactionOutput {
            value: plan.change,
            script_pubkey: chain.lock_script(&change, anchor),
        });
    }
    outputs.extend(extra_outputs);

    let inputs = plan
        .utxos
        .iter()
        .map(|utxo| TransactionInput {
            prevout: utxo.out_point,
            script_sig: Script::default(),
            witness: Vec::new(),
        })
        .collect();

    Ok(Transaction {
        version: params.version,
        inputs,
        outputs,
        lock_time: request.lock_time,
        extras: chain.chain_extras(request),
    })
}
