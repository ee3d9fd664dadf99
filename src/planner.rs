//! Transaction planning
//!
//! Planning validates the request, narrows the UTXO set to what can be spent and drives
//! coin selection. It never fails outright: problems are recorded in the returned
//! plan's `error` with every amount zeroed.

use crate::address::decode_address;
use crate::chain::{self, ChainCapability};
use crate::error::{Result, SigningError};
use crate::fee::FeeEstimator;
use crate::keys::KeyStore;
use crate::selection::{select_all, select_for_target, Selection};
use crate::signer::can_spend;
use crate::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeeMode {
    Estimated,
    Fixed(Amount),
}

/// Plan a transaction; `request.fixed_fee` takes precedence over the fee rate
pub fn plan(request: &SigningRequest) -> TransactionPlan {
    let mode = match request.fixed_fee {
        Some(fee) => FeeMode::Fixed(fee),
        None => FeeMode::Estimated,
    };
    finish(request, try_plan(request, mode))
}

/// Plan with an explicit fee instead of the estimator
pub fn plan_with_fee(request: &SigningRequest, fee: Amount) -> TransactionPlan {
    finish(request, try_plan(request, FeeMode::Fixed(fee)))
}

fn finish(request: &SigningRequest, result: Result<TransactionPlan>) -> TransactionPlan {
    match result {
        Ok(plan) => {
            log::info!(
                "planned {:?} transaction: {} inputs, amount {}, fee {}, change {}",
                request.chain,
                plan.utxos.len(),
                plan.amount,
                plan.fee,
                plan.change
            );
            plan
        }
        Err(error) => {
            log::warn!("planning failed for {:?}: {}", request.chain, error);
            TransactionPlan::failed(error)
        }
    }
}

fn validate_request(request: &SigningRequest, chain: &dyn ChainCapability, mode: FeeMode) -> Result<()> {
    let params = chain.params();
    let max_money = params.max_money;
    decode_address(&request.to_address, params)?;
    if !request.use_max_amount || !request.change_address.is_empty() {
        decode_address(&request.change_address, params)?;
    }

    if !request.use_max_amount {
        if request.amount < 0 || request.amount > max_money {
            return Err(SigningError::InvalidAmount(format!("amount {} is out of range", request.amount)));
        }
        if request.amount == 0 && request.output_op_return.is_empty() {
            return Err(SigningError::InvalidAmount("amount must be positive".to_string()));
        }
    }
    if request.byte_fee < 0 {
        return Err(SigningError::InvalidAmount(format!("negative fee rate {}", request.byte_fee)));
    }
    if let FeeMode::Fixed(fee) = mode {
        if !(0..=max_money).contains(&fee) {
            return Err(SigningError::InvalidAmount(format!("fee {} is out of range", fee)));
        }
    }

    for utxo in &request.utxos {
        if !(0..=max_money).contains(&utxo.amount) {
            return Err(SigningError::InvalidAmount(format!(
                "UTXO {}:{} has out-of-range amount {}",
                hex::encode(utxo.out_point.hash),
                utxo.out_point.index,
                utxo.amount
            )));
        }
    }
    sum_amounts(&request.utxos, max_money)?;
    Ok(())
}

/// Total of `utxos`, refusing sums above `max_money`
fn sum_amounts(utxos: &[UnspentOutput], max_money: Amount) -> Result<Amount> {
    utxos
        .iter()
        .try_fold(0 as Amount, |total, utxo| total.checked_add(utxo.amount).filter(|sum| *sum <= max_money))
        .ok_or_else(|| SigningError::InvalidAmount(format!("UTXO total exceeds {}", max_money)))
}

/// UTXOs the request can actually spend, in caller order
fn eligible_utxos(request: &SigningRequest, estimator: &FeeEstimator, mode: FeeMode) -> Result<Vec<UnspentOutput>> {
    let keys = KeyStore::new(&request.private_keys)?;
    let mut eligible: Vec<UnspentOutput> = request
        .utxos
        .iter()
        .filter(|utxo| keys.is_empty() || can_spend(&utxo.script, &keys, &request.scripts))
        .cloned()
        .collect();
    if eligible.is_empty() && !request.utxos.is_empty() {
        return Err(SigningError::MissingPrivateKey(
            "none of the supplied UTXOs can be spent with the supplied keys".to_string(),
        ));
    }

    if mode == FeeMode::Estimated && request.byte_fee > 0 {
        let before = eligible.len();
        eligible.retain(|utxo| utxo.amount > estimator.input_fee(utxo));
        if eligible.len() < before {
            log::debug!("dropped {} UTXOs worth less than their spending cost", before - eligible.len());
        }
    }
    Ok(eligible)
}

fn try_plan(request: &SigningRequest, mode: FeeMode) -> Result<TransactionPlan> {
    let capability = chain::capability(request.chain);
    let chain = capability.as_ref();
    validate_request(request, chain, mode)?;

    let params = chain.params();
    let anchor = request.replay_anchor.as_ref();
    let mut outputs = Vec::new();
    if request.use_max_amount || request.amount > 0 {
        outputs.push(chain.lock_script(&decode_address(&request.to_address, params)?, anchor));
    }
    if !request.use_max_amount {
        outputs.push(chain.lock_script(&decode_address(&request.change_address, params)?, anchor));
    }
    outputs.extend(chain.extra_outputs(request).into_iter().map(|o| o.script_pubkey));
    let estimator = FeeEstimator::new(request.byte_fee, outputs, chain.extras_size(), &request.scripts);

    let eligible = eligible_utxos(request, &estimator, mode)?;
    let available_amount = sum_amounts(&eligible, params.max_money)?;
    let fee_for = |selected: &[UnspentOutput]| match mode {
        FeeMode::Fixed(fee) => fee,
        FeeMode::Estimated => estimator.fee(selected),
    };

    if request.use_max_amount {
        let Selection { utxos, total, fee } = select_all(&eligible, fee_for)?;
        return Ok(TransactionPlan { utxos, available_amount, amount: total - fee, fee, change: 0, error: None });
    }

    let Selection { utxos, total, mut fee } = select_for_target(&eligible, request.amount, fee_for)?;
    let mut change = total - request.amount - fee;
    // a caller-supplied fee is kept as given
    if mode == FeeMode::Estimated && change > 0 && change < params.dust_threshold {
        log::warn!("change {} is below the dust threshold {}, adding it to the fee", change, params.dust_threshold);
        fee += change;
        change = 0;
    }

    Ok(TransactionPlan { utxos, available_amount, amount: request.amount, fee, change, error: None })
}
