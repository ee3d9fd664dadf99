//! Coin selection
//!
//! Normal mode walks the eligible UTXOs in caller order, adding one at a time until
//! Σ selected ≥ target + fee(selected). Spend-max mode selects everything.
//! Both run at most `len(utxos)` iterations.

use crate::error::{Result, SigningError};
use crate::types::*;

/// Chosen inputs together with their total and the fee they induce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub utxos: Vec<UnspentOutput>,
    pub total: Amount,
    pub fee: Amount,
}

/// Select UTXOs covering `target` plus the fee of the selection itself
pub fn select_for_target<F>(utxos: &[UnspentOutput], target: Amount, fee_for: F) -> Result<Selection>
where
    F: Fn(&[UnspentOutput]) -> Amount,
{
    let available = total_of(utxos);
    let mut total: Amount = 0;
    let mut required = target.saturating_add(fee_for(&[]));

    for (count, utxo) in utxos.iter().enumerate() {
        total = total.saturating_add(utxo.amount);
        let selected = &utxos[..=count];
        let fee = fee_for(selected);
        required = target.saturating_add(fee);
        log::debug!(
            "selection step {}: total {} required {} (fee {})",
            count + 1,
            total,
            required,
            fee
        );
        if total >= required {
            return Ok(Selection { utxos: selected.to_vec(), total, fee });
        }
    }

    Err(SigningError::InsufficientBalance { available, required })
}

/// Select every UTXO; the fee is that of spending all of them
pub fn select_all<F>(utxos: &[UnspentOutput], fee_for: F) -> Result<Selection>
where
    F: Fn(&[UnspentOutput]) -> Amount,
{
    let total = total_of(utxos);
    let fee = fee_for(utxos);
    if utxos.is_empty() || total <= fee {
        return Err(SigningError::InsufficientBalance { available: total, required: fee.saturating_add(1) });
    }
    Ok(Selection { utxos: utxos.to_vec(), total, fee })
}

fn total_of(utxos: &[UnspentOutput]) -> Amount {
    utxos.iter().fold(0, |total: Amount, u| total.saturating_add(u.amount))
}
