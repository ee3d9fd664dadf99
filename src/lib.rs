//! # UTXO Signer
//!
//! Transaction planning and signing for Bitcoin-family chains.
//!
//! The crate turns a [`SigningRequest`] (keys, UTXOs, destination, amount, fee rate) into
//! a [`TransactionPlan`] and then into a fully signed, serialized transaction. All
//! functions are pure: no I/O, no clocks, no randomness (signatures use RFC 6979 nonces).
//!
//! ## Architecture
//!
//! - Script Builder (`script`): locking and unlocking scripts
//! - Fee Estimator (`fee`): weight upper bounds and fees
//! - Coin Selector (`selection`): UTXO subset for a target
//! - Transaction Planner (`planner`): request validation, emits the plan
//! - Transaction Assembler (`assembler`): unsigned transaction from a plan
//! - Signer (`signer`, `sighash`): per-input digests, ECDSA, scriptSig/witness
//!
//! Chain differences (address prefixes, header and trailer fields, digest algorithm,
//! replay protection) live behind [`chain::ChainCapability`], looked up from a registry
//! initialised once per process.
//!
//! ## Usage
//!
//! ```rust
//! use utxo_signer::*;
//!
//! let request = SigningRequest {
//!     chain: ChainId::Bitcoin,
//!     private_keys: vec![PrivateKey::from_hex(
//!         "bbc27228ddcb9209d7fd6f36b02f7dfa6252af40bb2f1cbc7a557da8027ff866",
//!     ).unwrap()],
//!     utxos: vec![UnspentOutput {
//!         out_point: OutPoint::new([7; 32], 0),
//!         amount: 625_000_000,
//!         script: Script::from_hex("76a914b7cd046b6d522a3d61dbcb5235c0e9cc9726545788ac").unwrap(),
//!     }],
//!     to_address: "1Bp9U1ogV3A14FMvKbRJms7ctyso4Z4Tcx".to_string(),
//!     change_address: "1FQc5LdgGHMHEN9nwkjmz6tWkxhPpxBvBU".to_string(),
//!     amount: 335_790_000,
//!     byte_fee: 1,
//!     ..Default::default()
//! };
//!
//! let signer = UtxoSigner::new();
//! let plan = signer.plan(&request);
//! assert!(plan.is_ok());
//! assert_eq!(plan.fee, 226);
//!
//! let signed = signer.sign(&request, &plan).unwrap();
//! assert_eq!(signed.transaction.outputs.len(), 2);
//! ```

pub mod types;
pub mod constants;
pub mod error;
pub mod hashes;
pub mod chain;
pub mod address;
pub mod script;
pub mod transaction;
pub mod segwit;
pub mod sighash;
pub mod fee;
pub mod keys;
pub mod selection;
pub mod planner;
pub mod assembler;
pub mod signer;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use error::{Result, SigningError};
pub use chain::{ChainId, ChainParams};

/// Entry point tying planning, assembly and signing together
///
/// # Examples
///
/// ```
/// use utxo_signer::*;
///
/// let signer = UtxoSigner::new();
/// let script = signer
///     .lock_script_for_address("1Bp9U1ogV3A14FMvKbRJms7ctyso4Z4Tcx", ChainId::Bitcoin)
///     .unwrap();
/// assert_eq!(script.to_hex(), "76a914769bdff96a02f9135a1d19b749db6a78fe07dc9088ac");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct UtxoSigner;

impl UtxoSigner {
    /// Create a new signer instance
    ///
    /// # Examples
    ///
    /// ```
    /// use utxo_signer::UtxoSigner;
    ///
    /// let signer = UtxoSigner::new();
    /// ```
    pub fn new() -> Self {
        Self
    }

    /// Plan a transaction; problems are reported in the plan's `error`
    ///
    /// # Examples
    ///
    /// ```
    /// use utxo_signer::*;
    ///
    /// let request = SigningRequest {
    ///     to_address: "not an address".to_string(),
    ///     amount: 1000,
    ///     ..Default::default()
    /// };
    /// let plan = UtxoSigner::new().plan(&request);
    /// assert!(matches!(plan.error, Some(SigningError::InvalidAddress(_))));
    /// assert_eq!(plan.fee, 0);
    /// ```
    pub fn plan(&self, request: &SigningRequest) -> TransactionPlan {
        planner::plan(request)
    }

    /// Plan with an explicit fee instead of the fee rate
    pub fn plan_with_fee(&self, request: &SigningRequest, fee: Amount) -> TransactionPlan {
        planner::plan_with_fee(request, fee)
    }

    /// Unsigned transaction for a plan
    pub fn build_transaction(&self, request: &SigningRequest, plan: &TransactionPlan) -> Result<Transaction> {
        assembler::build_transaction(request, plan)
    }

    /// Sign every input of the planned transaction
    ///
    /// Fails atomically: either every input is signed or an error is returned.
    pub fn sign(&self, request: &SigningRequest, plan: &TransactionPlan) -> Result<SignedTransaction> {
        signer::sign_transaction(request, plan)
    }

    /// Digests an external signer must sign, in the order [`UtxoSigner::compile`] consumes them
    pub fn preimage_hashes(&self, request: &SigningRequest, plan: &TransactionPlan) -> Result<Vec<PreimageHash>> {
        signer::preimage_hashes(request, plan)
    }

    /// Signed transaction from externally produced signatures
    pub fn compile(
        &self,
        request: &SigningRequest,
        plan: &TransactionPlan,
        signatures: &[ExternalSignature],
    ) -> Result<SignedTransaction> {
        signer::compile_with_signatures(request, plan, signatures)
    }

    /// Plan and sign in one step
    pub fn plan_and_sign(&self, request: &SigningRequest) -> Result<SignedTransaction> {
        let plan = self.plan(request);
        self.sign(request, &plan)
    }

    /// Locking script paying to `address` on `chain`
    pub fn lock_script_for_address(&self, address: &str, chain: ChainId) -> Result<Script> {
        script::lock_script_for_address(address, chain, None, None)
    }

    /// Locking script with a replay-protection anchor for chains that use one
    pub fn lock_script_with_anchor(&self, address: &str, chain: ChainId, anchor: &ReplayAnchor) -> Result<Script> {
        script::lock_script_for_address(address, chain, Some(anchor.block_height), Some(&anchor.block_hash))
    }

    pub fn is_valid_address(&self, address: &str, chain: ChainId) -> bool {
        address::is_valid_address(address, chain::chain_params(chain))
    }
}

impl Default for UtxoSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_and_sign_reports_plan_error() {
        let signer = UtxoSigner::new();
        let request = SigningRequest { amount: 1000, ..Default::default() };
        let err = signer.plan_and_sign(&request).unwrap_err();
        assert!(matches!(err, SigningError::InvalidAddress(_)));
    }

    #[test]
    fn test_is_valid_address_per_chain() {
        let signer = UtxoSigner::default();
        assert!(signer.is_valid_address("1Bp9U1ogV3A14FMvKbRJms7ctyso4Z4Tcx", ChainId::Bitcoin));
        assert!(!signer.is_valid_address("1Bp9U1ogV3A14FMvKbRJms7ctyso4Z4Tcx", ChainId::Litecoin));
    }
}
