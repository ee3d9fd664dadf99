//! Error types for transaction planning and signing

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SigningError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i64, required: i64 },

    #[error("Empty or inconsistent plan: {0}")]
    EmptyOrInconsistentPlan(String),

    #[error("Amount mismatch: inputs total {inputs}, plan accounts for {planned}")]
    AmountMismatch { inputs: i64, planned: i64 },

    #[error("Missing private key: {0}")]
    MissingPrivateKey(String),

    #[error("Missing redeem script: {0}")]
    MissingRedeemScript(String),

    #[error("Unsupported script: {0}")]
    UnsupportedScript(String),

    #[error("Signature failure: {0}")]
    SignatureFailure(String),
}

pub type Result<T> = std::result::Result<T, SigningError>;
