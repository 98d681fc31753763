//! # Error Types for Liquid Sharecoin
//!
//! Centralized error handling for covenant construction, script
//! encoding/decoding, and the regtest chain client.

use thiserror::Error;

/// Main error type for shared-coin covenant operations
#[derive(Debug, Error)]
pub enum CovenantError {
    /// A shared coin cannot be built from an empty stakeholder list
    #[error("shared coin requires at least one stakeholder")]
    NoStakeholders,

    /// Script bytes that do not decompile into a valid token sequence
    // `elements::script::Error` does not implement `std::error::Error`, so it
    // cannot be used as a thiserror `#[from]`/`source` field. The `From` impl
    // below reproduces what `#[from]` would generate.
    #[error("script decompilation failed: {inner}")]
    ScriptParse { inner: elements::script::Error },

    /// Cryptographic operation failures (bad keys, failed tweaks)
    #[error("cryptographic operation failed: {message}")]
    Cryptography { message: String },

    /// Control block bytes with an impossible length
    #[error("control block has invalid length {length}")]
    InvalidControlBlock { length: usize },

    /// Stakeholder amounts whose sum exceeds the 64-bit satoshi range
    #[error("stakeholder amounts overflow the shared total")]
    AmountOverflow,

    /// Network request failures (Esplora API)
    #[error("network request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON processing error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Consensus encoding/decoding errors for transactions
    #[error("consensus encoding error: {source}")]
    Encode {
        #[from]
        source: elements::encode::Error,
    },

    /// Hex decoding errors
    #[error("hex decoding error: {source}")]
    Hex {
        #[from]
        source: hex::FromHexError,
    },

    /// Generic operation failures with context
    #[error("operation failed: {operation} - {message}")]
    OperationFailed { operation: String, message: String },
}

impl From<elements::script::Error> for CovenantError {
    fn from(inner: elements::script::Error) -> Self {
        CovenantError::ScriptParse { inner }
    }
}

/// Result type alias for covenant operations
pub type CovenantResult<T> = Result<T, CovenantError>;

impl CovenantError {
    /// Create a cryptography error with a message
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Cryptography {
            message: message.into(),
        }
    }

    /// Create an operation failed error
    pub fn operation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Check if this error is retryable (network/temporary issues)
    pub fn is_retryable(&self) -> bool {
        matches!(self, CovenantError::Network { .. })
    }
}
