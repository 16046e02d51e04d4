//! Machine payments
//!
//! - `editor`: keypad amount buffer
//! - `units`: display amount to smallest-unit conversion
//! - `workflow`: intent building, submission and the checkout state machine
//!
//! Every failure is reported as a [`SubmissionResult::Failure`] carrying one
//! of the [`ErrorKind`]s below; nothing escapes the workflow as a panic or
//! an unhandled error.

pub mod editor;
pub mod units;
pub mod workflow;

use crate::chain::{AddressError, ChainError};
use crate::wallet::WalletError;
use editor::AmountInputError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use units::UnitError;

pub use editor::AmountEditor;
pub use units::UnitScale;
pub use workflow::{Checkout, CheckoutPhase, PaymentIntent, PaymentSettings, PaymentWorkflow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing, non-numeric or non-positive amount. No network contact.
    InvalidAmount,
    /// Wallet not connected, machine not loaded, or a submission in flight
    NotReady,
    /// Contract handle cannot be turned into an application address
    AddressResolution,
    /// Parameter fetch, broadcast or timeout failure
    Network,
    /// The contract or node refused the group
    ContractRejection,
}

impl ErrorKind {
    /// Whether resubmitting with the same inputs can succeed
    pub fn retryable(&self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::NotReady)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidAmount => write!(f, "invalid_amount"),
            ErrorKind::NotReady => write!(f, "not_ready"),
            ErrorKind::AddressResolution => write!(f, "address_resolution"),
            ErrorKind::Network => write!(f, "network"),
            ErrorKind::ContractRejection => write!(f, "contract_rejection"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("Missing or invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Not ready: {0}")]
    NotReady(String),

    #[error("Cannot resolve contract address: {0}")]
    AddressResolution(#[from] AddressError),

    #[error("Network error: {0}")]
    Network(String),

    /// Node message, unmodified
    #[error("{0}")]
    ContractRejection(String),
}

impl PaymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::InvalidAmount(_) => ErrorKind::InvalidAmount,
            PaymentError::NotReady(_) => ErrorKind::NotReady,
            PaymentError::AddressResolution(_) => ErrorKind::AddressResolution,
            PaymentError::Network(_) => ErrorKind::Network,
            PaymentError::ContractRejection(_) => ErrorKind::ContractRejection,
        }
    }
}

impl From<AmountInputError> for PaymentError {
    fn from(e: AmountInputError) -> Self {
        PaymentError::InvalidAmount(e.to_string())
    }
}

impl From<UnitError> for PaymentError {
    fn from(e: UnitError) -> Self {
        PaymentError::InvalidAmount(e.to_string())
    }
}

impl From<ChainError> for PaymentError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::Rejected(message) => PaymentError::ContractRejection(message),
            ChainError::Encoding(_) => {
                error!("Local transaction encoding failure: {}", e);
                PaymentError::Network(e.to_string())
            }
            ChainError::Network(_) | ChainError::Decode(_) => PaymentError::Network(e.to_string()),
        }
    }
}

impl From<WalletError> for PaymentError {
    fn from(e: WalletError) -> Self {
        PaymentError::NotReady(e.to_string())
    }
}

/// Outcome of one submit action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionResult {
    Success {
        /// Id of the contract call
        tx_id: String,
        /// Ids of every transaction in the submitted group
        group: Vec<String>,
    },
    Failure {
        kind: ErrorKind,
        message: String,
    },
}

impl SubmissionResult {
    pub fn failure(error: &PaymentError) -> Self {
        SubmissionResult::Failure {
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionResult::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_errors_map_to_kinds() {
        let rejected: PaymentError = ChainError::Rejected("overspend".into()).into();
        assert_eq!(rejected, PaymentError::ContractRejection("overspend".into()));
        assert_eq!(rejected.to_string(), "overspend");

        let network: PaymentError = ChainError::Network("connection refused".into()).into();
        assert_eq!(network.kind(), ErrorKind::Network);
        assert!(network.kind().retryable());
        assert!(!ErrorKind::ContractRejection.retryable());
        assert!(!ErrorKind::AddressResolution.retryable());

        let encoding: PaymentError = ChainError::Encoding("bad field".into()).into();
        assert_eq!(encoding.kind(), ErrorKind::Network);
        assert_eq!(encoding.to_string(), "Network error: Transaction encoding failed: bad field");
    }

    #[test]
    fn test_failure_result_serialization() {
        let result = SubmissionResult::failure(&PaymentError::ContractRejection("overspend".into()));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "failure", "kind": "contract_rejection", "message": "overspend"})
        );
    }
}
