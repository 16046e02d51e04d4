//! Chain network boundary
//!
//! The payment workflow needs two things from the network:
//! - current transaction parameters (fee, validity window, genesis)
//! - submission of a signed transaction group
//!
//! Both sit behind [`ChainClient`] so the workflow can be driven by the
//! algod REST client in production and by in-memory doubles in tests.

pub mod address;
pub mod algod;
pub mod transaction;

use async_trait::async_trait;
use thiserror::Error;

pub use address::{parse_application_id, Address, AddressError};
pub use algod::AlgodClient;
pub use transaction::{
    assign_group_id, method_selector, SignedTransaction, Transaction, TransactionType,
};

/// Errors from the chain boundary
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Connection failure, timeout or unexpected status from the node
    #[error("Node request failed: {0}")]
    Network(String),

    /// The node evaluated the group and refused it
    #[error("{0}")]
    Rejected(String),

    #[error("Malformed node response: {0}")]
    Decode(String),

    #[error("Transaction encoding failed: {0}")]
    Encoding(String),
}

/// Network parameters for building transactions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestedParams {
    /// Flat fee per transaction in smallest units
    pub fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    pub genesis_hash: Vec<u8>,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Fetch parameters for a new transaction. Never cached across calls.
    async fn suggested_params(&self) -> Result<SuggestedParams, ChainError>;

    /// Broadcast a signed group; returns the id of every member in order.
    async fn submit(&self, group: &[SignedTransaction]) -> Result<Vec<String>, ChainError>;
}
