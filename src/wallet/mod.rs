//! Wallet session
//!
//! The payment workflow never owns key material. It reads the active
//! account and its signing capability from a [`WalletProvider`] on every
//! submission, so a disconnect or account switch is picked up immediately.

pub mod local;

use crate::chain::{Address, ChainError, SignedTransaction, Transaction};
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::info;

pub use local::LocalSigner;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Signing request declined: {0}")]
    Declined(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),
}

impl From<ChainError> for WalletError {
    fn from(e: ChainError) -> Self {
        WalletError::Signing(e.to_string())
    }
}

/// Capability to authorize transactions for one account
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Sign every transaction in order. Either all are signed or none.
    async fn sign_transactions(
        &self,
        transactions: &[Transaction],
    ) -> Result<Vec<SignedTransaction>, WalletError>;
}

pub trait WalletProvider: Send + Sync {
    fn active_address(&self) -> Option<Address>;

    fn signer(&self) -> Option<Arc<dyn TransactionSigner>>;

    fn is_connected(&self) -> bool {
        self.active_address().is_some()
    }

    /// Drop the active account. Idempotent.
    fn disconnect(&self);
}

/// In-memory session holding at most one connected account
#[derive(Default)]
pub struct WalletSession {
    account: RwLock<Option<Arc<dyn TransactionSigner>>>,
}

impl WalletSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected(signer: Arc<dyn TransactionSigner>) -> Self {
        Self {
            account: RwLock::new(Some(signer)),
        }
    }

    /// Replace the active account
    pub fn connect(&self, signer: Arc<dyn TransactionSigner>) {
        info!("Wallet connected: {}", signer.address());
        *self.account.write().unwrap_or_else(PoisonError::into_inner) = Some(signer);
    }
}

impl WalletProvider for WalletSession {
    fn active_address(&self) -> Option<Address> {
        self.account
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|signer| signer.address())
    }

    fn signer(&self) -> Option<Arc<dyn TransactionSigner>> {
        self.account
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn disconnect(&self) {
        if let Some(signer) = self
            .account
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            info!("Wallet disconnected: {}", signer.address());
        }
    }
}
