//! Machine directory
//!
//! Resolves a machine id to its [`MachineRecord`]. Two sources:
//! - `HttpMachineDirectory`: `GET {base}/machines/{id}` on a directory service
//! - `StaticCatalog`: records held in memory (demo set or a JSON file)
//!
//! A lookup is attempted once. Any failure is terminal for the checkout
//! that asked for it.

pub mod catalog;
pub mod http;

use crate::models::MachineRecord;
use async_trait::async_trait;
use thiserror::Error;

pub use catalog::StaticCatalog;
pub use http::HttpMachineDirectory;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Machine not found: {0}")]
    NotFound(String),

    #[error("Machine directory unreachable: {0}")]
    Transport(String),

    #[error("Malformed machine record: {0}")]
    Decode(String),
}

#[async_trait]
pub trait MachineDirectory: Send + Sync {
    async fn fetch_machine(&self, machine_id: &str) -> Result<MachineRecord, LookupError>;
}
