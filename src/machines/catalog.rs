//! Static machine catalog
//!
//! Serves records from memory. Loaded from a JSON array file
//! (`MACHINE_CATALOG_PATH`) or, without one, from a small demo set.

use super::{LookupError, MachineDirectory};
use crate::models::MachineRecord;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    machines: HashMap<String, MachineRecord>,
}

impl StaticCatalog {
    pub fn new(records: impl IntoIterator<Item = MachineRecord>) -> Self {
        let mut machines = HashMap::new();
        for record in records {
            if machines.contains_key(&record.id) {
                warn!("Duplicate machine id {} in catalog, keeping the last entry", record.id);
            }
            machines.insert(record.id.clone(), record);
        }
        Self { machines }
    }

    /// Demo machines for local development
    pub fn demo() -> Self {
        let machine = |id: &str, app_id: &str, price: Decimal, fixed_price: bool| MachineRecord {
            id: id.to_string(),
            contract_address: app_id.to_string(),
            price,
            fixed_price,
            api_key: None,
        };

        Self::new([
            machine("snack-01", "720428123", Decimal::new(25, 1), true),
            machine("coffee-02", "720428456", Decimal::new(15, 1), true),
            machine("drinks-03", "720428789", Decimal::new(2, 0), true),
            machine("tipjar-04", "720429012", Decimal::new(1, 0), false),
        ])
    }

    pub async fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).await?;
        let records: Vec<MachineRecord> = serde_json::from_str(&raw)?;
        info!("Loaded {} machine(s) from {}", records.len(), path.display());
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    pub fn get(&self, machine_id: &str) -> Option<&MachineRecord> {
        self.machines.get(machine_id)
    }
}

#[async_trait]
impl MachineDirectory for StaticCatalog {
    async fn fetch_machine(&self, machine_id: &str) -> Result<MachineRecord, LookupError> {
        self.get(machine_id)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(machine_id.to_string()))
    }
}
