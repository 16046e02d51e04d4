use super::{LookupError, MachineDirectory};
use crate::config::DirectoryConfig;
use crate::models::MachineRecord;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, error};

/// Directory backed by a remote `/machines/{id}` endpoint
pub struct HttpMachineDirectory {
    client: Client,
    base_url: String,
}

impl HttpMachineDirectory {
    pub fn new(config: &DirectoryConfig) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MachineDirectory for HttpMachineDirectory {
    async fn fetch_machine(&self, machine_id: &str) -> Result<MachineRecord, LookupError> {
        // Ids are single path segments
        if machine_id.is_empty() || machine_id.contains(['/', '?', '#']) {
            return Err(LookupError::NotFound(machine_id.to_string()));
        }

        let url = format!("{}/machines/{}", self.base_url, machine_id);
        debug!("Fetching machine record from {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            error!("Error fetching machine {}: {}", machine_id, e);
            LookupError::Transport(e.to_string())
        })?;

        match response.status() {
            status if status.is_success() => response
                .json::<MachineRecord>()
                .await
                .map_err(|e| LookupError::Decode(e.to_string())),
            StatusCode::NOT_FOUND => Err(LookupError::NotFound(machine_id.to_string())),
            status => Err(LookupError::Transport(format!(
                "directory returned {}",
                status
            ))),
        }
    }
}
