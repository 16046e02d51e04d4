// algod REST client
// API Reference: https://developer.algorand.org/docs/rest-apis/algod/
//
// GET  /v2/transactions/params  -> suggested params (JSON)
// POST /v2/transactions         -> raw msgpack group, returns {"txId": ...}

use super::{ChainClient, ChainError, SignedTransaction, SuggestedParams};
use crate::config::ChainConfig;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

const TOKEN_HEADER: &str = "X-Algo-API-Token";

// Upper bound on the encoded size of a payment or app call, used to turn the
// per-byte fee into a flat fee
const ESTIMATED_TXN_SIZE: u64 = 256;

pub struct AlgodClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    validity_rounds: u64,
}

#[derive(Deserialize)]
struct TransactionParamsResponse {
    fee: u64,
    #[serde(rename = "genesis-hash")]
    genesis_hash: String,
    #[serde(rename = "genesis-id")]
    genesis_id: String,
    #[serde(rename = "last-round")]
    last_round: u64,
    #[serde(rename = "min-fee")]
    min_fee: u64,
}

#[derive(Deserialize)]
struct PostTransactionsResponse {
    #[serde(rename = "txId")]
    tx_id: String,
}

#[derive(Deserialize)]
struct AlgodErrorResponse {
    message: String,
}

impl AlgodClient {
    pub fn new(config: &ChainConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.algod_url.trim_end_matches('/').to_string(),
            token: config.algod_token.clone().filter(|t| !t.is_empty()),
            validity_rounds: config.validity_rounds,
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.header(TOKEN_HEADER, token),
            None => builder,
        }
    }

    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        serde_json::from_str::<AlgodErrorResponse>(&body)
            .map(|e| e.message)
            .unwrap_or_else(|_| format!("{} {}", status, body.trim()))
    }
}

#[async_trait]
impl ChainClient for AlgodClient {
    async fn suggested_params(&self) -> Result<SuggestedParams, ChainError> {
        let url = format!("{}/v2/transactions/params", self.base_url);
        debug!("Fetching suggested params from {}", url);

        let response = self
            .request(self.client.get(&url))
            .send()
            .await
            .map_err(|e| ChainError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let message = Self::error_message(response).await;
            return Err(ChainError::Network(message));
        }

        let params: TransactionParamsResponse = response
            .json()
            .await
            .map_err(|e| ChainError::Decode(e.to_string()))?;

        let genesis_hash = BASE64
            .decode(&params.genesis_hash)
            .map_err(|e| ChainError::Decode(format!("genesis-hash: {}", e)))?;

        Ok(SuggestedParams {
            fee: params.min_fee.max(params.fee.saturating_mul(ESTIMATED_TXN_SIZE)),
            first_valid: params.last_round,
            last_valid: params.last_round.saturating_add(self.validity_rounds),
            genesis_id: params.genesis_id,
            genesis_hash,
        })
    }

    async fn submit(&self, group: &[SignedTransaction]) -> Result<Vec<String>, ChainError> {
        let mut body = Vec::new();
        let mut ids = Vec::with_capacity(group.len());
        for signed in group {
            body.extend(signed.encode()?);
            ids.push(signed.transaction().id()?);
        }

        let url = format!("{}/v2/transactions", self.base_url);
        info!("Submitting group of {} transaction(s)", group.len());

        let response = self
            .request(self.client.post(&url))
            .header("Content-Type", "application/x-binary")
            .body(body)
            .send()
            .await
            .map_err(|e| ChainError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            let message = Self::error_message(response).await;
            warn!("Node rejected transaction group: {}", message);
            return Err(ChainError::Rejected(message));
        }
        if !status.is_success() {
            let message = Self::error_message(response).await;
            return Err(ChainError::Network(message));
        }

        let accepted: PostTransactionsResponse = response
            .json()
            .await
            .map_err(|e| ChainError::Decode(e.to_string()))?;

        if ids.first() != Some(&accepted.tx_id) {
            warn!(
                "Node reported txId {} which differs from the locally computed {:?}",
                accepted.tx_id,
                ids.first()
            );
        }
        info!("Transaction group accepted: {}", accepted.tx_id);
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Address, Transaction};

    fn config(url: String, token: Option<&str>) -> ChainConfig {
        ChainConfig {
            algod_url: url,
            algod_token: token.map(str::to_string),
            validity_rounds: 1_000,
        }
    }

    fn signed_group() -> Vec<SignedTransaction> {
        let params = SuggestedParams {
            fee: 1_000,
            first_valid: 10,
            last_valid: 1_010,
            genesis_id: "testnet-v1.0".to_string(),
            genesis_hash: vec![0u8; 32],
        };
        let sender = Address::from_bytes([3u8; 32]);
        let txn = Transaction::payment(sender, Address::for_application(5), 100, &params);
        vec![SignedTransaction::new([0u8; 64], txn)]
    }

    #[tokio::test]
    async fn test_suggested_params() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/transactions/params")
            .match_header("X-Algo-API-Token", "secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"consensus-version":"v40","fee":0,"genesis-hash":"SGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiI=","genesis-id":"testnet-v1.0","last-round":5000,"min-fee":1000}"#,
            )
            .create_async()
            .await;

        let client = AlgodClient::new(&config(server.url(), Some("secret")));
        let params = client.suggested_params().await.unwrap();

        mock.assert_async().await;
        assert_eq!(params.fee, 1_000);
        assert_eq!(params.first_valid, 5_000);
        assert_eq!(params.last_valid, 6_000);
        assert_eq!(params.genesis_id, "testnet-v1.0");
        assert_eq!(params.genesis_hash.len(), 32);
    }

    #[tokio::test]
    async fn test_suggested_params_server_error_is_network() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v2/transactions/params")
            .with_status(503)
            .with_body(r#"{"message":"node is catching up"}"#)
            .create_async()
            .await;

        let client = AlgodClient::new(&config(server.url(), None));
        let err = client.suggested_params().await.unwrap_err();
        assert_eq!(err, ChainError::Network("node is catching up".to_string()));
    }

    #[tokio::test]
    async fn test_submit_accepted() {
        let group = signed_group();
        let expected_id = group[0].transaction().id().unwrap();

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/transactions")
            .match_header("content-type", "application/x-binary")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"txId":"{}"}}"#, expected_id))
            .create_async()
            .await;

        let client = AlgodClient::new(&config(server.url(), None));
        let ids = client.submit(&group).await.unwrap();

        mock.assert_async().await;
        assert_eq!(ids, vec![expected_id]);
    }

    #[tokio::test]
    async fn test_submit_rejected_message_is_verbatim() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v2/transactions")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"overspend"}"#)
            .create_async()
            .await;

        let client = AlgodClient::new(&config(server.url(), None));
        let err = client.submit(&signed_group()).await.unwrap_err();
        assert_eq!(err, ChainError::Rejected("overspend".to_string()));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_network() {
        // Port 9 (discard) on localhost is not expected to run an HTTP server
        let client = AlgodClient::new(&config("http://127.0.0.1:9".to_string(), None));
        let err = client.suggested_params().await.unwrap_err();
        assert!(matches!(err, ChainError::Network(_)));
    }
}
