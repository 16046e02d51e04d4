use axum::{
    Router,
    routing::get,
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
};
use crate::models::{AppState, MachineRecord};
use tracing::{info, warn};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/machines/{id}", get(get_machine))
        .with_state(state)
}

pub async fn get_machine(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ResponseJson<MachineRecord>, StatusCode> {
    match state.catalog.get(&id) {
        Some(record) => {
            info!("Serving machine {}", id);
            Ok(Json(record.clone()))
        }
        None => {
            warn!("Machine not found: {}", id);
            Err(StatusCode::NOT_FOUND)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ChainConfig, Config, DirectoryConfig, PaymentConfig, ServerConfig, WalletConfig,
    };
    use crate::machines::StaticCatalog;
    use crate::routes::create_router;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState {
            config: Config {
                server: ServerConfig {
                    port: 0,
                    host: "127.0.0.1".to_string(),
                    cors_allowed_origins: vec!["http://localhost:5173".to_string()],
                },
                chain: ChainConfig {
                    algod_url: "http://localhost:4001".to_string(),
                    algod_token: None,
                    validity_rounds: 1_000,
                },
                directory: DirectoryConfig {
                    api_url: "http://localhost:3000/api".to_string(),
                    catalog_path: None,
                    request_timeout_secs: 5,
                },
                payment: PaymentConfig::default(),
                wallet: WalletConfig { seed: None },
            },
            catalog: Arc::new(StaticCatalog::demo()),
        }
    }

    #[tokio::test]
    async fn test_get_machine() {
        let app = create_router(state());
        let response = app
            .oneshot(Request::builder().uri("/api/machines/snack-01").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["price"], serde_json::json!(2.5));
        assert_eq!(json["machine_contract_address"], "720428123");

        let record: MachineRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.id, "snack-01");
        assert_eq!(record.price, rust_decimal::Decimal::new(25, 1));
    }

    #[tokio::test]
    async fn test_unknown_machine_is_404() {
        let app = create_router(state());
        let response = app
            .oneshot(Request::builder().uri("/api/machines/ghost").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_reports_catalog_size() {
        let app = create_router(state());
        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["machines"], 4);
    }
}
