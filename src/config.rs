use anyhow::{bail, Result};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub chain: ChainConfig,
    pub directory: DirectoryConfig,
    pub payment: PaymentConfig,
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub algod_url: String,
    pub algod_token: Option<String>,
    /// Width of the validity window of built transactions, in rounds
    pub validity_rounds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    pub api_url: String,
    pub catalog_path: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    pub method_signature: String,
    pub unit_decimals: u32,
    pub max_amount: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Deserialize)]
pub struct WalletConfig {
    pub seed: Option<String>,
}

// Keep the seed out of `Configuration loaded: {:?}` logs
impl std::fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletConfig")
            .field("seed", &self.seed.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            method_signature: "pay(pay)void".to_string(),
            unit_decimals: 6,
            max_amount: "100".to_string(),
            timeout_secs: 45,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = PaymentConfig::default();
        let config = Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            chain: ChainConfig {
                algod_url: env::var("ALGOD_URL")
                    .unwrap_or_else(|_| "https://testnet-api.algonode.cloud".to_string()),
                algod_token: env::var("ALGOD_TOKEN").ok(),
                validity_rounds: env::var("PAYMENT_VALIDITY_ROUNDS")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()?,
            },
            directory: DirectoryConfig {
                api_url: env::var("MACHINE_API_URL")
                    .unwrap_or_else(|_| "http://localhost:3000/api".to_string()),
                catalog_path: env::var("MACHINE_CATALOG_PATH").ok(),
                request_timeout_secs: env::var("MACHINE_API_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
            },
            payment: PaymentConfig {
                method_signature: env::var("PAYMENT_METHOD_SIGNATURE")
                    .unwrap_or(defaults.method_signature),
                unit_decimals: env::var("PAYMENT_UNIT_DECIMALS")
                    .unwrap_or_else(|_| defaults.unit_decimals.to_string())
                    .parse()?,
                max_amount: env::var("PAYMENT_MAX_AMOUNT").unwrap_or(defaults.max_amount),
                timeout_secs: env::var("PAYMENT_TIMEOUT_SECS")
                    .unwrap_or_else(|_| defaults.timeout_secs.to_string())
                    .parse()?,
            },
            wallet: WalletConfig {
                seed: env::var("WALLET_SEED").ok().filter(|s| !s.trim().is_empty()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.payment.timeout_secs == 0 {
            bail!("PAYMENT_TIMEOUT_SECS must be greater than zero");
        }
        if self.payment.unit_decimals > crate::payment::units::MAX_UNIT_DECIMALS {
            bail!(
                "PAYMENT_UNIT_DECIMALS must be at most {}",
                crate::payment::units::MAX_UNIT_DECIMALS
            );
        }
        if self.chain.validity_rounds == 0 {
            bail!("PAYMENT_VALIDITY_ROUNDS must be greater than zero");
        }
        Ok(())
    }
}
