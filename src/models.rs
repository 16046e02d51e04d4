use crate::config::Config;
use crate::machines::StaticCatalog;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub catalog: Arc<StaticCatalog>,
}

/// A vending machine as published by the machine directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineRecord {
    pub id: String,

    /// Application id of the machine's payment contract, kept as the raw
    /// handle; it is only parsed when a payment is built.
    #[serde(
        rename = "machine_contract_address",
        deserialize_with = "contract_handle"
    )]
    pub contract_address: String,

    /// Price in display units (e.g. 2.5 ALGO). Read from a JSON number or
    /// string, written as a number.
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub price: Decimal,

    /// When true the record's price is charged regardless of keypad input
    #[serde(default = "default_fixed_price")]
    pub fixed_price: bool,

    /// Opaque to the payment path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_fixed_price() -> bool {
    true
}

// Directories publish the handle either as a JSON string or a JSON number
fn contract_handle<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawHandle {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawHandle::deserialize(deserializer)? {
        RawHandle::Text(text) => text,
        RawHandle::Number(number) => number.to_string(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub machines: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_record_from_directory_json() {
        let record: MachineRecord = serde_json::from_str(
            r#"{"id":"m1","machine_contract_address":"123","price":2.5,"api_key":"k-1"}"#,
        )
        .unwrap();

        assert_eq!(record.id, "m1");
        assert_eq!(record.contract_address, "123");
        assert_eq!(record.price, Decimal::new(25, 1));
        assert!(record.fixed_price);
        assert_eq!(record.api_key.as_deref(), Some("k-1"));
    }

    #[test]
    fn test_numeric_contract_handle() {
        let record: MachineRecord = serde_json::from_str(
            r#"{"id":"m2","machine_contract_address":456,"price":"1.25","fixed_price":false}"#,
        )
        .unwrap();

        assert_eq!(record.contract_address, "456");
        assert_eq!(record.price, Decimal::new(125, 2));
        assert!(!record.fixed_price);
        assert!(record.api_key.is_none());

        let negative: MachineRecord = serde_json::from_str(
            r#"{"id":"m3","machine_contract_address":-4,"price":1}"#,
        )
        .unwrap();
        assert_eq!(negative.contract_address, "-4");
    }

    #[test]
    fn test_price_serializes_as_number() {
        let record: MachineRecord = serde_json::from_str(
            r#"{"id":"m1","machine_contract_address":"123","price":"2.5"}"#,
        )
        .unwrap();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["price"], serde_json::json!(2.5));
        assert_eq!(json["machine_contract_address"], "123");
    }
}
