//! Transaction model and canonical encoding
//!
//! Transactions are encoded as msgpack maps with keys in lexicographic
//! order and zero-valued fields omitted. The struct field order below
//! follows the wire key order, so `rmp_serde::to_vec_named` produces the
//! canonical bytes that are hashed for ids and signed.

use super::address::{base32_encode, Address};
use super::{ChainError, SuggestedParams};
use serde::{Serialize, Serializer};
use serde_bytes::ByteBuf;
use sha2::{Digest, Sha512_256};

const TX_DOMAIN: &[u8] = b"TX";
const GROUP_DOMAIN: &[u8] = b"TG";
const SELECTOR_LEN: usize = 4;

/// Transaction type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionType {
    #[default]
    Payment,
    ApplicationCall,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Payment => "pay",
            TransactionType::ApplicationCall => "appl",
        }
    }
}

impl Serialize for TransactionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// An unsigned transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    /// Payment amount in smallest units
    #[serde(rename = "amt", skip_serializing_if = "is_zero")]
    pub amount: u64,

    /// Application call arguments
    #[serde(rename = "apaa", skip_serializing_if = "Vec::is_empty")]
    pub app_args: Vec<ByteBuf>,

    #[serde(rename = "apid", skip_serializing_if = "is_zero")]
    pub app_id: u64,

    #[serde(rename = "fee", skip_serializing_if = "is_zero")]
    pub fee: u64,

    #[serde(rename = "fv", skip_serializing_if = "is_zero")]
    pub first_valid: u64,

    #[serde(rename = "gen", skip_serializing_if = "String::is_empty")]
    pub genesis_id: String,

    #[serde(rename = "gh")]
    pub genesis_hash: ByteBuf,

    #[serde(rename = "grp", skip_serializing_if = "Option::is_none")]
    pub group: Option<ByteBuf>,

    #[serde(rename = "lv", skip_serializing_if = "is_zero")]
    pub last_valid: u64,

    #[serde(rename = "rcv", skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Address>,

    #[serde(rename = "snd")]
    pub sender: Address,

    #[serde(rename = "type")]
    pub kind: TransactionType,
}

impl Transaction {
    fn base(kind: TransactionType, sender: Address, params: &SuggestedParams) -> Self {
        Self {
            amount: 0,
            app_args: Vec::new(),
            app_id: 0,
            fee: params.fee,
            first_valid: params.first_valid,
            genesis_id: params.genesis_id.clone(),
            genesis_hash: ByteBuf::from(params.genesis_hash.clone()),
            group: None,
            last_valid: params.last_valid,
            receiver: None,
            sender,
            kind,
        }
    }

    /// Funds transfer from `sender` to `receiver`
    pub fn payment(
        sender: Address,
        receiver: Address,
        amount: u64,
        params: &SuggestedParams,
    ) -> Self {
        Self {
            amount,
            receiver: Some(receiver),
            ..Self::base(TransactionType::Payment, sender, params)
        }
    }

    /// NoOp call into an application
    pub fn app_call(
        sender: Address,
        app_id: u64,
        app_args: Vec<Vec<u8>>,
        params: &SuggestedParams,
    ) -> Self {
        Self {
            app_id,
            app_args: app_args.into_iter().map(ByteBuf::from).collect(),
            ..Self::base(TransactionType::ApplicationCall, sender, params)
        }
    }

    /// Canonical msgpack encoding
    pub fn encode(&self) -> Result<Vec<u8>, ChainError> {
        rmp_serde::to_vec_named(self).map_err(|e| ChainError::Encoding(e.to_string()))
    }

    /// Domain-separated bytes covered by the signature
    pub fn bytes_to_sign(&self) -> Result<Vec<u8>, ChainError> {
        let mut bytes = TX_DOMAIN.to_vec();
        bytes.extend(self.encode()?);
        Ok(bytes)
    }

    /// Raw 32-byte transaction id
    pub fn raw_id(&self) -> Result<[u8; 32], ChainError> {
        Ok(Sha512_256::digest(self.bytes_to_sign()?).into())
    }

    /// Transaction id as shown by explorers and returned by the node
    pub fn id(&self) -> Result<String, ChainError> {
        Ok(base32_encode(&self.raw_id()?))
    }
}

#[derive(Serialize)]
struct TransactionGroup {
    #[serde(rename = "txlist")]
    tx_list: Vec<ByteBuf>,
}

/// Bind transactions into an atomic group.
///
/// The group id commits to the ids of every member, so it must be computed
/// after all other fields are final. Any previous group id is cleared first.
pub fn assign_group_id(transactions: &mut [Transaction]) -> Result<[u8; 32], ChainError> {
    let mut tx_list = Vec::with_capacity(transactions.len());
    for txn in transactions.iter_mut() {
        txn.group = None;
        tx_list.push(ByteBuf::from(txn.raw_id()?.to_vec()));
    }

    let encoded = rmp_serde::to_vec_named(&TransactionGroup { tx_list })
        .map_err(|e| ChainError::Encoding(e.to_string()))?;
    let mut hasher = Sha512_256::new();
    hasher.update(GROUP_DOMAIN);
    hasher.update(&encoded);
    let group_id: [u8; 32] = hasher.finalize().into();

    for txn in transactions.iter_mut() {
        txn.group = Some(ByteBuf::from(group_id.to_vec()));
    }
    Ok(group_id)
}

/// ABI method selector: first four bytes of SHA-512/256 of the signature
pub fn method_selector(signature: &str) -> [u8; SELECTOR_LEN] {
    let digest = Sha512_256::digest(signature.as_bytes());
    let mut selector = [0u8; SELECTOR_LEN];
    selector.copy_from_slice(&digest[..SELECTOR_LEN]);
    selector
}

/// A transaction with its ed25519 signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedTransaction {
    #[serde(rename = "sig")]
    signature: ByteBuf,

    #[serde(rename = "txn")]
    transaction: Transaction,
}

impl SignedTransaction {
    pub fn new(signature: [u8; 64], transaction: Transaction) -> Self {
        Self {
            signature: ByteBuf::from(signature.to_vec()),
            transaction,
        }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn encode(&self) -> Result<Vec<u8>, ChainError> {
        rmp_serde::to_vec_named(self).map_err(|e| ChainError::Encoding(e.to_string()))
    }
}
