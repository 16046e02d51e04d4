//! Local ed25519 signer
//!
//! Holds a single signing key in memory. The key is only reachable through
//! [`TransactionSigner::sign_transactions`] and is redacted from `Debug`.

use super::{TransactionSigner, WalletError};
use crate::chain::{Address, SignedTransaction, Transaction};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use std::fmt;

const SEED_LEN: usize = 32;

pub struct LocalSigner {
    key: SigningKey,
}

impl LocalSigner {
    /// Fresh random key
    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_seed(seed: [u8; SEED_LEN]) -> Self {
        Self {
            key: SigningKey::from_bytes(&seed),
        }
    }

    /// Parse a 32-byte seed given as hex (64 chars) or base64
    pub fn from_seed_str(encoded: &str) -> Result<Self, WalletError> {
        let encoded = encoded.trim();
        let bytes = if encoded.len() == SEED_LEN * 2 {
            hex::decode(encoded).map_err(|e| WalletError::InvalidKey(e.to_string()))?
        } else {
            BASE64
                .decode(encoded)
                .map_err(|e| WalletError::InvalidKey(e.to_string()))?
        };

        let seed: [u8; SEED_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            WalletError::InvalidKey(format!("seed must be {} bytes, got {}", SEED_LEN, b.len()))
        })?;
        Ok(Self::from_seed(seed))
    }

    /// Hex-encoded seed, for `vendpay keygen`
    pub fn seed_hex(&self) -> String {
        hex::encode(self.key.to_bytes())
    }
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address())
            .field("key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl TransactionSigner for LocalSigner {
    fn address(&self) -> Address {
        Address::from_bytes(self.key.verifying_key().to_bytes())
    }

    async fn sign_transactions(
        &self,
        transactions: &[Transaction],
    ) -> Result<Vec<SignedTransaction>, WalletError> {
        let own = self.address();
        transactions
            .iter()
            .map(|txn| {
                if txn.sender != own {
                    return Err(WalletError::Declined(format!(
                        "transaction sender {} is not the connected account",
                        txn.sender
                    )));
                }
                let signature = self.key.sign(&txn.bytes_to_sign()?);
                Ok(SignedTransaction::new(signature.to_bytes(), txn.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::SuggestedParams;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    fn params() -> SuggestedParams {
        SuggestedParams {
            fee: 1_000,
            first_valid: 1,
            last_valid: 1_001,
            genesis_id: "testnet-v1.0".to_string(),
            genesis_hash: vec![0u8; 32],
        }
    }

    #[test]
    fn test_seed_parsing() {
        let seed = [42u8; 32];
        let from_hex = LocalSigner::from_seed_str(&hex::encode(seed)).unwrap();
        let from_b64 = LocalSigner::from_seed_str(&BASE64.encode(seed)).unwrap();

        assert_eq!(from_hex.address(), from_b64.address());
        assert_eq!(from_hex.seed_hex(), hex::encode(seed));

        assert!(LocalSigner::from_seed_str("not a seed").is_err());
        assert!(LocalSigner::from_seed_str(&BASE64.encode([1u8; 16])).is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let signer = LocalSigner::from_seed([7u8; 32]);
        let rendered = format!("{:?}", signer);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains(&signer.seed_hex()));
    }

    #[tokio::test]
    async fn test_signatures_verify() {
        let signer = LocalSigner::generate();
        let txn = Transaction::payment(signer.address(), Address::for_application(1), 10, &params());

        let signed = signer.sign_transactions(&[txn.clone()]).await.unwrap();
        assert_eq!(signed.len(), 1);

        let key = VerifyingKey::from_bytes(signer.address().as_bytes()).unwrap();
        let signature = Signature::from_slice(signed[0].signature()).unwrap();
        key.verify(&txn.bytes_to_sign().unwrap(), &signature).unwrap();
    }

    #[tokio::test]
    async fn test_refuses_foreign_sender() {
        let signer = LocalSigner::generate();
        let other = LocalSigner::generate();
        let txn = Transaction::payment(other.address(), Address::for_application(1), 10, &params());

        let err = signer.sign_transactions(&[txn]).await.unwrap_err();
        assert!(matches!(err, WalletError::Declined(_)));
    }
}
