//! Chain addresses
//!
//! An address is a 32-byte public key rendered as 58 characters of
//! unpadded RFC 4648 base32: the key followed by the last four bytes of
//! its SHA-512/256 digest as a checksum.
//!
//! Application (contract) accounts have no private key. Their address is
//! derived from the numeric application id:
//!
//! ```text
//! SHA-512/256("appID" || app_id as u64 big-endian)
//! ```

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha512_256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of the textual address
pub const ADDRESS_LEN: usize = 58;

const KEY_LEN: usize = 32;
const CHECKSUM_LEN: usize = 4;
const APP_ID_PREFIX: &[u8] = b"appID";
const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Address parsing and derivation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("application id is empty")]
    EmptyApplicationId,

    #[error("application id must not be negative: {0}")]
    NegativeApplicationId(String),

    #[error("application id is not numeric: {0}")]
    NonNumericApplicationId(String),

    #[error("application id does not fit in 64 bits: {0}")]
    ApplicationIdOverflow(String),

    #[error("application id 0 does not refer to a deployed application")]
    ZeroApplicationId,

    #[error("address must be {ADDRESS_LEN} characters, got {0}")]
    InvalidLength(usize),

    #[error("address contains a character outside the base32 alphabet: {0:?}")]
    InvalidCharacter(char),

    #[error("address checksum mismatch")]
    ChecksumMismatch,
}

/// A 32-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; KEY_LEN]);

impl Address {
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Escrow account address of an application
    pub fn for_application(app_id: u64) -> Self {
        let mut hasher = Sha512_256::new();
        hasher.update(APP_ID_PREFIX);
        hasher.update(app_id.to_be_bytes());
        Self(hasher.finalize().into())
    }

    fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        let digest = Sha512_256::digest(self.0);
        let mut checksum = [0u8; CHECKSUM_LEN];
        checksum.copy_from_slice(&digest[digest.len() - CHECKSUM_LEN..]);
        checksum
    }
}

/// Parse a raw contract handle into an application id.
///
/// Accepts only plain decimal digits (surrounding whitespace is ignored).
/// Signs, decimal points and hex prefixes are rejected.
pub fn parse_application_id(raw: &str) -> Result<u64, AddressError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AddressError::EmptyApplicationId);
    }
    if let Some(rest) = trimmed.strip_prefix('-') {
        if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AddressError::NegativeApplicationId(trimmed.to_string()));
        }
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AddressError::NonNumericApplicationId(trimmed.to_string()));
    }

    let app_id: u64 = trimmed
        .parse()
        .map_err(|_| AddressError::ApplicationIdOverflow(trimmed.to_string()))?;
    if app_id == 0 {
        return Err(AddressError::ZeroApplicationId);
    }
    Ok(app_id)
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut raw = [0u8; KEY_LEN + CHECKSUM_LEN];
        raw[..KEY_LEN].copy_from_slice(&self.0);
        raw[KEY_LEN..].copy_from_slice(&self.checksum());
        f.write_str(&base32_encode(&raw))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ADDRESS_LEN {
            return Err(AddressError::InvalidLength(s.len()));
        }
        let raw = base32_decode(s)?;
        if raw.len() < KEY_LEN + CHECKSUM_LEN {
            return Err(AddressError::InvalidLength(s.len()));
        }

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&raw[..KEY_LEN]);
        let address = Address(key);
        if address.checksum()[..] != raw[KEY_LEN..KEY_LEN + CHECKSUM_LEN] {
            return Err(AddressError::ChecksumMismatch);
        }
        Ok(address)
    }
}

// Addresses travel as raw 32-byte binary on the wire
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

/// Unpadded RFC 4648 base32
pub(crate) fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
        buffer &= (1 << bits) - 1;
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

fn base32_decode(text: &str) -> Result<Vec<u8>, AddressError> {
    let mut out = Vec::with_capacity(text.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for c in text.chars() {
        let value = BASE32_ALPHABET
            .iter()
            .position(|&a| a as char == c)
            .ok_or(AddressError::InvalidCharacter(c))? as u32;
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base32_rfc4648_vectors() {
        assert_eq!(base32_encode(b""), "");
        assert_eq!(base32_encode(b"f"), "MY");
        assert_eq!(base32_encode(b"fo"), "MZXQ");
        assert_eq!(base32_encode(b"foo"), "MZXW6");
        assert_eq!(base32_encode(b"foobar"), "MZXW6YTBOI");
    }

    #[test]
    fn test_zero_address() {
        let zero = Address::from_bytes([0u8; 32]);
        assert_eq!(
            zero.to_string(),
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ"
        );
    }

    #[test]
    fn test_application_address_is_deterministic() {
        let a = Address::for_application(123);
        let b = Address::for_application(123);
        let c = Address::for_application(124);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string().len(), ADDRESS_LEN);

        let mut hasher = Sha512_256::new();
        hasher.update(b"appID");
        hasher.update([0, 0, 0, 0, 0, 0, 0, 123]);
        let expected: [u8; 32] = hasher.finalize().into();
        assert_eq!(a.as_bytes(), &expected);
    }

    #[test]
    fn test_address_text_roundtrip_and_checksum() {
        let address = Address::for_application(987_654);
        let text = address.to_string();
        assert_eq!(text.parse::<Address>().unwrap(), address);

        // Flip the first character to corrupt the key part
        let mut corrupted: Vec<char> = text.chars().collect();
        corrupted[0] = if corrupted[0] == 'A' { 'B' } else { 'A' };
        let corrupted: String = corrupted.into_iter().collect();
        assert_eq!(corrupted.parse::<Address>(), Err(AddressError::ChecksumMismatch));

        assert_eq!("SHORT".parse::<Address>(), Err(AddressError::InvalidLength(5)));
        let lowercase = text.to_lowercase();
        assert!(matches!(
            lowercase.parse::<Address>(),
            Err(AddressError::InvalidCharacter(_))
        ));
    }

    #[test]
    fn test_parse_application_id() {
        assert_eq!(parse_application_id("123"), Ok(123));
        assert_eq!(parse_application_id(" 42 "), Ok(42));
        assert_eq!(parse_application_id("18446744073709551615"), Ok(u64::MAX));

        assert_eq!(parse_application_id(""), Err(AddressError::EmptyApplicationId));
        assert_eq!(parse_application_id("0"), Err(AddressError::ZeroApplicationId));
        assert!(matches!(
            parse_application_id("-5"),
            Err(AddressError::NegativeApplicationId(_))
        ));
        assert!(matches!(
            parse_application_id("abc"),
            Err(AddressError::NonNumericApplicationId(_))
        ));
        assert!(matches!(
            parse_application_id("12.5"),
            Err(AddressError::NonNumericApplicationId(_))
        ));
        assert!(matches!(
            parse_application_id("+7"),
            Err(AddressError::NonNumericApplicationId(_))
        ));
        assert!(matches!(
            parse_application_id("18446744073709551616"),
            Err(AddressError::ApplicationIdOverflow(_))
        ));
    }
}
