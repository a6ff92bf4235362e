//! Temporal token derivation for the gate-control API
//!
//! Every request to the vendor API carries a short-lived 23-byte token in the
//! `x-bt-token` header, derived from the long-lived session secret, the
//! user's phone number (which the vendor uses as the user id), the token type
//! and the current time. The server recomputes the same value and accepts a
//! token for roughly 5 seconds around its timestamp.
//!
//! # Token layout (23 bytes, hex-encoded to 46 uppercase characters)
//!
//! - Byte 0: token type tag (0x01 SMS, 0x11 primary, 0x21 secondary)
//! - Bytes 1..7: low 48 bits of the phone number, big-endian
//! - Bytes 7..23: output of the second cipher pass

use std::time::{SystemTime, UNIX_EPOCH};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::cipher::{CipherMode, mix_block};
use crate::constants::{BASE_KEY, BLOCK_SIZE, TIMESTAMP_OFFSET, TOKEN_SIZE};
use crate::error::GateError;

/// How the session secret was obtained. Carried as a tag byte in the token.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    IntoPrimitive,
    TryFromPrimitive,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[repr(u8)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TokenType {
    /// Secret obtained via an SMS code
    Sms = 0,
    /// Secret obtained by linking the primary device
    Primary = 1,
    /// Secret obtained by linking a secondary device
    Secondary = 2,
}

impl TokenType {
    /// Map the selector code used by the vendor app ("0"/"1"/"2") to a
    /// token type. Anything else fails with [`GateError::UnknownTokenType`].
    pub fn from_code(code: u8) -> Result<Self, GateError> {
        Self::try_from(code).map_err(|_| GateError::UnknownTokenType(code))
    }

    /// The tag byte placed at offset 0 of the token.
    pub const fn tag(self) -> u8 {
        match self {
            TokenType::Sms => 0x01,
            TokenType::Primary => 0x11,
            TokenType::Secondary => 0x21,
        }
    }
}

/// The 16-byte long-lived session secret tokens are derived from.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret([u8; BLOCK_SIZE]);

impl Secret {
    /// Build a secret from raw bytes. Any length other than 16 fails with
    /// [`GateError::InvalidSecretLength`]; nothing is padded or truncated.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GateError> {
        let raw: [u8; BLOCK_SIZE] = bytes
            .try_into()
            .map_err(|_| GateError::InvalidSecretLength(bytes.len()))?;
        Ok(Self(raw))
    }

    /// Decode a secret from its 32-character hex form, as handed out by the
    /// vendor during registration.
    pub fn from_hex(hex_str: &str) -> Result<Self, GateError> {
        let raw = hex::decode(hex_str.trim())?;
        trace!(len = raw.len(), "decoded session secret");
        Self::from_bytes(&raw)
    }

    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keep key material out of logs
        f.write_str("Secret(..)")
    }
}

/// Parse a phone number in international format from its decimal form.
///
/// Digits only: no sign, no separators. Only the low 48 bits are consumed
/// by the token layout; wider values are silently masked, which is what the
/// vendor's own client does.
pub fn parse_phone_number(input: &str) -> Result<u64, GateError> {
    let digits = input.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GateError::InvalidPhoneNumber(digits.to_string()));
    }
    digits
        .parse::<u64>()
        .map_err(|e| GateError::InvalidPhoneNumber(e.to_string()))
}

/// Derive a token for the current wall-clock time using the default vendor
/// clock offset.
pub fn derive_token(
    secret: &Secret,
    phone_number: u64,
    token_type: TokenType,
) -> Result<String, GateError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    derive_token_at(secret, phone_number, token_type, now, TIMESTAMP_OFFSET)
}

/// Derive a token for an explicit timestamp and clock offset.
///
/// This form is pure: identical inputs always produce the identical
/// 46-character uppercase hex string.
pub fn derive_token_at(
    secret: &Secret,
    phone_number: u64,
    token_type: TokenType,
    timestamp_secs: u64,
    timestamp_offset: i64,
) -> Result<String, GateError> {
    let seed = round_key_seed(phone_number);
    let step_a = mix_block(secret.as_bytes(), &seed, CipherMode::Forward)?;

    let window = window_block(timestamp_secs, timestamp_offset);
    let step_b = mix_block(&window, &step_a, CipherMode::Inverse)?;

    let phone_be = phone_number.to_be_bytes();
    let mut token = [0u8; TOKEN_SIZE];
    token[0] = token_type.tag();
    token[1] = (phone_number >> 0x28) as u8;
    token[2] = (phone_number >> 0x20) as u8;
    token[3] = (phone_number >> 0x18) as u8;
    token[4..7].copy_from_slice(&phone_be[5..8]);
    token[7..23].copy_from_slice(&step_b);

    Ok(hex::encode_upper(token))
}

/// Key material for the first cipher pass: the fixed seed with the low 48
/// bits of the phone number spliced in at offsets 6..12, big-endian.
fn round_key_seed(phone_number: u64) -> [u8; BLOCK_SIZE] {
    let mut key = BASE_KEY;
    key[6..12].copy_from_slice(&phone_number.to_be_bytes()[2..8]);
    key
}

/// State block for the second cipher pass: 0x0A0A little-endian at offsets
/// 1..3 and the offset-adjusted timestamp at offsets 10..14, big-endian.
fn window_block(timestamp_secs: u64, timestamp_offset: i64) -> [u8; BLOCK_SIZE] {
    let windowed = (timestamp_secs as i64).wrapping_add(timestamp_offset) as u32;
    let mut block = [0u8; BLOCK_SIZE];
    block[1..3].copy_from_slice(&0x0a0au16.to_le_bytes());
    block[10..14].copy_from_slice(&windowed.to_be_bytes());
    block
}
