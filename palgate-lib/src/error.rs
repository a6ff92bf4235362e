use thiserror::Error;

/// The primary error type for the `palgate-lib` library.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Invalid block length: expected 16 bytes, got {0}")]
    InvalidBlockLength(usize),

    #[error("Invalid secret length: expected 16 bytes, got {0}")]
    InvalidSecretLength(usize),

    #[error("Unknown token type code: {0}")]
    UnknownTokenType(u8),

    #[error("Invalid hex encoding: {0}")]
    InvalidHexEncoding(#[from] hex::FromHexError),

    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),
}
