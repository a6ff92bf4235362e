pub mod cipher;
pub mod constants;
pub mod error;
pub mod token;

// Re-export the derivation surface for easy access
pub use error::GateError;
pub use token::{Secret, TokenType, derive_token, derive_token_at, parse_phone_number};
