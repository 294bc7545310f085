use thiserror::Error;

/// Errors produced by the two-factor subsystem.
///
/// Remote failures are split into credential-rejected
/// (`ApiKeyRejected`/`TokenRejected`) and transport/other (`Remote`); the
/// split is derived from the 401 status marker the verification service
/// sends, which callers rely on to distinguish "wrong token" from "service
/// unreachable".
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("{0} unavailable on this host (check the system clock and random source)")]
    CapabilityUnavailable(&'static str),
    #[error("API key rejected by the verification service")]
    ApiKeyRejected,
    #[error("token rejected by the verification service")]
    TokenRejected,
    #[error("token does not match the expected code")]
    TokenMismatch,
    #[error("remote service error: {0}")]
    Remote(String),
    #[error("unknown provider id: {0}")]
    UnknownProvider(String),
    #[error("user {0} is not enrolled")]
    NotEnrolled(String),
    #[error("no credential file is configured")]
    StoreDisabled,
    #[error("credential store I/O error: {0}")]
    StoreIo(#[from] std::io::Error),
    #[error("malformed credential record: {0}")]
    StoreFormat(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
