use thiserror::Error;

/// Reasons an inbound request is rejected before any handler runs.
///
/// Every variant maps to `401 Unauthorized` at the HTTP boundary.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("signature header is not valid hex")]
    MalformedSignature,

    #[error("signature does not match request body")]
    SignatureMismatch,

    #[error("request body could not be read: {0}")]
    BodyRead(String),

    #[error("verified body is not a valid interaction: {0}")]
    MalformedPayload(#[from] ParseError),
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid interaction json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("interaction type {kind} requires a data object")]
    MissingData { kind: u16 },

    #[error("interaction type {kind} has invalid data: {error}")]
    InvalidData {
        kind: u16,
        error: serde_json::Error,
    },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VerifierError {
    #[error("public key is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("public key must be 32 bytes, got {0}")]
    Length(usize),
}

/// A handler raised while processing an authenticated interaction.
///
/// Surfaced unmodified to the serving layer, which answers `500`.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("command handler for '{name}' failed: {error:#}")]
    Command { name: String, error: anyhow::Error },

    #[error("autocomplete handler for '{name}' failed: {error:#}")]
    Autocomplete { name: String, error: anyhow::Error },

    #[error("interaction handler chain failed: {0:#}")]
    Chain(anyhow::Error),
}
