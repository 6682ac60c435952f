//! Errors at the HTTP seam. The stores never expose these; they collapse
//! every failure into a fixed per-operation message.

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("response body did not decode: {0}")]
    Decode(#[from] serde_json::Error),
}
