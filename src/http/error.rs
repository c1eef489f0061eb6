use std::io;
use thiserror::Error;

/// Failure to build a response from its wire components.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed http version: {0:?}")]
    MalformedVersion(String),

    #[error("malformed status code: {0:?}")]
    MalformedStatusCode(String),
}

impl ParseError {
    pub fn malformed_version<S: ToString>(token: S) -> Self {
        Self::MalformedVersion(token.to_string())
    }

    pub fn malformed_status_code<S: ToString>(token: S) -> Self {
        Self::MalformedStatusCode(token.to_string())
    }
}

/// Failure while writing a response to its stream.
///
/// Bytes may already be on the wire for every variant except `BodyEncoding`,
/// `Compression` and `InvalidHeader`, which are detected before the head is
/// written.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid header {name:?}: must fit on a single header line")]
    InvalidHeader { name: String },

    #[error("body encoding failed: {source}")]
    BodyEncoding {
        #[from]
        source: serde_json::Error,
    },

    #[error("body compression failed: {source}")]
    Compression { source: io::Error },

    #[error("transmission failed: {source}")]
    Transmission {
        #[from]
        source: io::Error,
    },

    #[error("completion callback failed: {source}")]
    Completion { source: anyhow::Error },
}

impl SendError {
    pub fn invalid_header<S: ToString>(name: S) -> Self {
        Self::InvalidHeader { name: name.to_string() }
    }

    pub fn compression<E: Into<io::Error>>(e: E) -> Self {
        Self::Compression { source: e.into() }
    }

    pub fn completion<E: Into<anyhow::Error>>(e: E) -> Self {
        Self::Completion { source: e.into() }
    }

    /// Whether the failure happened after the message itself was fully written.
    pub fn is_completion(&self) -> bool {
        matches!(self, Self::Completion { .. })
    }
}
