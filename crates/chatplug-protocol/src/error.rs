//! Error types for the protocol layer.
//!
//! Each crate in chatplug defines its own error enum. A `ProtocolError`
//! always means a framing or (de)serialization problem, never a network
//! or routing one.

use std::fmt;

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed.
    ///
    /// `path` names the part of the frame being decoded (`$` for a whole
    /// frame, `payload`, `data.messageReceived`, ...) and `bytes` keeps
    /// the offending input so it can be logged next to the error.
    #[error("decode failed at {path}: {source}")]
    Decode {
        path: String,
        bytes: Vec<u8>,
        #[source]
        source: serde_json::Error,
    },

    /// A value the frame must carry was absent or `null`.
    #[error("missing field: {path}")]
    MissingField { path: String },

    /// The message is well-formed JSON but violates the protocol.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl ProtocolError {
    pub(crate) fn decode(
        path: impl Into<String>,
        bytes: &[u8],
        source: serde_json::Error,
    ) -> Self {
        Self::Decode {
            path: path.into(),
            bytes: bytes.to_vec(),
            source,
        }
    }

    /// The input that failed to decode, if this is a decode error.
    pub fn offending_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Decode { bytes, .. } => Some(bytes),
            _ => None,
        }
    }

    /// The field path the error refers to, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Decode { path, .. } | Self::MissingField { path } => Some(path),
            _ => None,
        }
    }

    /// Lossy, length-capped rendering of the offending bytes for logs.
    pub fn snippet(&self) -> impl fmt::Display + '_ {
        Snippet(self.offending_bytes().unwrap_or_default())
    }
}

const SNIPPET_LEN: usize = 256;

struct Snippet<'a>(&'a [u8]);

impl fmt::Display for Snippet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.0.len().min(SNIPPET_LEN);
        write!(f, "{}", String::from_utf8_lossy(&self.0[..end]))?;
        if self.0.len() > SNIPPET_LEN {
            write!(f, "...")?;
        }
        Ok(())
    }
}
