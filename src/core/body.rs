//! Response body sources.

use std::path::PathBuf;

use bytes::Bytes;

/// Target format of an encoded body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
}

/// Where the response body comes from.
///
/// Exactly one variant is active; setting a new body replaces the old one.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    /// No body (204, redirects).
    #[default]
    Empty,
    /// Literal text written verbatim.
    Text(String),
    /// Structured value encoded at emission time.
    Encoded(serde_json::Value, Encoding),
    /// File streamed to the client as an attachment.
    File {
        path: PathBuf,
        name: String,
    },
}

impl Body {
    /// Literal bytes for inline bodies.
    ///
    /// Returns `None` for file attachments, which are streamed by the emitter.
    pub fn inline_bytes(&self) -> Option<Bytes> {
        match self {
            Body::Empty => Some(Bytes::new()),
            Body::Text(text) => Some(Bytes::copy_from_slice(text.as_bytes())),
            Body::Encoded(value, Encoding::Json) => Some(Bytes::from(
                serde_json::to_vec(value).unwrap_or_default(),
            )),
            Body::File { .. } => None,
        }
    }

    /// Path of the attachment, if this body is a file.
    #[inline]
    pub fn file_path(&self) -> Option<&PathBuf> {
        match self {
            Body::File { path, .. } => Some(path),
            _ => None,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}
