//! On-disk object format.
//!
//! Every object file under `object/` is a JSON envelope:
//!
//! ```text
//! {"version":1,"type":"blob","encoding":"utf8","content":"hello\n"}
//! ```
//!
//! `type` is `blob` or `commit`. UTF-8 payloads are stored verbatim as a JSON
//! string; anything else is stored hex-encoded. The object's digest is always
//! computed over the decoded payload bytes, never over the envelope.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current object envelope version.
pub const OBJECT_VERSION: u32 = 1;

/// Object types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    /// File content.
    Blob,
    /// A serialized commit record.
    Commit,
}

impl ObjectType {
    /// Get the string name of this object type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Blob => "blob",
            ObjectType::Commit => "commit",
        }
    }
}

/// How the payload is represented in `content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Utf8,
    Hex,
}

/// A stored object as written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEnvelope {
    /// Envelope format version.
    pub version: u32,
    /// Object type.
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    /// Payload representation.
    pub encoding: Encoding,
    /// Encoded payload.
    pub content: String,
}

impl ObjectEnvelope {
    /// Wrap a payload, choosing the encoding from its contents.
    pub fn new(object_type: ObjectType, payload: &[u8]) -> Self {
        let (encoding, content) = match std::str::from_utf8(payload) {
            Ok(text) => (Encoding::Utf8, text.to_string()),
            Err(_) => (Encoding::Hex, hex::encode(payload)),
        };

        Self {
            version: OBJECT_VERSION,
            object_type,
            encoding,
            content,
        }
    }

    /// Serialize the envelope to JSON bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode an envelope read from `path`.
    pub fn decode(path: &Path, bytes: &[u8]) -> Result<Self> {
        let envelope: ObjectEnvelope = serde_json::from_slice(bytes)
            .map_err(|e| Error::corrupted_object(path, format!("Invalid object JSON: {}", e)))?;

        if envelope.version != OBJECT_VERSION {
            return Err(Error::corrupted_object(
                path,
                format!(
                    "Unsupported object version: {} (expected {})",
                    envelope.version, OBJECT_VERSION
                ),
            ));
        }

        Ok(envelope)
    }

    /// Recover the original payload bytes.
    pub fn payload(&self, path: &Path) -> Result<Vec<u8>> {
        match self.encoding {
            Encoding::Utf8 => Ok(self.content.clone().into_bytes()),
            Encoding::Hex => hex::decode(&self.content)
                .map_err(|e| Error::corrupted_object(path, format!("Invalid hex payload: {}", e))),
        }
    }
}
