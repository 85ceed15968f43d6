//! Opaque, URL-safe, single-use token string.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A freshly issued stream token.
///
/// The value is the unpadded URL-safe base64 of a v4 UUID (122 random
/// bits). No other format is promised to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamToken {
    /// Token string handed to the client.
    value: String,
    /// When the token was issued.
    issued_at: DateTime<Utc>,
}

impl StreamToken {
    /// Generate a new random token stamped with `issued_at`.
    pub fn generate(issued_at: DateTime<Utc>) -> Self {
        Self {
            value: URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes()),
            issued_at,
        }
    }

    /// The token string.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Issuance time.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Consume the token, returning its string.
    pub fn into_string(self) -> String {
        self.value
    }
}

impl fmt::Display for StreamToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
