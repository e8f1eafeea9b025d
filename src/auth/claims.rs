//! Credential inspection: decoding JWT claims and judging expiry.
//!
//! Decoding is unverified by design - the backend is the only party that
//! validates signatures. The client only needs the claims to derive the
//! current identity and to decide when a token is close enough to expiry
//! to refresh. Anything malformed is treated as already expired.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Identity;

/// Refresh a token once it is within this window of its expiry (5 minutes).
pub const DEFAULT_EXPIRY_LOOKAHEAD_SECS: i64 = 300;

/// Decoded claims embedded in a credential.
///
/// `sub`, `email` and `exp` are required; everything else is read
/// defensively since the backend is free to add or omit fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    /// Expiration instant, seconds since the epoch.
    pub exp: i64,
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub app_metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    /// Expiration instant of these claims, or `None` for an `exp` value
    /// outside the representable range.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Project the claims into the in-memory session identity.
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.sub.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
            user_metadata: self.user_metadata.clone(),
            app_metadata: self.app_metadata.clone(),
        }
    }
}

/// Decode the claims of a three-segment dot-delimited credential.
///
/// Returns `None` for any malformed input - wrong segment count, bad
/// base64, bad UTF-8/JSON, or missing required fields. Never panics.
pub fn decode(token: &str) -> Option<Claims> {
    let mut parts = token.split('.');
    let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    // Tolerate padded producers; the engine itself rejects '='.
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Whether the credential expires within `lookahead` from now.
///
/// An undecodable token is reported as near-expiry: failing closed here
/// forces a refresh (or logout) instead of sending a doomed request.
pub fn is_near_expiry(token: &str, lookahead: Duration) -> bool {
    match decode(token).and_then(|c| c.expires_at()) {
        Some(expires_at) => Utc::now() + lookahead >= expires_at,
        None => true,
    }
}

/// The instant at which the credential expires, if it can be decoded.
pub fn expiration_instant(token: &str) -> Option<DateTime<Utc>> {
    decode(token).and_then(|c| c.expires_at())
}

/// The default near-expiry lookahead window.
pub fn default_lookahead() -> Duration {
    Duration::seconds(DEFAULT_EXPIRY_LOOKAHEAD_SECS)
}
