//! Durable credential storage plus the routing-layer gate channel.
//!
//! The store owns two files under the application state directory:
//!
//! - `auth_token`: the raw credential string, the single durable slot.
//! - `auth_token.cookie`: the same credential rendered as a `Set-Cookie`
//!   value (`Path=/; Max-Age=2592000; SameSite=Lax`). An external routing
//!   layer (reverse proxy) reads this to gate protected paths on token
//!   presence without ever decoding the token.
//!
//! The store is the sole writer of credential state; every other component
//! reads through it. Storage failures are not modeled as errors - they are
//! logged and the operation degrades to a no-op, matching the semantics of
//! a browser key-value store.

use std::path::PathBuf;

use tracing::debug;

/// File name of the durable credential slot.
const TOKEN_FILE: &str = "auth_token";

/// File name of the gate channel read by the external routing layer.
const GATE_FILE: &str = "auth_token.cookie";

/// Cookie name used in the gate channel.
const COOKIE_NAME: &str = "auth_token";

/// Gate cookie lifetime: 30 days.
const COOKIE_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;

/// `Expires` value in the past, so the reader evicts the entry immediately.
const COOKIE_EPOCH_EXPIRES: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

#[derive(Debug, Clone)]
pub struct TokenStore {
    state_dir: Option<PathBuf>,
}

impl TokenStore {
    /// Store backed by `state_dir` (created on first write).
    pub fn new(state_dir: PathBuf) -> Self {
        Self {
            state_dir: Some(state_dir),
        }
    }

    /// Store with no backing directory: `get` returns `None`, writes are
    /// no-ops. Used when no state directory can be resolved.
    pub fn disabled() -> Self {
        Self { state_dir: None }
    }

    /// Read the stored credential, if any.
    pub fn get(&self) -> Option<String> {
        let path = self.state_dir.as_ref()?.join(TOKEN_FILE);
        match std::fs::read_to_string(&path) {
            Ok(token) if !token.trim().is_empty() => Some(token.trim().to_string()),
            Ok(_) => None,
            Err(_) => None,
        }
    }

    /// Durably persist `token` and publish it on the gate channel.
    pub fn set(&self, token: &str) {
        let Some(dir) = self.state_dir.as_ref() else {
            return;
        };
        if let Err(e) = std::fs::create_dir_all(dir) {
            debug!(error = %e, "could not create credential state dir");
            return;
        }
        if let Err(e) = std::fs::write(dir.join(TOKEN_FILE), token) {
            debug!(error = %e, "could not persist credential");
        }
        if let Err(e) = std::fs::write(dir.join(GATE_FILE), gate_cookie_value(token)) {
            debug!(error = %e, "could not publish credential gate cookie");
        }
    }

    /// Remove the credential from the durable slot and expire the gate
    /// channel entry.
    pub fn clear(&self) {
        let Some(dir) = self.state_dir.as_ref() else {
            return;
        };
        let token_path = dir.join(TOKEN_FILE);
        if token_path.exists() {
            if let Err(e) = std::fs::remove_file(&token_path) {
                debug!(error = %e, "could not remove stored credential");
            }
        }
        // The gate entry is expired rather than deleted: the routing layer
        // observes an explicit eviction instead of a possibly-stale file.
        if dir.join(GATE_FILE).exists() {
            if let Err(e) = std::fs::write(dir.join(GATE_FILE), expired_gate_cookie_value()) {
                debug!(error = %e, "could not expire credential gate cookie");
            }
        }
    }

    /// Path of the gate channel file, for external readers.
    pub fn gate_path(&self) -> Option<PathBuf> {
        Some(self.state_dir.as_ref()?.join(GATE_FILE))
    }
}

fn gate_cookie_value(token: &str) -> String {
    format!("{COOKIE_NAME}={token}; Path=/; Max-Age={COOKIE_MAX_AGE_SECS}; SameSite=Lax")
}

fn expired_gate_cookie_value() -> String {
    format!("{COOKIE_NAME}=; Path=/; Expires={COOKIE_EPOCH_EXPIRES}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, TokenStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("state"));
        (dir, store)
    }

    #[test]
    fn set_then_get_round_trips() {
        let (_dir, store) = temp_store();
        assert_eq!(store.get(), None);

        store.set("aaa.bbb.ccc");
        assert_eq!(store.get().as_deref(), Some("aaa.bbb.ccc"));

        store.set("ddd.eee.fff");
        assert_eq!(store.get().as_deref(), Some("ddd.eee.fff"));
    }

    #[test]
    fn set_publishes_gate_cookie_with_attributes() {
        let (_dir, store) = temp_store();
        store.set("tok123");

        let gate = std::fs::read_to_string(store.gate_path().unwrap()).unwrap();
        assert!(gate.starts_with("auth_token=tok123;"));
        assert!(gate.contains("Path=/"));
        assert!(gate.contains("Max-Age=2592000"));
        assert!(gate.contains("SameSite=Lax"));
    }

    #[test]
    fn clear_removes_slot_and_expires_gate() {
        let (_dir, store) = temp_store();
        store.set("tok123");
        store.clear();

        assert_eq!(store.get(), None);
        let gate = std::fs::read_to_string(store.gate_path().unwrap()).unwrap();
        assert!(gate.starts_with("auth_token=;"));
        assert!(gate.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
        assert!(!gate.contains("tok123"));
    }

    #[test]
    fn clear_is_idempotent() {
        let (_dir, store) = temp_store();
        store.clear();
        store.set("tok");
        store.clear();
        store.clear();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn disabled_store_is_a_no_op() {
        let store = TokenStore::disabled();
        store.set("tok");
        assert_eq!(store.get(), None);
        store.clear();
        assert!(store.gate_path().is_none());
    }
}
