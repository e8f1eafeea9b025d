//! Optional "remember me" storage of login secrets in the OS keychain.
//!
//! Only the login password lives here, keyed by email. The bearer
//! credential itself goes through `TokenStore`; the keychain entry just
//! lets the login prompt skip the password question on the next run.

use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "chatterm";

pub struct LoginKeychain;

impl LoginKeychain {
    /// Remember the password for `email` in the OS keychain.
    pub fn remember(email: &str, password: &str) -> Result<()> {
        Entry::new(SERVICE_NAME, email)
            .context("Failed to create keyring entry")?
            .set_password(password)
            .context("Failed to store password in keychain")
    }

    /// Recall the remembered password for `email`, if any.
    /// Keychain errors degrade to `None` so login falls back to prompting.
    pub fn recall(email: &str) -> Option<String> {
        Entry::new(SERVICE_NAME, email)
            .ok()?
            .get_password()
            .ok()
    }

    /// Forget the remembered password for `email`.
    pub fn forget(email: &str) -> Result<()> {
        Entry::new(SERVICE_NAME, email)
            .context("Failed to create keyring entry")?
            .delete_credential()
            .context("Failed to delete credential from keychain")
    }
}
