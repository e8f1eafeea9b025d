//! Credential lifecycle: storage, inspection, refresh, and session state.
//!
//! This module provides:
//! - `TokenStore`: the durable credential slot plus the routing-layer gate
//! - `claims`: unverified JWT decoding and near-expiry judgement
//! - `RefreshCoordinator`: single-flight credential refresh
//! - `SessionController`: startup validation, background revalidation, logout
//! - `LoginKeychain`: optional OS-keychain storage of the login password

pub mod claims;
pub mod credentials;
pub mod refresh;
pub mod session;
pub mod store;

pub use credentials::LoginKeychain;
pub use refresh::{HttpRefreshExchange, RefreshCoordinator, RefreshExchange};
pub use session::{SessionController, SessionState, REVALIDATE_INTERVAL_SECS};
pub use store::TokenStore;
