//! HTTP client module for the chat-assistant backend.
//!
//! `ApiClient` wraps every outbound call with the credential lifecycle:
//! proactive refresh on near-expiry tokens, bearer authorization, and a
//! single refresh-and-retry cycle on 401 responses.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
