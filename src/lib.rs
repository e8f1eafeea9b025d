//! chatterm - a terminal client for a chat-assistant API.
//!
//! The interesting part of this crate is the credential lifecycle in
//! [`auth`]: durable token storage with a routing-layer gate channel,
//! unverified claims inspection, single-flight refresh, and a session
//! state machine that fails closed. [`api`] wraps every backend call with
//! proactive refresh and a single 401 retry. Everything else is thin
//! terminal glue.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod models;
