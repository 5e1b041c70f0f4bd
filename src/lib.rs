//! focal - a real-time classroom focus-session client
//!
//! This crate provides the core functionality for focal, including:
//! - The session sync engine (connection lifecycle, reconnection backoff,
//!   message dispatch, state reduction)
//! - The wire protocol spoken with the session endpoint
//! - A REST client for session records
//! - Configuration management
//!
//! # Architecture
//!
//! focal is a client to an authoritative session service:
//! - [`client::SessionClient`] owns one WebSocket connection per live
//!   session view and runs a single dispatch loop that is the only writer
//!   of session state
//! - Callers observe the session through watch-channel snapshots and a
//!   notice stream; outbound actions are fire-and-forget commands that
//!   silently no-op while disconnected

pub mod api;
pub mod client;
pub mod config;
pub mod protocol;
pub mod session;
