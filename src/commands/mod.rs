//! Tauri IPC commands.
//!
//! Every command takes the managed [`AppContext`] and returns
//! `Result<_, String>` so errors reach the front end as display text.
//! Commands that accept a loosely shaped payload take it as `arg0`; the
//! payload shapes live in [`crate::payloads`].

pub mod analytics;
pub mod auth;
pub mod runtime;
pub mod sales;
pub mod settings;
