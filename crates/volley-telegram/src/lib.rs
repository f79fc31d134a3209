// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram session gateway adapter.
//!
//! Implements [`SessionConnector`] and [`PlatformSession`] against a local
//! session bridge speaking Bot-API-style JSON envelopes. One HTTP client
//! per session, token carried as a sensitive default header.
//!
//! [`SessionConnector`]: volley_core::SessionConnector
//! [`PlatformSession`]: volley_core::PlatformSession

pub mod client;
pub mod types;

pub use client::{HttpConnector, HttpSession};
