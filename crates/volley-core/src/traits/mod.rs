// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions at the engine's seams.
//!
//! The engine talks to the platform and to persistence only through the
//! traits here, using `#[async_trait]` for dynamic dispatch compatibility.

pub mod platform;
pub mod store;

// Re-export all traits at the traits module level for convenience.
pub use platform::{PlatformSession, SessionConnector};
pub use store::AuditStore;
