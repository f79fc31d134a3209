// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Volley integration tests.
//!
//! Provides scripted platform sessions and harness infrastructure for fast,
//! deterministic, CI-runnable tests without a gateway or real accounts.
//!
//! # Components
//!
//! - [`ScriptedConnector`] / [`ScriptedSession`] - Platform mocks with scripted answers
//! - [`MemoryAuditStore`] - In-memory audit store with write counters
//! - [`EngineHarness`] - Assembled dispatch stack for end-to-end tests

pub mod harness;
pub mod memory_store;
pub mod scripted_session;

pub use harness::EngineHarness;
pub use memory_store::MemoryAuditStore;
pub use scripted_session::{ScriptedCall, ScriptedConnector, ScriptedSession, stub_user};
