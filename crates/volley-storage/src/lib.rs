// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite audit persistence for the Volley dispatch engine.
//!
//! Everything the engine does lands here: report attempts keyed by
//! `(job, session)` and append-only user lookup history. Queries run on
//! a background thread through `tokio-rusqlite`; the schema is managed
//! by embedded refinery migrations.

pub mod database;
pub mod migrations;
pub mod queries;
pub mod store;

pub use database::Database;
pub use store::SqliteAuditStore;
