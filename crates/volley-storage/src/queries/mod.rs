// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules over the audit database.

pub mod reports;
pub mod user_info;
