// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat reference parsing.
//!
//! Commands accept chat targets in loose forms -- a bare `@username`, a
//! `t.me` URL, or a whole forwarded message containing either. Parsing
//! scans for the first reference and keeps the username.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::VolleyError;

static CHAT_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(https?://t\.me/|@)([A-Za-z0-9_]+)").unwrap());

/// A validated public chat reference, stored as the bare username.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatHandle(String);

impl ChatHandle {
    /// Extract the first chat reference from `input`.
    ///
    /// Accepts `@name`, `http://t.me/name`, `https://t.me/name`, or any
    /// text containing one of those. Returns [`VolleyError::InvalidInput`]
    /// when no reference is present.
    pub fn parse(input: &str) -> Result<Self, VolleyError> {
        let caps = CHAT_REF.captures(input).ok_or_else(|| {
            VolleyError::InvalidInput(format!("no chat reference found in `{input}`"))
        })?;
        Ok(Self(caps[2].to_string()))
    }

    /// The bare username, without `@` or URL prefix.
    pub fn username(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChatHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0)
    }
}
