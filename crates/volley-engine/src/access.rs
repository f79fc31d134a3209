// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Owner-only access control.
//!
//! Every privileged operation passes through the [`AccessGate`] before any
//! session is touched or any row is written. A denial is side-effect free.

use strum::Display;
use tracing::warn;

use volley_core::{RequesterId, VolleyError};

/// Privileged operations subject to the owner gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    Report,
    Lookup,
    Broadcast,
}

/// Result of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied,
}

/// Compares requesters against the single configured owner.
#[derive(Debug, Clone, Copy)]
pub struct AccessGate {
    owner: RequesterId,
}

impl AccessGate {
    pub fn new(owner: RequesterId) -> Self {
        Self { owner }
    }

    /// Pure comparison, no logging.
    pub fn check(&self, requester: RequesterId) -> Access {
        if requester == self.owner {
            Access::Allowed
        } else {
            Access::Denied
        }
    }

    /// Gate an action, logging the denial.
    pub fn authorize(&self, requester: RequesterId, action: Action) -> Result<(), VolleyError> {
        match self.check(requester) {
            Access::Allowed => Ok(()),
            Access::Denied => {
                warn!(requester = %requester, action = %action, "denied non-owner request");
                Err(VolleyError::AccessDenied {
                    requester: requester.0,
                })
            }
        }
    }
}
