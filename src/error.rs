// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Error types for ledger operations.
//!
//! Settlement is deliberately absent here: a fully paid debt is a successful
//! terminal outcome ([`UpdateOutcome::Settled`]), not a failure.
//!
//! [`UpdateOutcome::Settled`]: crate::UpdateOutcome::Settled

use std::fmt;
use thiserror::Error;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Collected field violations, reported together to aid the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violations(pub Vec<FieldViolation>);

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for violation in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}", violation)?;
            first = false;
        }
        Ok(())
    }
}

/// Ledger operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Malformed or missing field, non-positive amount, empty line-item list
    #[error("validation failed: {0}")]
    Validation(Violations),

    /// Acting on a product, customer, or debt not owned by the caller
    #[error("caller does not own this {0}")]
    Ownership(&'static str),

    /// Unique-name constraint violation (per-vendor names, vendor emails)
    #[error("duplicate {entity}: {name:?} is already registered")]
    DuplicateName { entity: &'static str, name: String },

    /// Attempt to change a field that is fixed for the life of the debt
    #[error("{0} cannot be changed once the debt exists")]
    ImmutableField(&'static str),

    /// Referenced id does not exist
    #[error("{0} not found")]
    NotFound(&'static str),
}

impl LedgerError {
    /// A validation error carrying a single violation.
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        LedgerError::Validation(Violations(vec![FieldViolation {
            field,
            message: message.into(),
        }]))
    }
}
