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

//! Boundary payloads for the accrual engine.
//!
//! Timestamps arrive as caller-supplied strings so entries can be backdated;
//! they must still parse as RFC 3339. Each payload struct doubles as the
//! allow-list of fields its operation may touch.

use crate::base::{CustomerId, ProductId};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

/// One product/quantity pair in a purchase payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LineItemDraft {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl LineItemDraft {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// A purchase to record against a customer's running debt.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseDraft {
    pub customer_id: CustomerId,
    pub line_items: Vec<LineItemDraft>,
    pub interest: Decimal,
    /// RFC 3339; validated before anything is written.
    pub recorded_at: String,
    /// Vendor-stated amount for this purchase. When omitted, the amount is
    /// derived as the sum of the new batch totals.
    pub total_amount: Option<Decimal>,
}

impl PurchaseDraft {
    pub fn new(
        customer_id: CustomerId,
        line_items: Vec<LineItemDraft>,
        interest: Decimal,
        recorded_at: impl Into<String>,
    ) -> Self {
        Self {
            customer_id,
            line_items,
            interest,
            recorded_at: recorded_at.into(),
            total_amount: None,
        }
    }

    pub fn with_total(mut self, total_amount: Decimal) -> Self {
        self.total_amount = Some(total_amount);
        self
    }
}

/// A partial update to an existing debt.
///
/// Only the fields present here may change; `recorded_at` is mandatory on
/// every update. `customer_id` exists solely so a payload that tries to move
/// the debt to another customer can be rejected instead of silently ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct DebtPatch {
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub line_items: Option<Vec<LineItemDraft>>,
    #[serde(default)]
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub interest: Option<Decimal>,
    #[serde(default)]
    pub paid_amount: Option<Decimal>,
    pub recorded_at: String,
}

impl DebtPatch {
    pub fn new(recorded_at: impl Into<String>) -> Self {
        Self {
            customer_id: None,
            line_items: None,
            total_amount: None,
            interest: None,
            paid_amount: None,
            recorded_at: recorded_at.into(),
        }
    }

    /// A plain partial-payment update.
    pub fn payment(paid_amount: Decimal, recorded_at: impl Into<String>) -> Self {
        let mut patch = Self::new(recorded_at);
        patch.paid_amount = Some(paid_amount);
        patch
    }
}

/// Parses a caller-supplied timestamp, normalizing to UTC.
pub(crate) fn parse_recorded_at(raw: &str) -> Result<DateTime<Utc>, LedgerError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| LedgerError::invalid("recorded_at", "invalid timestamp; use RFC 3339"))
}
