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

//! Debt aggregate.
//!
//! One debt per customer carries the running balance plus two child
//! collections: line items (cumulative quantity per product) and pending
//! batches (one dated record per purchase event, append-only).
//!
//! # Example
//!
//! ```
//! use fiado_ledger_rs::{Caller, Ledger, LineItemDraft, PurchaseDraft};
//! use rust_decimal_macros::dec;
//!
//! let ledger = Ledger::new();
//! let vendor = ledger.register_vendor("ana@example.com", "Ana").unwrap();
//! let caller = Caller::vendor(vendor.id);
//! let customer = ledger.create_customer(caller, "Juan").unwrap();
//! let product = ledger.create_product(caller, "arroz", dec!(2.50)).unwrap();
//!
//! let draft = PurchaseDraft::new(
//!     customer.id,
//!     vec![LineItemDraft::new(product.id, 2)],
//!     dec!(0.50),
//!     "2025-03-01T10:00:00Z",
//! );
//! let outcome = ledger.record_purchase(caller, draft).unwrap();
//! assert_eq!(outcome.debt().total_amount, dec!(5.50));
//! ```

use crate::base::{CustomerId, DebtId, ProductId};
use crate::view::DebtSnapshot;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::HashMap;

/// One dated purchase event's contribution to a debt.
///
/// Batches are immutable once appended and are never merged, even when the
/// same product recurs; they are the audit trail of what was owed and when.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PendingBatch {
    pub product_id: ProductId,
    pub quantity: u32,
    pub interest: Decimal,
    pub batch_total: Decimal,
    pub paid_for_batch: Decimal,
    pub recorded_at: DateTime<Utc>,
}

/// A fully validated purchase, ready to apply to a debt.
///
/// Built by the engine after ownership and amount checks pass; applying it
/// cannot fail, so a purchase never leaves partial line items behind.
#[derive(Debug, Clone)]
pub(crate) struct PurchaseCharge {
    pub total_delta: Decimal,
    pub interest: Decimal,
    pub recorded_at: DateTime<Utc>,
    pub lines: Vec<ChargedLine>,
}

/// One priced line of a [`PurchaseCharge`].
#[derive(Debug, Clone)]
pub(crate) struct ChargedLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub batch_total: Decimal,
}

/// A fully validated field update, ready to apply to a debt.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedPatch {
    pub total_amount: Option<Decimal>,
    pub interest: Option<Decimal>,
    pub paid_amount: Option<Decimal>,
    pub recorded_at: DateTime<Utc>,
    /// Replacement line items: quantities overwrite, absent products are
    /// dropped. `None` leaves the line items alone.
    pub lines: Option<Vec<(ProductId, u32)>>,
}

#[derive(Debug)]
struct DebtData {
    id: DebtId,
    customer_id: CustomerId,
    total_amount: Decimal,
    paid_amount: Decimal,
    interest: Decimal,
    opened_at: DateTime<Utc>,
    /// Cumulative quantity per product.
    line_items: HashMap<ProductId, u32>,
    /// Append-only, one entry per purchase event per line.
    batches: Vec<PendingBatch>,
}

impl DebtData {
    fn new(id: DebtId, customer_id: CustomerId, opened_at: DateTime<Utc>) -> Self {
        Self {
            id,
            customer_id,
            total_amount: Decimal::ZERO,
            paid_amount: Decimal::ZERO,
            interest: Decimal::ZERO,
            opened_at,
            line_items: HashMap::new(),
            batches: Vec::new(),
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.paid_amount >= Decimal::ZERO,
            "Invariant violated: paid amount went negative: {}",
            self.paid_amount
        );
        debug_assert!(
            self.line_items.values().all(|&quantity| quantity >= 1),
            "Invariant violated: line item with zero quantity"
        );
        debug_assert!(
            self.batches
                .iter()
                .all(|batch| batch.batch_total > Decimal::ZERO),
            "Invariant violated: batch with non-positive total"
        );
    }

    fn merge(&mut self, charge: PurchaseCharge) {
        self.interest = charge.interest;
        self.total_amount += charge.total_delta;

        for line in charge.lines {
            *self.line_items.entry(line.product_id).or_insert(0) += line.quantity;
            self.batches.push(PendingBatch {
                product_id: line.product_id,
                quantity: line.quantity,
                interest: charge.interest,
                batch_total: line.batch_total,
                paid_for_batch: Decimal::ZERO,
                recorded_at: charge.recorded_at,
            });
        }

        debug_assert!(
            self.total_amount > Decimal::ZERO,
            "Invariant violated: total amount not positive after merge: {}",
            self.total_amount
        );
        self.assert_invariants();
    }

    /// Applies field updates and reconciles line items. Returns `true` when
    /// the balance reached zero or below and the debt must be removed.
    fn apply(&mut self, patch: ResolvedPatch) -> bool {
        if let Some(total_amount) = patch.total_amount {
            self.total_amount = total_amount;
        }
        if let Some(interest) = patch.interest {
            self.interest = interest;
        }
        if let Some(paid_amount) = patch.paid_amount {
            self.paid_amount = paid_amount;
        }
        self.opened_at = patch.recorded_at;

        if let Some(lines) = patch.lines {
            // Upsert semantics: payload quantities replace stored ones,
            // products absent from the payload are dropped. Batches stay
            // untouched; they are history, not state.
            let incoming: HashMap<ProductId, u32> = lines.into_iter().collect();
            self.line_items
                .retain(|product_id, _| incoming.contains_key(product_id));
            for (product_id, quantity) in incoming {
                self.line_items.insert(product_id, quantity);
            }
        }

        self.assert_invariants();
        self.total_amount - self.paid_amount <= Decimal::ZERO
    }

    fn strip_product(&mut self, product_id: ProductId) {
        self.line_items.remove(&product_id);
        self.batches.retain(|batch| batch.product_id != product_id);
    }
}

/// A customer's running debt.
#[derive(Debug)]
pub struct Debt {
    inner: Mutex<DebtData>,
}

impl Debt {
    pub(crate) const DECIMAL_PRECISION: u32 = 2;

    pub(crate) fn open(id: DebtId, customer_id: CustomerId, opened_at: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(DebtData::new(id, customer_id, opened_at)),
        }
    }

    pub fn id(&self) -> DebtId {
        self.inner.lock().id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.inner.lock().customer_id
    }

    pub fn total_amount(&self) -> Decimal {
        self.inner.lock().total_amount
    }

    pub fn paid_amount(&self) -> Decimal {
        self.inner.lock().paid_amount
    }

    pub fn interest(&self) -> Decimal {
        self.inner.lock().interest
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.inner.lock().opened_at
    }

    /// Returns `total_amount - paid_amount`.
    pub fn outstanding_balance(&self) -> Decimal {
        let data = self.inner.lock();
        data.total_amount - data.paid_amount
    }

    /// Cumulative quantity of one product, if it appears on the debt.
    pub fn quantity_of(&self, product_id: ProductId) -> Option<u32> {
        self.inner.lock().line_items.get(&product_id).copied()
    }

    pub fn line_item_count(&self) -> usize {
        self.inner.lock().line_items.len()
    }

    /// All pending batches, in append order.
    pub fn batches(&self) -> Vec<PendingBatch> {
        self.inner.lock().batches.clone()
    }

    pub(crate) fn snapshot(&self) -> DebtSnapshot {
        let data = self.inner.lock();
        DebtSnapshot {
            id: data.id,
            customer_id: data.customer_id,
            total_amount: data.total_amount,
            paid_amount: data.paid_amount,
            interest: data.interest,
            opened_at: data.opened_at,
        }
    }

    pub(crate) fn merge_purchase(&mut self, charge: PurchaseCharge) {
        self.inner.lock().merge(charge);
    }

    pub(crate) fn apply_patch(&mut self, patch: ResolvedPatch) -> bool {
        self.inner.lock().apply(patch)
    }

    pub(crate) fn strip_product(&mut self, product_id: ProductId) {
        self.inner.lock().strip_product(product_id);
    }
}

impl Serialize for Debt {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = self.inner.lock();
        let mut state = serializer.serialize_struct("Debt", 7)?;
        state.serialize_field("debt", &data.id)?;
        state.serialize_field("customer", &data.customer_id)?;
        state.serialize_field(
            "total",
            &data.total_amount.round_dp(Debt::DECIMAL_PRECISION),
        )?;
        state.serialize_field("paid", &data.paid_amount.round_dp(Debt::DECIMAL_PRECISION))?;
        state.serialize_field(
            "interest",
            &data.interest.round_dp(Debt::DECIMAL_PRECISION),
        )?;
        state.serialize_field(
            "balance",
            &(data.total_amount - data.paid_amount).round_dp(Debt::DECIMAL_PRECISION),
        )?;
        state.serialize_field("opened_at", &data.opened_at)?;
        state.end()
    }
}
