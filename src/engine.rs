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

//! Debt accrual and settlement engine.
//!
//! The [`Ledger`] holds every entity table and performs the two mutations
//! that make up the heart of the system:
//!
//! - **Accrual** ([`Ledger::record_purchase`]): get-or-create the customer's
//!   open debt, add the purchase amount to the running total, merge line
//!   items by product, and append one dated pending batch per line.
//! - **Settlement** ([`Ledger::update_purchase`]): apply a restricted field
//!   patch, then evaluate the balance; a debt whose balance reaches zero or
//!   below is removed on the spot and the caller gets
//!   [`UpdateOutcome::Settled`].
//!
//! # Thread Safety
//!
//! Debts are keyed by customer in a [`DashMap`]; every mutation runs while
//! holding that customer's entry, so concurrent purchases for the same
//! customer serialize and merge without lost updates. All validation happens
//! before the entry is taken, and the appliers are infallible, so a failed
//! call never leaves partial line items or batches behind.

use crate::base::{Caller, CustomerId, DebtId, ProductId, VendorId};
use crate::catalog::{Customer, Product, Vendor};
use crate::debt::{ChargedLine, Debt, PurchaseCharge, ResolvedPatch};
use crate::error::LedgerError;
use crate::registry::UniqueIndex;
use crate::request::{self, DebtPatch, PurchaseDraft};
use crate::view::{self, DebtSnapshot, PendingDebtGroup};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Result of recording a purchase: the engine either opened a fresh debt or
/// merged into the customer's existing one. Callers that don't care can just
/// take [`AccrualOutcome::debt`].
#[derive(Debug, Clone, PartialEq)]
pub enum AccrualOutcome {
    Opened(DebtSnapshot),
    Merged(DebtSnapshot),
}

impl AccrualOutcome {
    pub fn debt(&self) -> &DebtSnapshot {
        match self {
            AccrualOutcome::Opened(debt) | AccrualOutcome::Merged(debt) => debt,
        }
    }
}

/// Result of updating a debt.
///
/// `Settled` is a successful terminal outcome — the debt was fully paid and
/// its record removed — not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated(DebtSnapshot),
    Settled,
}

impl UpdateOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(self, UpdateOutcome::Settled)
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateOutcome::Updated(debt) => {
                write!(f, "debt {} updated", debt.id)
            }
            UpdateOutcome::Settled => {
                f.write_str("debt fully paid; the record was closed and removed")
            }
        }
    }
}

/// Multi-tenant debt ledger.
///
/// # Invariants
///
/// - Vendor emails are globally unique; product and customer names are
///   unique per vendor.
/// - At most one open debt exists per customer, and its
///   `total_amount - paid_amount` is strictly positive for as long as the
///   row exists.
/// - Pending batches are append-only and never merged.
pub struct Ledger {
    pub(crate) vendors: DashMap<VendorId, Vendor>,
    pub(crate) products: DashMap<ProductId, Product>,
    pub(crate) customers: DashMap<CustomerId, Customer>,
    /// Open debts, keyed by customer: the get-or-create unit of accrual.
    pub(crate) debts: DashMap<CustomerId, Debt>,
    /// Debt-id lookup; entries disappear with settlement.
    pub(crate) debt_ids: DashMap<DebtId, CustomerId>,
    pub(crate) vendor_emails: UniqueIndex<String, VendorId>,
    pub(crate) product_names: UniqueIndex<(VendorId, String), ProductId>,
    pub(crate) customer_names: UniqueIndex<(VendorId, String), CustomerId>,
    pub(crate) next_vendor_id: AtomicU32,
    pub(crate) next_product_id: AtomicU32,
    pub(crate) next_customer_id: AtomicU32,
    pub(crate) next_debt_id: AtomicU32,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Ledger {
            vendors: DashMap::new(),
            products: DashMap::new(),
            customers: DashMap::new(),
            debts: DashMap::new(),
            debt_ids: DashMap::new(),
            vendor_emails: UniqueIndex::new(),
            product_names: UniqueIndex::new(),
            customer_names: UniqueIndex::new(),
            next_vendor_id: AtomicU32::new(1),
            next_product_id: AtomicU32::new(1),
            next_customer_id: AtomicU32::new(1),
            next_debt_id: AtomicU32::new(1),
        }
    }

    pub(crate) fn allocate(counter: &AtomicU32) -> u32 {
        counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Records a purchase against a customer's running debt.
    ///
    /// Looks up the customer's open debt; if none exists one is opened with
    /// the supplied `recorded_at`. If one exists, its `opened_at` is kept,
    /// its interest is overwritten with the new value, and the purchase
    /// amount is **added** to the running total. Either way, each line item
    /// merges into the cumulative per-product quantities and appends one new
    /// pending batch with `batch_total = unit_price × quantity + interest`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Validation`] - empty line items, zero quantity,
    ///   unparseable `recorded_at`, non-positive amount.
    /// - [`LedgerError::NotFound`] - unknown customer or product id.
    /// - [`LedgerError::Ownership`] - customer or product belongs to another
    ///   vendor and the caller is not staff.
    pub fn record_purchase(
        &self,
        caller: Caller,
        draft: PurchaseDraft,
    ) -> Result<AccrualOutcome, LedgerError> {
        let recorded_at = request::parse_recorded_at(&draft.recorded_at)?;

        if draft.line_items.is_empty() {
            return Err(LedgerError::invalid(
                "line_items",
                "at least one product is required",
            ));
        }
        if draft.interest < Decimal::ZERO {
            return Err(LedgerError::invalid("interest", "cannot be negative"));
        }
        if let Some(total_amount) = draft.total_amount {
            if total_amount <= Decimal::ZERO {
                return Err(LedgerError::invalid(
                    "total_amount",
                    "must be greater than 0",
                ));
            }
        }

        let owner = {
            let customer = self
                .customers
                .get(&draft.customer_id)
                .ok_or(LedgerError::NotFound("customer"))?;
            customer.vendor_id
        };
        if !caller.can_act_for(owner) {
            return Err(LedgerError::Ownership("customer"));
        }

        // Price and re-check every line before touching the debt.
        let mut lines = Vec::with_capacity(draft.line_items.len());
        let mut derived_total = Decimal::ZERO;
        for item in &draft.line_items {
            if item.quantity < 1 {
                return Err(LedgerError::invalid("quantity", "must be at least 1"));
            }
            let product = self
                .products
                .get(&item.product_id)
                .ok_or(LedgerError::NotFound("product"))?;
            if !caller.can_act_for(product.vendor_id) {
                return Err(LedgerError::Ownership("product"));
            }
            let batch_total =
                product.unit_price * Decimal::from(item.quantity) + draft.interest;
            if batch_total <= Decimal::ZERO {
                return Err(LedgerError::invalid(
                    "line_items",
                    "batch total must be greater than 0",
                ));
            }
            derived_total += batch_total;
            lines.push(ChargedLine {
                product_id: item.product_id,
                quantity: item.quantity,
                batch_total,
            });
        }

        let charge = PurchaseCharge {
            total_delta: draft.total_amount.unwrap_or(derived_total),
            interest: draft.interest,
            recorded_at,
            lines,
        };

        // The entry serializes all mutations for this customer.
        match self.debts.entry(draft.customer_id) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().merge_purchase(charge);
                let snapshot = entry.get().snapshot();
                tracing::debug!(
                    debt = %snapshot.id,
                    customer = %draft.customer_id,
                    total = %snapshot.total_amount,
                    "purchase merged into open debt"
                );
                Ok(AccrualOutcome::Merged(snapshot))
            }
            Entry::Vacant(entry) => {
                let debt_id = DebtId(Self::allocate(&self.next_debt_id));
                let mut debt = Debt::open(debt_id, draft.customer_id, recorded_at);
                debt.merge_purchase(charge);
                self.debt_ids.insert(debt_id, draft.customer_id);
                let debt = entry.insert(debt);
                let snapshot = debt.snapshot();
                tracing::debug!(
                    debt = %debt_id,
                    customer = %draft.customer_id,
                    total = %snapshot.total_amount,
                    "debt opened"
                );
                Ok(AccrualOutcome::Opened(snapshot))
            }
        }
    }

    /// Applies a restricted field patch to a debt, then evaluates settlement.
    ///
    /// `recorded_at` is mandatory and overwrites the stored timestamp.
    /// Supplied amounts **replace** stored ones. A supplied line-item list
    /// reconciles by product id: quantities replace, absent products are
    /// dropped. If the resulting balance is zero or below, the debt and all
    /// its children are removed and the caller gets
    /// [`UpdateOutcome::Settled`].
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ImmutableField`] - payload tries to change the
    ///   owning customer.
    /// - [`LedgerError::Validation`] - unparseable `recorded_at`,
    ///   non-positive total, negative paid amount, empty line-item list.
    /// - [`LedgerError::NotFound`] - debt id does not resolve (including
    ///   after settlement).
    /// - [`LedgerError::Ownership`] - debt belongs to another vendor's
    ///   customer and the caller is not staff.
    pub fn update_purchase(
        &self,
        caller: Caller,
        debt_id: DebtId,
        patch: DebtPatch,
    ) -> Result<UpdateOutcome, LedgerError> {
        if patch.customer_id.is_some() {
            return Err(LedgerError::ImmutableField("customer_id"));
        }
        let recorded_at = request::parse_recorded_at(&patch.recorded_at)?;

        if let Some(total_amount) = patch.total_amount {
            if total_amount <= Decimal::ZERO {
                return Err(LedgerError::invalid(
                    "total_amount",
                    "must be greater than 0",
                ));
            }
        }
        if let Some(paid_amount) = patch.paid_amount {
            if paid_amount < Decimal::ZERO {
                return Err(LedgerError::invalid("paid_amount", "cannot be negative"));
            }
        }
        if let Some(interest) = patch.interest {
            if interest < Decimal::ZERO {
                return Err(LedgerError::invalid("interest", "cannot be negative"));
            }
        }

        let customer_id = *self
            .debt_ids
            .get(&debt_id)
            .ok_or(LedgerError::NotFound("debt"))?;
        self.authorize_debt_access(caller, customer_id)?;

        let lines = match &patch.line_items {
            None => None,
            Some(items) => {
                if items.is_empty() {
                    return Err(LedgerError::invalid(
                        "line_items",
                        "at least one product is required",
                    ));
                }
                let mut resolved = Vec::with_capacity(items.len());
                for item in items {
                    if item.quantity < 1 {
                        return Err(LedgerError::invalid("quantity", "must be at least 1"));
                    }
                    let product = self
                        .products
                        .get(&item.product_id)
                        .ok_or(LedgerError::NotFound("product"))?;
                    if !caller.can_act_for(product.vendor_id) {
                        return Err(LedgerError::Ownership("product"));
                    }
                    resolved.push((item.product_id, item.quantity));
                }
                Some(resolved)
            }
        };

        let resolved = ResolvedPatch {
            total_amount: patch.total_amount,
            interest: patch.interest,
            paid_amount: patch.paid_amount,
            recorded_at,
            lines,
        };

        match self.debts.entry(customer_id) {
            Entry::Occupied(mut entry) => {
                if entry.get().id() != debt_id {
                    // The debt settled and a new one opened in between.
                    return Err(LedgerError::NotFound("debt"));
                }
                if entry.get_mut().apply_patch(resolved) {
                    entry.remove();
                    self.debt_ids.remove(&debt_id);
                    tracing::info!(
                        debt = %debt_id,
                        customer = %customer_id,
                        "debt fully paid, record removed"
                    );
                    Ok(UpdateOutcome::Settled)
                } else {
                    Ok(UpdateOutcome::Updated(entry.get().snapshot()))
                }
            }
            Entry::Vacant(_) => Err(LedgerError::NotFound("debt")),
        }
    }

    /// Retrieves a debt by id. Settled debts are gone and report not-found.
    pub fn get_debt(&self, caller: Caller, debt_id: DebtId) -> Result<DebtSnapshot, LedgerError> {
        let customer_id = *self
            .debt_ids
            .get(&debt_id)
            .ok_or(LedgerError::NotFound("debt"))?;
        self.authorize_debt_access(caller, customer_id)?;
        let debt = self
            .debts
            .get(&customer_id)
            .ok_or(LedgerError::NotFound("debt"))?;
        Ok(debt.snapshot())
    }

    /// Resolves a customer's open debt, if any.
    pub fn debt_for_customer(
        &self,
        caller: Caller,
        customer_id: CustomerId,
    ) -> Result<DebtSnapshot, LedgerError> {
        let owner = {
            let customer = self
                .customers
                .get(&customer_id)
                .ok_or(LedgerError::NotFound("customer"))?;
            customer.vendor_id
        };
        if !caller.can_act_for(owner) {
            return Err(LedgerError::Ownership("customer"));
        }
        let debt = self
            .debts
            .get(&customer_id)
            .ok_or(LedgerError::NotFound("debt"))?;
        Ok(debt.snapshot())
    }

    /// Lists the caller's debts, newest first.
    pub fn list_debts(&self, caller: Caller) -> Vec<DebtSnapshot> {
        let mut debts: Vec<DebtSnapshot> = self
            .debts
            .iter()
            .filter(|entry| {
                self.customers
                    .get(entry.key())
                    .is_some_and(|customer| customer.vendor_id == caller.vendor_id)
            })
            .map(|entry| entry.value().snapshot())
            .collect();
        debts.sort_by(|a, b| b.opened_at.cmp(&a.opened_at));
        debts
    }

    /// Groups a debt's pending batches by `recorded_at`, ascending.
    pub fn pending_debt_view(
        &self,
        caller: Caller,
        debt_id: DebtId,
    ) -> Result<Vec<PendingDebtGroup>, LedgerError> {
        let customer_id = *self
            .debt_ids
            .get(&debt_id)
            .ok_or(LedgerError::NotFound("debt"))?;
        self.authorize_debt_access(caller, customer_id)?;
        let batches = {
            let debt = self
                .debts
                .get(&customer_id)
                .ok_or(LedgerError::NotFound("debt"))?;
            debt.batches()
        };
        Ok(view::group_pending_batches(batches, |product_id| {
            self.products
                .get(&product_id)
                .map(|product| (product.name.clone(), product.unit_price))
        }))
    }

    /// Returns `total_amount - paid_amount` for a debt.
    pub fn outstanding_balance(
        &self,
        caller: Caller,
        debt_id: DebtId,
    ) -> Result<Decimal, LedgerError> {
        Ok(self.get_debt(caller, debt_id)?.outstanding_balance())
    }

    /// Iterates all open debts. Useful for generating output reports.
    pub fn debts(
        &self,
    ) -> impl Iterator<Item = dashmap::mapref::multiple::RefMulti<'_, CustomerId, Debt>> {
        self.debts.iter()
    }

    fn authorize_debt_access(
        &self,
        caller: Caller,
        customer_id: CustomerId,
    ) -> Result<(), LedgerError> {
        let owner = {
            let customer = self
                .customers
                .get(&customer_id)
                .ok_or(LedgerError::NotFound("customer"))?;
            customer.vendor_id
        };
        if !caller.can_act_for(owner) {
            return Err(LedgerError::Ownership("debt"));
        }
        Ok(())
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
