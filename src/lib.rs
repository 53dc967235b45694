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

//! # Fiado Ledger
//!
//! This library provides a multi-tenant ledger for informal credit ("fiado")
//! sales: vendors track customers, products, and running debts, with partial
//! payments and interest.
//!
//! ## Core Components
//!
//! - [`Ledger`]: Central store and engine — catalog CRUD, debt accrual, and
//!   settlement
//! - [`Debt`]: A customer's running balance with its line items and pending
//!   batches
//! - [`AccrualOutcome`]: Whether a purchase opened a fresh debt or merged
//!   into an existing one
//! - [`UpdateOutcome`]: An update either returns the surviving debt or
//!   reports that it settled and was removed
//! - [`LedgerError`]: Typed failures for validation, ownership, uniqueness,
//!   and lookups
//!
//! ## Example
//!
//! ```
//! use fiado_ledger_rs::{Caller, DebtPatch, Ledger, LineItemDraft, PurchaseDraft, UpdateOutcome};
//! use rust_decimal_macros::dec;
//!
//! let ledger = Ledger::new();
//! let vendor = ledger.register_vendor("ana@example.com", "Ana").unwrap();
//! let caller = Caller::vendor(vendor.id);
//!
//! let arroz = ledger.create_product(caller, "arroz", dec!(2.50)).unwrap();
//! let juan = ledger.create_customer(caller, "Juan").unwrap();
//!
//! // Record a purchase: 4 × 2.50 + 1.00 interest = 11.00 owed
//! let draft = PurchaseDraft::new(
//!     juan.id,
//!     vec![LineItemDraft::new(arroz.id, 4)],
//!     dec!(1.00),
//!     "2025-03-01T10:00:00Z",
//! );
//! let debt = ledger.record_purchase(caller, draft).unwrap().debt().clone();
//! assert_eq!(debt.total_amount, dec!(11.00));
//!
//! // Pay it off: the debt is deleted, not zeroed
//! let patch = DebtPatch::payment(dec!(11.00), "2025-03-02T10:00:00Z");
//! let outcome = ledger.update_purchase(caller, debt.id, patch).unwrap();
//! assert_eq!(outcome, UpdateOutcome::Settled);
//! assert!(ledger.get_debt(caller, debt.id).is_err());
//! ```
//!
//! ## Thread Safety
//!
//! Debts are keyed by customer and every mutation runs while holding that
//! customer's map entry, so concurrent purchases for the same customer
//! serialize while different customers proceed in parallel.

mod base;
mod catalog;
pub mod debt;
mod engine;
pub mod error;
mod registry;
mod request;
mod view;

pub use base::{Caller, CustomerId, DebtId, ProductId, VendorId};
pub use catalog::{Customer, CustomerPatch, Product, ProductPatch, Vendor};
pub use debt::{Debt, PendingBatch};
pub use engine::{AccrualOutcome, Ledger, UpdateOutcome};
pub use error::{FieldViolation, LedgerError, Violations};
pub use request::{DebtPatch, LineItemDraft, PurchaseDraft};
pub use view::{DebtSnapshot, PendingDebtEntry, PendingDebtGroup};
