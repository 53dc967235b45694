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

//! Update and settlement public API integration tests.

use fiado_ledger_rs::{
    Caller, Customer, DebtPatch, DebtSnapshot, Ledger, LedgerError, LineItemDraft, Product,
    PurchaseDraft, UpdateOutcome,
};
use rust_decimal_macros::dec;

// === Helper Functions ===

fn setup(ledger: &Ledger) -> (Caller, Customer, Product) {
    let vendor = ledger.register_vendor("ana@example.com", "Ana").unwrap();
    let caller = Caller::vendor(vendor.id);
    let customer = ledger.create_customer(caller, "Juan").unwrap();
    let product = ledger.create_product(caller, "arroz", dec!(10.00)).unwrap();
    (caller, customer, product)
}

/// Opens a debt with an explicit total of 100.00.
fn open_debt(ledger: &Ledger, caller: Caller, customer: &Customer, product: &Product) -> DebtSnapshot {
    let draft = PurchaseDraft::new(
        customer.id,
        vec![LineItemDraft::new(product.id, 1)],
        dec!(0.00),
        "2025-03-01T10:00:00Z",
    )
    .with_total(dec!(100.00));
    ledger.record_purchase(caller, draft).unwrap().debt().clone()
}

// === Settlement ===

#[test]
fn full_payment_settles_and_removes_the_debt() {
    let ledger = Ledger::new();
    let (caller, customer, product) = setup(&ledger);
    let debt = open_debt(&ledger, caller, &customer, &product);

    let outcome = ledger
        .update_purchase(
            caller,
            debt.id,
            DebtPatch::payment(dec!(100.00), "2025-03-02T10:00:00Z"),
        )
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Settled);
    assert!(outcome.is_settled());

    // The debt is gone, not zeroed
    assert_eq!(
        ledger.get_debt(caller, debt.id),
        Err(LedgerError::NotFound("debt"))
    );
    assert_eq!(
        ledger.debt_for_customer(caller, customer.id),
        Err(LedgerError::NotFound("debt"))
    );
}

#[test]
fn overpayment_also_settles() {
    let ledger = Ledger::new();
    let (caller, customer, product) = setup(&ledger);
    let debt = open_debt(&ledger, caller, &customer, &product);

    let outcome = ledger
        .update_purchase(
            caller,
            debt.id,
            DebtPatch::payment(dec!(120.00), "2025-03-02T10:00:00Z"),
        )
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Settled);
}

#[test]
fn updating_a_settled_debt_reports_not_found() {
    let ledger = Ledger::new();
    let (caller, customer, product) = setup(&ledger);
    let debt = open_debt(&ledger, caller, &customer, &product);

    ledger
        .update_purchase(
            caller,
            debt.id,
            DebtPatch::payment(dec!(100.00), "2025-03-02T10:00:00Z"),
        )
        .unwrap();

    let result = ledger.update_purchase(
        caller,
        debt.id,
        DebtPatch::payment(dec!(1.00), "2025-03-03T10:00:00Z"),
    );
    assert_eq!(result, Err(LedgerError::NotFound("debt")));
}

#[test]
fn partial_payment_keeps_the_debt_open() {
    let ledger = Ledger::new();
    let (caller, customer, product) = setup(&ledger);
    let debt = open_debt(&ledger, caller, &customer, &product);

    let outcome = ledger
        .update_purchase(
            caller,
            debt.id,
            DebtPatch::payment(dec!(40.00), "2025-03-02T10:00:00Z"),
        )
        .unwrap();

    let UpdateOutcome::Updated(updated) = outcome else {
        panic!("partial payment must not settle");
    };
    assert_eq!(updated.paid_amount, dec!(40.00));
    assert_eq!(updated.outstanding_balance(), dec!(60.00));
    assert_eq!(
        ledger.outstanding_balance(caller, debt.id).unwrap(),
        dec!(60.00)
    );
}

#[test]
fn settlement_after_a_new_purchase_reopens_nothing() {
    let ledger = Ledger::new();
    let (caller, customer, product) = setup(&ledger);
    let debt = open_debt(&ledger, caller, &customer, &product);

    ledger
        .update_purchase(
            caller,
            debt.id,
            DebtPatch::payment(dec!(100.00), "2025-03-02T10:00:00Z"),
        )
        .unwrap();

    // A later purchase opens a brand-new debt with a new id
    let draft = PurchaseDraft::new(
        customer.id,
        vec![LineItemDraft::new(product.id, 1)],
        dec!(0.00),
        "2025-03-05T10:00:00Z",
    )
    .with_total(dec!(30.00));
    let next = ledger.record_purchase(caller, draft).unwrap().debt().clone();

    assert_ne!(next.id, debt.id);
    assert_eq!(next.total_amount, dec!(30.00));
    assert_eq!(next.paid_amount, dec!(0.00));
    // The old id stays dead
    assert_eq!(
        ledger.get_debt(caller, debt.id),
        Err(LedgerError::NotFound("debt"))
    );
}

// === Field Updates ===

#[test]
fn update_replaces_total_interest_and_timestamp() {
    let ledger = Ledger::new();
    let (caller, customer, product) = setup(&ledger);
    let debt = open_debt(&ledger, caller, &customer, &product);

    let mut patch = DebtPatch::new("2025-03-09T08:00:00Z");
    patch.total_amount = Some(dec!(75.00));
    patch.interest = Some(dec!(2.00));
    let outcome = ledger.update_purchase(caller, debt.id, patch).unwrap();

    let UpdateOutcome::Updated(updated) = outcome else {
        panic!("expected surviving debt");
    };
    // Replacement semantics on update, unlike the cumulative merge
    assert_eq!(updated.total_amount, dec!(75.00));
    assert_eq!(updated.interest, dec!(2.00));
    assert_eq!(
        updated.opened_at,
        "2025-03-09T08:00:00Z".parse::<chrono::DateTime<chrono::Utc>>().unwrap()
    );
}

#[test]
fn lowering_total_below_paid_settles() {
    let ledger = Ledger::new();
    let (caller, customer, product) = setup(&ledger);
    let debt = open_debt(&ledger, caller, &customer, &product);

    ledger
        .update_purchase(
            caller,
            debt.id,
            DebtPatch::payment(dec!(60.00), "2025-03-02T10:00:00Z"),
        )
        .unwrap();

    let mut patch = DebtPatch::new("2025-03-03T10:00:00Z");
    patch.total_amount = Some(dec!(50.00));
    let outcome = ledger.update_purchase(caller, debt.id, patch).unwrap();
    assert_eq!(outcome, UpdateOutcome::Settled);
}

#[test]
fn changing_the_customer_is_rejected() {
    let ledger = Ledger::new();
    let (caller, customer, product) = setup(&ledger);
    let other = ledger.create_customer(caller, "María").unwrap();
    let debt = open_debt(&ledger, caller, &customer, &product);

    let mut patch = DebtPatch::new("2025-03-02T10:00:00Z");
    patch.customer_id = Some(other.id);
    let result = ledger.update_purchase(caller, debt.id, patch);
    assert_eq!(result, Err(LedgerError::ImmutableField("customer_id")));
}

#[test]
fn update_requires_a_parseable_timestamp() {
    let ledger = Ledger::new();
    let (caller, customer, product) = setup(&ledger);
    let debt = open_debt(&ledger, caller, &customer, &product);

    for raw in ["", "mañana", "2025-03-02"] {
        let result =
            ledger.update_purchase(caller, debt.id, DebtPatch::payment(dec!(1.00), raw));
        assert!(
            matches!(result, Err(LedgerError::Validation(_))),
            "expected rejection for {raw:?}"
        );
    }
}

#[test]
fn update_rejects_bad_amounts() {
    let ledger = Ledger::new();
    let (caller, customer, product) = setup(&ledger);
    let debt = open_debt(&ledger, caller, &customer, &product);

    let mut patch = DebtPatch::new("2025-03-02T10:00:00Z");
    patch.total_amount = Some(dec!(0.00));
    assert!(matches!(
        ledger.update_purchase(caller, debt.id, patch),
        Err(LedgerError::Validation(_))
    ));

    let mut patch = DebtPatch::new("2025-03-02T10:00:00Z");
    patch.paid_amount = Some(dec!(-5.00));
    assert!(matches!(
        ledger.update_purchase(caller, debt.id, patch),
        Err(LedgerError::Validation(_))
    ));
}

#[test]
fn update_reconciles_line_items_by_product() {
    let ledger = Ledger::new();
    let (caller, customer, arroz) = setup(&ledger);
    let cafe = ledger.create_product(caller, "café", dec!(20.00)).unwrap();

    let draft = PurchaseDraft::new(
        customer.id,
        vec![
            LineItemDraft::new(arroz.id, 4),
            LineItemDraft::new(cafe.id, 2),
        ],
        dec!(0.00),
        "2025-03-01T10:00:00Z",
    );
    let debt = ledger.record_purchase(caller, draft).unwrap().debt().clone();

    // Replace arroz's quantity, drop café entirely
    let mut patch = DebtPatch::new("2025-03-02T10:00:00Z");
    patch.line_items = Some(vec![LineItemDraft::new(arroz.id, 1)]);
    ledger.update_purchase(caller, debt.id, patch).unwrap();

    let open = ledger
        .debts()
        .find(|entry| *entry.key() == customer.id)
        .expect("debt must exist");
    assert_eq!(open.value().quantity_of(arroz.id), Some(1));
    assert_eq!(open.value().quantity_of(cafe.id), None);
    // Batches are history; reconciliation leaves them alone
    assert_eq!(open.value().batches().len(), 2);
}

#[test]
fn update_rejects_empty_line_item_list() {
    let ledger = Ledger::new();
    let (caller, customer, product) = setup(&ledger);
    let debt = open_debt(&ledger, caller, &customer, &product);

    let mut patch = DebtPatch::new("2025-03-02T10:00:00Z");
    patch.line_items = Some(vec![]);
    assert!(matches!(
        ledger.update_purchase(caller, debt.id, patch),
        Err(LedgerError::Validation(_))
    ));
}

#[test]
fn update_requires_ownership_with_staff_override() {
    let ledger = Ledger::new();
    let (a, customer, product) = setup(&ledger);
    let vendor_b = ledger.register_vendor("b@example.com", "Beto").unwrap();
    let b = Caller::vendor(vendor_b.id);
    let debt = open_debt(&ledger, a, &customer, &product);

    let result = ledger.update_purchase(
        b,
        debt.id,
        DebtPatch::payment(dec!(10.00), "2025-03-02T10:00:00Z"),
    );
    assert_eq!(result, Err(LedgerError::Ownership("debt")));

    let staff = Caller::staff(b.vendor_id);
    let outcome = ledger
        .update_purchase(
            staff,
            debt.id,
            DebtPatch::payment(dec!(10.00), "2025-03-02T10:00:00Z"),
        )
        .unwrap();
    assert!(!outcome.is_settled());
}

#[test]
fn settled_outcome_reads_as_a_success_message() {
    assert_eq!(
        UpdateOutcome::Settled.to_string(),
        "debt fully paid; the record was closed and removed"
    );
}
