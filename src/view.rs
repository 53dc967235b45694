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

//! Read-side views over debts.

use crate::base::{CustomerId, DebtId, ProductId};
use crate::debt::PendingBatch;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Point-in-time copy of a debt's scalar fields.
///
/// Returned by every mutating operation; the debt itself may have moved on
/// (or settled) by the time the snapshot is read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebtSnapshot {
    pub id: DebtId,
    pub customer_id: CustomerId,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub interest: Decimal,
    pub opened_at: DateTime<Utc>,
}

impl DebtSnapshot {
    /// Plain numeric balance; formatting is a presentation concern.
    pub fn outstanding_balance(&self) -> Decimal {
        self.total_amount - self.paid_amount
    }
}

/// One line of a pending-debt group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingDebtEntry {
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub interest: Decimal,
}

/// All batches recorded at one instant, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingDebtGroup {
    pub recorded_at: DateTime<Utc>,
    pub items: Vec<PendingDebtEntry>,
}

/// Groups batches by `recorded_at`, ascending.
///
/// `resolve` maps a product id to its current name and price; batches whose
/// product no longer resolves are skipped (product deletion cascades batches,
/// so this only covers reads racing a delete).
pub(crate) fn group_pending_batches<F>(
    batches: Vec<PendingBatch>,
    resolve: F,
) -> Vec<PendingDebtGroup>
where
    F: Fn(ProductId) -> Option<(String, Decimal)>,
{
    let mut grouped: BTreeMap<DateTime<Utc>, Vec<PendingDebtEntry>> = BTreeMap::new();

    for batch in batches {
        let Some((product_name, unit_price)) = resolve(batch.product_id) else {
            continue;
        };
        grouped
            .entry(batch.recorded_at)
            .or_default()
            .push(PendingDebtEntry {
                product_name,
                unit_price,
                quantity: batch.quantity,
                interest: batch.interest,
            });
    }

    grouped
        .into_iter()
        .map(|(recorded_at, items)| PendingDebtGroup { recorded_at, items })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn batch(product: u32, recorded_at: &str) -> PendingBatch {
        PendingBatch {
            product_id: ProductId(product),
            quantity: 1,
            interest: dec!(0.50),
            batch_total: dec!(10.50),
            paid_for_batch: Decimal::ZERO,
            recorded_at: recorded_at.parse().unwrap(),
        }
    }

    #[test]
    fn groups_by_timestamp_ascending() {
        let batches = vec![
            batch(1, "2025-03-02T10:00:00Z"),
            batch(2, "2025-03-01T10:00:00Z"),
            batch(3, "2025-03-02T10:00:00Z"),
        ];
        let groups = group_pending_batches(batches, |id| {
            Some((format!("product-{}", id.0), dec!(10.00)))
        });

        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups[0].recorded_at,
            "2025-03-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert_eq!(groups[0].items.len(), 1);
        assert_eq!(groups[1].items.len(), 2);
    }

    #[test]
    fn unresolvable_products_are_skipped() {
        let batches = vec![batch(1, "2025-03-01T10:00:00Z"), batch(2, "2025-03-01T10:00:00Z")];
        let groups = group_pending_batches(batches, |id| {
            (id == ProductId(1)).then(|| ("arroz".to_string(), dec!(2.50)))
        });

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].items.len(), 1);
        assert_eq!(groups[0].items[0].product_name, "arroz");
    }

    #[test]
    fn snapshot_balance_is_total_minus_paid() {
        let snapshot = DebtSnapshot {
            id: DebtId(1),
            customer_id: CustomerId(1),
            total_amount: dec!(100.00),
            paid_amount: dec!(40.00),
            interest: dec!(1.00),
            opened_at: "2025-03-01T10:00:00Z".parse().unwrap(),
        };
        assert_eq!(snapshot.outstanding_balance(), dec!(60.00));
    }
}
