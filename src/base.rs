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

//! Core identifier types for vendors, customers, products, and debts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a vendor (fiador) account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct VendorId(pub u32);

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct CustomerId(pub u32);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ProductId(pub u32);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a debt.
///
/// A debt id stays valid until the debt settles; after settlement the id
/// resolves to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct DebtId(pub u32);

impl fmt::Display for DebtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity attached to every call.
///
/// The ledger never authenticates; it only authorizes. Whoever sits in front
/// of it (HTTP layer, CLI, tests) resolves credentials to a vendor id plus a
/// staff flag and passes the pair down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub vendor_id: VendorId,
    pub staff: bool,
}

impl Caller {
    /// A regular vendor acting on its own data.
    pub fn vendor(vendor_id: VendorId) -> Self {
        Self {
            vendor_id,
            staff: false,
        }
    }

    /// A staff/back-office identity that may act on any vendor's data.
    pub fn staff(vendor_id: VendorId) -> Self {
        Self {
            vendor_id,
            staff: true,
        }
    }

    /// Owner-or-staff rule, applied uniformly across all operations.
    pub fn can_act_for(&self, owner: VendorId) -> bool {
        self.staff || self.vendor_id == owner
    }
}
