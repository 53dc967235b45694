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

//! Catalog store: vendors, products, and customers.
//!
//! Products and customers belong exclusively to one vendor, and names are
//! unique within that vendor — two vendors may both sell "arroz", one vendor
//! may not register it twice. Deletes cascade: a vendor takes its whole
//! catalog (and the debts hanging off it) along, a customer takes its open
//! debt, and a product takes its line items and batches out of every debt
//! while leaving the running totals untouched.

use crate::base::{Caller, CustomerId, ProductId, VendorId};
use crate::engine::Ledger;
use crate::error::LedgerError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An account extending credit to customers (fiador).
///
/// The email is the identity and is globally unique; the display name is
/// deliberately not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    pub email: String,
    pub display_name: String,
}

/// A product in a vendor's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub vendor_id: VendorId,
    pub name: String,
    pub unit_price: Decimal,
}

/// A person owing money to a vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub vendor_id: VendorId,
    pub name: String,
}

/// Partial update to a product. Only these two fields may change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
}

/// Partial update to a customer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerPatch {
    #[serde(default)]
    pub name: Option<String>,
}

impl Ledger {
    // === Vendors ===

    /// Registers a vendor account.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Validation`] - empty display name or malformed email.
    /// - [`LedgerError::DuplicateName`] - email already registered.
    pub fn register_vendor(
        &self,
        email: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Result<Vendor, LedgerError> {
        let email = email.into();
        let display_name = display_name.into();
        if display_name.trim().is_empty() {
            return Err(LedgerError::invalid("display_name", "cannot be empty"));
        }
        if email.trim().is_empty() || !email.contains('@') {
            return Err(LedgerError::invalid("email", "must be a valid email address"));
        }

        let id = VendorId(Self::allocate(&self.next_vendor_id));
        if !self.vendor_emails.claim(email.clone(), id) {
            return Err(LedgerError::DuplicateName {
                entity: "vendor",
                name: email,
            });
        }
        let vendor = Vendor {
            id,
            email,
            display_name,
        };
        self.vendors.insert(id, vendor.clone());
        Ok(vendor)
    }

    /// Retrieves a vendor. Owner-or-staff only.
    pub fn get_vendor(&self, caller: Caller, vendor_id: VendorId) -> Result<Vendor, LedgerError> {
        if !caller.can_act_for(vendor_id) {
            return Err(LedgerError::Ownership("vendor"));
        }
        self.vendors
            .get(&vendor_id)
            .map(|entry| entry.value().clone())
            .ok_or(LedgerError::NotFound("vendor"))
    }

    /// Deletes a vendor and everything it owns: products, customers, and
    /// the debts hanging off those customers.
    pub fn delete_vendor(&self, caller: Caller, vendor_id: VendorId) -> Result<(), LedgerError> {
        if !caller.can_act_for(vendor_id) {
            return Err(LedgerError::Ownership("vendor"));
        }
        let (_, vendor) = self
            .vendors
            .remove(&vendor_id)
            .ok_or(LedgerError::NotFound("vendor"))?;
        self.vendor_emails.release(&vendor.email);

        let product_ids: Vec<ProductId> = self
            .products
            .iter()
            .filter(|entry| entry.value().vendor_id == vendor_id)
            .map(|entry| entry.value().id)
            .collect();
        for product_id in product_ids {
            self.remove_product_row(product_id);
        }

        let customer_ids: Vec<CustomerId> = self
            .customers
            .iter()
            .filter(|entry| entry.value().vendor_id == vendor_id)
            .map(|entry| entry.value().id)
            .collect();
        for customer_id in customer_ids {
            self.remove_customer_row(customer_id);
        }
        Ok(())
    }

    // === Products ===

    /// Adds a product to the caller's catalog.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Validation`] - empty name or negative price.
    /// - [`LedgerError::DuplicateName`] - the caller already has a product
    ///   with this name.
    /// - [`LedgerError::NotFound`] - the caller's vendor does not exist.
    pub fn create_product(
        &self,
        caller: Caller,
        name: impl Into<String>,
        unit_price: Decimal,
    ) -> Result<Product, LedgerError> {
        let name = name.into();
        if !self.vendors.contains_key(&caller.vendor_id) {
            return Err(LedgerError::NotFound("vendor"));
        }
        if name.trim().is_empty() {
            return Err(LedgerError::invalid("name", "cannot be empty"));
        }
        if unit_price < Decimal::ZERO {
            return Err(LedgerError::invalid("unit_price", "cannot be negative"));
        }

        let id = ProductId(Self::allocate(&self.next_product_id));
        if !self
            .product_names
            .claim((caller.vendor_id, name.clone()), id)
        {
            return Err(LedgerError::DuplicateName {
                entity: "product",
                name,
            });
        }
        let product = Product {
            id,
            vendor_id: caller.vendor_id,
            name,
            unit_price,
        };
        self.products.insert(id, product.clone());
        Ok(product)
    }

    /// Retrieves a product. Owner-or-staff only.
    pub fn get_product(
        &self,
        caller: Caller,
        product_id: ProductId,
    ) -> Result<Product, LedgerError> {
        let product = self
            .products
            .get(&product_id)
            .map(|entry| entry.value().clone())
            .ok_or(LedgerError::NotFound("product"))?;
        if !caller.can_act_for(product.vendor_id) {
            return Err(LedgerError::Ownership("product"));
        }
        Ok(product)
    }

    /// Lists the caller's own products, newest first.
    pub fn list_products(&self, caller: Caller) -> Vec<Product> {
        let mut products: Vec<Product> = self
            .products
            .iter()
            .filter(|entry| entry.value().vendor_id == caller.vendor_id)
            .map(|entry| entry.value().clone())
            .collect();
        products.sort_by(|a, b| b.id.0.cmp(&a.id.0));
        products
    }

    /// Renames and/or reprices a product.
    pub fn update_product(
        &self,
        caller: Caller,
        product_id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product, LedgerError> {
        let current = self.get_product(caller, product_id)?;

        if let Some(unit_price) = patch.unit_price {
            if unit_price < Decimal::ZERO {
                return Err(LedgerError::invalid("unit_price", "cannot be negative"));
            }
        }
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(LedgerError::invalid("name", "cannot be empty"));
            }
            if !self.product_names.reclaim(
                &(current.vendor_id, current.name.clone()),
                (current.vendor_id, name.clone()),
                product_id,
            ) {
                return Err(LedgerError::DuplicateName {
                    entity: "product",
                    name: name.clone(),
                });
            }
        }

        let mut entry = self
            .products
            .get_mut(&product_id)
            .ok_or(LedgerError::NotFound("product"))?;
        if let Some(name) = patch.name {
            entry.name = name;
        }
        if let Some(unit_price) = patch.unit_price {
            entry.unit_price = unit_price;
        }
        Ok(entry.value().clone())
    }

    /// Deletes a product, cascading its line items and batches out of every
    /// debt. Running debt totals are not recomputed.
    pub fn delete_product(
        &self,
        caller: Caller,
        product_id: ProductId,
    ) -> Result<(), LedgerError> {
        self.get_product(caller, product_id)?;
        self.remove_product_row(product_id);
        Ok(())
    }

    // === Customers ===

    /// Adds a customer for the caller's vendor.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Validation`] - empty name.
    /// - [`LedgerError::DuplicateName`] - the caller already has a customer
    ///   with this name.
    /// - [`LedgerError::NotFound`] - the caller's vendor does not exist.
    pub fn create_customer(
        &self,
        caller: Caller,
        name: impl Into<String>,
    ) -> Result<Customer, LedgerError> {
        let name = name.into();
        if !self.vendors.contains_key(&caller.vendor_id) {
            return Err(LedgerError::NotFound("vendor"));
        }
        if name.trim().is_empty() {
            return Err(LedgerError::invalid("name", "cannot be empty"));
        }

        let id = CustomerId(Self::allocate(&self.next_customer_id));
        if !self
            .customer_names
            .claim((caller.vendor_id, name.clone()), id)
        {
            return Err(LedgerError::DuplicateName {
                entity: "customer",
                name,
            });
        }
        let customer = Customer {
            id,
            vendor_id: caller.vendor_id,
            name,
        };
        self.customers.insert(id, customer.clone());
        Ok(customer)
    }

    /// Retrieves a customer. Owner-or-staff only.
    pub fn get_customer(
        &self,
        caller: Caller,
        customer_id: CustomerId,
    ) -> Result<Customer, LedgerError> {
        let customer = self
            .customers
            .get(&customer_id)
            .map(|entry| entry.value().clone())
            .ok_or(LedgerError::NotFound("customer"))?;
        if !caller.can_act_for(customer.vendor_id) {
            return Err(LedgerError::Ownership("customer"));
        }
        Ok(customer)
    }

    /// Lists the caller's own customers, newest first.
    pub fn list_customers(&self, caller: Caller) -> Vec<Customer> {
        let mut customers: Vec<Customer> = self
            .customers
            .iter()
            .filter(|entry| entry.value().vendor_id == caller.vendor_id)
            .map(|entry| entry.value().clone())
            .collect();
        customers.sort_by(|a, b| b.id.0.cmp(&a.id.0));
        customers
    }

    /// Renames a customer.
    pub fn update_customer(
        &self,
        caller: Caller,
        customer_id: CustomerId,
        patch: CustomerPatch,
    ) -> Result<Customer, LedgerError> {
        let current = self.get_customer(caller, customer_id)?;

        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(LedgerError::invalid("name", "cannot be empty"));
            }
            if !self.customer_names.reclaim(
                &(current.vendor_id, current.name.clone()),
                (current.vendor_id, name.clone()),
                customer_id,
            ) {
                return Err(LedgerError::DuplicateName {
                    entity: "customer",
                    name: name.clone(),
                });
            }
        }

        let mut entry = self
            .customers
            .get_mut(&customer_id)
            .ok_or(LedgerError::NotFound("customer"))?;
        if let Some(name) = patch.name {
            entry.name = name;
        }
        Ok(entry.value().clone())
    }

    /// Deletes a customer and its open debt.
    pub fn delete_customer(
        &self,
        caller: Caller,
        customer_id: CustomerId,
    ) -> Result<(), LedgerError> {
        self.get_customer(caller, customer_id)?;
        self.remove_customer_row(customer_id);
        Ok(())
    }

    // === Cascade helpers ===

    fn remove_product_row(&self, product_id: ProductId) {
        if let Some((_, product)) = self.products.remove(&product_id) {
            self.product_names
                .release(&(product.vendor_id, product.name));
        }
        // Staff may record cross-vendor purchases, so every debt is a
        // candidate for the cascade.
        for mut entry in self.debts.iter_mut() {
            entry.value_mut().strip_product(product_id);
        }
    }

    fn remove_customer_row(&self, customer_id: CustomerId) {
        if let Some((_, customer)) = self.customers.remove(&customer_id) {
            self.customer_names
                .release(&(customer.vendor_id, customer.name));
        }
        if let Some((_, debt)) = self.debts.remove(&customer_id) {
            self.debt_ids.remove(&debt.id());
        }
    }
}
