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

use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use fiado_ledger_rs::{
    Caller, CustomerId, DebtPatch, Ledger, LedgerError, LineItemDraft, ProductId, PurchaseDraft,
    VendorId,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Fiado Ledger - Replay ledger operation CSV files
///
/// Reads catalog and debt operations from a CSV file and outputs the open
/// debts to stdout. Supports vendor/product/customer registration,
/// purchases, and payments.
#[derive(Parser, Debug)]
#[command(name = "fiado-ledger-rs")]
#[command(about = "A fiado ledger that replays operation CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: op,vendor,staff,email,name,price,customer,product,quantity,interest,total,paid,recorded_at
    /// Example: cargo run -- operations.csv > debts.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args = Args::parse();

    // Open input file
    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    // Replay operations from CSV
    let ledger = match process_operations(BufReader::new(file)) {
        Ok(ledger) => ledger,
        Err(e) => {
            eprintln!("Error processing operations: {}", e);
            process::exit(1);
        }
    };

    // Write results to stdout
    if let Err(e) = write_debts(&ledger, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Every column except `op` is optional; which ones must be present depends
/// on the operation.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    op: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    vendor: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    staff: Option<bool>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    price: Option<Decimal>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    customer: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    product: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    quantity: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    interest: Option<Decimal>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    total: Option<Decimal>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    paid: Option<Decimal>,
    #[serde(default)]
    recorded_at: Option<String>,
}

/// A ledger operation decoded from one CSV row.
#[derive(Debug)]
enum Operation {
    RegisterVendor {
        email: String,
        name: String,
    },
    CreateProduct {
        caller: Caller,
        name: String,
        price: Decimal,
    },
    CreateCustomer {
        caller: Caller,
        name: String,
    },
    Purchase {
        caller: Caller,
        draft: PurchaseDraft,
    },
    Payment {
        caller: Caller,
        customer_id: CustomerId,
        paid: Decimal,
        recorded_at: String,
    },
}

impl CsvRecord {
    fn caller(&self) -> Option<Caller> {
        let vendor_id = VendorId(self.vendor?);
        Some(if self.staff.unwrap_or(false) {
            Caller::staff(vendor_id)
        } else {
            Caller::vendor(vendor_id)
        })
    }

    fn text(value: &Option<String>) -> Option<String> {
        value.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
    }

    /// Converts a CSV record to an Operation.
    ///
    /// Returns `None` for unknown operations or missing required fields.
    fn into_operation(self) -> Option<Operation> {
        match self.op.to_lowercase().as_str() {
            "vendor" => Some(Operation::RegisterVendor {
                email: Self::text(&self.email)?,
                name: Self::text(&self.name)?,
            }),
            "product" => Some(Operation::CreateProduct {
                caller: self.caller()?,
                name: Self::text(&self.name)?,
                price: self.price?,
            }),
            "customer" => Some(Operation::CreateCustomer {
                caller: self.caller()?,
                name: Self::text(&self.name)?,
            }),
            "purchase" => {
                let caller = self.caller()?;
                let mut draft = PurchaseDraft::new(
                    CustomerId(self.customer?),
                    vec![LineItemDraft::new(ProductId(self.product?), self.quantity?)],
                    self.interest.unwrap_or(Decimal::ZERO),
                    Self::text(&self.recorded_at)?,
                );
                if let Some(total) = self.total {
                    draft = draft.with_total(total);
                }
                Some(Operation::Purchase { caller, draft })
            }
            "payment" => Some(Operation::Payment {
                caller: self.caller()?,
                customer_id: CustomerId(self.customer?),
                paid: self.paid?,
                recorded_at: Self::text(&self.recorded_at)?,
            }),
            _ => None,
        }
    }
}

fn apply(ledger: &Ledger, operation: Operation) -> Result<(), LedgerError> {
    match operation {
        Operation::RegisterVendor { email, name } => {
            ledger.register_vendor(email, name)?;
        }
        Operation::CreateProduct {
            caller,
            name,
            price,
        } => {
            ledger.create_product(caller, name, price)?;
        }
        Operation::CreateCustomer { caller, name } => {
            ledger.create_customer(caller, name)?;
        }
        Operation::Purchase { caller, draft } => {
            ledger.record_purchase(caller, draft)?;
        }
        Operation::Payment {
            caller,
            customer_id,
            paid,
            recorded_at,
        } => {
            // Payments address the customer; resolve the open debt first.
            let debt = ledger.debt_for_customer(caller, customer_id)?;
            ledger.update_purchase(caller, debt.id, DebtPatch::payment(paid, recorded_at))?;
        }
    }
    Ok(())
}

/// Replay operations from a CSV reader.
///
/// This function uses streaming parsing to handle arbitrarily large CSV
/// files without loading the entire file into memory. Malformed rows and
/// rejected operations are skipped.
///
/// # CSV Format
///
/// Expected columns:
/// `op, vendor, staff, email, name, price, customer, product, quantity, interest, total, paid, recorded_at`
///
/// # Example
///
/// ```csv
/// op,vendor,staff,email,name,price,customer,product,quantity,interest,total,paid,recorded_at
/// vendor,,,ana@example.com,Ana,,,,,,,,
/// product,1,,,arroz,2.50,,,,,,,
/// customer,1,,,Juan,,,,,,,,
/// purchase,1,,,,,1,1,4,1.00,,,2025-03-01T10:00:00Z
/// payment,1,,,,,1,,,,,5.00,2025-03-02T10:00:00Z
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is invalid.
/// Individual operation errors are logged but don't stop processing.
pub fn process_operations<R: Read>(reader: R) -> Result<Ledger, csv::Error> {
    let ledger = Ledger::new();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All) // Handle whitespace in fields like " purchase "
        .flexible(true) // Allow short rows
        .has_headers(true) // Skip first row as header
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        match result {
            Ok(record) => {
                let Some(operation) = record.into_operation() else {
                    tracing::debug!("skipping invalid operation record");
                    continue;
                };

                if let Err(e) = apply(&ledger, operation) {
                    tracing::debug!(error = %e, "skipping rejected operation");
                }
            }
            Err(e) => {
                // Skip malformed rows
                tracing::debug!(error = %e, "skipping malformed row");
                continue;
            }
        }
    }

    Ok(ledger)
}

/// Write open debts to a CSV writer.
///
/// Outputs all debts in CSV format with 2 decimal precision.
///
/// # CSV Format
///
/// Columns: `debt, customer, total, paid, interest, balance, opened_at`
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_debts<W: Write>(ledger: &Ledger, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for debt in ledger.debts() {
        wtr.serialize(debt.value())?;
    }

    // Flush to ensure all data is written
    wtr.flush()?;
    Ok(())
}
