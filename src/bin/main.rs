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

use chrono::Utc;
use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use fiado_ledger::{AccountId, JsonFileBackend, Ledger, LedgerBackend, MemoryBackend};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

/// Fiado Ledger - Apply tab operations from a CSV file
///
/// Reads ledger operations from a CSV file and outputs customer balances to
/// stdout. Supports adding customers and posting debts and payments.
#[derive(Parser, Debug)]
#[command(name = "fiado-ledger")]
#[command(about = "A tab ledger that processes operation CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: op,name,phone,amount,description
    /// Example: fiado-ledger ops.csv > balances.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// JSON state file to load before and save after applying operations
    ///
    /// When omitted, operations apply to an empty in-memory ledger.
    #[arg(long, value_name = "FILE")]
    state: Option<PathBuf>,

    /// Days without activity before a debtor counts as overdue
    #[arg(long, default_value_t = 15)]
    overdue_days: i64,
}

fn main() {
    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let backend: Arc<dyn LedgerBackend> = match &args.state {
        Some(path) => Arc::new(JsonFileBackend::new(path)),
        None => Arc::new(MemoryBackend::new()),
    };
    let ledger = match Ledger::open(AccountId::random(), backend) {
        Ok(ledger) => ledger,
        Err(e) => {
            eprintln!("Error loading state: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = process_operations(BufReader::new(file), &ledger) {
        eprintln!("Error processing operations: {}", e);
        process::exit(1);
    }

    if let Err(e) = write_balances(&ledger, args.overdue_days, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `op, name, phone, amount, description`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    op: String,
    name: String,
    #[serde(default)]
    phone: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    amount: Option<i64>,
    #[serde(default)]
    description: String,
}

/// Applies operations from a CSV reader to the ledger.
///
/// Streaming: large files never load fully into memory. Malformed rows,
/// unknown operations, and per-row ledger errors are skipped without
/// stopping the run.
///
/// # CSV Format
///
/// - `op`: `customer` (register by name + phone), `debt`, or `payment`
/// - `name`: customer display name; debts and payments reference it
/// - `phone`: digits, required for `customer` rows
/// - `amount`: positive COP pesos, required for `debt`/`payment`
/// - `description`: optional; defaults to "Fiado"/"Abono"
///
/// # Example
///
/// ```csv
/// op,name,phone,amount,description
/// customer,Ana,3001234567,,
/// debt,Ana,,10000,arroz
/// payment,Ana,,15000,
/// ```
pub fn process_operations<R: Read>(reader: R, ledger: &Ledger) -> Result<(), csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true) // Allow missing trailing fields
        .has_headers(true)
        .from_reader(reader);

    // Name index over customers already in the loaded state.
    let mut by_name: HashMap<String, fiado_ledger::CustomerId> = ledger
        .customers()
        .into_iter()
        .map(|c| (c.name, c.id))
        .collect();

    for result in rdr.deserialize::<CsvRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                #[cfg(debug_assertions)]
                eprintln!("Skipping malformed row: {}", e);
                continue;
            }
        };

        let outcome = match record.op.to_lowercase().as_str() {
            "customer" => ledger
                .add_customer(&record.name, &record.phone)
                .map(|customer| {
                    by_name.insert(customer.name.clone(), customer.id);
                }),
            "debt" | "payment" => {
                let (Some(&customer_id), Some(amount)) =
                    (by_name.get(record.name.as_str()), record.amount)
                else {
                    #[cfg(debug_assertions)]
                    eprintln!("Skipping {} for unknown customer or amount", record.op);
                    continue;
                };
                let posted = if record.op == "debt" {
                    ledger.add_debt(customer_id, amount, &record.description)
                } else {
                    ledger.add_payment(customer_id, amount, &record.description)
                };
                posted.map(|_| ())
            }
            _ => {
                #[cfg(debug_assertions)]
                eprintln!("Skipping unknown operation '{}'", record.op);
                continue;
            }
        };

        if let Err(_e) = outcome {
            #[cfg(debug_assertions)]
            eprintln!("Skipping row for '{}': {}", record.name, _e);
        }
    }

    Ok(())
}

/// One output row per customer.
#[derive(Debug, Serialize)]
struct BalanceRecord {
    name: String,
    phone: String,
    total_debt: i64,
    last_payment: String,
    overdue: bool,
}

/// Writes customer balances to a CSV writer.
///
/// Columns: `name, phone, total_debt, last_payment, overdue`
pub fn write_balances<W: Write>(
    ledger: &Ledger,
    overdue_days: i64,
    writer: W,
) -> Result<(), csv::Error> {
    let now = Utc::now();
    let overdue: Vec<_> = ledger
        .overdue_customers(overdue_days, now)
        .into_iter()
        .map(|c| c.id)
        .collect();

    let mut wtr = Writer::from_writer(writer);
    for customer in ledger.customers() {
        wtr.serialize(BalanceRecord {
            name: customer.name.clone(),
            phone: customer.phone.clone(),
            total_debt: customer.total_debt,
            last_payment: customer
                .last_payment_date
                .map(|d| d.to_rfc3339())
                .unwrap_or_default(),
            overdue: overdue.contains(&customer.id),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn empty_ledger() -> Ledger {
        Ledger::new(AccountId::random(), Arc::new(MemoryBackend::new()))
    }

    #[test]
    fn parse_customer_and_debt() {
        let csv = "op,name,phone,amount,description\n\
                   customer,Ana,3001234567,,\n\
                   debt,Ana,,10000,arroz\n";
        let ledger = empty_ledger();
        process_operations(Cursor::new(csv), &ledger).unwrap();

        assert_eq!(ledger.customer_count(), 1);
        assert_eq!(ledger.total_debt(), 10_000);
    }

    #[test]
    fn payment_clamps_at_zero() {
        let csv = "op,name,phone,amount,description\n\
                   customer,Ana,3001234567,,\n\
                   debt,Ana,,10000,\n\
                   payment,Ana,,15000,\n";
        let ledger = empty_ledger();
        process_operations(Cursor::new(csv), &ledger).unwrap();

        assert_eq!(ledger.total_debt(), 0);
    }

    #[test]
    fn skip_rows_for_unknown_customers() {
        let csv = "op,name,phone,amount,description\n\
                   debt,Nadie,,10000,\n\
                   customer,Ana,3001234567,,\n";
        let ledger = empty_ledger();
        process_operations(Cursor::new(csv), &ledger).unwrap();

        assert_eq!(ledger.customer_count(), 1);
        assert_eq!(ledger.total_debt(), 0);
    }

    #[test]
    fn skip_malformed_and_unknown_ops() {
        let csv = "op,name,phone,amount,description\n\
                   frobnicate,Ana,,,\n\
                   customer,Ana,3001234567,,\n\
                   debt,Ana,,not-a-number,\n\
                   debt,Ana,,5000,\n";
        let ledger = empty_ledger();
        process_operations(Cursor::new(csv), &ledger).unwrap();

        assert_eq!(ledger.total_debt(), 5_000);
    }

    #[test]
    fn parse_with_whitespace() {
        let csv = "op,name,phone,amount,description\n customer , Ana , 3001234567 ,,\n";
        let ledger = empty_ledger();
        process_operations(Cursor::new(csv), &ledger).unwrap();

        assert_eq!(ledger.customer_count(), 1);
    }

    #[test]
    fn balances_output_includes_header_and_rows() {
        let csv = "op,name,phone,amount,description\n\
                   customer,Ana,3001234567,,\n\
                   debt,Ana,,45000,\n";
        let ledger = empty_ledger();
        process_operations(Cursor::new(csv), &ledger).unwrap();

        let mut output = Vec::new();
        write_balances(&ledger, 15, &mut output).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.contains("name,phone,total_debt,last_payment,overdue"));
        assert!(output.contains("Ana,3001234567,45000"));
    }
}
