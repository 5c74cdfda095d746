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

//! Persistence backends.
//!
//! Every mutating ledger operation persists through one of these traits
//! before the in-memory commit, so a backend failure leaves the in-memory
//! view untouched and the operation retryable.

use crate::LedgerError;
use crate::base::AccountId;
use crate::billing::MaintenanceInvoice;
use crate::customer::Customer;
use crate::profile::Profile;
use crate::status::RoleSet;
use crate::transaction::Transaction;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// Serialized form of one account's ledger: the local-fallback blob layout
/// (`{customers: [...], transactions: [...]}` with ISO-8601 dates).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub customers: Vec<Customer>,
    pub transactions: Vec<Transaction>,
}

/// Durable storage for one account's customers and transactions.
pub trait LedgerBackend: Send + Sync {
    /// Persists the full ledger state. Must be atomic from the caller's
    /// point of view: either the whole snapshot lands or the previous one
    /// survives.
    fn persist(&self, snapshot: &LedgerSnapshot) -> Result<(), LedgerError>;

    /// Loads the last persisted state; an empty snapshot when none exists.
    fn load(&self) -> Result<LedgerSnapshot, LedgerError>;
}

/// Durable storage for platform entities (profiles, roles, invoices) plus
/// the privileged contact-email lookup.
pub trait DirectoryBackend: Send + Sync {
    fn persist_profile(&self, profile: &Profile) -> Result<(), LedgerError>;
    fn persist_roles(&self, account: &AccountId, roles: &RoleSet) -> Result<(), LedgerError>;
    fn persist_invoice(&self, invoice: &MaintenanceInvoice) -> Result<(), LedgerError>;

    /// Resolves an account to its contact email. Privileged: only the admin
    /// service may call this.
    fn account_email(&self, account: &AccountId) -> Result<Option<String>, LedgerError>;
}

/// In-memory backend for tests and demo mode.
///
/// Write failures can be injected to exercise the persist-before-commit
/// contract.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    ledger: Mutex<LedgerSnapshot>,
    profiles: DashMap<AccountId, Profile>,
    roles: DashMap<AccountId, RoleSet>,
    invoices: DashMap<crate::base::InvoiceId, MaintenanceInvoice>,
    emails: DashMap<AccountId, String>,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with a persistence error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Registers the contact email returned by the privileged lookup.
    pub fn set_account_email(&self, account: AccountId, email: &str) {
        self.emails.insert(account, email.to_owned());
    }

    fn check_writable(&self) -> Result<(), LedgerError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Persistence("injected write failure".into()));
        }
        Ok(())
    }
}

impl LedgerBackend for MemoryBackend {
    fn persist(&self, snapshot: &LedgerSnapshot) -> Result<(), LedgerError> {
        self.check_writable()?;
        *self.ledger.lock() = snapshot.clone();
        Ok(())
    }

    fn load(&self) -> Result<LedgerSnapshot, LedgerError> {
        Ok(self.ledger.lock().clone())
    }
}

impl DirectoryBackend for MemoryBackend {
    fn persist_profile(&self, profile: &Profile) -> Result<(), LedgerError> {
        self.check_writable()?;
        self.profiles.insert(profile.account, profile.clone());
        Ok(())
    }

    fn persist_roles(&self, account: &AccountId, roles: &RoleSet) -> Result<(), LedgerError> {
        self.check_writable()?;
        self.roles.insert(*account, roles.clone());
        Ok(())
    }

    fn persist_invoice(&self, invoice: &MaintenanceInvoice) -> Result<(), LedgerError> {
        self.check_writable()?;
        self.invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    fn account_email(&self, account: &AccountId) -> Result<Option<String>, LedgerError> {
        Ok(self.emails.get(account).map(|e| e.clone()))
    }
}

/// File-based ledger backend: one JSON blob per account under a well-known
/// path, used when no remote session exists (demo mode).
#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LedgerBackend for JsonFileBackend {
    fn persist(&self, snapshot: &LedgerSnapshot) -> Result<(), LedgerError> {
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| LedgerError::Persistence(e.to_string()))?;
        // Write through a temp file and rename so a crash mid-write cannot
        // truncate the previous blob.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| LedgerError::Persistence(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| LedgerError::Persistence(e.to_string()))
    }

    fn load(&self) -> Result<LedgerSnapshot, LedgerError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LedgerSnapshot::default());
            }
            Err(e) => return Err(LedgerError::Persistence(e.to_string())),
        };
        serde_json::from_str(&raw).map_err(|e| LedgerError::MalformedData(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{CustomerId, TransactionId};
    use crate::transaction::TransactionKind;
    use chrono::Utc;

    fn sample_snapshot() -> LedgerSnapshot {
        let now = Utc::now();
        let mut customer = Customer::new(CustomerId(1), "Ana", "3001234567", now).unwrap();
        customer.total_debt = 10_000;
        let tx = Transaction::new(
            TransactionId(1),
            CustomerId(1),
            TransactionKind::Debt,
            10_000,
            "arroz",
            now,
        )
        .unwrap();
        LedgerSnapshot {
            customers: vec![customer],
            transactions: vec![tx],
        }
    }

    #[test]
    fn memory_backend_round_trips() {
        let backend = MemoryBackend::new();
        backend.persist(&sample_snapshot()).unwrap();
        let loaded = backend.load().unwrap();
        assert_eq!(loaded.customers.len(), 1);
        assert_eq!(loaded.transactions.len(), 1);
    }

    #[test]
    fn injected_failure_surfaces_as_persistence_error() {
        let backend = MemoryBackend::new();
        backend.set_fail_writes(true);
        let err = backend.persist(&sample_snapshot()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Persistence);
    }

    #[test]
    fn file_backend_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("fiados_data.json"));
        let loaded = backend.load().unwrap();
        assert!(loaded.customers.is_empty());
        assert!(loaded.transactions.is_empty());
    }

    #[test]
    fn file_backend_round_trips_iso_dates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fiados_data.json");
        let backend = JsonFileBackend::new(&path);
        let snapshot = sample_snapshot();
        backend.persist(&snapshot).unwrap();

        // Dates are stored as ISO-8601 strings in the blob.
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("created_at"));

        let loaded = backend.load().unwrap();
        assert_eq!(loaded.customers[0], snapshot.customers[0]);
        assert_eq!(loaded.transactions[0], snapshot.transactions[0]);
    }

    #[test]
    fn file_backend_rejects_malformed_blob() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fiados_data.json");
        std::fs::write(&path, "{not json").unwrap();
        let backend = JsonFileBackend::new(&path);
        let err = backend.load().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }
}
