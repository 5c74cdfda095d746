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

//! The per-account ledger store.
//!
//! Owns one shop's customers and transaction log, keeps `total_debt` derived
//! from postings, and persists every mutation through the backend before the
//! in-memory commit.
//!
//! # Invariants
//!
//! - After every posting, `total_debt == max(0, sum(debts) - sum(payments))`.
//! - A payment never drives the balance negative; overpayment clamps to zero.
//! - Transactions are append-only; the only removal path is the cascade when
//!   their customer is deleted.
//! - A backend failure leaves the in-memory view exactly as it was.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use fiado_ledger::{AccountId, Ledger, MemoryBackend};
//!
//! let ledger = Ledger::new(AccountId::random(), Arc::new(MemoryBackend::new()));
//! let ana = ledger.add_customer("Ana", "3001234567").unwrap();
//! ledger.add_debt(ana.id, 10_000, "arroz").unwrap();
//! assert_eq!(ledger.total_debt(), 10_000);
//! ```

use crate::LedgerError;
use crate::base::{AccountId, CustomerId, TransactionId};
use crate::customer::{Customer, validate_identity};
use crate::storage::{LedgerBackend, LedgerSnapshot};
use crate::transaction::{Transaction, TransactionKind};
use crate::transaction_log::TransactionLog;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// One account's customer/transaction store with derived balances.
pub struct Ledger {
    owner: AccountId,
    backend: Arc<dyn LedgerBackend>,
    customers: DashMap<CustomerId, Customer>,
    log: TransactionLog,
    next_customer: AtomicU64,
    next_transaction: AtomicU64,
    /// Serializes mutations so candidate snapshots are consistent.
    /// Single-writer-per-account is the normal mode anyway.
    write_gate: Mutex<()>,
}

impl Ledger {
    /// Creates an empty ledger for `owner`.
    pub fn new(owner: AccountId, backend: Arc<dyn LedgerBackend>) -> Self {
        Self {
            owner,
            backend,
            customers: DashMap::new(),
            log: TransactionLog::new(),
            next_customer: AtomicU64::new(1),
            next_transaction: AtomicU64::new(1),
            write_gate: Mutex::new(()),
        }
    }

    /// Opens a ledger from the backend's last persisted state.
    pub fn open(owner: AccountId, backend: Arc<dyn LedgerBackend>) -> Result<Self, LedgerError> {
        let snapshot = backend.load()?;
        let ledger = Self::new(owner, backend);

        let max_customer = snapshot.customers.iter().map(|c| c.id.0).max().unwrap_or(0);
        let max_transaction = snapshot.transactions.iter().map(|t| t.id.0).max().unwrap_or(0);
        ledger.next_customer.store(max_customer + 1, Ordering::Relaxed);
        ledger
            .next_transaction
            .store(max_transaction + 1, Ordering::Relaxed);

        for customer in snapshot.customers {
            ledger.customers.insert(customer.id, customer);
        }
        for transaction in snapshot.transactions {
            ledger.log.push(Arc::new(transaction))?;
        }
        Ok(ledger)
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    /// Adds a customer with a zero balance.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::EmptyName`] / [`LedgerError::EmptyPhone`] on invalid
    ///   identity fields.
    /// - [`LedgerError::Persistence`] if the backend write fails; nothing is
    ///   committed.
    pub fn add_customer(&self, name: &str, phone: &str) -> Result<Customer, LedgerError> {
        let _gate = self.write_gate.lock();
        let id = CustomerId(self.next_customer.fetch_add(1, Ordering::Relaxed));
        let customer = Customer::new(id, name, phone, Utc::now())?;

        let mut snapshot = self.snapshot();
        snapshot.customers.push(customer.clone());
        self.backend.persist(&snapshot)?;

        self.customers.insert(id, customer.clone());
        debug!(owner = %self.owner, customer = %id, "customer added");
        Ok(customer)
    }

    /// Posts a debt ("fiado") against a customer, increasing the balance.
    pub fn add_debt(
        &self,
        customer_id: CustomerId,
        amount: i64,
        description: &str,
    ) -> Result<Transaction, LedgerError> {
        self.post(customer_id, TransactionKind::Debt, amount, description)
    }

    /// Posts a payment ("abono"), decreasing the balance.
    ///
    /// Overpayment is accepted and clamps the balance to exactly zero; the
    /// excess is discarded rather than recorded as credit. This keeps a
    /// shopkeeper from being blocked on rounding or estimation errors.
    pub fn add_payment(
        &self,
        customer_id: CustomerId,
        amount: i64,
        description: &str,
    ) -> Result<Transaction, LedgerError> {
        self.post(customer_id, TransactionKind::Payment, amount, description)
    }

    fn post(
        &self,
        customer_id: CustomerId,
        kind: TransactionKind,
        amount: i64,
        description: &str,
    ) -> Result<Transaction, LedgerError> {
        let _gate = self.write_gate.lock();
        let mut customer = self
            .customers
            .get(&customer_id)
            .map(|c| c.clone())
            .ok_or(LedgerError::CustomerNotFound)?;

        let transaction = Transaction::new(
            TransactionId(self.next_transaction.fetch_add(1, Ordering::Relaxed)),
            customer_id,
            kind,
            amount,
            description,
            Utc::now(),
        )?;
        // Reject before touching the backend; the log push after a
        // successful persist must not be able to fail.
        if self.log.contains(transaction.id) {
            return Err(LedgerError::DuplicateTransaction);
        }

        match kind {
            TransactionKind::Debt => customer.total_debt += amount,
            TransactionKind::Payment => {
                customer.total_debt = (customer.total_debt - amount).max(0);
                customer.last_payment_date = Some(transaction.date);
            }
        }
        debug_assert!(customer.total_debt >= 0, "balance went negative");

        let mut snapshot = self.snapshot();
        if let Some(slot) = snapshot.customers.iter_mut().find(|c| c.id == customer_id) {
            *slot = customer.clone();
        }
        snapshot.transactions.push(transaction.clone());
        self.backend.persist(&snapshot)?;

        self.customers.insert(customer_id, customer);
        self.log.push(Arc::new(transaction.clone()))?;
        debug!(
            owner = %self.owner,
            customer = %customer_id,
            ?kind,
            amount,
            "transaction posted"
        );
        Ok(transaction)
    }

    /// Updates a customer's identity fields only; balance and transactions
    /// are untouched.
    pub fn update_customer(
        &self,
        customer_id: CustomerId,
        name: &str,
        phone: &str,
    ) -> Result<Customer, LedgerError> {
        let _gate = self.write_gate.lock();
        let (name, phone) = validate_identity(name, phone)?;
        let mut customer = self
            .customers
            .get(&customer_id)
            .map(|c| c.clone())
            .ok_or(LedgerError::CustomerNotFound)?;
        customer.name = name;
        customer.phone = phone;

        let mut snapshot = self.snapshot();
        if let Some(slot) = snapshot.customers.iter_mut().find(|c| c.id == customer_id) {
            *slot = customer.clone();
        }
        self.backend.persist(&snapshot)?;

        self.customers.insert(customer_id, customer.clone());
        Ok(customer)
    }

    /// Deletes a customer and cascades to all of its transactions.
    /// Irreversible.
    pub fn delete_customer(&self, customer_id: CustomerId) -> Result<(), LedgerError> {
        let _gate = self.write_gate.lock();
        if !self.customers.contains_key(&customer_id) {
            return Err(LedgerError::CustomerNotFound);
        }

        let mut snapshot = self.snapshot();
        snapshot.customers.retain(|c| c.id != customer_id);
        snapshot.transactions.retain(|t| t.customer_id != customer_id);
        self.backend.persist(&snapshot)?;

        self.customers.remove(&customer_id);
        let removed = self.log.remove_customer(customer_id);
        debug!(
            owner = %self.owner,
            customer = %customer_id,
            transactions = removed.len(),
            "customer deleted with cascade"
        );
        Ok(())
    }

    /// Sum of outstanding balances across all customers.
    pub fn total_debt(&self) -> i64 {
        self.customers.iter().map(|c| c.total_debt).sum()
    }

    /// Customers with outstanding debt whose most recent activity (last
    /// payment, or creation when none) is older than `threshold_days` from
    /// `now`.
    ///
    /// Display order and capping are the caller's concern.
    pub fn overdue_customers(&self, threshold_days: i64, now: DateTime<Utc>) -> Vec<Customer> {
        let threshold = now - Duration::days(threshold_days);
        self.customers
            .iter()
            .filter(|c| c.total_debt > 0 && c.last_activity() < threshold)
            .map(|c| c.clone())
            .collect()
    }

    /// All postings for a customer, newest first.
    pub fn customer_transactions(&self, customer_id: CustomerId) -> Vec<Transaction> {
        self.log
            .for_customer(customer_id)
            .into_iter()
            .map(|t| (*t).clone())
            .collect()
    }

    pub fn get_customer(&self, customer_id: CustomerId) -> Option<Customer> {
        self.customers.get(&customer_id).map(|c| c.clone())
    }

    /// Snapshot of all customers, ordered by id.
    pub fn customers(&self) -> Vec<Customer> {
        let mut all: Vec<Customer> = self.customers.iter().map(|c| c.clone()).collect();
        all.sort_by_key(|c| c.id);
        all
    }

    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    /// Current persistable state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut customers: Vec<Customer> = self.customers.iter().map(|c| c.clone()).collect();
        customers.sort_by_key(|c| c.id);
        let transactions = self
            .log
            .snapshot()
            .into_iter()
            .map(|t| (*t).clone())
            .collect();
        LedgerSnapshot {
            customers,
            transactions,
        }
    }
}
