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

//! Append-only transaction log with deduplication.
//!
//! Postings are never edited in place. The only removal path is the cascade
//! when a customer is deleted.

use crate::LedgerError;
use crate::base::{CustomerId, TransactionId};
use crate::transaction::Transaction;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::sync::Arc;

/// Append-only log of ledger postings.
///
/// A [`DashMap`] gives O(1) duplicate detection and per-transaction lookup;
/// a mutex-guarded vector preserves insertion order for display.
#[derive(Debug)]
pub struct TransactionLog {
    /// Transactions indexed by ID for duplicate detection and reads.
    transactions: DashMap<TransactionId, Arc<Transaction>>,

    /// Transaction IDs in insertion order.
    order: Mutex<Vec<TransactionId>>,
}

impl TransactionLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self {
            transactions: DashMap::new(),
            order: Mutex::new(Vec::new()),
        }
    }

    /// Appends a transaction to the log.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicateTransaction`] if a transaction with
    /// the same ID was already recorded.
    pub fn push(&self, transaction: Arc<Transaction>) -> Result<(), LedgerError> {
        let transaction_id = transaction.id;

        // Entry API for atomic check-and-insert.
        match self.transactions.entry(transaction_id) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateTransaction),
            Entry::Vacant(entry) => {
                entry.insert(transaction);
                self.order.lock().push(transaction_id);
                Ok(())
            }
        }
    }

    /// True when a posting with this ID was already recorded.
    pub fn contains(&self, id: TransactionId) -> bool {
        self.transactions.contains_key(&id)
    }

    /// All postings for one customer, newest first.
    ///
    /// Postings created in the same instant keep reverse insertion order, so
    /// the most recent append still comes first.
    pub fn for_customer(&self, customer_id: CustomerId) -> Vec<Arc<Transaction>> {
        let order = self.order.lock();
        let mut result: Vec<Arc<Transaction>> = order
            .iter()
            .filter_map(|id| self.transactions.get(id).map(|t| Arc::clone(t.value())))
            .filter(|t| t.customer_id == customer_id)
            .collect();
        result.reverse();
        result.sort_by(|a, b| b.date.cmp(&a.date));
        result
    }

    /// Snapshot of the full log in insertion order.
    pub fn snapshot(&self) -> Vec<Arc<Transaction>> {
        let order = self.order.lock();
        order
            .iter()
            .filter_map(|id| self.transactions.get(id).map(|t| Arc::clone(t.value())))
            .collect()
    }

    /// Removes every posting belonging to a deleted customer.
    ///
    /// Returns the removed transactions (oldest first).
    pub fn remove_customer(&self, customer_id: CustomerId) -> Vec<Arc<Transaction>> {
        let mut order = self.order.lock();
        let mut removed = Vec::new();
        order.retain(|id| {
            let belongs = self
                .transactions
                .get(id)
                .is_some_and(|t| t.customer_id == customer_id);
            if belongs {
                if let Some((_, tx)) = self.transactions.remove(id) {
                    removed.push(tx);
                }
            }
            !belongs
        });
        removed
    }

    /// Number of postings currently in the log.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// True when the log holds no postings.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self::new()
    }
}
