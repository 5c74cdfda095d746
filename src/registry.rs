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

//! Platform registry: profiles, roles, maintenance invoices, and the
//! per-account ledgers.
//!
//! The registry is the single place that owns platform entities. Reads are
//! concurrent per account; every mutation persists through the
//! [`DirectoryBackend`] before the in-memory commit.

use crate::LedgerError;
use crate::base::{AccountId, InvoiceId};
use crate::billing::{MaintenanceInvoice, Period};
use crate::ledger::Ledger;
use crate::profile::Profile;
use crate::status::{AppRole, RoleSet};
use crate::storage::{DirectoryBackend, LedgerBackend};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Owns the platform-level entities and the ledger handles per account.
pub struct Registry {
    backend: Arc<dyn DirectoryBackend>,
    profiles: DashMap<AccountId, Profile>,
    roles: DashMap<AccountId, RoleSet>,
    invoices: DashMap<InvoiceId, MaintenanceInvoice>,
    /// (account, period) -> invoice id; enforces one invoice per period.
    invoice_index: DashMap<(AccountId, Period), InvoiceId>,
    ledgers: DashMap<AccountId, Arc<Ledger>>,
    next_invoice: AtomicU64,
}

impl Registry {
    pub fn new(backend: Arc<dyn DirectoryBackend>) -> Self {
        Self {
            backend,
            profiles: DashMap::new(),
            roles: DashMap::new(),
            invoices: DashMap::new(),
            invoice_index: DashMap::new(),
            ledgers: DashMap::new(),
            next_invoice: AtomicU64::new(1),
        }
    }

    pub fn backend(&self) -> &Arc<dyn DirectoryBackend> {
        &self.backend
    }

    // --- profiles ---

    pub fn profile(&self, account: &AccountId) -> Option<Profile> {
        self.profiles.get(account).map(|p| p.clone())
    }

    /// Returns the account's profile, creating it with the documented
    /// defaults on first access.
    ///
    /// Creation is persisted before the in-memory commit.
    pub fn get_or_create_profile(
        &self,
        account: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Profile, LedgerError> {
        if let Some(existing) = self.profile(account) {
            return Ok(existing);
        }
        let profile = Profile::with_defaults(*account, now);
        self.backend.persist_profile(&profile)?;
        self.profiles.insert(*account, profile.clone());
        debug!(account = %account, "profile created with defaults");
        Ok(profile)
    }

    /// Applies an infallible edit to an existing profile.
    pub fn update_profile(
        &self,
        account: &AccountId,
        edit: impl FnOnce(&mut Profile),
    ) -> Result<Profile, LedgerError> {
        self.try_update_profile(account, |profile| {
            edit(profile);
            Ok(())
        })
    }

    /// Applies a fallible edit to an existing profile.
    ///
    /// The edited profile is persisted before the in-memory commit; on any
    /// failure the stored profile is left untouched.
    pub fn try_update_profile(
        &self,
        account: &AccountId,
        edit: impl FnOnce(&mut Profile) -> Result<(), LedgerError>,
    ) -> Result<Profile, LedgerError> {
        let mut updated = self.profile(account).ok_or(LedgerError::ProfileNotFound)?;
        edit(&mut updated)?;
        self.backend.persist_profile(&updated)?;
        self.profiles.insert(*account, updated.clone());
        Ok(updated)
    }

    /// Snapshot of every profile, for the admin fan-out.
    pub fn profiles(&self) -> Vec<Profile> {
        self.profiles.iter().map(|p| p.clone()).collect()
    }

    // --- roles ---

    /// The account's role set; empty when none were granted.
    pub fn roles(&self, account: &AccountId) -> RoleSet {
        self.roles
            .get(account)
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn grant_role(&self, account: &AccountId, role: AppRole) -> Result<(), LedgerError> {
        let mut roles = self.roles(account);
        roles.grant(role);
        self.backend.persist_roles(account, &roles)?;
        self.roles.insert(*account, roles);
        Ok(())
    }

    // --- invoices ---

    pub fn next_invoice_id(&self) -> InvoiceId {
        InvoiceId(self.next_invoice.fetch_add(1, Ordering::Relaxed))
    }

    pub fn invoice(&self, id: InvoiceId) -> Option<MaintenanceInvoice> {
        self.invoices.get(&id).map(|i| i.clone())
    }

    pub fn invoice_for(&self, account: &AccountId, period: &Period) -> Option<MaintenanceInvoice> {
        self.invoice_index
            .get(&(*account, *period))
            .and_then(|id| self.invoice(*id))
    }

    /// Inserts or replaces an invoice, persisting first.
    pub fn insert_invoice(&self, invoice: MaintenanceInvoice) -> Result<(), LedgerError> {
        self.backend.persist_invoice(&invoice)?;
        self.invoice_index
            .insert((invoice.account, invoice.period), invoice.id);
        self.invoices.insert(invoice.id, invoice);
        Ok(())
    }

    /// Snapshot of every invoice, newest first.
    pub fn invoices(&self) -> Vec<MaintenanceInvoice> {
        let mut all: Vec<MaintenanceInvoice> = self.invoices.iter().map(|i| i.clone()).collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    // --- ledgers ---

    /// Opens (or returns) the account's ledger backed by `backend`, loading
    /// any previously persisted state.
    pub fn open_ledger(
        &self,
        account: &AccountId,
        backend: Arc<dyn LedgerBackend>,
    ) -> Result<Arc<Ledger>, LedgerError> {
        if let Some(existing) = self.ledgers.get(account) {
            return Ok(Arc::clone(&existing));
        }
        let ledger = Arc::new(Ledger::open(*account, backend)?);
        self.ledgers.insert(*account, Arc::clone(&ledger));
        Ok(ledger)
    }

    pub fn ledger(&self, account: &AccountId) -> Option<Arc<Ledger>> {
        self.ledgers.get(account).map(|l| Arc::clone(&l))
    }

    /// Handles to every open ledger, for cross-account aggregation.
    pub fn ledgers(&self) -> Vec<Arc<Ledger>> {
        self.ledgers.iter().map(|l| Arc::clone(&l)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    fn registry() -> (Arc<MemoryBackend>, Registry) {
        let backend = Arc::new(MemoryBackend::new());
        let registry = Registry::new(backend.clone() as Arc<dyn DirectoryBackend>);
        (backend, registry)
    }

    #[test]
    fn get_or_create_profile_is_idempotent() {
        let (_, registry) = registry();
        let account = AccountId::random();
        let first = registry.get_or_create_profile(&account, Utc::now()).unwrap();
        let second = registry.get_or_create_profile(&account, Utc::now()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn update_missing_profile_is_not_found() {
        let (_, registry) = registry();
        let result = registry.update_profile(&AccountId::random(), |_| {});
        assert_eq!(result, Err(LedgerError::ProfileNotFound));
    }

    #[test]
    fn failed_persist_leaves_profile_untouched() {
        let (backend, registry) = registry();
        let account = AccountId::random();
        registry.get_or_create_profile(&account, Utc::now()).unwrap();

        backend.set_fail_writes(true);
        let result = registry.update_profile(&account, |p| p.set_store_name("Nueva"));
        assert!(matches!(result, Err(LedgerError::Persistence(_))));

        let stored = registry.profile(&account).unwrap();
        assert_eq!(stored.store_name, "Mi Tienda");
    }

    #[test]
    fn roles_default_to_empty() {
        let (_, registry) = registry();
        let account = AccountId::random();
        assert!(!registry.roles(&account).is_admin());

        registry.grant_role(&account, AppRole::Admin).unwrap();
        assert!(registry.roles(&account).is_admin());
    }
}
