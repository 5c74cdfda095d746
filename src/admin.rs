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

//! Admin reconciliation service: cross-account visibility and overrides.
//!
//! Every operation checks the actor's admin role at this boundary; the UI is
//! expected to make non-admin calls unreachable, but the service rejects them
//! regardless. Failed mutations leave both persisted state and the cached
//! aggregates untouched.

use crate::base::{AccountId, InvoiceId};
use crate::billing::{BillingEngine, InvoiceStatus, MaintenanceInvoice, Period};
use crate::status::AccountStatus;
use crate::{LedgerError, Registry};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// One account row in the back-office list: profile joined with ledger
/// aggregates and the privileged contact email.
#[derive(Debug, Clone, PartialEq)]
pub struct UserWithAggregates {
    pub account: AccountId,
    /// `None` when the privileged lookup has no email for the account.
    pub email: Option<String>,
    pub store_name: String,
    pub account_status: AccountStatus,
    pub maintenance_monthly_price_cop: i64,
    pub created_at: DateTime<Utc>,
    pub total_customers: usize,
    pub total_debt: i64,
}

/// Cross-account aggregate counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalStats {
    pub total_users: usize,
    pub active_users: usize,
    pub pending_users: usize,
    pub inactive_users: usize,
    pub total_debt_all_stores: i64,
    pub monthly_payments_received: i64,
}

impl GlobalStats {
    fn bucket_mut(&mut self, status: AccountStatus) -> &mut usize {
        match status {
            AccountStatus::Active => &mut self.active_users,
            AccountStatus::Pending => &mut self.pending_users,
            AccountStatus::Inactive => &mut self.inactive_users,
        }
    }
}

/// Privileged back-office operations over all accounts.
pub struct AdminService {
    registry: Arc<Registry>,
    billing: Arc<BillingEngine>,
    users: Mutex<Vec<UserWithAggregates>>,
    stats: Mutex<GlobalStats>,
}

impl AdminService {
    pub fn new(registry: Arc<Registry>, billing: Arc<BillingEngine>) -> Self {
        Self {
            registry,
            billing,
            users: Mutex::new(Vec::new()),
            stats: Mutex::new(GlobalStats::default()),
        }
    }

    fn require_admin(&self, actor: &AccountId) -> Result<(), LedgerError> {
        if self.registry.roles(actor).is_admin() {
            Ok(())
        } else {
            warn!(actor = %actor, "non-admin invoked an admin operation");
            Err(LedgerError::NotAuthorized)
        }
    }

    /// Joins every profile with its ledger aggregates and contact email.
    ///
    /// Reads are independent per account; an email lookup failure degrades to
    /// `None` for that row rather than failing the whole listing. Also
    /// refreshes the cached rows. Rows come back unsorted; ordering and
    /// filtering are the caller's concern.
    pub fn list_users_with_aggregates(
        &self,
        actor: &AccountId,
    ) -> Result<Vec<UserWithAggregates>, LedgerError> {
        self.require_admin(actor)?;
        let rows = self.load_users();
        *self.users.lock() = rows.clone();
        Ok(rows)
    }

    fn load_users(&self) -> Vec<UserWithAggregates> {
        self.registry
            .profiles()
            .into_iter()
            .map(|profile| {
                let (total_customers, total_debt) = self
                    .registry
                    .ledger(&profile.account)
                    .map(|ledger| (ledger.customer_count(), ledger.total_debt()))
                    .unwrap_or((0, 0));
                let email = self
                    .registry
                    .backend()
                    .account_email(&profile.account)
                    .unwrap_or(None);
                UserWithAggregates {
                    account: profile.account,
                    email,
                    store_name: profile.store_name,
                    account_status: profile.account_status,
                    maintenance_monthly_price_cop: profile.maintenance_monthly_price_cop,
                    created_at: profile.created_at,
                    total_customers,
                    total_debt,
                }
            })
            .collect()
    }

    /// Aggregate counters over a user listing plus the invoices paid in the
    /// period containing `now`.
    pub fn compute_global_stats(
        &self,
        users: &[UserWithAggregates],
        now: DateTime<Utc>,
    ) -> GlobalStats {
        let period = Period::from_utc(now);
        let monthly_payments_received = self
            .registry
            .invoices()
            .iter()
            .filter(|i| i.period == period && i.status == InvoiceStatus::Paid)
            .map(|i| i.amount_cop)
            .sum();

        let mut stats = GlobalStats {
            total_users: users.len(),
            total_debt_all_stores: users.iter().map(|u| u.total_debt).sum(),
            monthly_payments_received,
            ..GlobalStats::default()
        };
        for user in users {
            *stats.bucket_mut(user.account_status) += 1;
        }
        stats
    }

    /// Recomputes the cached rows and stats from scratch. The correctness
    /// fallback for every incremental update.
    pub fn refetch(
        &self,
        actor: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<GlobalStats, LedgerError> {
        self.require_admin(actor)?;
        let rows = self.load_users();
        let stats = self.compute_global_stats(&rows, now);
        *self.users.lock() = rows;
        *self.stats.lock() = stats;
        Ok(stats)
    }

    /// Cached rows from the last listing or refetch.
    pub fn cached_users(&self) -> Vec<UserWithAggregates> {
        self.users.lock().clone()
    }

    /// Cached stats from the last refetch or incremental update.
    pub fn cached_stats(&self) -> GlobalStats {
        *self.stats.lock()
    }

    /// Directly overrides an account's status.
    ///
    /// On success the cached status buckets are adjusted incrementally
    /// (decrement old, increment new) without a refetch.
    pub fn update_account_status(
        &self,
        actor: &AccountId,
        account: &AccountId,
        new_status: AccountStatus,
    ) -> Result<(), LedgerError> {
        self.require_admin(actor)?;
        let previous = self
            .registry
            .profile(account)
            .ok_or(LedgerError::ProfileNotFound)?
            .account_status;
        self.registry.update_profile(account, |profile| {
            profile.account_status = new_status;
        })?;

        let mut users = self.users.lock();
        if let Some(row) = users.iter_mut().find(|u| u.account == *account) {
            row.account_status = new_status;
        }
        if previous != new_status {
            let mut stats = self.stats.lock();
            let old_bucket = stats.bucket_mut(previous);
            *old_bucket = old_bucket.saturating_sub(1);
            *stats.bucket_mut(new_status) += 1;
        }
        debug!(account = %account, ?new_status, "account status overridden");
        Ok(())
    }

    /// Registers a maintenance payment on an invoice.
    ///
    /// Marks the invoice paid and reactivates the account (see the billing
    /// engine), then fully recomputes the cached aggregates: a payment can
    /// simultaneously flip a previously inactive account back to active.
    pub fn register_payment(
        &self,
        actor: &AccountId,
        invoice_id: InvoiceId,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceInvoice, LedgerError> {
        self.require_admin(actor)?;
        let invoice = self.billing.register_payment(invoice_id, now)?;
        self.refetch(actor, now)?;
        Ok(invoice)
    }

    /// Changes the standing monthly price used by future invoice generation.
    /// Already-created invoices keep their amounts.
    pub fn update_maintenance_price(
        &self,
        actor: &AccountId,
        account: &AccountId,
        new_price_cop: i64,
    ) -> Result<(), LedgerError> {
        self.require_admin(actor)?;
        self.registry
            .try_update_profile(account, |profile| profile.set_maintenance_price(new_price_cop))?;

        let mut users = self.users.lock();
        if let Some(row) = users.iter_mut().find(|u| u.account == *account) {
            row.maintenance_monthly_price_cop = new_price_cop;
        }
        debug!(account = %account, price = new_price_cop, "maintenance price updated");
        Ok(())
    }

    /// Every invoice on record, newest first.
    pub fn invoices(&self, actor: &AccountId) -> Result<Vec<MaintenanceInvoice>, LedgerError> {
        self.require_admin(actor)?;
        Ok(self.registry.invoices())
    }
}
