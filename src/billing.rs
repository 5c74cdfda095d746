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

//! Maintenance billing: recurring monthly invoices, grace periods, and the
//! overdue-to-inactive transition.
//!
//! Invoice status is a pure function of `now` against `(due_at, grace_until,
//! paid_at)`; no background timer owns the transitions. Status is recomputed
//! lazily whenever someone evaluates it, and a `Paid` invoice never reverts
//! automatically.

use crate::base::{AccountId, InvoiceId};
use crate::status::AccountStatus;
use crate::{LedgerError, Registry};
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Calendar-month billing period, keyed as `"YYYY-MM"` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Period {
    pub year: i32,
    /// 1-based month.
    pub month: u32,
}

impl Period {
    /// The period containing `now` (UTC).
    pub fn from_utc(now: DateTime<Utc>) -> Self {
        Self {
            year: now.year(),
            month: now.month(),
        }
    }

    /// Midnight UTC on the first day of the period.
    pub fn start(&self) -> DateTime<Utc> {
        // Month is always in 1..=12 for constructed periods.
        Utc.with_ymd_and_hms(self.year, self.month, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}

impl TryFrom<String> for Period {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let (year, month) = value
            .split_once('-')
            .ok_or_else(|| format!("invalid period key: {value}"))?;
        let year: i32 = year.parse().map_err(|_| format!("invalid year: {value}"))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("invalid month: {value}"))?;
        if !(1..=12).contains(&month) {
            return Err(format!("month out of range: {value}"));
        }
        Ok(Self { year, month })
    }
}

/// Deployment-configurable billing offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPolicy {
    /// Day of the month the invoice falls due (1-based).
    pub due_day: u32,
    /// Days after `due_at` before an unpaid invoice deactivates the account.
    pub grace_days: i64,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            due_day: 5,
            grace_days: 10,
        }
    }
}

impl BillingPolicy {
    /// Due timestamp for a period under this policy.
    pub fn due_at(&self, period: &Period) -> DateTime<Utc> {
        period.start() + Duration::days(i64::from(self.due_day.saturating_sub(1)))
    }

    /// End of the grace window for a period under this policy.
    pub fn grace_until(&self, period: &Period) -> DateTime<Utc> {
        self.due_at(period) + Duration::days(self.grace_days)
    }
}

/// Lifecycle of a maintenance invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Open,
    Paid,
    Overdue,
    Inactive,
}

/// The recurring charge the platform levies on a shop-owner account for one
/// calendar month. At most one invoice exists per (account, period).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceInvoice {
    pub id: InvoiceId,
    pub account: AccountId,
    pub period: Period,
    pub amount_cop: i64,
    pub status: InvoiceStatus,
    pub due_at: DateTime<Utc>,
    pub grace_until: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Pure status derivation: `now` against the invoice's deadlines.
///
/// Any non-null `paid_at` pins the status at `Paid` regardless of `now`;
/// otherwise the invoice is `Open` before `due_at`, `Overdue` from `due_at`
/// up to `grace_until`, and `Inactive` from `grace_until` on.
pub fn evaluate_status(
    now: DateTime<Utc>,
    due_at: DateTime<Utc>,
    grace_until: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
) -> InvoiceStatus {
    if paid_at.is_some() {
        return InvoiceStatus::Paid;
    }
    if now < due_at {
        InvoiceStatus::Open
    } else if now < grace_until {
        InvoiceStatus::Overdue
    } else {
        InvoiceStatus::Inactive
    }
}

/// Creates and reconciles maintenance invoices against the registry.
pub struct BillingEngine {
    registry: Arc<Registry>,
    policy: BillingPolicy,
}

impl BillingEngine {
    pub fn new(registry: Arc<Registry>, policy: BillingPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn policy(&self) -> &BillingPolicy {
        &self.policy
    }

    /// Returns the invoice for the period containing `now`, creating it as
    /// `Open` at the profile's standing price when it does not exist yet.
    pub fn get_or_create_invoice(
        &self,
        account: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceInvoice, LedgerError> {
        let period = Period::from_utc(now);
        if let Some(existing) = self.registry.invoice_for(account, &period) {
            return Ok(existing);
        }

        let profile = self.registry.get_or_create_profile(account, now)?;
        let invoice = MaintenanceInvoice {
            id: self.registry.next_invoice_id(),
            account: *account,
            period,
            amount_cop: profile.maintenance_monthly_price_cop,
            status: InvoiceStatus::Open,
            due_at: self.policy.due_at(&period),
            grace_until: self.policy.grace_until(&period),
            paid_at: None,
            created_at: now,
        };
        self.registry.insert_invoice(invoice.clone())?;
        debug!(account = %account, period = %period, amount = invoice.amount_cop, "created maintenance invoice");
        Ok(invoice)
    }

    /// Reconciles the current period's invoice against `now`.
    ///
    /// Persists any status progression, and when the invoice lands on
    /// `Inactive` propagates `account_status = Inactive` to the profile.
    /// Returns the invoice as stored after reconciliation.
    pub fn evaluate(
        &self,
        account: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceInvoice, LedgerError> {
        let mut invoice = self.get_or_create_invoice(account, now)?;
        let derived = evaluate_status(now, invoice.due_at, invoice.grace_until, invoice.paid_at);
        if derived == invoice.status {
            return Ok(invoice);
        }

        invoice.status = derived;
        if derived == InvoiceStatus::Inactive {
            // Profile first: the account must not stay usable if the invoice
            // write succeeds but the profile write fails.
            self.registry.update_profile(account, |profile| {
                profile.account_status = AccountStatus::Inactive;
            })?;
            warn!(account = %account, period = %invoice.period, "grace period expired, account deactivated");
        }
        self.registry.insert_invoice(invoice.clone())?;
        Ok(invoice)
    }

    /// Registers a payment on an invoice (admin action).
    ///
    /// Marks the invoice `Paid`, and unconditionally restores
    /// `account_status = Active` plus `last_maintenance_paid_at` on the
    /// profile, even if the account had already lapsed into inactive.
    pub fn register_payment(
        &self,
        invoice_id: InvoiceId,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceInvoice, LedgerError> {
        let mut invoice = self
            .registry
            .invoice(invoice_id)
            .ok_or(LedgerError::InvoiceNotFound)?;

        invoice.status = InvoiceStatus::Paid;
        invoice.paid_at = Some(now);
        self.registry.insert_invoice(invoice.clone())?;
        self.registry.update_profile(&invoice.account, |profile| {
            profile.account_status = AccountStatus::Active;
            profile.last_maintenance_paid_at = Some(now);
        })?;
        debug!(account = %invoice.account, invoice = %invoice_id, "maintenance payment registered");
        Ok(invoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).single().unwrap()
    }

    #[test]
    fn period_key_formats_and_parses() {
        let period = Period::from_utc(ts(2025, 3, 17));
        assert_eq!(period.to_string(), "2025-03");
        assert_eq!(Period::try_from("2025-03".to_owned()).unwrap(), period);
        assert!(Period::try_from("2025-13".to_owned()).is_err());
        assert!(Period::try_from("garbage".to_owned()).is_err());
    }

    #[test]
    fn default_policy_offsets() {
        let policy = BillingPolicy::default();
        let period = Period { year: 2025, month: 6 };
        assert_eq!(policy.due_at(&period), Utc.with_ymd_and_hms(2025, 6, 5, 0, 0, 0).unwrap());
        assert_eq!(
            policy.grace_until(&period),
            Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn status_is_pure_in_now() {
        let due = ts(2025, 6, 5);
        let grace = ts(2025, 6, 15);

        assert_eq!(evaluate_status(ts(2025, 6, 1), due, grace, None), InvoiceStatus::Open);
        assert_eq!(evaluate_status(due, due, grace, None), InvoiceStatus::Overdue);
        assert_eq!(
            evaluate_status(ts(2025, 6, 10), due, grace, None),
            InvoiceStatus::Overdue
        );
        assert_eq!(evaluate_status(grace, due, grace, None), InvoiceStatus::Inactive);
        assert_eq!(
            evaluate_status(ts(2025, 7, 1), due, grace, None),
            InvoiceStatus::Inactive
        );
    }

    #[test]
    fn paid_pins_status_regardless_of_now() {
        let due = ts(2025, 6, 5);
        let grace = ts(2025, 6, 15);
        let paid = Some(ts(2025, 6, 20));

        assert_eq!(evaluate_status(ts(2025, 6, 1), due, grace, paid), InvoiceStatus::Paid);
        assert_eq!(evaluate_status(ts(2026, 1, 1), due, grace, paid), InvoiceStatus::Paid);
    }
}
