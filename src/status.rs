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

//! Account status, roles, and the feature-gating resolver.
//!
//! The resolver is strictly read-only: only the admin service (manually) or
//! the billing engine (on grace-period expiry) ever change `account_status`.

use crate::Registry;
use crate::base::AccountId;
use crate::billing::{MaintenanceInvoice, Period};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Platform-level gate controlling whether a shop owner can use the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Initial state for a newly created profile; only the pending screen
    /// is reachable.
    Pending,
    /// Full feature access.
    Active,
    /// Access blocked except the inactive screen and sign-out.
    Inactive,
}

/// Role tags attached to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppRole {
    Admin,
    StoreOwner,
}

/// The set of roles an account holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet {
    roles: Vec<AppRole>,
}

impl RoleSet {
    pub fn new(roles: impl IntoIterator<Item = AppRole>) -> Self {
        let mut set = Self::default();
        for role in roles {
            set.grant(role);
        }
        set
    }

    pub fn grant(&mut self, role: AppRole) {
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&AppRole::Admin)
    }

    pub fn is_store_owner(&self) -> bool {
        self.roles.contains(&AppRole::StoreOwner)
    }

    pub fn roles(&self) -> &[AppRole] {
        &self.roles
    }
}

/// What the presentation layer is allowed to mount for a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// No session or the status could not be determined; redirect to login.
    /// Never defaults open.
    Unauthenticated,
    /// The principal holds the admin role; all gating is bypassed.
    AdminBypass,
    /// Account awaiting activation; only the pending screen is reachable.
    Pending,
    /// Full access.
    Granted,
    /// Account lapsed; only the inactive screen and sign-out are reachable.
    Inactive,
}

/// Resolved gating state plus the raw inputs the UI may want to display.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub decision: AccessDecision,
    /// Profile status as stored; `None` when unauthenticated.
    pub status: Option<AccountStatus>,
    /// The current calendar period's invoice, if one exists.
    pub current_invoice: Option<MaintenanceInvoice>,
}

/// Derives the effective feature gate for the current principal.
pub struct StatusResolver {
    registry: Arc<Registry>,
}

impl StatusResolver {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Resolves the gate for a principal at `now`.
    ///
    /// A missing session resolves to [`AccessDecision::Unauthenticated`]. A
    /// missing profile reads as `Pending` (the lazily-created default) without
    /// creating one; this resolver never mutates. The current period's invoice
    /// is exposed as-is so the UI can render the maintenance banner.
    pub fn resolve(&self, principal: Option<&AccountId>, now: DateTime<Utc>) -> StatusSnapshot {
        let Some(account) = principal else {
            return StatusSnapshot {
                decision: AccessDecision::Unauthenticated,
                status: None,
                current_invoice: None,
            };
        };

        let status = self
            .registry
            .profile(account)
            .map(|p| p.account_status)
            .unwrap_or(AccountStatus::Pending);
        let current_invoice = self.registry.invoice_for(account, &Period::from_utc(now));

        let decision = if self.registry.roles(account).is_admin() {
            AccessDecision::AdminBypass
        } else {
            match status {
                AccountStatus::Pending => AccessDecision::Pending,
                AccountStatus::Active => AccessDecision::Granted,
                AccountStatus::Inactive => AccessDecision::Inactive,
            }
        };

        StatusSnapshot {
            decision,
            status: Some(status),
            current_invoice,
        }
    }
}
