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

//! # Fiado Ledger
//!
//! A small-business tab ("fiado") manager: shop owners track customers, the
//! credit they extend and the payments made against it, send WhatsApp
//! reminders and receipts, and operate under a subscription-style account
//! gate driven by monthly maintenance invoices.
//!
//! ## Core Components
//!
//! - [`Ledger`]: per-account customer/transaction store with derived balances
//! - [`Registry`]: platform entities (profiles, roles, invoices, ledgers)
//! - [`StatusResolver`]: read-only pending/active/inactive feature gate
//! - [`BillingEngine`]: monthly maintenance invoices with grace periods
//! - [`AdminService`]: cross-account aggregation and override operations
//! - [`messages`]: template substitution and `wa.me` deep links
//! - [`LedgerError`]: error taxonomy shared by every operation
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use fiado_ledger::{AccountId, Ledger, MemoryBackend};
//!
//! let ledger = Ledger::new(AccountId::random(), Arc::new(MemoryBackend::new()));
//!
//! let ana = ledger.add_customer("Ana", "3001234567").unwrap();
//! ledger.add_debt(ana.id, 10_000, "arroz").unwrap();
//! ledger.add_payment(ana.id, 15_000, "").unwrap();
//!
//! // Overpayment clamps the balance at zero.
//! assert_eq!(ledger.get_customer(ana.id).unwrap().total_debt, 0);
//! ```
//!
//! ## Concurrency
//!
//! One logical writer per account; accounts are independent, so admin
//! fan-out reads and cross-account operations run concurrently without
//! coordination. Account status is recomputed lazily on read, never by a
//! background timer.

pub mod admin;
pub mod base;
pub mod billing;
pub mod customer;
pub mod error;
pub mod ledger;
pub mod messages;
pub mod profile;
pub mod registry;
pub mod status;
pub mod storage;
pub mod theme;
pub mod transaction;
mod transaction_log;

pub use admin::{AdminService, GlobalStats, UserWithAggregates};
pub use base::{AccountId, CustomerId, InvoiceId, TransactionId};
pub use billing::{BillingEngine, BillingPolicy, InvoiceStatus, MaintenanceInvoice, Period};
pub use customer::Customer;
pub use error::{ErrorKind, LedgerError};
pub use ledger::Ledger;
pub use profile::{BrandingColors, MessageTemplates, PaymentContacts, Profile};
pub use registry::Registry;
pub use status::{AccessDecision, AccountStatus, AppRole, RoleSet, StatusResolver, StatusSnapshot};
pub use storage::{DirectoryBackend, JsonFileBackend, LedgerBackend, LedgerSnapshot, MemoryBackend};
pub use transaction::{Transaction, TransactionKind};
pub use transaction_log::TransactionLog;
