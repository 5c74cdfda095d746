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

//! Ledger transactions.
//!
//! Transactions are append-only: they are never edited or deleted on their
//! own, only cascade-deleted together with their customer.

use crate::LedgerError;
use crate::base::{CustomerId, TransactionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two sides of the tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Credit extended to the customer ("fiado"); increases the balance.
    Debt,
    /// Payment against the outstanding balance ("abono"); decreases it,
    /// clamped at zero.
    Payment,
}

impl TransactionKind {
    /// Description used when the caller provides none.
    pub fn default_description(&self) -> &'static str {
        match self {
            Self::Debt => "Fiado",
            Self::Payment => "Abono",
        }
    }
}

/// A single posting against a customer's tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub customer_id: CustomerId,
    pub kind: TransactionKind,
    /// COP pesos; always positive.
    pub amount: i64,
    pub description: String,
    /// Creation timestamp; immutable.
    pub date: DateTime<Utc>,
}

impl Transaction {
    /// Builds a posting, validating the amount and defaulting an empty
    /// description per kind.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidAmount`] if `amount` is not positive.
    pub fn new(
        id: TransactionId,
        customer_id: CustomerId,
        kind: TransactionKind,
        amount: i64,
        description: &str,
        date: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let description = description.trim();
        let description = if description.is_empty() {
            kind.default_description().to_owned()
        } else {
            description.to_owned()
        };
        Ok(Self {
            id,
            customer_id,
            kind,
            amount,
            description,
            date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_amount_is_rejected() {
        let result = Transaction::new(
            TransactionId(1),
            CustomerId(1),
            TransactionKind::Debt,
            0,
            "rice",
            Utc::now(),
        );
        assert_eq!(result, Err(LedgerError::InvalidAmount));
    }

    #[test]
    fn negative_amount_is_rejected() {
        let result = Transaction::new(
            TransactionId(1),
            CustomerId(1),
            TransactionKind::Payment,
            -500,
            "",
            Utc::now(),
        );
        assert_eq!(result, Err(LedgerError::InvalidAmount));
    }

    #[test]
    fn empty_description_defaults_per_kind() {
        let debt = Transaction::new(
            TransactionId(1),
            CustomerId(1),
            TransactionKind::Debt,
            1000,
            "  ",
            Utc::now(),
        )
        .unwrap();
        assert_eq!(debt.description, "Fiado");

        let payment = Transaction::new(
            TransactionId(2),
            CustomerId(1),
            TransactionKind::Payment,
            1000,
            "",
            Utc::now(),
        )
        .unwrap();
        assert_eq!(payment.description, "Abono");
    }

    #[test]
    fn explicit_description_is_kept() {
        let tx = Transaction::new(
            TransactionId(1),
            CustomerId(1),
            TransactionKind::Debt,
            10_000,
            "arroz",
            Utc::now(),
        )
        .unwrap();
        assert_eq!(tx.description, "arroz");
    }
}
