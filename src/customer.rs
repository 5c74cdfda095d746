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

//! Customer entities and the identity-field validation rules.

use crate::LedgerError;
use crate::base::CustomerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum digits kept after phone normalization (local Colombian numbers,
/// no country code stored).
pub const MAX_PHONE_DIGITS: usize = 10;

/// A shop customer carrying an outstanding tab.
///
/// `total_debt` is a derived balance in integer COP pesos. It is maintained
/// by the [`Ledger`](crate::Ledger) through transaction postings and is never
/// written directly: after every posting it equals
/// `max(0, sum(debts) - sum(payments))`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    /// Digits only, at most [`MAX_PHONE_DIGITS`].
    pub phone: String,
    /// Outstanding balance in COP pesos; never negative.
    pub total_debt: i64,
    pub last_payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Creates a customer with a zero balance after validating identity fields.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::EmptyName`] if the name is empty after trimming.
    /// - [`LedgerError::EmptyPhone`] if no digits remain after normalization.
    pub fn new(
        id: CustomerId,
        name: &str,
        phone: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        let (name, phone) = validate_identity(name, phone)?;
        Ok(Self {
            id,
            name,
            phone,
            total_debt: 0,
            last_payment_date: None,
            created_at,
        })
    }

    /// Most recent ledger activity: last payment if any, creation otherwise.
    ///
    /// This is the reference point for overdue detection.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_payment_date.unwrap_or(self.created_at)
    }
}

/// Validates and normalizes a (name, phone) pair.
///
/// The name is trimmed; the phone is reduced to its digits and truncated to
/// [`MAX_PHONE_DIGITS`]. Both must be non-empty afterwards.
pub fn validate_identity(name: &str, phone: &str) -> Result<(String, String), LedgerError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::EmptyName);
    }
    let phone = normalize_phone(phone);
    if phone.is_empty() {
        return Err(LedgerError::EmptyPhone);
    }
    Ok((name.to_owned(), phone))
}

/// Strips non-digits and truncates to the local phone length.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_digit)
        .take(MAX_PHONE_DIGITS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn new_customer_starts_with_zero_debt() {
        let customer = Customer::new(CustomerId(1), "Ana", "3001234567", now()).unwrap();
        assert_eq!(customer.total_debt, 0);
        assert_eq!(customer.last_payment_date, None);
    }

    #[test]
    fn name_is_trimmed() {
        let customer = Customer::new(CustomerId(1), "  Ana  ", "3001234567", now()).unwrap();
        assert_eq!(customer.name, "Ana");
    }

    #[test]
    fn empty_name_is_rejected() {
        let result = Customer::new(CustomerId(1), "   ", "3001234567", now());
        assert_eq!(result, Err(LedgerError::EmptyName));
    }

    #[test]
    fn phone_keeps_digits_only() {
        let customer = Customer::new(CustomerId(1), "Ana", "(300) 123-4567", now()).unwrap();
        assert_eq!(customer.phone, "3001234567");
    }

    #[test]
    fn phone_is_truncated_to_ten_digits() {
        let customer = Customer::new(CustomerId(1), "Ana", "573001234567", now()).unwrap();
        assert_eq!(customer.phone.len(), MAX_PHONE_DIGITS);
        assert_eq!(customer.phone, "5730012345");
    }

    #[test]
    fn phone_without_digits_is_rejected() {
        let result = Customer::new(CustomerId(1), "Ana", "n/a", now());
        assert_eq!(result, Err(LedgerError::EmptyPhone));
    }

    #[test]
    fn last_activity_prefers_payment_date() {
        let created = now();
        let mut customer = Customer::new(CustomerId(1), "Ana", "3001234567", created).unwrap();
        assert_eq!(customer.last_activity(), created);

        let paid = created + chrono::Duration::days(3);
        customer.last_payment_date = Some(paid);
        assert_eq!(customer.last_activity(), paid);
    }
}
