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

//! Error types for ledger and back-office operations.

use thiserror::Error;

/// Broad classification of a [`LedgerError`].
///
/// Callers that only care about how to surface a failure (inline form error,
/// transient notice, hard reject) can branch on the kind instead of matching
/// every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input rejected before any mutation took place.
    Validation,
    /// Backend write/read failure; state unchanged, retry by re-invoking.
    Persistence,
    /// Caller lacks the role required for the operation.
    Authorization,
    /// Referenced entity does not exist (or was deleted).
    NotFound,
}

/// Ledger and back-office operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Customer name is empty after trimming
    #[error("customer name is required")]
    EmptyName,

    /// Customer phone is empty after normalization
    #[error("customer phone is required")]
    EmptyPhone,

    /// Amount is zero or negative
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// Maintenance price is zero or negative
    #[error("invalid maintenance price (must be positive)")]
    InvalidPrice,

    /// Serialized state could not be parsed
    #[error("malformed stored data: {0}")]
    MalformedData(String),

    /// Duplicate transaction ID in the append-only log
    #[error("duplicate transaction ID")]
    DuplicateTransaction,

    /// Referenced customer does not exist
    #[error("customer not found")]
    CustomerNotFound,

    /// Referenced maintenance invoice does not exist
    #[error("invoice not found")]
    InvoiceNotFound,

    /// Referenced profile does not exist
    #[error("profile not found")]
    ProfileNotFound,

    /// Caller does not hold the admin role
    #[error("operation requires the admin role")]
    NotAuthorized,

    /// Backend persistence failure
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl LedgerError {
    /// Maps the variant onto the coarse error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyName
            | Self::EmptyPhone
            | Self::InvalidAmount
            | Self::InvalidPrice
            | Self::MalformedData(_)
            | Self::DuplicateTransaction => ErrorKind::Validation,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::NotAuthorized => ErrorKind::Authorization,
            Self::CustomerNotFound | Self::InvoiceNotFound | Self::ProfileNotFound => {
                ErrorKind::NotFound
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, LedgerError};

    #[test]
    fn error_display_messages() {
        assert_eq!(LedgerError::EmptyName.to_string(), "customer name is required");
        assert_eq!(
            LedgerError::EmptyPhone.to_string(),
            "customer phone is required"
        );
        assert_eq!(
            LedgerError::InvalidAmount.to_string(),
            "invalid amount (must be positive)"
        );
        assert_eq!(
            LedgerError::InvalidPrice.to_string(),
            "invalid maintenance price (must be positive)"
        );
        assert_eq!(LedgerError::CustomerNotFound.to_string(), "customer not found");
        assert_eq!(LedgerError::InvoiceNotFound.to_string(), "invoice not found");
        assert_eq!(LedgerError::ProfileNotFound.to_string(), "profile not found");
        assert_eq!(
            LedgerError::NotAuthorized.to_string(),
            "operation requires the admin role"
        );
        assert_eq!(
            LedgerError::Persistence("disk full".into()).to_string(),
            "persistence failure: disk full"
        );
    }

    #[test]
    fn kinds_cover_the_taxonomy() {
        assert_eq!(LedgerError::EmptyName.kind(), ErrorKind::Validation);
        assert_eq!(LedgerError::InvalidAmount.kind(), ErrorKind::Validation);
        assert_eq!(
            LedgerError::Persistence("x".into()).kind(),
            ErrorKind::Persistence
        );
        assert_eq!(LedgerError::NotAuthorized.kind(), ErrorKind::Authorization);
        assert_eq!(LedgerError::CustomerNotFound.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn errors_are_cloneable() {
        let error = LedgerError::CustomerNotFound;
        let cloned = error.clone();
        assert_eq!(error, cloned);
    }
}
