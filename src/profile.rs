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

//! Account-owner profiles: store branding, payment contacts, message
//! templates, and the platform-level account status.

use crate::LedgerError;
use crate::base::AccountId;
use crate::customer::normalize_phone;
use crate::status::AccountStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store name used when the owner has not set one.
pub const DEFAULT_STORE_NAME: &str = "Mi Tienda";

/// Theme id used until the owner picks or customizes one.
pub const DEFAULT_THEME: &str = "light";

/// Standing monthly maintenance price in COP for new accounts.
pub const DEFAULT_MONTHLY_PRICE_COP: i64 = 20_000;

/// The four branding colors a store owner can customize, as hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandingColors {
    pub primary: String,
    pub secondary: String,
    pub background: String,
    pub text: String,
}

impl Default for BrandingColors {
    fn default() -> Self {
        Self {
            primary: "#10B981".to_owned(),
            secondary: "#059669".to_owned(),
            background: "#F0FDF4".to_owned(),
            text: "#1F2937".to_owned(),
        }
    }
}

/// Phone handles customers can pay through, normalized like customer phones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentContacts {
    pub whatsapp: Option<String>,
    pub nequi: Option<String>,
    pub daviplata: Option<String>,
}

impl PaymentContacts {
    /// Normalizes every handle to digits, dropping ones that end up empty.
    pub fn normalized(
        whatsapp: Option<&str>,
        nequi: Option<&str>,
        daviplata: Option<&str>,
    ) -> Self {
        let clean = |v: Option<&str>| {
            v.map(normalize_phone)
                .filter(|digits| !digits.is_empty())
        };
        Self {
            whatsapp: clean(whatsapp),
            nequi: clean(nequi),
            daviplata: clean(daviplata),
        }
    }
}

/// Outbound message templates with `{key}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplates {
    pub reminder: String,
    pub receipt: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            reminder: "¡Hola {customer_first_name}! Tienes un saldo pendiente de {amount}. \
                       Puedes pagar por Nequi {nequi}, Daviplata {daviplata}. \
                       Tienda: {store_name}."
                .to_owned(),
            receipt: "Recibo #{transaction_id} - {store_name}\nCliente: {customer_name}\n\
                      Pago: {amount}\nFecha: {date}\nSaldo restante: {remaining}\n\
                      Contacto: {whatsapp}"
                .to_owned(),
        }
    }
}

/// Per-account profile: branding plus the platform billing/status fields.
///
/// Profiles are created lazily on first access through
/// [`Registry::get_or_create_profile`](crate::Registry::get_or_create_profile)
/// with the defaults documented on each field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub account: AccountId,
    pub store_name: String,
    /// Public URL of the uploaded logo; upload itself is an external concern.
    pub logo_url: Option<String>,
    pub colors: BrandingColors,
    pub active_theme: String,
    pub account_status: AccountStatus,
    /// Standing price used by future invoice generation; always positive.
    pub maintenance_monthly_price_cop: i64,
    pub last_maintenance_paid_at: Option<DateTime<Utc>>,
    pub payment_contacts: PaymentContacts,
    pub templates: MessageTemplates,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Default payload for lazily-created profiles.
    pub fn with_defaults(account: AccountId, created_at: DateTime<Utc>) -> Self {
        Self {
            account,
            store_name: DEFAULT_STORE_NAME.to_owned(),
            logo_url: None,
            colors: BrandingColors::default(),
            active_theme: DEFAULT_THEME.to_owned(),
            account_status: AccountStatus::Pending,
            maintenance_monthly_price_cop: DEFAULT_MONTHLY_PRICE_COP,
            last_maintenance_paid_at: None,
            payment_contacts: PaymentContacts::default(),
            templates: MessageTemplates::default(),
            created_at,
        }
    }

    /// Sets the store name, falling back to the default when blank.
    pub fn set_store_name(&mut self, name: &str) {
        let name = name.trim();
        self.store_name = if name.is_empty() {
            DEFAULT_STORE_NAME.to_owned()
        } else {
            name.to_owned()
        };
    }

    /// Replaces the branding colors and marks the theme as custom.
    pub fn set_custom_colors(&mut self, colors: BrandingColors) {
        self.colors = colors;
        self.active_theme = "custom".to_owned();
    }

    /// Updates the standing maintenance price.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidPrice`] if the price is not positive.
    pub fn set_maintenance_price(&mut self, price_cop: i64) -> Result<(), LedgerError> {
        if price_cop <= 0 {
            return Err(LedgerError::InvalidPrice);
        }
        self.maintenance_monthly_price_cop = price_cop;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lazily_created_profile_defaults() {
        let profile = Profile::with_defaults(AccountId::random(), Utc::now());
        assert_eq!(profile.store_name, "Mi Tienda");
        assert_eq!(profile.active_theme, "light");
        assert_eq!(profile.account_status, AccountStatus::Pending);
        assert_eq!(profile.maintenance_monthly_price_cop, 20_000);
        assert_eq!(profile.last_maintenance_paid_at, None);
    }

    #[test]
    fn blank_store_name_falls_back_to_default() {
        let mut profile = Profile::with_defaults(AccountId::random(), Utc::now());
        profile.set_store_name("Tienda Ana");
        assert_eq!(profile.store_name, "Tienda Ana");
        profile.set_store_name("   ");
        assert_eq!(profile.store_name, "Mi Tienda");
    }

    #[test]
    fn custom_colors_switch_theme_to_custom() {
        let mut profile = Profile::with_defaults(AccountId::random(), Utc::now());
        profile.set_custom_colors(BrandingColors {
            primary: "#FF0000".into(),
            secondary: "#00FF00".into(),
            background: "#FFFFFF".into(),
            text: "#000000".into(),
        });
        assert_eq!(profile.active_theme, "custom");
    }

    #[test]
    fn non_positive_price_is_rejected() {
        let mut profile = Profile::with_defaults(AccountId::random(), Utc::now());
        assert_eq!(profile.set_maintenance_price(0), Err(LedgerError::InvalidPrice));
        assert_eq!(
            profile.set_maintenance_price(-100),
            Err(LedgerError::InvalidPrice)
        );
        profile.set_maintenance_price(25_000).unwrap();
        assert_eq!(profile.maintenance_monthly_price_cop, 25_000);
    }

    #[test]
    fn payment_contacts_are_normalized() {
        let contacts =
            PaymentContacts::normalized(Some("+57 300 123-4567"), Some(""), Some("abc"));
        assert_eq!(contacts.whatsapp.as_deref(), Some("5730012345"));
        assert_eq!(contacts.nequi, None);
        assert_eq!(contacts.daviplata, None);
    }
}
