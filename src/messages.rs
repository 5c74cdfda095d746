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

//! Outbound message formatting: template substitution, currency rendering,
//! and WhatsApp deep links.
//!
//! The formatter is a pure collaborator: callers assemble the context map
//! from their entities; nothing here looks data up.

use crate::customer::Customer;
use crate::profile::Profile;
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::collections::HashMap;

/// Colombian country code used for `wa.me` links.
pub const DEFAULT_COUNTRY_CODE: &str = "57";

/// Characters escaped in a `?text=` query value. Mirrors JavaScript's
/// `encodeURIComponent` unreserved set.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Substitutes `{key}` placeholders from the context map.
///
/// Unknown keys substitute to the empty string; placeholder-free text passes
/// through unchanged, so the function is idempotent and never fails. Braces
/// that do not wrap a word-character key are emitted literally.
pub fn format_template(template: &str, context: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if close > 0 && after[..close].chars().all(is_word_char) => {
                let key = &after[..close];
                if let Some(value) = context.get(key) {
                    out.push_str(value);
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Percent-encodes a message for use as a URL query value.
pub fn encode_message(message: &str) -> String {
    utf8_percent_encode(message, QUERY_VALUE).to_string()
}

/// Builds a `wa.me` deep link opening a chat with the message pre-filled.
pub fn whatsapp_url(country_code: &str, phone: &str, message: &str) -> String {
    format!(
        "https://wa.me/{country_code}{phone}?text={}",
        encode_message(message)
    )
}

/// Formats integer COP pesos the es-CO way: `$ 45.000`, no decimals.
pub fn format_cop(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if amount < 0 {
        format!("-$ {grouped}")
    } else {
        format!("$ {grouped}")
    }
}

/// Context for the debt-reminder template.
pub fn reminder_context(profile: &Profile, customer: &Customer) -> HashMap<String, String> {
    let first_name = customer
        .name
        .split_whitespace()
        .next()
        .unwrap_or(&customer.name);
    let contacts = &profile.payment_contacts;
    HashMap::from([
        ("customer_first_name".to_owned(), first_name.to_owned()),
        ("customer_name".to_owned(), customer.name.clone()),
        ("amount".to_owned(), format_cop(customer.total_debt)),
        ("nequi".to_owned(), contacts.nequi.clone().unwrap_or_default()),
        (
            "daviplata".to_owned(),
            contacts.daviplata.clone().unwrap_or_default(),
        ),
        (
            "whatsapp".to_owned(),
            contacts.whatsapp.clone().unwrap_or_default(),
        ),
        ("store_name".to_owned(), profile.store_name.clone()),
    ])
}

/// Context for the payment-receipt template.
pub fn receipt_context(
    profile: &Profile,
    customer: &Customer,
    payment: &Transaction,
    remaining: i64,
) -> HashMap<String, String> {
    let mut context = reminder_context(profile, customer);
    context.insert("transaction_id".to_owned(), payment.id.to_string());
    context.insert("amount".to_owned(), format_cop(payment.amount));
    context.insert("date".to_owned(), format_date(payment.date));
    context.insert("remaining".to_owned(), format_cop(remaining));
    context
}

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%d/%m/%Y %H:%M").to_string()
}

/// Renders the reminder for a customer and wraps it in a `wa.me` link to
/// their phone.
pub fn reminder_url(profile: &Profile, customer: &Customer) -> String {
    let message = format_template(&profile.templates.reminder, &reminder_context(profile, customer));
    whatsapp_url(DEFAULT_COUNTRY_CODE, &customer.phone, &message)
}
