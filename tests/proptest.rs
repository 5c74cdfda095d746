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

//! Property-based invariants over arbitrary posting sequences and inputs.

use chrono::{Duration, TimeZone, Utc};
use fiado_ledger::billing::evaluate_status;
use fiado_ledger::messages::{format_cop, format_template};
use fiado_ledger::{AccountId, InvoiceStatus, Ledger, MemoryBackend};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum Op {
    Debt(i64),
    Payment(i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..=500_000).prop_map(Op::Debt),
        (1i64..=500_000).prop_map(Op::Payment),
    ]
}

proptest! {
    /// The balance always equals the clamped fold of the posting history and
    /// never goes negative at any intermediate step.
    #[test]
    fn balance_is_the_clamped_fold_of_postings(ops in prop::collection::vec(op_strategy(), 0..64)) {
        let ledger = Ledger::new(AccountId::random(), Arc::new(MemoryBackend::new()));
        let ana = ledger.add_customer("Ana", "3001234567").unwrap();

        let mut model: i64 = 0;
        for op in ops {
            match op {
                Op::Debt(amount) => {
                    ledger.add_debt(ana.id, amount, "").unwrap();
                    model += amount;
                }
                Op::Payment(amount) => {
                    ledger.add_payment(ana.id, amount, "").unwrap();
                    model = (model - amount).max(0);
                }
            }
            let balance = ledger.get_customer(ana.id).unwrap().total_debt;
            prop_assert_eq!(balance, model);
            prop_assert!(balance >= 0);
        }
        prop_assert_eq!(ledger.total_debt(), model);
    }

    /// The balance never exceeds the sum of debts regardless of payments.
    #[test]
    fn balance_bounded_by_total_debts(ops in prop::collection::vec(op_strategy(), 0..64)) {
        let ledger = Ledger::new(AccountId::random(), Arc::new(MemoryBackend::new()));
        let ana = ledger.add_customer("Ana", "3001234567").unwrap();

        let mut debts: i64 = 0;
        for op in ops {
            match op {
                Op::Debt(amount) => {
                    ledger.add_debt(ana.id, amount, "").unwrap();
                    debts += amount;
                }
                Op::Payment(amount) => {
                    ledger.add_payment(ana.id, amount, "").unwrap();
                }
            }
        }
        prop_assert!(ledger.get_customer(ana.id).unwrap().total_debt <= debts);
    }

    /// Substitution is total: it never panics and placeholder-free output is
    /// a fixed point.
    #[test]
    fn template_substitution_is_total_and_idempotent(
        template in ".{0,200}",
        key in "[a-z_]{1,10}",
        value in "[^{}]{0,40}",
    ) {
        let context = HashMap::from([(key, value)]);
        let once = format_template(&template, &context);
        let twice = format_template(&once, &HashMap::new());
        // Values contain no braces, so a second pass finds nothing to expand
        // beyond literal braces that were already passed through.
        if !once.contains('{') {
            prop_assert_eq!(once, twice);
        }
    }

    /// COP rendering keeps every digit and only inserts separators.
    #[test]
    fn cop_rendering_preserves_digits(amount in 0i64..=10_000_000_000) {
        let rendered = format_cop(amount);
        let digits: String = rendered.chars().filter(|c| c.is_ascii_digit()).collect();
        prop_assert_eq!(digits, amount.to_string());
        prop_assert!(rendered.starts_with("$ "));
    }

    /// Unpaid invoice status only moves forward as time advances.
    #[test]
    fn invoice_status_is_monotonic_in_now(offset_a in 0i64..120, offset_b in 0i64..120) {
        let due = Utc.with_ymd_and_hms(2025, 6, 5, 0, 0, 0).unwrap();
        let grace = due + Duration::days(10);
        let base = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();

        let (early, late) = if offset_a <= offset_b {
            (offset_a, offset_b)
        } else {
            (offset_b, offset_a)
        };
        let rank = |status: InvoiceStatus| match status {
            InvoiceStatus::Open => 0,
            InvoiceStatus::Overdue => 1,
            InvoiceStatus::Inactive => 2,
            InvoiceStatus::Paid => 3,
        };

        let at_early = evaluate_status(base + Duration::days(early), due, grace, None);
        let at_late = evaluate_status(base + Duration::days(late), due, grace, None);
        prop_assert!(rank(at_early) <= rank(at_late));
    }
}
