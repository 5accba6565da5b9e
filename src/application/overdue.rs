use super::aggregator::{CustomerAggregator, NameCollision, UnpaidInvoices};
use super::allocation::{overdue_records, payment_pool};
use super::normalizer::{DataErrors, normalize_contract};
use crate::domain::contract::{Payment, RawContract};
use crate::domain::money::Money;
use crate::domain::overdue::CustomerOverdueAggregate;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// Everything one computation run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverdueComputation {
    pub aggregates: Vec<CustomerOverdueAggregate>,
    #[serde(skip)]
    pub data_errors: DataErrors,
    pub collisions: Vec<NameCollision>,
}

/// Overdue rollups per customer as of `reference_date`.
pub fn compute_overdue_aggregates(
    contracts: &[RawContract],
    payments: &[Payment],
    reference_date: NaiveDate,
) -> Vec<CustomerOverdueAggregate> {
    compute_overdue(contracts, payments, &UnpaidInvoices::new(), reference_date).aggregates
}

/// Normalizes every contract, runs the allocation waterfall against its
/// payments, and folds the overdue remainders and `unpaid` invoices into
/// per-customer aggregates.
///
/// Payments referencing unknown contracts are ignored.
pub fn compute_overdue(
    contracts: &[RawContract],
    payments: &[Payment],
    unpaid: &UnpaidInvoices,
    reference_date: NaiveDate,
) -> OverdueComputation {
    let mut payments_by_contract: HashMap<&str, Vec<&Payment>> = HashMap::new();
    for payment in payments {
        payments_by_contract
            .entry(payment.contract_id.as_str())
            .or_default()
            .push(payment);
    }

    let mut data_errors = DataErrors::default();
    let mut aggregator = CustomerAggregator::new();
    for raw in contracts {
        let contract = normalize_contract(raw, &mut data_errors);
        let pool = match payments_by_contract.get(contract.id.as_str()) {
            Some(paid) => payment_pool(paid.iter().copied()),
            None => Some(Money::ZERO),
        };
        let Some(pool) = pool else {
            log::warn!("contract {}: payment total out of range, skipping", contract.id);
            data_errors.overflowed_pools += 1;
            continue;
        };
        for record in overdue_records(&contract, pool, reference_date) {
            aggregator.add_record(record);
        }
    }
    for (key, customer) in unpaid {
        aggregator.add_unpaid(key.clone(), &customer.customer_name, customer.invoices.clone());
    }

    let collisions = aggregator.possible_collisions();
    for collision in &collisions {
        log::warn!(
            "customer {} has no id and spans contracts {:?}; may merge distinct customers",
            collision.identity_key,
            collision.contract_ids
        );
    }
    if data_errors.total() > 0 {
        log::warn!(
            "{} malformed schedules, {} dropped installments, {} payment overflows",
            data_errors.malformed_schedules,
            data_errors.dropped_entries,
            data_errors.overflowed_pools
        );
    }

    let aggregates = aggregator.finish();
    log::info!(
        "{} contracts processed, {} customers overdue as of {}",
        contracts.len(),
        aggregates.len(),
        reference_date
    );

    OverdueComputation {
        aggregates,
        data_errors,
        collisions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::overdue::{IdentityKey, UnpaidInvoiceRecord};
    use crate::application::aggregator::CustomerInvoices;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn raw(id: &str, customer_id: Option<&str>, name: &str, schedule: &str) -> RawContract {
        RawContract {
            id: id.into(),
            customer_id: customer_id.map(String::from),
            customer_name: name.into(),
            schedule: Some(schedule.into()),
        }
    }

    fn payment(contract_id: &str, amount: rust_decimal::Decimal) -> Payment {
        Payment {
            contract_id: contract_id.into(),
            amount: Money::new(amount),
            paid_at: today(),
        }
    }

    #[test]
    fn test_two_contracts_same_customer() {
        let contracts = vec![
            raw("C1", Some("7"), "Ana", r#"[{"amount":100,"due_date":"2024-06-05"}]"#),
            raw("C2", Some("7"), "Ana", r#"[{"amount":50,"due_date":"2024-06-01"}]"#),
        ];
        let payments = vec![payment("C1", dec!(60)), payment("C2", dec!(30))];

        let aggregates = compute_overdue_aggregates(&contracts, &payments, today());

        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].total_overdue, Money::new(dec!(60)));
        assert_eq!(aggregates[0].overdue_count, 2);
        assert_eq!(aggregates[0].oldest_days_overdue, 14);
    }

    #[test]
    fn test_payments_stay_within_their_contract() {
        let contracts = vec![
            raw("C1", Some("1"), "Ana", r#"[{"amount":100,"due_date":"2024-06-05"}]"#),
            raw("C2", Some("2"), "Bruno", r#"[{"amount":100,"due_date":"2024-06-05"}]"#),
        ];
        let payments = vec![payment("C1", dec!(500)), payment("C9", dec!(500))];

        let aggregates = compute_overdue_aggregates(&contracts, &payments, today());

        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].identity_key, IdentityKey::Id("2".into()));
    }

    #[test]
    fn test_malformed_contract_is_skipped_and_counted() {
        let contracts = vec![
            raw("C1", Some("1"), "Ana", "garbage"),
            raw("C2", None, "Bruno", r#"[{"amount":10,"due_date":"2024-06-01"},{"amount":5}]"#),
        ];
        let computation = compute_overdue(&contracts, &[], &UnpaidInvoices::new(), today());

        assert_eq!(computation.aggregates.len(), 1);
        assert_eq!(computation.data_errors.malformed_schedules, 1);
        assert_eq!(computation.data_errors.dropped_entries, 1);
        assert!(computation.aggregates[0].identity_key.is_name_fallback());
    }

    #[test]
    fn test_out_of_range_payments_skip_only_that_contract() {
        let contracts = vec![
            raw("C1", Some("1"), "Ana", r#"[{"amount":100,"due_date":"2024-06-05"}]"#),
            raw("C2", Some("2"), "Bruno", r#"[{"amount":100,"due_date":"2024-06-05"}]"#),
        ];
        let payments = vec![
            payment("C1", rust_decimal::Decimal::MAX),
            payment("C1", rust_decimal::Decimal::MAX),
            payment("C2", dec!(40)),
        ];

        let computation = compute_overdue(&contracts, &payments, &UnpaidInvoices::new(), today());

        assert_eq!(computation.data_errors.overflowed_pools, 1);
        assert_eq!(computation.aggregates.len(), 1);
        assert_eq!(computation.aggregates[0].total_overdue, Money::new(dec!(60)));
    }

    #[test]
    fn test_unpaid_invoices_merge_into_aggregate() {
        let contracts = vec![raw(
            "C1",
            Some("7"),
            "Ana",
            r#"[{"amount":100,"due_date":"2024-06-05"}]"#,
        )];
        let mut unpaid = UnpaidInvoices::new();
        unpaid.insert(
            IdentityKey::Id("7".into()),
            CustomerInvoices {
                customer_name: "Ana".into(),
                invoices: vec![UnpaidInvoiceRecord {
                    contract_id: "C1".into(),
                    amount: Money::new(dec!(12.5)),
                    created_at: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                    days_overdue: 45,
                }],
            },
        );

        let computation = compute_overdue(&contracts, &[], &unpaid, today());
        assert_eq!(computation.aggregates.len(), 1);
        assert_eq!(
            computation.aggregates[0].total_overdue,
            Money::new(dec!(112.5))
        );
    }

    #[test]
    fn test_deterministic_output() {
        let contracts: Vec<_> = (0..20)
            .map(|n| {
                raw(
                    &format!("C{n}"),
                    Some(&(n % 5).to_string()),
                    "X",
                    r#"[{"amount":10,"due_date":"2024-06-01"},{"amount":10,"due_date":"2024-06-10"}]"#,
                )
            })
            .collect();
        let payments: Vec<_> = (0..20).map(|n| payment(&format!("C{n}"), dec!(7))).collect();

        let first = compute_overdue_aggregates(&contracts, &payments, today());
        let second = compute_overdue_aggregates(&contracts, &payments, today());
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
    }
}
