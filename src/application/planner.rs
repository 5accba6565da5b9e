use super::composer::MessageComposer;
use crate::domain::dispatch::DispatchTarget;
use crate::domain::overdue::{CustomerOverdueAggregate, IdentityKey};
use crate::domain::ports::{CustomerDirectory, UnpaidInvoiceSource};
use std::collections::HashSet;

/// Targets ready for dispatch plus the customers that could not be reached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetPlan {
    pub targets: Vec<DispatchTarget>,
    /// Customers without a phone in the directory. Never dispatched to.
    pub unresolved: Vec<IdentityKey>,
}

/// Turns aggregates into dispatch targets: resolves phones and composes
/// messages.
pub struct NotificationPlanner<'a> {
    directory: &'a dyn CustomerDirectory,
    composer: &'a MessageComposer,
}

impl<'a> NotificationPlanner<'a> {
    pub fn new(directory: &'a dyn CustomerDirectory, composer: &'a MessageComposer) -> Self {
        Self {
            directory,
            composer,
        }
    }

    /// One target per customer with a known phone.
    ///
    /// Directory failures are treated like a missing phone for that customer.
    pub async fn customer_targets(&self, aggregates: &[CustomerOverdueAggregate]) -> TargetPlan {
        let mut plan = TargetPlan::default();
        for aggregate in aggregates {
            let key = &aggregate.identity_key;
            let phone = match self.directory.resolve_phone(key).await {
                Ok(phone) => phone.filter(|p| !p.trim().is_empty()),
                Err(e) => {
                    log::warn!("customer {key}: directory lookup failed: {e}");
                    None
                }
            };
            match phone {
                Some(phone) => plan.targets.push(DispatchTarget::new(
                    key.to_string(),
                    Some(phone),
                    aggregate.customer_name.clone(),
                    self.composer.customer_message(aggregate),
                )),
                None => {
                    log::warn!(
                        "customer {key} ({}) has no phone, not notified",
                        aggregate.customer_name
                    );
                    plan.unresolved.push(key.clone());
                }
            }
        }
        plan
    }
}

/// The management report, addressed to every phone in `recipients`.
///
/// Repeated or blank phones are dropped so every target id is unique.
pub fn management_targets(
    composer: &MessageComposer,
    aggregates: &[CustomerOverdueAggregate],
    recipients: &[String],
) -> TargetPlan {
    let report = composer.management_report(aggregates);
    let mut seen = HashSet::new();
    let targets = recipients
        .iter()
        .map(|phone| phone.trim())
        .filter(|phone| !phone.is_empty() && seen.insert(*phone))
        .map(|phone| {
            DispatchTarget::new(
                format!("manager:{phone}"),
                Some(phone.to_string()),
                "Management",
                report.clone(),
            )
        })
        .collect();
    TargetPlan {
        targets,
        unresolved: Vec::new(),
    }
}

/// Adds invoices from `source` to each existing aggregate.
///
/// The source is queried per known customer, so a customer with unpaid
/// invoices but no overdue installment is not discovered here. Build the
/// `UnpaidInvoices` map up front and pass it to `compute_overdue` when such
/// customers must get their own aggregate.
///
/// Returns how many customers could not be looked up; their aggregates are
/// left as they were.
pub async fn merge_unpaid_from_source(
    source: &dyn UnpaidInvoiceSource,
    aggregates: &mut [CustomerOverdueAggregate],
) -> usize {
    let mut failures = 0;
    for aggregate in aggregates.iter_mut() {
        match source.unpaid_for(&aggregate.identity_key).await {
            Ok(invoices) => {
                for invoice in invoices {
                    aggregate.add_unpaid_invoice(invoice);
                }
            }
            Err(e) => {
                log::warn!(
                    "customer {}: unpaid invoice lookup failed: {e}",
                    aggregate.identity_key
                );
                failures += 1;
            }
        }
    }
    failures
}
