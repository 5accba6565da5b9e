use crate::domain::money::Money;
use crate::domain::overdue::{
    CustomerOverdueAggregate, IdentityKey, OverdueInstallmentRecord, UnpaidInvoiceRecord,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Unpaid invoices of one customer, as supplied by the invoice source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomerInvoices {
    pub customer_name: String,
    pub invoices: Vec<UnpaidInvoiceRecord>,
}

pub type UnpaidInvoices = BTreeMap<IdentityKey, CustomerInvoices>;

/// A name-fallback key that merged records from more than one contract.
///
/// Could be one customer holding several contracts, or several customers
/// sharing a display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameCollision {
    pub identity_key: IdentityKey,
    pub contract_ids: Vec<String>,
}

/// Folds overdue records into per-customer rollups.
///
/// Aggregates come out in first-seen order.
#[derive(Debug, Default)]
pub struct CustomerAggregator {
    aggregates: Vec<CustomerOverdueAggregate>,
    index: HashMap<IdentityKey, usize>,
    fallback_contracts: BTreeMap<IdentityKey, BTreeSet<String>>,
}

impl CustomerAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, key: IdentityKey, customer_name: &str) -> &mut CustomerOverdueAggregate {
        let position = match self.index.get(&key) {
            Some(&position) => position,
            None => {
                self.aggregates
                    .push(CustomerOverdueAggregate::new(key.clone(), customer_name));
                self.index.insert(key, self.aggregates.len() - 1);
                self.aggregates.len() - 1
            }
        };
        &mut self.aggregates[position]
    }

    pub fn add_record(&mut self, record: OverdueInstallmentRecord) {
        let key = record.identity_key();
        if key.is_name_fallback() {
            self.fallback_contracts
                .entry(key.clone())
                .or_default()
                .insert(record.contract_id.clone());
        }
        let name = record.customer_name.clone();
        self.entry(key, &name).add_installment(record);
    }

    /// Merges externally supplied unpaid invoices into the customer's rollup,
    /// creating it when the customer has no overdue installments.
    pub fn add_unpaid(
        &mut self,
        key: IdentityKey,
        customer_name: &str,
        invoices: impl IntoIterator<Item = UnpaidInvoiceRecord>,
    ) {
        let mut invoices = invoices.into_iter().peekable();
        if invoices.peek().is_none() {
            return;
        }
        let aggregate = self.entry(key, customer_name);
        for invoice in invoices {
            aggregate.add_unpaid_invoice(invoice);
        }
    }

    pub fn possible_collisions(&self) -> Vec<NameCollision> {
        self.fallback_contracts
            .iter()
            .filter(|(_, contracts)| contracts.len() > 1)
            .map(|(key, contracts)| NameCollision {
                identity_key: key.clone(),
                contract_ids: contracts.iter().cloned().collect(),
            })
            .collect()
    }

    pub fn finish(self) -> Vec<CustomerOverdueAggregate> {
        self.aggregates
    }
}

/// One-shot aggregation of overdue records plus unpaid invoices.
pub fn aggregate_customers<I>(records: I, unpaid: &UnpaidInvoices) -> Vec<CustomerOverdueAggregate>
where
    I: IntoIterator<Item = OverdueInstallmentRecord>,
{
    let mut aggregator = CustomerAggregator::new();
    for record in records {
        aggregator.add_record(record);
    }
    for (key, customer) in unpaid {
        aggregator.add_unpaid(key.clone(), &customer.customer_name, customer.invoices.clone());
    }
    aggregator.finish()
}

/// Presentation order: largest debt first, then by name.
pub fn sort_by_total_desc(aggregates: &mut [CustomerOverdueAggregate]) {
    aggregates.sort_by(|a, b| {
        b.total_overdue
            .cmp(&a.total_overdue)
            .then_with(|| a.customer_name.cmp(&b.customer_name))
    });
}

pub fn grand_total(aggregates: &[CustomerOverdueAggregate]) -> Money {
    aggregates.iter().map(|a| a.total_overdue).sum()
}
