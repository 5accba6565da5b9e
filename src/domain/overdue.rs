use super::money::Money;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Groups debt by real-world customer.
///
/// `NameFallback` is used when a contract carries no customer id. Two distinct
/// customers sharing a display name collapse onto the same fallback key, so
/// consumers can tell the weaker identity apart and warn about it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum IdentityKey {
    Id(String),
    NameFallback(String),
}

impl IdentityKey {
    /// Builds the key for a customer, preferring a non-blank id.
    pub fn resolve(customer_id: Option<&str>, customer_name: &str) -> Self {
        match customer_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => IdentityKey::Id(id.to_string()),
            None => IdentityKey::NameFallback(normalize_name(customer_name)),
        }
    }

    pub fn is_name_fallback(&self) -> bool {
        matches!(self, IdentityKey::NameFallback(_))
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Id(id) => write!(f, "id:{id}"),
            IdentityKey::NameFallback(name) => write!(f, "name:{name}"),
        }
    }
}

/// Case-folds and collapses whitespace so "Ana  Silva" and "ana silva" match.
fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverdueInstallmentRecord {
    pub contract_id: String,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub overdue_amount: Money,
    pub due_date: NaiveDate,
    pub days_overdue: i64,
    pub description: String,
}

impl OverdueInstallmentRecord {
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::resolve(self.customer_id.as_deref(), &self.customer_name)
    }
}

/// Outstanding non-installment charge supplied by an external source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnpaidInvoiceRecord {
    pub contract_id: String,
    pub amount: Money,
    pub created_at: NaiveDate,
    pub days_overdue: i64,
}

/// Per-customer rollup of everything overdue across their contracts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerOverdueAggregate {
    pub identity_key: IdentityKey,
    pub customer_name: String,
    pub total_overdue: Money,
    pub overdue_count: usize,
    pub oldest_days_overdue: i64,
    pub installments: Vec<OverdueInstallmentRecord>,
    pub unpaid_invoices: Vec<UnpaidInvoiceRecord>,
}

impl CustomerOverdueAggregate {
    pub fn new(identity_key: IdentityKey, customer_name: impl Into<String>) -> Self {
        Self {
            identity_key,
            customer_name: customer_name.into(),
            total_overdue: Money::ZERO,
            overdue_count: 0,
            oldest_days_overdue: 0,
            installments: Vec::new(),
            unpaid_invoices: Vec::new(),
        }
    }

    pub fn add_installment(&mut self, record: OverdueInstallmentRecord) {
        self.total_overdue += record.overdue_amount;
        self.overdue_count += 1;
        self.oldest_days_overdue = self.oldest_days_overdue.max(record.days_overdue);
        self.installments.push(record);
    }

    /// Unpaid invoices only add to the total; they are not installments and
    /// do not count towards `overdue_count` or `oldest_days_overdue`.
    pub fn add_unpaid_invoice(&mut self, invoice: UnpaidInvoiceRecord) {
        self.total_overdue += invoice.amount;
        self.unpaid_invoices.push(invoice);
    }
}
