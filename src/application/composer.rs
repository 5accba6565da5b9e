use super::aggregator::grand_total;
use crate::domain::money::Money;
use crate::domain::overdue::CustomerOverdueAggregate;
use chrono::NaiveDate;
use std::fmt::Write;

pub const DEFAULT_REPORT_LIMIT: usize = 20;
pub const DEFAULT_CURRENCY_SYMBOL: &str = "$";

/// Renders aggregates as plain text. Pure; no I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageComposer {
    pub currency_symbol: String,
    /// Maximum entries listed in the management report.
    pub report_limit: usize,
}

impl Default for MessageComposer {
    fn default() -> Self {
        Self {
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
            report_limit: DEFAULT_REPORT_LIMIT,
        }
    }
}

impl MessageComposer {
    pub fn new(currency_symbol: impl Into<String>, report_limit: usize) -> Self {
        Self {
            currency_symbol: currency_symbol.into(),
            report_limit,
        }
    }

    fn money(&self, amount: Money) -> String {
        format!("{} {}", self.currency_symbol, amount)
    }

    /// Message addressed to the customer, listing what they owe per contract.
    pub fn customer_message(&self, aggregate: &CustomerOverdueAggregate) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Hello, {}.", aggregate.customer_name);

        if !aggregate.installments.is_empty() {
            let _ = writeln!(out, "We have not yet received the following installments:");
            let mut contracts: Vec<&str> = Vec::new();
            for record in &aggregate.installments {
                if !contracts.contains(&record.contract_id.as_str()) {
                    contracts.push(&record.contract_id);
                }
            }
            for contract_id in contracts {
                let _ = writeln!(out);
                let _ = writeln!(out, "Contract {contract_id}");
                for record in aggregate
                    .installments
                    .iter()
                    .filter(|r| r.contract_id == contract_id)
                {
                    let label = if record.description.is_empty() {
                        "Installment"
                    } else {
                        record.description.as_str()
                    };
                    let _ = writeln!(
                        out,
                        "  - {label}: {}, due {} ({})",
                        self.money(record.overdue_amount),
                        format_date(record.due_date),
                        days_label(record.days_overdue)
                    );
                }
            }
        }

        if !aggregate.unpaid_invoices.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Unpaid invoices");
            for invoice in &aggregate.unpaid_invoices {
                let _ = writeln!(
                    out,
                    "  - Contract {}: {}, issued {} ({})",
                    invoice.contract_id,
                    self.money(invoice.amount),
                    format_date(invoice.created_at),
                    days_label(invoice.days_overdue)
                );
            }
        }

        let _ = writeln!(out);
        let _ = write!(out, "Total overdue: {}", self.money(aggregate.total_overdue));
        out
    }

    /// Digest for management: first `report_limit` customers in input order,
    /// grand total over all of them.
    pub fn management_report(&self, aggregates: &[CustomerOverdueAggregate]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Overdue customers: {}", aggregates.len());

        for (position, aggregate) in aggregates.iter().take(self.report_limit).enumerate() {
            let _ = writeln!(
                out,
                "{}. {}: {}, oldest {}, {} installment{}",
                position + 1,
                aggregate.customer_name,
                self.money(aggregate.total_overdue),
                days_label(aggregate.oldest_days_overdue),
                aggregate.overdue_count,
                if aggregate.overdue_count == 1 { "" } else { "s" }
            );
        }

        let omitted = aggregates.len().saturating_sub(self.report_limit);
        if omitted > 0 {
            let _ = writeln!(out, "... and {omitted} more not listed");
        }
        let _ = write!(out, "Grand total: {}", self.money(grand_total(aggregates)));
        out
    }
}

pub fn compose_customer_message(aggregate: &CustomerOverdueAggregate) -> String {
    MessageComposer::default().customer_message(aggregate)
}

pub fn compose_management_report(aggregates: &[CustomerOverdueAggregate]) -> String {
    MessageComposer::default().management_report(aggregates)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn days_label(days: i64) -> String {
    if days == 1 {
        "1 day overdue".to_string()
    } else {
        format!("{days} days overdue")
    }
}
