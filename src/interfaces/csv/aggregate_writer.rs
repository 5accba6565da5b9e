use crate::domain::overdue::CustomerOverdueAggregate;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct AggregateRow<'a> {
    customer: String,
    customer_name: &'a str,
    total_overdue: String,
    overdue_count: usize,
    oldest_days_overdue: i64,
    unpaid_invoices: usize,
}

/// Writes one CSV row per customer aggregate.
pub struct AggregateWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AggregateWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_aggregates<'a, I>(&mut self, aggregates: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a CustomerOverdueAggregate>,
    {
        for aggregate in aggregates {
            self.writer.serialize(AggregateRow {
                customer: aggregate.identity_key.to_string(),
                customer_name: &aggregate.customer_name,
                total_overdue: aggregate.total_overdue.to_string(),
                overdue_count: aggregate.overdue_count,
                oldest_days_overdue: aggregate.oldest_days_overdue,
                unpaid_invoices: aggregate.unpaid_invoices.len(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
