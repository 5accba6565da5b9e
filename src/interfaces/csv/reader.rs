use crate::application::aggregator::{CustomerInvoices, UnpaidInvoices};
use crate::domain::contract::{Payment, RawContract};
use crate::domain::money::Money;
use crate::domain::overdue::{IdentityKey, UnpaidInvoiceRecord};
use crate::error::{ArrearsError, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Reads typed records from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// yielding one `Result` per row so a bad row never stops the stream.
pub struct RecordReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RecordReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes rows.
    pub fn records<T: DeserializeOwned>(self) -> impl Iterator<Item = Result<T>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(ArrearsError::from))
    }

    /// Collects all valid rows, logging and counting the rest.
    pub fn collect_valid<T: DeserializeOwned>(self, what: &str) -> (Vec<T>, usize) {
        let mut rows = Vec::new();
        let mut skipped = 0;
        for row in self.records() {
            match row {
                Ok(row) => rows.push(row),
                Err(e) => {
                    log::warn!("skipping {what} row: {e}");
                    skipped += 1;
                }
            }
        }
        (rows, skipped)
    }
}

fn open(path: &Path) -> Result<RecordReader<File>> {
    Ok(RecordReader::new(File::open(path)?))
}

/// `id,customer_id,customer_name,schedule` with the schedule as JSON text.
pub fn read_contracts(path: &Path) -> Result<Vec<RawContract>> {
    Ok(open(path)?.collect_valid("contract").0)
}

/// `contract_id,amount,paid_at`.
pub fn read_payments(path: &Path) -> Result<Vec<Payment>> {
    Ok(open(path)?.collect_valid("payment").0)
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct DirectoryRow {
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub phone: String,
}

impl DirectoryRow {
    pub fn into_entry(self) -> (IdentityKey, String) {
        (
            IdentityKey::resolve(self.customer_id.as_deref(), &self.customer_name),
            self.phone,
        )
    }
}

/// `customer_id,customer_name,phone`, keyed the same way as overdue records.
pub fn read_directory(path: &Path) -> Result<Vec<(IdentityKey, String)>> {
    let (rows, _) = open(path)?.collect_valid::<DirectoryRow>("directory");
    Ok(rows.into_iter().map(DirectoryRow::into_entry).collect())
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct InvoiceRow {
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub contract_id: String,
    pub amount: Money,
    pub created_at: NaiveDate,
    pub days_overdue: i64,
}

/// Groups invoice rows by customer identity.
pub fn group_invoices(rows: impl IntoIterator<Item = InvoiceRow>) -> UnpaidInvoices {
    let mut unpaid = UnpaidInvoices::new();
    for row in rows {
        let key = IdentityKey::resolve(row.customer_id.as_deref(), &row.customer_name);
        let customer = unpaid.entry(key).or_insert_with(|| CustomerInvoices {
            customer_name: row.customer_name.clone(),
            invoices: Vec::new(),
        });
        customer.invoices.push(UnpaidInvoiceRecord {
            contract_id: row.contract_id,
            amount: row.amount,
            created_at: row.created_at,
            days_overdue: row.days_overdue,
        });
    }
    unpaid
}

/// `customer_id,customer_name,contract_id,amount,created_at,days_overdue`.
pub fn read_invoices(path: &Path) -> Result<UnpaidInvoices> {
    let (rows, _) = open(path)?.collect_valid::<InvoiceRow>("invoice");
    Ok(group_invoices(rows))
}
