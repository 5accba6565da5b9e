use crate::domain::contract::{Contract, Installment, RawContract};
use crate::domain::money::Money;
use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};

const AMOUNT_KEYS: &[&str] = &["amount", "value"];
const DUE_DATE_KEYS: &[&str] = &["due_date", "dueDate", "due"];
const DESCRIPTION_KEYS: &[&str] = &["description", "desc"];

/// Data problems met while decoding schedules. Never fatal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DataErrors {
    /// Contracts whose schedule payload could not be decoded at all.
    pub malformed_schedules: usize,
    /// Individual entries dropped for lacking a usable due date.
    pub dropped_entries: usize,
    /// Contracts left out because their payments sum past the `Decimal` range.
    pub overflowed_pools: usize,
}

impl DataErrors {
    pub fn total(&self) -> usize {
        self.malformed_schedules + self.dropped_entries + self.overflowed_pools
    }
}

/// Decodes a contract's raw schedule into validated installments.
///
/// An absent or undecodable payload yields a contract with no installments.
/// The returned installments keep payload order; sorting is the allocation
/// engine's job.
pub fn normalize_contract(raw: &RawContract, errors: &mut DataErrors) -> Contract {
    let installments = match raw.schedule.as_deref().map(str::trim) {
        None | Some("") => {
            log::debug!("contract {}: no schedule", raw.id);
            Vec::new()
        }
        Some(payload) => decode_schedule(&raw.id, payload, errors),
    };

    Contract {
        id: raw.id.clone(),
        customer_id: raw.customer_id.clone(),
        customer_name: raw.customer_name.trim().to_string(),
        installments,
    }
}

fn decode_schedule(contract_id: &str, payload: &str, errors: &mut DataErrors) -> Vec<Installment> {
    let entries = match serde_json::from_str::<Value>(payload) {
        Ok(Value::Array(entries)) => entries,
        Ok(Value::Object(mut obj)) => match obj.remove("installments") {
            Some(Value::Array(entries)) => entries,
            _ => {
                log::warn!(
                    "contract {contract_id}: schedule object has no installments array, skipping"
                );
                errors.malformed_schedules += 1;
                return Vec::new();
            }
        },
        Ok(_) => {
            log::warn!("contract {contract_id}: schedule is not a list, skipping");
            errors.malformed_schedules += 1;
            return Vec::new();
        }
        Err(e) => {
            log::warn!("contract {contract_id}: undecodable schedule ({e}), skipping");
            errors.malformed_schedules += 1;
            return Vec::new();
        }
    };

    let mut installments = Vec::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        match entry.as_object().and_then(decode_entry) {
            Some(installment) => installments.push(installment),
            None => {
                log::warn!(
                    "contract {contract_id}: entry #{position} has no usable due date, dropped"
                );
                errors.dropped_entries += 1;
            }
        }
    }
    installments
}

fn decode_entry(entry: &Map<String, Value>) -> Option<Installment> {
    let due_date = field(entry, DUE_DATE_KEYS)
        .and_then(Value::as_str)
        .and_then(parse_date)?;

    let amount = Money::coerce(field(entry, AMOUNT_KEYS));
    let description = match field(entry, DESCRIPTION_KEYS) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    Some(Installment {
        amount,
        due_date,
        description,
    })
}

fn field<'a>(entry: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| entry.get(*key))
        .filter(|v| !v.is_null())
}

/// Accepts `YYYY-MM-DD`, `DD/MM/YYYY` or an RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}
