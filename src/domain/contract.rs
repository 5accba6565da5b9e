use super::money::Money;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A contract as supplied by the record source, schedule still encoded.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct RawContract {
    pub id: String,
    pub customer_id: Option<String>,
    pub customer_name: String,
    /// Encoded installment schedule. Absent when the contract has none.
    pub schedule: Option<String>,
}

/// One scheduled payment of a contract.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct Installment {
    pub amount: Money,
    pub due_date: NaiveDate,
    pub description: String,
}

/// A contract with its schedule decoded.
#[derive(Debug, PartialEq, Clone)]
pub struct Contract {
    pub id: String,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub installments: Vec<Installment>,
}

impl Contract {
    /// Customer id with blank values treated as absent.
    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct Payment {
    pub contract_id: String,
    pub amount: Money,
    pub paid_at: NaiveDate,
}
