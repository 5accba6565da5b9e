pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;

pub use application::composer::{compose_customer_message, compose_management_report};
pub use application::dispatch::{CancellationToken, DispatchOptions, dispatch};
pub use application::overdue::{compute_overdue, compute_overdue_aggregates};
