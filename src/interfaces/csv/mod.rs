//! CSV adapters for the record sources and for writing aggregates.

pub mod aggregate_writer;
pub mod reader;
