//! Airtable REST Client
//!
//! A small client for listing records from an Airtable base, with
//! pagination and moka async caching of list results.

mod client;
mod error;
mod types;

pub use client::AirtableClient;
pub use error::{AirtableError, Result};
pub use types::AirtableRecord;
