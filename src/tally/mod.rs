//! Protocol adapter for the accounting engine's XML/HTTP interface.
//!
//! The engine answers collection-export requests posted as `text/xml` to
//! its root path. This module builds those requests ([`TableKind`]), sends
//! them ([`TallyClient`]) and parses what comes back ([`xml`]).

mod client;
mod tables;
mod xml;

pub use client::TallyClient;
pub use tables::TableKind;
pub use xml::{count_records, parse_companies, Company};

use thiserror::Error;

/// Errors from talking to the accounting engine.
#[derive(Error, Debug)]
pub enum TallyError {
    #[error("Engine connection timed out")]
    Timeout,

    #[error("Could not connect to the engine: {0}")]
    Connect(String),

    #[error("Engine returned HTTP status {status}")]
    Http { status: u16 },

    #[error("Malformed engine response: {0}")]
    Protocol(String),

    #[error("Unknown table '{0}'")]
    UnknownTable(String),
}
