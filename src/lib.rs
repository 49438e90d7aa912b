//! Agent that exports accounting data from a local Tally engine and
//! forwards it to the hosted backend.
//!
//! The binary wires four pieces together: the [`tally`] client speaks the
//! engine's XML collection protocol, the [`backend`] client talks to the
//! ingest API, [`auth`] maintains the OTP session, and the [`worker`] runs
//! the periodic export cycle.

pub mod auth;
pub mod backend;
pub mod commands;
pub mod config;
pub mod logging;
pub mod tally;
pub mod worker;
