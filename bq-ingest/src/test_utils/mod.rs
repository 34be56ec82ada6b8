//! Utilities for testing code built on the BigQuery client without network access.
//!
//! [`fake_service::FakeTableService`] replays scripted responses and records every
//! request it receives, [`responses`] builds the server responses tests script.

pub mod fake_service;
pub mod responses;
