#![warn(missing_docs)]
//! A resumable extractor of Fuel `LOG_DATA` receipts: it streams blocks from
//! a data portal, keeps the log records whose discriminator is configured and
//! stores them together with a progress marker.

pub mod cmd;
pub mod config;
pub mod engine;
pub mod http_client;
pub mod models;
pub mod persistence;
pub mod providers;
pub mod supervisor;
pub mod test_helpers;
