//! HTTP clients for talking to the data portal.

mod client;

pub use client::{create_base_http_client, create_retryable_http_client};
