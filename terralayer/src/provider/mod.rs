//! Network transport for elevation tiles.
//!
//! The fetcher only needs "GET this URL and give me the body". This module
//! provides that as the [`AsyncHttpClient`] trait so tests can substitute a
//! mock transport, plus the reqwest-backed implementation used in production.

mod http;
mod types;

pub use http::{AsyncHttpClient, AsyncReqwestClient};
pub use types::ProviderError;

#[cfg(test)]
pub use http::tests::{MockAsyncHttpClient, MockResponse};
