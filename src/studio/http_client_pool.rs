//! Shared HTTP clients, one per base URL.
//!
//! A generate-all run fires one request per style at the same endpoint. Reusing a single
//! pooled `reqwest::Client` per base URL lets those requests share DNS lookups, TLS sessions
//! and keep-alive connections instead of each building its own.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::time::Duration;

static CLIENT_POOL: Lazy<DashMap<String, reqwest::Client>> = Lazy::new(DashMap::new);

/// Return the pooled client for `base_url`, creating it on first use.
///
/// The returned `reqwest::Client` is a cheap handle onto the shared connection pool.
pub fn get_or_create_client(base_url: &str) -> reqwest::Client {
    CLIENT_POOL
        .entry(base_url.to_string())
        .or_insert_with(create_pooled_client)
        .clone()
}

/// Idle connections are kept for 90 seconds with TCP keepalive; connects time out after 30.
///
/// Per-request timeouts are applied by the caller, since image generation can take far
/// longer than a connect.
fn create_pooled_client() -> reqwest::Client {
    match reqwest::ClientBuilder::new()
        .pool_max_idle_per_host(16)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .connect_timeout(Duration::from_secs(30))
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            log::warn!(
                "Failed to build pooled HTTP client ({}), using reqwest defaults",
                err
            );
            reqwest::Client::new()
        }
    }
}
