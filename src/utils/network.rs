//! Network utilities and helpers

use anyhow::Result;
use reqwest::Client;
use std::time::Duration;

/// Get user agent string
pub fn get_user_agent() -> &'static str {
    "MediaFetcherPro/1.0.0 (Production)"
}

/// Build the shared HTTP client used by providers.
///
/// The timeout set here bounds the time to response headers; body transfer
/// timeouts are enforced per read by callers.
pub fn build_http_client(user_agent: &str, connect_timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .user_agent(user_agent.to_string())
        .connect_timeout(connect_timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()?;
    Ok(client)
}
