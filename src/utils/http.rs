//! HTTP client construction
//!
//! Blocking `reqwest` clients shared by the fullnode and custody clients.
//! The request timeout is the only timeout applied to network round trips.

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{CustodyError, CustodyResult};

const USER_AGENT: &str = concat!("sui-custody/", env!("CARGO_PKG_VERSION"));

/// Longest response body echoed back in error details
const MAX_ERROR_BODY: usize = 512;

pub fn build_client(timeout: Duration) -> CustodyResult<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(5)
        .tcp_nodelay(true)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| CustodyError::network(format!("Failed to create HTTP client: {}", e)))
}

/// Decode a JSON body. Non-2xx responses become `Network` errors carrying
/// the status and (truncated) body.
pub fn read_json<T: DeserializeOwned>(response: Response) -> CustodyResult<T> {
    let status = response.status();
    let body = response.text()?;

    if !status.is_success() {
        return Err(CustodyError::network(format!("HTTP {}", status.as_u16())).with_details(truncate(&body)));
    }

    serde_json::from_str(&body)
        .map_err(|e| CustodyError::parse_error("Response is not the expected JSON").with_details(e.to_string()))
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
