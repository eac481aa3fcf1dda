//! Connection settings for [`FcpClient`](crate::FcpClient).

use std::time::Duration;

use crate::constants::{
    DEFAULT_CLIENT_NAME, DEFAULT_CONNECT_TIMEOUT, DEFAULT_FCP_ADDRESS, DEFAULT_MAX_RETRIES,
};

/// Configuration for an [`FcpClient`](crate::FcpClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FcpConfig {
    /// Node FCP endpoint as `host:port`.
    pub address: String,
    /// Name announced in `ClientHello`. The node rejects duplicates per connection.
    pub client_name: String,
    /// Timeout for the TCP connect and for the `NodeHello` reply.
    pub connect_timeout: Duration,
    /// `MaxRetries` sent with each request.
    pub max_retries: i32,
}

impl FcpConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }
}

impl Default for FcpConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_FCP_ADDRESS.to_string(),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}
