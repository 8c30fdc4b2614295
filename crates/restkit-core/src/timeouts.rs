//! Timeout settings read when a transport is built

use crate::error::{ClientError, ClientResult};
use reqwest::ClientBuilder;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connect, read and write timeouts for transports built from now on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutSettings {
    pub connect: Duration,
    pub read: Duration,
    pub write: Duration,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self::from_secs(DEFAULT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS)
    }
}

impl TimeoutSettings {
    pub fn from_secs(connect: u64, read: u64, write: u64) -> Self {
        Self {
            connect: Duration::from_secs(connect),
            read: Duration::from_secs(read),
            write: Duration::from_secs(write),
        }
    }

    /// Apply the connect and read phases to a reqwest builder
    ///
    /// reqwest has no write-phase timeout; see [`TimeoutSettings::request_deadline`].
    pub fn apply_to_client_builder(&self, builder: ClientBuilder) -> ClientBuilder {
        builder.connect_timeout(self.connect).read_timeout(self.read)
    }

    /// Per-request deadline covering the write phase of requests that carry a body
    pub fn request_deadline(&self, has_body: bool) -> Option<Duration> {
        if has_body {
            Some(self.write + self.read)
        } else {
            None
        }
    }

    pub fn validate(&self) -> ClientResult<()> {
        for (name, value) in [
            ("connect", self.connect),
            ("read", self.read),
            ("write", self.write),
        ] {
            if value.is_zero() {
                return Err(ClientError::InvalidConfig(format!(
                    "{} timeout must be greater than 0",
                    name
                )));
            }
        }
        Ok(())
    }
}
