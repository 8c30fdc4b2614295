//! Interceptor chain run by every transport call

use crate::error::{ClientError, ClientResult};
use crate::url_builder::UrlBuilder;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Request, Response};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::Debug;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A step wrapped around the actual network exchange
#[async_trait]
pub trait Interceptor: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    async fn intercept(&self, request: Request, next: Next<'_>) -> ClientResult<Response>;

    fn as_any(&self) -> &dyn Any;
}

/// The remainder of the chain after the current interceptor
pub struct Next<'a> {
    client: &'a Client,
    chain: &'a [Arc<dyn Interceptor>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(client: &'a Client, chain: &'a [Arc<dyn Interceptor>]) -> Self {
        Self { client, chain }
    }

    /// Hand the request to the next interceptor, or send it when none are left
    pub async fn run(self, request: Request) -> ClientResult<Response> {
        match self.chain.split_first() {
            Some((head, tail)) => {
                head.intercept(request, Next::new(self.client, tail)).await
            }
            None => Ok(self.client.execute(request).await?),
        }
    }
}

/// How much of each exchange the logging interceptor records
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoggingLevel {
    #[default]
    None,
    Basic,
    Headers,
    Body,
}

impl LoggingLevel {
    /// `true` logs full bodies, `false` disables logging
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            LoggingLevel::Body
        } else {
            LoggingLevel::None
        }
    }
}

const REDACTED_HEADERS: [&str; 3] = ["authorization", "cookie", "set-cookie"];

#[derive(Debug, Clone)]
pub struct LoggingInterceptor {
    level: LoggingLevel,
}

impl LoggingInterceptor {
    pub fn new(level: LoggingLevel) -> Self {
        Self { level }
    }

    pub fn level(&self) -> LoggingLevel {
        self.level
    }

    fn log_headers(direction: &str, headers: &HeaderMap) {
        for (name, value) in headers {
            let shown = if REDACTED_HEADERS.contains(&name.as_str()) {
                "██"
            } else {
                value.to_str().unwrap_or("<binary>")
            };
            info!("{} {}: {}", direction, name, shown);
        }
    }
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn intercept(&self, request: Request, next: Next<'_>) -> ClientResult<Response> {
        if self.level == LoggingLevel::None {
            return next.run(request).await;
        }

        let method = request.method().clone();
        let url = request.url().clone();
        info!("--> {} {}", method, url);
        if self.level >= LoggingLevel::Headers {
            Self::log_headers("-->", request.headers());
        }
        if self.level == LoggingLevel::Body {
            match request.body().and_then(|b| b.as_bytes()) {
                Some(bytes) => info!("--> body ({} bytes): {}", bytes.len(), String::from_utf8_lossy(bytes)),
                None => debug!("--> no buffered body"),
            }
        }
        info!("--> END {}", method);

        let started = Instant::now();
        let response = match next.run(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("<-- HTTP FAILED {} {}: {}", method, url, e);
                return Err(e);
            }
        };
        let elapsed = started.elapsed().as_millis();
        let status = response.status();
        info!("<-- {} {} ({}ms)", status.as_u16(), url, elapsed);
        if self.level >= LoggingLevel::Headers {
            Self::log_headers("<--", response.headers());
        }
        if self.level != LoggingLevel::Body {
            return Ok(response);
        }

        let version = response.version();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        info!("<-- body ({} bytes): {}", body.len(), String::from_utf8_lossy(&body));
        info!("<-- END HTTP");

        let mut rebuilt = http::Response::new(body);
        *rebuilt.status_mut() = status;
        *rebuilt.version_mut() = version;
        *rebuilt.headers_mut() = headers;
        Ok(Response::from(rebuilt))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Answers whether a host can currently be reached
#[async_trait]
pub trait ConnectivityProbe: Send + Sync + Debug {
    async fn is_reachable(&self, host: &str, port: u16) -> bool;
}

/// Treats a host as reachable when its name resolves
#[derive(Debug, Clone, Default)]
pub struct DnsConnectivityProbe;

#[async_trait]
impl ConnectivityProbe for DnsConnectivityProbe {
    async fn is_reachable(&self, host: &str, port: u16) -> bool {
        if host.parse::<IpAddr>().is_ok() {
            return true;
        }
        match tokio::net::lookup_host((host, port)).await {
            Ok(mut addrs) => addrs.next().is_some(),
            Err(e) => {
                debug!("lookup of {}:{} failed: {}", host, port, e);
                false
            }
        }
    }
}

/// Fixed answer, for offline setups and tests
#[derive(Debug, Clone)]
pub struct StaticConnectivityProbe {
    online: bool,
}

impl StaticConnectivityProbe {
    pub fn online() -> Self {
        Self { online: true }
    }

    pub fn offline() -> Self {
        Self { online: false }
    }
}

#[async_trait]
impl ConnectivityProbe for StaticConnectivityProbe {
    async fn is_reachable(&self, _host: &str, _port: u16) -> bool {
        self.online
    }
}

/// Rejects calls before they hit the network when the host is unreachable
#[derive(Debug, Clone)]
pub struct ConnectivityInterceptor {
    probe: Arc<dyn ConnectivityProbe>,
    deadline: Option<Duration>,
}

impl ConnectivityInterceptor {
    pub fn new(probe: Arc<dyn ConnectivityProbe>) -> Self {
        Self {
            probe,
            deadline: None,
        }
    }

    /// Treat the host as unreachable when the probe takes longer than `deadline`
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    async fn check(&self, host: &str, port: u16) -> bool {
        match self.deadline {
            Some(deadline) => {
                match tokio::time::timeout(deadline, self.probe.is_reachable(host, port)).await {
                    Ok(reachable) => reachable,
                    Err(_) => {
                        debug!("reachability check of {}:{} exceeded {:?}", host, port, deadline);
                        false
                    }
                }
            }
            None => self.probe.is_reachable(host, port).await,
        }
    }
}

impl Default for ConnectivityInterceptor {
    fn default() -> Self {
        Self::new(Arc::new(DnsConnectivityProbe))
    }
}

#[async_trait]
impl Interceptor for ConnectivityInterceptor {
    fn name(&self) -> &'static str {
        "connectivity"
    }

    async fn intercept(&self, request: Request, next: Next<'_>) -> ClientResult<Response> {
        let (host, port) = UrlBuilder::authority(request.url())?;
        if !self.check(&host, port).await {
            warn!("no connectivity to {}:{}", host, port);
            return Err(ClientError::NoConnectivity(format!("{}:{}", host, port)));
        }
        next.run(request).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
