//! Transport construction: reqwest client plus interceptor chain

use crate::error::{ClientError, ClientResult};
use crate::interceptors::{Interceptor, LoggingInterceptor, LoggingLevel, Next};
use crate::timeouts::TimeoutSettings;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Request, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Collects interceptors, timeouts and default headers before a transport is built
#[derive(Debug, Clone, Default)]
pub struct TransportBuilder {
    interceptors: Vec<Arc<dyn Interceptor>>,
    timeouts: TimeoutSettings,
    default_headers: Vec<(String, String)>,
    user_agent: Option<String>,
}

impl TransportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor; earlier interceptors wrap later ones
    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn timeouts(mut self, timeouts: TimeoutSettings) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connect = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.read = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.write = timeout;
        self
    }

    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn build(self) -> ClientResult<Transport> {
        self.timeouts.validate()?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ClientError::InvalidConfig(format!("Invalid header name '{}': {}", name, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                ClientError::InvalidConfig(format!("Invalid value for header '{}': {}", name, e))
            })?;
            headers.insert(name, value);
        }

        let mut builder = self
            .timeouts
            .apply_to_client_builder(Client::builder())
            .default_headers(headers);
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent);
        }

        let client = builder.build()?;
        debug!(
            "transport built: interceptors={} connect={:?} read={:?} write={:?}",
            self.interceptors.len(),
            self.timeouts.connect,
            self.timeouts.read,
            self.timeouts.write
        );

        Ok(Transport {
            client,
            interceptors: self.interceptors,
            timeouts: self.timeouts,
        })
    }
}

/// A built client with its interceptor chain; immutable once built
#[derive(Debug)]
pub struct Transport {
    client: Client,
    interceptors: Vec<Arc<dyn Interceptor>>,
    timeouts: TimeoutSettings,
}

impl Transport {
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn timeouts(&self) -> TimeoutSettings {
        self.timeouts
    }

    pub fn interceptor_names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// First interceptor of the given concrete type
    pub fn find_interceptor<T: Interceptor + 'static>(&self) -> Option<&T> {
        self.interceptors
            .iter()
            .find_map(|i| i.as_any().downcast_ref::<T>())
    }

    /// Level of the first logging interceptor, `None` when there is none
    pub fn logging_level(&self) -> LoggingLevel {
        self.find_interceptor::<LoggingInterceptor>()
            .map(LoggingInterceptor::level)
            .unwrap_or(LoggingLevel::None)
    }

    /// Run a request through the interceptor chain
    pub async fn execute(&self, mut request: Request) -> ClientResult<Response> {
        if request.timeout().is_none() {
            if let Some(deadline) = self.timeouts.request_deadline(request.body().is_some()) {
                *request.timeout_mut() = Some(deadline);
            }
        }

        Next::new(&self.client, &self.interceptors)
            .run(request)
            .await
            .map_err(|e| match e {
                ClientError::Http(inner) => ClientError::from_transport(inner),
                other => other,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptors::{ConnectivityInterceptor, StaticConnectivityProbe};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::any::Any;

    /// Records the deadline each request carries, then stops the chain
    #[derive(Debug, Default)]
    struct DeadlineRecorder {
        seen: Mutex<Vec<Option<Duration>>>,
    }

    #[async_trait]
    impl Interceptor for DeadlineRecorder {
        fn name(&self) -> &'static str {
            "deadline-recorder"
        }

        async fn intercept(&self, request: Request, _next: Next<'_>) -> ClientResult<Response> {
            self.seen.lock().push(request.timeout().copied());
            Err(ClientError::Runtime("stopped".to_string()))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[tokio::test]
    async fn test_execute_sets_write_deadline_on_body_requests() {
        let recorder = Arc::new(DeadlineRecorder::default());
        let transport = TransportBuilder::new()
            .interceptor(recorder.clone())
            .timeouts(TimeoutSettings::from_secs(1, 4, 2))
            .build()
            .unwrap();
        let client = transport.client().clone();

        let post = client
            .post("http://localhost:9/items")
            .body("{}")
            .build()
            .unwrap();
        let get = client.get("http://localhost:9/items").build().unwrap();
        let explicit = client
            .post("http://localhost:9/items")
            .body("{}")
            .timeout(Duration::from_millis(750))
            .build()
            .unwrap();

        for request in [post, get, explicit] {
            assert!(transport.execute(request).await.is_err());
        }

        assert_eq!(
            *recorder.seen.lock(),
            vec![
                Some(Duration::from_secs(6)),
                None,
                Some(Duration::from_millis(750)),
            ]
        );
    }

    #[test]
    fn test_builder_collects_interceptors_in_order() {
        let transport = TransportBuilder::new()
            .interceptor(Arc::new(LoggingInterceptor::new(LoggingLevel::Basic)))
            .interceptor(Arc::new(ConnectivityInterceptor::new(Arc::new(
                StaticConnectivityProbe::online(),
            ))))
            .build()
            .unwrap();

        assert_eq!(transport.interceptor_names(), vec!["logging", "connectivity"]);
        assert_eq!(transport.logging_level(), LoggingLevel::Basic);
    }

    #[test]
    fn test_timeout_setters() {
        let transport = TransportBuilder::new()
            .connect_timeout(Duration::from_secs(3))
            .read_timeout(Duration::from_secs(4))
            .write_timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(transport.timeouts(), TimeoutSettings::from_secs(3, 4, 5));
        assert_eq!(transport.logging_level(), LoggingLevel::None);
    }

    #[test]
    fn test_zero_timeout_fails_build() {
        let result = TransportBuilder::new()
            .write_timeout(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(ClientError::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_default_header() {
        let result = TransportBuilder::new()
            .default_header("bad header", "x")
            .build();
        assert!(matches!(result, Err(ClientError::InvalidConfig(_))));
    }
}
