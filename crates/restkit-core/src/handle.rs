//! Ready-to-use client bound to one endpoint

use crate::adapter::{CallStream, ConcurrencyAdapter, StreamAdapter};
use crate::api_result::ApiResult;
use crate::codec::{Codec, SerializationStrategy};
use crate::error::{ClientError, ClientResult};
use crate::interceptors::LoggingLevel;
use crate::transport::Transport;
use crate::url_builder::UrlBuilder;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;

/// Endpoint, transport, codec and call adapter; replaced, never mutated
#[derive(Debug, Clone)]
pub struct ClientHandle {
    endpoint: String,
    transport: Arc<Transport>,
    codec: Arc<Codec>,
    concurrency: ConcurrencyAdapter,
    stream_adapter: Option<Arc<StreamAdapter>>,
    built_at: DateTime<Utc>,
}

impl ClientHandle {
    pub(crate) fn new(
        endpoint: String,
        transport: Transport,
        codec: Arc<Codec>,
        stream_adapter: Option<Arc<StreamAdapter>>,
    ) -> Self {
        let concurrency = if stream_adapter.is_some() {
            ConcurrencyAdapter::Stream
        } else {
            ConcurrencyAdapter::None
        };
        Self {
            endpoint,
            transport: Arc::new(transport),
            codec,
            concurrency,
            stream_adapter,
            built_at: Utc::now(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn codec(&self) -> &Arc<Codec> {
        &self.codec
    }

    pub fn serialization(&self) -> &SerializationStrategy {
        self.codec.strategy()
    }

    pub fn concurrency(&self) -> ConcurrencyAdapter {
        self.concurrency
    }

    pub fn stream_adapter(&self) -> Option<&Arc<StreamAdapter>> {
        self.stream_adapter.as_ref()
    }

    pub fn logging_level(&self) -> LoggingLevel {
        self.transport.logging_level()
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Resolve `path`, send `body` encoded with the handle's codec and decode the reply
    pub async fn call<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> ClientResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned + Send,
    {
        let url = UrlBuilder::join(&self.endpoint, path)?;
        debug!("{} {}", method, url);

        let mut builder = self
            .transport
            .client()
            .request(method, url)
            .header(ACCEPT, self.codec.content_type());
        if let Some(body) = body {
            builder = builder
                .header(CONTENT_TYPE, self.codec.content_type())
                .body(self.codec.encode(body)?);
        }

        let response = self.transport.execute(builder.build()?).await?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(ClientError::from_transport)?;

        if !status.is_success() {
            let body = if bytes.is_empty() {
                None
            } else {
                Some(String::from_utf8_lossy(&bytes).into_owned())
            };
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
            return Ok(serde_json::from_value(JsonValue::Null)?);
        }
        self.codec.decode(&bytes)
    }

    pub async fn get<T: DeserializeOwned + Send>(&self, path: &str) -> ClientResult<T> {
        self.call::<(), T>(Method::GET, path, None).await
    }

    pub async fn delete<T: DeserializeOwned + Send>(&self, path: &str) -> ClientResult<T> {
        self.call::<(), T>(Method::DELETE, path, None).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned + Send,
    {
        self.call(Method::POST, path, Some(body)).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned + Send,
    {
        self.call(Method::PUT, path, Some(body)).await
    }

    /// Same as [`ClientHandle::call`] but reports failures as an [`ApiResult`]
    pub async fn call_result<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned + Send,
    {
        ApiResult::from_call(self.call(method, path, body).await)
    }

    pub async fn get_result<T: DeserializeOwned + Send>(&self, path: &str) -> ApiResult<T> {
        self.call_result::<(), T>(Method::GET, path, None).await
    }

    /// Expose a call through the stream adapter
    ///
    /// Fails with [`ClientError::AdapterMissing`] when the handle was built without one.
    pub fn stream_call<B, T>(
        &self,
        method: Method,
        path: impl Into<String>,
        body: Option<B>,
    ) -> ClientResult<CallStream<T>>
    where
        B: Serialize + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
    {
        let adapter = self.stream_adapter.as_ref().ok_or_else(|| {
            ClientError::AdapterMissing(format!(
                "handle for '{}' was built without a stream adapter",
                self.endpoint
            ))
        })?;

        let this = self.clone();
        let path = path.into();
        Ok(adapter.adapt(async move { this.call(method, &path, body.as_ref()).await }))
    }

    pub fn stream_get<T>(&self, path: impl Into<String>) -> ClientResult<CallStream<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.stream_call::<(), T>(Method::GET, path, None)
    }
}
