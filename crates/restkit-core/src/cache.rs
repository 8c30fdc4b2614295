//! Single-slot client cache keyed by endpoint

use crate::adapter::{ConcurrencyAdapter, StreamAdapter};
use crate::codec::{BodyCodec, Codec, SerializationStrategy};
use crate::error::{ClientError, ClientResult};
use crate::handle::ClientHandle;
use crate::interceptors::{
    ConnectivityInterceptor, ConnectivityProbe, LoggingInterceptor, LoggingLevel,
};
use crate::timeouts::TimeoutSettings;
use crate::transport::TransportBuilder;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Last-step adjustment of the transport before it is built
pub type TransportCustomizer = Box<dyn FnOnce(TransportBuilder) -> TransportBuilder + Send>;

/// What to build when the cache misses
pub struct ClientOptions {
    endpoint: String,
    serialization: SerializationStrategy,
    concurrency: ConcurrencyAdapter,
    logging_enabled: bool,
    customizer: Option<TransportCustomizer>,
    probe: Option<Arc<dyn ConnectivityProbe>>,
}

impl ClientOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            serialization: SerializationStrategy::JsonTree,
            concurrency: ConcurrencyAdapter::None,
            logging_enabled: false,
            customizer: None,
            probe: None,
        }
    }

    pub fn serialization(mut self, strategy: SerializationStrategy) -> Self {
        self.serialization = strategy;
        self
    }

    pub fn concurrency(mut self, adapter: ConcurrencyAdapter) -> Self {
        self.concurrency = adapter;
        self
    }

    pub fn logging(mut self, enabled: bool) -> Self {
        self.logging_enabled = enabled;
        self
    }

    pub fn customize<F>(mut self, customizer: F) -> Self
    where
        F: FnOnce(TransportBuilder) -> TransportBuilder + Send + 'static,
    {
        self.customizer = Some(Box::new(customizer));
        self
    }

    /// Replace the DNS-based reachability check
    pub fn connectivity_probe(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("endpoint", &self.endpoint)
            .field("serialization", &self.serialization.name())
            .field("concurrency", &self.concurrency)
            .field("logging_enabled", &self.logging_enabled)
            .field("customizer", &self.customizer.is_some())
            .field("probe", &self.probe)
            .finish()
    }
}

/// Holds at most one handle and rebuilds it only when the endpoint changes
///
/// The endpoint string is the whole cache key. A hit returns the cached handle
/// even when the other options differ from what it was built with; the
/// mismatch is logged, not acted on. Call [`ClientCache::clear`] to force a
/// rebuild with new options.
pub struct ClientCache {
    slot: RwLock<Option<Arc<ClientHandle>>>,
    timeouts: RwLock<TimeoutSettings>,
    json_tree: OnceCell<Arc<Codec>>,
    typed: OnceCell<Arc<Codec>>,
    stream_adapter: OnceCell<Arc<StreamAdapter>>,
    builds: AtomicU64,
    hits: AtomicU64,
}

impl ClientCache {
    pub fn new() -> Self {
        Self::with_timeouts(TimeoutSettings::default())
    }

    pub fn with_timeouts(timeouts: TimeoutSettings) -> Self {
        Self {
            slot: RwLock::new(None),
            timeouts: RwLock::new(timeouts),
            json_tree: OnceCell::new(),
            typed: OnceCell::new(),
            stream_adapter: OnceCell::new(),
            builds: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    /// Return the cached handle for `options.endpoint`, building and replacing it on a miss
    ///
    /// The customizer is only invoked on a miss. It runs while the slot is
    /// locked and must not call back into this cache.
    pub fn get_or_build(&self, options: ClientOptions) -> ClientResult<Arc<ClientHandle>> {
        if options.endpoint.is_empty() {
            return Err(ClientError::InvalidConfig(
                "endpoint must not be empty".to_string(),
            ));
        }

        {
            let slot = self.slot.read();
            if let Some(handle) = slot.as_ref() {
                if handle.endpoint() == options.endpoint {
                    return Ok(self.hit(handle, &options));
                }
            }
        }

        let mut slot = self.slot.write();
        if let Some(handle) = slot.as_ref() {
            if handle.endpoint() == options.endpoint {
                return Ok(self.hit(handle, &options));
            }
            info!(
                "endpoint changed from {} to {}, rebuilding client",
                handle.endpoint(),
                options.endpoint
            );
        }

        let handle = Arc::new(self.build(options)?);
        *slot = Some(handle.clone());
        Ok(handle)
    }

    pub fn json_tree_async(&self, endpoint: &str, logging: bool) -> ClientResult<Arc<ClientHandle>> {
        self.get_or_build(ClientOptions::new(endpoint).logging(logging))
    }

    pub fn json_tree_stream(&self, endpoint: &str, logging: bool) -> ClientResult<Arc<ClientHandle>> {
        self.get_or_build(
            ClientOptions::new(endpoint)
                .concurrency(ConcurrencyAdapter::Stream)
                .logging(logging),
        )
    }

    pub fn typed_async(&self, endpoint: &str, logging: bool) -> ClientResult<Arc<ClientHandle>> {
        self.get_or_build(
            ClientOptions::new(endpoint)
                .serialization(SerializationStrategy::Typed)
                .logging(logging),
        )
    }

    pub fn typed_stream(&self, endpoint: &str, logging: bool) -> ClientResult<Arc<ClientHandle>> {
        self.get_or_build(
            ClientOptions::new(endpoint)
                .serialization(SerializationStrategy::Typed)
                .concurrency(ConcurrencyAdapter::Stream)
                .logging(logging),
        )
    }

    /// Arbitrary codec plus transport customization, with the stream adapter attached
    pub fn custom<F>(
        &self,
        endpoint: &str,
        codec: Arc<dyn BodyCodec>,
        logging: bool,
        customizer: F,
    ) -> ClientResult<Arc<ClientHandle>>
    where
        F: FnOnce(TransportBuilder) -> TransportBuilder + Send + 'static,
    {
        self.get_or_build(
            ClientOptions::new(endpoint)
                .serialization(SerializationStrategy::Custom(codec))
                .concurrency(ConcurrencyAdapter::Stream)
                .logging(logging)
                .customize(customizer),
        )
    }

    /// Drop the cached handle; the next call always builds
    pub fn clear(&self) {
        if let Some(handle) = self.slot.write().take() {
            debug!("cleared cached client for {}", handle.endpoint());
        }
    }

    /// Cached handle, if any, without building
    pub fn current(&self) -> Option<Arc<ClientHandle>> {
        self.slot.read().clone()
    }

    pub fn timeouts(&self) -> TimeoutSettings {
        *self.timeouts.read()
    }

    /// Takes effect for handles built after this call
    pub fn set_timeouts(&self, timeouts: TimeoutSettings) {
        *self.timeouts.write() = timeouts;
    }

    pub fn set_connect_timeout(&self, timeout: Duration) {
        self.timeouts.write().connect = timeout;
    }

    pub fn set_read_timeout(&self, timeout: Duration) {
        self.timeouts.write().read = timeout;
    }

    pub fn set_write_timeout(&self, timeout: Duration) {
        self.timeouts.write().write = timeout;
    }

    pub fn stats(&self) -> ClientCacheStats {
        ClientCacheStats {
            builds: self.builds.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            cached_endpoint: self.slot.read().as_ref().map(|h| h.endpoint().to_string()),
        }
    }

    fn hit(&self, handle: &Arc<ClientHandle>, options: &ClientOptions) -> Arc<ClientHandle> {
        self.hits.fetch_add(1, Ordering::Relaxed);

        let mut ignored = Vec::new();
        if !handle.serialization().same_as(&options.serialization) {
            ignored.push("serialization");
        }
        if handle.concurrency() != options.concurrency {
            ignored.push("concurrency");
        }
        if handle.logging_level() != LoggingLevel::from_enabled(options.logging_enabled) {
            ignored.push("logging");
        }
        if options.customizer.is_some() {
            ignored.push("customizer");
        }

        if ignored.iter().any(|name| *name != "customizer") {
            warn!(
                "returning cached client for {} built with different options, ignored: {}",
                handle.endpoint(),
                ignored.join(", ")
            );
        } else {
            debug!("client cache hit for {}", handle.endpoint());
        }
        handle.clone()
    }

    fn build(&self, options: ClientOptions) -> ClientResult<ClientHandle> {
        let ClientOptions {
            endpoint,
            serialization,
            concurrency,
            logging_enabled,
            customizer,
            probe,
        } = options;

        let timeouts = self.timeouts();
        let connectivity = match probe {
            Some(probe) => ConnectivityInterceptor::new(probe),
            None => ConnectivityInterceptor::default(),
        }
        .with_deadline(timeouts.connect);
        let mut builder = TransportBuilder::new()
            .interceptor(Arc::new(LoggingInterceptor::new(LoggingLevel::from_enabled(
                logging_enabled,
            ))))
            .interceptor(Arc::new(connectivity))
            .timeouts(timeouts);
        if let Some(customize) = customizer {
            builder = customize(builder);
        }
        let transport = builder.build()?;

        let codec = match serialization {
            SerializationStrategy::JsonTree => self
                .json_tree
                .get_or_init(|| Arc::new(Codec::json_tree()))
                .clone(),
            SerializationStrategy::Typed => {
                self.typed.get_or_init(|| Arc::new(Codec::typed())).clone()
            }
            SerializationStrategy::Custom(codec) => Arc::new(Codec::custom(codec)),
        };
        let stream_adapter = match concurrency {
            ConcurrencyAdapter::None => None,
            ConcurrencyAdapter::Stream => Some(
                self.stream_adapter
                    .get_or_init(|| Arc::new(StreamAdapter::new()))
                    .clone(),
            ),
        };

        let builds = self.builds.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            "built client #{} for {} (serialization={}, concurrency={:?}, logging={})",
            builds,
            endpoint,
            codec.strategy().name(),
            concurrency,
            logging_enabled
        );
        Ok(ClientHandle::new(endpoint, transport, codec, stream_adapter))
    }
}

impl Default for ClientCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClientCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCache")
            .field("stats", &self.stats())
            .field("timeouts", &self.timeouts())
            .finish()
    }
}

/// Counters for monitoring and idempotence checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCacheStats {
    pub builds: u64,
    pub hits: u64,
    pub cached_endpoint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::YamlCodec;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_cache_hit_ignores_other_options() {
        let cache = ClientCache::new();

        let first = cache.json_tree_async("https://a", false).unwrap();
        let second = cache.typed_stream("https://a", true).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.serialization().name(), "json_tree");
        assert_eq!(second.concurrency(), ConcurrencyAdapter::None);
        assert_eq!(second.logging_level(), LoggingLevel::None);
    }

    #[test]
    fn test_endpoint_change_rebuilds() {
        let cache = ClientCache::new();

        let a = cache.json_tree_async("https://a", false).unwrap();
        let b = cache.json_tree_async("https://b", false).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(b.endpoint(), "https://b");
        assert_eq!(cache.current().unwrap().endpoint(), "https://b");
        assert_eq!(cache.stats().builds, 2);
    }

    #[test]
    fn test_endpoint_compared_as_exact_string() {
        let cache = ClientCache::new();

        let a = cache.json_tree_async("https://a", false).unwrap();
        let a_slash = cache.json_tree_async("https://a/", false).unwrap();

        assert!(!Arc::ptr_eq(&a, &a_slash));
    }

    #[test]
    fn test_clear_forces_rebuild() {
        let cache = ClientCache::new();

        let before = cache.json_tree_async("https://a", false).unwrap();
        cache.clear();
        assert!(cache.current().is_none());
        let after = cache.json_tree_async("https://a", false).unwrap();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(cache.stats().builds, 2);
    }

    #[test]
    fn test_clear_on_empty_cache() {
        let cache = ClientCache::new();
        cache.clear();
        assert_eq!(cache.stats().cached_endpoint, None);
    }

    #[test]
    fn test_timeouts_apply_only_to_later_builds() {
        let cache = ClientCache::new();

        cache.set_connect_timeout(Duration::from_secs(30));
        let handle = cache.json_tree_async("https://a", false).unwrap();
        assert_eq!(handle.transport().timeouts().connect, Duration::from_secs(30));
        assert_eq!(handle.transport().timeouts().read, Duration::from_secs(10));

        cache.set_connect_timeout(Duration::from_secs(5));
        let cached = cache.json_tree_async("https://a", false).unwrap();
        assert!(Arc::ptr_eq(&handle, &cached));
        assert_eq!(cached.transport().timeouts().connect, Duration::from_secs(30));

        let rebuilt = cache.json_tree_async("https://b", false).unwrap();
        assert_eq!(rebuilt.transport().timeouts().connect, Duration::from_secs(5));
    }

    #[test]
    fn test_logging_flag_sets_interceptor_level() {
        let cache = ClientCache::new();

        let quiet = cache.json_tree_async("https://a", false).unwrap();
        assert_eq!(quiet.logging_level(), LoggingLevel::None);
        assert_eq!(quiet.transport().interceptor_names(), vec!["logging", "connectivity"]);

        let loud = cache.json_tree_async("https://b", true).unwrap();
        assert_eq!(loud.logging_level(), LoggingLevel::Body);
    }

    #[test]
    fn test_repeated_hits_build_once() {
        let cache = ClientCache::new();

        for _ in 0..5 {
            cache.typed_async("https://a", false).unwrap();
        }

        let stats = cache.stats();
        assert_eq!(stats.builds, 1);
        assert_eq!(stats.hits, 4);
        assert_eq!(stats.cached_endpoint.as_deref(), Some("https://a"));
    }

    #[test]
    fn test_customizer_runs_on_miss_only() {
        let cache = ClientCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = calls.clone();
            cache
                .get_or_build(ClientOptions::new("https://a").customize(move |builder| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    builder.read_timeout(Duration::from_secs(42))
                }))
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let handle = cache.current().unwrap();
        assert_eq!(handle.transport().timeouts().read, Duration::from_secs(42));
    }

    #[test]
    fn test_customizer_adds_interceptor_after_defaults() {
        let cache = ClientCache::new();
        let handle = cache
            .get_or_build(ClientOptions::new("https://a").customize(|builder| {
                builder.interceptor(Arc::new(LoggingInterceptor::new(LoggingLevel::Headers)))
            }))
            .unwrap();

        assert_eq!(
            handle.transport().interceptor_names(),
            vec!["logging", "connectivity", "logging"]
        );
        assert_eq!(handle.logging_level(), LoggingLevel::None);
    }

    #[test]
    fn test_shared_codecs_and_adapter_are_reused() {
        let cache = ClientCache::new();

        let first = cache.typed_stream("https://a", false).unwrap();
        let second = cache.typed_stream("https://b", false).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(first.codec(), second.codec()));
        assert!(Arc::ptr_eq(
            first.stream_adapter().unwrap(),
            second.stream_adapter().unwrap()
        ));
    }

    #[test]
    fn test_custom_variant_attaches_codec_and_stream_adapter() {
        let cache = ClientCache::new();
        let handle = cache
            .custom("https://a", Arc::new(YamlCodec), false, |builder| {
                builder.user_agent("restkit-test")
            })
            .unwrap();

        assert_eq!(handle.serialization().name(), "custom");
        assert_eq!(handle.codec().content_type(), "application/yaml");
        assert_eq!(handle.concurrency(), ConcurrencyAdapter::Stream);
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        let cache = ClientCache::new();
        let result = cache.json_tree_async("", false);

        assert!(matches!(result, Err(ClientError::InvalidConfig(_))));
        assert_eq!(cache.stats().builds, 0);
    }

    #[test]
    fn test_malformed_endpoint_is_not_validated_at_build() {
        let cache = ClientCache::new();
        let handle = cache.json_tree_async("not a url", false).unwrap();
        assert_eq!(handle.endpoint(), "not a url");
    }

    #[test]
    fn test_failed_build_keeps_previous_handle() {
        let cache = ClientCache::new();
        let a = cache.json_tree_async("https://a", false).unwrap();

        let result = cache.get_or_build(
            ClientOptions::new("https://b").customize(|builder| builder.write_timeout(Duration::ZERO)),
        );

        assert!(result.is_err());
        assert!(Arc::ptr_eq(&a, &cache.current().unwrap()));
    }

    #[test]
    fn test_concurrent_callers_share_one_build() {
        let cache = Arc::new(ClientCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || cache.json_tree_async("https://a", false).unwrap())
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.stats().builds, 1);
    }
}
