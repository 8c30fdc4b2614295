pub mod adapter;
pub mod api_result;
pub mod cache;
pub mod codec;
pub mod error;
pub mod handle;
pub mod interceptors;
pub mod timeouts;
pub mod transport;
pub mod url_builder;

// Re-export commonly used types
pub use adapter::{CallStream, ConcurrencyAdapter, StreamAdapter};
pub use api_result::ApiResult;
pub use cache::{ClientCache, ClientCacheStats, ClientOptions, TransportCustomizer};
pub use codec::{BodyCodec, Codec, JsonTreeCodec, SerializationStrategy, YamlCodec};
pub use error::{ClientError, ClientResult};
pub use handle::ClientHandle;
pub use interceptors::{
    ConnectivityInterceptor, ConnectivityProbe, DnsConnectivityProbe, Interceptor,
    LoggingInterceptor, LoggingLevel, Next, StaticConnectivityProbe,
};
pub use timeouts::TimeoutSettings;
pub use transport::{Transport, TransportBuilder};
pub use url_builder::UrlBuilder;
