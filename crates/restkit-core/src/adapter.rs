//! How asynchronous call results are exposed

use crate::error::{ClientError, ClientResult};
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::debug;

/// A call exposed as a single-item stream
pub type CallStream<T> = BoxStream<'static, ClientResult<T>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyAdapter {
    /// Calls are plain futures awaited by the caller
    #[default]
    None,
    /// Calls are also available as streams driven on the runtime's worker pool
    Stream,
}

/// Wraps calls into cold streams whose work is spawned when first polled
#[derive(Debug, Default)]
pub struct StreamAdapter;

impl StreamAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn adapt<T, F>(&self, call: F) -> CallStream<T>
    where
        T: Send + 'static,
        F: Future<Output = ClientResult<T>> + Send + 'static,
    {
        stream::once(async move {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => match runtime.spawn(call).await {
                    Ok(result) => result,
                    Err(e) => Err(ClientError::Runtime(format!("call task failed: {}", e))),
                },
                Err(_) => {
                    debug!("no tokio runtime, driving call inline");
                    call.await
                }
            }
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_stream_yields_exactly_one_item() {
        let adapter = StreamAdapter::new();
        let items: Vec<ClientResult<u32>> = adapter.adapt(async { Ok(7) }).collect().await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), &7);
    }

    #[tokio::test]
    async fn test_stream_is_cold() {
        let started = Arc::new(AtomicBool::new(false));
        let flag = started.clone();
        let adapter = StreamAdapter::new();

        let mut stream = adapter.adapt(async move {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });
        tokio::task::yield_now().await;
        assert!(!started.load(Ordering::SeqCst));

        assert!(stream.next().await.unwrap().is_ok());
        assert!(started.load(Ordering::SeqCst));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let adapter = StreamAdapter::new();
        let mut stream =
            adapter.adapt(async { Err::<(), _>(ClientError::Timeout("slow".into())) });

        assert!(matches!(stream.next().await, Some(Err(ClientError::Timeout(_)))));
    }
}
