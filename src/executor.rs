use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BoxError;
use crate::request::Request;
use crate::response::Response;

/// Performs exactly one attempt of a request.
///
/// The retry loop calls `execute` sequentially and never cancels a call in
/// flight; executors that need a per-attempt timeout enforce it themselves.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, request: &Request) -> Result<Response, BoxError>;
}

#[async_trait]
impl<E> RequestExecutor for Arc<E>
where
    E: RequestExecutor + ?Sized,
{
    async fn execute(&self, request: &Request) -> Result<Response, BoxError> {
        (**self).execute(request).await
    }
}

#[cfg(feature = "hyper-executor")]
pub use self::hyper_executor::HyperExecutor;

#[cfg(feature = "hyper-executor")]
mod hyper_executor {
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use http_body_util::Full;
    use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
    use hyper_util::client::legacy::Client;
    use hyper_util::client::legacy::connect::HttpConnector;
    use hyper_util::rt::TokioExecutor;

    use super::RequestExecutor;
    use crate::error::BoxError;
    use crate::request::Request;
    use crate::response::{Response, ResponseBody};

    const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
    const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 8;

    type HyperClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

    /// Sends requests over HTTP/1.1 or HTTP/2 with rustls and webpki roots.
    #[derive(Clone)]
    pub struct HyperExecutor {
        client: HyperClient,
    }

    impl std::fmt::Debug for HyperExecutor {
        fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.debug_struct("HyperExecutor").finish_non_exhaustive()
        }
    }

    impl HyperExecutor {
        pub fn new() -> Result<Self, BoxError> {
            Self::with_pool(DEFAULT_POOL_IDLE_TIMEOUT, DEFAULT_POOL_MAX_IDLE_PER_HOST)
        }

        pub fn with_pool(
            pool_idle_timeout: Duration,
            pool_max_idle_per_host: usize,
        ) -> Result<Self, BoxError> {
            let mut http = HttpConnector::new();
            http.enforce_http(false);
            let https = HttpsConnectorBuilder::new()
                .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())?
                .https_or_http()
                .enable_http1()
                .enable_http2()
                .wrap_connector(http);
            let client = Client::builder(TokioExecutor::new())
                .pool_idle_timeout(pool_idle_timeout.max(Duration::from_millis(1)))
                .pool_max_idle_per_host(pool_max_idle_per_host.max(1))
                .build(https);
            Ok(Self { client })
        }
    }

    #[async_trait]
    impl RequestExecutor for HyperExecutor {
        async fn execute(&self, request: &Request) -> Result<Response, BoxError> {
            let mut builder = http::Request::builder()
                .method(request.method().clone())
                .uri(request.uri().clone());
            for (name, value) in request.headers() {
                builder = builder.header(name, value);
            }
            let body = request.body_bytes().cloned().unwrap_or_default();
            let outgoing = builder.body(Full::new(body))?;

            let incoming = self.client.request(outgoing).await?;
            let (parts, body) = incoming.into_parts();
            Ok(Response::new(
                parts.status,
                parts.headers,
                ResponseBody::new(body),
            ))
        }
    }
}
