use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::Result;
use crate::backoff::{BackoffStrategy, ConstantBackoff};
use crate::context::Context;
use crate::decode::{BodyDecoder, JsonDecoder};
use crate::error::Error;
use crate::executor::RequestExecutor;
use crate::gate::{AlwaysRead, ResponseGate};
use crate::metrics::{ClientMetrics, ClientMetricsSnapshot};
use crate::observe::{NoopObserver, RetryObserver};
use crate::request::{Request, RequestBuilder};
use crate::response::Response;
use crate::retry::{RetryOrchestrator, RetryPolicy};

pub(crate) const DEFAULT_CLIENT_NAME: &str = "reqloop";
pub(crate) const DEFAULT_MAX_RESPONSE_BODY_BYTES: usize = 8 * 1024 * 1024;

pub struct ClientBuilder<D = JsonDecoder> {
    client_name: String,
    executor: Option<Arc<dyn RequestExecutor>>,
    decoder: Option<D>,
    backoff: Arc<dyn BackoffStrategy>,
    max_retries: u32,
    gate: Arc<dyn ResponseGate>,
    max_response_body_bytes: usize,
    observer: Arc<dyn RetryObserver>,
}

impl ClientBuilder<JsonDecoder> {
    pub(crate) fn new() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_owned(),
            executor: None,
            decoder: Some(JsonDecoder::new()),
            backoff: Arc::new(ConstantBackoff::zero()),
            max_retries: 0,
            gate: Arc::new(AlwaysRead),
            max_response_body_bytes: DEFAULT_MAX_RESPONSE_BODY_BYTES,
            observer: Arc::new(NoopObserver),
        }
    }
}

impl<D> ClientBuilder<D>
where
    D: BodyDecoder,
{
    pub fn client_name(mut self, client_name: impl Into<String>) -> Self {
        self.client_name = client_name.into();
        self
    }

    pub fn executor(mut self, executor: impl RequestExecutor + 'static) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    pub fn shared_executor(mut self, executor: Arc<dyn RequestExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Replaces the body decoder, changing the client's decoder type.
    pub fn body_decoder<D2>(self, decoder: D2) -> ClientBuilder<D2>
    where
        D2: BodyDecoder,
    {
        ClientBuilder {
            client_name: self.client_name,
            executor: self.executor,
            decoder: Some(decoder),
            backoff: self.backoff,
            max_retries: self.max_retries,
            gate: self.gate,
            max_response_body_bytes: self.max_response_body_bytes,
            observer: self.observer,
        }
    }

    /// Responses the gate lets through are closed without being read.
    pub fn without_body_decoder(mut self) -> Self {
        self.decoder = None;
        self
    }

    pub fn backoff_strategy(mut self, backoff: impl BackoffStrategy + 'static) -> Self {
        self.backoff = Arc::new(backoff);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.max_retries = retry_policy.max_retries();
        self.backoff = retry_policy.shared_backoff();
        self
    }

    pub fn response_gate(mut self, gate: impl ResponseGate + 'static) -> Self {
        self.gate = Arc::new(gate);
        self
    }

    pub fn max_response_body_bytes(mut self, max_response_body_bytes: usize) -> Self {
        self.max_response_body_bytes = max_response_body_bytes.max(1);
        self
    }

    pub fn observer(mut self, observer: impl RetryObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn try_build(self) -> Result<Client<D>> {
        let executor = match self.executor {
            Some(executor) => executor,
            None => default_executor()?,
        };
        Ok(Client {
            inner: Arc::new(RetryOrchestrator {
                client_name: self.client_name,
                executor,
                policy: RetryPolicy::new(self.max_retries, self.backoff),
                gate: self.gate,
                decoder: self.decoder,
                max_response_body_bytes: self.max_response_body_bytes,
                metrics: ClientMetrics::default(),
                observer: self.observer,
            }),
        })
    }

    pub fn build(self) -> Client<D> {
        self.try_build()
            .unwrap_or_else(|error| panic!("failed to build reqloop client: {error}"))
    }
}

#[cfg(feature = "hyper-executor")]
fn default_executor() -> Result<Arc<dyn RequestExecutor>> {
    let executor = crate::executor::HyperExecutor::new()
        .map_err(|source| Error::ExecutorInit { source })?;
    Ok(Arc::new(executor))
}

#[cfg(not(feature = "hyper-executor"))]
fn default_executor() -> Result<Arc<dyn RequestExecutor>> {
    Err(Error::MissingDependency {
        dependency: "executor",
    })
}

/// Runs requests through an executor with retries, a response gate and an
/// optional body decoder.
///
/// Clones share collaborators and metrics.
pub struct Client<D = JsonDecoder> {
    inner: Arc<RetryOrchestrator<D>>,
}

impl<D> Clone for Client<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D> std::fmt::Debug for Client<D> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Client")
            .field("client_name", &self.inner.client_name)
            .field("retry_policy", &self.inner.policy)
            .field("decodes_body", &self.inner.decoder.is_some())
            .field(
                "max_response_body_bytes",
                &self.inner.max_response_body_bytes,
            )
            .finish_non_exhaustive()
    }
}

impl Client<JsonDecoder> {
    pub fn builder() -> ClientBuilder<JsonDecoder> {
        ClientBuilder::new()
    }
}

impl<D> Client<D>
where
    D: BodyDecoder,
{
    /// Sends `request`, retrying executor failures, then gates and decodes
    /// the response.
    ///
    /// On success the decoded value has been written to `target` when a
    /// decoder is configured and the gate allowed reading. A response the gate
    /// rejected comes back with its body still open.
    pub async fn execute<T>(&self, request: &Request, target: Option<&mut T>) -> Result<Response>
    where
        T: DeserializeOwned,
    {
        self.inner.execute(request, target).await
    }

    pub async fn get<T>(
        &self,
        context: &Context,
        uri: &str,
        target: Option<&mut T>,
    ) -> Result<Response>
    where
        T: DeserializeOwned,
    {
        let request = RequestBuilder.build_get_request(context, uri)?;
        self.execute(&request, target).await
    }

    pub async fn head<T>(
        &self,
        context: &Context,
        uri: &str,
        target: Option<&mut T>,
    ) -> Result<Response>
    where
        T: DeserializeOwned,
    {
        let request = RequestBuilder.build_head_request(context, uri)?;
        self.execute(&request, target).await
    }

    pub async fn post<T>(
        &self,
        context: &Context,
        uri: &str,
        content_type: &str,
        body: impl Into<Bytes>,
        target: Option<&mut T>,
    ) -> Result<Response>
    where
        T: DeserializeOwned,
    {
        let request = RequestBuilder.build_post_request(context, uri, content_type, body)?;
        self.execute(&request, target).await
    }

    pub async fn post_form<F, T>(
        &self,
        context: &Context,
        uri: &str,
        form: &F,
        target: Option<&mut T>,
    ) -> Result<Response>
    where
        F: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = RequestBuilder.build_post_form_request(context, uri, form)?;
        self.execute(&request, target).await
    }

    pub fn client_name(&self) -> &str {
        &self.inner.client_name
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.policy
    }

    pub fn metrics_snapshot(&self) -> ClientMetricsSnapshot {
        self.inner.metrics.snapshot()
    }
}
