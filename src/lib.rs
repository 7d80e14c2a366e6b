//! `reqloop` runs HTTP requests through a bounded retry loop.
//!
//! Every request carries a [`Context`] with a deadline. A pluggable
//! [`RequestExecutor`] performs single attempts; failed attempts are retried up
//! to a budget with waits chosen by a [`BackoffStrategy`], and any wait ends
//! early when the context is cancelled or its deadline passes. A successful
//! response goes through a [`ResponseGate`] that decides whether the body is
//! read, and then through an optional [`BodyDecoder`] into a caller target.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use reqloop::prelude::{Client, Context, ExponentialBackoff, SkipOnClientOrServerError};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Default, Deserialize)]
//! struct Item {
//!     id: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .client_name("my-sdk")
//!         .max_retries(3)
//!         .backoff_strategy(ExponentialBackoff::new(Duration::from_millis(100), 2))
//!         .response_gate(SkipOnClientOrServerError)
//!         .try_build()?;
//!
//!     let context = Context::with_timeout(Duration::from_secs(5));
//!     let mut item = Item::default();
//!     let response = client
//!         .get(&context, "https://api.example.com/v1/items/1", Some(&mut item))
//!         .await?;
//!
//!     println!("status={} id={}", response.status(), item.id);
//!     Ok(())
//! }
//! ```
//!
//! # Defaults
//!
//! - No retries, zero backoff.
//! - Every successful response is read and decoded as JSON.
//! - Response bodies larger than 8 MiB fail to decode.
//! - The executor is [`HyperExecutor`] when the `hyper-executor` feature is on.

mod backoff;
mod client;
mod config;
mod context;
mod decode;
mod error;
mod executor;
mod gate;
mod metrics;
mod observe;
mod request;
mod response;
mod retry;
mod util;

pub use crate::backoff::{BackoffStrategy, ConstantBackoff, ExponentialBackoff};
pub use crate::client::{Client, ClientBuilder};
pub use crate::config::{BackoffConfig, ClientConfig, GateConfig};
pub use crate::context::{Context, ContextError};
pub use crate::decode::{BodyDecoder, DecodeError, DecoderKind, JsonDecoder};
pub use crate::error::{BoxError, Error, ErrorCode};
#[cfg(feature = "hyper-executor")]
pub use crate::executor::HyperExecutor;
pub use crate::executor::RequestExecutor;
pub use crate::gate::{AlwaysRead, ResponseGate, SkipOnClientOrServerError};
pub use crate::metrics::ClientMetricsSnapshot;
pub use crate::observe::{AttemptContext, NoopObserver, RetryObserver};
pub use crate::request::{FORM_URLENCODED, Request, RequestBuilder};
pub use crate::response::{Response, ResponseBody};
pub use crate::retry::RetryPolicy;

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    #[cfg(feature = "hyper-executor")]
    pub use crate::HyperExecutor;
    pub use crate::{
        AlwaysRead, BackoffStrategy, BodyDecoder, Client, ClientBuilder, ClientConfig,
        ClientMetricsSnapshot, ConstantBackoff, Context, ContextError, DecodeError, Error,
        ErrorCode, ExponentialBackoff, JsonDecoder, Request, RequestBuilder, RequestExecutor,
        Response, ResponseGate, Result, RetryObserver, RetryPolicy, SkipOnClientOrServerError,
    };
}
