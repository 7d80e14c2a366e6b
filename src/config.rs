//! Declarative client settings.
//!
//! [`ClientConfig`] deserializes from any serde format and resolves into a
//! [`ClientBuilder`], so an executor or observer can still be injected before
//! the client is built.

use std::time::Duration;

use serde::Deserialize;

use crate::backoff::{ConstantBackoff, ExponentialBackoff};
use crate::client::{Client, ClientBuilder, DEFAULT_CLIENT_NAME, DEFAULT_MAX_RESPONSE_BODY_BYTES};
use crate::decode::{DecoderKind, JsonDecoder};
use crate::gate::{AlwaysRead, SkipOnClientOrServerError};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub client_name: String,
    pub max_retries: u32,
    pub backoff: BackoffConfig,
    pub response_gate: GateConfig,
    /// `null` turns decoding off.
    pub decoder: Option<DecoderKind>,
    pub max_response_body_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_owned(),
            max_retries: 0,
            backoff: BackoffConfig::default(),
            response_gate: GateConfig::default(),
            decoder: Some(DecoderKind::Json),
            max_response_body_bytes: DEFAULT_MAX_RESPONSE_BODY_BYTES,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffConfig {
    Constant {
        #[serde(default)]
        interval_ms: u64,
    },
    Exponential {
        interval_ms: u64,
        base: u32,
    },
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::Constant { interval_ms: 0 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateConfig {
    #[default]
    AlwaysRead,
    SkipOnClientOrServerError,
}

impl ClientConfig {
    pub fn into_builder(self) -> ClientBuilder<JsonDecoder> {
        let mut builder = Client::builder()
            .client_name(self.client_name)
            .max_retries(self.max_retries)
            .max_response_body_bytes(self.max_response_body_bytes);

        builder = match self.backoff {
            BackoffConfig::Constant { interval_ms } => {
                builder.backoff_strategy(ConstantBackoff::new(Duration::from_millis(interval_ms)))
            }
            BackoffConfig::Exponential { interval_ms, base } => builder.backoff_strategy(
                ExponentialBackoff::new(Duration::from_millis(interval_ms), base),
            ),
        };

        builder = match self.response_gate {
            GateConfig::AlwaysRead => builder.response_gate(AlwaysRead),
            GateConfig::SkipOnClientOrServerError => {
                builder.response_gate(SkipOnClientOrServerError)
            }
        };

        match self.decoder {
            Some(DecoderKind::Json) => builder.body_decoder(JsonDecoder::new()),
            None => builder.without_body_decoder(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{BackoffConfig, ClientConfig, GateConfig};
    use crate::backoff::BackoffStrategy;
    use crate::decode::DecoderKind;
    use crate::executor::RequestExecutor;
    use crate::request::Request;
    use crate::response::Response;

    struct NeverCalled;

    #[async_trait::async_trait]
    impl RequestExecutor for NeverCalled {
        async fn execute(&self, _request: &Request) -> Result<Response, crate::BoxError> {
            Err("executor should not be called".into())
        }
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config: ClientConfig = serde_json::from_str("{}").expect("empty config should parse");
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.client_name, "reqloop");
        assert_eq!(config.decoder, Some(DecoderKind::Json));
        assert_eq!(config.max_response_body_bytes, 8 * 1024 * 1024);
    }

    #[test]
    fn full_document_parses() {
        let config: ClientConfig = serde_json::from_str(
            r#"{
                "client_name": "billing",
                "max_retries": 3,
                "backoff": { "kind": "exponential", "interval_ms": 100, "base": 2 },
                "response_gate": "skip_on_client_or_server_error",
                "decoder": null,
                "max_response_body_bytes": 1024
            }"#,
        )
        .expect("config should parse");

        assert_eq!(config.client_name, "billing");
        assert_eq!(config.max_retries, 3);
        assert_eq!(
            config.backoff,
            BackoffConfig::Exponential {
                interval_ms: 100,
                base: 2
            }
        );
        assert_eq!(config.response_gate, GateConfig::SkipOnClientOrServerError);
        assert_eq!(config.decoder, None);
    }

    #[test]
    fn unknown_fields_and_decoders_are_rejected() {
        let error = serde_json::from_str::<ClientConfig>(r#"{ "retries": 3 }"#)
            .expect_err("unknown field should be rejected");
        assert!(error.to_string().contains("retries"));

        let error = serde_json::from_str::<ClientConfig>(r#"{ "decoder": "xml" }"#)
            .expect_err("unknown decoder should be rejected");
        assert!(error.to_string().contains("unknown body decoder: xml"));

        let config: ClientConfig = serde_json::from_str(r#"{ "decoder": "JSON" }"#)
            .expect("decoder names are case-insensitive");
        assert_eq!(config.decoder, Some(DecoderKind::Json));
    }

    #[test]
    fn into_builder_applies_settings() {
        let config = ClientConfig {
            client_name: "inventory".to_owned(),
            max_retries: 2,
            backoff: BackoffConfig::Exponential {
                interval_ms: 100,
                base: 2,
            },
            ..ClientConfig::default()
        };
        let client = config.into_builder().executor(NeverCalled).build();

        assert_eq!(client.client_name(), "inventory");
        assert_eq!(client.retry_policy().max_retries(), 2);
        assert_eq!(
            client.retry_policy().backoff().interval_for_retry(2),
            Duration::from_millis(400)
        );
    }
}
