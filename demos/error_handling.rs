use std::time::Duration;

use reqloop::prelude::{Client, ConstantBackoff, Context, Error, SkipOnClientOrServerError};
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let client = Client::builder()
        .client_name("reqloop-example-error-handling")
        .max_retries(2)
        .backoff_strategy(ConstantBackoff::new(Duration::from_millis(250)))
        .response_gate(SkipOnClientOrServerError)
        .try_build()?;

    let context = Context::with_timeout(Duration::from_secs(5));
    let mut payload = Value::Null;
    match client
        .get(&context, "https://httpbin.org/status/500", Some(&mut payload))
        .await
    {
        Ok(mut response) if response.status().is_server_error() => {
            let body = response.bytes().await?.unwrap_or_default();
            println!(
                "server error left unread by the gate: status={} body_len={}",
                response.status(),
                body.len()
            );
        }
        Ok(response) => {
            println!("status={} payload={payload}", response.status());
        }
        Err(error) => {
            println!("error_code={}", error.code());
            match &error {
                Error::Executor {
                    attempts,
                    interrupted,
                    ..
                } => {
                    println!("executor failed: attempts={attempts} interrupted={interrupted:?}");
                }
                Error::Cancelled { cause } => {
                    println!("context finished before an attempt: {cause}");
                }
                Error::Decode { source, response } => {
                    println!("decode failed: status={} error={source}", response.status());
                }
                other => {
                    println!("other error: {other}");
                }
            }
        }
    }

    Ok(())
}
