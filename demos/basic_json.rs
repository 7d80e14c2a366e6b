use std::time::Duration;

use reqloop::prelude::{Client, Context, ExponentialBackoff, SkipOnClientOrServerError};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct Slideshow {
    title: String,
    author: String,
}

#[derive(Debug, Default, Deserialize)]
struct Document {
    slideshow: Slideshow,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::builder()
        .client_name("reqloop-example-basic-json")
        .max_retries(3)
        .backoff_strategy(ExponentialBackoff::new(Duration::from_millis(100), 2))
        .response_gate(SkipOnClientOrServerError)
        .try_build()?;

    let context = Context::with_timeout(Duration::from_secs(10));
    let mut document = Document::default();
    let response = client
        .get(&context, "https://httpbin.org/json", Some(&mut document))
        .await?;

    println!(
        "status={} title={:?} author={:?}",
        response.status(),
        document.slideshow.title,
        document.slideshow.author
    );
    println!("metrics={:?}", client.metrics_snapshot());
    Ok(())
}
