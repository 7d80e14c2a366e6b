#![cfg(feature = "hyper-executor")]

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use reqloop::prelude::{
    Client, ConstantBackoff, Context, DecodeError, Error, ErrorCode, SkipOnClientOrServerError,
};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
struct MockResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl MockResponse {
    fn new(
        status: u16,
        headers: Vec<(impl Into<String>, impl Into<String>)>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            status,
            headers: headers
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
            body: body.into().into_bytes(),
        }
    }

    fn json(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, vec![("Content-Type", "application/json")], body)
    }
}

#[derive(Clone, Debug)]
struct CapturedRequest {
    method: String,
    path: String,
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
}

struct MockServer {
    base_url: String,
    served: Arc<AtomicUsize>,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    join: Option<JoinHandle<()>>,
}

impl MockServer {
    fn start(responses: Vec<MockResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let address = listener.local_addr().expect("read local address");
        listener
            .set_nonblocking(true)
            .expect("set listener nonblocking");

        let served = Arc::new(AtomicUsize::new(0));
        let captured = Arc::new(Mutex::new(Vec::new()));
        let served_clone = Arc::clone(&served);
        let captured_clone = Arc::clone(&captured);

        let join = thread::spawn(move || {
            let deadline = std::time::Instant::now() + Duration::from_secs(2);
            let mut response_index = 0;

            while response_index < responses.len() && std::time::Instant::now() < deadline {
                match listener.accept() {
                    Ok((mut stream, _)) => {
                        let _ = stream.set_nonblocking(false);
                        if let Ok(request) = read_request(&mut stream) {
                            captured_clone
                                .lock()
                                .expect("lock captured requests")
                                .push(request);
                        }

                        served_clone.fetch_add(1, Ordering::SeqCst);
                        let response = &responses[response_index];
                        response_index += 1;
                        let _ = write_response(&mut stream, response);
                    }
                    Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            base_url: format!("http://{address}"),
            served,
            captured,
            join: Some(join),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn requests(&self) -> Vec<CapturedRequest> {
        self.captured
            .lock()
            .expect("lock captured requests")
            .clone()
    }

    fn served_count(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn read_request(stream: &mut TcpStream) -> std::io::Result<CapturedRequest> {
    stream.set_read_timeout(Some(Duration::from_secs(1)))?;

    let mut raw = Vec::new();
    loop {
        let mut chunk = [0_u8; 1024];
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..read]);
        if find_header_end(&raw).is_some() {
            break;
        }
    }

    let header_end = find_header_end(&raw).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "malformed request without header terminator",
        )
    })?;

    let header_text = String::from_utf8_lossy(&raw[..header_end]);
    let mut lines = header_text.split("\r\n");
    let request_line = lines.next().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, "missing request line")
    })?;
    let mut request_line_parts = request_line.split_whitespace();
    let method = request_line_parts.next().unwrap_or_default().to_owned();
    let path = request_line_parts.next().unwrap_or_default().to_owned();

    let mut headers = BTreeMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_owned());
        }
    }

    let content_length = headers
        .get("content-length")
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = raw[header_end + 4..].to_vec();
    while body.len() < content_length {
        let mut chunk = [0_u8; 1024];
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..read]);
    }
    body.truncate(content_length);

    Ok(CapturedRequest {
        method,
        path,
        headers,
        body,
    })
}

fn write_response(stream: &mut TcpStream, response: &MockResponse) -> std::io::Result<()> {
    let body = &response.body;
    let mut raw = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        response.status,
        status_text(response.status),
        body.len()
    );
    for (name, value) in &response.headers {
        raw.push_str(name);
        raw.push_str(": ");
        raw.push_str(value);
        raw.push_str("\r\n");
    }
    raw.push_str("\r\n");

    stream.write_all(raw.as_bytes())?;
    stream.write_all(body)?;
    stream.flush()
}

fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|window| window == b"\r\n\r\n")
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

fn context() -> Context {
    Context::with_timeout(Duration::from_secs(5))
}

#[derive(Debug, Default, Deserialize, PartialEq)]
struct Item {
    id: u64,
    name: String,
}

#[derive(Serialize)]
struct NewItem<'a> {
    name: &'a str,
    qty: u32,
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn get_decodes_json_into_target() {
    let server = MockServer::start(vec![MockResponse::json(200, r#"{"id":1,"name":"widget"}"#)]);
    let client = Client::builder().build();

    let mut item = Item::default();
    let response = client
        .get(&context(), &server.url("/v1/items/1"), Some(&mut item))
        .await
        .expect("get should succeed");

    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok()),
        Some("application/json")
    );
    assert_eq!(
        item,
        Item {
            id: 1,
            name: "widget".to_owned()
        }
    );

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/v1/items/1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn head_returns_metadata_only() {
    let server = MockServer::start(vec![MockResponse::new(
        200,
        vec![("X-Item-Count", "3")],
        "",
    )]);
    let client = Client::builder().without_body_decoder().build();

    let response = client
        .head(&context(), &server.url("/v1/items"), None::<&mut Item>)
        .await
        .expect("head should succeed");

    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("x-item-count")
            .and_then(|value| value.to_str().ok()),
        Some("3")
    );
    assert!(!response.has_body());
    assert_eq!(server.requests()[0].method, "HEAD");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn post_sends_content_type_and_body() {
    let server = MockServer::start(vec![MockResponse::json(201, r#"{"id":9,"name":"gear"}"#)]);
    let client = Client::builder().build();

    let mut created = Item::default();
    let response = client
        .post(
            &context(),
            &server.url("/v1/items"),
            "application/json",
            r#"{"name":"gear"}"#,
            Some(&mut created),
        )
        .await
        .expect("post should succeed");

    assert_eq!(response.status(), 201);
    assert_eq!(created.id, 9);

    let request = &server.requests()[0];
    assert_eq!(request.method, "POST");
    assert_eq!(
        request.headers.get("content-type").map(String::as_str),
        Some("application/json")
    );
    assert_eq!(request.body, br#"{"name":"gear"}"#);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn post_form_encodes_fields() {
    let server = MockServer::start(vec![MockResponse::json(200, r#"{"id":2,"name":"bolt"}"#)]);
    let client = Client::builder().build();

    let mut item = Item::default();
    client
        .post_form(
            &context(),
            &server.url("/v1/items"),
            &NewItem {
                name: "hex bolt",
                qty: 2,
            },
            Some(&mut item),
        )
        .await
        .expect("form post should succeed");

    let request = &server.requests()[0];
    assert_eq!(request.method, "POST");
    assert_eq!(
        request.headers.get("content-type").map(String::as_str),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(request.body, b"name=hex+bolt&qty=2");
    assert_eq!(item.name, "bolt");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn error_statuses_are_returned_unread_and_not_retried() {
    let server = MockServer::start(vec![MockResponse::new(
        500,
        vec![("Content-Type", "text/plain")],
        "database unavailable",
    )]);
    let client = Client::builder()
        .max_retries(3)
        .response_gate(SkipOnClientOrServerError)
        .build();

    let mut item = Item::default();
    let mut response = client
        .get(&context(), &server.url("/v1/items/1"), Some(&mut item))
        .await
        .expect("status codes are not executor failures");

    assert_eq!(response.status(), 500);
    assert_eq!(item, Item::default());
    let body = response
        .bytes()
        .await
        .expect("body should still be readable")
        .expect("body should be present");
    assert_eq!(body.as_ref(), b"database unavailable");
    assert_eq!(server.served_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn oversized_body_is_a_decode_error_with_response() {
    let server = MockServer::start(vec![MockResponse::json(
        200,
        r#"{"id":3,"name":"a very long name"}"#,
    )]);
    let client = Client::builder().max_response_body_bytes(8).build();

    let mut item = Item::default();
    let error = client
        .get(&context(), &server.url("/v1/items/3"), Some(&mut item))
        .await
        .expect_err("body exceeds the limit");

    match &error {
        Error::Decode { source, response } => {
            assert!(matches!(
                source,
                DecodeError::TooLarge { limit_bytes: 8, .. }
            ));
            assert_eq!(response.status(), 200);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(item, Item::default());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn refused_connections_are_retried_until_budget_is_spent() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
    let address = listener.local_addr().expect("read probe address");
    drop(listener);

    let client = Client::builder()
        .max_retries(2)
        .backoff_strategy(ConstantBackoff::new(Duration::from_millis(10)))
        .build();

    let error = client
        .get(
            &context(),
            &format!("http://{address}/v1/items"),
            None::<&mut Item>,
        )
        .await
        .expect_err("nothing is listening");

    assert_eq!(error.code(), ErrorCode::Executor);
    assert_eq!(error.attempts(), 3);
    assert!(error.context_error().is_none());
    assert_eq!(client.metrics_snapshot().retries, 2);
}
