use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};

use crate::error::BoxError;

/// Single-owner response body stream.
///
/// Dropping the body releases the underlying stream (and the connection behind
/// it, for the default executor).
pub struct ResponseBody {
    inner: BoxBody<Bytes, BoxError>,
}

impl ResponseBody {
    pub fn new<B>(body: B) -> Self
    where
        B: http_body::Body<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        Self {
            inner: body.map_err(Into::into).boxed(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Empty::<Bytes>::new())
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::new(Full::new(bytes.into()))
    }

    pub fn into_inner(self) -> BoxBody<Bytes, BoxError> {
        self.inner
    }

    /// Drains the stream into memory.
    pub async fn bytes(self) -> Result<Bytes, BoxError> {
        Ok(self.inner.collect().await?.to_bytes())
    }

    pub(crate) async fn read_all_limited(self, max_bytes: usize) -> Result<Bytes, ReadBodyError> {
        let mut body = self.inner;
        let mut collected = Vec::new();
        let mut total_len = 0_usize;

        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(ReadBodyError::Read)?;
            if let Some(data) = frame.data_ref() {
                total_len = total_len.saturating_add(data.len());
                if total_len > max_bytes {
                    return Err(ReadBodyError::TooLarge {
                        actual_bytes: total_len,
                    });
                }
                collected.extend_from_slice(data);
            }
        }

        Ok(Bytes::from(collected))
    }
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("ResponseBody").finish_non_exhaustive()
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<String> for ResponseBody {
    fn from(text: String) -> Self {
        Self::from_bytes(text)
    }
}

impl From<&'static str> for ResponseBody {
    fn from(text: &'static str) -> Self {
        Self::from_bytes(text)
    }
}

pub(crate) enum ReadBodyError {
    Read(BoxError),
    TooLarge { actual_bytes: usize },
}

#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<ResponseBody>,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<ResponseBody>) -> Self {
        Self {
            status,
            headers,
            body: Some(body.into()),
        }
    }

    /// A response that never had a body to read.
    pub fn without_body(status: StatusCode, headers: HeaderMap) -> Self {
        Self {
            status,
            headers,
            body: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub fn body_mut(&mut self) -> Option<&mut ResponseBody> {
        self.body.as_mut()
    }

    pub fn take_body(&mut self) -> Option<ResponseBody> {
        self.body.take()
    }

    pub fn into_body(self) -> Option<ResponseBody> {
        self.body
    }

    /// Releases the body stream without reading it.
    pub fn close_body(&mut self) {
        drop(self.body.take());
    }

    /// Drains the body into memory, leaving the response without one.
    pub async fn bytes(&mut self) -> Result<Option<Bytes>, BoxError> {
        match self.body.take() {
            Some(body) => body.bytes().await.map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};

    use super::{ReadBodyError, Response, ResponseBody};

    #[tokio::test]
    async fn body_is_consumed_at_most_once() {
        let mut response = Response::new(StatusCode::OK, HeaderMap::new(), "hello");
        assert!(response.has_body());

        let body = response.bytes().await.expect("body should read");
        assert_eq!(body, Some(Bytes::from_static(b"hello")));
        assert!(!response.has_body());

        let again = response.bytes().await.expect("second read should not fail");
        assert_eq!(again, None);
    }

    #[tokio::test]
    async fn read_all_limited_rejects_oversized_body() {
        let body = ResponseBody::from(vec![0_u8; 32]);
        match body.read_all_limited(16).await {
            Err(ReadBodyError::TooLarge { actual_bytes }) => assert_eq!(actual_bytes, 32),
            Err(ReadBodyError::Read(error)) => panic!("unexpected read error: {error}"),
            Ok(bytes) => panic!("unexpected success with {} bytes", bytes.len()),
        }
    }

    #[test]
    fn close_body_releases_stream() {
        let mut response = Response::new(StatusCode::OK, HeaderMap::new(), ResponseBody::empty());
        response.close_body();
        assert!(!response.has_body());
        assert!(response.into_body().is_none());
    }
}
