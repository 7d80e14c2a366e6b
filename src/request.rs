use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, Method, Uri};
use serde::Serialize;

use crate::Result;
use crate::context::Context;
use crate::error::Error;
use crate::util::{parse_header_name, parse_header_value, parse_uri};

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// One executable request together with the context that bounds it.
///
/// The body is buffered so every retry re-sends identical bytes.
#[derive(Clone, Debug)]
pub struct Request {
    context: Context,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Request {
    pub fn new(context: Context, method: Method, uri: Uri) -> Self {
        Self {
            context,
            method,
            uri,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn try_new(context: Context, method: Method, uri: &str) -> Result<Self> {
        Ok(Self::new(context, method, parse_uri(uri)?))
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn try_header(self, name: &str, value: &str) -> Result<Self> {
        let name = parse_header_name(name)?;
        let value = parse_header_value(name.as_str(), value)?;
        Ok(self.header(name, value))
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}

/// Builds verb-specific requests.
///
/// Every builder rejects a context without a deadline before touching the URI,
/// so a request that could run unbounded never exists.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestBuilder;

impl RequestBuilder {
    pub fn build_get_request(&self, context: &Context, uri: &str) -> Result<Request> {
        self.build(context, Method::GET, uri)
    }

    pub fn build_head_request(&self, context: &Context, uri: &str) -> Result<Request> {
        self.build(context, Method::HEAD, uri)
    }

    pub fn build_post_request(
        &self,
        context: &Context,
        uri: &str,
        content_type: &str,
        body: impl Into<Bytes>,
    ) -> Result<Request> {
        ensure_deadline(context)?;
        let content_type = parse_header_value(CONTENT_TYPE.as_str(), content_type)?;
        let request = self.build(context, Method::POST, uri)?;
        Ok(request.header(CONTENT_TYPE, content_type).body(body))
    }

    pub fn build_post_form_request<T>(
        &self,
        context: &Context,
        uri: &str,
        form: &T,
    ) -> Result<Request>
    where
        T: Serialize + ?Sized,
    {
        ensure_deadline(context)?;
        let encoded =
            serde_urlencoded::to_string(form).map_err(|source| Error::SerializeForm { source })?;
        self.build_post_request(context, uri, FORM_URLENCODED, encoded)
    }

    fn build(&self, context: &Context, method: Method, uri: &str) -> Result<Request> {
        ensure_deadline(context)?;
        Request::try_new(context.clone(), method, uri)
    }
}

pub(crate) fn ensure_deadline(context: &Context) -> Result<()> {
    if context.has_deadline() {
        Ok(())
    } else {
        Err(Error::MissingDeadline)
    }
}
