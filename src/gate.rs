use crate::response::Response;

/// Decides whether a successful response's body is read and decoded.
///
/// Gates see response metadata only; reading the body needs ownership or a
/// mutable borrow, neither of which a gate receives. When a gate answers
/// `false` the caller gets the response back with its body still open.
pub trait ResponseGate: Send + Sync {
    fn should_read(&self, response: Option<&Response>) -> bool;
}

impl<F> ResponseGate for F
where
    F: Fn(Option<&Response>) -> bool + Send + Sync,
{
    fn should_read(&self, response: Option<&Response>) -> bool {
        self(response)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysRead;

impl ResponseGate for AlwaysRead {
    fn should_read(&self, response: Option<&Response>) -> bool {
        response.is_some()
    }
}

/// Leaves the body of any 4xx or 5xx response unread.
#[derive(Clone, Copy, Debug, Default)]
pub struct SkipOnClientOrServerError;

impl ResponseGate for SkipOnClientOrServerError {
    fn should_read(&self, response: Option<&Response>) -> bool {
        response.is_some_and(|response| response.status().as_u16() < 400)
    }
}
