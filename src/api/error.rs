use thiserror::Error;

/// How a single transport call went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("server responded {0}")]
    Http(u16),
    #[error("malformed response body: {0}")]
    MalformedBody(String),
    #[error("transport error: {0}")]
    Other(String),
}

impl Failure {
    /// 429 and 5xx are worth retrying, the rest of 4xx and unparseable bodies are not. Unknown
    /// transport errors are treated as transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Failure::Timeout | Failure::Connection(_) | Failure::Other(_) => true,
            Failure::Http(status) => {
                *status == http::StatusCode::TOO_MANY_REQUESTS.as_u16()
                    || (500..=599).contains(status)
            }
            Failure::MalformedBody(_) => false,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum Error {
    /// No token could be obtained; nothing else in the session can run.
    #[error("fatal initialization failure: {0}")]
    FatalInit(String),
    #[error("transient network failure: {0}")]
    Transient(Failure),
    #[error("{operation} failed: {failure}")]
    Client {
        operation: &'static str,
        failure: Failure,
    },
    #[error("{operation} unavailable after {attempts} attempts: {last}")]
    Unavailable {
        operation: &'static str,
        attempts: u32,
        last: Failure,
    },
    #[error("vendor error {code}: {message}")]
    VendorSignaled { code: String, message: String },
    #[error("unexpected API response for {0}")]
    UnexpectedResponse(&'static str),
    #[error("unable to encode request: {0}")]
    Encode(String),
}

impl Error {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::FatalInit(_))
    }
}
