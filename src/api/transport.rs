use super::error::Failure;
use super::request::Call;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

/// Issues one POST and classifies the outcome. Implementations hold no per-call state.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, call: &Call<'_>) -> Result<Value, Failure>;
}

impl<T: Transport> Transport for &T {
    async fn send(&self, call: &Call<'_>) -> Result<Value, Failure> {
        (**self).send(call).await
    }
}

/// Map a `reqwest` error that happened before a status was available.
fn map_transport_err(error: reqwest::Error) -> Failure {
    if error.is_timeout() {
        Failure::Timeout
    } else if error.is_connect() {
        Failure::Connection(error.to_string())
    } else {
        match error.status() {
            Some(status) => Failure::Http(status.as_u16()),
            None => Failure::Other(error.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, Failure> {
        reqwest::ClientBuilder::new()
            .build()
            .map(HttpTransport::with_client)
            .map_err(|e| Failure::Other(e.to_string()))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        HttpTransport { client }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, call: &Call<'_>) -> Result<Value, Failure> {
        let mut request = self
            .client
            .post(call.url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .timeout(call.timeout)
            .json(&call.body);
        if let Some(token) = call.token {
            request = request.header(AUTHORIZATION, format!("bearer {}", token.as_str()));
        }

        let response = request.send().await.map_err(map_transport_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Failure::Http(status.as_u16()));
        }

        let text = response.text().await.map_err(map_transport_err)?;
        log::trace!("url: {}, response_text: {}", call.url, text);

        serde_json::from_str::<Value>(&text).map_err(|e| Failure::MalformedBody(e.to_string()))
    }
}
