pub mod endpoint;
pub mod error;
pub mod request;
pub mod response;
pub mod retry;
pub mod transport;
pub mod validate;

use crate::events::{Event, EventKind, EventSink};
use crate::model::{self, Credentials, Device, StationId, Token};
pub use error::{Error, Failure};
use request::{Call, DeviceDataRequest, StationListRequest, StationRequest, TokenRequest};
use response::device_list::{self, DeviceList};
use response::station_list::StationList;
use response::Entries;
use response::token::TokenResponse;
pub use retry::RetryPolicy;
use serde::Serialize;
use serde_json::Value;
use std::cell::Cell;
use std::time::Duration;
pub use transport::{HttpTransport, Transport};
use validate::Verdict;

/// Unauthenticated handle on one vendor API host.
pub struct Api<'a, T: Transport> {
    transport: T,
    base_url: String,
    sink: &'a dyn EventSink,
    retry: RetryPolicy,
    timeout: Duration,
    account_locked: Cell<bool>,
}

/// Api handle carrying a session token.
pub struct LoggedInApi<'a, T: Transport> {
    api: Api<'a, T>,
    token: Token,
}

impl<'a, T: Transport> Api<'a, T> {
    pub fn new(transport: T, url: &str, sink: &'a dyn EventSink) -> Self {
        Api {
            transport,
            base_url: endpoint::base_url(url),
            sink,
            retry: RetryPolicy::default(),
            timeout: request::DEFAULT_TIMEOUT,
            account_locked: Cell::new(false),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sink(&self) -> &'a dyn EventSink {
        self.sink
    }

    /// Whether any call so far carried the vendor "application locked" code.
    pub fn account_locked(&self) -> bool {
        self.account_locked.get()
    }

    /// Retry, send, validate. The body is returned even when the vendor flags it unsuccessful.
    async fn post(
        &self,
        operation: &'static str,
        url: String,
        token: Option<&Token>,
        body: &impl Serialize,
    ) -> Result<(Value, Verdict), Error> {
        let mut call = Call::new(url, body)?.timeout(self.timeout);
        if let Some(token) = token {
            call = call.bearer(token);
        }

        let value = self
            .retry
            .execute(operation, self.sink, || self.transport.send(&call))
            .await?;

        let verdict = validate::check(operation, &value, self.sink);
        if verdict == Verdict::AccountLocked {
            self.account_locked.set(true);
        }
        Ok((value, verdict))
    }

    /// Obtain a bearer token. Any failure here is fatal for the session.
    pub async fn login(self, credentials: &Credentials) -> Result<LoggedInApi<'a, T>, Error> {
        self.sink.emit(Event::info(
            EventKind::TokenRequested,
            format!("Requesting token for {}", credentials.username),
        ));

        let url = TokenRequest::url(&self.base_url, credentials);
        let (value, verdict) = self
            .post("token", url, None, &TokenRequest::new(credentials))
            .await
            .map_err(|e| Error::FatalInit(format!("Unable to fetch token: {}", e)))?;

        let token = serde_json::from_value::<TokenResponse>(value)
            .ok()
            .and_then(|response| response.access_token)
            .filter(|token| !token.is_empty())
            .map(Token::new)
            .ok_or_else(|| match verdict.into_error() {
                Some(e) => Error::FatalInit(format!("No access_token received: {}", e)),
                None => Error::FatalInit(String::from("No access_token received")),
            })?;

        self.sink
            .emit(Event::info(EventKind::TokenAcquired, "Received token"));
        Ok(LoggedInApi { api: self, token })
    }
}

impl<'a, T: Transport> LoggedInApi<'a, T> {
    pub fn sink(&self) -> &'a dyn EventSink {
        self.api.sink
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn account_locked(&self) -> bool {
        self.api.account_locked()
    }

    async fn post(
        &self,
        operation: &'static str,
        endpoint: &endpoint::Endpoint,
        query: Option<&str>,
        body: &impl Serialize,
    ) -> Result<Value, Error> {
        let url = request::url(&self.api.base_url, endpoint, query);
        self.api
            .post(operation, url, Some(&self.token), body)
            .await
            .map(|(value, _)| value)
    }

    /// Usable list entries; the rest are reported and dropped.
    fn keep<E>(&self, operation: &'static str, entries: Entries<E>) -> Vec<E> {
        if entries.skipped > 0 {
            self.sink().emit(
                Event::warn(
                    EventKind::MalformedEntries,
                    format!("{}: skipped {} unusable entries", operation, entries.skipped),
                )
                .with("kept", entries.items.len()),
            );
        }
        entries.items
    }

    /// Station ids visible to the account, in vendor order.
    pub async fn stations(&self) -> Result<Vec<StationId>, Error> {
        self.sink().emit(Event::info(
            EventKind::StationListRequested,
            "Requesting station list",
        ));
        self.post(
            "station_list",
            endpoint::STATIONS,
            None,
            &StationListRequest::default(),
        )
        .await
        .map(serde_json::from_value::<StationList>)?
        .or(Err(Error::UnexpectedResponse("station_list")))
        .map(|response| {
            self.keep("station_list", response.stations())
                .into_iter()
                .map(|station| station.id)
                .collect()
        })
    }

    /// Devices attached to `station_id`.
    pub async fn devices(&self, station_id: StationId) -> Result<Vec<device_list::Data>, Error> {
        self.sink().emit(
            Event::info(EventKind::DeviceListRequested, "Requesting device list")
                .with("station_id", station_id),
        );
        self.post(
            "station_devices",
            endpoint::STATION_DEVICES,
            None,
            &StationRequest { station_id },
        )
        .await
        .map(serde_json::from_value::<DeviceList>)?
        .or(Err(Error::UnexpectedResponse("station_devices")))
        .map(|response| self.keep("station_devices", response.devices()))
    }

    /// Station realtime data, returned as the vendor sent it.
    pub async fn station_realtime(&self, station_id: StationId) -> Result<Value, Error> {
        self.post(
            "station_realtime",
            endpoint::STATION_REALTIME,
            Some("language=en"),
            &StationRequest { station_id },
        )
        .await
    }

    /// Current data of one device, addressed by serial and, when known, by id.
    pub async fn device_current_data(&self, device: &Device) -> Result<Value, Error> {
        let operation = match device.kind {
            model::DeviceKind::Inverter => "inverter_current_data",
            model::DeviceKind::Logger => "logger_current_data",
            model::DeviceKind::Meter => "meter_current_data",
        };
        self.post(
            operation,
            endpoint::DEVICE_CURRENT_DATA,
            Some("language=en"),
            &DeviceDataRequest::for_device(device),
        )
        .await
    }
}
