use super::endpoint::{self, Endpoint};
use super::Error;
use crate::model::{Credentials, Device, StationId, Token};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the transport needs to issue one POST.
#[derive(Debug, Clone)]
pub struct Call<'a> {
    pub url: String,
    pub token: Option<&'a Token>,
    pub body: Value,
    pub timeout: Duration,
}

impl<'a> Call<'a> {
    pub fn new(url: String, body: &impl Serialize) -> Result<Self, Error> {
        let body = serde_json::to_value(body).map_err(|e| Error::Encode(e.to_string()))?;
        Ok(Call {
            url,
            token: None,
            body,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn bearer(mut self, token: &'a Token) -> Self {
        self.token = Some(token);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub fn url(base_url: &str, endpoint: &Endpoint, query: Option<&str>) -> String {
    match query {
        Some(query) => format!("{}{}?{}", base_url, endpoint, query),
        None => format!("{}{}", base_url, endpoint),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub app_secret: String,
    pub email: String,
    pub password: String,
}

impl TokenRequest {
    pub fn new(credentials: &Credentials) -> Self {
        TokenRequest {
            app_secret: credentials.app_secret.to_owned(),
            email: credentials.username.to_owned(),
            password: credentials.password_hash.to_owned(),
        }
    }

    pub fn url(base_url: &str, credentials: &Credentials) -> String {
        let query = format!("appId={}&language=en", credentials.app_id);
        url(base_url, endpoint::TOKEN, Some(&query))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StationListRequest {
    pub page: u32,
    pub size: u32,
}

impl Default for StationListRequest {
    fn default() -> Self {
        StationListRequest { page: 1, size: 50 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationRequest {
    pub station_id: StationId,
}

/// Unresolved devices are addressed by serial alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDataRequest {
    pub device_sn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<u64>,
}

impl DeviceDataRequest {
    pub fn for_device(device: &Device) -> Self {
        DeviceDataRequest {
            device_sn: device.serial.to_owned(),
            device_id: Some(device.id).filter(|_| device.is_resolved()),
        }
    }
}
