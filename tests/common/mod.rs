#![allow(dead_code)]

use serde_json::{json, Value};
use solarman_rs::api::request::Call;
use solarman_rs::api::{Failure, RetryPolicy, Transport};
use solarman_rs::model::SiteConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

pub const BASE_URL: &str = "http://solarman.test";
pub const CONFIGURED_STATION: u64 = 111111;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub url: String,
    pub body: Value,
    pub token: Option<String>,
}

/// In-memory transport answering per endpoint path. The last scripted answer for an endpoint
/// repeats; unscripted endpoints answer 404.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<HashMap<&'static str, VecDeque<Result<Value, Failure>>>>,
    calls: Mutex<Vec<Recorded>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, endpoint: &'static str, result: Result<Value, Failure>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .push_back(result);
        self
    }

    pub fn with_token(self) -> Self {
        self.respond(
            solarman_rs::api::endpoint::TOKEN,
            Ok(json!({"success": true, "access_token": "test-token"})),
        )
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, endpoint: &str) -> Vec<Recorded> {
        self.calls()
            .into_iter()
            .filter(|c| c.url.contains(endpoint))
            .collect()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, call: &Call<'_>) -> Result<Value, Failure> {
        self.calls.lock().unwrap().push(Recorded {
            url: call.url.clone(),
            body: call.body.clone(),
            token: call.token.map(|t| t.as_str().to_owned()),
        });

        let mut responses = self.responses.lock().unwrap();
        let queue = responses
            .iter_mut()
            .find(|(endpoint, _)| call.url.contains(*endpoint))
            .map(|(_, queue)| queue);

        match queue {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or(Err(Failure::Http(404))),
            None => Err(Failure::Http(404)),
        }
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(2, Duration::ZERO)
}

pub fn site() -> SiteConfig {
    serde_json::from_value(json!({
        "name": "Test",
        "url": BASE_URL,
        "appid": "123456789012345",
        "secret": "0123456789abcdef0123456789abcdef",
        "username": "someone@example.com",
        "passhash": "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8",
        "stationId": CONFIGURED_STATION,
        "inverterId": "2106123456",
        "loggerId": "4012345678",
        "mqtt": {"broker": "localhost", "topic": "solar/test"}
    }))
    .unwrap()
}

pub fn station_list(ids: &[u64]) -> Value {
    let stations: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "name": format!("station {}", id)}))
        .collect();
    json!({"success": true, "total": ids.len(), "stationList": stations})
}

pub fn device_list(items: &[(&str, &str, u64)]) -> Value {
    let items: Vec<Value> = items
        .iter()
        .map(|(kind, sn, id)| json!({"deviceType": kind, "deviceSn": sn, "deviceId": id}))
        .collect();
    json!({"success": true, "deviceListItems": items})
}

pub fn current_data(state: i64, name: &str, value: &str) -> Value {
    json!({
        "success": true,
        "deviceState": state,
        "dataList": [{"key": "k", "name": name, "value": value}]
    })
}
