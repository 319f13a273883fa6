//! Turns a [`PollData`] into MQTT topic suffixes and payloads.

use crate::events::{Event, EventKind, EventSink};
use crate::reshape::{self, Attributes};
use crate::session::PollData;
use serde_json::Value;
use thiserror::Error;

/// Bookkeeping keys of the vendor envelope, never published.
const DISCARD: [&str; 4] = ["code", "msg", "requestId", "success"];

pub const ONLINE: i64 = 1;
/// Reported when the vendor has no valid state for the device.
pub const NO_DATA: i64 = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub suffix: String,
    pub payload: String,
}

impl Message {
    fn new(suffix: String, payload: String) -> Self {
        Message { suffix, payload }
    }
}

#[derive(Debug, Error)]
#[error("publish to {topic} failed: {reason}")]
pub struct PublishError {
    pub topic: String,
    pub reason: String,
}

/// Decouples topic construction from the MQTT client.
pub trait Publisher {
    fn publish(&mut self, suffix: &str, payload: &str) -> Result<(), PublishError>;
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn payload(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_owned(),
        other => other.to_string(),
    }
}

fn device_state(data: Option<&Value>) -> i64 {
    data.and_then(|v| v.get("deviceState"))
        .and_then(Value::as_i64)
        .unwrap_or(NO_DATA)
}

/// `/<group>/<key>` for every truthy top-level field of `data`.
fn fields(group: &str, data: Option<&Value>, discard: &[&str]) -> Vec<Message> {
    data.and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter(|(key, value)| is_truthy(value) && !discard.contains(&key.as_str()))
                .map(|(key, value)| Message::new(format!("/{}/{}", group, key), payload(value)))
                .collect()
        })
        .unwrap_or_default()
}

fn attributes(group: &str, attributes: &Attributes) -> Message {
    Message::new(
        format!("/{}/attributes", group),
        Value::Object(attributes.clone()).to_string(),
    )
}

fn flatten(data: &mut Option<Value>) -> Attributes {
    data.as_mut().map(reshape::flatten).unwrap_or_default()
}

/// Build the messages for one poll.
///
/// The inverter `deviceState` decides how much goes out: everything when online, nothing when
/// the vendor has no data, and only the device states otherwise (typically a night-time
/// shutdown). An online meter is published on its own.
pub fn messages(mut data: PollData, sink: &dyn EventSink) -> Vec<Message> {
    let inverter_attributes = flatten(&mut data.inverter);
    let logger_attributes = flatten(&mut data.logger);
    let meter_attributes = flatten(&mut data.meter);

    let mut messages = Vec::new();

    let meter_state = device_state(data.meter.as_ref());
    if data.meter.is_some() && meter_state == ONLINE {
        sink.emit(
            Event::info(EventKind::Publishing, "Meter online, publishing")
                .with("device_state", meter_state),
        );
        messages.extend(fields("meter", data.meter.as_ref(), &[]));
        messages.push(attributes("meter", &meter_attributes));
    }

    let inverter_state = device_state(data.inverter.as_ref());
    match inverter_state {
        ONLINE => {
            sink.emit(
                Event::info(EventKind::Publishing, "Inverter online, publishing")
                    .with("device_state", inverter_state),
            );
            messages.extend(fields("station", data.station_realtime.as_ref(), &DISCARD));
            messages.extend(fields("inverter", data.inverter.as_ref(), &DISCARD));
            messages.push(attributes("inverter", &inverter_attributes));
            messages.extend(fields("logger", data.logger.as_ref(), &DISCARD));
            messages.push(attributes("logger", &logger_attributes));
        }
        NO_DATA => sink.emit(
            Event::info(
                EventKind::NothingToPublish,
                "No valid inverter status data available",
            )
            .with("device_state", inverter_state),
        ),
        _ => {
            sink.emit(
                Event::info(
                    EventKind::Publishing,
                    "Inverter probably offline, publishing device state only",
                )
                .with("device_state", inverter_state),
            );
            messages.push(Message::new(
                String::from("/inverter/deviceState"),
                inverter_state.to_string(),
            ));
            let logger_state = data
                .logger
                .as_ref()
                .and_then(|v| v.get("deviceState"))
                .map(payload)
                .unwrap_or_else(|| Value::Null.to_string());
            messages.push(Message::new(
                String::from("/logger/deviceState"),
                logger_state,
            ));
        }
    }

    messages
}

/// Hand every message to `publisher`; failures are reported and do not stop the rest.
pub fn publish_all<P: Publisher + ?Sized>(
    publisher: &mut P,
    messages: &[Message],
    sink: &dyn EventSink,
) -> usize {
    let mut published = 0;
    for message in messages {
        match publisher.publish(&message.suffix, &message.payload) {
            Ok(()) => published += 1,
            Err(e) => sink.emit(Event::warn(EventKind::PublishFailed, e.to_string())),
        }
    }
    published
}
