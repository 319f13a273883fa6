use super::error::Error;
use super::response::{Envelope, FailCode};
use crate::events::{Event, EventKind, EventSink, Level};
use serde_json::Value;

/// What the vendor said about a parsed body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Empty,
    Success,
    /// Application locked or rate-limited at account level. No cooldown is applied here; the
    /// caller decides whether to suspend polling.
    AccountLocked,
    /// Non-success code; the body may still carry usable data.
    VendorError { code: String, message: String },
}

impl Verdict {
    /// The vendor-signalled error, if any. Empty bodies carry no vendor code.
    pub fn into_error(self) -> Option<Error> {
        match self {
            Verdict::Empty | Verdict::Success => None,
            Verdict::AccountLocked => Some(Error::VendorSignaled {
                code: (FailCode::AppLocked as u64).to_string(),
                message: String::from("application locked"),
            }),
            Verdict::VendorError { code, message } => Some(Error::VendorSignaled { code, message }),
        }
    }
}

/// Inspect a body for vendor-level success or error signalling. Never fails the call.
pub fn check(operation: &'static str, body: &Value, sink: &dyn EventSink) -> Verdict {
    let empty = match body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if empty {
        sink.emit(Event::warn(
            EventKind::EmptyResponse,
            format!("{} returned an empty response", operation),
        ));
        return Verdict::Empty;
    }

    let envelope = Envelope::from_value(body);
    if envelope.success == Some(true) {
        return Verdict::Success;
    }

    let message = envelope
        .msg
        .clone()
        .unwrap_or_else(|| String::from("(no error message received)"));

    match envelope.fail_code() {
        Some(FailCode::AppLocked) => {
            sink.emit(
                Event::new(
                    Level::Critical,
                    EventKind::AccountLocked,
                    format!("{}: application locked by vendor: {}", operation, message),
                )
                .with("code", envelope.code_text()),
            );
            Verdict::AccountLocked
        }
        None => {
            let code = envelope.code_text();
            sink.emit(
                Event::warn(
                    EventKind::VendorError,
                    format!("{} unsuccessful: {}", operation, message),
                )
                .with("code", &code)
                .with("request_id", envelope.request_id.as_deref().unwrap_or("-")),
            );
            Verdict::VendorError { code, message }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::events::MemorySink;
    use serde_json::json;

    #[test]
    fn empty_body_warns() {
        let sink = MemorySink::new();
        assert_eq!(Verdict::Empty, check("token", &Value::Null, &sink));
        assert_eq!(Verdict::Empty, check("token", &json!({}), &sink));
        assert_eq!(2, sink.of_kind(EventKind::EmptyResponse).len());
    }

    #[test]
    fn success_is_silent() {
        let sink = MemorySink::new();
        let verdict = check("station_list", &json!({"success": true, "code": null}), &sink);
        assert_eq!(Verdict::Success, verdict);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn locked_application_is_critical() {
        let sink = MemorySink::new();
        let body = json!({"code": "2101009", "msg": "appId is locked", "success": false});
        assert_eq!(Verdict::AccountLocked, check("token", &body, &sink));

        let events = sink.of_kind(EventKind::AccountLocked);
        assert_eq!(1, events.len());
        assert_eq!(Level::Critical, events[0].level);
        assert_eq!(Some("2101009"), events[0].field("code"));
    }

    #[test]
    fn other_codes_warn_with_message() {
        let sink = MemorySink::new();
        let body = json!({"code": "2101019", "msg": "device not found", "success": false});
        assert_eq!(
            Verdict::VendorError {
                code: String::from("2101019"),
                message: String::from("device not found"),
            },
            check("device_current_data", &body, &sink)
        );
        let events = sink.of_kind(EventKind::VendorError);
        assert_eq!(Level::Warn, events[0].level);
        assert_eq!(Some("2101019"), events[0].field("code"));
    }

    #[test]
    fn missing_success_flag_is_not_success() {
        let sink = MemorySink::new();
        let verdict = check("station_realtime", &json!({"generationPower": 450}), &sink);
        assert!(matches!(verdict, Verdict::VendorError { .. }));
    }

    #[test]
    fn vendor_codes_become_errors() {
        let verdict = Verdict::VendorError {
            code: String::from("2101003"),
            message: String::from("wrong password"),
        };
        assert_eq!(
            "vendor error 2101003: wrong password",
            verdict.into_error().unwrap().to_string()
        );
        assert!(matches!(
            Verdict::AccountLocked.into_error(),
            Some(Error::VendorSignaled { code, .. }) if code == "2101009"
        ));
        assert!(Verdict::Success.into_error().is_none());
        assert!(Verdict::Empty.into_error().is_none());
    }
}
