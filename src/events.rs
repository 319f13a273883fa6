//! Structured events emitted by the API pipeline.
//!
//! Components never log directly; they hand an [`Event`] to an [`EventSink`]. The daemon wires
//! in [`LogSink`], tests use [`MemorySink`] and assert on [`EventKind`].

use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    /// Vendor-side account problems; there is no `log` level for this, see [`LogSink`].
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TokenRequested,
    TokenAcquired,
    StationListRequested,
    StationResolved,
    StationFallback,
    MultipleStations,
    DeviceListRequested,
    DeviceDiscovered,
    DeviceUnresolved,
    MalformedEntries,
    DataFetched,
    DataUnavailable,
    RequestFailed,
    RetryScheduled,
    RetriesExhausted,
    NonRetryable,
    EmptyResponse,
    VendorError,
    AccountLocked,
    NothingToPublish,
    Publishing,
    PublishFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub level: Level,
    pub kind: EventKind,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl Event {
    pub fn new(level: Level, kind: EventKind, message: impl Into<String>) -> Self {
        Event {
            level,
            kind,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn info(kind: EventKind, message: impl Into<String>) -> Self {
        Self::new(Level::Info, kind, message)
    }

    pub fn warn(kind: EventKind, message: impl Into<String>) -> Self {
        Self::new(Level::Warn, kind, message)
    }

    pub fn error(kind: EventKind, message: impl Into<String>) -> Self {
        Self::new(Level::Error, kind, message)
    }

    /// Attach a key/value pair.
    pub fn with(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for (key, value) in &self.fields {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: Event) {
        match event.level {
            Level::Debug => log::debug!("{}", event),
            Level::Info => log::info!("{}", event),
            Level::Warn => log::warn!("{}", event),
            Level::Error => log::error!("{}", event),
            Level::Critical => log::error!("CRITICAL: {}", event),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn of_kind(&self, kind: EventKind) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.kind == kind)
            .collect()
    }

    pub fn contains(&self, kind: EventKind) -> bool {
        !self.of_kind(kind).is_empty()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_appends_fields() {
        let event = Event::warn(EventKind::RetryScheduled, "retrying station_list")
            .with("attempt", 2)
            .with("delay_secs", 20);
        assert_eq!(
            "retrying station_list attempt=2 delay_secs=20",
            event.to_string()
        );
        assert_eq!(Some("20"), event.field("delay_secs"));
        assert_eq!(None, event.field("missing"));
    }

    #[test]
    fn memory_sink_filters_by_kind() {
        let sink = MemorySink::new();
        sink.emit(Event::info(EventKind::TokenAcquired, "token"));
        sink.emit(Event::warn(EventKind::StationFallback, "fallback"));
        assert_eq!(2, sink.events().len());
        assert!(sink.contains(EventKind::StationFallback));
        assert!(!sink.contains(EventKind::MultipleStations));
    }
}
