pub mod current_data;
pub mod device_list;
pub mod station_list;
pub mod token;

use num_derive::FromPrimitive;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/* Vendor application codes with dedicated handling */
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum FailCode {
    /* {"code":"2101009","msg":"appId is locked","success":false} */
    AppLocked = 2101009,
}

/* Fields every response carries, whatever the endpoint */
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub success: Option<bool>,
    pub code: Option<Value>,
    pub msg: Option<String>,
    pub request_id: Option<String>,
}

impl Envelope {
    pub fn from_value(value: &Value) -> Envelope {
        Envelope::deserialize(value).unwrap_or_default()
    }

    /// `code` arrives as a string on most endpoints and as a number on some.
    pub fn code(&self) -> Option<u64> {
        match self.code.as_ref()? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn code_text(&self) -> String {
        match &self.code {
            Some(Value::String(s)) => s.to_owned(),
            Some(Value::Null) | None => String::from("(none)"),
            Some(other) => other.to_string(),
        }
    }

    pub fn fail_code(&self) -> Option<FailCode> {
        self.code().and_then(num::FromPrimitive::from_u64)
    }
}

/// List entries parsed one by one, so a bad entry does not take the good ones with it.
pub struct Entries<T> {
    pub items: Vec<T>,
    pub skipped: usize,
}

impl<T: DeserializeOwned> Entries<T> {
    pub fn parse(raw: Vec<Value>) -> Self {
        let total = raw.len();
        let items: Vec<T> = raw
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();
        Entries {
            skipped: total - items.len(),
            items,
        }
    }
}
