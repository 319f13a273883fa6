use crate::api::response::current_data::Record;
use serde::Deserialize;
use serde_json::{Map, Value};

pub type Attributes = Map<String, Value>;

const DATA_LIST: &str = "dataList";

/// Take the `dataList` records out of a device response and flatten them into
/// `name -> value`, with spaces in names replaced by underscores. The list is removed from
/// `response`; a response without one yields an empty mapping.
pub fn flatten(response: &mut Value) -> Attributes {
    let records = match response.as_object_mut().and_then(|o| o.remove(DATA_LIST)) {
        Some(Value::Array(records)) => records,
        _ => return Attributes::new(),
    };

    records
        .into_iter()
        .filter_map(|record| Record::deserialize(record).ok())
        .map(|record| (record.name.replace(' ', "_"), record.value))
        .collect()
}
