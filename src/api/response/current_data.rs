use serde::Deserialize;
use serde_json::Value;

/* One entry of `dataList` on device current data */
#[derive(Deserialize)]
pub struct Record {
    pub key: Option<Value>,
    pub name: String,
    #[serde(default)]
    pub value: Value,
    pub unit: Option<String>,
}
