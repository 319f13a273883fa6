use super::Entries;
use crate::model::DeviceId;
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Data {
    pub device_sn: Option<String>,
    pub device_id: DeviceId,
    pub device_type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceList {
    #[serde(default)]
    pub device_list_items: Vec<Value>,
}

impl DeviceList {
    pub fn devices(self) -> Entries<Data> {
        Entries::parse(self.device_list_items)
    }
}
