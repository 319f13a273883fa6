use super::Entries;
use crate::model::StationId;
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
pub struct Station {
    pub id: StationId,
    pub name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationList {
    #[serde(default)]
    pub station_list: Vec<Value>,
}

impl StationList {
    pub fn stations(self) -> Entries<Station> {
        Entries::parse(self.station_list)
    }
}
