pub type Endpoint = str;

pub const TOKEN: &Endpoint = "/account/v1.0/token";
pub const STATIONS: &Endpoint = "/station/v1.0/list";
pub const STATION_DEVICES: &Endpoint = "/station/v1.0/device";
pub const STATION_REALTIME: &Endpoint = "/station/v1.0/realTime";
pub const DEVICE_CURRENT_DATA: &Endpoint = "/device/v1.0/currentData";

/// `https://` is assumed when `url` is a bare host name.
pub fn base_url(url: &str) -> String {
    let url = url.trim_end_matches('/');
    if url.contains("://") {
        url.to_owned()
    } else {
        format!("https://{}", url)
    }
}

#[cfg(test)]
mod test {
    #[test]
    fn base_url_adds_scheme() {
        assert_eq!(
            "https://globalapi.solarmanpv.com",
            super::base_url("globalapi.solarmanpv.com")
        );
        assert_eq!(
            "http://127.0.0.1:8080",
            super::base_url("http://127.0.0.1:8080/")
        );
    }
}
