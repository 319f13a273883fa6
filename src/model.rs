use serde::Deserialize;
use std::fmt;

pub type StationId = u64;

/// Vendor numeric device id; `0` means discovery did not resolve it.
pub type DeviceId = u64;

pub const UNRESOLVED: DeviceId = 0;

#[derive(Clone)]
pub struct Credentials {
    pub app_id: String,
    pub app_secret: String,
    pub username: String,
    pub password_hash: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Bearer token, valid for the life of one session.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(token: impl Into<String>) -> Self {
        Token(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(..)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Inverter,
    Logger,
    Meter,
}

impl DeviceKind {
    /// Vendor `deviceType` string, for the kinds the device list reports.
    pub fn from_vendor(device_type: &str) -> Option<DeviceKind> {
        match device_type {
            "INVERTER" => Some(DeviceKind::Inverter),
            "COLLECTOR" => Some(DeviceKind::Logger),
            _ => None,
        }
    }

    pub fn topic(&self) -> &'static str {
        match self {
            DeviceKind::Inverter => "inverter",
            DeviceKind::Logger => "logger",
            DeviceKind::Meter => "meter",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.topic())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub kind: DeviceKind,
    pub serial: String,
    pub id: DeviceId,
}

impl Device {
    pub fn new(kind: DeviceKind, serial: impl Into<String>) -> Self {
        Device {
            kind,
            serial: serial.into(),
            id: UNRESOLVED,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.id != UNRESOLVED
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Devices {
    pub inverter: Device,
    pub logger: Device,
    /// Addressed by serial only.
    pub meter: Option<Device>,
}

impl Devices {
    pub fn from_config(site: &SiteConfig) -> Self {
        Devices {
            inverter: Device::new(DeviceKind::Inverter, &site.inverter_id),
            logger: Device::new(DeviceKind::Logger, &site.logger_id),
            meter: site
                .meter_id
                .as_ref()
                .map(|serial| Device::new(DeviceKind::Meter, serial)),
        }
    }
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_qos() -> u8 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    pub broker: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    #[serde(default)]
    pub topic: String,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_qos")]
    pub qos: u8,
    #[serde(default)]
    pub retain: bool,
}

/// One monitored site, keyed the way the configuration file spells it. The lowercase aliases
/// cover loaders that fold key case.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub url: String,
    pub appid: String,
    pub secret: String,
    pub username: String,
    pub passhash: String,
    #[serde(rename = "stationId", alias = "stationid")]
    pub station_id: StationId,
    #[serde(rename = "inverterId", alias = "inverterid")]
    pub inverter_id: String,
    #[serde(rename = "loggerId", alias = "loggerid")]
    pub logger_id: String,
    #[serde(rename = "meterId", alias = "meterid")]
    pub meter_id: Option<String>,
    #[serde(default)]
    pub debug: bool,
    pub mqtt: Option<MqttConfig>,
}

impl SiteConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            app_id: self.appid.to_owned(),
            app_secret: self.secret.to_owned(),
            username: self.username.to_owned(),
            password_hash: self.passhash.to_owned(),
        }
    }

    /// Check field bounds; returns one line per violation.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut check_len = |field: &str, value: &str, min: usize, max: Option<usize>| {
            let len = value.chars().count();
            if len < min || max.map_or(false, |max| len > max) {
                let bounds = match max {
                    Some(max) if max == min => format!("exactly {}", min),
                    Some(max) => format!("between {} and {}", min, max),
                    None => format!("at least {}", min),
                };
                problems.push(format!(
                    "{}: length {} is not {} characters",
                    field, len, bounds
                ));
            }
        };

        check_len("appid", &self.appid, 15, Some(16));
        check_len("secret", &self.secret, 32, Some(32));
        check_len("passhash", &self.passhash, 64, Some(64));
        check_len("inverterId", &self.inverter_id, 10, None);
        check_len("loggerId", &self.logger_id, 10, Some(10));
        if let Some(meter_id) = &self.meter_id {
            check_len("meterId", meter_id, 10, None);
        }

        if !(100_000..=999_999_999).contains(&self.station_id) {
            problems.push(format!(
                "stationId: {} is not between 100000 and 999999999",
                self.station_id
            ));
        }
        if self.url.is_empty() {
            problems.push(String::from("url: must not be empty"));
        }

        match &self.mqtt {
            None => problems.push(String::from("mqtt: section missing")),
            Some(mqtt) => {
                if mqtt.port < 1024 {
                    problems.push(format!("mqtt.port: {} is below 1024", mqtt.port));
                }
                if mqtt.qos != 1 {
                    problems.push(format!("mqtt.qos: {} is not 1", mqtt.qos));
                }
            }
        }

        problems
    }
}

#[cfg(test)]
mod test {
    use super::*;

    pub fn site() -> SiteConfig {
        serde_json::from_value(serde_json::json!({
            "name": "Home",
            "url": "globalapi.solarmanpv.com",
            "appid": "123456789012345",
            "secret": "0123456789abcdef0123456789abcdef",
            "username": "someone@example.com",
            "passhash": "a".repeat(64),
            "stationId": 1234567,
            "inverterId": "2106123456",
            "loggerId": "4012345678",
            "mqtt": { "broker": "localhost", "topic": "solar" }
        }))
        .unwrap()
    }

    #[test]
    fn site_config_defaults() {
        let site = site();
        assert!(!site.debug);
        assert!(site.meter_id.is_none());
        let mqtt = site.mqtt.as_ref().unwrap();
        assert_eq!(1883, mqtt.port);
        assert_eq!(1, mqtt.qos);
        assert!(!mqtt.retain);
        assert!(site.validate().is_empty(), "{:?}", site.validate());
    }

    #[test]
    fn validate_reports_bounds() {
        let mut site = site();
        site.logger_id = String::from("123");
        site.station_id = 42;
        site.meter_id = Some(String::from("short"));
        let problems = site.validate();
        assert_eq!(3, problems.len(), "{:?}", problems);
        assert!(problems[0].starts_with("loggerId"));
        assert!(problems[1].starts_with("meterId"));
        assert!(problems[2].starts_with("stationId"));
    }

    #[test]
    fn validate_pins_qos_to_one() {
        let mut site = site();
        for qos in [0, 2] {
            site.mqtt.as_mut().unwrap().qos = qos;
            let problems = site.validate();
            assert_eq!(1, problems.len(), "{:?}", problems);
            assert!(problems[0].starts_with("mqtt.qos"));
        }
    }

    #[test]
    fn devices_from_config_start_unresolved() {
        let mut site = site();
        site.meter_id = Some(String::from("9900112233"));
        let devices = Devices::from_config(&site);
        assert!(!devices.inverter.is_resolved());
        assert_eq!("4012345678", devices.logger.serial);
        assert_eq!(Some(DeviceKind::Meter), devices.meter.map(|m| m.kind));
    }

    #[test]
    fn credentials_debug_hides_secrets() {
        let text = format!("{:?}", site().credentials());
        assert!(!text.contains("0123456789abcdef"));
        assert!(text.contains("someone@example.com"));
    }
}
