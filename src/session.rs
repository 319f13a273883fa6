//! One polling session: authenticate, resolve the station, discover devices, fetch data.
//!
//! A session is built fresh for every polling cycle, so the token and the topology never go
//! stale.

use crate::api::{Api, Error, LoggedInApi, Transport};
use crate::events::{Event, EventKind};
use crate::model::{Device, DeviceKind, Devices, SiteConfig, StationId};
use serde_json::Value;

/// Results of one cycle. Each endpoint may independently be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollData {
    pub station_realtime: Option<Value>,
    pub inverter: Option<Value>,
    pub logger: Option<Value>,
    pub meter: Option<Value>,
    /// Some call in this session carried the vendor "application locked" code.
    pub account_locked: bool,
}

impl PollData {
    pub fn is_empty(&self) -> bool {
        self.station_realtime.is_none()
            && self.inverter.is_none()
            && self.logger.is_none()
            && self.meter.is_none()
    }
}

pub struct Session<'a, T: Transport> {
    api: LoggedInApi<'a, T>,
    station_id: StationId,
    devices: Devices,
}

impl<'a, T: Transport> Session<'a, T> {
    /// Returns `Error::FatalInit` when no token can be obtained; every later step degrades to
    /// configured fallbacks instead of failing.
    pub async fn connect(api: Api<'a, T>, site: &SiteConfig) -> Result<Session<'a, T>, Error> {
        let api = api.login(&site.credentials()).await?;
        let station_id = resolve_station(&api, site.station_id).await;
        let devices = discover_devices(&api, station_id, Devices::from_config(site)).await;

        Ok(Session {
            api,
            station_id,
            devices,
        })
    }

    pub fn station_id(&self) -> StationId {
        self.station_id
    }

    pub fn devices(&self) -> &Devices {
        &self.devices
    }

    async fn fetch_device(&self, device: &Device) -> Option<Value> {
        report(
            &self.api,
            device.kind.topic(),
            self.api.device_current_data(device).await,
        )
    }

    /// Fetch station realtime and device data, one request after the other.
    pub async fn fetch_all(&self) -> PollData {
        let station_realtime = report(
            &self.api,
            "station",
            self.api.station_realtime(self.station_id).await,
        );
        let inverter = self.fetch_device(&self.devices.inverter).await;
        let logger = self.fetch_device(&self.devices.logger).await;
        let meter = match &self.devices.meter {
            Some(meter) => self.fetch_device(meter).await,
            None => None,
        };

        PollData {
            station_realtime,
            inverter,
            logger,
            meter,
            account_locked: self.api.account_locked(),
        }
    }
}

fn report<T: Transport>(
    api: &LoggedInApi<'_, T>,
    what: &'static str,
    result: Result<Value, Error>,
) -> Option<Value> {
    match result {
        Ok(value) => {
            api.sink()
                .emit(Event::info(EventKind::DataFetched, format!("Fetched {} data", what)));
            Some(value)
        }
        Err(e) => {
            api.sink().emit(Event::error(
                EventKind::DataUnavailable,
                format!("No {} data this cycle: {}", what, e),
            ));
            None
        }
    }
}

/// The first station the API lists wins; the configured id is only used when discovery yields
/// nothing.
pub async fn resolve_station<T: Transport>(
    api: &LoggedInApi<'_, T>,
    configured: StationId,
) -> StationId {
    let sink = api.sink();
    let stations = match api.stations().await {
        Ok(stations) => stations,
        Err(e) => {
            sink.emit(
                Event::warn(
                    EventKind::StationFallback,
                    format!("Station list unavailable ({}); using configured stationId", e),
                )
                .with("station_id", configured),
            );
            return configured;
        }
    };

    match stations.as_slice() {
        [] => {
            sink.emit(
                Event::warn(
                    EventKind::StationFallback,
                    "Unable to find useful stationList; using configured stationId",
                )
                .with("station_id", configured),
            );
            configured
        }
        [first, rest @ ..] => {
            if !rest.is_empty() {
                sink.emit(
                    Event::warn(
                        EventKind::MultipleStations,
                        format!(
                            "Found stationList with {} entries; using the first",
                            stations.len()
                        ),
                    )
                    .with("station_id", first),
                );
            }
            sink.emit(
                Event::info(EventKind::StationResolved, "Resolved station")
                    .with("configured", configured)
                    .with("station_id", first),
            );
            *first
        }
    }
}

/// Fill in numeric ids for the inverter and the logger. Devices that stay unresolved are later
/// addressed by serial only.
pub async fn discover_devices<T: Transport>(
    api: &LoggedInApi<'_, T>,
    station_id: StationId,
    mut devices: Devices,
) -> Devices {
    let sink = api.sink();
    match api.devices(station_id).await {
        Ok(items) => {
            for item in items {
                let target = match DeviceKind::from_vendor(&item.device_type) {
                    Some(DeviceKind::Inverter) => &mut devices.inverter,
                    Some(DeviceKind::Logger) => &mut devices.logger,
                    _ => continue,
                };
                target.id = item.device_id;
                sink.emit(
                    Event::info(EventKind::DeviceDiscovered, format!("Found {}", target.kind))
                        .with("device_id", item.device_id)
                        .with("device_sn", item.device_sn.as_deref().unwrap_or("-")),
                );
            }
        }
        Err(e) => sink.emit(Event::warn(
            EventKind::DeviceUnresolved,
            format!("Device list unavailable: {}", e),
        )),
    }

    for device in [&devices.inverter, &devices.logger] {
        if !device.is_resolved() {
            sink.emit(
                Event::warn(
                    EventKind::DeviceUnresolved,
                    format!("No {} id discovered; addressing by serial only", device.kind),
                )
                .with("device_sn", &device.serial),
            );
        }
    }
    devices
}
