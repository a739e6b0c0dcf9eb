//! FusionSolar northbound API adapter

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::http::ApiClient;
use super::wire::{self, AlarmRecord, KpiRecord, RawId, RawTimestamp, ResyncRequest};
use super::{degrade, fetch_all_pages, is_selected, ProviderAdapter};
use crate::config::ProviderConfig;
use crate::types::{
    decimal_or_zero, EnergyTotals, Granularity, Health, ProviderKind, RawDecimal, RawSnapshot,
    ResyncReport, Result, SnapshotQuery, StationReading, SuntrackError, UnifiedProviderSummary,
};

const STATIONS_PATH: &str = "thirdData/getStationList";
const STATION_KPI_PATH: &str = "thirdData/getStationRealKpi";
const DEVICES_PATH: &str = "thirdData/getDevList";
const ALARMS_PATH: &str = "thirdData/getAlarmList";
const KPI_HISTORY_PATH: &str = "thirdData/getKpiHistory";
const RESYNC_PATH: &str = "thirdData/resync";

const PAGE_SIZE: u32 = 100;
const MAX_PAGES: u32 = 50;

/// `{success, failCode, message, data}` response envelope
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    fail_code: Option<RawId>,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self, provider: &str) -> Result<T> {
        if !self.success {
            let code = self
                .fail_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "?".into());
            let message = self.message.unwrap_or_default();
            return Err(SuntrackError::provider(
                provider,
                format!("failCode {}: {}", code, message),
            ));
        }
        self.data
            .ok_or_else(|| SuntrackError::provider(provider, "response has no data"))
    }
}

#[derive(Debug, Deserialize)]
struct StationPage {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default = "Vec::new")]
    list: Vec<Station>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Station {
    station_code: String,
    #[serde(default)]
    capacity: Option<RawDecimal>,
    #[serde(default)]
    health_state: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StationKpi {
    station_code: String,
    #[serde(default)]
    collect_time: Option<RawTimestamp>,
    #[serde(default)]
    data_item_map: KpiItems,
}

#[derive(Debug, Default, Deserialize)]
struct KpiItems {
    #[serde(default)]
    day_power: Option<RawDecimal>,
    #[serde(default)]
    month_power: Option<RawDecimal>,
    #[serde(default)]
    year_power: Option<RawDecimal>,
    #[serde(default)]
    total_power: Option<RawDecimal>,
    #[serde(default)]
    real_time_power: Option<RawDecimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Device {
    #[serde(default)]
    station_code: Option<String>,
    #[serde(default)]
    dev_status: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageRequest {
    page_no: u32,
    page_size: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StationCodes<'a> {
    station_codes: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KpiHistoryRequest<'a> {
    station_code: &'a str,
    granularity: Granularity,
    start_date: String,
    end_date: String,
}

fn station_health(state: Option<i64>) -> Health {
    match state {
        Some(1) => Health::Offline,
        Some(2) => Health::Faulty,
        Some(3) => Health::Healthy,
        _ => Health::Unknown,
    }
}

fn device_health(status: Option<i64>) -> Health {
    match status {
        Some(0) => Health::Offline,
        Some(1) => Health::Healthy,
        Some(2) => Health::Faulty,
        _ => Health::Unknown,
    }
}

/// Fold station, KPI, device and alarm lists into one summary.
///
/// `devices` / `alarms` are None when their sub-fetch failed; the matching
/// bucket stays zero.
fn normalize_summary(
    name: &str,
    stations: &[Station],
    kpis: &[StationKpi],
    devices: Option<&[Device]>,
    alarms: Option<&[AlarmRecord]>,
) -> UnifiedProviderSummary {
    let mut summary = UnifiedProviderSummary::zeroed(ProviderKind::FusionSolar, name);
    let kpi_by_code: HashMap<&str, &StationKpi> =
        kpis.iter().map(|k| (k.station_code.as_str(), k)).collect();

    for station in stations {
        let kpi = kpi_by_code.get(station.station_code.as_str());
        let items = kpi.map(|k| &k.data_item_map);

        let reading = StationReading {
            health: station_health(station.health_state),
            energy: EnergyTotals {
                today_kwh: items.map_or(0.0, |i| decimal_or_zero(&i.day_power)),
                month_kwh: items.map_or(0.0, |i| decimal_or_zero(&i.month_power)),
                year_kwh: items.map_or(0.0, |i| decimal_or_zero(&i.year_power)),
                lifetime_kwh: items.map_or(0.0, |i| decimal_or_zero(&i.total_power)),
            },
            power_kw: items.map_or(0.0, |i| decimal_or_zero(&i.real_time_power)),
            capacity_kw: decimal_or_zero(&station.capacity),
            updated_at: kpi
                .and_then(|k| k.collect_time.as_ref())
                .and_then(RawTimestamp::parse),
        };
        summary.add_station(&reading);
    }

    let known: Vec<&str> = stations.iter().map(|s| s.station_code.as_str()).collect();
    for device in devices.unwrap_or_default() {
        let belongs = device
            .station_code
            .as_deref()
            .map_or(true, |code| known.contains(&code));
        if belongs {
            summary.devices.record(device_health(device.dev_status));
        }
    }

    if let Some(alarms) = alarms {
        summary.alarms = wire::count_active_alarms(alarms);
    }

    summary
}

/// Degrade each failed sub-fetch to an empty bucket, then normalize.
///
/// Missing KPIs leave station counts and capacity intact with zero energy.
fn assemble_summary(
    name: &str,
    stations: &[Station],
    kpis: Result<Vec<StationKpi>>,
    devices: Result<Vec<Device>>,
    alarms: Result<Vec<AlarmRecord>>,
) -> UnifiedProviderSummary {
    let kpis = degrade(name, "kpis", kpis).unwrap_or_default();
    let devices = degrade(name, "devices", devices);
    let alarms = degrade(name, "alarms", alarms);
    normalize_summary(name, stations, &kpis, devices.as_deref(), alarms.as_deref())
}

/// Adapter for one FusionSolar account
pub struct FusionSolarAdapter {
    name: String,
    client: ApiClient,
    timeout: Duration,
    stations: Vec<String>,
}

impl FusionSolarAdapter {
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self> {
        let name = config.name().to_string();
        let client = ApiClient::new(&name, config.base_url(), config.api_token.clone(), timeout)?;
        Ok(Self {
            name,
            client,
            timeout,
            stations: config.stations.clone(),
        })
    }

    async fn call<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let envelope: Envelope<T> = self.client.post(path, body).await?;
        envelope.into_data(&self.name)
    }

    async fn fetch_stations(&self) -> Result<Vec<Station>> {
        fetch_all_pages(&self.name, PAGE_SIZE, MAX_PAGES, |page_no| async move {
            let request = PageRequest {
                page_no,
                page_size: PAGE_SIZE,
            };
            let page: StationPage = self.call(STATIONS_PATH, &request).await?;
            Ok::<_, SuntrackError>((page.list, page.total))
        })
        .await
    }
}

#[async_trait]
impl ProviderAdapter for FusionSolarAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::FusionSolar
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch_summary(&self) -> Result<UnifiedProviderSummary> {
        let stations: Vec<Station> = self
            .fetch_stations()
            .await?
            .into_iter()
            .filter(|s| is_selected(&self.stations, &s.station_code))
            .collect();
        if stations.is_empty() {
            return Ok(UnifiedProviderSummary::zeroed(ProviderKind::FusionSolar, &self.name));
        }

        let codes = stations
            .iter()
            .map(|s| s.station_code.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let body = StationCodes {
            station_codes: &codes,
        };

        let (kpis, devices, alarms) = tokio::join!(
            self.call::<Vec<StationKpi>, _>(STATION_KPI_PATH, &body),
            self.call::<Vec<Device>, _>(DEVICES_PATH, &body),
            self.call::<Vec<AlarmRecord>, _>(ALARMS_PATH, &body),
        );

        Ok(assemble_summary(&self.name, &stations, kpis, devices, alarms))
    }

    async fn fetch_snapshots(&self, query: &SnapshotQuery) -> Result<Vec<RawSnapshot>> {
        let body = KpiHistoryRequest {
            station_code: &query.entity_id,
            granularity: query.granularity,
            start_date: query.start_param(),
            end_date: query.end_param(),
        };
        let records: Vec<KpiRecord> = self.call(KPI_HISTORY_PATH, &body).await?;
        Ok(wire::snapshots_from_records(&self.name, records))
    }

    async fn trigger_resync(
        &self,
        granularity: Granularity,
        entity_ids: &[String],
    ) -> Result<ResyncReport> {
        let body = ResyncRequest {
            granularity,
            entity_ids,
        };
        self.call(RESYNC_PATH, &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::http::decode_body;
    use chrono::{TimeZone, Utc};
    use serde::de::DeserializeOwned;
    use std::path::Path;

    fn fixture<T: DeserializeOwned>(name: &str) -> Result<T> {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/fusionsolar")
            .join(name);
        let mut body = std::fs::read(path).unwrap();
        let envelope: Envelope<T> = decode_body("fusionsolar", &mut body)?;
        envelope.into_data("fusionsolar")
    }

    #[test]
    fn test_normalize_fixture_summary() {
        let stations = fixture::<StationPage>("stations.json").unwrap().list;
        let kpis: Vec<StationKpi> = fixture("station_kpi.json").unwrap();
        let devices: Vec<Device> = fixture("devices.json").unwrap();
        let alarms: Vec<AlarmRecord> = fixture("alarms.json").unwrap();

        let summary = normalize_summary("fs", &stations, &kpis, Some(&devices), Some(&alarms));

        assert_eq!(summary.provider, ProviderKind::FusionSolar);
        assert_eq!(summary.stations.total, 3);
        assert_eq!(summary.stations.healthy, 1);
        assert_eq!(summary.stations.faulty, 1);
        assert_eq!(summary.stations.offline, 1);
        assert!((summary.energy.today_kwh - 54.5).abs() < 1e-9);
        assert!((summary.energy.lifetime_kwh - 152_000.0).abs() < 1e-9);
        assert!((summary.current_power_kw - 9.25).abs() < 1e-9);
        assert!((summary.peak_power_kw - 6.5).abs() < 1e-9);
        assert!((summary.installed_capacity_kw - 35.0).abs() < 1e-9);
        assert_eq!(summary.devices.total, 4);
        assert_eq!(summary.devices.healthy, 2);
        assert_eq!(summary.devices.offline, 1);
        assert_eq!(summary.devices.faulty, 1);
        assert_eq!(summary.alarms.critical, 1);
        assert_eq!(summary.alarms.warning, 1);
        assert_eq!(summary.alarms.other, 0);
        assert_eq!(
            summary.last_update,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 15, 0).unwrap())
        );
    }

    #[test]
    fn test_failed_sub_fetches_zero_only_their_bucket() {
        let stations = fixture::<StationPage>("stations.json").unwrap().list;
        let kpis: Vec<StationKpi> = fixture("station_kpi.json").unwrap();

        let summary = normalize_summary("fs", &stations, &kpis, None, None);

        assert_eq!(summary.stations.total, 3);
        assert!((summary.energy.today_kwh - 54.5).abs() < 1e-9);
        assert_eq!(summary.devices.total, 0);
        assert_eq!(summary.alarms.total(), 0);
    }

    #[test]
    fn test_station_page_reports_total() {
        let page: StationPage = fixture("stations.json").unwrap();
        assert_eq!(page.total, Some(3));
        assert_eq!(page.list.len(), 3);
    }

    #[test]
    fn test_failed_kpi_fetch_keeps_stations_devices_and_alarms() {
        let stations = fixture::<StationPage>("stations.json").unwrap().list;
        let devices: Vec<Device> = fixture("devices.json").unwrap();
        let alarms: Vec<AlarmRecord> = fixture("alarms.json").unwrap();

        let summary = assemble_summary(
            "fs",
            &stations,
            Err(SuntrackError::provider("fs", "HTTP 503")),
            Ok(devices),
            Ok(alarms),
        );

        assert_eq!(summary.stations.total, 3);
        assert_eq!(summary.stations.healthy, 1);
        assert!((summary.installed_capacity_kw - 35.0).abs() < 1e-9);
        assert_eq!(summary.energy, EnergyTotals::default());
        assert_eq!(summary.current_power_kw, 0.0);
        assert_eq!(summary.devices.total, 4);
        assert_eq!(summary.alarms.critical, 1);
    }

    #[test]
    fn test_assemble_summary_degrades_each_bucket_alone() {
        let stations = fixture::<StationPage>("stations.json").unwrap().list;
        let kpis: Vec<StationKpi> = fixture("station_kpi.json").unwrap();

        let summary = assemble_summary(
            "fs",
            &stations,
            Ok(kpis),
            Err(SuntrackError::provider("fs", "HTTP 500")),
            Err(SuntrackError::provider("fs", "failCode 407")),
        );

        assert!((summary.energy.today_kwh - 54.5).abs() < 1e-9);
        assert_eq!(summary.devices.total, 0);
        assert_eq!(summary.alarms.total(), 0);
    }

    #[test]
    fn test_station_without_kpi_counts_with_zero_energy() {
        let stations = fixture::<StationPage>("stations.json").unwrap().list;
        let summary = normalize_summary("fs", &stations, &[], None, None);

        assert_eq!(summary.stations.total, 3);
        assert_eq!(summary.energy, EnergyTotals::default());
        assert!((summary.installed_capacity_kw - 35.0).abs() < 1e-9);
        assert!(summary.last_update.is_none());
    }

    #[test]
    fn test_failure_envelope_is_provider_error() {
        let err = fixture::<StationPage>("error.json").unwrap_err();
        match err {
            SuntrackError::Provider { provider, cause } => {
                assert_eq!(provider, "fusionsolar");
                assert!(cause.contains("407"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_kpi_history_fixture_to_snapshots() {
        let records: Vec<KpiRecord> = fixture("kpi_history.json").unwrap();
        let snapshots = wire::snapshots_from_records("fs", records);

        // unparseable and float timestamps are dropped, a boolean yield reads as zero
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[0].period_value(Granularity::Month), 80.0);
        assert_eq!(snapshots[1].period_value(Granularity::Month), 0.0);
        assert_eq!(snapshots[2].period_value(Granularity::Month), 95.0);
    }

    #[test]
    fn test_health_codes() {
        assert_eq!(station_health(Some(3)), Health::Healthy);
        assert_eq!(station_health(Some(9)), Health::Unknown);
        assert_eq!(station_health(None), Health::Unknown);
        assert_eq!(device_health(Some(0)), Health::Offline);
    }
}
