//! Growatt OpenAPI adapter

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use std::time::Duration;

use super::http::ApiClient;
use super::wire::{self, KpiRecord, RawId, RawTimestamp, ResyncRequest};
use super::{degrade, fetch_all_pages, is_selected, ProviderAdapter};
use crate::config::ProviderConfig;
use crate::types::{
    decimal_or_zero, EnergyTotals, Granularity, Health, ProviderKind, RawDecimal, RawSnapshot,
    ResyncReport, Result, SnapshotQuery, StationReading, SuntrackError, UnifiedProviderSummary,
};

const PLANTS_PATH: &str = "v1/plant/list";
const DEVICES_PATH: &str = "v1/device/list";
const KPI_HISTORY_PATH: &str = "v1/plant/kpi_history";
const RESYNC_PATH: &str = "v1/plant/resync";

const PAGE_SIZE: u32 = 100;
const MAX_PAGES: u32 = 50;

/// `{error_code, error_msg, data}` response envelope; non-zero code is a failure
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_msg: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self, provider: &str) -> Result<T> {
        if self.error_code != 0 {
            return Err(SuntrackError::provider(
                provider,
                format!(
                    "error_code {}: {}",
                    self.error_code,
                    self.error_msg.unwrap_or_default()
                ),
            ));
        }
        self.data
            .ok_or_else(|| SuntrackError::provider(provider, "response has no data"))
    }
}

#[derive(Debug, Deserialize)]
struct PlantList {
    /// Plants on the account, across all pages
    #[serde(default)]
    count: Option<u64>,
    #[serde(default = "Vec::new")]
    plants: Vec<Plant>,
}

#[derive(Debug, Deserialize)]
struct Plant {
    plant_id: RawId,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    current_power: Option<RawDecimal>,
    /// Installed peak power in kWp
    #[serde(default)]
    peak_power: Option<RawDecimal>,
    #[serde(default)]
    today_energy: Option<RawDecimal>,
    #[serde(default)]
    month_energy: Option<RawDecimal>,
    #[serde(default)]
    year_energy: Option<RawDecimal>,
    #[serde(default)]
    total_energy: Option<RawDecimal>,
    #[serde(default)]
    last_update_time: Option<RawTimestamp>,
}

impl Plant {
    fn health(&self) -> Health {
        match self.status.as_deref().map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("online") => Health::Healthy,
            Some(s) if s.eq_ignore_ascii_case("offline") => Health::Offline,
            Some(s) if s.eq_ignore_ascii_case("fault") => Health::Faulty,
            _ => Health::Unknown,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeviceList {
    #[serde(default = "Vec::new")]
    devices: Vec<Device>,
}

#[derive(Debug, Deserialize)]
struct Device {
    #[serde(default)]
    status: Option<i64>,
}

fn device_health(status: Option<i64>) -> Health {
    match status {
        Some(0) => Health::Offline,
        Some(1) => Health::Healthy,
        Some(3) => Health::Faulty,
        _ => Health::Unknown,
    }
}

#[derive(Debug, Deserialize)]
struct KpiHistory {
    #[serde(default = "Vec::new")]
    records: Vec<KpiRecord>,
}

/// Growatt exposes no alarm endpoint, so alarm counts stay zero.
fn normalize_summary(
    name: &str,
    plants: &[Plant],
    devices: Option<&[Device]>,
) -> UnifiedProviderSummary {
    let mut summary = UnifiedProviderSummary::zeroed(ProviderKind::Growatt, name);

    for plant in plants {
        summary.add_station(&StationReading {
            health: plant.health(),
            energy: EnergyTotals {
                today_kwh: decimal_or_zero(&plant.today_energy),
                month_kwh: decimal_or_zero(&plant.month_energy),
                year_kwh: decimal_or_zero(&plant.year_energy),
                lifetime_kwh: decimal_or_zero(&plant.total_energy),
            },
            power_kw: decimal_or_zero(&plant.current_power),
            capacity_kw: decimal_or_zero(&plant.peak_power),
            updated_at: plant.last_update_time.as_ref().and_then(RawTimestamp::parse),
        });
    }

    for device in devices.unwrap_or_default() {
        summary.devices.record(device_health(device.status));
    }

    summary
}

/// Adapter for one Growatt account
pub struct GrowattAdapter {
    name: String,
    client: ApiClient,
    timeout: Duration,
    stations: Vec<String>,
}

impl GrowattAdapter {
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

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let envelope: Envelope<T> = self.client.get(path, query).await?;
        envelope.into_data(&self.name)
    }

    async fn fetch_plants(&self) -> Result<Vec<Plant>> {
        fetch_all_pages(&self.name, PAGE_SIZE, MAX_PAGES, |page_no| async move {
            let query = [
                ("page", page_no.to_string()),
                ("perpage", PAGE_SIZE.to_string()),
            ];
            let list: PlantList = self.get(PLANTS_PATH, &query).await?;
            Ok::<_, SuntrackError>((list.plants, list.count))
        })
        .await
    }

    /// Device lists for every plant; any failed plant fails the whole bucket
    async fn fetch_devices(&self, plants: &[Plant]) -> Result<Vec<Device>> {
        let requests = plants.iter().map(|plant| {
            let query = [("plant_id", plant.plant_id.to_string())];
            async move { self.get::<DeviceList>(DEVICES_PATH, &query).await }
        });

        let mut devices = Vec::new();
        for result in join_all(requests).await {
            devices.extend(result?.devices);
        }
        Ok(devices)
    }
}

#[async_trait]
impl ProviderAdapter for GrowattAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Growatt
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch_summary(&self) -> Result<UnifiedProviderSummary> {
        let plants: Vec<Plant> = self
            .fetch_plants()
            .await?
            .into_iter()
            .filter(|p| is_selected(&self.stations, &p.plant_id.to_string()))
            .collect();

        let devices = self.fetch_devices(&plants).await;
        let devices = degrade(&self.name, "devices", devices);

        Ok(normalize_summary(&self.name, &plants, devices.as_deref()))
    }

    async fn fetch_snapshots(&self, query: &SnapshotQuery) -> Result<Vec<RawSnapshot>> {
        let params = [
            ("plant_id", query.entity_id.clone()),
            ("granularity", query.granularity.as_str().to_string()),
            ("start_date", query.start_param()),
            ("end_date", query.end_param()),
        ];
        let history: KpiHistory = self.get(KPI_HISTORY_PATH, &params).await?;
        Ok(wire::snapshots_from_records(&self.name, history.records))
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
        let envelope: Envelope<ResyncReport> = self.client.post(RESYNC_PATH, &body).await?;
        envelope.into_data(&self.name)
    }
}
