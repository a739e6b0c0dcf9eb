//! SolisCloud adapter

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::http::ApiClient;
use super::wire::{self, AlarmRecord, KpiRecord, RawId, RawTimestamp, ResyncRequest};
use super::{degrade, fetch_all_pages, is_selected, ProviderAdapter};
use crate::config::ProviderConfig;
use crate::types::{
    decimal_or_zero, EnergyTotals, Granularity, Health, HealthCounts, ProviderKind, RawDecimal,
    RawSnapshot, ResyncReport, Result, SnapshotQuery, StationReading, SuntrackError,
    UnifiedProviderSummary,
};

const STATIONS_PATH: &str = "v1/api/userStationList";
const ALARMS_PATH: &str = "v1/api/alarmList";
const KPI_HISTORY_PATH: &str = "v1/api/kpiHistory";
const RESYNC_PATH: &str = "v1/api/resync";

const PAGE_SIZE: u32 = 100;
const MAX_PAGES: u32 = 50;

/// `{success, code, msg, data}` response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    code: Option<RawId>,
    #[serde(default)]
    msg: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self, provider: &str) -> Result<T> {
        if !self.success {
            let code = self.code.map(|c| c.to_string()).unwrap_or_else(|| "?".into());
            return Err(SuntrackError::provider(
                provider,
                format!("code {}: {}", code, self.msg.unwrap_or_default()),
            ));
        }
        self.data
            .ok_or_else(|| SuntrackError::provider(provider, "response has no data"))
    }
}

#[derive(Debug, Deserialize)]
struct StationPage {
    page: Page<Station>,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default = "Vec::new")]
    records: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Station {
    id: RawId,
    #[serde(default)]
    capacity: Option<RawDecimal>,
    #[serde(default)]
    state: Option<i64>,
    #[serde(default)]
    power: Option<RawDecimal>,
    #[serde(default)]
    day_energy: Option<RawDecimal>,
    #[serde(default)]
    month_energy: Option<RawDecimal>,
    #[serde(default)]
    year_energy: Option<RawDecimal>,
    #[serde(default)]
    all_energy: Option<RawDecimal>,
    #[serde(default)]
    data_timestamp: Option<RawTimestamp>,
    #[serde(default)]
    inverter_count: Option<u64>,
    #[serde(default)]
    inverter_online_count: Option<u64>,
    #[serde(default)]
    inverter_alarm_count: Option<u64>,
}

impl Station {
    fn health(&self) -> Health {
        match self.state {
            Some(1) => Health::Healthy,
            Some(2) => Health::Offline,
            Some(3) => Health::Faulty,
            _ => Health::Unknown,
        }
    }

    /// Inverter buckets; alarmed inverters are counted out of the online ones
    fn inverters(&self) -> HealthCounts {
        let total = self.inverter_count.unwrap_or(0);
        let online = self.inverter_online_count.unwrap_or(0).min(total);
        let faulty = self.inverter_alarm_count.unwrap_or(0).min(online);
        HealthCounts {
            total,
            healthy: online - faulty,
            faulty,
            offline: total - online,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AlarmPage {
    #[serde(default = "Vec::new")]
    records: Vec<AlarmRecord>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageRequest {
    page_no: u32,
    page_size: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AlarmRequest<'a> {
    station_ids: &'a [String],
    page_no: u32,
    page_size: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KpiHistoryRequest<'a> {
    id: &'a str,
    granularity: Granularity,
    start_date: String,
    end_date: String,
}

/// Fold station records (which carry energy and inverter counts inline) and
/// the optional alarm list into one summary.
fn normalize_summary(
    name: &str,
    stations: &[Station],
    alarms: Option<&[AlarmRecord]>,
) -> UnifiedProviderSummary {
    let mut summary = UnifiedProviderSummary::zeroed(ProviderKind::SolisCloud, name);

    for station in stations {
        summary.add_station(&StationReading {
            health: station.health(),
            energy: EnergyTotals {
                today_kwh: decimal_or_zero(&station.day_energy),
                month_kwh: decimal_or_zero(&station.month_energy),
                year_kwh: decimal_or_zero(&station.year_energy),
                lifetime_kwh: decimal_or_zero(&station.all_energy),
            },
            power_kw: decimal_or_zero(&station.power),
            capacity_kw: decimal_or_zero(&station.capacity),
            updated_at: station.data_timestamp.as_ref().and_then(RawTimestamp::parse),
        });
        summary.devices += station.inverters();
    }

    if let Some(alarms) = alarms {
        summary.alarms = wire::count_active_alarms(alarms);
    }

    summary
}

/// Adapter for one SolisCloud account
pub struct SolisCloudAdapter {
    name: String,
    client: ApiClient,
    timeout: Duration,
    stations: Vec<String>,
}

impl SolisCloudAdapter {
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

    /// Every station page of the account
    async fn fetch_stations(&self) -> Result<Vec<Station>> {
        fetch_all_pages(&self.name, PAGE_SIZE, MAX_PAGES, |page_no| async move {
            let request = PageRequest {
                page_no,
                page_size: PAGE_SIZE,
            };
            let data: StationPage = self.call(STATIONS_PATH, &request).await?;
            Ok::<_, SuntrackError>((data.page.records, data.page.total))
        })
        .await
    }
}

#[async_trait]
impl ProviderAdapter for SolisCloudAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::SolisCloud
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
            .filter(|s| is_selected(&self.stations, &s.id.to_string()))
            .collect();
        if stations.is_empty() {
            return Ok(UnifiedProviderSummary::zeroed(ProviderKind::SolisCloud, &self.name));
        }

        let ids: Vec<String> = stations.iter().map(|s| s.id.to_string()).collect();
        let request = AlarmRequest {
            station_ids: &ids,
            page_no: 1,
            page_size: PAGE_SIZE,
        };
        let alarms = self.call::<AlarmPage, _>(ALARMS_PATH, &request).await;
        let alarms = degrade(&self.name, "alarms", alarms);

        Ok(normalize_summary(
            &self.name,
            &stations,
            alarms.as_ref().map(|page| page.records.as_slice()),
        ))
    }

    async fn fetch_snapshots(&self, query: &SnapshotQuery) -> Result<Vec<RawSnapshot>> {
        let request = KpiHistoryRequest {
            id: &query.entity_id,
            granularity: query.granularity,
            start_date: query.start_param(),
            end_date: query.end_param(),
        };
        let records: Vec<KpiRecord> = self.call(KPI_HISTORY_PATH, &request).await?;
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
