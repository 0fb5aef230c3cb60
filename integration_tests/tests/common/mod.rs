#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Datelike;
use kommun_core::{
    Dashboard, DashboardConfig, DashboardEvent, DataError, DataSource, GeoRegistry, Indicator,
    Scene,
};
use kommun_proto::{
    GenderValue, HistoryPoint, KpiGroup, KpiSearchPage, MunicipalityRecord, GENDER_TOTAL,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Semaphore;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn registry() -> Arc<GeoRegistry> {
    let path = fixture_path("regions.geojson");
    Arc::new(GeoRegistry::from_file(&path).expect("fixture regions load"))
}

/// Year the dashboard preselects with the builtin config.
pub fn default_year() -> String {
    (chrono::Local::now().year() - 1).to_string()
}

pub fn indicator(id: &str) -> Indicator {
    Indicator {
        id: id.to_string(),
        title: format!("KPI {id}"),
        group_title: "Test".to_string(),
    }
}

/// Records carrying a total plus a gender split that must be ignored.
pub fn records(values: &[(&str, f64)]) -> Vec<MunicipalityRecord> {
    values
        .iter()
        .map(|(region, value)| MunicipalityRecord {
            municipality: region.to_string(),
            values: vec![
                GenderValue {
                    gender: "K".to_string(),
                    value: Some(value * 10.0),
                },
                GenderValue {
                    gender: GENDER_TOTAL.to_string(),
                    value: Some(*value),
                },
            ],
        })
        .collect()
}

/// Holds fetches back until opened.
#[derive(Clone)]
pub struct Gate(Arc<Semaphore>);

impl Gate {
    pub fn new() -> Self {
        Self(Arc::new(Semaphore::new(0)))
    }

    /// Release every current and future waiter.
    pub fn open(&self) {
        // acquire() on a closed semaphore returns immediately
        self.0.close();
    }

    async fn pass(&self) {
        let _ = self.0.acquire().await;
    }
}

fn failure(endpoint: String) -> DataError {
    DataError::Status {
        endpoint,
        status: 500,
    }
}

/// In-memory [`DataSource`] with per-call counters and optional gates.
#[derive(Default)]
pub struct FakeSource {
    years: HashMap<String, Vec<String>>,
    values: HashMap<(String, String), Vec<MunicipalityRecord>>,
    history: HashMap<(String, String), Vec<HistoryPoint>>,
    fail_years: bool,
    fail_history: bool,
    values_gates: Mutex<HashMap<String, Gate>>,
    history_gate: Mutex<Option<Gate>>,
    history_calls: Mutex<Vec<String>>,
    values_calls: AtomicUsize,
}

impl FakeSource {
    pub fn with_years(mut self, indicator: &str, years: &[&str]) -> Self {
        self.years.insert(
            indicator.to_string(),
            years.iter().map(|y| y.to_string()).collect(),
        );
        self
    }

    pub fn with_values(mut self, indicator: &str, year: &str, values: &[(&str, f64)]) -> Self {
        self.values
            .insert((indicator.to_string(), year.to_string()), records(values));
        self
    }

    pub fn with_history(mut self, indicator: &str, region: &str, points: &[(i32, f64)]) -> Self {
        self.history.insert(
            (indicator.to_string(), region.to_string()),
            points
                .iter()
                .map(|&(year, value)| HistoryPoint { year, value })
                .collect(),
        );
        self
    }

    pub fn failing_years(mut self) -> Self {
        self.fail_years = true;
        self
    }

    pub fn failing_history(mut self) -> Self {
        self.fail_history = true;
        self
    }

    /// Values fetches for the indicator wait until the returned gate opens.
    pub fn gate_values(&self, indicator: &str) -> Gate {
        let gate = Gate::new();
        self.values_gates
            .lock()
            .unwrap()
            .insert(indicator.to_string(), gate.clone());
        gate
    }

    /// History fetches wait until the returned gate opens.
    pub fn gate_history(&self) -> Gate {
        let gate = Gate::new();
        *self.history_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn history_calls(&self) -> Vec<String> {
        self.history_calls.lock().unwrap().clone()
    }

    pub fn values_calls(&self) -> usize {
        self.values_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for FakeSource {
    async fn kpi_groups(&self) -> Result<Vec<KpiGroup>, DataError> {
        Ok(Vec::new())
    }

    async fn search_kpis(&self, _term: &str, _page: u32) -> Result<KpiSearchPage, DataError> {
        Ok(KpiSearchPage::default())
    }

    async fn available_years(&self, indicator_id: &str) -> Result<Vec<String>, DataError> {
        if self.fail_years {
            return Err(failure("/kpi_data".to_string()));
        }
        Ok(self.years.get(indicator_id).cloned().unwrap_or_default())
    }

    async fn municipality_values(
        &self,
        indicator_id: &str,
        year: &str,
    ) -> Result<Vec<MunicipalityRecord>, DataError> {
        self.values_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.values_gates.lock().unwrap().get(indicator_id).cloned();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        Ok(self
            .values
            .get(&(indicator_id.to_string(), year.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn history(
        &self,
        indicator_id: &str,
        region_id: &str,
    ) -> Result<Vec<HistoryPoint>, DataError> {
        self.history_calls
            .lock()
            .unwrap()
            .push(region_id.to_string());
        let gate = self.history_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        if self.fail_history {
            return Err(failure(format!("/historical_data/{indicator_id}/{region_id}")));
        }
        Ok(self
            .history
            .get(&(indicator_id.to_string(), region_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// A dashboard over the fixture regions, drawing into a [`Scene`].
pub struct Harness {
    pub dashboard: Dashboard<Scene>,
    pub source: Arc<FakeSource>,
    events: UnboundedReceiver<DashboardEvent>,
}

impl Harness {
    /// Must be called from inside a tokio runtime.
    pub fn new(source: FakeSource) -> Self {
        let source = Arc::new(source);
        let config = DashboardConfig::builtin();
        let (dashboard, events) = Dashboard::new(
            &config,
            source.clone(),
            registry(),
            Scene::default(),
            tokio::runtime::Handle::current(),
        );
        Self {
            dashboard,
            source,
            events,
        }
    }

    pub fn scene(&self) -> &Scene {
        self.dashboard.renderer()
    }

    /// Apply events until none arrive for a short while.
    pub async fn settle(&mut self) {
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_millis(100), self.events.recv()).await
        {
            self.dashboard.handle_event(event);
        }
    }

    /// Apply exactly one event.
    pub async fn step(&mut self) -> anyhow::Result<()> {
        let event = tokio::time::timeout(Duration::from_secs(2), self.events.recv())
            .await?
            .ok_or_else(|| anyhow::anyhow!("event channel closed"))?;
        self.dashboard.handle_event(event);
        Ok(())
    }
}

/// Poll until the condition holds, failing after two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> anyhow::Result<()> {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;
    Ok(())
}
