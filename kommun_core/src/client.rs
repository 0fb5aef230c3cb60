//! Access to the KPI data API.

use async_trait::async_trait;
use kommun_proto::{HistoryPoint, KpiGroup, KpiSearchPage, MunicipalityRecord};
use serde::de::DeserializeOwned;

use crate::config::ApiConfig;
use crate::error::DataError;

/// The data API as the dashboard uses it.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn kpi_groups(&self) -> Result<Vec<KpiGroup>, DataError>;

    async fn search_kpis(&self, term: &str, page: u32) -> Result<KpiSearchPage, DataError>;

    /// Years with data for the indicator, as strings.
    async fn available_years(&self, indicator_id: &str) -> Result<Vec<String>, DataError>;

    async fn municipality_values(
        &self,
        indicator_id: &str,
        year: &str,
    ) -> Result<Vec<MunicipalityRecord>, DataError>;

    async fn history(
        &self,
        indicator_id: &str,
        region_id: &str,
    ) -> Result<Vec<HistoryPoint>, DataError>;
}

/// [`DataSource`] over HTTP with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpDataSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDataSource {
    pub fn new(config: &ApiConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_http_client(&config.base_url, client))
    }

    pub fn with_http_client(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: String,
        query: &[(&str, &str)],
    ) -> Result<T, DataError> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::trace!(target: "kommun::http", %url, ?query, "http.get");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| DataError::Network {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| DataError::Network {
            endpoint: endpoint.clone(),
            source,
        })?;
        serde_json::from_slice(&body).map_err(|source| DataError::Malformed { endpoint, source })
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn kpi_groups(&self) -> Result<Vec<KpiGroup>, DataError> {
        self.get_json("/kpi_groups".to_string(), &[]).await
    }

    async fn search_kpis(&self, term: &str, page: u32) -> Result<KpiSearchPage, DataError> {
        let page = page.max(1).to_string();
        self.get_json(
            "/search_kpis".to_string(),
            &[("term", term), ("page", page.as_str())],
        )
        .await
    }

    async fn available_years(&self, indicator_id: &str) -> Result<Vec<String>, DataError> {
        self.get_json("/kpi_data".to_string(), &[("kpi_id", indicator_id)])
            .await
    }

    async fn municipality_values(
        &self,
        indicator_id: &str,
        year: &str,
    ) -> Result<Vec<MunicipalityRecord>, DataError> {
        self.get_json(
            format!("/municipality_data/{indicator_id}"),
            &[("year", year)],
        )
        .await
    }

    async fn history(
        &self,
        indicator_id: &str,
        region_id: &str,
    ) -> Result<Vec<HistoryPoint>, DataError> {
        self.get_json(format!("/historical_data/{indicator_id}/{region_id}"), &[])
            .await
    }
}
