use thiserror::Error;

/// Failure talking to the KPI data API.
///
/// An empty dataset is not an error; it yields empty breakpoints and an
/// all-gray map.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("request to {endpoint} failed: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} answered with status {status}")]
    Status { endpoint: String, status: u16 },
    #[error("{endpoint} returned malformed data: {source}")]
    Malformed {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DataError {
    pub fn endpoint(&self) -> &str {
        match self {
            DataError::Network { endpoint, .. }
            | DataError::Status { endpoint, .. }
            | DataError::Malformed { endpoint, .. } => endpoint,
        }
    }
}
