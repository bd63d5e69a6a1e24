//! Geocoding Provider Abstraction
//!
//! A [`Geocoder`] turns a free-text query into an ordered list of candidate
//! locations. Candidate selection (not found / ambiguous / best match) is a
//! tool-level policy and lives in `tools::geocode`, not here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::retry::Retryable;

pub mod arcgis;

pub use arcgis::ArcGisGeocoder;

/// One location matching a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeCandidate {
    /// Human-readable name or formatted address
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,

    /// Match confidence in `[0.0, 1.0]`
    pub confidence: f64,
}

/// Geocoding failures
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("Geocoding request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Geocoding provider returned HTTP {status}")]
    Http { status: u16 },

    #[error("Geocoding provider error: {0}")]
    Provider(String),

    #[error("Failed to parse geocoding response: {0}")]
    Parse(String),
}

impl Retryable for GeocodeError {
    fn is_retryable(&self) -> bool {
        match self {
            GeocodeError::Timeout | GeocodeError::Network(_) => true,
            GeocodeError::Http { status } => *status == 429 || *status >= 500,
            GeocodeError::Provider(_) | GeocodeError::Parse(_) => false,
        }
    }

    fn timed_out() -> Self {
        GeocodeError::Timeout
    }
}

/// Address / place-name lookup service
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Returns the name of the provider (e.g., "arcgis")
    fn name(&self) -> &str;

    /// Look up `query`; candidates are ordered best first and may be empty
    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeCandidate>, GeocodeError>;
}
