use super::{GeocodeCandidate, GeocodeError, Geocoder};
use crate::config::GeocodingConfig;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use serde::Deserialize;
use sdk::types::coordinates_in_range;
use tracing::{debug, warn};

/// ArcGIS World GeocodeServer client (`findAddressCandidates`)
pub struct ArcGisGeocoder {
    config: GeocodingConfig,
    retry: RetryPolicy,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct FindCandidatesResponse {
    #[serde(default)]
    candidates: Vec<RawCandidate>,

    // ArcGIS reports some failures with HTTP 200 and an error body
    error: Option<RawError>,
}

#[derive(Debug, Deserialize)]
struct RawCandidate {
    #[serde(default)]
    address: String,
    location: Option<RawLocation>,
    #[serde(default)]
    score: f64,
}

#[derive(Debug, Deserialize)]
struct RawLocation {
    x: Option<f64>,
    y: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl ArcGisGeocoder {
    pub fn new(config: GeocodingConfig) -> Self {
        let retry = RetryPolicy::new(config.max_retries, config.timeout());
        Self {
            config,
            retry,
            client: reqwest::Client::new(),
        }
    }

    /// Override the retry schedule
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/findAddressCandidates",
            self.config.base_url.trim_end_matches('/')
        )
    }

    async fn request_once(&self, query: &str) -> Result<FindCandidatesResponse, GeocodeError> {
        let max_locations = self.config.max_locations.to_string();
        let response = self
            .client
            .get(self.endpoint())
            .query(&[
                ("f", "json"),
                ("maxLocations", max_locations.as_str()),
                ("outFields", "*"),
                ("SingleLine", query),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeocodeError::Timeout
                } else {
                    GeocodeError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Http {
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))
    }
}

#[async_trait]
impl Geocoder for ArcGisGeocoder {
    fn name(&self) -> &str {
        "arcgis"
    }

    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeCandidate>, GeocodeError> {
        debug!("Geocoding '{}'", query);

        let body = self
            .retry
            .run("geocoding request", || self.request_once(query))
            .await?;

        if let Some(error) = body.error {
            return Err(GeocodeError::Provider(format!(
                "{} (code {})",
                error.message, error.code
            )));
        }

        Ok(into_candidates(body.candidates))
    }
}

/// Convert raw candidates, dropping entries without usable coordinates.
/// ArcGIS puts longitude in `x` and latitude in `y`, with scores out of 100.
fn into_candidates(raw: Vec<RawCandidate>) -> Vec<GeocodeCandidate> {
    raw.into_iter()
        .filter_map(|candidate| {
            let location = candidate.location?;
            let (Some(longitude), Some(latitude)) = (location.x, location.y) else {
                return None;
            };
            if !coordinates_in_range(latitude, longitude) {
                warn!(
                    "Dropping candidate '{}' with invalid coordinates ({}, {})",
                    candidate.address, latitude, longitude
                );
                return None;
            }

            Some(GeocodeCandidate {
                name: candidate.address,
                latitude,
                longitude,
                confidence: (candidate.score / 100.0).clamp(0.0, 1.0),
            })
        })
        .collect()
}
