use sdk::errors::{EngineError, ErrorExt};
use sdk::types::{LastAction, ToolResult};
use tracing::{info, warn};

use super::navigate::move_to;
use super::schema::GEOCODE_AND_NAVIGATE;
use crate::config::MapConfig;
use crate::geocoding::{GeocodeCandidate, GeocodeError, Geocoder};
use crate::map_state::MapStateStore;
use crate::retry::Retryable;

/// Candidate names listed in an ambiguity failure
const MAX_LISTED_CANDIDATES: usize = 5;

/// How a geocode result is turned into a map move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeocodePolicy {
    /// A best match among several is accepted only above this confidence
    pub confidence_threshold: f64,

    /// Zoom applied together with the move; `None` keeps the current zoom
    pub focus_zoom: Option<u8>,
}

/// Look up `query` and move the map to the selected candidate
pub async fn geocode_and_navigate(
    store: &MapStateStore,
    geocoder: &dyn Geocoder,
    bounds: &MapConfig,
    policy: &GeocodePolicy,
    query: &str,
) -> ToolResult {
    match locate(geocoder, policy, query).await {
        Ok(chosen) => move_to_candidate(store, bounds, policy, &chosen),
        Err(failure) => failure,
    }
}

/// Lookup half of [`geocode_and_navigate`]: resolve `query` to one candidate.
///
/// Touches no state. A lookup failure or an unusable answer comes back as
/// the failed result to report.
pub async fn locate(
    geocoder: &dyn Geocoder,
    policy: &GeocodePolicy,
    query: &str,
) -> Result<GeocodeCandidate, ToolResult> {
    let tool = GEOCODE_AND_NAVIGATE.name;

    let candidates = match geocoder.geocode(query).await {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!("{} lookup for '{}' failed: {}", geocoder.name(), query, e);
            return Err(ToolResult::failure(tool, lookup_failure_summary(&e)));
        }
    };

    match select_candidate(query, &candidates, policy.confidence_threshold) {
        Ok(chosen) => Ok(chosen.clone()),
        Err(e) => {
            info!("Geocode '{}' not applied: {}", query, e);
            Err(ToolResult::failure(tool, e.to_string()))
        }
    }
}

/// Mutation half of [`geocode_and_navigate`]: move and focus-zoom in one step
pub fn move_to_candidate(
    store: &MapStateStore,
    bounds: &MapConfig,
    policy: &GeocodePolicy,
    chosen: &GeocodeCandidate,
) -> ToolResult {
    let tool = GEOCODE_AND_NAVIGATE.name;
    let zoom = policy
        .focus_zoom
        .map(|level| bounds.clamp_zoom(i64::from(level)));

    match move_to(
        store,
        chosen.latitude,
        chosen.longitude,
        LastAction::Geocode,
        zoom,
    ) {
        Ok(state) => ToolResult::success(
            tool,
            format!(
                "Found '{}' (confidence {:.0}%) and navigated to {:.6}, {:.6} at zoom {}",
                chosen.name,
                chosen.confidence * 100.0,
                state.latitude,
                state.longitude,
                state.zoom
            ),
            state,
        ),
        Err(e) => ToolResult::failure(tool, e.to_string()),
    }
}

/// Pick the candidate to navigate to.
///
/// - no candidates: [`EngineError::LocationNotFound`]
/// - exactly one: that one
/// - several: the most confident, if it clears `threshold`, otherwise
///   [`EngineError::AmbiguousLocation`] listing the leading names
pub fn select_candidate<'a>(
    query: &str,
    candidates: &'a [GeocodeCandidate],
    threshold: f64,
) -> Result<&'a GeocodeCandidate, EngineError> {
    match candidates {
        [] => Err(EngineError::LocationNotFound(query.to_string())),
        [only] => Ok(only),
        _ => {
            let best = candidates
                .iter()
                .reduce(|best, c| if c.confidence > best.confidence { c } else { best })
                .ok_or_else(|| EngineError::LocationNotFound(query.to_string()))?;

            if best.confidence > threshold {
                Ok(best)
            } else {
                let mut ranked: Vec<&GeocodeCandidate> = candidates.iter().collect();
                ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
                Err(EngineError::AmbiguousLocation {
                    query: query.to_string(),
                    candidates: ranked
                        .into_iter()
                        .take(MAX_LISTED_CANDIDATES)
                        .map(|c| c.name.clone())
                        .collect(),
                })
            }
        }
    }
}

/// Summary for a failed lookup. Provider detail stays in the logs.
fn lookup_failure_summary(error: &GeocodeError) -> String {
    let engine_error = match error {
        GeocodeError::Timeout => EngineError::GeocodingTimeout,
        other => EngineError::Geocoding(other.to_string()),
    };

    if error.is_retryable() {
        format!("{} (retryable)", engine_error.user_hint())
    } else {
        engine_error.user_hint().to_string()
    }
}
