use sdk::errors::EngineError;
use sdk::types::{coordinates_in_range, LastAction, MapState, ToolResult};

use super::schema::NAVIGATE;
use crate::map_state::MapStateStore;

/// Move the map center. Out-of-range coordinates leave the state untouched.
pub fn navigate(store: &MapStateStore, latitude: f64, longitude: f64) -> ToolResult {
    match move_to(store, latitude, longitude, LastAction::Navigate, None) {
        Ok(state) => ToolResult::success(
            NAVIGATE.name,
            format!("Navigated to {:.6}, {:.6}", state.latitude, state.longitude),
            state,
        ),
        Err(e) => ToolResult::failure(NAVIGATE.name, e.to_string()),
    }
}

/// Position update shared with `geocode_and_navigate`.
///
/// The range check, the move and the optional zoom change are one mutation.
pub(crate) fn move_to(
    store: &MapStateStore,
    latitude: f64,
    longitude: f64,
    action: LastAction,
    zoom: Option<u8>,
) -> Result<MapState, EngineError> {
    store.try_mutate(|current| {
        if !coordinates_in_range(latitude, longitude) {
            return Err(EngineError::Validation(format!(
                "coordinates ({}, {}) are out of range; latitude must be in [-90, 90] and longitude in [-180, 180]",
                latitude, longitude
            )));
        }
        let moved = current.with_position(latitude, longitude, action);
        Ok(MapState {
            zoom: zoom.unwrap_or(moved.zoom),
            ..moved
        })
    })
}
