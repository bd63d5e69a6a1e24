use sdk::types::ToolResult;

use super::schema::ZOOM;
use crate::config::MapConfig;
use crate::map_state::MapStateStore;

/// Set the zoom level, clamping into the configured bounds instead of failing
pub fn zoom(store: &MapStateStore, bounds: &MapConfig, requested: i64) -> ToolResult {
    let level = bounds.clamp_zoom(requested);
    let state = store.mutate(|current| current.with_zoom(level));

    let summary = if i64::from(level) == requested {
        format!("Zoomed to level {}", level)
    } else {
        format!(
            "Zoomed to level {} (requested {} was clamped to the supported range {}-{})",
            level, requested, bounds.min_zoom, bounds.max_zoom
        )
    };

    ToolResult::success(ZOOM.name, summary, state)
}
