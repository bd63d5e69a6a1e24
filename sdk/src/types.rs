//! Map state and tool result types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Valid latitude range in degrees
pub const LATITUDE_RANGE: RangeInclusive<f64> = -90.0..=90.0;

/// Valid longitude range in degrees
pub const LONGITUDE_RANGE: RangeInclusive<f64> = -180.0..=180.0;

/// The last operation that mutated the map
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LastAction {
    Navigate,
    Zoom,
    Geocode,
    #[default]
    None,
}

impl fmt::Display for LastAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastAction::Navigate => write!(f, "navigate"),
            LastAction::Zoom => write!(f, "zoom"),
            LastAction::Geocode => write!(f, "geocode"),
            LastAction::None => write!(f, "none"),
        }
    }
}

/// Snapshot of the shared map.
///
/// A `MapState` value is always a full, self-consistent copy. The store hands
/// these out by value, so holding one never blocks writers and a snapshot can
/// never observe a later mutation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MapState {
    /// Center latitude in degrees, within [`LATITUDE_RANGE`]
    pub latitude: f64,

    /// Center longitude in degrees, within [`LONGITUDE_RANGE`]
    pub longitude: f64,

    /// Zoom level, within the configured zoom bounds
    pub zoom: u8,

    /// Operation that produced this state
    pub last_action: LastAction,

    /// Incremented once per accepted mutation
    pub version: u64,
}

impl MapState {
    /// Initial state at process start (version 0, no action yet)
    pub fn initial(latitude: f64, longitude: f64, zoom: u8) -> Self {
        Self {
            latitude,
            longitude,
            zoom,
            last_action: LastAction::None,
            version: 0,
        }
    }

    /// Copy of this state centered on a new position
    pub fn with_position(self, latitude: f64, longitude: f64, action: LastAction) -> Self {
        Self {
            latitude,
            longitude,
            last_action: action,
            ..self
        }
    }

    /// Copy of this state at a new zoom level
    pub fn with_zoom(self, zoom: u8) -> Self {
        Self {
            zoom,
            last_action: LastAction::Zoom,
            ..self
        }
    }
}

/// Returns true if both coordinates are finite and inside their ranges
pub fn coordinates_in_range(latitude: f64, longitude: f64) -> bool {
    LATITUDE_RANGE.contains(&latitude) && LONGITUDE_RANGE.contains(&longitude)
}

/// Outcome of a single tool execution
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    Success,
    Failure,
}

/// Structured result of one tool call.
///
/// Fed back into the conversation so the model can react to it, and mirrored
/// to clients as a `tool_progress` message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    /// Name of the tool as requested by the model
    pub tool: String,

    pub outcome: ToolOutcome,

    /// Human-readable description of what happened
    pub summary: String,

    /// State after the mutation; `None` when nothing was mutated
    pub state_snapshot: Option<MapState>,
}

impl ToolResult {
    /// Create a success result carrying the post-mutation snapshot
    pub fn success(tool: impl Into<String>, summary: impl Into<String>, state: MapState) -> Self {
        Self {
            tool: tool.into(),
            outcome: ToolOutcome::Success,
            summary: summary.into(),
            state_snapshot: Some(state),
        }
    }

    /// Create a failure result; failures never carry a snapshot
    pub fn failure(tool: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            outcome: ToolOutcome::Failure,
            summary: summary.into(),
            state_snapshot: None,
        }
    }

    /// Whether the tool succeeded
    pub fn is_success(&self) -> bool {
        self.outcome == ToolOutcome::Success
    }
}
