//! Waypoint SDK
//!
//! Shared library providing the map data model, the client wire protocol
//! and the error taxonomy. Used by the engine and by anything that talks to it.

/// Error types and handling
pub mod errors;

/// Client wire protocol
pub mod protocol;

/// Map state and tool result types
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, ErrorExt};
pub use protocol::{ClientMessage, ProtocolError, ServerMessage};
pub use types::{LastAction, MapState, ToolOutcome, ToolResult};
