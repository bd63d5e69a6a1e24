//! Error types and handling
//!
//! This module provides the error taxonomy shared by the Waypoint engine.
//! All errors implement the `ErrorExt` trait which provides user-facing
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Hints are static strings. They never echo provider responses, URLs or
//! API keys, so they are safe to forward to any connected client.

use thiserror::Error;

/// Trait for Waypoint error extensions
pub trait ErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain
    /// provider output or internal implementation details.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or self-corrected by the model
    /// within the same turn.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: invalid or missing configuration
/// - **Validation**: malformed or out-of-range tool arguments
/// - **Geocoding**: no match, ambiguous match, provider failure
/// - **Completion provider**: timeout, HTTP or parse failure
/// - **Turn control**: round limit, empty model reply
/// - **Transport**: per-connection send failures, malformed client frames
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, ErrorExt};
///
/// let error = EngineError::RoundLimitExceeded { rounds: 6 };
/// println!("Hint: {}", error.user_hint());
/// assert!(!error.is_recoverable());
///
/// let error = EngineError::LocationNotFound("Atlantis".to_string());
/// assert!(error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Tool argument errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    // Geocoding errors
    #[error("No location found for '{0}'")]
    LocationNotFound(String),

    #[error("Ambiguous location '{query}'. Candidates: {}", .candidates.join("; "))]
    AmbiguousLocation {
        query: String,
        candidates: Vec<String>,
    },

    #[error("Geocoding provider timed out")]
    GeocodingTimeout,

    #[error("Geocoding provider error: {0}")]
    Geocoding(String),

    // Completion provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    #[error("LLM call timed out")]
    LLMTimeout,

    #[error("LLM returned an empty response")]
    EmptyResponse,

    // Turn control errors
    #[error("Round limit exceeded after {rounds} rounds")]
    RoundLimitExceeded { rounds: usize },

    // Transport errors
    #[error("Failed to deliver message to connection {0}")]
    ConnectionSend(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl ErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",

            Self::Validation(_) => "The requested map operation had invalid arguments",
            Self::ToolNotFound(_) => "The requested map operation is not available",

            Self::LocationNotFound(_) => "That place could not be found",
            Self::AmbiguousLocation { .. } => {
                "Several places match that name. Please be more specific"
            }
            Self::GeocodingTimeout => "The place lookup took too long. Please try again",
            Self::Geocoding(_) => "The place lookup service is unavailable right now",

            Self::LLMProvider(_) => {
                "Sorry, the assistant is unavailable right now. Please try again in a moment"
            }
            Self::LLMTimeout => "Sorry, the assistant took too long to respond. Please try again",
            Self::EmptyResponse => {
                "Sorry, the assistant did not produce an answer. Please try rephrasing your request"
            }

            Self::RoundLimitExceeded { .. } => {
                "Sorry, that request needed too many steps. Try breaking it into smaller requests"
            }

            Self::ConnectionSend(_) => "A viewer connection was lost",
            Self::Protocol(_) => {
                "Message not understood. Send {\"type\": \"chat_message\", \"content\": \"...\"}"
            }
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // These end the turn
            Self::Config(_)
            | Self::LLMProvider(_)
            | Self::LLMTimeout
            | Self::EmptyResponse
            | Self::RoundLimitExceeded { .. } => false,

            // The model or client can correct these and carry on
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_ending_errors_are_not_recoverable() {
        assert!(!EngineError::LLMTimeout.is_recoverable());
        assert!(!EngineError::LLMProvider("500".to_string()).is_recoverable());
        assert!(!EngineError::RoundLimitExceeded { rounds: 6 }.is_recoverable());
        assert!(!EngineError::EmptyResponse.is_recoverable());
    }

    #[test]
    fn test_tool_level_errors_are_recoverable() {
        assert!(EngineError::Validation("lat".to_string()).is_recoverable());
        assert!(EngineError::GeocodingTimeout.is_recoverable());
        assert!(EngineError::AmbiguousLocation {
            query: "Springfield".to_string(),
            candidates: vec![],
        }
        .is_recoverable());
    }

    #[test]
    fn test_provider_hint_does_not_leak_detail() {
        let err = EngineError::LLMProvider("Bearer sk-secret rejected".to_string());
        assert!(!err.user_hint().contains("sk-secret"));
        assert!(err.to_string().contains("sk-secret"));
    }

    #[test]
    fn test_round_limit_hint_differs_from_provider_hint() {
        let limit = EngineError::RoundLimitExceeded { rounds: 6 };
        let provider = EngineError::LLMProvider(String::new());
        assert_ne!(limit.user_hint(), provider.user_hint());
    }
}
