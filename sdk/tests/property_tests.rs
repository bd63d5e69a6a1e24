use proptest::prelude::*;
use sdk::errors::{EngineError, ErrorExt};
use sdk::protocol::{ClientMessage, ServerMessage};
use sdk::types::{coordinates_in_range, LastAction, MapState};

// User hints never echo the internal error detail
proptest! {
    #[test]
    fn test_error_user_hint_completeness(error_str in "[a-zA-Z0-9 _-]{8,40}") {
        let errs = vec![
            EngineError::Config(error_str.clone()),
            EngineError::Validation(error_str.clone()),
            EngineError::ToolNotFound(error_str.clone()),
            EngineError::LocationNotFound(error_str.clone()),
            EngineError::Geocoding(error_str.clone()),
            EngineError::LLMProvider(error_str.clone()),
            EngineError::Protocol(error_str.clone()),
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            prop_assert!(!hint.contains(&error_str));
        }
    }
}

// Any non-blank chat text decodes, trimmed
proptest! {
    #[test]
    fn test_chat_message_decode(content in "[a-zA-Z0-9][a-zA-Z0-9 .,-]{0,60}") {
        let frame = serde_json::json!({"type": "chat_message", "content": content}).to_string();
        let decoded = ClientMessage::decode(&frame).unwrap();
        prop_assert_eq!(decoded, ClientMessage::ChatMessage { content: content.trim().to_string() });
    }
}

// Outbound snapshots always carry all five fields
proptest! {
    #[test]
    fn test_outbound_snapshot_is_complete(
        lat in -90.0..=90.0f64,
        lon in -180.0..=180.0f64,
        zoom in 0u8..=20,
        version in 0u64..1_000_000,
    ) {
        let state = MapState {
            latitude: lat,
            longitude: lon,
            zoom,
            last_action: LastAction::Navigate,
            version,
        };
        prop_assert!(coordinates_in_range(state.latitude, state.longitude));

        let msg = ServerMessage::StateSync { map_state: state };
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        let map_state = &json["map_state"];
        for field in ["latitude", "longitude", "zoom", "last_action", "version"] {
            prop_assert!(!map_state[field].is_null(), "missing field {}", field);
        }
        prop_assert_eq!(map_state["version"].as_u64(), Some(version));
    }
}
