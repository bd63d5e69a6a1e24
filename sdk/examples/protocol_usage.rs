//! Example demonstrating the client wire protocol

use sdk::{ClientMessage, LastAction, MapState, ServerMessage, ToolResult};

fn main() {
    // Example 1: Decoding inbound frames
    for frame in [
        r#"{"type": "chat_message", "content": "Show me Lisbon"}"#,
        r#"{"type": "ping"}"#,
        r#"{"type": "chat_message", "content": "   "}"#,
        "not json",
    ] {
        match ClientMessage::decode(frame) {
            Ok(message) => println!("Decoded: {:?}", message),
            Err(e) => println!("Rejected {}: {}", frame, e),
        }
    }

    // Example 2: A state change and the progress message it produces
    let state = MapState::initial(0.0, 0.0, 2).with_position(38.7223, -9.1393, LastAction::Geocode);
    let result = ToolResult::success("geocode_and_navigate", "Found 'Lisbon'", state);

    let progress = ServerMessage::tool_progress(&result, state);
    match progress.to_json() {
        Ok(json) => println!("\nProgress frame: {}", json),
        Err(e) => println!("Encoding failed: {}", e),
    }

    // Example 3: The greeting a new viewer receives
    let greeting = ServerMessage::StateSync { map_state: state };
    if let Ok(json) = greeting.to_json() {
        println!("Greeting frame: {}", json);
    }
}
