//! Recovery of tool calls and answers embedded in plain text content
//!
//! Smaller local models frequently ignore the native tool-calling channel and
//! write the call into the message body instead. The helpers here recognise
//! the shapes seen in practice:
//!
//! 1. Raw JSON: `{"function": "...", "arguments": {...}}` (also `name` /
//!    `function_name` for the tool and `parameters` for the arguments)
//! 2. A JSON array of such objects
//! 3. Fenced JSON, with or without trailing prose
//! 4. `<tool_call>name({...})</tool_call>` markers
//! 5. A call object embedded in prose
//!
//! An object counts as a call only when it names a tool and carries an
//! arguments key, so ordinary JSON in an answer is left alone. Malformed
//! markers are skipped.

use serde_json::Value;

use super::ToolCall;

const NAME_KEYS: [&str; 3] = ["function", "name", "function_name"];
const ARGUMENT_KEYS: [&str; 2] = ["arguments", "parameters"];

/// Extract tool calls written into the content body, in emitted order.
///
/// Returns an empty vector when the content is ordinary prose.
pub fn parse_tool_calls(content: &str) -> Vec<ToolCall> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    // Whole content is JSON
    if let Some(calls) = calls_from_json_str(trimmed) {
        return calls;
    }

    // Markdown code fence
    if let Some(inner) = extract_fenced_json(trimmed) {
        if let Some(calls) = calls_from_json_str(inner.trim()) {
            return calls;
        }
    }

    // <tool_call>name({...})</tool_call>
    let markers = parse_tool_call_markers(trimmed);
    if !markers.is_empty() {
        return markers;
    }

    // Call object somewhere in prose
    let mut calls = Vec::new();
    let mut rest = trimmed;
    while let Some(pos) = rest.find('{') {
        let candidate = &rest[pos..];
        match extract_balanced_json(candidate) {
            Some(json_str) => {
                if let Some(call) = serde_json::from_str::<Value>(json_str)
                    .ok()
                    .as_ref()
                    .and_then(call_from_value)
                {
                    calls.push(call);
                }
                rest = &candidate[json_str.len()..];
            }
            None => break,
        }
    }
    calls
}

/// Unwrap a `{"response": "..."}` envelope some models put around plain answers.
///
/// Returns `None` when the content is not such an envelope.
pub fn unwrap_response_json(content: &str) -> Option<String> {
    let trimmed = content.trim();
    let body = extract_fenced_json(trimmed).map(str::trim).unwrap_or(trimmed);
    let json: Value = serde_json::from_str(body).ok()?;
    let object = json.as_object()?;
    if object.len() != 1 {
        return None;
    }
    object.get("response")?.as_str().map(str::to_string)
}

fn calls_from_json_str(s: &str) -> Option<Vec<ToolCall>> {
    let json: Value = serde_json::from_str(s).ok()?;
    match &json {
        Value::Array(items) => {
            let calls: Vec<ToolCall> = items.iter().filter_map(call_from_value).collect();
            (!calls.is_empty() && calls.len() == items.len()).then_some(calls)
        }
        Value::Object(_) => call_from_value(&json).map(|call| vec![call]),
        _ => None,
    }
}

fn call_from_value(value: &Value) -> Option<ToolCall> {
    let object = value.as_object()?;
    let name = NAME_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|name| is_tool_name(name))?;
    let arguments = ARGUMENT_KEYS
        .iter()
        .find_map(|key| object.get(*key))
        .map(arguments_to_string)?;

    Some(ToolCall::generated(name, arguments))
}

/// Arguments may arrive as an object or as an already-encoded JSON string
pub(crate) fn arguments_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "{}".to_string(),
        other => other.to_string(),
    }
}

fn parse_tool_call_markers(content: &str) -> Vec<ToolCall> {
    const OPEN: &str = "<tool_call>";
    const CLOSE: &str = "</tool_call>";

    let mut calls = Vec::new();
    let mut rest = content;
    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };
        let body = after_open[..end].trim();

        if let Some(call) = marker_call(body) {
            calls.push(call);
        } else if let Some(call) = calls_from_json_str(body) {
            calls.extend(call);
        }

        rest = &after_open[end + CLOSE.len()..];
    }
    calls
}

/// `name(args)` inside a marker; `None` unless the shape is exactly that
fn marker_call(body: &str) -> Option<ToolCall> {
    let (name, rest) = body.split_once('(')?;
    let name = name.trim();
    if !is_tool_name(name) {
        return None;
    }
    let arguments = rest.trim_end().strip_suffix(')')?.trim();
    let arguments = if arguments.is_empty() { "{}" } else { arguments };
    Some(ToolCall::generated(name, arguments))
}

fn is_tool_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Extract the body of the first markdown code fence in the text.
///
/// Works even when there is trailing prose after the closing ```.
fn extract_fenced_json(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line (e.g. "json\n")
    let body_start_rel = after_opening.find('\n')? + 1;
    let body_start = fence_start + 3 + body_start_rel;

    let closing = content[body_start..].find("```")?;
    let body_end = body_start + closing;

    if body_start >= body_end {
        return None;
    }

    Some(&content[body_start..body_end])
}

/// Extract a balanced JSON object starting at position 0 of `s`.
///
/// Counts `{` / `}` depth, respecting string literals.
fn extract_balanced_json(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
