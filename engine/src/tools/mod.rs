pub mod geocode;
pub mod navigate;
pub mod schema;
pub mod zoom;

pub use geocode::GeocodePolicy;

use sdk::errors::EngineError;
use sdk::types::{MapState, ToolResult};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::config::{GeocodingConfig, MapConfig};
use crate::geocoding::{GeocodeCandidate, Geocoder};
use crate::llm::ToolDefinition;
use crate::map_state::MapStateStore;
use schema::ToolSchema;

/// The closed set of map operations the model can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapTool {
    Navigate,
    Zoom,
    GeocodeAndNavigate,
}

impl MapTool {
    pub const ALL: [MapTool; 3] = [MapTool::Navigate, MapTool::Zoom, MapTool::GeocodeAndNavigate];

    pub fn schema(&self) -> &'static ToolSchema {
        match self {
            MapTool::Navigate => &schema::NAVIGATE,
            MapTool::Zoom => &schema::ZOOM,
            MapTool::GeocodeAndNavigate => &schema::GEOCODE_AND_NAVIGATE,
        }
    }

    pub fn name(&self) -> &'static str {
        self.schema().name
    }

    /// Declaration handed to the completion provider
    pub fn definition(&self) -> ToolDefinition {
        let schema = self.schema();
        ToolDefinition {
            name: schema.name.to_string(),
            description: schema.description.to_string(),
            parameters: schema.to_json_schema(),
        }
    }
}

/// Arguments that passed validation, ready for an executor
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    Navigate { latitude: f64, longitude: f64 },
    Zoom { level: i64 },
    GeocodeAndNavigate { query: String },
}

impl ToolInvocation {
    pub fn tool(&self) -> MapTool {
        match self {
            ToolInvocation::Navigate { .. } => MapTool::Navigate,
            ToolInvocation::Zoom { .. } => MapTool::Zoom,
            ToolInvocation::GeocodeAndNavigate { .. } => MapTool::GeocodeAndNavigate,
        }
    }
}

/// Registry of tools the model may call.
///
/// Only registered tools are advertised and resolvable. A call that fails to
/// resolve or validate never reaches an executor; the error is turned into a
/// failed [`ToolResult`] so the model can see it and self-correct.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<MapTool>,
}

impl ToolRegistry {
    /// Create an empty registry with no tools enabled.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every map tool enabled
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for tool in MapTool::ALL {
            registry.register(tool);
        }
        registry
    }

    /// Enable a tool; registering twice is a no-op
    pub fn register(&mut self, tool: MapTool) {
        if !self.tools.contains(&tool) {
            self.tools.push(tool);
        }
    }

    pub fn resolve(&self, name: &str) -> Result<MapTool, EngineError> {
        self.tools
            .iter()
            .copied()
            .find(|tool| tool.name() == name)
            .ok_or_else(|| {
                EngineError::ToolNotFound(format!(
                    "'{}'. Available tools: {}",
                    name,
                    self.available_tool_names().join(", ")
                ))
            })
    }

    /// Resolve `name` and check `arguments_json` against its schema
    pub fn validate(&self, name: &str, arguments_json: &str) -> Result<ToolInvocation, EngineError> {
        let tool = self.resolve(name)?;

        let args: serde_json::Value = serde_json::from_str(arguments_json).map_err(|e| {
            EngineError::Validation(format!(
                "{}: failed to parse arguments JSON: {}",
                tool.name(),
                e
            ))
        })?;
        let object = tool.schema().validate(&args)?;

        // Types were checked by the schema; the fallbacks are unreachable
        let invocation = match tool {
            MapTool::Navigate => ToolInvocation::Navigate {
                latitude: object
                    .get("latitude")
                    .and_then(|v| v.as_f64())
                    .unwrap_or_default(),
                longitude: object
                    .get("longitude")
                    .and_then(|v| v.as_f64())
                    .unwrap_or_default(),
            },
            MapTool::Zoom => ToolInvocation::Zoom {
                level: object
                    .get("level")
                    .and_then(schema::integer_value)
                    .unwrap_or_default(),
            },
            MapTool::GeocodeAndNavigate => ToolInvocation::GeocodeAndNavigate {
                query: object
                    .get("query")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
            },
        };

        Ok(invocation)
    }

    /// Declarations of every registered tool
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(MapTool::definition).collect()
    }

    /// Generate a system prompt describing the available tools.
    ///
    /// Native tool calling is preferred; the JSON fallback format is described
    /// for models that only answer in text.
    pub fn system_prompt(&self) -> String {
        let mut parts = vec![
            "You are Waypoint, an assistant that controls an interactive map.".to_string(),
            String::new(),
            "RULES:".to_string(),
            "1. Use the tools to change the map. Never claim the map moved unless a tool result says it did.".to_string(),
            "2. For named places or addresses, call geocode_and_navigate. Call navigate only with explicit coordinates.".to_string(),
            "3. If a tool fails, read its summary. Correct the call, or explain the problem to the user (for example, ask which of several places they meant).".to_string(),
            "4. When you are done, reply with a short plain-text answer describing what the map now shows.".to_string(),
            String::new(),
            "If native tool calls are unavailable, answer with ONLY this JSON object:".to_string(),
            r#"{"function": "tool_name", "arguments": {"arg": "value"}}"#.to_string(),
            String::new(),
            "Available tools:".to_string(),
        ];

        for tool in &self.tools {
            let schema = tool.schema();
            parts.push(String::new());
            parts.push(format!("## {}", schema.name));
            parts.push(schema.description.to_string());
            for param in schema.params {
                parts.push(format!("- {}: {}", param.name, param.description));
            }
        }

        parts.join("\n")
    }

    /// Return the names of all currently enabled tools.
    pub fn available_tool_names(&self) -> Vec<&'static str> {
        self.tools.iter().map(MapTool::name).collect()
    }
}

/// Work left for the commit step once every await is done
enum Prepared {
    Settled(ToolResult),
    Navigate { latitude: f64, longitude: f64 },
    Zoom { level: i64 },
    Locate(GeocodeCandidate),
}

/// Runs validated invocations against the shared map state.
///
/// Mutations and their publication are serialized by `publish_gate`, so
/// published snapshots reach observers in version order even when several
/// turns run on different worker threads.
pub struct ToolExecutor {
    store: Arc<MapStateStore>,
    geocoder: Arc<dyn Geocoder>,
    bounds: MapConfig,
    geocode_policy: GeocodePolicy,
    publish_gate: Mutex<()>,
}

impl ToolExecutor {
    pub fn new(
        store: Arc<MapStateStore>,
        geocoder: Arc<dyn Geocoder>,
        bounds: MapConfig,
        geocoding: &GeocodingConfig,
    ) -> Self {
        Self {
            store,
            geocoder,
            bounds,
            geocode_policy: GeocodePolicy {
                confidence_threshold: geocoding.confidence_threshold,
                focus_zoom: geocoding.focus_zoom,
            },
            publish_gate: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<MapStateStore> {
        &self.store
    }

    pub async fn execute(&self, invocation: &ToolInvocation) -> ToolResult {
        let prepared = self.prepare(invocation).await;
        self.commit(prepared, |_, _| {})
    }

    /// Validate and execute one requested call.
    ///
    /// Never fails: unknown tools and bad arguments come back as failed results.
    pub async fn dispatch(
        &self,
        registry: &ToolRegistry,
        name: &str,
        arguments_json: &str,
    ) -> ToolResult {
        self.dispatch_and_publish(registry, name, arguments_json, |_, _| {})
            .await
    }

    /// Like [`dispatch`](Self::dispatch), handing the result and the state it
    /// left behind to `publish` before any other mutation can start.
    ///
    /// `publish` runs under the publish gate and must not block.
    pub async fn dispatch_and_publish<F>(
        &self,
        registry: &ToolRegistry,
        name: &str,
        arguments_json: &str,
        publish: F,
    ) -> ToolResult
    where
        F: FnOnce(&ToolResult, MapState),
    {
        debug!("Dispatching tool '{}' with args: {}", name, arguments_json);

        let prepared = match registry.validate(name, arguments_json) {
            Ok(invocation) => self.prepare(&invocation).await,
            Err(e) => {
                warn!("Rejected tool call '{}': {}", name, e);
                Prepared::Settled(ToolResult::failure(name, e.to_string()))
            }
        };
        self.commit(prepared, publish)
    }

    /// Run `f` on the current state with mutations held off
    pub fn with_current_state<R>(&self, f: impl FnOnce(MapState) -> R) -> R {
        let _gate = self.lock_gate();
        f(self.store.read())
    }

    async fn prepare(&self, invocation: &ToolInvocation) -> Prepared {
        debug!("Executing {:?}", invocation);

        match invocation {
            ToolInvocation::Navigate {
                latitude,
                longitude,
            } => Prepared::Navigate {
                latitude: *latitude,
                longitude: *longitude,
            },
            ToolInvocation::Zoom { level } => Prepared::Zoom { level: *level },
            ToolInvocation::GeocodeAndNavigate { query } => {
                match geocode::locate(self.geocoder.as_ref(), &self.geocode_policy, query).await
                {
                    Ok(chosen) => Prepared::Locate(chosen),
                    Err(failure) => Prepared::Settled(failure),
                }
            }
        }
    }

    fn commit<F>(&self, prepared: Prepared, publish: F) -> ToolResult
    where
        F: FnOnce(&ToolResult, MapState),
    {
        let _gate = self.lock_gate();

        let result = match prepared {
            Prepared::Settled(result) => result,
            Prepared::Navigate {
                latitude,
                longitude,
            } => navigate::navigate(&self.store, latitude, longitude),
            Prepared::Zoom { level } => zoom::zoom(&self.store, &self.bounds, level),
            Prepared::Locate(chosen) => {
                geocode::move_to_candidate(&self.store, &self.bounds, &self.geocode_policy, &chosen)
            }
        };

        if !result.is_success() {
            warn!("Tool '{}' failed: {}", result.tool, result.summary);
        }
        publish(&result, self.store.read());
        result
    }

    fn lock_gate(&self) -> MutexGuard<'_, ()> {
        // The gate guards no data, so a poisoned lock is still usable
        self.publish_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
