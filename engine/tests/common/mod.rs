//! Shared fixtures: a scripted completion provider and an in-memory geocoder
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use sdk::protocol::ServerMessage;
use sdk::types::MapState;
use waypoint_engine::agent::{Orchestrator, OrchestratorSettings};
use waypoint_engine::config::{GeocodingConfig, MapConfig};
use waypoint_engine::connections::ConnectionManager;
use waypoint_engine::geocoding::{GeocodeCandidate, GeocodeError, Geocoder};
use waypoint_engine::llm::{
    AssistantMessage, LLMError, LLMProvider, Message, ToolCall, ToolDefinition,
};
use waypoint_engine::map_state::MapStateStore;
use waypoint_engine::tools::{ToolExecutor, ToolRegistry};

/// Completion provider that replays a fixed script, then repeats a fallback
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<AssistantMessage, LLMError>>>,
    fallback: Option<AssistantMessage>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    histories: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<AssistantMessage, LLMError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            delay: None,
            calls: AtomicUsize::new(0),
            histories: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(replies: Vec<AssistantMessage>) -> Self {
        Self::new(replies.into_iter().map(Ok).collect())
    }

    /// Reply with `reply` forever once the script runs out
    pub fn repeating(mut self, reply: AssistantMessage) -> Self {
        self.fallback = Some(reply);
        self
    }

    /// Sleep before every reply
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Message history received on call `index`
    pub fn history(&self, index: usize) -> Vec<Message> {
        self.histories.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<AssistantMessage, LLMError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.histories.lock().unwrap().push(messages.to_vec());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(step) => step,
            None => match &self.fallback {
                Some(reply) => Ok(reply.clone()),
                None => Err(LLMError::InvalidRequest("script exhausted".to_string())),
            },
        }
    }
}

/// Geocoder answering from a fixed table; the query "timeout" times out
#[derive(Default)]
pub struct TableGeocoder {
    table: HashMap<String, Vec<GeocodeCandidate>>,
    lookups: AtomicUsize,
}

impl TableGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, query: &str, candidates: Vec<GeocodeCandidate>) -> Self {
        self.table.insert(query.to_string(), candidates);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for TableGeocoder {
    fn name(&self) -> &str {
        "table"
    }

    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeCandidate>, GeocodeError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if query == "timeout" {
            return Err(GeocodeError::Timeout);
        }
        Ok(self.table.get(query).cloned().unwrap_or_default())
    }
}

pub fn candidate(name: &str, latitude: f64, longitude: f64, confidence: f64) -> GeocodeCandidate {
    GeocodeCandidate {
        name: name.to_string(),
        latitude,
        longitude,
        confidence,
    }
}

pub fn call(name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall::generated(name, arguments.to_string())
}

pub fn tool_round(calls: Vec<ToolCall>) -> AssistantMessage {
    AssistantMessage::with_tool_calls(calls)
}

pub struct Harness {
    pub orchestrator: Arc<Orchestrator>,
    pub provider: Arc<ScriptedProvider>,
    pub geocoder: Arc<TableGeocoder>,
    pub store: Arc<MapStateStore>,
    pub connections: Arc<ConnectionManager>,
}

pub struct HarnessOptions {
    pub max_rounds: usize,
    pub completion_deadline: Duration,
    pub initial: MapState,
    pub queue_capacity: usize,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            max_rounds: 6,
            completion_deadline: Duration::from_secs(5),
            initial: MapState::initial(0.0, 0.0, 2),
            queue_capacity: 64,
        }
    }
}

pub fn harness(provider: ScriptedProvider, geocoder: TableGeocoder) -> Harness {
    harness_with(provider, geocoder, HarnessOptions::default())
}

pub fn harness_with(
    provider: ScriptedProvider,
    geocoder: TableGeocoder,
    options: HarnessOptions,
) -> Harness {
    let provider = Arc::new(provider);
    let geocoder = Arc::new(geocoder);
    let store = Arc::new(MapStateStore::new(options.initial));
    let connections = Arc::new(ConnectionManager::new(options.queue_capacity));

    let executor = ToolExecutor::new(
        Arc::clone(&store),
        Arc::clone(&geocoder) as Arc<dyn Geocoder>,
        MapConfig::default(),
        &GeocodingConfig::default(),
    );

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&provider) as Arc<dyn LLMProvider>,
        Arc::new(ToolRegistry::with_defaults()),
        Arc::new(executor),
        Arc::clone(&connections),
        OrchestratorSettings {
            max_rounds: options.max_rounds,
            completion_deadline: options.completion_deadline,
            system_prompt: None,
        },
    ));

    Harness {
        orchestrator,
        provider,
        geocoder,
        store,
        connections,
    }
}

/// Everything currently queued for a connection
pub fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    messages
}
