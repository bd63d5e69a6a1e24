//! Conversation Orchestrator
//!
//! Drives one user turn through repeated model rounds:
//!
//! 1. Ask the completion provider with the full history and tool declarations
//! 2. No tool calls: the text is the final answer, broadcast it and stop
//! 3. Otherwise run every requested call in the order the model gave, append
//!    each result to the history and broadcast a `tool_progress` message
//! 4. Loop, unless the round limit is reached
//!
//! # Termination
//!
//! - `Answered`: the model replied with text and no tool calls
//! - `Failed`: the provider failed or timed out, or replied with nothing
//! - `Aborted`: the round limit was reached; no further provider calls are made
//!
//! Tool failures never end a turn. They are fed back to the model as failed
//! results so it can correct itself or explain the problem.

use sdk::errors::{EngineError, ErrorExt};
use sdk::protocol::ServerMessage;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::connections::ConnectionManager;
use crate::llm::{LLMError, LLMProvider};
use crate::tools::{ToolExecutor, ToolRegistry};

use super::Conversation;

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Final answer delivered
    Answered { rounds: usize },

    /// Provider failure or empty reply; the error carries the cause
    Failed { rounds: usize, reason: String },

    /// Round limit reached without a final answer
    Aborted { rounds: usize },
}

impl TurnOutcome {
    /// Number of provider calls made during the turn
    pub fn rounds(&self) -> usize {
        match self {
            TurnOutcome::Answered { rounds }
            | TurnOutcome::Failed { rounds, .. }
            | TurnOutcome::Aborted { rounds } => *rounds,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, TurnOutcome::Answered { .. })
    }
}

/// Loop limits and prompt
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Maximum provider calls per turn
    pub max_rounds: usize,

    /// Upper bound on a single provider call, retries included
    pub completion_deadline: Duration,

    /// Replaces the registry-generated prompt when set
    pub system_prompt: Option<String>,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config, completion_deadline: Duration) -> Self {
        Self {
            max_rounds: config.orchestrator.max_rounds,
            completion_deadline,
            system_prompt: config.orchestrator.system_prompt.clone(),
        }
    }
}

/// Tool-calling control loop shared by every client
pub struct Orchestrator {
    provider: Arc<dyn LLMProvider>,
    registry: Arc<ToolRegistry>,
    executor: Arc<ToolExecutor>,
    connections: Arc<ConnectionManager>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        registry: Arc<ToolRegistry>,
        executor: Arc<ToolExecutor>,
        connections: Arc<ConnectionManager>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            provider,
            registry,
            executor,
            connections,
            settings,
        }
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    pub fn executor(&self) -> &Arc<ToolExecutor> {
        &self.executor
    }

    fn system_prompt(&self) -> String {
        self.settings
            .system_prompt
            .clone()
            .unwrap_or_else(|| self.registry.system_prompt())
    }

    /// Run one user turn to completion.
    ///
    /// Every outcome is also reported to clients: a final `assistant_message`,
    /// or an `error` carrying a user-safe summary.
    pub async fn run_turn(&self, user_text: &str) -> TurnOutcome {
        let turn_id = Uuid::new_v4().to_string();
        let start_time = Instant::now();
        info!("Starting turn {}: {}", turn_id, user_text);

        let outcome = self.execute_turn_loop(&turn_id, user_text).await;

        match &outcome {
            TurnOutcome::Answered { rounds } => info!(
                "Turn {} answered in {}ms after {} rounds",
                turn_id,
                start_time.elapsed().as_millis(),
                rounds
            ),
            TurnOutcome::Failed { rounds, reason } => {
                error!("Turn {} failed after {} rounds: {}", turn_id, rounds, reason)
            }
            TurnOutcome::Aborted { rounds } => {
                warn!("Turn {} aborted after {} rounds", turn_id, rounds)
            }
        }

        outcome
    }

    async fn execute_turn_loop(&self, turn_id: &str, user_text: &str) -> TurnOutcome {
        let mut conversation = Conversation::start(&self.system_prompt(), user_text);
        let tools = self.registry.definitions();
        let max_rounds = self.settings.max_rounds;
        let mut rounds = 0;

        loop {
            if rounds >= max_rounds {
                let error = EngineError::RoundLimitExceeded { rounds };
                self.connections
                    .broadcast(&ServerMessage::error(error.user_hint()));
                return TurnOutcome::Aborted { rounds };
            }
            rounds += 1;
            debug!(
                "Turn {} round {}/{} ({} messages, ~{} tokens)",
                turn_id,
                rounds,
                max_rounds,
                conversation.len(),
                conversation.token_estimate()
            );

            let reply = match timeout(
                self.settings.completion_deadline,
                self.provider.complete(conversation.messages(), &tools),
            )
            .await
            {
                Ok(Ok(reply)) => reply,
                Ok(Err(e)) => return self.fail(rounds, provider_error(e)),
                Err(_) => return self.fail(rounds, EngineError::LLMTimeout),
            };

            if reply.tool_calls.is_empty() {
                let Some(content) = reply.text_content() else {
                    return self.fail(rounds, EngineError::EmptyResponse);
                };

                self.executor.with_current_state(|map_state| {
                    self.connections.broadcast(&ServerMessage::AssistantMessage {
                        content: content.to_string(),
                        map_state,
                        reasoning: reply.reasoning.clone(),
                    })
                });
                return TurnOutcome::Answered { rounds };
            }

            if let Some(reasoning) = &reply.reasoning {
                debug!("Turn {} reasoning: {}", turn_id, reasoning);
            }
            conversation.add_tool_calls(reply.text_content(), &reply.tool_calls);

            // Sequential: later calls see the state left by earlier ones
            for call in &reply.tool_calls {
                debug!("Tool call: {} ({})", call.name, call.id);

                // Broadcast under the executor's gate so snapshots go out in version order
                let result = self
                    .executor
                    .dispatch_and_publish(
                        &self.registry,
                        &call.name,
                        &call.arguments,
                        |result, current| {
                            self.connections
                                .broadcast(&ServerMessage::tool_progress(result, current));
                        },
                    )
                    .await;

                conversation.add_tool_result(call, &result);

                // Listeners polled on this task drain between calls
                tokio::task::yield_now().await;
            }
        }
    }

    fn fail(&self, rounds: usize, error: EngineError) -> TurnOutcome {
        self.connections
            .broadcast(&ServerMessage::error(error.user_hint()));
        TurnOutcome::Failed {
            rounds,
            reason: error.to_string(),
        }
    }
}

fn provider_error(error: LLMError) -> EngineError {
    match error {
        LLMError::Timeout => EngineError::LLMTimeout,
        other => EngineError::LLMProvider(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_rounds() {
        assert_eq!(TurnOutcome::Answered { rounds: 2 }.rounds(), 2);
        assert_eq!(TurnOutcome::Aborted { rounds: 6 }.rounds(), 6);
        assert!(!TurnOutcome::Failed {
            rounds: 1,
            reason: String::new()
        }
        .is_answered());
    }

    #[test]
    fn test_provider_timeout_maps_to_llm_timeout() {
        assert!(matches!(
            provider_error(LLMError::Timeout),
            EngineError::LLMTimeout
        ));
        assert!(matches!(
            provider_error(LLMError::RateLimitExceeded),
            EngineError::LLMProvider(_)
        ));
    }
}
