//! The tool-resolution loop implementation.

use chrono::Utc;
use serde::Serialize;
use standin_core::event::{DomainEvent, EventBus};
use standin_core::message::{Conversation, HistoryEntry, Message, MessageToolCall};
use standin_core::persona::Persona;
use standin_core::provider::{Provider, ProviderRequest};
use standin_core::tool::{ToolRegistry, ToolResult};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Reply used when the model keeps asking for tools past the round ceiling.
pub const RUNAWAY_FALLBACK: &str =
    "Sorry, I got stuck while working on that. Could you rephrase or ask me something else?";

/// Reply used when the model finishes with no text.
pub const EMPTY_REPLY_FALLBACK: &str =
    "Sorry, I don't have a good answer to that right now. Feel free to ask me something else.";

/// What one turn produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    /// Text shown to the visitor
    pub reply: String,

    /// Tool rounds that were dispatched
    pub rounds: u32,

    /// Requests sent to the model
    pub model_calls: u32,

    /// Whether the round ceiling cut the turn short
    pub hit_round_limit: bool,
}

enum LoopState {
    AwaitingModel,
    DispatchingTools(Message),
    Done(String),
}

/// Orchestrates model calls and tool dispatch for one persona.
pub struct AgentLoop {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Temperature setting
    temperature: f32,

    /// Max tokens per response
    max_tokens: Option<u32>,

    /// Tool registry
    tools: Arc<ToolRegistry>,

    /// Who the assistant speaks as
    persona: Arc<Persona>,

    /// Maximum tool rounds per turn
    max_tool_rounds: u32,

    /// Dispatch the calls of a round concurrently
    parallel_tool_calls: bool,

    /// Event bus for domain events
    event_bus: Arc<EventBus>,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        tools: Arc<ToolRegistry>,
        persona: Arc<Persona>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            tools,
            persona,
            max_tool_rounds: 5,
            parallel_tool_calls: true,
            event_bus,
        }
    }

    /// Create a loop with the model and agent settings from `config`.
    pub fn from_config(
        config: &standin_config::AppConfig,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        persona: Arc<Persona>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self::new(
            provider,
            &config.default_model,
            config.default_temperature,
            tools,
            persona,
            event_bus,
        )
        .with_max_tokens(config.default_max_tokens)
        .with_max_tool_rounds(config.agent.max_tool_rounds)
        .with_parallel_tool_calls(config.agent.parallel_tool_calls)
    }

    /// Set the maximum number of tool rounds per turn (at least 1).
    pub fn with_max_tool_rounds(mut self, max: u32) -> Self {
        self.max_tool_rounds = max.max(1);
        self
    }

    /// Set the max tokens per LLM response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Choose concurrent or one-at-a-time dispatch within a round.
    pub fn with_parallel_tool_calls(mut self, parallel: bool) -> Self {
        self.parallel_tool_calls = parallel;
        self
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the conversation for one turn.
    pub fn start_conversation(&self, message: &str, history: &[HistoryEntry]) -> Conversation {
        Conversation::seed(&self.persona.system_prompt(), history, message)
    }

    /// Answer `message` given the prior `history`.
    pub async fn chat(
        &self,
        message: &str,
        history: &[HistoryEntry],
    ) -> Result<String, standin_core::Error> {
        let mut conversation = self.start_conversation(message, history);
        Ok(self.run(&mut conversation).await?.reply)
    }

    /// Drive a seeded conversation to its final reply.
    ///
    /// The reply is appended to `conversation` as an assistant message. A
    /// provider failure ends the turn with an error and no reply.
    pub async fn run(
        &self,
        conversation: &mut Conversation,
    ) -> Result<TurnOutcome, standin_core::Error> {
        info!(
            conversation_id = %conversation.id,
            messages = conversation.messages.len(),
            "Processing conversation"
        );

        let tool_definitions = self.tools.definitions();
        let mut rounds = 0u32;
        let mut model_calls = 0u32;
        let mut state = LoopState::AwaitingModel;

        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    let request = ProviderRequest {
                        model: self.model.clone(),
                        messages: conversation.messages.clone(),
                        temperature: self.temperature,
                        max_tokens: self.max_tokens,
                        tools: tool_definitions.clone(),
                    };

                    model_calls += 1;
                    debug!(
                        conversation_id = %conversation.id,
                        model_calls,
                        rounds,
                        "Awaiting model"
                    );
                    let response = self.provider.complete(request).await?;

                    if let Some(usage) = &response.usage {
                        self.event_bus.publish(DomainEvent::ResponseGenerated {
                            conversation_id: conversation.id.to_string(),
                            model: response.model.clone(),
                            tokens_used: usage.total_tokens,
                            timestamp: Utc::now(),
                        });
                    }

                    if !response.wants_tools() {
                        LoopState::Done(response.message.content)
                    } else if rounds >= self.max_tool_rounds {
                        warn!(
                            conversation_id = %conversation.id,
                            rounds,
                            pending_calls = response.message.tool_calls.len(),
                            "Tool round ceiling reached, returning fallback"
                        );
                        self.event_bus.publish(DomainEvent::RoundLimitReached {
                            conversation_id: conversation.id.to_string(),
                            rounds,
                            timestamp: Utc::now(),
                        });
                        conversation.push(Message::assistant(RUNAWAY_FALLBACK));
                        return Ok(TurnOutcome {
                            reply: RUNAWAY_FALLBACK.into(),
                            rounds,
                            model_calls,
                            hit_round_limit: true,
                        });
                    } else {
                        LoopState::DispatchingTools(response.message)
                    }
                }

                LoopState::DispatchingTools(assistant) => {
                    rounds += 1;
                    debug!(
                        conversation_id = %conversation.id,
                        round = rounds,
                        tool_count = assistant.tool_calls.len(),
                        parallel = self.parallel_tool_calls,
                        "Dispatching tool calls"
                    );

                    let conversation_id = conversation.id.to_string();
                    let results = self
                        .dispatch_round(&conversation_id, &assistant.tool_calls)
                        .await;
                    conversation.push_tool_round(assistant, &results)?;
                    LoopState::AwaitingModel
                }

                LoopState::Done(text) => {
                    let reply = if text.trim().is_empty() {
                        warn!(conversation_id = %conversation.id, "Model returned an empty reply");
                        EMPTY_REPLY_FALLBACK.to_string()
                    } else {
                        text
                    };
                    conversation.push(Message::assistant(&reply));
                    info!(
                        conversation_id = %conversation.id,
                        rounds,
                        model_calls,
                        "Turn complete"
                    );
                    return Ok(TurnOutcome {
                        reply,
                        rounds,
                        model_calls,
                        hit_round_limit: false,
                    });
                }
            };
        }
    }

    /// Dispatch every call of one round. Results come back in call order.
    async fn dispatch_round(
        &self,
        conversation_id: &str,
        calls: &[MessageToolCall],
    ) -> Vec<ToolResult> {
        if self.parallel_tool_calls {
            futures::future::join_all(
                calls
                    .iter()
                    .map(|call| self.dispatch_one(conversation_id, call)),
            )
            .await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.dispatch_one(conversation_id, call).await);
            }
            results
        }
    }

    async fn dispatch_one(&self, conversation_id: &str, call: &MessageToolCall) -> ToolResult {
        let start = Instant::now();
        let result = self.tools.dispatch(call).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(
            tool = %call.name,
            call_id = %call.id,
            success = result.is_ok(),
            duration_ms,
            "Tool call finished"
        );
        self.event_bus.publish(DomainEvent::ToolExecuted {
            conversation_id: conversation_id.to_string(),
            tool_name: call.name.clone(),
            success: result.is_ok(),
            duration_ms,
            timestamp: Utc::now(),
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use standin_core::error::ProviderError;
    use standin_core::message::Role;
    use standin_core::tool::ToolStatus;

    fn agent(provider: Arc<ScriptedProvider>, tools: Arc<ToolRegistry>) -> AgentLoop {
        AgentLoop::new(
            provider,
            "mock-model",
            0.7,
            tools,
            Arc::new(Persona::new("Ada Lovelace").with_summary("Mathematician.")),
            Arc::new(EventBus::default()),
        )
    }

    #[tokio::test]
    async fn simple_text_response() {
        let provider = Arc::new(ScriptedProvider::new(vec![make_text_response(
            "I mostly work on analytical engines.",
        )]));
        let agent = agent(provider.clone(), contact_registry());

        let reply = agent.chat("What do you do?", &[]).await.unwrap();
        assert_eq!(reply, "I mostly work on analytical engines.");
        assert_eq!(provider.call_count(), 1);

        let request = &provider.requests()[0];
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[0].content.contains("Ada Lovelace"));
        assert_eq!(request.messages[1].content, "What do you do?");
        assert_eq!(request.tools.len(), 2);
    }

    #[tokio::test]
    async fn history_sits_between_prompt_and_message() {
        let provider = Arc::new(ScriptedProvider::new(vec![make_text_response("Sure.")]));
        let agent = agent(provider.clone(), contact_registry());
        let history = vec![
            HistoryEntry::new(Role::User, "Hi"),
            HistoryEntry::new(Role::Assistant, "Hello!"),
        ];

        agent.chat("Tell me more", &history).await.unwrap();

        let roles: Vec<Role> = provider.requests()[0]
            .messages
            .iter()
            .map(|m| m.role)
            .collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
    }

    #[tokio::test]
    async fn runaway_model_stops_at_round_ceiling() {
        let provider = Arc::new(ScriptedProvider::new(vec![make_tool_call_response(
            vec![make_tool_call(
                "call_x",
                "record_unknown_question",
                serde_json::json!({"question": "again?"}),
            )],
            "",
        )]));
        let sink = Arc::new(CountingSink::default());
        let agent = agent(provider.clone(), registry_with_sink(sink.clone()))
            .with_max_tool_rounds(3);

        let mut conversation = agent.start_conversation("loop forever", &[]);
        let outcome = agent.run(&mut conversation).await.unwrap();

        assert_eq!(outcome.reply, RUNAWAY_FALLBACK);
        assert!(outcome.hit_round_limit);
        assert_eq!(outcome.rounds, 3);
        assert_eq!(outcome.model_calls, 4);
        assert_eq!(provider.call_count(), 4);
        assert_eq!(sink.count(), 3);
    }

    #[tokio::test]
    async fn round_limit_publishes_event() {
        let provider = Arc::new(ScriptedProvider::new(vec![make_tool_call_response(
            vec![make_tool_call(
                "call_x",
                "record_unknown_question",
                serde_json::json!({"question": "Q"}),
            )],
            "",
        )]));
        let bus = Arc::new(EventBus::new(64));
        let mut rx = bus.subscribe();
        let agent = AgentLoop::new(
            provider,
            "mock-model",
            0.7,
            contact_registry(),
            Arc::new(Persona::new("Ada")),
            bus,
        )
        .with_max_tool_rounds(1);

        agent.chat("hi", &[]).await.unwrap();

        let mut saw_limit = false;
        while let Ok(event) = rx.try_recv() {
            if let DomainEvent::RoundLimitReached { rounds, .. } = event.as_ref() {
                assert_eq!(*rounds, 1);
                saw_limit = true;
            }
        }
        assert!(saw_limit);
    }

    #[tokio::test]
    async fn follow_up_request_carries_calls_then_results() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            make_tool_call_response(
                vec![make_tool_call(
                    "call_1",
                    "record_user_details",
                    serde_json::json!({"email": "jo@example.com", "question": "Rates?"}),
                )],
                "",
            ),
            make_text_response("Thanks Jo, I'll be in touch."),
        ]));
        let agent = agent(provider.clone(), contact_registry());

        let reply = agent.chat("My email is jo@example.com", &[]).await.unwrap();
        assert_eq!(reply, "Thanks Jo, I'll be in touch.");

        let second = &provider.requests()[1];
        let assistant = &second.messages[2];
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(assistant.tool_calls[0].id, "call_1");

        let tool = &second.messages[3];
        assert_eq!(tool.role, Role::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
        let content: serde_json::Value = serde_json::from_str(&tool.content).unwrap();
        assert_eq!(content["status"], "ok");
        assert_eq!(content["payload"]["recorded"], true);
    }

    #[tokio::test]
    async fn parallel_results_keep_call_order() {
        let (registry, finished) = delayed_registry();
        let provider = Arc::new(ScriptedProvider::new(vec![
            make_tool_call_response(
                vec![
                    make_tool_call(
                        "call_a",
                        "record_user_details",
                        serde_json::json!({"email": "a@x.io", "question": "a", "delay_ms": 60}),
                    ),
                    make_tool_call(
                        "call_b",
                        "record_unknown_question",
                        serde_json::json!({"question": "b", "delay_ms": 30}),
                    ),
                    make_tool_call(
                        "call_c",
                        "record_unknown_question",
                        serde_json::json!({"question": "c", "delay_ms": 0}),
                    ),
                ],
                "",
            ),
            make_text_response("done"),
        ]));
        let agent = agent(provider.clone(), registry);

        let mut conversation = agent.start_conversation("go", &[]);
        let outcome = agent.run(&mut conversation).await.unwrap();
        assert_eq!(outcome.rounds, 1);

        // Tools finished in reverse, messages still follow the calls.
        assert_eq!(*finished.lock().unwrap(), vec!["c", "b", "a"]);
        let ids: Vec<&str> = conversation
            .messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        assert_eq!(ids, vec!["call_a", "call_b", "call_c"]);
    }

    #[tokio::test]
    async fn sequential_dispatch_runs_in_call_order() {
        let (registry, finished) = delayed_registry();
        let provider = Arc::new(ScriptedProvider::new(vec![
            make_tool_call_response(
                vec![
                    make_tool_call(
                        "call_a",
                        "record_unknown_question",
                        serde_json::json!({"question": "a", "delay_ms": 30}),
                    ),
                    make_tool_call(
                        "call_b",
                        "record_unknown_question",
                        serde_json::json!({"question": "b", "delay_ms": 0}),
                    ),
                ],
                "",
            ),
            make_text_response("done"),
        ]));
        let agent = agent(provider, registry).with_parallel_tool_calls(false);

        agent.chat("go", &[]).await.unwrap();
        assert_eq!(*finished.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_and_loop_continues() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            make_tool_call_response(
                vec![make_tool_call("call_1", "send_fax", serde_json::json!({}))],
                "",
            ),
            make_text_response("Let me answer directly instead."),
        ]));
        let agent = agent(provider.clone(), contact_registry());

        let mut conversation = agent.start_conversation("hi", &[]);
        let outcome = agent.run(&mut conversation).await.unwrap();
        assert_eq!(outcome.reply, "Let me answer directly instead.");
        assert_eq!(outcome.model_calls, 2);

        let tool_msg = &provider.requests()[1].messages[3];
        let content: serde_json::Value = serde_json::from_str(&tool_msg.content).unwrap();
        assert_eq!(content["status"], serde_json::json!(ToolStatus::Error));
        assert!(
            content["payload"]["error"]
                .as_str()
                .unwrap()
                .starts_with("send_fax:")
        );
    }

    #[tokio::test]
    async fn malformed_arguments_become_error_result() {
        let mut bad = make_tool_call("call_1", "record_unknown_question", serde_json::json!({}));
        bad.arguments = "{not json".into();
        let provider = Arc::new(ScriptedProvider::new(vec![
            make_tool_call_response(vec![bad], ""),
            make_text_response("ok"),
        ]));
        let agent = agent(provider.clone(), contact_registry());

        assert_eq!(agent.chat("hi", &[]).await.unwrap(), "ok");
        let tool_msg = &provider.requests()[1].messages[3];
        assert!(tool_msg.content.contains("\"status\":\"error\""));
    }

    #[tokio::test]
    async fn blank_reply_uses_fallback() {
        let provider = Arc::new(ScriptedProvider::new(vec![make_text_response("  \n")]));
        let agent = agent(provider, contact_registry());
        assert_eq!(agent.chat("hi", &[]).await.unwrap(), EMPTY_REPLY_FALLBACK);
    }

    #[tokio::test]
    async fn provider_error_ends_turn() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::RateLimited {
            retry_after_secs: 5,
        }));
        let agent = agent(provider, contact_registry());

        let err = agent.chat("hi", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            standin_core::Error::Provider(ProviderError::RateLimited { .. })
        ));
    }

    #[tokio::test]
    async fn tool_events_published_per_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            make_tool_call_response(
                vec![make_tool_call(
                    "call_1",
                    "record_unknown_question",
                    serde_json::json!({"question": "Q"}),
                )],
                "",
            ),
            make_text_response("ok"),
        ]));
        let bus = Arc::new(EventBus::new(64));
        let mut rx = bus.subscribe();
        let agent = AgentLoop::new(
            provider,
            "mock-model",
            0.7,
            contact_registry(),
            Arc::new(Persona::new("Ada")),
            bus,
        );

        agent.chat("hi", &[]).await.unwrap();

        let mut tool_events = 0;
        let mut responses = 0;
        while let Ok(event) = rx.try_recv() {
            match event.as_ref() {
                DomainEvent::ToolExecuted { tool_name, success, .. } => {
                    assert_eq!(tool_name, "record_unknown_question");
                    assert!(success);
                    tool_events += 1;
                }
                DomainEvent::ResponseGenerated { .. } => responses += 1,
                _ => {}
            }
        }
        assert_eq!(tool_events, 1);
        assert_eq!(responses, 2);
    }

    #[test]
    fn round_ceiling_never_zero() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let agent = agent(provider, contact_registry()).with_max_tool_rounds(0);
        assert_eq!(agent.max_tool_rounds, 1);
    }
}
