//! The agent loop.
//!
//! One [`AgentSession`] owns one transcript and drives it through
//! `AwaitingUserInput → ModelThinking → (ToolRequested → ToolExecuting →
//! ModelThinking)* → FinalAnswer → AwaitingUserInput`. Every user turn is
//! bounded by a [`TurnBudget`]; running out yields a synthesized answer
//! instead of another model call.
//!
//! A turn that fails (model backend error, cancellation) is rolled back so
//! the transcript looks as if the input was never sent. A BloodHound
//! authentication failure closes the session.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::parser::{parse_intent, ModelIntent};
use crate::adapters::prompt_handler::ASSISTANT_PROMPT;
use crate::agents::config::AgentSettings;
use crate::agents::domain::{Message, ToolCall, ToolCallRecord, ToolDefinition};
use crate::agents::error::{AgentError, AgentResult};
use crate::agents::llm::{CompletionRequest, LlmProvider};
use crate::agents::memory::Conversation;
use crate::agents::token::{BudgetLimit, TurnBudget};
use crate::bloodhound::cache;
use crate::domain::{ToolErrorKind, ToolPort};

/// Text-mode tool protocol, appended to the system prompt for models
/// without native tool calling.
const TOOL_PROTOCOL: &str = "\n\nTo call a tool, reply with only a JSON object such as \
{\"tool\": \"get_domains\", \"arguments\": {}}. Tool results come back as messages from \
the tool role. When you have enough information, reply with the answer in plain text.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    AwaitingUserInput,
    ModelThinking,
    ToolRequested,
    ToolExecuting,
    FinalAnswer,
    SessionClosed,
}

/// Progress notifications for a front end
#[derive(Debug, Clone)]
pub enum SessionEvent {
    State(SessionState),
    ToolStarted(ToolCall),
    ToolFinished(ToolCallRecord),
}

/// Result of one user turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub answer: String,
    /// Model calls made during the turn
    pub model_turns: u32,
    pub tool_calls: Vec<ToolCallRecord>,
    /// Set when the answer was synthesized because a budget ran out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exhausted: Option<String>,
    pub elapsed_ms: u64,
}

pub struct AgentSession {
    llm: Arc<dyn LlmProvider>,
    tools: Arc<dyn ToolPort>,
    conversation: Conversation,
    max_turns: u32,
    max_duration: Duration,
    temperature: Option<f32>,
    state: SessionState,
    events: Option<UnboundedSender<SessionEvent>>,
}

impl AgentSession {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        tools: Arc<dyn ToolPort>,
        settings: &AgentSettings,
    ) -> Self {
        let mut system = settings
            .system_prompt
            .clone()
            .unwrap_or_else(|| ASSISTANT_PROMPT.to_string());
        system.push_str(TOOL_PROTOCOL);

        Self {
            llm,
            tools,
            conversation: Conversation::new(Some(system), settings.memory.clone()),
            max_turns: settings.max_turns,
            max_duration: settings.max_duration(),
            temperature: settings.temperature,
            state: SessionState::AwaitingUserInput,
            events: None,
        }
    }

    /// Send progress events to `sender`.
    pub fn with_events(mut self, sender: UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Start over with an empty transcript.
    pub fn reset(&mut self) {
        self.conversation.clear();
        if self.state != SessionState::SessionClosed {
            self.set_state(SessionState::AwaitingUserInput);
        }
    }

    pub fn close(&mut self) {
        self.set_state(SessionState::SessionClosed);
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "Session state change");
            self.state = state;
            self.emit(SessionEvent::State(state));
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    /// Run one user turn to a final answer.
    ///
    /// Tool failures are fed back to the model and never fail the turn.
    /// Errors returned here leave the transcript as it was before `input`.
    pub async fn run_turn(
        &mut self,
        input: &str,
        cancel: &CancellationToken,
    ) -> AgentResult<TurnOutcome> {
        if self.state == SessionState::SessionClosed {
            return Err(AgentError::SessionClosed);
        }
        let input = input.trim();
        if input.is_empty() {
            return Err(AgentError::InvalidInput("empty message".to_string()));
        }

        let checkpoint = self.conversation.checkpoint();
        self.conversation.push(Message::user(input));

        let result = cache::scope(self.drive(cancel)).await;

        match result {
            Ok(outcome) => {
                self.conversation.commit();
                self.set_state(SessionState::FinalAnswer);
                self.set_state(SessionState::AwaitingUserInput);
                info!(
                    model_turns = outcome.model_turns,
                    tool_calls = outcome.tool_calls.len(),
                    elapsed_ms = outcome.elapsed_ms,
                    exhausted = outcome.exhausted.is_some(),
                    "Turn complete"
                );
                Ok(outcome)
            }
            Err(err) => {
                self.conversation.rollback(checkpoint);
                if err.is_fatal() {
                    warn!(error = %err, "Closing session");
                    self.set_state(SessionState::SessionClosed);
                } else {
                    warn!(error = %err, "Turn failed, rolled back");
                    self.set_state(SessionState::AwaitingUserInput);
                }
                Err(err)
            }
        }
    }

    async fn drive(&mut self, cancel: &CancellationToken) -> AgentResult<TurnOutcome> {
        let definitions: Vec<ToolDefinition> = self
            .tools
            .list_tools()
            .into_iter()
            .map(ToolDefinition::from)
            .collect();
        let llm = self.llm.clone();
        let tools = self.tools.clone();
        let mut budget = TurnBudget::new(self.max_turns, self.max_duration);
        let mut records: Vec<ToolCallRecord> = Vec::new();

        loop {
            if let Err(limit) = budget.consume() {
                return Ok(self.exhausted(limit, &budget, records));
            }
            self.set_state(SessionState::ModelThinking);

            let request = CompletionRequest {
                messages: self.conversation.context(),
                temperature: self.temperature,
                tools: Some(definitions.clone()),
            };
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                response = tokio::time::timeout(budget.remaining_time(), llm.complete(request)) => {
                    match response {
                        Ok(response) => response?,
                        Err(_) => {
                            return Ok(self.exhausted(
                                BudgetLimit::Duration(self.max_duration),
                                &budget,
                                records,
                            ))
                        }
                    }
                }
            };

            let mut message = response.message;
            let calls = match message.tool_calls.take() {
                Some(calls) if !calls.is_empty() => calls,
                _ => match parse_intent(&message.content) {
                    ModelIntent::ToolCalls(calls) => calls,
                    ModelIntent::Final(answer) => {
                        let answer = if answer.is_empty() {
                            "The model returned an empty answer.".to_string()
                        } else {
                            answer
                        };
                        self.conversation.push(Message::assistant(answer.clone()));
                        return Ok(TurnOutcome {
                            answer,
                            model_turns: budget.used(),
                            tool_calls: records,
                            exhausted: None,
                            elapsed_ms: budget.elapsed().as_millis() as u64,
                        });
                    }
                },
            };

            self.set_state(SessionState::ToolRequested);
            self.conversation
                .push(Message::assistant_with_tools(message.content, calls.clone()));

            self.set_state(SessionState::ToolExecuting);
            for call in &calls {
                self.emit(SessionEvent::ToolStarted(call.clone()));
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                    result = tools.invoke(call.to_invocation()) => result,
                };

                let record = ToolCallRecord::new(call, &result);
                self.emit(SessionEvent::ToolFinished(record.clone()));
                records.push(record);

                if result.error_kind() == Some(ToolErrorKind::AuthFailure) {
                    let message = result
                        .error
                        .map(|e| e.message)
                        .unwrap_or_else(|| "credential rejected".to_string());
                    return Err(AgentError::AuthFailure(message));
                }
                self.conversation
                    .push(Message::tool_result(call, result.to_text()));
            }
        }
    }

    fn exhausted(
        &mut self,
        limit: BudgetLimit,
        budget: &TurnBudget,
        records: Vec<ToolCallRecord>,
    ) -> TurnOutcome {
        warn!(%limit, model_turns = budget.used(), "Turn budget exhausted");
        let answer = format!(
            "I stopped before reaching a final answer: the {limit} ran out after {} tool \
             calls. The results so far are kept in this conversation; ask me to continue \
             or narrow the question.",
            records.len()
        );
        self.conversation.push(Message::assistant(answer.clone()));
        TurnOutcome {
            answer,
            model_turns: budget.used(),
            tool_calls: records,
            exhausted: Some(limit.to_string()),
            elapsed_ms: budget.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::config::MemoryConfig;
    use crate::agents::domain::Role;
    use crate::agents::error::{LlmError, LlmResult};
    use crate::agents::llm::{CompletionResponse, FinishReason};
    use crate::domain::{Tool, ToolInvocation, ToolResult};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Reply {
        Call(&'static str),
        Calls(Vec<&'static str>),
        Text(&'static str),
        Fail,
    }

    /// Replays scripted replies; repeats the last one when the script runs out.
    struct ScriptedLlm {
        script: Mutex<VecDeque<Reply>>,
        repeat_call: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl ScriptedLlm {
        fn new(script: Vec<Reply>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                repeat_call: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn always_calling(tool: &'static str) -> Self {
            Self {
                repeat_call: Some(tool),
                ..Self::new(vec![])
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }

        async fn complete(&self, _request: CompletionRequest) -> LlmResult<CompletionResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            let reply = match (next, self.repeat_call) {
                (Some(reply), _) => reply,
                (None, Some(tool)) => Reply::Call(tool),
                (None, None) => Reply::Text("out of script"),
            };
            let message = match reply {
                Reply::Call(tool) => Message::assistant_with_tools(
                    "",
                    vec![ToolCall::new(ToolCall::generate_id(), tool, json!({}))],
                ),
                Reply::Calls(tools) => Message::assistant_with_tools(
                    "",
                    tools
                        .into_iter()
                        .map(|tool| ToolCall::new(ToolCall::generate_id(), tool, json!({})))
                        .collect(),
                ),
                Reply::Text(text) => Message::assistant(text),
                Reply::Fail => return Err(LlmError::Network("connection refused".into())),
            };
            Ok(CompletionResponse {
                message,
                finish_reason: FinishReason::Stop,
                usage: None,
            })
        }
    }

    #[derive(Clone, Copy)]
    enum ToolBehavior {
        Succeed,
        Fail(ToolErrorKind),
        /// Fail only the named tool, succeed for the rest
        FailNamed(&'static str, ToolErrorKind),
        Hang,
    }

    struct StubTools {
        behavior: ToolBehavior,
        invoked: Mutex<Vec<String>>,
    }

    impl StubTools {
        fn new(behavior: ToolBehavior) -> Self {
            Self {
                behavior,
                invoked: Mutex::new(Vec::new()),
            }
        }

        fn invoked(&self) -> Vec<String> {
            self.invoked.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ToolPort for StubTools {
        async fn invoke(&self, invocation: ToolInvocation) -> ToolResult {
            self.invoked.lock().unwrap().push(invocation.name.clone());
            match self.behavior {
                ToolBehavior::Succeed => {
                    ToolResult::success(invocation.name, json!({"count": 1}), 1)
                }
                ToolBehavior::Fail(kind) => {
                    ToolResult::failure(invocation.name, kind, "stub failure", 1)
                }
                ToolBehavior::FailNamed(name, kind) if invocation.name == name => {
                    ToolResult::failure(invocation.name, kind, "stub failure", 1)
                }
                ToolBehavior::FailNamed(..) => {
                    ToolResult::success(invocation.name, json!({"count": 1}), 1)
                }
                ToolBehavior::Hang => std::future::pending::<ToolResult>().await,
            }
        }

        fn list_tools(&self) -> Vec<Tool> {
            vec![Tool {
                name: "get_domains".into(),
                description: "list domains".into(),
                input_schema: json!({"type": "object", "properties": {}}),
            }]
        }
    }

    fn settings(max_turns: u32) -> AgentSettings {
        AgentSettings {
            max_turns,
            memory: MemoryConfig::default(),
            ..AgentSettings::default()
        }
    }

    fn session(llm: Arc<ScriptedLlm>, tools: Arc<StubTools>, max_turns: u32) -> AgentSession {
        AgentSession::new(llm, tools, &settings(max_turns))
    }

    fn assert_tool_turns_linked(session: &AgentSession) {
        let msgs = session.conversation().messages();
        for (i, m) in msgs.iter().enumerate() {
            if m.role == Role::Tool {
                let id = m.tool_call_id.as_deref().unwrap();
                assert!(msgs[..i].iter().any(|prev| prev.requested(id)));
            }
        }
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let llm = Arc::new(ScriptedLlm::new(vec![Reply::Text("Two domains.")]));
        let tools = Arc::new(StubTools::new(ToolBehavior::Succeed));
        let mut session = session(llm.clone(), tools, 5);

        let outcome = session
            .run_turn("which domains?", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.answer, "Two domains.");
        assert_eq!(outcome.model_turns, 1);
        assert_eq!(session.state(), SessionState::AwaitingUserInput);
        assert_eq!(session.conversation().len(), 2);
    }

    #[tokio::test]
    async fn test_tool_then_answer() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Reply::Call("get_domains"),
            Reply::Text("NORTH.SEVENKINGDOMS.LOCAL is collected."),
        ]));
        let tools = Arc::new(StubTools::new(ToolBehavior::Succeed));
        let mut session = session(llm.clone(), tools.clone(), 5);

        let outcome = session
            .run_turn("which domains?", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.model_turns, 2);
        assert_eq!(outcome.tool_calls.len(), 1);
        assert!(outcome.tool_calls[0].success);
        assert_eq!(tools.invoked(), vec!["get_domains"]);

        let roles: Vec<Role> = session.conversation().messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]);
        assert_tool_turns_linked(&session);
    }

    #[tokio::test]
    async fn test_turn_budget_bounds_model_calls() {
        let llm = Arc::new(ScriptedLlm::always_calling("get_domains"));
        let tools = Arc::new(StubTools::new(ToolBehavior::Succeed));
        let mut session = session(llm.clone(), tools.clone(), 3);

        let outcome = session
            .run_turn("loop forever", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(llm.calls(), 3);
        assert_eq!(outcome.model_turns, 3);
        assert_eq!(tools.invoked().len(), 3);
        assert!(outcome.exhausted.is_some());
        assert!(outcome.answer.contains("turn budget"));
        assert_eq!(session.state(), SessionState::AwaitingUserInput);
        assert_tool_turns_linked(&session);
    }

    #[tokio::test]
    async fn test_time_budget() {
        let llm = Arc::new(ScriptedLlm::always_calling("get_domains"));
        let tools = Arc::new(StubTools::new(ToolBehavior::Succeed));
        let mut session = AgentSession::new(
            llm.clone(),
            tools,
            &AgentSettings {
                max_duration_secs: 0,
                ..settings(5)
            },
        );

        let outcome = session.run_turn("hi", &CancellationToken::new()).await.unwrap();
        assert_eq!(llm.calls(), 0);
        assert!(outcome.exhausted.unwrap().contains("time budget"));
    }

    #[tokio::test]
    async fn test_batch_runs_in_order_and_survives_one_failure() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Reply::Calls(vec!["get_users", "get_domains"]),
            Reply::Text("Users are unavailable, but one domain is collected."),
        ]));
        let tools = Arc::new(StubTools::new(ToolBehavior::FailNamed(
            "get_users",
            ToolErrorKind::Transient,
        )));
        let mut session = session(llm.clone(), tools.clone(), 5);

        let outcome = session
            .run_turn("users and domains?", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(tools.invoked(), vec!["get_users", "get_domains"]);
        assert_eq!(outcome.model_turns, 2);
        assert_eq!(outcome.tool_calls.len(), 2);
        assert_eq!(outcome.tool_calls[0].tool_name, "get_users");
        assert!(!outcome.tool_calls[0].success);
        assert_eq!(outcome.tool_calls[0].error_kind, Some(ToolErrorKind::Transient));
        assert_eq!(outcome.tool_calls[1].tool_name, "get_domains");
        assert!(outcome.tool_calls[1].success);
        assert_eq!(session.state(), SessionState::AwaitingUserInput);

        let msgs = session.conversation().messages();
        let roles: Vec<Role> = msgs.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::Tool, Role::Tool, Role::Assistant]
        );

        let requested: Vec<&str> = msgs[1]
            .tool_calls
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(msgs[2].tool_call_id.as_deref(), Some(requested[0]));
        assert_eq!(msgs[3].tool_call_id.as_deref(), Some(requested[1]));
        assert!(msgs[2].content.contains("stub failure"));
        assert_tool_turns_linked(&session);
    }

    #[tokio::test]
    async fn test_text_intent_runs_tool() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Reply::Text("```json\n{\"tool\": \"get_domains\", \"arguments\": {}}\n```"),
            Reply::Text("One domain."),
        ]));
        let tools = Arc::new(StubTools::new(ToolBehavior::Succeed));
        let mut session = session(llm, tools.clone(), 5);

        let outcome = session.run_turn("domains?", &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.answer, "One domain.");
        assert_eq!(tools.invoked(), vec!["get_domains"]);
    }

    #[tokio::test]
    async fn test_tool_failure_is_not_fatal() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Reply::Call("get_domains"),
            Reply::Text("BloodHound is busy, try again shortly."),
        ]));
        let tools = Arc::new(StubTools::new(ToolBehavior::Fail(ToolErrorKind::Transient)));
        let mut session = session(llm, tools, 5);

        let outcome = session.run_turn("domains?", &CancellationToken::new()).await.unwrap();
        assert!(!outcome.tool_calls[0].success);
        assert_eq!(outcome.tool_calls[0].error_kind, Some(ToolErrorKind::Transient));
        assert_eq!(session.state(), SessionState::AwaitingUserInput);

        let tool_turn = &session.conversation().messages()[2];
        assert!(tool_turn.content.contains("stub failure"));
    }

    #[tokio::test]
    async fn test_auth_failure_closes_session() {
        let llm = Arc::new(ScriptedLlm::always_calling("get_domains"));
        let tools = Arc::new(StubTools::new(ToolBehavior::Fail(ToolErrorKind::AuthFailure)));
        let mut session = session(llm, tools, 5);

        let err = session.run_turn("domains?", &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, AgentError::AuthFailure(_)));
        assert_eq!(session.state(), SessionState::SessionClosed);
        assert!(session.conversation().is_empty());

        let again = session.run_turn("retry", &CancellationToken::new()).await;
        assert!(matches!(again, Err(AgentError::SessionClosed)));
    }

    #[tokio::test]
    async fn test_model_failure_rolls_back_and_session_survives() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Reply::Text("first answer"),
            Reply::Call("get_domains"),
            Reply::Fail,
            Reply::Text("second answer"),
        ]));
        let tools = Arc::new(StubTools::new(ToolBehavior::Succeed));
        let mut session = session(llm, tools, 5);
        let cancel = CancellationToken::new();

        session.run_turn("q1", &cancel).await.unwrap();
        let before = session.conversation().messages().to_vec();

        let err = session.run_turn("q2", &cancel).await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(_)));
        assert_eq!(session.conversation().messages(), &before[..]);
        assert_eq!(session.state(), SessionState::AwaitingUserInput);

        let outcome = session.run_turn("q2", &cancel).await.unwrap();
        assert_eq!(outcome.answer, "second answer");
    }

    #[tokio::test]
    async fn test_cancel_during_tool_discards_partial_turn() {
        let llm = Arc::new(ScriptedLlm::always_calling("get_domains"));
        let tools = Arc::new(StubTools::new(ToolBehavior::Hang));
        let mut session = session(llm, tools, 5);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = session.run_turn("domains?", &cancel).await.unwrap_err();
        assert!(matches!(err, AgentError::Cancelled));
        assert!(session.conversation().is_empty());
        assert_eq!(session.state(), SessionState::AwaitingUserInput);
    }

    #[tokio::test]
    async fn test_events_report_progress() {
        let llm = Arc::new(ScriptedLlm::new(vec![Reply::Call("get_domains"), Reply::Text("ok")]));
        let tools = Arc::new(StubTools::new(ToolBehavior::Succeed));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut session = session(llm, tools, 5).with_events(tx);

        session.run_turn("domains?", &CancellationToken::new()).await.unwrap();

        let mut states = Vec::new();
        let mut finished = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                SessionEvent::State(s) => states.push(s),
                SessionEvent::ToolFinished(_) => finished += 1,
                SessionEvent::ToolStarted(_) => {}
            }
        }
        assert_eq!(finished, 1);
        assert_eq!(
            states,
            vec![
                SessionState::ModelThinking,
                SessionState::ToolRequested,
                SessionState::ToolExecuting,
                SessionState::ModelThinking,
                SessionState::FinalAnswer,
                SessionState::AwaitingUserInput,
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let tools = Arc::new(StubTools::new(ToolBehavior::Succeed));
        let mut session = session(llm.clone(), tools, 5);
        assert!(matches!(
            session.run_turn("   ", &CancellationToken::new()).await,
            Err(AgentError::InvalidInput(_))
        ));
        assert_eq!(llm.calls(), 0);
    }
}
