//! Reasoning Sessions
//!
//! One run of the model-driven loop, from its seed prompt to a terminal
//! state. A session is owned by the request that created it and is dropped
//! with it.
//!
//! ```text
//! AwaitingModel ──tool calls──▶ ExecutingTools ──results──▶ AwaitingModel
//!       │                              │
//!       ├──final answer──▶ Done        └──transport failure──▶ Failed
//!       └──model error / cancel──▶ Failed
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::{Conversation, Message};
use crate::recursion::RecursionContext;

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form for log lines
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of the reasoning loop
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "detail")]
pub enum SessionState {
    AwaitingModel,
    ExecutingTools,
    Done,
    Failed(String),
}

/// What seeded the session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOrigin {
    /// Direct user request
    Root,
    /// Invocation of the named capability
    Capability(String),
}

/// A reasoning session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReasoningSession {
    pub id: SessionId,
    pub origin: SessionOrigin,
    conversation: Conversation,
    recursion: RecursionContext,
    state: SessionState,
    result: Option<String>,
    tool_rounds: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReasoningSession {
    fn seeded(origin: SessionOrigin, system_prompt: String, prompt: String, recursion: RecursionContext) -> Self {
        let now = Utc::now();
        let mut conversation = Conversation::with_system_prompt(system_prompt);
        conversation.push(Message::user(prompt));
        Self {
            id: SessionId::new(),
            origin,
            conversation,
            recursion,
            state: SessionState::AwaitingModel,
            result: None,
            tool_rounds: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Session for a direct user request
    pub fn root(system_prompt: impl Into<String>, request: impl Into<String>, recursion: RecursionContext) -> Self {
        Self::seeded(SessionOrigin::Root, system_prompt.into(), request.into(), recursion)
    }

    /// Session for a capability invocation, seeded with its filled prompt
    pub fn nested(
        capability: impl Into<String>,
        system_prompt: impl Into<String>,
        prompt: impl Into<String>,
        recursion: RecursionContext,
    ) -> Self {
        Self::seeded(
            SessionOrigin::Capability(capability.into()),
            system_prompt.into(),
            prompt.into(),
            recursion,
        )
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn recursion(&self) -> RecursionContext {
        self.recursion
    }

    pub fn depth(&self) -> u32 {
        self.recursion.current_depth
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn tool_rounds(&self) -> usize {
        self.tool_rounds
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, SessionState::Done | SessionState::Failed(_))
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.conversation.push(message);
        self.touch();
    }

    pub(crate) fn await_model(&mut self) {
        self.state = SessionState::AwaitingModel;
        self.touch();
    }

    pub(crate) fn begin_tools(&mut self) {
        self.state = SessionState::ExecutingTools;
        self.touch();
    }

    pub(crate) fn end_tool_round(&mut self) {
        self.tool_rounds += 1;
        self.await_model();
    }

    pub(crate) fn finish(&mut self, result: String) {
        self.result = Some(result);
        self.state = SessionState::Done;
        self.touch();
    }

    pub(crate) fn fail(&mut self, reason: impl Into<String>) {
        self.state = SessionState::Failed(reason.into());
        self.touch();
    }
}
