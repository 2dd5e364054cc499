//! Reasoning Loop
//!
//! Drives a [`ReasoningSession`]: send the conversation to the model, run the
//! tool calls it asks for, append the results, repeat until the model gives a
//! final answer.
//!
//! Names resolve against the tool catalog first, then the capability catalog.
//! A capability runs as a nested session one level deeper, on the same
//! catalog snapshot, under a child cancellation token.
//!
//! Tool-level problems (unknown name, bad capability arguments, depth
//! ceiling, failing tool or nested session, cancellation of an in-flight
//! call) become tool results the model can react to. Model errors and
//! transport failures fail the session and are returned to the caller.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::capability::CapabilityDescriptor;
use crate::catalog::{AgentCatalogs, Resolved, ToolTarget};
use crate::connection::ProviderConnection;
use crate::error::{AgentError, Result, ToolError};
use crate::message::Message;
use crate::protocol::{Arguments, ToolOutput};
use crate::provider::{Completion, GenerationOptions, LlmProvider};
use crate::recursion::RecursionContext;
use crate::session::ReasoningSession;
use crate::tool::{Tool, ToolCall};

/// Outcome of one tool invocation as seen by the model
pub type ToolOutcome = std::result::Result<ToolOutput, ToolError>;

/// Engine configuration
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// System prompt template
    pub system_prompt: String,

    /// Tool rounds before the model is asked to answer without tools
    pub max_tool_rounds: usize,

    /// Generation options
    pub generation: GenerationOptions,

    /// Whether to append tool descriptions to system prompt
    pub inject_tool_descriptions: bool,

    /// Upper bound on a single remote invocation
    pub invoke_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_tool_rounds: 10,
            generation: GenerationOptions::default(),
            inject_tool_descriptions: true,
            invoke_timeout: Duration::from_secs(60),
        }
    }
}

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful assistant with access to tools.

Choose the appropriate tool based on the task. If no tool is needed, reply directly.
When you receive a tool result, decide whether you need more information.
If yes, call another tool. If no, give your final answer without any tool block."#;

const TOOL_LIMIT_NOTICE: &str =
    "Maximum tool chain length reached. Give your final answer now without calling any tool.";

/// The reasoning engine; cheap to clone, one per catalog snapshot
#[derive(Clone)]
pub struct ReasoningEngine {
    provider: Arc<dyn LlmProvider>,
    catalogs: Arc<AgentCatalogs>,
    config: Arc<EngineConfig>,
}

impl ReasoningEngine {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        catalogs: Arc<AgentCatalogs>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            provider,
            catalogs,
            config,
        }
    }

    /// Build the full system prompt including tool descriptions
    pub fn system_prompt(&self) -> String {
        let mut prompt = self.config.system_prompt.clone();

        if self.config.inject_tool_descriptions && !self.catalogs.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.catalogs.generate_prompt_section());
        }

        prompt
    }

    /// Create a root session for a user request
    pub fn root_session(&self, request: &str, recursion: RecursionContext) -> ReasoningSession {
        ReasoningSession::root(self.system_prompt(), request, recursion)
    }

    /// Answer a user request in a fresh root session
    pub async fn ask(
        &self,
        request: &str,
        recursion: RecursionContext,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let mut session = self.root_session(request, recursion);
        self.run(&mut session, cancel).await
    }

    /// Drive `session` to `Done` or `Failed`
    pub async fn run(&self, session: &mut ReasoningSession, cancel: &CancellationToken) -> Result<String> {
        let span = tracing::info_span!(
            "session",
            id = %session.id.short(),
            depth = session.depth(),
        );
        self.drive(session, cancel).instrument(span).await
    }

    async fn drive(&self, session: &mut ReasoningSession, cancel: &CancellationToken) -> Result<String> {
        if session.is_terminal() {
            return Err(AgentError::Other(format!("session {} already finished", session.id)));
        }

        loop {
            let limit_reached = session.tool_rounds() >= self.config.max_tool_rounds;
            if limit_reached {
                tracing::warn!(rounds = session.tool_rounds(), "Tool round limit reached");
                session.push(Message::system(TOOL_LIMIT_NOTICE));
            }

            let completion = match self.complete(session, cancel).await {
                Ok(completion) => completion,
                Err(e) => {
                    session.fail(e.to_string());
                    return Err(e);
                }
            };

            session.push(Message::assistant(&completion.content));
            let calls = extract_tool_calls(&completion);

            if calls.is_empty() {
                tracing::debug!(tokens = session.conversation().estimate_tokens(), "Session done");
                session.finish(completion.content.clone());
                return Ok(completion.content);
            }

            if limit_reached {
                let e = AgentError::MaxIterations(self.config.max_tool_rounds);
                session.fail(e.to_string());
                return Err(e);
            }

            session.begin_tools();
            let recursion = session.recursion();

            // Calls run concurrently; join_all hands results back in call order
            let mut pending = Vec::with_capacity(calls.len());
            for call in &calls {
                pending.push(self.invoke(call, recursion, cancel));
            }
            let results = join_all(pending).await;

            let mut failure = None;
            for (call, result) in calls.iter().zip(results) {
                match result {
                    Ok(outcome) => session.push(tool_message(call, &outcome)),
                    Err(e) => {
                        tracing::error!(tool = %call.name, error = %e, "Invocation failed");
                        failure.get_or_insert(e);
                    }
                }
            }

            if let Some(e) = failure {
                session.fail(e.to_string());
                return Err(e);
            }

            if cancel.is_cancelled() {
                session.fail(AgentError::Cancelled.to_string());
                return Err(AgentError::Cancelled);
            }

            session.end_tool_round();
        }
    }

    async fn complete(&self, session: &ReasoningSession, cancel: &CancellationToken) -> Result<Completion> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentError::Cancelled),
            completion = self.provider.complete(session.conversation().messages(), &self.config.generation) => completion,
        }
    }

    /// Resolve and execute one call.
    ///
    /// The outer `Result` is for failures that end the calling session; the
    /// inner one is what the model gets to see.
    pub async fn invoke(
        &self,
        call: &ToolCall,
        recursion: RecursionContext,
        cancel: &CancellationToken,
    ) -> Result<ToolOutcome> {
        let Ok(resolved) = self.catalogs.resolve(&call.name) else {
            tracing::warn!(tool = %call.name, "Unknown tool requested");
            return Ok(Err(ToolError::NotFound(call.name.clone())));
        };

        match resolved {
            Resolved::Tool(entry) => match &entry.target {
                ToolTarget::Local(tool) => Ok(self.execute_local(tool.as_ref(), call, cancel).await),
                ToolTarget::Remote(connection) => {
                    self.invoke_remote(connection.as_ref(), call, recursion, cancel).await
                }
            },
            Resolved::Capability(capability) => {
                Ok(self.invoke_capability(capability, &call.arguments, recursion, cancel).await)
            }
        }
    }

    async fn execute_local(&self, tool: &dyn Tool, call: &ToolCall, cancel: &CancellationToken) -> ToolOutcome {
        tracing::debug!(tool = %call.name, "Executing local tool");
        tool.validate(call)?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ToolError::Cancelled),
            result = tool.execute(call) => result.map_err(|e| ToolError::Execution(e.to_string())),
        }
    }

    async fn invoke_remote(
        &self,
        connection: &dyn ProviderConnection,
        call: &ToolCall,
        recursion: RecursionContext,
        cancel: &CancellationToken,
    ) -> Result<ToolOutcome> {
        tracing::debug!(tool = %call.name, provider = connection.identity(), "Invoking remote tool");
        let timeout = self.config.invoke_timeout;
        let pending = tokio::time::timeout(timeout, connection.invoke(&call.name, &call.arguments, &recursion));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(Err(ToolError::Cancelled)),
            result = pending => match result {
                Err(_) => Err(AgentError::Transport(format!(
                    "'{}' on provider '{}' did not respond within {:?}",
                    call.name,
                    connection.identity(),
                    timeout
                ))),
                Ok(Ok(output)) => Ok(Ok(output)),
                // The provider is gone; its tools fail, the session does not
                Ok(Err(e @ AgentError::Connection { .. })) => Ok(Err(ToolError::Execution(e.to_string()))),
                Ok(Err(e)) => Err(e),
            },
        }
    }

    /// Run a capability as a nested session one level below `recursion`
    pub async fn invoke_capability(
        &self,
        capability: &CapabilityDescriptor,
        arguments: &Arguments,
        recursion: RecursionContext,
        cancel: &CancellationToken,
    ) -> ToolOutcome {
        let nested = match recursion.descend() {
            Ok(nested) => nested,
            Err(e) => {
                tracing::warn!(
                    capability = %capability.name,
                    depth = recursion.current_depth,
                    max_depth = recursion.max_depth,
                    "Recursion limit reached"
                );
                return Err(e);
            }
        };
        let prompt = capability.format_prompt(arguments)?;

        tracing::info!(capability = %capability.name, depth = nested.current_depth, "Starting nested session");
        let session = ReasoningSession::nested(&capability.name, self.system_prompt(), prompt, nested);

        match self.run_nested(session, cancel.child_token()).await {
            Ok(answer) => Ok(ToolOutput::success(answer)),
            Err(AgentError::Cancelled) => Err(ToolError::Cancelled),
            Err(e) => Err(ToolError::Execution(format!("capability '{}' failed: {}", capability.name, e))),
        }
    }

    /// Boxed so the engine can recurse through capabilities
    fn run_nested(&self, mut session: ReasoningSession, cancel: CancellationToken) -> BoxFuture<'_, Result<String>> {
        async move { self.run(&mut session, &cancel).await }.boxed()
    }

    pub fn catalogs(&self) -> &Arc<AgentCatalogs> {
        &self.catalogs
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Format a tool result for the conversation
fn tool_message(call: &ToolCall, outcome: &ToolOutcome) -> Message {
    let content = match outcome {
        Ok(output) if !output.is_error => format!("[Tool '{}' returned]\n{}", call.name, output.content),
        Ok(output) => format!("[Tool '{}' failed]\n{}", call.name, output.content),
        Err(e) => format!("[Tool '{}' failed]\n{}", call.name, e),
    };
    Message::tool(content, call.id.clone()).with_name(&call.name)
}

/// Tool calls requested by a completion, each with a call ID
pub fn extract_tool_calls(completion: &Completion) -> Vec<ToolCall> {
    let mut calls = if completion.tool_calls.is_empty() {
        parse_tool_calls(&completion.content)
    } else {
        completion.tool_calls.clone()
    };

    for call in &mut calls {
        if call.id.is_none() {
            call.id = Some(uuid::Uuid::new_v4().to_string());
        }
    }
    calls
}

/// Parse tool calls from model text: every ```tool block, or failing that,
/// inline JSON objects carrying `tool` and `arguments`.
pub fn parse_tool_calls(content: &str) -> Vec<ToolCall> {
    let fenced = parse_fenced_calls(content);
    if fenced.is_empty() {
        parse_inline_calls(content)
    } else {
        fenced
    }
}

fn parse_fenced_calls(content: &str) -> Vec<ToolCall> {
    const OPEN: &str = "```tool";
    const CLOSE: &str = "```";

    let mut calls = Vec::new();
    let mut rest = content;

    while let Some(start) = rest.find(OPEN) {
        let after_marker = &rest[start + OPEN.len()..];
        // ```toolbox and friends are other languages
        if !after_marker.starts_with(char::is_whitespace) {
            rest = after_marker;
            continue;
        }
        let Some(end) = after_marker.find(CLOSE) else {
            break;
        };

        let json_str = after_marker[..end].trim();
        match serde_json::from_str::<ToolCall>(json_str) {
            Ok(call) => calls.push(call),
            Err(e) => tracing::warn!(error = %e, "Ignoring malformed tool block"),
        }
        rest = &after_marker[end + CLOSE.len()..];
    }

    calls
}

fn parse_inline_calls(content: &str) -> Vec<ToolCall> {
    let mut calls = Vec::new();
    let mut pos = 0;

    while let Some(offset) = content[pos..].find('{') {
        let start = pos + offset;
        let mut stream = serde_json::Deserializer::from_str(&content[start..]).into_iter::<Value>();

        match stream.next() {
            Some(Ok(value)) => {
                if value.get("tool").is_some() && value.get("arguments").is_some() {
                    if let Ok(call) = serde_json::from_value::<ToolCall>(value) {
                        calls.push(call);
                    }
                }
                pos = start + stream.byte_offset();
            }
            _ => pos = start + 1,
        }
    }

    calls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CapabilityCatalog, ToolCatalog};
    use crate::message::Role;
    use crate::session::SessionState;
    use crate::tool::CalculatorTool;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Model that replays canned completions in order
    struct ScriptedModel {
        script: Mutex<VecDeque<Result<Completion>>>,
    }

    impl ScriptedModel {
        fn new(script: Vec<Result<Completion>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedModel {
        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(&self, _messages: &[Message], _options: &GenerationOptions) -> Result<Completion> {
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Completion::text("script exhausted")))
        }
    }

    /// Provider whose tools sleep for a per-tool delay; `hang` never answers
    struct SlowProvider;

    #[async_trait]
    impl ProviderConnection for SlowProvider {
        fn identity(&self) -> &str {
            "slow"
        }

        async fn discover(&self) -> Result<Vec<crate::protocol::ToolDefinition>> {
            Ok(["slow", "fast", "hang"]
                .iter()
                .map(|name| crate::protocol::ToolDefinition {
                    name: (*name).into(),
                    description: String::new(),
                    input_schema: serde_json::json!({"type": "object"}),
                })
                .collect())
        }

        async fn invoke(&self, name: &str, _arguments: &Arguments, _recursion: &RecursionContext) -> Result<ToolOutput> {
            match name {
                "slow" => tokio::time::sleep(Duration::from_millis(80)).await,
                "hang" => std::future::pending::<()>().await,
                _ => {}
            }
            Ok(ToolOutput::success(format!("{} done", name)))
        }

        fn is_connected(&self) -> bool {
            true
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    /// Provider that refuses invocations once closed
    struct ClosableProvider {
        connected: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl ProviderConnection for ClosableProvider {
        fn identity(&self) -> &str {
            "lookup-host"
        }

        async fn discover(&self) -> Result<Vec<crate::protocol::ToolDefinition>> {
            Ok(vec![crate::protocol::ToolDefinition {
                name: "lookup".into(),
                description: "Look something up".into(),
                input_schema: serde_json::json!({"type": "object"}),
            }])
        }

        async fn invoke(&self, name: &str, _arguments: &Arguments, _recursion: &RecursionContext) -> Result<ToolOutput> {
            if !self.is_connected() {
                return Err(AgentError::Connection {
                    provider: self.identity().into(),
                    reason: "connection closed".into(),
                });
            }
            Ok(ToolOutput::success(format!("{} done", name)))
        }

        fn is_connected(&self) -> bool {
            self.connected.load(std::sync::atomic::Ordering::SeqCst)
        }

        async fn close(&self) -> Result<()> {
            self.connected.store(false, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    async fn engine_with(model: Arc<ScriptedModel>, config: EngineConfig) -> ReasoningEngine {
        let mut tools = ToolCatalog::new();
        tools.register_local(Arc::new(CalculatorTool)).unwrap();
        let provider: Arc<dyn ProviderConnection> = Arc::new(SlowProvider);
        for definition in provider.discover().await.unwrap() {
            tools.register_remote(definition, provider.clone()).unwrap();
        }
        let catalogs = AgentCatalogs::new(tools, CapabilityCatalog::new());
        ReasoningEngine::new(model, Arc::new(catalogs), Arc::new(config))
    }

    fn tool_messages(session: &ReasoningSession) -> Vec<String> {
        session.conversation().by_role(Role::Tool).map(|m| m.content.clone()).collect()
    }

    #[test]
    fn test_parse_fenced_tool_calls() {
        let content = r#"Let me check both.
```tool
{"tool": "calculate", "arguments": {"expression": "2 + 2"}}
```
and
```tool
{"tool": "datetime", "arguments": {}}
```"#;

        let calls = parse_tool_calls(content);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "calculate");
        assert_eq!(calls[0].arguments["expression"], "2 + 2");
        assert_eq!(calls[1].name, "datetime");
    }

    #[test]
    fn test_parse_ignores_other_fence_languages() {
        let content = "```toolbox\n{\"tool\": \"calculate\", \"arguments\": {}}\n```\n\
                       ```tool\n{\"tool\": \"datetime\", \"arguments\": {}}\n```";
        let calls = parse_tool_calls(content);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "datetime");

        let content = "```tools\n{\"tool\": \"calculate\", \"arguments\": {}}\n```";
        assert!(parse_fenced_calls(content).is_empty());
    }

    #[test]
    fn test_parse_inline_tool_call() {
        let content = r#"Sure. {"note": {"x": 1}} {"tool": "search", "arguments": {"query": "rust {async}"}} thanks"#;
        let calls = parse_tool_calls(content);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "search");
        assert_eq!(calls[0].arguments["query"], "rust {async}");
    }

    #[test]
    fn test_plain_answer_has_no_calls() {
        assert!(parse_tool_calls("The answer is 4. {not json").is_empty());
        let calls = extract_tool_calls(&Completion::with_tool_calls(vec![ToolCall::new("x")]));
        assert!(calls[0].id.is_some());
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let engine = engine_with(ScriptedModel::new(vec![Ok(Completion::text("4"))]), EngineConfig::default()).await;
        let mut session = engine.root_session("2+2?", RecursionContext::root(2));

        let answer = engine.run(&mut session, &CancellationToken::new()).await.unwrap();
        assert_eq!(answer, "4");
        assert_eq!(session.state(), &SessionState::Done);
        assert_eq!(session.result(), Some("4"));
        assert!(session.conversation().messages()[0].content.contains("### calculate"));
    }

    #[tokio::test]
    async fn test_local_tool_round_trip() {
        let model = ScriptedModel::new(vec![
            Ok(Completion::text("```tool\n{\"tool\": \"calculate\", \"arguments\": {\"expression\": \"6 * 7\"}}\n```")),
            Ok(Completion::text("It is 42.")),
        ]);
        let engine = engine_with(model, EngineConfig::default()).await;
        let mut session = engine.root_session("6*7?", RecursionContext::root(2));

        assert_eq!(engine.run(&mut session, &CancellationToken::new()).await.unwrap(), "It is 42.");
        assert_eq!(session.tool_rounds(), 1);
        let tools = tool_messages(&session);
        assert_eq!(tools.len(), 1);
        assert!(tools[0].contains("6 * 7 = 42"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_recoverable() {
        let model = ScriptedModel::new(vec![
            Ok(Completion::with_tool_calls(vec![ToolCall::new("teleport")])),
            Ok(Completion::text("I cannot teleport.")),
        ]);
        let engine = engine_with(model, EngineConfig::default()).await;
        let mut session = engine.root_session("beam me up", RecursionContext::root(2));

        assert_eq!(engine.run(&mut session, &CancellationToken::new()).await.unwrap(), "I cannot teleport.");
        let tools = tool_messages(&session);
        assert!(tools[0].contains("failed"));
        assert!(tools[0].contains("No tool or capability named 'teleport'"));
    }

    #[tokio::test]
    async fn test_results_keep_call_order() {
        let model = ScriptedModel::new(vec![
            Ok(Completion::with_tool_calls(vec![ToolCall::new("slow"), ToolCall::new("fast")])),
            Ok(Completion::text("both done")),
        ]);
        let engine = engine_with(model, EngineConfig::default()).await;
        let mut session = engine.root_session("go", RecursionContext::root(2));

        engine.run(&mut session, &CancellationToken::new()).await.unwrap();
        let tools = tool_messages(&session);
        assert_eq!(tools.len(), 2);
        assert!(tools[0].contains("slow done"));
        assert!(tools[1].contains("fast done"));
    }

    #[tokio::test]
    async fn test_remote_timeout_fails_session() {
        let model = ScriptedModel::new(vec![Ok(Completion::with_tool_calls(vec![ToolCall::new("hang")]))]);
        let config = EngineConfig {
            invoke_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let engine = engine_with(model, config).await;
        let mut session = engine.root_session("wait", RecursionContext::root(2));

        let err = engine.run(&mut session, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, AgentError::Transport(_)));
        assert!(matches!(session.state(), SessionState::Failed(_)));
    }

    #[tokio::test]
    async fn test_model_error_fails_session() {
        let model = ScriptedModel::new(vec![Err(AgentError::Provider("boom".into()))]);
        let engine = engine_with(model, EngineConfig::default()).await;
        let mut session = engine.root_session("hi", RecursionContext::root(2));

        assert!(matches!(
            engine.run(&mut session, &CancellationToken::new()).await,
            Err(AgentError::Provider(_))
        ));
        assert!(matches!(session.state(), SessionState::Failed(reason) if reason.contains("boom")));
        assert!(engine.run(&mut session, &CancellationToken::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_tool_round_limit() {
        let call = || Ok(Completion::with_tool_calls(vec![ToolCall::new("fast")]));
        let config = EngineConfig {
            max_tool_rounds: 2,
            ..Default::default()
        };

        let engine = engine_with(ScriptedModel::new(vec![call(), call(), Ok(Completion::text("final"))]), config.clone()).await;
        let mut session = engine.root_session("loop", RecursionContext::root(2));
        assert_eq!(engine.run(&mut session, &CancellationToken::new()).await.unwrap(), "final");
        assert!(session.conversation().by_role(Role::System).any(|m| m.content == TOOL_LIMIT_NOTICE));

        let engine = engine_with(ScriptedModel::new(vec![call(), call(), call()]), config).await;
        let mut session = engine.root_session("loop", RecursionContext::root(2));
        assert!(matches!(
            engine.run(&mut session, &CancellationToken::new()).await,
            Err(AgentError::MaxIterations(2))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_model_answers() {
        let engine = engine_with(ScriptedModel::new(vec![]), EngineConfig::default()).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = engine.ask("anything", RecursionContext::root(1), &cancel).await.unwrap_err();
        assert!(matches!(err, AgentError::Cancelled));
    }

    #[tokio::test]
    async fn test_closed_connection_is_a_tool_error() {
        let provider = Arc::new(ClosableProvider {
            connected: std::sync::atomic::AtomicBool::new(true),
        });
        let mut tools = ToolCatalog::new();
        for definition in provider.discover().await.unwrap() {
            tools.register_remote(definition, provider.clone()).unwrap();
        }
        let catalogs = AgentCatalogs::new(tools, CapabilityCatalog::new());
        provider.close().await.unwrap();

        let model = ScriptedModel::new(vec![
            Ok(Completion::with_tool_calls(vec![ToolCall::new("lookup")])),
            Ok(Completion::text("Lookup is down, answering from memory.")),
        ]);
        let engine = ReasoningEngine::new(model, Arc::new(catalogs), Arc::new(EngineConfig::default()));
        let mut session = engine.root_session("look it up", RecursionContext::root(2));

        let answer = engine.run(&mut session, &CancellationToken::new()).await.unwrap();
        assert_eq!(answer, "Lookup is down, answering from memory.");
        assert_eq!(session.state(), &SessionState::Done);

        let tools = tool_messages(&session);
        assert_eq!(tools.len(), 1);
        assert!(tools[0].starts_with("[Tool 'lookup' failed]"));
        assert!(tools[0].contains("connection closed"));
    }
}
