//! Ollama LLM Provider
//!
//! Reasoning model backed by a local or remote Ollama server. Tool calls
//! travel as text; the reasoning engine extracts them from the reply, so
//! tool results go back to the model as user-role context.

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, GenerationOptions, LlmProvider},
};
use async_trait::async_trait;
use ollama_rs::{
    generation::chat::{ChatMessage, MessageRole, request::ChatMessageRequest},
    models::ModelOptions as OllamaOptions,
    Ollama,
};

const DEFAULT_HOST: &str = "http://localhost";
const DEFAULT_PORT: u16 = 11434;

/// Where the Ollama server listens
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OllamaConfig {
    /// Scheme and host, without a port
    pub host: String,
    pub port: u16,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
        }
    }
}

impl OllamaConfig {
    /// Read `OLLAMA_HOST` (which may carry a port, as in
    /// `http://gpu-box:11500`) and `OLLAMA_PORT`, which wins over it
    pub fn from_env() -> Self {
        Self::from_values(std::env::var("OLLAMA_HOST").ok(), std::env::var("OLLAMA_PORT").ok())
    }

    fn from_values(host: Option<String>, port: Option<String>) -> Self {
        let (host, embedded_port) = host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map_or_else(|| (DEFAULT_HOST.to_string(), None), split_port);

        let port = port
            .and_then(|p| p.trim().parse().ok())
            .or(embedded_port)
            .unwrap_or(DEFAULT_PORT);

        Self { host, port }
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `http://box:11500` → (`http://box`, Some(11500)); hosts without a
/// scheme get `http://`
fn split_port(raw: &str) -> (String, Option<u16>) {
    let raw = raw.trim_end_matches('/');
    let with_scheme = if raw.contains("://") { raw.to_string() } else { format!("http://{}", raw) };

    let authority_start = with_scheme.find("://").map_or(0, |i| i + 3);
    match with_scheme.rfind(':') {
        Some(i) if i > authority_start => match with_scheme[i + 1..].parse() {
            Ok(port) => (with_scheme[..i].to_string(), Some(port)),
            Err(_) => (with_scheme, None),
        },
        _ => (with_scheme, None),
    }
}

/// `llama3.2` is served as `llama3.2:latest`
fn model_matches(wanted: &str, installed: &str) -> bool {
    installed == wanted
        || (!wanted.contains(':') && installed.strip_suffix(":latest") == Some(wanted))
}

/// Ollama LLM provider
pub struct OllamaProvider {
    client: Ollama,
    config: OllamaConfig,
    required_model: Option<String>,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            client: Ollama::new(config.host.clone(), config.port),
            config,
            required_model: None,
        }
    }

    pub fn from_env() -> Self {
        Self::new(OllamaConfig::from_env())
    }

    /// Health checks also require `model` to be pulled on the server
    pub fn require_model(mut self, model: impl Into<String>) -> Self {
        self.required_model = Some(model.into());
        self
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn convert_messages(messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => MessageRole::System,
                    Role::Assistant => MessageRole::Assistant,
                    Role::User | Role::Tool => MessageRole::User,
                };
                ChatMessage::new(role, m.content.clone())
            })
            .collect()
    }

    fn build_options(opts: &GenerationOptions) -> OllamaOptions {
        OllamaOptions::default()
            .temperature(opts.temperature)
            .top_p(opts.top_p)
            .num_predict(i32::try_from(opts.max_tokens).unwrap_or(i32::MAX))
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn health_check(&self) -> Result<bool> {
        let installed = match self.client.list_local_models().await {
            Ok(models) => models,
            Err(e) => {
                tracing::warn!(endpoint = %self.config.endpoint(), "Ollama unreachable: {}", e);
                return Ok(false);
            }
        };

        let Some(wanted) = &self.required_model else {
            return Ok(true);
        };
        let available = installed.iter().any(|m| model_matches(wanted, &m.name));
        if !available {
            tracing::warn!(model = %wanted, "Model not pulled on Ollama server");
        }
        Ok(available)
    }

    async fn complete(&self, messages: &[Message], options: &GenerationOptions) -> Result<Completion> {
        let request = ChatMessageRequest::new(options.model.clone(), Self::convert_messages(messages))
            .options(Self::build_options(options));

        tracing::debug!(model = %options.model, messages = messages.len(), "Sending chat request");

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AgentError::Provider(format!("{} ({}): {}", options.model, self.config.endpoint(), e)))?;

        Ok(Completion::text(response.message.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(host: Option<&str>, port: Option<&str>) -> OllamaConfig {
        OllamaConfig::from_values(host.map(String::from), port.map(String::from))
    }

    #[test]
    fn test_config_from_values() {
        assert_eq!(config(None, None), OllamaConfig::default());
        assert_eq!(config(Some("http://gpu-box:11500"), None).endpoint(), "http://gpu-box:11500");
        assert_eq!(config(Some("gpu-box"), None).endpoint(), "http://gpu-box:11434");
        assert_eq!(config(Some("http://gpu-box:11500/"), Some("9000")).port, 9000);
        assert_eq!(config(Some("  "), Some("junk")), OllamaConfig::default());
    }

    #[test]
    fn test_model_matching() {
        assert!(model_matches("llama3.2", "llama3.2:latest"));
        assert!(model_matches("llama3.2:1b", "llama3.2:1b"));
        assert!(!model_matches("llama3.2:1b", "llama3.2:latest"));
        assert!(!model_matches("llama3", "llama3.2:latest"));
    }

    #[test]
    fn test_tool_results_go_back_as_user_context() {
        let messages = vec![
            Message::system("You are helpful."),
            Message::assistant("```tool\n{\"tool\": \"calculate\"}\n```"),
            Message::tool("[Tool 'calculate' returned]\n2 + 2 = 4", Some("call-1".into())),
        ];

        let converted = OllamaProvider::convert_messages(&messages);
        assert!(matches!(converted[0].role, MessageRole::System));
        assert!(matches!(converted[1].role, MessageRole::Assistant));
        assert!(matches!(converted[2].role, MessageRole::User));
        assert!(converted[2].content.contains("2 + 2 = 4"));
    }
}
