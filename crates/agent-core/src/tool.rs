//! Tool System
//!
//! Tools are atomic, schema-described operations. A tool either lives in this
//! process (implementing [`Tool`]) or is discovered on a provider connection;
//! both end up as a [`ToolDescriptor`] in the catalog.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::{Result, ToolError};
use crate::protocol::{Arguments, ToolDefinition, ToolOutput};

/// Tool call request from the LLM
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    #[serde(alias = "tool")]
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: Arguments,

    /// Optional call ID for tracking
    #[serde(default)]
    pub id: Option<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Arguments::new(),
            id: None,
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Where a catalog entry executes
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOrigin {
    /// Implemented in this process
    #[default]
    Local,
    /// Owned by the provider connection with this identity
    Provider(String),
    /// Backed by a nested reasoning session on this agent
    Capability,
}

impl std::fmt::Display for ToolOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolOrigin::Local => write!(f, "local"),
            ToolOrigin::Provider(identity) => write!(f, "provider:{}", identity),
            ToolOrigin::Capability => write!(f, "capability"),
        }
    }
}

/// A catalog entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub origin: ToolOrigin,
}

impl ToolDescriptor {
    pub fn from_definition(definition: ToolDefinition, origin: ToolOrigin) -> Self {
        Self {
            name: definition.name,
            description: definition.description,
            input_schema: definition.input_schema,
            origin,
        }
    }

    /// Protocol view (origin is not advertised)
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }

    /// Format for the system prompt
    pub fn format_for_llm(&self) -> String {
        let mut out = format!("### {}\n{}\n", self.name, self.description);

        let required: Vec<&str> = self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        if let Some(props) = self.input_schema.get("properties").and_then(Value::as_object) {
            if !props.is_empty() {
                out.push_str("**Arguments:**\n");
                for (name, info) in props {
                    let description = info
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or("No description");
                    let marker = if required.contains(&name.as_str()) { " (required)" } else { "" };
                    out.push_str(&format!("- `{}`: {}{}\n", name, description, marker));
                }
            }
        }

        out
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Default value if not provided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Enum of allowed values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl ParameterSchema {
    pub fn new(name: impl Into<String>, param_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: false,
            default: None,
            enum_values: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }
}

/// Schema of a local tool
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,
}

impl ToolSchema {
    /// Render the parameter list as a JSON Schema object
    pub fn input_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut prop = serde_json::Map::new();
            prop.insert("type".into(), Value::String(param.param_type.clone()));
            prop.insert("description".into(), Value::String(param.description.clone()));
            if let Some(default) = &param.default {
                prop.insert("default".into(), default.clone());
            }
            if let Some(values) = &param.enum_values {
                prop.insert("enum".into(), Value::Array(values.clone()));
            }
            properties.insert(param.name.clone(), Value::Object(prop));

            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema(),
            origin: ToolOrigin::Local,
        }
    }
}

/// Tool trait - implement to add local tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments
    async fn execute(&self, call: &ToolCall) -> Result<ToolOutput>;

    /// Validate arguments before execution
    fn validate(&self, call: &ToolCall) -> std::result::Result<(), ToolError> {
        for param in self.schema().parameters.iter().filter(|p| p.required) {
            if !call.arguments.contains_key(&param.name) {
                return Err(ToolError::Execution(format!(
                    "Missing required parameter: {}",
                    param.name
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Built-in Tools
// ============================================================================

/// Names accepted by [`builtin`]
pub const BUILTIN_TOOLS: &[&str] = &["datetime", "calculate"];

/// Look up a built-in tool by name
pub fn builtin(name: &str) -> Option<Arc<dyn Tool>> {
    match name {
        "datetime" => Some(Arc::new(DateTimeTool)),
        "calculate" => Some(Arc::new(CalculatorTool)),
        _ => None,
    }
}

/// DateTime tool - returns current time
pub struct DateTimeTool;

#[async_trait]
impl Tool for DateTimeTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "datetime".into(),
            description: "Get the current date and time in UTC".into(),
            parameters: vec![
                ParameterSchema::new("format", "string", "Output format: 'iso', 'human', or 'unix'")
                    .with_default(serde_json::json!("human"))
                    .with_enum(vec![
                        serde_json::json!("iso"),
                        serde_json::json!("human"),
                        serde_json::json!("unix"),
                    ]),
            ],
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolOutput> {
        let now = chrono::Utc::now();

        let output = match call.arguments.get("format").and_then(Value::as_str) {
            Some("iso") => now.to_rfc3339(),
            Some("unix") => now.timestamp().to_string(),
            _ => now.format("%A, %B %d, %Y at %H:%M:%S UTC").to_string(),
        };

        Ok(ToolOutput::success(output))
    }
}

/// Calculator tool - evaluates arithmetic expressions
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "calculate".into(),
            description: "Evaluate an arithmetic expression with + - * / ^ and parentheses".into(),
            parameters: vec![
                ParameterSchema::new("expression", "string", "Expression to evaluate (e.g., '(2 + 3) * 4')")
                    .required(),
            ],
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolOutput> {
        let expr = call.arguments
            .get("expression")
            .and_then(Value::as_str)
            .unwrap_or_default();

        Ok(match evaluate(expr) {
            Ok(value) => ToolOutput::success(format!("{} = {}", expr, value)),
            Err(e) => ToolOutput::failure(e),
        })
    }
}

/// Recursive-descent evaluator: expr := term (('+'|'-') term)*,
/// term := power (('*'|'/') power)*, power := unary ('^' power)?,
/// unary := '-' unary | atom
fn evaluate(input: &str) -> std::result::Result<f64, String> {
    let tokens: Vec<char> = input.chars().filter(|c| !c.is_whitespace()).collect();
    let mut parser = ExprParser { tokens: &tokens, pos: 0, depth: 0 };
    let value = parser.expr()?;
    if parser.pos != tokens.len() {
        return Err(format!("Unexpected '{}' at position {}", tokens[parser.pos], parser.pos));
    }
    Ok(value)
}

/// Bound on parentheses, unary minus and exponent chains combined
const MAX_NESTING: usize = 64;

struct ExprParser<'a> {
    tokens: &'a [char],
    pos: usize,
    depth: usize,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<char> {
        self.tokens.get(self.pos).copied()
    }

    /// Consume the current token and run `parse` one nesting level deeper
    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> std::result::Result<f64, String>,
    ) -> std::result::Result<f64, String> {
        if self.depth >= MAX_NESTING {
            return Err("Expression nested too deeply".into());
        }
        self.pos += 1;
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn expr(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.power()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.pos += 1;
            let rhs = self.power()?;
            if op == '/' && rhs == 0.0 {
                return Err("Division by zero".into());
            }
            value = if op == '*' { value * rhs } else { value / rhs };
        }
        Ok(value)
    }

    fn power(&mut self) -> std::result::Result<f64, String> {
        let base = self.unary()?;
        if self.peek() == Some('^') {
            let exponent = self.nested(Self::power)?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn unary(&mut self) -> std::result::Result<f64, String> {
        if self.peek() == Some('-') {
            return Ok(-self.nested(Self::unary)?);
        }
        self.atom()
    }

    fn atom(&mut self) -> std::result::Result<f64, String> {
        match self.peek() {
            Some('(') => {
                let value = self.nested(Self::expr)?;
                if self.peek() != Some(')') {
                    return Err("Unbalanced parentheses".into());
                }
                self.pos += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
                    self.pos += 1;
                }
                let literal: String = self.tokens[start..self.pos].iter().collect();
                literal.parse::<f64>().map_err(|e| format!("Parse error: {}", e))
            }
            Some(c) => Err(format!("Unexpected '{}' at position {}", c, self.pos)),
            None => Err("Unexpected end of expression".into()),
        }
    }
}
