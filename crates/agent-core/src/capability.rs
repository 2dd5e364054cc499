//! Capabilities
//!
//! A capability is an operation of this agent backed by a full nested
//! reasoning session. Its prompt template is compiled against the declared
//! input schema when the capability is loaded, so an unknown placeholder is
//! rejected before the first invocation rather than in the middle of one.
//!
//! Template syntax: `{name}` is a placeholder, `{{` and `}}` are literal
//! braces.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TemplateError;
use crate::protocol::{Arguments, ToolDefinition, empty_object_schema};
use crate::tool::{ToolDescriptor, ToolOrigin};

/// Capability as declared in configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapabilityConfig {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,

    pub prompt_template: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// Prompt template compiled against an input schema
#[derive(Clone, Debug)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
    /// Declared property defaults, looked up when an argument is absent
    defaults: Arguments,
    /// Properties the schema marks as required
    required: Vec<String>,
}

impl PromptTemplate {
    /// Parse `source` and check every placeholder against the schema's
    /// declared properties.
    pub fn compile(source: &str, input_schema: &Value) -> Result<Self, TemplateError> {
        let segments = parse_segments(source)?;

        let properties = input_schema
            .get("properties")
            .and_then(Value::as_object);

        for segment in &segments {
            if let Segment::Placeholder(name) = segment {
                if !properties.is_some_and(|p| p.contains_key(name)) {
                    return Err(TemplateError::UnknownPlaceholder(name.clone()));
                }
            }
        }

        let defaults = properties
            .map(|props| {
                props
                    .iter()
                    .filter_map(|(name, prop)| prop.get("default").map(|d| (name.clone(), d.clone())))
                    .collect()
            })
            .unwrap_or_default();

        let required = input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).map(String::from).collect())
            .unwrap_or_default();

        Ok(Self {
            source: source.to_string(),
            segments,
            defaults,
            required,
        })
    }

    /// Fill the template; fails if a placeholder or a required property has
    /// neither an argument nor a declared default.
    pub fn render(&self, arguments: &Arguments) -> Result<String, TemplateError> {
        for name in &self.required {
            if !arguments.contains_key(name) && !self.defaults.contains_key(name) {
                return Err(TemplateError::MissingArgument(name.clone()));
            }
        }

        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = arguments
                        .get(name)
                        .or_else(|| self.defaults.get(name))
                        .ok_or_else(|| TemplateError::MissingArgument(name.clone()))?;
                    match value {
                        Value::String(s) => out.push_str(s),
                        other => out.push_str(&other.to_string()),
                    }
                }
            }
        }
        Ok(out)
    }

    /// Placeholder names in order of first appearance
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Placeholder(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

fn parse_segments(source: &str) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = source.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' if chars.peek().map(|&(_, n)| n) == Some('{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek().map(|&(_, n)| n) == Some('}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for (_, n) in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    name.push(n);
                }
                if !closed {
                    return Err(TemplateError::Malformed {
                        position: pos,
                        reason: "unclosed '{'".into(),
                    });
                }
                let name = name.trim();
                if !is_identifier(name) {
                    return Err(TemplateError::Malformed {
                        position: pos,
                        reason: format!("invalid placeholder name '{}'", name),
                    });
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(name.to_string()));
            }
            '}' => {
                return Err(TemplateError::Malformed {
                    position: pos,
                    reason: "unmatched '}'".into(),
                });
            }
            _ => literal.push(c),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// A capability of this agent; immutable once loaded
#[derive(Clone, Debug)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub prompt_template: PromptTemplate,
}

impl CapabilityDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        prompt_template: &str,
    ) -> Result<Self, TemplateError> {
        let prompt_template = PromptTemplate::compile(prompt_template, &input_schema)?;
        Ok(Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            prompt_template,
        })
    }

    pub fn from_config(config: &CapabilityConfig) -> Result<Self, TemplateError> {
        Self::new(
            config.name.clone(),
            config.description.clone(),
            config.input_schema.clone(),
            &config.prompt_template,
        )
    }

    /// Fill the prompt for one invocation
    pub fn format_prompt(&self, arguments: &Arguments) -> Result<String, TemplateError> {
        self.prompt_template.render(arguments)
    }

    /// How the capability is advertised when this agent acts as a provider
    pub fn as_tool(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
            origin: ToolOrigin::Capability,
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        self.as_tool().definition()
    }
}
