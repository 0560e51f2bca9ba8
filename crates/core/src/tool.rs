//! Tool trait and registry — the abstraction over the agent's side effects.
//!
//! The set of tools is closed: every tool has a [`ToolName`] variant, a
//! declarative [`ToolSpec`] advertised to the model, and an implementation
//! registered once at startup. The registry is the dispatch boundary: no
//! tool failure, malformed call or unknown name escapes it as an error.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::message::MessageToolCall;
use crate::provider::ToolDefinition;

/// Every tool the persona agent knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    /// Record a visitor's contact details together with their question.
    RecordUserDetails,
    /// Record a question that could not be answered.
    RecordUnknownQuestion,
}

impl ToolName {
    /// All variants, in advertisement order.
    pub const ALL: [ToolName; 2] = [ToolName::RecordUserDetails, ToolName::RecordUnknownQuestion];

    /// The wire name the model uses.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::RecordUserDetails => "record_user_details",
            ToolName::RecordUnknownQuestion => "record_unknown_question",
        }
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ToolError::NotFound(s.to_string()))
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON type of a declared tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
        }
    }

    fn matches(&self, value: &serde_json::Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Object => value.is_object(),
            ParamType::Array => value.is_array(),
        }
    }
}

/// One field of a tool's parameter schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl ParameterSpec {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }
}

/// Declarative call signature of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: ToolName,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

impl ToolSpec {
    /// Render the parameters as a JSON Schema object.
    pub fn json_schema(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    serde_json::json!({
                        "type": p.param_type.as_str(),
                        "description": p.description,
                    }),
                )
            })
            .collect();

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Convert into the definition sent to the model.
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.as_str().to_string(),
            description: self.description.clone(),
            parameters: self.json_schema(),
        }
    }

    /// Check arguments against the declared parameters.
    ///
    /// Required fields must be present and non-null, and every declared
    /// field that is present must have the declared type. Undeclared fields
    /// are ignored.
    pub fn validate(&self, arguments: &serde_json::Value) -> Result<(), ToolError> {
        let malformed = |reason: String| ToolError::MalformedCall {
            tool_name: self.name.to_string(),
            reason,
        };

        let Some(fields) = arguments.as_object() else {
            return Err(malformed("arguments must be a JSON object".into()));
        };

        for param in &self.parameters {
            match fields.get(&param.name) {
                None | Some(serde_json::Value::Null) if param.required => {
                    return Err(malformed(format!("missing required field '{}'", param.name)));
                }
                None | Some(serde_json::Value::Null) => {}
                Some(value) if !param.param_type.matches(value) => {
                    return Err(malformed(format!(
                        "field '{}' must be of type {}",
                        param.name,
                        param.param_type.as_str()
                    )));
                }
                Some(_) => {}
            }
        }

        for key in fields.keys() {
            if !self.parameters.iter().any(|p| &p.name == key) {
                debug!(tool = %self.name, field = %key, "Ignoring undeclared argument");
            }
        }

        Ok(())
    }
}

/// A parsed request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute, as sent by the model
    pub name: String,

    /// Arguments as a JSON object
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Parse the model's raw call. Empty argument text means `{}`.
    pub fn parse(call: &MessageToolCall) -> Result<Self, ToolError> {
        let raw = call.arguments.trim();
        let arguments = if raw.is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(raw).map_err(|e| ToolError::MalformedCall {
                tool_name: call.name.clone(),
                reason: format!("arguments are not valid JSON: {e}"),
            })?
        };

        let arguments = match arguments {
            serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
            other => other,
        };

        Ok(Self {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments,
        })
    }
}

/// Outcome status of a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Ok,
    Error,
}

/// The result of a tool call. Exactly one is produced per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// Whether the tool executed successfully
    pub status: ToolStatus,

    /// Structured result, or `{"error": ...}` on failure
    pub payload: serde_json::Value,
}

impl ToolResult {
    pub fn ok(call_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            call_id: call_id.into(),
            status: ToolStatus::Ok,
            payload,
        }
    }

    pub fn error(call_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            status: ToolStatus::Error,
            payload: serde_json::json!({ "error": message.into() }),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ToolStatus::Ok
    }

    /// Serialized form placed in the tool-role message.
    pub fn to_content(&self) -> String {
        serde_json::json!({
            "status": self.status,
            "payload": self.payload,
        })
        .to_string()
    }
}

/// The core Tool trait.
///
/// Implementations must be side-effect tolerant: a failure of whatever they
/// talk to should come back as a payload, not a panic.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Which tool this is.
    fn name(&self) -> ToolName;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// Declared parameters.
    fn parameters(&self) -> Vec<ParameterSpec>;

    /// Execute the tool with already-validated arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError>;

    /// The full call signature advertised to the model.
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

struct RegisteredTool {
    spec: ToolSpec,
    tool: Box<dyn Tool>,
}

/// Closed mapping from [`ToolName`] to implementation and schema.
///
/// Built once at startup and shared read-only behind an `Arc`.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<ToolName, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A second registration under the same name is rejected.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name();
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateRegistration(name.to_string()));
        }
        let spec = tool.spec();
        self.tools.insert(name, RegisteredTool { spec, tool });
        Ok(())
    }

    /// Fail unless every [`ToolName`] has an implementation.
    pub fn validate_complete(&self) -> Result<(), ToolError> {
        match ToolName::ALL.into_iter().find(|n| !self.tools.contains_key(n)) {
            Some(missing) => Err(ToolError::MissingImplementation(missing.to_string())),
            None => Ok(()),
        }
    }

    /// Look up a tool by the name the model used.
    pub fn resolve(&self, name: &str) -> Result<&dyn Tool, ToolError> {
        let key = ToolName::from_str(name)?;
        self.tools
            .get(&key)
            .map(|t| t.tool.as_ref())
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// All registered specs, in [`ToolName`] order.
    pub fn describe(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|t| t.spec.clone()).collect()
    }

    /// Definitions ready to be sent to the provider.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.spec.to_definition()).collect()
    }

    /// Execute a parsed call, propagating failures.
    pub async fn execute(&self, call: &ToolCall) -> Result<serde_json::Value, ToolError> {
        let tool = self.resolve(&call.name)?;
        tool.spec().validate(&call.arguments)?;

        AssertUnwindSafe(tool.execute(call.arguments.clone()))
            .catch_unwind()
            .await
            .map_err(|panic| ToolError::Panicked {
                tool_name: call.name.clone(),
                reason: panic_message(panic.as_ref()),
            })?
    }

    /// Run a raw model call through the dispatch boundary.
    ///
    /// Never fails: any problem becomes a `status = error` result naming the
    /// tool, so the model can be told and recover.
    pub async fn dispatch(&self, call: &MessageToolCall) -> ToolResult {
        let outcome = match ToolCall::parse(call) {
            Ok(parsed) => self.execute(&parsed).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(payload) => ToolResult::ok(&call.id, payload),
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.id, error = %e, "Tool call failed");
                ToolResult::error(&call.id, format!("{}: {e}", call.name))
            }
        }
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<ToolName> {
        self.tools.keys().copied().collect()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
