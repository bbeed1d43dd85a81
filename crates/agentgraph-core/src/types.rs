//! Closed set of domain value types shared by the mapper and the runtime.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role of an agent in a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Human proxy: relays prompts to a person.
    UserProxy,
    /// Plain conversational participant.
    Assistant,
    RagUserProxy,
    Reasoning,
    Captain,
    /// Group coordinator: owns a subtree of member agents.
    GroupManager,
    DocAgent,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserProxy => "user_proxy",
            Self::Assistant => "assistant",
            Self::RagUserProxy => "rag_user_proxy",
            Self::Reasoning => "reasoning",
            Self::Captain => "captain",
            Self::GroupManager => "group_manager",
            Self::DocAgent => "doc_agent",
        }
    }

    /// Only group coordinators may be referenced as a `parentId`.
    pub fn can_own_children(&self) -> bool {
        matches!(self, Self::GroupManager)
    }

    pub fn is_coordinator(&self) -> bool {
        matches!(self, Self::GroupManager)
    }

    /// Human input mode applied when a record does not specify one.
    pub fn default_human_input_mode(&self) -> HumanInputMode {
        match self {
            Self::UserProxy | Self::RagUserProxy => HumanInputMode::Always,
            _ => HumanInputMode::Never,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user_proxy" | "user" => Ok(Self::UserProxy),
            "assistant" => Ok(Self::Assistant),
            "rag_user_proxy" | "rag_user" => Ok(Self::RagUserProxy),
            "reasoning" => Ok(Self::Reasoning),
            "captain" => Ok(Self::Captain),
            "group_manager" | "manager" => Ok(Self::GroupManager),
            "doc_agent" => Ok(Self::DocAgent),
            other => Err(format!("unknown agent role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HumanInputMode {
    Always,
    Never,
    Terminate,
}

impl FromStr for HumanInputMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ALWAYS" => Ok(Self::Always),
            "NEVER" => Ok(Self::Never),
            "TERMINATE" => Ok(Self::Terminate),
            other => Err(format!("unknown human input mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminationKind {
    #[default]
    None,
    Keyword,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminationCriterion {
    Found,
    Ending,
    Exact,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryMethod {
    #[default]
    #[serde(rename = "lastMsg", alias = "last_msg")]
    LastMsg,
    #[serde(rename = "reflectionWithLlm", alias = "reflection_with_llm")]
    ReflectionWithLlm,
    #[serde(rename = "none")]
    None,
}

/// Kind of the message that opens a chat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    None,
    /// Literal text.
    String,
    /// Text with `{placeholders}` resolved from the message context.
    Template,
    /// Generated at run time by a user supplied function.
    Method,
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "none" => Ok(Self::None),
            "string" => Ok(Self::String),
            "template" => Ok(Self::Template),
            "method" => Ok(Self::Method),
            other => Err(format!("unknown message type: {}", other)),
        }
    }
}

/// Semantic role of a chat, derived from its endpoints on every import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    /// Direct chat between agents at the same level.
    #[default]
    Chat,
    /// Nested-chat trigger.
    Nested,
    ToManager,
    FromManager,
    Handoff,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Nested => "nested",
            Self::ToManager => "to_manager",
            Self::FromManager => "from_manager",
            Self::Handoff => "handoff",
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition under which a hand-off chat fires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "conditionType", rename_all = "snake_case")]
pub enum HandoffCondition {
    #[default]
    Always,
    /// An LLM judges the prompt.
    StringLlm { prompt: String },
    /// An LLM judges a prompt rendered from context variables.
    ContextStrLlm {
        #[serde(rename = "contextStr")]
        context_str: String,
    },
    /// A boolean context variable.
    StringContext {
        #[serde(rename = "variableName")]
        variable_name: String,
    },
    ExpressionContext { expression: String },
}

/// Gate deciding whether a hand-off is offered at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "AvailabilityWire", try_from = "AvailabilityWire")]
pub enum Availability {
    #[default]
    Always,
    /// Available while the named context variable is truthy.
    Variable(String),
    Expression(String),
}

#[derive(Serialize, Deserialize)]
struct AvailabilityWire {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    value: String,
}

impl From<Availability> for AvailabilityWire {
    fn from(value: Availability) -> Self {
        let (kind, value) = match value {
            Availability::Always => ("none", String::new()),
            Availability::Variable(v) => ("string", v),
            Availability::Expression(v) => ("expression", v),
        };
        Self {
            kind: kind.to_string(),
            value,
        }
    }
}

impl TryFrom<AvailabilityWire> for Availability {
    type Error = String;

    fn try_from(wire: AvailabilityWire) -> std::result::Result<Self, Self::Error> {
        match wire.kind.as_str() {
            "none" => Ok(Self::Always),
            "string" => Ok(Self::Variable(wire.value)),
            "expression" => Ok(Self::Expression(wire.value)),
            other => Err(format!("unknown availability type: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_role_aliases() {
        assert_eq!("rag_user".parse::<AgentRole>().unwrap(), AgentRole::RagUserProxy);
        assert_eq!("Manager".parse::<AgentRole>().unwrap(), AgentRole::GroupManager);
        assert!("robot".parse::<AgentRole>().is_err());
    }

    #[test]
    fn default_human_input_mode_per_role() {
        assert_eq!(AgentRole::UserProxy.default_human_input_mode(), HumanInputMode::Always);
        assert_eq!(AgentRole::Assistant.default_human_input_mode(), HumanInputMode::Never);
    }

    #[test]
    fn summary_method_legacy_alias() {
        let m: SummaryMethod = serde_json::from_str(r#""reflection_with_llm""#).unwrap();
        assert_eq!(m, SummaryMethod::ReflectionWithLlm);
        assert_eq!(serde_json::to_string(&m).unwrap(), r#""reflectionWithLlm""#);
    }

    #[test]
    fn condition_wire_format() {
        let c = HandoffCondition::StringContext {
            variable_name: "escalate".into(),
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["conditionType"], "string_context");
        assert_eq!(json["variableName"], "escalate");
    }

    #[test]
    fn availability_wire_format() {
        let none: Availability =
            serde_json::from_value(serde_json::json!({"type": "none", "value": ""})).unwrap();
        assert_eq!(none, Availability::Always);

        let expr = Availability::Expression("${count} > 2".into());
        let json = serde_json::to_value(&expr).unwrap();
        assert_eq!(json, serde_json::json!({"type": "expression", "value": "${count} > 2"}));

        let bad = serde_json::from_value::<Availability>(serde_json::json!({"type": "maybe"}));
        assert!(bad.is_err());
    }
}
