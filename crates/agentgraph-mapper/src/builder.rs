//! Entity builders: total constructors from untrusted records.
//!
//! Every builder accepts a node/edge shaped record (`id`, `type`, `data`,
//! plus visual keys) and never fails. Missing fields take their documented
//! defaults silently; present but malformed fields take them too and, in the
//! `*_reporting` variants, leave a `Defaulted` issue behind.

use std::collections::{BTreeMap, BTreeSet};

use agentgraph_core::{
    Agent, AgentConfig, AgentRole, Chat, Flow, HumanInputMode, InitialMessage, MessageBody,
    MessageKind, Model, Passthrough, SummaryMethod, SummaryPolicy, TerminationPolicy, Tool,
    ToolBinding, ValidationIssue,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::fields::{extras, id_of, object, Fields};

/// Top-level keys of a node record; everything else is view state.
pub(crate) const NODE_KEYS: &[&str] = &["id", "type", "data"];
/// Top-level keys of an edge record; everything else is view state.
pub(crate) const EDGE_KEYS: &[&str] = &["id", "type", "source", "target", "data"];

const AGENT_KEYS: &[&str] = &[
    "name",
    "label",
    "description",
    "agentType",
    "agent_type",
    "parentId",
    "parent_id",
    "humanInputMode",
    "human_input_mode",
    "systemMessage",
    "system_message",
    "modelIds",
    "model_ids",
    "tools",
    "termination",
    "maxConsecutiveAutoReply",
    "max_consecutive_auto_reply",
    "agentDefaultAutoReply",
    "agent_default_auto_reply",
    "handoffs",
];

const CHAT_KEYS: &[&str] = &[
    "name",
    "label",
    "description",
    "order",
    "prerequisites",
    "clearHistory",
    "clear_history",
    "message",
    "summary",
    "maxTurns",
    "max_turns",
    "condition",
    "available",
    // Derived on export, never authoritative.
    "realSource",
    "realTarget",
    "sourceType",
    "targetType",
];

const MODEL_KEYS: &[&str] = &["name", "label", "apiType", "api_type", "baseUrl", "base_url", "apiKey", "api_key"];

const TOOL_KEYS: &[&str] = &["name", "label", "toolType", "tool_type", "content", "secrets"];

const MESSAGE_KEYS: &[&str] = &["type", "content", "useCarryover", "context"];

const SUMMARY_KEYS: &[&str] = &["method", "prompt", "args"];

/// Keys the flow itself interprets; the rest is passthrough.
pub(crate) const FLOW_KEYS: &[&str] = &[
    "id",
    "type",
    "name",
    "description",
    "tags",
    "requirements",
    "createdAt",
    "updatedAt",
    "schemaVersion",
    "data",
    "nodes",
    "edges",
    "agents",
    "chats",
    "models",
    "tools",
];

/// Build an agent, silently defaulting malformed fields.
pub fn build_agent(raw: &Value, fallback_role: Option<AgentRole>) -> Agent {
    build_agent_reporting(raw, fallback_role, &mut Vec::new())
}

pub fn build_agent_reporting(
    raw: &Value,
    fallback_role: Option<AgentRole>,
    issues: &mut Vec<ValidationIssue>,
) -> Agent {
    let id = id_of(raw).unwrap_or_default();
    let data = object(raw.get("data"));
    let view = view_of(raw, NODE_KEYS);
    let mut f = Fields::new(&id, &data, issues);

    let role = match f.parse::<AgentRole>(&["agentType", "agent_type"]) {
        Some(role) => role,
        None => match fallback_role {
            Some(role) => role,
            None => {
                if f.raw(&["agentType", "agent_type"]).is_none() {
                    f.defaulted("agentType", "missing, assuming assistant");
                }
                AgentRole::Assistant
            }
        },
    };

    let human_input_mode: HumanInputMode = f
        .parse(&["humanInputMode", "human_input_mode"])
        .unwrap_or_else(|| role.default_human_input_mode());

    let termination: TerminationPolicy = f.get_or_default(&["termination"]);
    let tools: Vec<ToolBinding> = f.get_or_default(&["tools"]);

    let config = AgentConfig {
        human_input_mode,
        system_message: f.get(&["systemMessage", "system_message"]),
        model_ids: f.get_or_default(&["modelIds", "model_ids"]),
        tools,
        termination,
        max_consecutive_auto_reply: f.get(&["maxConsecutiveAutoReply", "max_consecutive_auto_reply"]),
        default_auto_reply: f.get(&["agentDefaultAutoReply", "agent_default_auto_reply"]),
        handoffs: f.get_or_default(&["handoffs"]),
    };

    let name = f.get(&["name", "label"]).unwrap_or_else(|| id.clone());
    let description = f.get_or_default(&["description"]);
    let parent_id = f
        .get::<String>(&["parentId", "parent_id"])
        .filter(|p| !p.is_empty());

    Agent {
        id: id.clone(),
        name,
        description,
        role,
        parent_id,
        config,
        extras: extras(&data, AGENT_KEYS),
        view,
    }
}

/// Build a chat with the default role; the importer classifies it afterwards.
pub fn build_chat(raw: &Value) -> Chat {
    build_chat_reporting(raw, &mut Vec::new())
}

pub fn build_chat_reporting(raw: &Value, issues: &mut Vec<ValidationIssue>) -> Chat {
    let id = id_of(raw).unwrap_or_default();
    let data = object(raw.get("data"));
    let view = view_of(raw, EDGE_KEYS);
    let endpoint = |key: &str| {
        raw.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let mut chat = Chat::new(id.clone(), endpoint("source"), endpoint("target"));

    let mut f = Fields::new(&id, &data, issues);
    if let Some(name) = f.get(&["name", "label"]) {
        chat.name = name;
    }
    chat.description = f.get_or_default(&["description"]);
    chat.order = f.get_or_default(&["order"]);
    chat.prerequisites = f.get::<BTreeSet<String>>(&["prerequisites"]).unwrap_or_default();
    chat.clear_history = f.get_or_default(&["clearHistory", "clear_history"]);
    chat.max_turns = f.get(&["maxTurns", "max_turns"]);
    chat.condition = f.get(&["condition"]);
    chat.available = f.get(&["available"]);
    chat.message = build_message(&mut f);
    chat.summary = build_summary(&mut f);

    chat.extras = extras(&data, CHAT_KEYS);
    chat.view = view;
    chat
}

fn build_message(f: &mut Fields<'_>) -> InitialMessage {
    let Some((_, raw)) = f.raw(&["message"]) else {
        return InitialMessage::default();
    };
    let Value::Object(msg) = raw else {
        // Very old records carry the message as a bare string.
        if let Some(text) = raw.as_str() {
            return InitialMessage::literal(text);
        }
        f.defaulted("message", "expected an object");
        return InitialMessage::default();
    };

    let content = msg.get("content").and_then(Value::as_str).map(str::to_string);
    let kind: MessageKind = match msg.get("type").and_then(Value::as_str) {
        None => MessageKind::None,
        Some("rag_message_generator") => {
            f.defaulted("message.type", "legacy retrieval generator mapped to an empty method");
            return InitialMessage {
                body: MessageBody::Method(String::new()),
                use_carryover: msg.get("useCarryover").and_then(Value::as_bool).unwrap_or(false),
                context: object(msg.get("context")),
                extras: extras(msg, MESSAGE_KEYS),
            };
        }
        Some(other) => other.parse().unwrap_or_else(|e: String| {
            f.defaulted("message.type", &e);
            MessageKind::None
        }),
    };

    let body = match kind {
        MessageKind::None => MessageBody::None,
        MessageKind::String => MessageBody::Literal(content.unwrap_or_default()),
        MessageKind::Template => MessageBody::Template(content.unwrap_or_default()),
        MessageKind::Method => MessageBody::Method(content.unwrap_or_default()),
    };

    let use_carryover = match msg.get("useCarryover") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            f.defaulted("message.useCarryover", "expected a boolean");
            false
        }
    };
    let context = match msg.get("context") {
        None | Some(Value::Null) | Some(Value::Object(_)) => object(msg.get("context")),
        Some(_) => {
            f.defaulted("message.context", "expected an object");
            Passthrough::new()
        }
    };

    InitialMessage {
        body,
        use_carryover,
        context,
        extras: extras(msg, MESSAGE_KEYS),
    }
}

fn build_summary(f: &mut Fields<'_>) -> SummaryPolicy {
    let Some((_, raw)) = f.raw(&["summary"]) else {
        return SummaryPolicy::default();
    };
    let Value::Object(summary) = raw else {
        f.defaulted("summary", "expected an object");
        return SummaryPolicy::default();
    };

    let method = match summary.get("method") {
        None | Some(Value::Null) => SummaryMethod::default(),
        Some(v) => serde_json::from_value(v.clone()).unwrap_or_else(|e| {
            f.defaulted("summary.method", &e.to_string());
            SummaryMethod::default()
        }),
    };
    SummaryPolicy {
        method,
        prompt: summary
            .get("prompt")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        args: object(summary.get("args")),
        extras: extras(summary, SUMMARY_KEYS),
    }
}

pub fn build_model(raw: &Value) -> Model {
    build_model_reporting(raw, &mut Vec::new())
}

pub fn build_model_reporting(raw: &Value, issues: &mut Vec<ValidationIssue>) -> Model {
    let id = id_of(raw).unwrap_or_default();
    let data = object(raw.get("data"));
    let mut f = Fields::new(&id, &data, issues);
    Model {
        name: f.get(&["name", "label"]).unwrap_or_else(|| id.clone()),
        api_type: f
            .get(&["apiType", "api_type"])
            .unwrap_or_else(|| "openai".to_string()),
        base_url: f.get(&["baseUrl", "base_url"]),
        api_key: f.get(&["apiKey", "api_key"]),
        extras: extras(&data, MODEL_KEYS),
        view: view_of(raw, NODE_KEYS),
        id,
    }
}

pub fn build_tool(raw: &Value) -> Tool {
    build_tool_reporting(raw, &mut Vec::new())
}

pub fn build_tool_reporting(raw: &Value, issues: &mut Vec<ValidationIssue>) -> Tool {
    let id = id_of(raw).unwrap_or_default();
    let data = object(raw.get("data"));
    let mut f = Fields::new(&id, &data, issues);
    Tool {
        name: f.get(&["name", "label"]).unwrap_or_else(|| id.clone()),
        tool_type: f
            .get(&["toolType", "tool_type"])
            .unwrap_or_else(|| "custom".to_string()),
        content: f.get_or_default(&["content"]),
        secrets: f.get::<BTreeMap<String, String>>(&["secrets"]).unwrap_or_default(),
        extras: extras(&data, TOOL_KEYS),
        view: view_of(raw, NODE_KEYS),
        id,
    }
}

/// Build flow metadata from a top-level record. Agents, chats, models and
/// tools are left empty for the importer to fill.
pub fn build_flow(raw: &Passthrough, issues: &mut Vec<ValidationIssue>) -> Flow {
    let id = raw
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or("flow")
        .to_string();
    let mut f = Fields::new(&id, raw, issues);

    let mut flow = Flow::new(id.clone(), f.get(&["name"]).unwrap_or_else(|| id.clone()));
    flow.description = f.get_or_default(&["description"]);
    flow.tags = f.get_or_default(&["tags"]);
    flow.requirements = f.get_or_default(&["requirements"]);

    let created: Option<DateTime<Utc>> = f.get(&["createdAt"]);
    let updated: Option<DateTime<Utc>> = f.get(&["updatedAt"]);
    if created.is_none() || updated.is_none() {
        debug!(flow = %id, "regenerating missing timestamps");
    }
    flow.created_at = created.unwrap_or(flow.created_at);
    flow.updated_at = updated.unwrap_or(flow.updated_at);

    flow.extras = extras(raw, FLOW_KEYS);
    flow
}

/// Flatten a legacy record: its `data` object plus any top-level field the
/// data does not already hold, except the record's own `keep` keys.
pub(crate) fn flatten_legacy(record: &Value, keep: &[&str]) -> Passthrough {
    let mut data = object(record.get("data"));
    if let Value::Object(top) = record {
        for (key, value) in top {
            if keep.contains(&key.as_str()) {
                continue;
            }
            data.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
    data
}

fn view_of(raw: &Value, known: &[&str]) -> Passthrough {
    match raw {
        Value::Object(map) => extras(map, known),
        _ => Passthrough::new(),
    }
}
