//! Graph exporter: the right inverse of the importer.

use agentgraph_core::secret::redact_secrets;
use agentgraph_core::{Agent, Chat, Flow, Model, Passthrough, Tool};
use chrono::SecondsFormat;
use serde_json::{json, Value};
use tracing::debug;

/// Schema revision written into every export.
pub const SCHEMA_VERSION: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Replace credential-shaped values with the redaction placeholder.
    pub hide_secrets: bool,
    /// Omit derived cross references and handle ids.
    pub skip_links: bool,
}

const LINK_KEYS: &[&str] = &["sourceHandle", "targetHandle"];

/// Serialize a flow to the stable graph schema.
///
/// Object keys come out sorted, so exporting the same flow twice is
/// byte-identical.
pub fn export_flow(flow: &Flow, options: ExportOptions) -> Value {
    let mut nodes: Vec<Value> = Vec::with_capacity(
        flow.agents.len() + flow.models.len() + flow.tools.len() + flow.other_nodes.len(),
    );
    nodes.extend(flow.agents.iter().map(export_agent));
    nodes.extend(flow.models.iter().map(export_model));
    nodes.extend(flow.tools.iter().map(export_tool));
    nodes.extend(flow.other_nodes.iter().cloned());

    let edges: Vec<Value> = flow
        .chats
        .iter()
        .map(|chat| export_chat(chat, options.skip_links))
        .collect();

    let mut doc = flow.extras.clone();
    let meta = json!({
        "id": flow.id,
        "type": "flow",
        "name": flow.name,
        "description": flow.description,
        "tags": flow.tags,
        "requirements": flow.requirements,
        "createdAt": flow.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        "updatedAt": flow.updated_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        "schemaVersion": SCHEMA_VERSION,
        "nodes": nodes,
        "edges": edges,
    });
    overlay(&mut doc, meta);

    let mut out = Value::Object(doc);
    if options.hide_secrets {
        let masked = redact_secrets(&mut out);
        debug!(flow = %flow.id, masked, "secrets redacted");
    }
    out
}

fn export_agent(agent: &Agent) -> Value {
    let config = &agent.config;
    let mut data = agent.extras.clone();
    overlay(
        &mut data,
        json!({
            "name": agent.name,
            "description": agent.description,
            "agentType": agent.role,
            "parentId": agent.parent_id,
            "humanInputMode": config.human_input_mode,
            "systemMessage": config.system_message,
            "modelIds": config.model_ids,
            "tools": config.tools,
            "termination": config.termination,
            "maxConsecutiveAutoReply": config.max_consecutive_auto_reply,
            "agentDefaultAutoReply": config.default_auto_reply,
            "handoffs": config.handoffs,
        }),
    );
    node(&agent.id, "agent", &agent.view, data)
}

fn export_model(model: &Model) -> Value {
    let mut data = model.extras.clone();
    overlay(
        &mut data,
        json!({
            "name": model.name,
            "apiType": model.api_type,
            "baseUrl": model.base_url,
            "apiKey": model.api_key,
        }),
    );
    node(&model.id, "model", &model.view, data)
}

fn export_tool(tool: &Tool) -> Value {
    let mut data = tool.extras.clone();
    overlay(
        &mut data,
        json!({
            "name": tool.name,
            "toolType": tool.tool_type,
            "content": tool.content,
            "secrets": tool.secrets,
        }),
    );
    node(&tool.id, "tool", &tool.view, data)
}

fn export_chat(chat: &Chat, skip_links: bool) -> Value {
    let message = &chat.message;
    let mut message_data = message.extras.clone();
    overlay(
        &mut message_data,
        json!({
            "type": message.body.kind(),
            "content": message.body.content(),
            "useCarryover": message.use_carryover,
            "context": message.context,
        }),
    );
    let mut data = chat.extras.clone();
    overlay(
        &mut data,
        json!({
            "name": chat.name,
            "description": chat.description,
            "order": chat.order,
            "prerequisites": chat.prerequisites,
            "clearHistory": chat.clear_history,
            "message": message_data,
            "summary": chat.summary,
            "maxTurns": chat.max_turns,
            "condition": chat.condition,
            "available": chat.available,
        }),
    );
    if !skip_links {
        data.insert("realSource".into(), Value::String(chat.source_agent_id.clone()));
        data.insert("realTarget".into(), Value::String(chat.target_agent_id.clone()));
    }

    let mut edge = chat.view.clone();
    if skip_links {
        for key in LINK_KEYS {
            edge.remove(*key);
        }
    }
    overlay(
        &mut edge,
        json!({
            "id": chat.id,
            "type": chat.role,
            "source": chat.source_agent_id,
            "target": chat.target_agent_id,
            "data": data,
        }),
    );
    Value::Object(edge)
}

fn node(id: &str, kind: &str, view: &Passthrough, data: Passthrough) -> Value {
    let mut node = view.clone();
    overlay(
        &mut node,
        json!({
            "id": id,
            "type": kind,
            "data": data,
        }),
    );
    Value::Object(node)
}

/// Write every field of `fields` over `target`; authoritative fields shadow
/// passthrough ones.
fn overlay(target: &mut Passthrough, fields: Value) {
    if let Value::Object(fields) = fields {
        target.extend(fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentgraph_core::secret::SECRET_PLACEHOLDER;
    use agentgraph_core::{AgentRole, ChatRole, InitialMessage};
    use std::collections::BTreeMap;

    fn flow() -> Flow {
        let mut flow = Flow::new("f1", "demo");
        let mut user = Agent::new("u", "user", AgentRole::UserProxy);
        user.view.insert("position".into(), json!({"x": 1, "y": 2}));
        flow.agents.push(user);
        flow.agents.push(Agent::new("a", "assistant", AgentRole::Assistant));
        let mut chat = Chat::new("c1", "u", "a");
        chat.role = ChatRole::Nested;
        chat.message = InitialMessage::literal("hello");
        chat.view.insert("sourceHandle".into(), json!("h-top"));
        chat.extras.insert("nestedChat".into(), json!({"message": null}));
        flow.chats.push(chat);
        flow.models.push(Model {
            id: "m1".into(),
            name: "gpt".into(),
            api_type: "openai".into(),
            base_url: None,
            api_key: Some("sk-abc".into()),
            extras: Passthrough::new(),
            view: Passthrough::new(),
        });
        flow.tools.push(Tool {
            id: "t1".into(),
            name: "search".into(),
            tool_type: "custom".into(),
            content: "def search(): ...".into(),
            secrets: BTreeMap::from([("SEARCH_KEY".to_string(), "k-777".to_string())]),
            extras: Passthrough::new(),
            view: Passthrough::new(),
        });
        flow
    }

    #[test]
    fn shape() {
        let out = export_flow(&flow(), ExportOptions::default());
        assert_eq!(out["type"], "flow");
        assert_eq!(out["schemaVersion"], 2);
        assert_eq!(out["nodes"].as_array().unwrap().len(), 4);

        let user = &out["nodes"][0];
        assert_eq!(user["position"]["x"], 1);
        assert_eq!(user["data"]["agentType"], "user_proxy");
        assert_eq!(user["data"]["humanInputMode"], "ALWAYS");

        let edge = &out["edges"][0];
        assert_eq!(edge["type"], "nested");
        assert_eq!(edge["sourceHandle"], "h-top");
        assert_eq!(edge["data"]["realSource"], "u");
        assert_eq!(edge["data"]["message"]["type"], "string");
        assert_eq!(edge["data"]["message"]["content"], "hello");
        assert!(edge["data"]["nestedChat"].is_object());
    }

    #[test]
    fn skip_links_strips_derived() {
        let out = export_flow(
            &flow(),
            ExportOptions {
                skip_links: true,
                ..Default::default()
            },
        );
        let edge = &out["edges"][0];
        assert!(edge.get("sourceHandle").is_none());
        assert!(edge["data"].get("realSource").is_none());
        assert!(edge["data"].get("realTarget").is_none());
        assert_eq!(edge["source"], "u");
    }

    #[test]
    fn hide_secrets_uses_placeholder() {
        let out = export_flow(
            &flow(),
            ExportOptions {
                hide_secrets: true,
                ..Default::default()
            },
        );
        let text = out.to_string();
        assert!(!text.contains("sk-abc"));
        assert!(!text.contains("k-777"));
        assert_eq!(out["nodes"][2]["data"]["apiKey"], SECRET_PLACEHOLDER);
        assert_eq!(out["nodes"][3]["data"]["secrets"]["SEARCH_KEY"], SECRET_PLACEHOLDER);
    }

    #[test]
    fn hide_secrets_covers_aws_block() {
        let mut f = flow();
        f.models[0].extras.insert(
            "aws".into(),
            json!({"accessKey": "AKIAEXAMPLE123", "secretKey": "wJalr", "sessionToken": "FQoG", "region": "eu-west-1"}),
        );
        let out = export_flow(
            &f,
            ExportOptions {
                hide_secrets: true,
                ..Default::default()
            },
        );
        let aws = &out["nodes"][2]["data"]["aws"];
        assert_eq!(aws["accessKey"], SECRET_PLACEHOLDER);
        assert_eq!(aws["secretKey"], SECRET_PLACEHOLDER);
        assert_eq!(aws["sessionToken"], SECRET_PLACEHOLDER);
        assert_eq!(aws["region"], "eu-west-1");
        assert!(!out.to_string().contains("AKIAEXAMPLE123"));
    }

    #[test]
    fn nested_extras_exported_under_authoritative_fields() {
        let mut f = flow();
        f.chats[0].message.extras.insert("attachments".into(), json!(["a.txt"]));
        f.chats[0].message.extras.insert("content".into(), json!("stale"));
        f.chats[0].summary.extras.insert("maxTokens".into(), json!(64));
        f.agents[1].config.termination.extras.insert("caseSensitive".into(), json!(true));
        let out = export_flow(&f, ExportOptions::default());

        let data = &out["edges"][0]["data"];
        assert_eq!(data["message"]["attachments"][0], "a.txt");
        assert_eq!(data["message"]["content"], "hello");
        assert_eq!(data["summary"]["maxTokens"], 64);
        assert_eq!(out["nodes"][1]["data"]["termination"]["caseSensitive"], true);
    }

    #[test]
    fn unset_secret_stays_null() {
        let mut f = flow();
        f.models[0].api_key = None;
        let out = export_flow(
            &f,
            ExportOptions {
                hide_secrets: true,
                ..Default::default()
            },
        );
        assert!(out["nodes"][2]["data"]["apiKey"].is_null());
    }

    #[test]
    fn authoritative_fields_shadow_extras() {
        let mut f = flow();
        f.agents[0].extras.insert("name".into(), json!("stale"));
        let out = export_flow(&f, ExportOptions::default());
        assert_eq!(out["nodes"][0]["data"]["name"], "user");
    }
}
