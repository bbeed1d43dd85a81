//! Shared fixtures for agentgraph tests: flows, raw graph documents and
//! runtime event scripts.

use agentgraph_core::{
    Agent, AgentRole, Availability, Chat, ChatRole, Flow, HandoffCondition, InitialMessage, Model,
    Passthrough, SummaryMethod, Tool, ToolBinding,
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

/// A stable timestamp so exported documents compare equal across runs.
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap()
}

/// A graph document in the current schema: a user proxy talking to a
/// research group of two members, with a model, a tool and a note.
pub fn sample_graph() -> Value {
    json!({
        "id": "flow-research",
        "type": "flow",
        "name": "Research group",
        "description": "User asks a managed group to research a topic",
        "tags": ["demo"],
        "requirements": [],
        "createdAt": "2025-03-14T09:26:53Z",
        "updatedAt": "2025-03-14T09:26:53Z",
        "viewport": {"x": 0, "y": 0, "zoom": 1},
        "nodes": [
            {
                "id": "user",
                "type": "agent",
                "position": {"x": 0, "y": 0},
                "data": {"name": "User", "agentType": "user_proxy", "humanInputMode": "ALWAYS"}
            },
            {
                "id": "manager",
                "type": "agent",
                "position": {"x": 200, "y": 0},
                "data": {"name": "Manager", "agentType": "group_manager", "modelIds": ["gpt"]}
            },
            {
                "id": "researcher",
                "type": "agent",
                "position": {"x": 200, "y": 100},
                "data": {
                    "name": "Researcher",
                    "agentType": "assistant",
                    "parentId": "manager",
                    "systemMessage": "Find sources.",
                    "modelIds": ["gpt"],
                    "tools": [{"id": "search", "executorId": "researcher", "timeout": 30}],
                    "handoffs": ["handoff-writer"]
                }
            },
            {
                "id": "writer",
                "type": "agent",
                "position": {"x": 300, "y": 100},
                "data": {
                    "name": "Writer",
                    "agentType": "assistant",
                    "parentId": "manager",
                    "termination": {"type": "keyword", "keywords": ["DONE"], "criterion": "ending", "methodContent": null, "caseSensitive": false}
                }
            },
            {
                "id": "critic",
                "type": "agent",
                "position": {"x": 500, "y": 0},
                "data": {"name": "Critic", "agentType": "reasoning", "customFlag": true}
            },
            {
                "id": "gpt",
                "type": "model",
                "data": {"name": "gpt-4o", "apiType": "openai", "apiKey": "sk-test-0123456789"}
            },
            {
                "id": "search",
                "type": "tool",
                "data": {"name": "web_search", "toolType": "custom", "content": "def web_search(q): ...",
                    "secrets": {"SEARCH_API_KEY": "srch-abcdef"}}
            },
            {"id": "note-1", "type": "note", "position": {"x": 9, "y": 9}, "data": {"text": "remember"}}
        ],
        "edges": [
            {
                "id": "user-to-manager",
                "type": "group",
                "source": "user",
                "target": "manager",
                "sourceHandle": "user-bottom",
                "targetHandle": "manager-top",
                "data": {
                    "name": "Kick-off",
                    "order": 0,
                    "message": {"type": "string", "content": "Research Rust async runtimes", "useCarryover": false, "context": {},
                        "attachments": [{"name": "notes.md"}]},
                    "summary": {"method": "reflectionWithLlm", "prompt": "Summarize the findings", "args": {}, "maxTokens": 200}
                }
            },
            {
                "id": "handoff-writer",
                "type": "chat",
                "source": "researcher",
                "target": "writer",
                "data": {
                    "name": "Draft",
                    "order": 1,
                    "condition": {"conditionType": "string_llm", "prompt": "When research is complete"},
                    "available": {"type": "none", "value": ""}
                }
            },
            {
                "id": "user-to-critic",
                "type": "chat",
                "source": "user",
                "target": "critic",
                "data": {
                    "name": "Review",
                    "order": 2,
                    "prerequisites": ["user-to-manager"],
                    "maxTurns": 2,
                    "message": {"type": "template", "content": "Review {topic}", "useCarryover": true, "context": {"topic": "runtimes"}}
                }
            }
        ]
    })
}

/// The same kind of flow in the older shape: everything inside a `data`
/// envelope, agents grouped by role, chats as a separate list.
pub fn legacy_graph() -> Value {
    json!({
        "id": "flow-legacy",
        "type": "flow",
        "name": "Legacy flow",
        "description": "",
        "tags": [],
        "requirements": [],
        "storageId": "legacy-storage",
        "data": {
            "nodes": [
                {"id": "wa-1", "type": "agent", "position": {"x": 0, "y": 0}, "data": {"label": "Proxy", "agentType": "user_proxy"}},
                {"id": "wa-2", "type": "agent", "position": {"x": 10, "y": 10}, "data": {"label": "Helper", "agentType": "assistant"}}
            ],
            "edges": [
                {"id": "wc-1", "source": "wa-1", "target": "wa-2", "data": {"label": "wa-1 => wa-2"}}
            ],
            "viewport": {"x": 0, "y": 0, "zoom": 1},
            "isAsync": false,
            "agents": {
                "userProxyAgents": [{"id": "wa-1", "name": "Proxy", "data": {"humanInputMode": "ALWAYS"}}],
                "assistantAgents": [{"id": "wa-2", "name": "Helper", "data": {"systemMessage": "You help."}}],
                "reasoningAgents": [{"id": "wa-3", "name": "Thinker", "data": {}}]
            },
            "chats": [
                {
                    "id": "wc-1",
                    "type": "chat",
                    "source": "wa-1",
                    "target": "wa-2",
                    "data": {
                        "position": 0,
                        "order": 0,
                        "clearHistory": false,
                        "message": {"type": "rag_message_generator", "useCarryover": false, "content": null, "context": {}},
                        "nestedChat": {"message": null, "reply": null},
                        "summary": {"method": "last_msg", "prompt": "", "args": {}},
                        "maxTurns": 0,
                        "realSource": "wa-1",
                        "realTarget": "wa-2"
                    }
                }
            ],
            "models": [{"id": "wm-1", "name": "legacy-model", "data": {"apiType": "azure", "apiKey": "az-secret"}}],
            "tools": []
        }
    })
}

/// A small flow built directly from the domain types.
pub fn sample_flow() -> Flow {
    let mut flow = Flow::new("flow-built", "Built flow");
    flow.created_at = fixed_time();
    flow.updated_at = fixed_time();

    let mut user = Agent::new("user", "User", AgentRole::UserProxy);
    user.view.insert("position".into(), json!({"x": 0, "y": 0}));
    let manager = Agent::new("manager", "Manager", AgentRole::GroupManager);
    let mut coder = Agent::new("coder", "Coder", AgentRole::Assistant).with_parent("manager");
    coder.config.model_ids.push("model".into());
    coder.config.tools.push(ToolBinding::new("shell", "coder"));
    let reviewer = Agent::new("reviewer", "Reviewer", AgentRole::Assistant).with_parent("manager");
    flow.agents.extend([user, manager, coder, reviewer]);

    let mut kickoff = Chat::new("kickoff", "user", "manager");
    kickoff.role = ChatRole::ToManager;
    kickoff.message = InitialMessage::literal("Write a parser");
    kickoff.summary.method = SummaryMethod::ReflectionWithLlm;

    let mut review = Chat::new("review", "coder", "reviewer");
    review.role = ChatRole::Chat;
    review.order = 1;
    review.prerequisites.insert("kickoff".into());
    review.condition = Some(HandoffCondition::StringContext {
        variable_name: "ready".into(),
    });
    review.available = Some(Availability::Variable("ready".into()));
    flow.chats.extend([kickoff, review]);

    flow.models.push(Model {
        id: "model".into(),
        name: "local".into(),
        api_type: "ollama".into(),
        base_url: Some("http://localhost:11434".into()),
        api_key: Some("ollama-key".into()),
        extras: Passthrough::new(),
        view: Passthrough::new(),
    });
    flow.tools.push(Tool {
        id: "shell".into(),
        name: "shell".into(),
        tool_type: "shared".into(),
        content: "def shell(cmd): ...".into(),
        secrets: Default::default(),
        extras: Passthrough::new(),
        view: Passthrough::new(),
    });
    flow
}

/// Runtime events in arrival order for a short successful run that asks the
/// user twice.
pub fn event_script() -> Vec<Value> {
    vec![
        json!({"type": "message", "seq": 1, "sender": "user", "recipient": "manager", "role": "user",
            "content": "Research Rust async runtimes", "timestamp": "2025-03-14T09:27:00Z"}),
        json!({"type": "cost", "seq": 2, "cumulativeCost": 0.002, "promptTokens": 120, "completionTokens": 40, "model": "gpt-4o"}),
        json!({"type": "input_request", "seq": 3, "requestId": "req-1", "prompt": "Continue?", "password": false}),
        json!({"type": "input_request", "seq": 4, "requestId": "req-2", "prompt": "Include benchmarks?", "password": false}),
        json!({"type": "message", "seq": 5, "sender": "researcher", "recipient": "writer", "role": "assistant",
            "content": [{"type": "text", "text": "tokio and smol"}, {"type": "image_url", "url": "https://example.com/chart.png"}],
            "timestamp": "2025-03-14T09:27:05Z"}),
        json!({"type": "cost", "seq": 6, "cumulativeCost": 0.001, "promptTokens": 1, "completionTokens": 1}),
        json!({"type": "cost", "seq": 7, "cumulativeCost": 0.005, "promptTokens": 300, "completionTokens": 90, "model": "gpt-4o"}),
        json!({"type": "message", "seq": 8, "sender": "writer", "recipient": "user", "role": "termination",
            "content": "DONE", "timestamp": "2025-03-14T09:27:09Z"}),
        json!({"type": "message", "seq": 9, "sender": "writer", "recipient": "user", "role": "assistant",
            "content": "late"}),
    ]
}

/// [`event_script`] as newline-delimited JSON, with a blank line mixed in.
pub fn event_lines() -> String {
    let mut out = String::new();
    for (i, event) in event_script().iter().enumerate() {
        if i == 2 {
            out.push('\n');
        }
        out.push_str(&event.to_string());
        out.push('\n');
    }
    out
}
