//! Domain model: agents, chats, models, tools and the flow that owns them.
//!
//! Agents form a forest through `parent_id`, stored as a plain lookup key
//! into the flow's agent arena. Chats reference agents by id only.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AgentGraphError, Result};
use crate::secret;
use crate::types::*;

/// Opaque key/value bag carried through import and export untouched.
pub type Passthrough = Map<String, Value>;

/// A tool attached to an agent, and the agent that executes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolBinding {
    pub id: String,
    pub executor_id: String,
    #[serde(flatten)]
    pub extras: Passthrough,
}

impl ToolBinding {
    pub fn new(id: impl Into<String>, executor_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            executor_id: executor_id.into(),
            extras: Passthrough::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminationPolicy {
    #[serde(rename = "type")]
    pub kind: TerminationKind,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub criterion: Option<TerminationCriterion>,
    #[serde(default)]
    pub method_content: Option<String>,
    #[serde(flatten)]
    pub extras: Passthrough,
}

/// Behavioural configuration of an agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub human_input_mode: HumanInputMode,
    pub system_message: Option<String>,
    pub model_ids: Vec<String>,
    pub tools: Vec<ToolBinding>,
    pub termination: TerminationPolicy,
    pub max_consecutive_auto_reply: Option<u32>,
    pub default_auto_reply: Option<String>,
    /// Hand-off chat ids in evaluation order.
    pub handoffs: Vec<String>,
}

impl AgentConfig {
    pub fn for_role(role: AgentRole) -> Self {
        Self {
            human_input_mode: role.default_human_input_mode(),
            system_message: None,
            model_ids: Vec::new(),
            tools: Vec::new(),
            termination: TerminationPolicy::default(),
            max_consecutive_auto_reply: None,
            default_auto_reply: None,
            handoffs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub description: String,
    pub role: AgentRole,
    /// Owning group coordinator, if any.
    pub parent_id: Option<String>,
    pub config: AgentConfig,
    /// Unknown data fields.
    pub extras: Passthrough,
    /// Node-level visual fields (position, size, selection).
    pub view: Passthrough,
}

impl Agent {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: AgentRole) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            role,
            parent_id: None,
            config: AgentConfig::for_role(role),
            extras: Passthrough::new(),
            view: Passthrough::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MessageBody {
    #[default]
    None,
    Literal(String),
    Template(String),
    /// Source of a function that produces the message.
    Method(String),
}

impl MessageBody {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::None => MessageKind::None,
            Self::Literal(_) => MessageKind::String,
            Self::Template(_) => MessageKind::Template,
            Self::Method(_) => MessageKind::Method,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Literal(s) | Self::Template(s) | Self::Method(s) => Some(s),
        }
    }
}

/// The message that opens a chat.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitialMessage {
    pub body: MessageBody,
    pub use_carryover: bool,
    /// Values available to templates and methods.
    pub context: Passthrough,
    /// Unknown message fields.
    pub extras: Passthrough,
}

impl InitialMessage {
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            body: MessageBody::Literal(text.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryPolicy {
    pub method: SummaryMethod,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub args: Passthrough,
    #[serde(flatten)]
    pub extras: Passthrough,
}

/// A configured interaction between two agents; the domain side of a graph edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Chat {
    pub id: String,
    pub source_agent_id: String,
    pub target_agent_id: String,
    /// Derived from the endpoints; never read back from stored data.
    pub role: ChatRole,
    pub name: String,
    pub description: String,
    /// Execution order among chats sharing a source.
    pub order: i64,
    pub prerequisites: BTreeSet<String>,
    pub clear_history: bool,
    pub message: InitialMessage,
    pub summary: SummaryPolicy,
    pub max_turns: Option<u32>,
    pub condition: Option<HandoffCondition>,
    pub available: Option<Availability>,
    pub extras: Passthrough,
    /// Edge-level visual fields (handles, style, animation).
    pub view: Passthrough,
}

impl Chat {
    pub fn new(
        id: impl Into<String>,
        source_agent_id: impl Into<String>,
        target_agent_id: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            source_agent_id: source_agent_id.into(),
            target_agent_id: target_agent_id.into(),
            role: ChatRole::default(),
            description: String::new(),
            order: 0,
            prerequisites: BTreeSet::new(),
            clear_history: false,
            message: InitialMessage::default(),
            summary: SummaryPolicy::default(),
            max_turns: None,
            condition: None,
            available: None,
            extras: Passthrough::new(),
            view: Passthrough::new(),
        }
    }

    pub fn touches(&self, agent_id: &str) -> bool {
        self.source_agent_id == agent_id || self.target_agent_id == agent_id
    }
}

/// An LLM configuration referenced by agents.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub id: String,
    pub name: String,
    pub api_type: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub extras: Passthrough,
    pub view: Passthrough,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    pub id: String,
    pub name: String,
    pub tool_type: String,
    pub content: String,
    pub secrets: BTreeMap<String, String>,
    pub extras: Passthrough,
    pub view: Passthrough,
}

/// The complete authored workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub requirements: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub agents: Vec<Agent>,
    pub chats: Vec<Chat>,
    pub models: Vec<Model>,
    pub tools: Vec<Tool>,
    /// Notes and node kinds the core does not interpret.
    pub other_nodes: Vec<Value>,
    pub extras: Passthrough,
}

/// What [`Flow::remove_agent`] took out of the flow.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedAgent {
    pub agent: Agent,
    pub chats: Vec<Chat>,
    /// Agents whose `parent_id` was cleared.
    pub orphaned: Vec<String>,
}

impl Flow {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
            requirements: Vec::new(),
            created_at: now,
            updated_at: now,
            agents: Vec::new(),
            chats: Vec::new(),
            models: Vec::new(),
            tools: Vec::new(),
            other_nodes: Vec::new(),
            extras: Passthrough::new(),
        }
    }

    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn chat(&self, id: &str) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == id)
    }

    /// Id-keyed view over the agent arena.
    pub fn agent_index(&self) -> HashMap<&str, &Agent> {
        self.agents.iter().map(|a| (a.id.as_str(), a)).collect()
    }

    /// Agents whose `parent_id` is `parent`.
    pub fn members_of<'a>(&'a self, parent: &'a str) -> impl Iterator<Item = &'a Agent> + 'a {
        self.agents
            .iter()
            .filter(move |a| a.parent_id.as_deref() == Some(parent))
    }

    pub fn add_agent(&mut self, agent: Agent) -> Result<()> {
        if self.agent(&agent.id).is_some() {
            return Err(AgentGraphError::DuplicateId(agent.id));
        }
        self.agents.push(agent);
        Ok(())
    }

    /// Add a chat; both endpoints must already be live agents.
    pub fn add_chat(&mut self, chat: Chat) -> Result<()> {
        if self.chat(&chat.id).is_some() {
            return Err(AgentGraphError::DuplicateId(chat.id));
        }
        for endpoint in [&chat.source_agent_id, &chat.target_agent_id] {
            if self.agent(endpoint).is_none() {
                return Err(AgentGraphError::DanglingChat {
                    chat_id: chat.id.clone(),
                    agent_id: endpoint.clone(),
                });
            }
        }
        self.chats.push(chat);
        Ok(())
    }

    /// Remove an agent and cascade-delete every chat touching it.
    pub fn remove_agent(&mut self, id: &str) -> Option<RemovedAgent> {
        let pos = self.agents.iter().position(|a| a.id == id)?;
        let agent = self.agents.remove(pos);

        let chat_ids: Vec<String> = self
            .chats
            .iter()
            .filter(|c| c.touches(id))
            .map(|c| c.id.clone())
            .collect();
        let chats = chat_ids.iter().filter_map(|cid| self.remove_chat(cid)).collect();

        let mut orphaned = Vec::new();
        for member in self.agents.iter_mut() {
            if member.parent_id.as_deref() == Some(id) {
                member.parent_id = None;
                orphaned.push(member.id.clone());
            }
        }

        Some(RemovedAgent {
            agent,
            chats,
            orphaned,
        })
    }

    /// Remove a chat and every reference to it.
    pub fn remove_chat(&mut self, id: &str) -> Option<Chat> {
        let pos = self.chats.iter().position(|c| c.id == id)?;
        let chat = self.chats.remove(pos);
        for other in self.chats.iter_mut() {
            other.prerequisites.remove(id);
        }
        for agent in self.agents.iter_mut() {
            agent.config.handoffs.retain(|h| h != id);
        }
        Some(chat)
    }

    /// Replace redaction placeholders with the values held by `previous`.
    ///
    /// Entities are matched by id; anything without a counterpart keeps its
    /// placeholder.
    pub fn restore_secrets(&mut self, previous: &Flow) {
        for model in self.models.iter_mut() {
            let Some(prev) = previous.models.iter().find(|m| m.id == model.id) else {
                continue;
            };
            if model.api_key.as_deref().is_some_and(secret::is_placeholder) {
                model.api_key = prev.api_key.clone();
            }
            restore_bag(&mut model.extras, &prev.extras);
        }
        for tool in self.tools.iter_mut() {
            let Some(prev) = previous.tools.iter().find(|t| t.id == tool.id) else {
                continue;
            };
            for (key, value) in tool.secrets.iter_mut() {
                if secret::is_placeholder(value) {
                    if let Some(old) = prev.secrets.get(key) {
                        *value = old.clone();
                    }
                }
            }
            restore_bag(&mut tool.extras, &prev.extras);
        }
        for agent in self.agents.iter_mut() {
            if let Some(prev) = previous.agent(&agent.id) {
                restore_bag(&mut agent.extras, &prev.extras);
            }
        }
        for chat in self.chats.iter_mut() {
            if let Some(prev) = previous.chat(&chat.id) {
                restore_bag(&mut chat.extras, &prev.extras);
            }
        }
        restore_bag(&mut self.extras, &previous.extras);
    }
}

fn restore_bag(current: &mut Passthrough, previous: &Passthrough) {
    for (key, value) in current.iter_mut() {
        if let Some(old) = previous.get(key) {
            secret::restore_secrets(value, old);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Flow {
        let mut flow = Flow::new("f1", "sample");
        flow.add_agent(Agent::new("mgr", "manager", AgentRole::GroupManager)).unwrap();
        flow.add_agent(Agent::new("a", "alice", AgentRole::Assistant).with_parent("mgr")).unwrap();
        flow.add_agent(Agent::new("u", "user", AgentRole::UserProxy)).unwrap();
        flow.add_chat(Chat::new("c1", "u", "mgr")).unwrap();
        let mut c2 = Chat::new("c2", "u", "a");
        c2.prerequisites.insert("c1".into());
        flow.add_chat(c2).unwrap();
        flow.agents[0].config.handoffs.push("c1".into());
        flow
    }

    #[test]
    fn add_chat_rejects_dangling_endpoint() {
        let mut flow = sample();
        let err = flow.add_chat(Chat::new("c3", "u", "ghost")).unwrap_err();
        assert!(matches!(err, AgentGraphError::DanglingChat { ref agent_id, .. } if agent_id == "ghost"));
    }

    #[test]
    fn add_agent_rejects_duplicate() {
        let mut flow = sample();
        assert!(flow.add_agent(Agent::new("a", "again", AgentRole::Assistant)).is_err());
    }

    #[test]
    fn remove_agent_cascades() {
        let mut flow = sample();
        let removed = flow.remove_agent("mgr").unwrap();
        assert_eq!(removed.chats.len(), 1);
        assert_eq!(removed.chats[0].id, "c1");
        assert_eq!(removed.orphaned, vec!["a"]);
        assert!(flow.chat("c2").unwrap().prerequisites.is_empty());
        assert!(flow.agent("a").unwrap().parent_id.is_none());
    }

    #[test]
    fn remove_chat_strips_handoffs() {
        let mut flow = sample();
        flow.remove_chat("c1").unwrap();
        assert!(flow.agent("mgr").unwrap().config.handoffs.is_empty());
        assert!(flow.remove_chat("c1").is_none());
    }

    #[test]
    fn members_of_group() {
        let flow = sample();
        let members: Vec<_> = flow.members_of("mgr").map(|a| a.id.as_str()).collect();
        assert_eq!(members, vec!["a"]);
    }

    #[test]
    fn restore_secrets_from_previous() {
        let mut previous = sample();
        previous.models.push(Model {
            id: "m1".into(),
            name: "gpt".into(),
            api_type: "openai".into(),
            base_url: None,
            api_key: Some("sk-real".into()),
            extras: Passthrough::new(),
            view: Passthrough::new(),
        });
        let mut current = previous.clone();
        current.models[0].api_key = Some(secret::SECRET_PLACEHOLDER.into());
        current.restore_secrets(&previous);
        assert_eq!(current.models[0].api_key.as_deref(), Some("sk-real"));
    }
}
