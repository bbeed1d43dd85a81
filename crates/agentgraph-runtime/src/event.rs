//! Inbound runtime events.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One event as delivered by the transport, with its optional sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    #[serde(flatten)]
    pub event: RuntimeEvent,
}

impl EventRecord {
    pub fn new(event: RuntimeEvent) -> Self {
        Self { seq: None, event }
    }

    pub fn with_seq(seq: u64, event: RuntimeEvent) -> Self {
        Self {
            seq: Some(seq),
            event,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }

    /// The agent the event belongs to, when the payload names one.
    pub fn agent(&self) -> Option<&str> {
        match &self.event {
            RuntimeEvent::Message(msg) => Some(msg.sender.as_str()),
            RuntimeEvent::Cost(point) => point.agent.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    Message(TimelineMessage),
    Cost(CostPoint),
    InputRequest(InputRequest),
    Error {
        message: String,
    },
    /// The runtime finished on its own.
    TerminalNotice {
        #[serde(default)]
        reason: Option<String>,
    },
}

impl RuntimeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Message(_) => EventKind::Message,
            Self::Cost(_) => EventKind::Cost,
            Self::InputRequest(_) => EventKind::InputRequest,
            Self::Error { .. } => EventKind::Error,
            Self::TerminalNotice { .. } => EventKind::TerminalNotice,
        }
    }
}

/// Event kind without payload, used for breakpoints and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Message,
    Cost,
    InputRequest,
    Error,
    TerminalNotice,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Cost => "cost",
            Self::InputRequest => "input_request",
            Self::Error => "error",
            Self::TerminalNotice => "terminal_notice",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().replace('-', "_").as_str() {
            "message" => Ok(Self::Message),
            "cost" => Ok(Self::Cost),
            "input_request" => Ok(Self::InputRequest),
            "error" => Ok(Self::Error),
            "terminal_notice" => Ok(Self::TerminalNotice),
            other => Err(format!("unknown event kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
    /// Explicit end-of-run marker.
    Termination,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Tool => "tool",
            Self::Termination => "termination",
        };
        f.write_str(s)
    }
}

/// A chat message on the session timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    pub role: MessageRole,
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl TimelineMessage {
    pub fn text(sender: impl Into<String>, role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            id: None,
            sender: sender.into(),
            recipient: None,
            role,
            content: MessageContent::Text(text.into()),
            timestamp: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// All text in the message, parts joined by newlines.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(t) => t.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { url: String },
    AudioUrl { url: String },
    VideoUrl { url: String },
    File {
        #[serde(default)]
        name: Option<String>,
        url: String,
    },
}

/// One point of the cost ledger. `cumulative_cost` never decreases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostPoint {
    pub cumulative_cost: f64,
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl CostPoint {
    pub fn new(cumulative_cost: f64) -> Self {
        Self {
            cumulative_cost,
            prompt_tokens: 0,
            completion_tokens: 0,
            model: None,
            agent: None,
        }
    }
}

/// A pending prompt for human input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputRequest {
    pub request_id: String,
    #[serde(default)]
    pub prompt: String,
    /// Input should be masked.
    #[serde(default)]
    pub password: bool,
}

impl InputRequest {
    pub fn new(request_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            prompt: prompt.into(),
            password: false,
        }
    }
}

/// A local user's answer to an [`InputRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputResponse {
    pub request_id: String,
    pub text: String,
}

impl InputResponse {
    pub fn new(request_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            text: text.into(),
        }
    }
}
