use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentGraphError {
    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Model errors
    #[error("Chat {chat_id} references unknown agent {agent_id}")]
    DanglingChat { chat_id: String, agent_id: String },

    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AgentGraphError>;
