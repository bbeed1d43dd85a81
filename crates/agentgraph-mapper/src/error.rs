use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapperError {
    /// Input that cannot be read as a flow at all.
    #[error("Fatal input: {0}")]
    FatalInput(String),
}

pub type Result<T> = std::result::Result<T, MapperError>;
