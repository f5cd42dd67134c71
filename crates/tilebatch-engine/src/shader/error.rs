use super::Stage;

/// Errors produced while building or using a tile-batch program.
///
/// Every variant is fatal for the call that produced it. The shader never
/// retries and never substitutes a fallback program.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShaderError {
    #[error("{stage} stage failed to compile:\n{message}")]
    Compile { stage: Stage, message: String },

    #[error("program failed to link: {0}")]
    Link(String),

    #[error("required binding `{name}` not found in the linked program")]
    MissingBinding { name: &'static str },

    #[error("shader has no GPU context")]
    ContextMissing,

    #[error("GPU context was lost")]
    ContextLost,

    #[error("shader program used before a successful init")]
    NotInitialized,

    #[error("shader program used after destroy")]
    Destroyed,

    #[error("invalid draw: {0}")]
    InvalidDraw(String),
}
