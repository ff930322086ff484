//! Error types for the role layer.

/// Errors produced while parsing night actions sent by clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoleError {
    /// The night action name is not one the catalog knows.
    #[error("unknown night action: {0}")]
    UnknownAction(String),
}
