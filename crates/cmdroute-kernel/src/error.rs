//! Error types for tree construction and routing.
//!
//! Construction errors are fatal and surface during startup. Routing errors
//! are per-invocation and get folded into a `DispatchOutcome` by the
//! dispatcher.

/// Errors raised while assembling or publishing command trees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// A sibling (or a registered root) already uses this id.
    #[error("duplicate command id `{id}` under {scope}")]
    DuplicateCommandId { id: String, scope: String },

    /// The node already has a parent (or is a registered root).
    #[error("command `{id}` is already attached to `{parent}`")]
    AlreadyAttached { id: String, parent: String },

    /// The tree violates a structural invariant.
    #[error("invalid tree shape: {0}")]
    InvalidTreeShape(String),

    /// A `NodeId` that this builder never handed out.
    #[error("unknown node handle #{0}")]
    UnknownNode(usize),

    /// A node id contains the reserved merge separator.
    #[error("command id `{id}` contains the reserved separator `{separator}`")]
    ReservedSeparator { id: String, separator: String },

    /// A node id or parameter name is not accepted by the registration protocol.
    #[error("invalid name `{name}`: {reason}")]
    InvalidName { name: String, reason: String },

    /// A parameter's declared rules are inconsistent.
    #[error("invalid parameter `{parameter}` on `{leaf}`: {reason}")]
    InvalidParameter {
        leaf: String,
        parameter: String,
        reason: String,
    },
}

/// Errors raised while resolving a caller path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// No root is registered under the first path token.
    #[error("`{name}` is not a command")]
    UnknownCommand { name: String },

    /// The path stops at a group or names a child that does not exist.
    #[error("`{path}` is not a valid command")]
    CommandNotFound { path: String },
}

impl RouteError {
    /// Stable failure class label.
    pub fn failure_class(&self) -> &'static str {
        match self {
            Self::UnknownCommand { .. } => "unknown_command",
            Self::CommandNotFound { .. } => "command_not_found",
        }
    }
}
