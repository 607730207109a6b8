//! Command nodes and the execution contract.
//!
//! Nodes live in the registry's arena and refer to each other by `NodeId`.
//! A group owns its children through the id map; the parent link is a plain
//! handle used only to rebuild reference strings.

use crate::context::InvocationContext;
use crate::param::{Arguments, Parameter};
use crate::predicate::UseCase;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;

/// Handle to a node inside one `RegistryBuilder` / `Registry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A domain failure whose display message is safe to show the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{internal_message}")]
pub struct HandleableError {
    pub internal_message: String,
    pub display_message: Option<String>,
}

impl HandleableError {
    pub fn new(internal_message: impl Into<String>) -> Self {
        Self {
            internal_message: internal_message.into(),
            display_message: None,
        }
    }

    pub fn with_display(mut self, display_message: impl Into<String>) -> Self {
        self.display_message = Some(display_message.into());
        self
    }

    /// Falls back to the internal message when no display text was set.
    pub fn display_message(&self) -> &str {
        self.display_message
            .as_deref()
            .unwrap_or(&self.internal_message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Handleable(#[from] HandleableError),

    /// Anything else. Only `label` ever reaches the caller.
    #[error("{label}: {source}")]
    Unexpected {
        label: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ExecutionError {
    pub fn unexpected(
        label: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Unexpected {
            label: label.into(),
            source: source.into(),
        }
    }
}

/// A leaf's bound callable.
#[async_trait]
pub trait Execute: Send + Sync {
    async fn execute(&self, ctx: &InvocationContext, args: &Arguments)
    -> Result<(), ExecutionError>;
}

/// Adapts a synchronous closure into an `Execute`.
pub struct ExecuteFn<F>(pub F);

#[async_trait]
impl<F> Execute for ExecuteFn<F>
where
    F: Fn(&InvocationContext, &Arguments) -> Result<(), ExecutionError> + Send + Sync,
{
    async fn execute(
        &self,
        ctx: &InvocationContext,
        args: &Arguments,
    ) -> Result<(), ExecutionError> {
        (self.0)(ctx, args)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GroupNode {
    pub(crate) children: IndexMap<String, NodeId>,
}

impl GroupNode {
    pub fn child(&self, id: &str) -> Option<NodeId> {
        self.children.get(id).copied()
    }

    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.values().copied()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Clone)]
pub struct LeafNode {
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) executor: Arc<dyn Execute>,
}

impl std::fmt::Debug for LeafNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeafNode")
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl LeafNode {
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn executor(&self) -> Arc<dyn Execute> {
        Arc::clone(&self.executor)
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Group(GroupNode),
    Leaf(LeafNode),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: String,
    pub(crate) description: String,
    pub(crate) permissions: Vec<Arc<UseCase>>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Predicates attached directly to this node.
    pub fn permissions(&self) -> &[Arc<UseCase>] {
        &self.permissions
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn as_group(&self) -> Option<&GroupNode> {
        match &self.kind {
            NodeKind::Group(group) => Some(group),
            NodeKind::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafNode> {
        match &self.kind {
            NodeKind::Leaf(leaf) => Some(leaf),
            NodeKind::Group(_) => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.as_leaf().is_some()
    }

    /// `"group"` or `"leaf"`.
    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            NodeKind::Group(_) => "group",
            NodeKind::Leaf(_) => "leaf",
        }
    }
}

/// Group definition handed to `RegistryBuilder::add_group`.
#[derive(Debug, Clone)]
pub struct GroupDef {
    pub(crate) id: String,
    pub(crate) description: String,
    pub(crate) permissions: Vec<Arc<UseCase>>,
}

impl GroupDef {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            permissions: Vec::new(),
        }
    }

    pub fn permission(mut self, use_case: Arc<UseCase>) -> Self {
        self.permissions.push(use_case);
        self
    }
}

/// Leaf definition handed to `RegistryBuilder::add_leaf`.
pub struct LeafDef {
    pub(crate) id: String,
    pub(crate) description: String,
    pub(crate) permissions: Vec<Arc<UseCase>>,
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) executor: Arc<dyn Execute>,
}

impl LeafDef {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        executor: impl Execute + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            permissions: Vec::new(),
            parameters: Vec::new(),
            executor: Arc::new(executor),
        }
    }

    pub fn from_fn<F>(id: impl Into<String>, description: impl Into<String>, execute: F) -> Self
    where
        F: Fn(&InvocationContext, &Arguments) -> Result<(), ExecutionError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(id, description, ExecuteFn(execute))
    }

    pub fn permission(mut self, use_case: Arc<UseCase>) -> Self {
        self.permissions.push(use_case);
        self
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handleable_display_falls_back_to_internal_message() {
        let plain = HandleableError::new("guild 5 has no prefix");
        assert_eq!(plain.display_message(), "guild 5 has no prefix");

        let shown = plain.with_display("This server has no prefix yet.");
        assert_eq!(shown.display_message(), "This server has no prefix yet.");
        assert_eq!(shown.to_string(), "guild 5 has no prefix");
    }

    #[test]
    fn unexpected_errors_keep_their_label() {
        let err = ExecutionError::unexpected("io", "disk full");
        assert!(matches!(&err, ExecutionError::Unexpected { label, .. } if label == "io"));
        assert_eq!(err.to_string(), "io: disk full");
    }
}
