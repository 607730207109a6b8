//! Command registry: startup-phase builder and frozen lookup.
//!
//! `RegistryBuilder` owns every node in an arena. Trees are assembled by
//! attaching children to groups and publishing roots; `freeze` validates the
//! whole forest and yields an immutable `Registry` that the dispatcher can
//! share across tasks without locking.

use crate::config::EngineConfig;
use crate::error::{RouteError, TreeError};
use crate::node::{GroupDef, GroupNode, LeafDef, LeafNode, Node, NodeId, NodeKind};
use crate::router::{self, Resolution};
use indexmap::IndexMap;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// A named bundle of command trees, installed as one unit.
pub trait CommandModule {
    fn id(&self) -> &str;

    /// Build this module's trees and return the nodes to publish as roots.
    fn build(&self, builder: &mut RegistryBuilder) -> Result<Vec<NodeId>, TreeError>;
}

fn protocol_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-_\p{Ll}\p{N}]{1,32}$").expect("name regex should compile"))
}

#[derive(Debug)]
pub struct RegistryBuilder {
    config: EngineConfig,
    nodes: Vec<Node>,
    roots: IndexMap<String, NodeId>,
    modules: IndexMap<String, String>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl RegistryBuilder {
    /// `config` is expected to be validated already.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            roots: IndexMap::new(),
            modules: IndexMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn add_group(&mut self, def: GroupDef) -> NodeId {
        self.push(Node {
            id: def.id,
            description: def.description,
            permissions: def.permissions,
            parent: None,
            kind: NodeKind::Group(GroupNode::default()),
        })
    }

    pub fn add_leaf(&mut self, def: LeafDef) -> NodeId {
        self.push(Node {
            id: def.id,
            description: def.description,
            permissions: def.permissions,
            parent: None,
            kind: NodeKind::Leaf(LeafNode {
                parameters: def.parameters,
                executor: def.executor,
            }),
        })
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn checked(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.node(id).ok_or(TreeError::UnknownNode(id.0))
    }

    fn is_root(&self, id: NodeId) -> bool {
        self.roots.values().any(|root| *root == id)
    }

    /// Attach `child` under the group `parent`. The parent link is set once.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let parent_node = self.checked(parent)?;
        let child_node = self.checked(child)?;

        let NodeKind::Group(group) = &parent_node.kind else {
            return Err(TreeError::InvalidTreeShape(format!(
                "`{}` is a leaf and cannot hold children",
                parent_node.id
            )));
        };
        if let Some(existing) = child_node.parent {
            return Err(TreeError::AlreadyAttached {
                id: child_node.id.clone(),
                parent: self.nodes[existing.0].id.clone(),
            });
        }
        if self.is_root(child) {
            return Err(TreeError::InvalidTreeShape(format!(
                "`{}` is a registered root and cannot be attached",
                child_node.id
            )));
        }
        if self.ancestors(parent).any(|ancestor| ancestor == child) {
            return Err(TreeError::InvalidTreeShape(format!(
                "attaching `{}` under `{}` would form a cycle",
                child_node.id, parent_node.id
            )));
        }
        if group.children.contains_key(&child_node.id) {
            return Err(TreeError::DuplicateCommandId {
                id: child_node.id.clone(),
                scope: format!("group `{}`", parent_node.id),
            });
        }

        let key = child_node.id.clone();
        if let NodeKind::Group(group) = &mut self.nodes[parent.0].kind {
            group.children.insert(key, child);
        }
        self.nodes[child.0].parent = Some(parent);
        Ok(())
    }

    /// `id` itself first, then each parent up to the top.
    fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), |current| {
            self.nodes.get(current.0).and_then(|node| node.parent)
        })
    }

    pub fn add_child_group(&mut self, parent: NodeId, def: GroupDef) -> Result<NodeId, TreeError> {
        let child = self.add_group(def);
        self.add_child(parent, child)?;
        Ok(child)
    }

    pub fn add_child_leaf(&mut self, parent: NodeId, def: LeafDef) -> Result<NodeId, TreeError> {
        let child = self.add_leaf(def);
        self.add_child(parent, child)?;
        Ok(child)
    }

    /// Publish a parentless node as a top-level command.
    pub fn register_root(&mut self, node: NodeId) -> Result<(), TreeError> {
        let root = self.checked(node)?;
        if let Some(parent) = root.parent {
            return Err(TreeError::InvalidTreeShape(format!(
                "`{}` is attached under `{}` and cannot be a root",
                root.id, self.nodes[parent.0].id
            )));
        }
        if self.roots.contains_key(&root.id) {
            return Err(TreeError::DuplicateCommandId {
                id: root.id.clone(),
                scope: "the registry".to_string(),
            });
        }
        let name = root.id.clone();
        debug!(root = %name, "registered root command");
        self.roots.insert(name, node);
        Ok(())
    }

    pub fn lookup_root(&self, id: &str) -> Option<NodeId> {
        self.roots.get(id).copied()
    }

    /// Build a module and register every root it returns.
    pub fn install(&mut self, module: &dyn CommandModule) -> Result<(), TreeError> {
        let roots = module.build(self)?;
        for root in roots {
            self.register_root(root)?;
            let name = self.nodes[root.0].id.clone();
            self.modules.insert(name, module.id().to_string());
        }
        debug!(module = module.id(), "installed command module");
        Ok(())
    }

    /// Validate every published tree and stop accepting mutation.
    pub fn freeze(self) -> Result<Registry, TreeError> {
        for (index, node) in self.nodes.iter().enumerate() {
            let id = NodeId(index);
            let attached = self.ancestors(id).any(|ancestor| self.is_root(ancestor));
            if !attached {
                warn!(node = %node.id, "node is not reachable from any root; ignoring");
                continue;
            }
            self.check_node(node)?;
        }
        debug!(roots = self.roots.len(), nodes = self.nodes.len(), "registry frozen");
        Ok(Registry {
            config: self.config,
            nodes: self.nodes,
            roots: self.roots,
            modules: self.modules,
        })
    }

    fn check_name(&self, name: &str) -> Result<(), TreeError> {
        if name.is_empty() {
            return Err(TreeError::InvalidName {
                name: name.to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.config.enforce_protocol_names && !protocol_name_re().is_match(name) {
            return Err(TreeError::InvalidName {
                name: name.to_string(),
                reason: "must be 1-32 lowercase letters, digits, `-` or `_`".to_string(),
            });
        }
        Ok(())
    }

    fn check_description(&self, name: &str, description: &str) -> Result<(), TreeError> {
        let length = description.chars().count();
        if length == 0 || length > self.config.description_limit {
            return Err(TreeError::InvalidName {
                name: name.to_string(),
                reason: format!(
                    "description must be 1-{} characters, got {length}",
                    self.config.description_limit
                ),
            });
        }
        Ok(())
    }

    fn check_node(&self, node: &Node) -> Result<(), TreeError> {
        if node.id.contains(self.config.separator.as_str()) {
            return Err(TreeError::ReservedSeparator {
                id: node.id.clone(),
                separator: self.config.separator.clone(),
            });
        }
        self.check_name(&node.id)?;
        self.check_description(&node.id, &node.description)?;

        match &node.kind {
            NodeKind::Group(group) if group.is_empty() => Err(TreeError::InvalidTreeShape(
                format!("group `{}` has no children", node.id),
            )),
            NodeKind::Group(_) => Ok(()),
            NodeKind::Leaf(leaf) => self.check_parameters(node, leaf),
        }
    }

    fn check_parameters(&self, node: &Node, leaf: &LeafNode) -> Result<(), TreeError> {
        let invalid = |parameter: &str, reason: String| TreeError::InvalidParameter {
            leaf: node.id.clone(),
            parameter: parameter.to_string(),
            reason,
        };

        let mut seen = BTreeSet::new();
        let mut optional_seen = false;
        for parameter in &leaf.parameters {
            let name = parameter.name();
            if !seen.insert(name) {
                return Err(invalid(name, "declared more than once".to_string()));
            }
            self.check_name(name)
                .and_then(|()| self.check_description(name, parameter.description()))
                .map_err(|err| invalid(name, err.to_string()))?;
            parameter
                .check_rules()
                .map_err(|reason| invalid(name, reason))?;
            if parameter.is_required() && optional_seen {
                return Err(invalid(
                    name,
                    "required parameters must precede optional ones".to_string(),
                ));
            }
            optional_seen |= !parameter.is_required();
        }
        Ok(())
    }
}

/// Frozen command forest. Read-only for the rest of the process.
#[derive(Debug)]
pub struct Registry {
    config: EngineConfig,
    nodes: Vec<Node>,
    roots: IndexMap<String, NodeId>,
    modules: IndexMap<String, String>,
}

impl Registry {
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn separator(&self) -> &str {
        &self.config.separator
    }

    pub fn lookup_root(&self, id: &str) -> Option<NodeId> {
        self.roots.get(id).copied()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Like `node`, for public entry points that take a caller's handle.
    pub fn checked(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.node(id).ok_or(TreeError::UnknownNode(id.0))
    }

    /// Only for handles already checked or reached through parent/child links.
    pub(crate) fn at(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Root ids and handles, in registration order.
    pub fn roots(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.roots.iter().map(|(id, node)| (id.as_str(), *node))
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Id of the module that installed this root, if any.
    pub fn module_of(&self, root: &str) -> Option<&str> {
        self.modules.get(root).map(String::as_str)
    }

    /// Node ids from the root down to `node`, following parent links.
    ///
    /// Empty for a handle this registry never issued.
    pub fn path_of(&self, node: NodeId) -> Vec<&str> {
        let mut path: Vec<&str> = std::iter::successors(self.node(node), |current| {
            current.parent.map(|parent| self.at(parent))
        })
        .map(Node::id)
        .collect();
        path.reverse();
        path
    }

    /// Caller-facing invocation string, e.g. `/a b_c d`.
    ///
    /// Paths deeper than the protocol allows use the same collapse as export.
    pub fn reference(&self, node: NodeId) -> Result<String, TreeError> {
        self.checked(node)?;
        Ok(self.reference_of(node))
    }

    pub(crate) fn reference_of(&self, node: NodeId) -> String {
        let path = self.path_of(node);
        let tokens = router::collapse_tokens(&path, self.separator());
        format!("/{}", tokens.join(" "))
    }

    /// Indented outline of one tree, as logged before deployment.
    pub fn deploy_display(&self, root: NodeId) -> Result<String, TreeError> {
        self.checked(root)?;
        let mut lines = Vec::new();
        self.outline(root, 0, &mut lines);
        Ok(lines.join("\n"))
    }

    fn outline(&self, id: NodeId, depth: usize, lines: &mut Vec<String>) {
        let node = self.at(id);
        lines.push(format!("{}- {}", "  ".repeat(depth), node.id));
        if let NodeKind::Group(group) = &node.kind {
            for child in group.children() {
                self.outline(child, depth + 1, lines);
            }
        }
    }

    /// Resolve a full caller path, first token naming the root.
    pub fn route<S: AsRef<str>>(&self, path: &[S]) -> Result<Resolution, RouteError> {
        router::route(self, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::{NumericRules, Parameter};
    use crate::predicate::guild_only;

    fn noop(id: &str) -> LeafDef {
        LeafDef::from_fn(id, format!("Run {id}"), |_, _| Ok(()))
    }

    #[test]
    fn lookup_returns_the_registered_root() {
        let mut builder = RegistryBuilder::default();
        let config = builder.add_group(GroupDef::new("config", "Configure"));
        builder.add_child_leaf(config, noop("set")).unwrap();
        builder.register_root(config).unwrap();
        assert_eq!(builder.lookup_root("config"), Some(config));

        let registry = builder.freeze().unwrap();
        assert_eq!(registry.lookup_root("config"), Some(config));
        assert_eq!(registry.lookup_root("missing"), None);
    }

    #[test]
    fn duplicate_roots_are_rejected() {
        let mut builder = RegistryBuilder::default();
        let first = builder.add_leaf(noop("ping"));
        let second = builder.add_leaf(noop("ping"));
        builder.register_root(first).unwrap();
        assert!(matches!(
            builder.register_root(second),
            Err(TreeError::DuplicateCommandId { id, .. }) if id == "ping"
        ));
        assert_eq!(builder.lookup_root("ping"), Some(first));
    }

    #[test]
    fn attach_rules_fail_fast() {
        let mut builder = RegistryBuilder::default();
        let a = builder.add_group(GroupDef::new("a", "A"));
        let b = builder.add_group(GroupDef::new("b", "B"));
        let leaf = builder.add_leaf(noop("x"));
        let twin = builder.add_leaf(noop("x"));

        builder.add_child(a, leaf).unwrap();
        assert!(matches!(
            builder.add_child(b, leaf),
            Err(TreeError::AlreadyAttached { id, parent }) if id == "x" && parent == "a"
        ));
        assert!(matches!(
            builder.add_child(a, twin),
            Err(TreeError::DuplicateCommandId { .. })
        ));
        assert!(matches!(
            builder.add_child(leaf, b),
            Err(TreeError::InvalidTreeShape(_))
        ));

        builder.add_child(a, b).unwrap();
        assert!(matches!(
            builder.add_child(b, a),
            Err(TreeError::InvalidTreeShape(message)) if message.contains("cycle")
        ));
        assert!(matches!(
            builder.add_child(a, NodeId(99)),
            Err(TreeError::UnknownNode(99))
        ));
        assert!(matches!(
            builder.register_root(b),
            Err(TreeError::InvalidTreeShape(_))
        ));
    }

    #[test]
    fn freeze_rejects_empty_groups_and_reserved_separator() {
        let mut builder = RegistryBuilder::default();
        let empty = builder.add_group(GroupDef::new("empty", "Nothing here"));
        builder.register_root(empty).unwrap();
        assert!(matches!(builder.freeze(), Err(TreeError::InvalidTreeShape(_))));

        let mut builder = RegistryBuilder::default();
        let bad = builder.add_leaf(noop("set_all"));
        builder.register_root(bad).unwrap();
        assert!(matches!(
            builder.freeze(),
            Err(TreeError::ReservedSeparator { id, .. }) if id == "set_all"
        ));
    }

    #[test]
    fn freeze_checks_names_and_parameters() {
        let mut builder = RegistryBuilder::default();
        let upper = builder.add_leaf(noop("Ping"));
        builder.register_root(upper).unwrap();
        assert!(matches!(builder.freeze(), Err(TreeError::InvalidName { .. })));

        let relaxed = EngineConfig {
            enforce_protocol_names: false,
            ..EngineConfig::default()
        };
        let mut builder = RegistryBuilder::new(relaxed);
        let upper = builder.add_leaf(noop("Ping"));
        builder.register_root(upper).unwrap();
        assert!(builder.freeze().is_ok());

        let mut builder = RegistryBuilder::default();
        let leaf = builder.add_leaf(
            noop("set")
                .parameter(Parameter::integer("n", "n", NumericRules::new()))
                .parameter(Parameter::integer("m", "m", NumericRules::new()).required()),
        );
        builder.register_root(leaf).unwrap();
        assert!(matches!(
            builder.freeze(),
            Err(TreeError::InvalidParameter { parameter, .. }) if parameter == "m"
        ));
    }

    #[test]
    fn detached_nodes_do_not_block_freeze() {
        let mut builder = RegistryBuilder::default();
        let root = builder.add_leaf(noop("ping"));
        builder.add_group(GroupDef::new("orphan", "Never attached"));
        builder.register_root(root).unwrap();
        let registry = builder.freeze().unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn reference_and_outline_follow_parent_links() {
        let mut builder = RegistryBuilder::default();
        let a = builder.add_group(GroupDef::new("a", "A").permission(guild_only()));
        let b = builder.add_child_group(a, GroupDef::new("b", "B")).unwrap();
        let c = builder.add_child_group(b, GroupDef::new("c", "C")).unwrap();
        let d = builder.add_child_leaf(c, noop("d")).unwrap();
        let e = builder.add_child_leaf(a, noop("e")).unwrap();
        builder.register_root(a).unwrap();
        let registry = builder.freeze().unwrap();

        assert_eq!(registry.path_of(d), vec!["a", "b", "c", "d"]);
        assert_eq!(registry.reference(d).unwrap(), "/a b_c d");
        assert_eq!(registry.reference(e).unwrap(), "/a e");
        assert_eq!(
            registry.deploy_display(a).unwrap(),
            "- a\n  - b\n    - c\n      - d\n  - e"
        );
    }

    #[test]
    fn handles_from_another_registry_are_refused() {
        let mut big = RegistryBuilder::default();
        let group = big.add_group(GroupDef::new("a", "A"));
        let leaf = big.add_child_leaf(group, noop("b")).unwrap();
        big.register_root(group).unwrap();
        let _big = big.freeze().unwrap();

        let mut small = RegistryBuilder::default();
        let ping = small.add_leaf(noop("ping"));
        small.register_root(ping).unwrap();
        let small = small.freeze().unwrap();

        assert!(small.node(leaf).is_none());
        assert_eq!(small.checked(leaf).unwrap_err(), TreeError::UnknownNode(1));
        assert_eq!(small.reference(leaf), Err(TreeError::UnknownNode(1)));
        assert_eq!(small.deploy_display(leaf), Err(TreeError::UnknownNode(1)));
        assert!(small.path_of(leaf).is_empty());
        assert_eq!(small.reference(ping).unwrap(), "/ping");
    }
}
