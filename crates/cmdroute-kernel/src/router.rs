//! Path resolution against a frozen registry.
//!
//! Caller tokens that carry the reserved separator are expanded back into
//! the multi-level path they were collapsed from at export time. The walk
//! then descends one token per group and stops at the first leaf; trailing
//! tokens past a leaf are ignored.

use crate::config::PROTOCOL_MAX_DEPTH;
use crate::error::RouteError;
use crate::node::{NodeId, NodeKind};
use crate::predicate::UseCase;
use crate::registry::Registry;
use std::sync::Arc;
use tracing::debug;

/// Target of a successful walk.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub leaf: NodeId,
    /// Every visited node's own predicates, leaf first, root last.
    pub chain: Vec<Arc<UseCase>>,
    /// Visited nodes, root first.
    pub walked: Vec<NodeId>,
    pub unconsumed: Vec<String>,
}

/// Split separator-joined tokens in place.
pub fn normalize_path<S: AsRef<str>>(path: &[S], separator: &str) -> Vec<String> {
    let mut tokens = Vec::with_capacity(path.len());
    for token in path {
        let token = token.as_ref();
        if !separator.is_empty() && token.contains(separator) {
            tokens.extend(token.split(separator).map(str::to_string));
        } else {
            tokens.push(token.to_string());
        }
    }
    tokens
}

/// Root, joined interior, last: the levels the protocol allows.
pub(crate) fn collapse_tokens(path: &[&str], separator: &str) -> Vec<String> {
    if path.len() <= PROTOCOL_MAX_DEPTH {
        return path.iter().map(|token| token.to_string()).collect();
    }
    let last = path.len() - 1;
    vec![
        path[0].to_string(),
        path[1..last].join(separator),
        path[last].to_string(),
    ]
}

/// Walk `path` (tokens after the root's own id) down from `root`.
///
/// A `root` handle this registry never issued is an unknown command.
pub fn resolve<S: AsRef<str>>(
    registry: &Registry,
    root: NodeId,
    path: &[S],
) -> Result<Resolution, RouteError> {
    if registry.node(root).is_none() {
        return Err(RouteError::UnknownCommand {
            name: format!("#{}", root.0),
        });
    }
    let tokens = normalize_path(path, registry.separator());
    let mut walked = vec![root];
    let mut current = root;
    let mut consumed = 0;

    while let NodeKind::Group(group) = &registry.at(current).kind {
        let Some(token) = tokens.get(consumed) else {
            return Err(RouteError::CommandNotFound {
                path: spoken_path(registry, &walked, None),
            });
        };
        let Some(child) = group.child(token) else {
            return Err(RouteError::CommandNotFound {
                path: spoken_path(registry, &walked, Some(token)),
            });
        };
        walked.push(child);
        current = child;
        consumed += 1;
    }

    let unconsumed = tokens[consumed..].to_vec();
    if !unconsumed.is_empty() {
        debug!(
            leaf = %registry.at(current).id,
            ignored = unconsumed.len(),
            "ignoring tokens past leaf"
        );
    }

    let chain = walked
        .iter()
        .rev()
        .flat_map(|id| registry.at(*id).permissions.iter().cloned())
        .collect();

    Ok(Resolution {
        leaf: current,
        chain,
        walked,
        unconsumed,
    })
}

/// Resolve a full path whose first token names the root.
pub fn route<S: AsRef<str>>(registry: &Registry, path: &[S]) -> Result<Resolution, RouteError> {
    let Some((name, rest)) = path.split_first() else {
        return Err(RouteError::UnknownCommand {
            name: String::new(),
        });
    };
    let name = name.as_ref();
    let root = registry
        .lookup_root(name)
        .ok_or_else(|| RouteError::UnknownCommand {
            name: name.to_string(),
        })?;
    resolve(registry, root, rest)
}

fn spoken_path(registry: &Registry, walked: &[NodeId], missing: Option<&str>) -> String {
    walked
        .iter()
        .map(|id| registry.at(*id).id.as_str())
        .chain(missing)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::node::{GroupDef, LeafDef};
    use crate::predicate::{UseCase, Verdict};
    use crate::registry::RegistryBuilder;

    fn allow(name: &str) -> Arc<UseCase> {
        Arc::new(UseCase::from_fn(name, |_| Ok(Verdict::Satisfied)))
    }

    fn leaf(id: &str) -> LeafDef {
        LeafDef::from_fn(id, "leaf", |_, _| Ok(()))
    }

    /// a → b → c → d plus a → e, predicates counted 1/2/0/3 on a/b/c/d.
    fn deep() -> (Registry, NodeId, NodeId) {
        let mut builder = RegistryBuilder::default();
        let a = builder.add_group(GroupDef::new("a", "A").permission(allow("a1")));
        let b = builder
            .add_child_group(
                a,
                GroupDef::new("b", "B")
                    .permission(allow("b1"))
                    .permission(allow("b2")),
            )
            .unwrap();
        let c = builder.add_child_group(b, GroupDef::new("c", "C")).unwrap();
        let d = builder
            .add_child_leaf(
                c,
                leaf("d")
                    .permission(allow("d1"))
                    .permission(allow("d2"))
                    .permission(allow("d3")),
            )
            .unwrap();
        builder.add_child_leaf(a, leaf("e")).unwrap();
        builder.register_root(a).unwrap();
        (builder.freeze().unwrap(), a, d)
    }

    fn names(chain: &[Arc<UseCase>]) -> Vec<&str> {
        chain.iter().map(|u| u.name()).collect()
    }

    #[test]
    fn separator_tokens_expand_in_place() {
        assert_eq!(normalize_path(&["b_c", "d"], "_"), vec!["b", "c", "d"]);
        assert_eq!(normalize_path(&["x--y", "z"], "--"), vec!["x", "y", "z"]);
        assert_eq!(normalize_path::<&str>(&[], "_"), Vec::<String>::new());
    }

    #[test]
    fn collapsed_group_token_routes_to_the_original_leaf() {
        let (registry, _, d) = deep();
        let resolution = registry.route(&["a", "b_c", "d"]).unwrap();
        assert_eq!(resolution.leaf, d);
        assert_eq!(resolution.walked.len(), 4);
        assert_eq!(
            names(&resolution.chain),
            vec!["d1", "d2", "d3", "b1", "b2", "a1"]
        );
    }

    #[test]
    fn chain_length_is_the_sum_over_visited_nodes() {
        let (registry, _, _) = deep();
        let resolution = registry.route(&["a", "e"]).unwrap();
        assert_eq!(resolution.chain.len(), 1);
        let resolution = registry.route(&["a", "b", "c", "d"]).unwrap();
        assert_eq!(resolution.chain.len(), 1 + 2 + 0 + 3);
    }

    #[test]
    fn groups_are_never_executable() {
        let (registry, a, _) = deep();
        assert_eq!(
            resolve::<&str>(&registry, a, &[]).unwrap_err(),
            RouteError::CommandNotFound {
                path: "a".to_string()
            }
        );
        assert_eq!(
            registry.route(&["a", "b", "x"]).unwrap_err(),
            RouteError::CommandNotFound {
                path: "a b x".to_string()
            }
        );
    }

    #[test]
    fn trailing_tokens_past_a_leaf_are_ignored() {
        let (registry, _, _) = deep();
        let resolution = registry.route(&["a", "e", "extra", "more"]).unwrap();
        assert_eq!(resolution.unconsumed, vec!["extra", "more"]);
    }

    #[test]
    fn unknown_roots_and_empty_paths() {
        let (registry, _, _) = deep();
        assert_eq!(
            registry.route(&["zzz"]).unwrap_err().failure_class(),
            "unknown_command"
        );
        assert!(matches!(
            registry.route::<&str>(&[]),
            Err(RouteError::UnknownCommand { .. })
        ));
    }

    #[test]
    fn root_leaf_needs_no_walk() {
        let mut builder = RegistryBuilder::new(EngineConfig::default().with_separator("--"));
        let ping = builder.add_leaf(leaf("ping").permission(allow("p")));
        builder.register_root(ping).unwrap();
        let registry = builder.freeze().unwrap();
        let resolution = registry.route(&["ping"]).unwrap();
        assert_eq!(resolution.leaf, ping);
        assert_eq!(names(&resolution.chain), vec!["p"]);
    }

    #[test]
    fn foreign_root_handles_are_unknown_commands() {
        let (registry, _, _) = deep();
        let mut other = RegistryBuilder::default();
        for step in 0..20 {
            other.add_leaf(leaf(&format!("n{step}")));
        }
        let stray = other.add_leaf(leaf("stray"));
        assert_eq!(
            resolve::<&str>(&registry, stray, &[]).unwrap_err(),
            RouteError::UnknownCommand {
                name: "#20".to_string()
            }
        );
    }

    #[test]
    fn collapse_keeps_short_paths() {
        assert_eq!(collapse_tokens(&["a", "b"], "_"), vec!["a", "b"]);
        let at_limit = ["a", "b", "c"];
        assert_eq!(at_limit.len(), PROTOCOL_MAX_DEPTH);
        assert_eq!(collapse_tokens(&at_limit, "_"), vec!["a", "b", "c"]);
        assert_eq!(
            collapse_tokens(&["a", "b", "c", "d", "e"], "_"),
            vec!["a", "b_c_d", "e"]
        );
    }
}
