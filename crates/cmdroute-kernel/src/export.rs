//! Descriptor export: flattening trees to the protocol's three levels.
//!
//! The registration protocol accepts root → optional group → subcommand.
//! Trees may be deeper, so every root-to-leaf branch longer than three is
//! collapsed: the nodes strictly between the root and the leaf become one
//! synthetic group whose id joins theirs with the reserved separator.
//! Branches that end up under the same group are merged.
//!
//! Output is a pure function of the frozen tree: children are visited in
//! insertion order and groups appear in order of first occurrence.

use crate::config::PROTOCOL_MAX_DEPTH;
use crate::error::TreeError;
use crate::node::{NodeId, NodeKind};
use crate::param::{ParamKind, Parameter};
use crate::predicate::UseCase;
use crate::registry::Registry;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Number, Value};
use std::sync::Arc;

/// Option type code of a subcommand.
pub const SUBCOMMAND_TYPE: u8 = 1;
/// Option type code of a subcommand group.
pub const SUBCOMMAND_GROUP_TYPE: u8 = 2;

const PROTOCOL_NAME_LIMIT: usize = 32;

/// Every root-to-leaf branch under `root`, in child insertion order.
///
/// A group without children ends a branch too, so shape checks can see it.
/// Empty for a handle this registry never issued.
pub fn branches(registry: &Registry, root: NodeId) -> Vec<Vec<NodeId>> {
    let mut out = Vec::new();
    if registry.node(root).is_none() {
        return out;
    }
    let mut prefix = Vec::new();
    collect_branches(registry, root, &mut prefix, &mut out);
    out
}

fn collect_branches(
    registry: &Registry,
    id: NodeId,
    prefix: &mut Vec<NodeId>,
    out: &mut Vec<Vec<NodeId>>,
) {
    prefix.push(id);
    match &registry.at(id).kind {
        NodeKind::Group(group) if !group.is_empty() => {
            for child in group.children() {
                collect_branches(registry, child, prefix, out);
            }
        }
        _ => out.push(prefix.clone()),
    }
    prefix.pop();
}

/// A group at the protocol's middle level, original or synthetic.
#[derive(Debug, Clone)]
pub struct FlatGroup {
    pub id: String,
    pub description: String,
    /// Tree nodes this group stands for, root side first.
    pub members: Vec<NodeId>,
    /// Members' own predicates, root-to-leaf.
    pub chain: Vec<Arc<UseCase>>,
    pub leaves: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub enum FlatEntry {
    Leaf(NodeId),
    Group(FlatGroup),
}

/// One root flattened to at most three levels.
#[derive(Debug, Clone)]
pub struct FlatCommand {
    pub root: NodeId,
    /// Empty when the root itself is a leaf.
    pub entries: Vec<FlatEntry>,
}

pub fn flatten(registry: &Registry, root: NodeId) -> Result<FlatCommand, TreeError> {
    registry.checked(root)?;
    let separator = registry.separator();
    let mut entries: IndexMap<String, FlatEntry> = IndexMap::new();

    for branch in branches(registry, root) {
        let Some(&last) = branch.last() else {
            return Err(TreeError::InvalidTreeShape("empty branch".to_string()));
        };
        let leaf = registry.at(last);
        if !leaf.is_leaf() {
            return Err(TreeError::InvalidTreeShape(format!(
                "group `{}` has no branches",
                leaf.id
            )));
        }

        match branch.len() {
            1 => {}
            len if len < PROTOCOL_MAX_DEPTH => {
                entries.insert(leaf.id.clone(), FlatEntry::Leaf(last));
            }
            len => {
                let members = &branch[1..len - 1];
                let id = members
                    .iter()
                    .map(|member| registry.at(*member).id.as_str())
                    .collect::<Vec<_>>()
                    .join(separator);
                if registry.config().enforce_protocol_names
                    && id.chars().count() > PROTOCOL_NAME_LIMIT
                {
                    return Err(TreeError::InvalidName {
                        name: id,
                        reason: format!(
                            "collapsed group id exceeds {PROTOCOL_NAME_LIMIT} characters"
                        ),
                    });
                }
                let entry = entries.entry(id.clone()).or_insert_with(|| {
                    FlatEntry::Group(FlatGroup {
                        id,
                        description: registry.at(members[0]).description.clone(),
                        members: members.to_vec(),
                        chain: members
                            .iter()
                            .flat_map(|member| registry.at(*member).permissions.iter().cloned())
                            .collect(),
                        leaves: Vec::new(),
                    })
                });
                if let FlatEntry::Group(group) = entry {
                    group.leaves.push(last);
                }
            }
        }
    }

    Ok(FlatCommand {
        root,
        entries: entries.into_values().collect(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceDescriptor {
    pub name: String,
    pub value: Value,
}

/// One entry of the protocol's option schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionDescriptor {
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ChoiceDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub channel_types: Vec<u8>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionDescriptor>,
}

impl OptionDescriptor {
    fn bare(kind: u8, name: &str, description: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            description: description.to_string(),
            required: None,
            choices: Vec::new(),
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            channel_types: Vec::new(),
            options: Vec::new(),
        }
    }

    fn from_parameter(parameter: &Parameter) -> Self {
        let mut option = Self::bare(
            parameter.option_kind().protocol_code(),
            parameter.name(),
            parameter.description(),
        );
        option.required = Some(parameter.is_required());

        match parameter.kind() {
            ParamKind::String(rules) => {
                option.choices = rules
                    .choices
                    .iter()
                    .map(|choice| ChoiceDescriptor {
                        name: choice.name.clone(),
                        value: Value::String(choice.value.clone()),
                    })
                    .collect();
                if option.choices.is_empty() {
                    option.min_length = Some(rules.min_length);
                    option.max_length = Some(rules.max_length);
                }
            }
            ParamKind::Integer(rules) => {
                option.choices = rules
                    .choices
                    .iter()
                    .map(|choice| ChoiceDescriptor {
                        name: choice.name.clone(),
                        value: Value::from(choice.value),
                    })
                    .collect();
                option.min_value = rules.min.map(Number::from);
                option.max_value = rules.max.map(Number::from);
            }
            ParamKind::Number(rules) => {
                option.choices = rules
                    .choices
                    .iter()
                    .filter_map(|choice| {
                        Number::from_f64(choice.value).map(|value| ChoiceDescriptor {
                            name: choice.name.clone(),
                            value: Value::Number(value),
                        })
                    })
                    .collect();
                option.min_value = rules.min.and_then(Number::from_f64);
                option.max_value = rules.max.and_then(Number::from_f64);
            }
            ParamKind::Channel(rules) => {
                option.channel_types = rules
                    .allowed
                    .iter()
                    .map(|kind| kind.protocol_code())
                    .collect();
            }
            ParamKind::Boolean
            | ParamKind::Mentionable
            | ParamKind::Role
            | ParamKind::User
            | ParamKind::Attachment => {}
        }
        option
    }
}

/// Top-level registration payload for one root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandDescriptor {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionDescriptor>,
}

fn parameter_options(registry: &Registry, leaf: NodeId) -> Vec<OptionDescriptor> {
    registry
        .at(leaf)
        .as_leaf()
        .map(|leaf| leaf.parameters().iter().map(OptionDescriptor::from_parameter).collect())
        .unwrap_or_default()
}

fn subcommand(registry: &Registry, leaf: NodeId) -> OptionDescriptor {
    let node = registry.at(leaf);
    let mut option = OptionDescriptor::bare(SUBCOMMAND_TYPE, &node.id, &node.description);
    option.options = parameter_options(registry, leaf);
    option
}

pub fn export_command(
    registry: &Registry,
    root: NodeId,
) -> Result<CommandDescriptor, TreeError> {
    let node = registry.checked(root)?;
    let options = if node.is_leaf() {
        parameter_options(registry, root)
    } else {
        flatten(registry, root)?
            .entries
            .iter()
            .map(|entry| match entry {
                FlatEntry::Leaf(leaf) => subcommand(registry, *leaf),
                FlatEntry::Group(group) => {
                    let mut option = OptionDescriptor::bare(
                        SUBCOMMAND_GROUP_TYPE,
                        &group.id,
                        &group.description,
                    );
                    option.options = group
                        .leaves
                        .iter()
                        .map(|leaf| subcommand(registry, *leaf))
                        .collect();
                    option
                }
            })
            .collect()
    };

    Ok(CommandDescriptor {
        name: node.id.clone(),
        description: node.description.clone(),
        options,
    })
}

/// Every root, in registration order.
pub fn export_all(registry: &Registry) -> Result<Vec<CommandDescriptor>, TreeError> {
    registry
        .roots()
        .map(|(_, root)| export_command(registry, root))
        .collect()
}
