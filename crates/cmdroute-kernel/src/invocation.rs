//! Invocation requests and interaction payload decoding.
//!
//! An `InvocationRequest` is what the dispatcher consumes: the caller's
//! token path, raw option values and context. Gateways that receive the
//! platform's structured interaction payload can decode it with
//! `InvocationRequest::from_interaction`, which walks the nested
//! subcommand options into a path and resolves entity ids against the
//! payload's resolved map.

use crate::context::{
    AttachmentRef, ChannelKind, ChannelRef, InvocationContext, Mentionable, RoleRef, Snowflake,
    UserRef,
};
use crate::export::{SUBCOMMAND_GROUP_TYPE, SUBCOMMAND_TYPE};
use crate::option::{OptionKind, OptionValue, OptionValues};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRequest {
    pub path: Vec<String>,
    #[serde(default)]
    pub options: OptionValues,
    pub context: InvocationContext,
}

impl InvocationRequest {
    pub fn new<S: Into<String>>(
        path: impl IntoIterator<Item = S>,
        options: OptionValues,
        context: InvocationContext,
    ) -> Self {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            options,
            context,
        }
    }

    /// Top-level command identifier.
    pub fn command(&self) -> Option<&str> {
        self.path.first().map(String::as_str)
    }

    pub fn from_interaction(
        data: &InteractionData,
        context: InvocationContext,
    ) -> Result<Self, InteractionError> {
        let mut path = vec![data.name.clone()];
        let mut options = &data.options;
        while let [nested] = options.as_slice() {
            if nested.kind != SUBCOMMAND_TYPE && nested.kind != SUBCOMMAND_GROUP_TYPE {
                break;
            }
            path.push(nested.name.clone());
            options = &nested.options;
        }

        let mut values = OptionValues::new();
        for option in options {
            values.insert(option.name.clone(), data.resolved.decode(option)?);
        }
        Ok(Self {
            path,
            options: values,
            context,
        })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InteractionError {
    #[error("option `{name}` does not carry a valid {expected} value")]
    InvalidOptionValue { name: String, expected: OptionKind },

    #[error("option `{name}` has unknown type code {code}")]
    UnknownOptionType { name: String, code: u8 },

    #[error("option `{name}` refers to {id}, which is missing from the resolved data")]
    UnresolvedEntity { name: String, id: String },
}

/// Command data of one chat-input interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<InteractionOption>,
    #[serde(default)]
    pub resolved: ResolvedData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<InteractionOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedUser {
    pub id: Snowflake,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRole {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedChannel {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAttachment {
    pub id: Snowflake,
    pub filename: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub size: u64,
}

/// Entities referenced by id from option values, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedData {
    #[serde(default)]
    pub users: BTreeMap<String, ResolvedUser>,
    #[serde(default)]
    pub roles: BTreeMap<String, ResolvedRole>,
    #[serde(default)]
    pub channels: BTreeMap<String, ResolvedChannel>,
    #[serde(default)]
    pub attachments: BTreeMap<String, ResolvedAttachment>,
}

impl ResolvedData {
    fn decode(&self, option: &InteractionOption) -> Result<OptionValue, InteractionError> {
        let Some(kind) = OptionKind::from_protocol_code(option.kind) else {
            return Err(InteractionError::UnknownOptionType {
                name: option.name.clone(),
                code: option.kind,
            });
        };
        let invalid = || InteractionError::InvalidOptionValue {
            name: option.name.clone(),
            expected: kind,
        };
        let value = option.value.as_ref().ok_or_else(invalid)?;

        match kind {
            OptionKind::String => value
                .as_str()
                .map(|text| OptionValue::String(text.to_string()))
                .ok_or_else(invalid),
            OptionKind::Integer => value.as_i64().map(OptionValue::Integer).ok_or_else(invalid),
            OptionKind::Number => value.as_f64().map(OptionValue::Number).ok_or_else(invalid),
            OptionKind::Boolean => value.as_bool().map(OptionValue::Boolean).ok_or_else(invalid),
            OptionKind::User => {
                let id = value.as_str().ok_or_else(invalid)?;
                self.user(id)
                    .map(OptionValue::User)
                    .ok_or_else(|| unresolved(option, id))
            }
            OptionKind::Role => {
                let id = value.as_str().ok_or_else(invalid)?;
                self.role(id)
                    .map(OptionValue::Role)
                    .ok_or_else(|| unresolved(option, id))
            }
            OptionKind::Mentionable => {
                let id = value.as_str().ok_or_else(invalid)?;
                self.user(id)
                    .map(Mentionable::User)
                    .or_else(|| self.role(id).map(Mentionable::Role))
                    .map(OptionValue::Mentionable)
                    .ok_or_else(|| unresolved(option, id))
            }
            OptionKind::Channel => {
                let id = value.as_str().ok_or_else(invalid)?;
                let channel = self.channels.get(id).ok_or_else(|| unresolved(option, id))?;
                let kind = ChannelKind::from_protocol_code(channel.kind).ok_or_else(invalid)?;
                Ok(OptionValue::Channel(ChannelRef {
                    id: channel.id.clone(),
                    name: channel.name.clone(),
                    kind,
                }))
            }
            OptionKind::Attachment => {
                let id = value.as_str().ok_or_else(invalid)?;
                self.attachments
                    .get(id)
                    .map(|attachment| {
                        OptionValue::Attachment(AttachmentRef {
                            id: attachment.id.clone(),
                            filename: attachment.filename.clone(),
                            url: attachment.url.clone(),
                            size: attachment.size,
                        })
                    })
                    .ok_or_else(|| unresolved(option, id))
            }
        }
    }

    fn user(&self, id: &str) -> Option<UserRef> {
        self.users.get(id).map(|user| UserRef {
            id: user.id.clone(),
            name: user.username.clone(),
        })
    }

    fn role(&self, id: &str) -> Option<RoleRef> {
        self.roles.get(id).map(|role| RoleRef {
            id: role.id.clone(),
            name: role.name.clone(),
        })
    }
}

fn unresolved(option: &InteractionOption, id: &str) -> InteractionError {
    InteractionError::UnresolvedEntity {
        name: option.name.clone(),
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> InvocationContext {
        InvocationContext::direct(
            UserRef {
                id: Snowflake::new("1"),
                name: "ana".to_string(),
            },
            Snowflake::new("2"),
        )
    }

    #[test]
    fn nested_subcommands_become_the_path() {
        let data: InteractionData = serde_json::from_value(json!({
            "name": "a",
            "options": [{
                "name": "b_c",
                "type": 2,
                "options": [{
                    "name": "d",
                    "type": 1,
                    "options": [
                        {"name": "count", "type": 4, "value": 3},
                        {"name": "ratio", "type": 10, "value": 0.5},
                        {"name": "note", "type": 3, "value": "hi"}
                    ]
                }]
            }]
        }))
        .unwrap();

        let request = InvocationRequest::from_interaction(&data, ctx()).unwrap();
        assert_eq!(request.path, vec!["a", "b_c", "d"]);
        assert_eq!(request.command(), Some("a"));
        assert_eq!(request.options.len(), 3);
        let names: Vec<&str> = request.options.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["count", "ratio", "note"]);
    }

    #[test]
    fn entity_options_resolve_through_the_payload() {
        let data: InteractionData = serde_json::from_value(json!({
            "name": "purge",
            "options": [
                {"name": "channel", "type": 7, "value": "50"},
                {"name": "target", "type": 9, "value": "60"}
            ],
            "resolved": {
                "channels": {"50": {"id": "50", "name": "news", "type": 5}},
                "roles": {"60": {"id": "60", "name": "mods"}}
            }
        }))
        .unwrap();

        let request = InvocationRequest::from_interaction(&data, ctx()).unwrap();
        assert_eq!(request.path, vec!["purge"]);
        let channel = request.options.iter().find(|(n, _)| *n == "channel").unwrap().1;
        assert!(matches!(
            channel,
            OptionValue::Channel(ChannelRef { kind: ChannelKind::GuildAnnouncement, .. })
        ));
        let target = request.options.iter().find(|(n, _)| *n == "target").unwrap().1;
        assert!(matches!(target, OptionValue::Mentionable(Mentionable::Role(_))));
    }

    #[test]
    fn malformed_options_are_reported() {
        let data: InteractionData = serde_json::from_value(json!({
            "name": "x",
            "options": [{"name": "who", "type": 6, "value": "77"}]
        }))
        .unwrap();
        assert_eq!(
            InvocationRequest::from_interaction(&data, ctx()).unwrap_err(),
            InteractionError::UnresolvedEntity {
                name: "who".to_string(),
                id: "77".to_string()
            }
        );

        let data: InteractionData = serde_json::from_value(json!({
            "name": "x",
            "options": [{"name": "n", "type": 4, "value": "three"}]
        }))
        .unwrap();
        assert!(matches!(
            InvocationRequest::from_interaction(&data, ctx()),
            Err(InteractionError::InvalidOptionValue { expected: OptionKind::Integer, .. })
        ));

        let data: InteractionData = serde_json::from_value(json!({
            "name": "x",
            "options": [{"name": "n", "type": 42, "value": 1}]
        }))
        .unwrap();
        assert!(matches!(
            InvocationRequest::from_interaction(&data, ctx()),
            Err(InteractionError::UnknownOptionType { code: 42, .. })
        ));
    }
}
