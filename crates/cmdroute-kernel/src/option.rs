//! Raw option values supplied with an invocation.
//!
//! An `OptionSource` is the keyed lookup a gateway hands to the kernel.
//! `OptionValues` is the in-memory implementation used by interaction
//! decoding, tests and the CLI.

use crate::context::{AttachmentRef, ChannelRef, Mentionable, RoleRef, UserRef};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Closed set of parameter value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    String,
    Integer,
    Number,
    Boolean,
    Mentionable,
    Channel,
    Role,
    User,
    Attachment,
}

impl OptionKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Mentionable => "mentionable",
            Self::Channel => "channel",
            Self::Role => "role",
            Self::User => "user",
            Self::Attachment => "attachment",
        }
    }

    /// Numeric option type used by the registration protocol.
    pub fn protocol_code(self) -> u8 {
        match self {
            Self::String => 3,
            Self::Integer => 4,
            Self::Boolean => 5,
            Self::User => 6,
            Self::Channel => 7,
            Self::Role => 8,
            Self::Mentionable => 9,
            Self::Number => 10,
            Self::Attachment => 11,
        }
    }

    pub fn from_protocol_code(code: u8) -> Option<Self> {
        match code {
            3 => Some(Self::String),
            4 => Some(Self::Integer),
            5 => Some(Self::Boolean),
            6 => Some(Self::User),
            7 => Some(Self::Channel),
            8 => Some(Self::Role),
            9 => Some(Self::Mentionable),
            10 => Some(Self::Number),
            11 => Some(Self::Attachment),
            _ => None,
        }
    }
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One typed option value. Also the coerced argument value handed to leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Mentionable(Mentionable),
    Channel(ChannelRef),
    Role(RoleRef),
    User(UserRef),
    Attachment(AttachmentRef),
}

impl OptionValue {
    pub fn kind(&self) -> OptionKind {
        match self {
            Self::String(_) => OptionKind::String,
            Self::Integer(_) => OptionKind::Integer,
            Self::Number(_) => OptionKind::Number,
            Self::Boolean(_) => OptionKind::Boolean,
            Self::Mentionable(_) => OptionKind::Mentionable,
            Self::Channel(_) => OptionKind::Channel,
            Self::Role(_) => OptionKind::Role,
            Self::User(_) => OptionKind::User,
            Self::Attachment(_) => OptionKind::Attachment,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Integers widen to numbers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_mentionable(&self) -> Option<&Mentionable> {
        match self {
            Self::Mentionable(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_channel(&self) -> Option<&ChannelRef> {
        match self {
            Self::Channel(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_role(&self) -> Option<&RoleRef> {
        match self {
            Self::Role(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_user(&self) -> Option<&UserRef> {
        match self {
            Self::User(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_attachment(&self) -> Option<&AttachmentRef> {
        match self {
            Self::Attachment(value) => Some(value),
            _ => None,
        }
    }
}

/// Keyed lookup of raw option values by parameter name.
pub trait OptionSource: Send + Sync {
    fn get(&self, name: &str) -> Option<&OptionValue>;
}

/// Ordered name → value map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionValues(IndexMap<String, OptionValue>);

impl OptionValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: OptionValue) -> Option<OptionValue> {
        self.0.insert(name.into(), value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl OptionSource for OptionValues {
    fn get(&self, name: &str) -> Option<&OptionValue> {
        self.0.get(name)
    }
}
