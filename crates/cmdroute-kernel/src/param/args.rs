//! Coerced arguments handed to an execution contract.

use crate::context::{AttachmentRef, ChannelRef, Mentionable, RoleRef, UserRef};
use crate::option::OptionValue;
use indexmap::IndexMap;
use serde::Serialize;

/// Coerced values keyed by parameter name, in declared order.
///
/// Absent optional parameters are present as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Arguments(IndexMap<String, Option<OptionValue>>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: &str, value: Option<OptionValue>) {
        self.0.insert(name.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the parameter was declared, whether or not a value was given.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.0.get(name).and_then(Option::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&OptionValue>)> {
        self.0
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(OptionValue::as_str)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(OptionValue::as_integer)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(OptionValue::as_number)
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(OptionValue::as_boolean)
    }

    pub fn mentionable(&self, name: &str) -> Option<&Mentionable> {
        self.get(name).and_then(OptionValue::as_mentionable)
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelRef> {
        self.get(name).and_then(OptionValue::as_channel)
    }

    pub fn role(&self, name: &str) -> Option<&RoleRef> {
        self.get(name).and_then(OptionValue::as_role)
    }

    pub fn user(&self, name: &str) -> Option<&UserRef> {
        self.get(name).and_then(OptionValue::as_user)
    }

    pub fn attachment(&self, name: &str) -> Option<&AttachmentRef> {
        self.get(name).and_then(OptionValue::as_attachment)
    }
}
