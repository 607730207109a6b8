//! Single-field failures and their aggregate.

use crate::context::ChannelKind;
use crate::option::OptionKind;
use serde::Serialize;
use serde_json::Number;

/// Why one parameter rejected its input.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum FieldErrorKind {
    #[error("this argument is required")]
    Missing,

    #[error("expected a {expected} value, got {actual}")]
    WrongKind {
        expected: OptionKind,
        actual: OptionKind,
    },

    #[error("the input \"{input}\" is not an integer")]
    NotInteger { input: String },

    #[error("the input \"{input}\" is not a number")]
    NotNumber { input: String },

    #[error("the input \"{input}\" is not a valid boolean; use true, 1, yes or false, 0, no")]
    NotBoolean { input: String },

    #[error("the input \"{input}\" is not an id")]
    NotAnId { input: String },

    #[error("the input is too short: minimum length is {min}, got {length}")]
    TooShort { min: usize, length: usize },

    #[error("the input is too long: maximum length is {max}, got {length}")]
    TooLong { max: usize, length: usize },

    #[error("the input {input} is too small: minimum is {min}")]
    BelowMinimum { input: Number, min: Number },

    #[error("the input {input} is too big: maximum is {max}")]
    AboveMaximum { input: Number, max: Number },

    #[error("the input {input} cannot be represented exactly as a number")]
    Inexact { input: i64 },

    #[error("the input \"{input}\" is not one of the choices: {}", .choices.join(", "))]
    NotInChoices { input: String, choices: Vec<String> },

    #[error("a {actual} channel is not allowed; allowed channel kinds: {}", join_kinds(.allowed))]
    ChannelKindNotAllowed {
        actual: ChannelKind,
        allowed: Vec<ChannelKind>,
    },

    #[error("this argument can only be resolved inside a server")]
    GuildRequired,

    #[error("no {entity} found with id {id}")]
    EntityNotFound { entity: String, id: String },

    #[error("{kind} arguments cannot be given as text")]
    TextUnsupported { kind: OptionKind },

    #[error("{message}")]
    Rejected { message: String },
}

fn join_kinds(kinds: &[ChannelKind]) -> String {
    kinds
        .iter()
        .map(|kind| kind.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A failure tagged with the parameter it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{parameter}: {message}")]
pub struct FieldError {
    pub parameter: String,
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    pub fn new(parameter: impl Into<String>, kind: FieldErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            parameter: parameter.into(),
            kind,
            message,
        }
    }
}

/// Every single-field failure from one resolution pass.
///
/// Never empty when returned as an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid arguments for: {}", self.parameter_names().join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.parameter.as_str()).collect()
    }

    pub fn for_parameter(&self, name: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.parameter == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_cite_the_violated_limit() {
        let err = FieldError::new(
            "value",
            FieldErrorKind::AboveMaximum {
                input: Number::from(15),
                max: Number::from(10),
            },
        );
        assert_eq!(err.message, "the input 15 is too big: maximum is 10");
        assert_eq!(err.to_string(), "value: the input 15 is too big: maximum is 10");
    }

    #[test]
    fn channel_kind_message_names_allowed_kinds() {
        let kind = FieldErrorKind::ChannelKindNotAllowed {
            actual: ChannelKind::GuildVoice,
            allowed: vec![ChannelKind::GuildText, ChannelKind::GuildForum],
        };
        assert_eq!(
            kind.to_string(),
            "a voice channel is not allowed; allowed channel kinds: text, forum"
        );
    }

    #[test]
    fn aggregate_lists_parameters_in_order() {
        let errors = ValidationErrors {
            errors: vec![
                FieldError::new("a", FieldErrorKind::Missing),
                FieldError::new("b", FieldErrorKind::GuildRequired),
            ],
        };
        assert_eq!(errors.to_string(), "invalid arguments for: a, b");
        assert!(errors.for_parameter("b").is_some());
        assert!(errors.for_parameter("c").is_none());
    }
}
