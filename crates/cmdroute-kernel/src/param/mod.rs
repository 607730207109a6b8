//! Parameter descriptors: typed, named argument specs with coercion rules.
//!
//! Every parameter kind is a variant of the closed `ParamKind` enum, so
//! extraction, coercion and validation are exhaustive `match`es rather than
//! runtime type inspection. The same `validate` step runs whether a value
//! arrived as a structured option or as free text (see [`text`]).
//!
//! Resolution over a leaf's parameters is *total*: every descriptor is
//! attempted, and all single-field failures are reported together.

mod args;
mod error;
mod text;

pub use args::Arguments;
pub use error::{FieldError, FieldErrorKind, ValidationErrors};
pub use text::{
    EntityResolver, ParseTextError, ResolverError, TextResolveError, resolve_text_parameters,
};

use crate::context::ChannelKind;
use crate::option::{OptionKind, OptionSource, OptionValue};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Number;
use std::sync::Arc;

/// Length bounds applied to string parameters that do not set their own.
pub const DEFAULT_MIN_LENGTH: usize = 1;
pub const DEFAULT_MAX_LENGTH: usize = 2000;

/// Largest integer magnitude an `f64` holds exactly (2^53).
pub const MAX_EXACT_INTEGER: i64 = 1 << 53;

/// Upper bound on enumerated choices per parameter.
pub const PROTOCOL_MAX_CHOICES: usize = 25;

/// One enumerated choice: display name plus the value it stands for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice<T> {
    pub name: String,
    pub value: T,
}

impl<T> Choice<T> {
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl<T: ToString> Choice<T> {
    /// A choice whose name is the value's own text.
    pub fn generic(value: T) -> Self {
        Self {
            name: value.to_string(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringRules {
    pub min_length: usize,
    pub max_length: usize,
    pub choices: Vec<Choice<String>>,
}

impl Default for StringRules {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            max_length: DEFAULT_MAX_LENGTH,
            choices: Vec::new(),
        }
    }
}

impl StringRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override either bound; `None` keeps the current one.
    pub fn length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min.unwrap_or(self.min_length);
        self.max_length = max.unwrap_or(self.max_length);
        self
    }

    pub fn choices(mut self, choices: impl IntoIterator<Item = Choice<String>>) -> Self {
        self.choices = choices.into_iter().collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericRules<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub choices: Vec<Choice<T>>,
}

impl<T> Default for NumericRules<T> {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            choices: Vec::new(),
        }
    }
}

impl<T> NumericRules<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn between(min: T, max: T) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            choices: Vec::new(),
        }
    }

    pub fn min(mut self, min: T) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: T) -> Self {
        self.max = Some(max);
        self
    }

    pub fn choices(mut self, choices: impl IntoIterator<Item = Choice<T>>) -> Self {
        self.choices = choices.into_iter().collect();
        self
    }
}

/// Allow-list of channel kinds. Empty means any kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelRules {
    pub allowed: Vec<ChannelKind>,
}

impl ChannelRules {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn only(allowed: impl IntoIterator<Item = ChannelKind>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }
}

/// Closed set of parameter kinds and their kind-specific rules.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    String(StringRules),
    Integer(NumericRules<i64>),
    Number(NumericRules<f64>),
    Boolean,
    Mentionable,
    Channel(ChannelRules),
    Role,
    User,
    Attachment,
}

impl ParamKind {
    pub fn option_kind(&self) -> OptionKind {
        match self {
            Self::String(_) => OptionKind::String,
            Self::Integer(_) => OptionKind::Integer,
            Self::Number(_) => OptionKind::Number,
            Self::Boolean => OptionKind::Boolean,
            Self::Mentionable => OptionKind::Mentionable,
            Self::Channel(_) => OptionKind::Channel,
            Self::Role => OptionKind::Role,
            Self::User => OptionKind::User,
            Self::Attachment => OptionKind::Attachment,
        }
    }
}

/// Async refinement run after kind-specific validation.
///
/// `Err` carries the user-facing reason.
#[async_trait]
pub trait ValueChecker: Send + Sync {
    async fn check(&self, value: &OptionValue) -> Result<(), String>;
}

/// Adapts a synchronous closure into a `ValueChecker`.
pub struct CheckFn<F>(pub F);

#[async_trait]
impl<F> ValueChecker for CheckFn<F>
where
    F: Fn(&OptionValue) -> Result<(), String> + Send + Sync,
{
    async fn check(&self, value: &OptionValue) -> Result<(), String> {
        (self.0)(value)
    }
}

#[derive(Clone)]
pub struct Parameter {
    name: String,
    description: String,
    required: bool,
    kind: ParamKind,
    checker: Option<Arc<dyn ValueChecker>>,
}

impl std::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("kind", &self.kind)
            .field("checked", &self.checker.is_some())
            .finish()
    }
}

impl Parameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
            kind,
            checker: None,
        }
    }

    pub fn string(
        name: impl Into<String>,
        description: impl Into<String>,
        rules: StringRules,
    ) -> Self {
        Self::new(name, description, ParamKind::String(rules))
    }

    pub fn integer(
        name: impl Into<String>,
        description: impl Into<String>,
        rules: NumericRules<i64>,
    ) -> Self {
        Self::new(name, description, ParamKind::Integer(rules))
    }

    pub fn number(
        name: impl Into<String>,
        description: impl Into<String>,
        rules: NumericRules<f64>,
    ) -> Self {
        Self::new(name, description, ParamKind::Number(rules))
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, ParamKind::Boolean)
    }

    pub fn mentionable(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, ParamKind::Mentionable)
    }

    pub fn channel(
        name: impl Into<String>,
        description: impl Into<String>,
        rules: ChannelRules,
    ) -> Self {
        Self::new(name, description, ParamKind::Channel(rules))
    }

    pub fn role(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, ParamKind::Role)
    }

    pub fn user(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, ParamKind::User)
    }

    pub fn attachment(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, ParamKind::Attachment)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn checked_by(mut self, checker: impl ValueChecker + 'static) -> Self {
        self.checker = Some(Arc::new(checker));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn kind(&self) -> &ParamKind {
        &self.kind
    }

    pub fn option_kind(&self) -> OptionKind {
        self.kind.option_kind()
    }

    /// Pull this parameter's value out of a structured option source.
    ///
    /// Absent optional values skip every check and yield `Ok(None)`.
    pub async fn extract(
        &self,
        source: &dyn OptionSource,
    ) -> Result<Option<OptionValue>, FieldError> {
        let Some(raw) = source.get(&self.name).cloned() else {
            return self.absent();
        };
        let value = self.coerce(raw).map_err(|kind| self.error(kind))?;
        self.finish(value).await.map(Some)
    }

    fn absent(&self) -> Result<Option<OptionValue>, FieldError> {
        if self.required {
            Err(self.error(FieldErrorKind::Missing))
        } else {
            Ok(None)
        }
    }

    fn error(&self, kind: FieldErrorKind) -> FieldError {
        FieldError::new(&self.name, kind)
    }

    /// Integers widen into number parameters only while the `f64` stays exact.
    fn coerce(&self, raw: OptionValue) -> Result<OptionValue, FieldErrorKind> {
        let expected = self.option_kind();
        match raw {
            OptionValue::Integer(value) if expected == OptionKind::Number => {
                if value.unsigned_abs() > MAX_EXACT_INTEGER.unsigned_abs() {
                    return Err(FieldErrorKind::Inexact { input: value });
                }
                Ok(OptionValue::Number(value as f64))
            }
            value if value.kind() == expected => Ok(value),
            value => Err(FieldErrorKind::WrongKind {
                expected,
                actual: value.kind(),
            }),
        }
    }

    /// Kind-specific checks, then the custom checker.
    async fn finish(&self, value: OptionValue) -> Result<OptionValue, FieldError> {
        self.validate(&value).map_err(|kind| self.error(kind))?;
        if let Some(checker) = &self.checker {
            checker
                .check(&value)
                .await
                .map_err(|message| self.error(FieldErrorKind::Rejected { message }))?;
        }
        Ok(value)
    }

    fn validate(&self, value: &OptionValue) -> Result<(), FieldErrorKind> {
        match (&self.kind, value) {
            (ParamKind::String(rules), OptionValue::String(text)) => validate_string(rules, text),
            (ParamKind::Integer(rules), OptionValue::Integer(number)) => {
                validate_numeric(rules, *number)
            }
            (ParamKind::Number(rules), OptionValue::Number(number)) => {
                if !number.is_finite() {
                    return Err(FieldErrorKind::NotNumber {
                        input: number.to_string(),
                    });
                }
                validate_numeric(rules, *number)
            }
            (ParamKind::Channel(rules), OptionValue::Channel(channel)) => {
                if rules.allowed.is_empty() || rules.allowed.contains(&channel.kind) {
                    Ok(())
                } else {
                    Err(FieldErrorKind::ChannelKindNotAllowed {
                        actual: channel.kind,
                        allowed: rules.allowed.clone(),
                    })
                }
            }
            _ => Ok(()),
        }
    }

    /// Declaration-time consistency of the rules; `Err` is the reason.
    pub(crate) fn check_rules(&self) -> Result<(), String> {
        match &self.kind {
            ParamKind::String(rules) => {
                if rules.min_length > rules.max_length {
                    return Err(format!(
                        "min length {} exceeds max length {}",
                        rules.min_length, rules.max_length
                    ));
                }
                check_choices(&rules.choices)
            }
            ParamKind::Integer(rules) => check_numeric_rules(rules),
            ParamKind::Number(rules) => {
                let finite = rules.min.is_none_or(f64::is_finite)
                    && rules.max.is_none_or(f64::is_finite)
                    && rules.choices.iter().all(|c| c.value.is_finite());
                if !finite {
                    return Err("number bounds and choices must be finite".to_string());
                }
                check_numeric_rules(rules)
            }
            _ => Ok(()),
        }
    }
}

fn check_choices<T>(choices: &[Choice<T>]) -> Result<(), String> {
    if choices.len() > PROTOCOL_MAX_CHOICES {
        return Err(format!(
            "{} choices exceed the limit of {PROTOCOL_MAX_CHOICES}",
            choices.len()
        ));
    }
    if choices.iter().any(|choice| choice.name.trim().is_empty()) {
        return Err("choice names must not be empty".to_string());
    }
    Ok(())
}

fn check_numeric_rules<T: Numeric>(rules: &NumericRules<T>) -> Result<(), String> {
    if let (Some(min), Some(max)) = (rules.min, rules.max) {
        if min > max {
            return Err(format!("minimum {min} exceeds maximum {max}"));
        }
    }
    check_choices(&rules.choices)
}

/// Choices take precedence: when configured, membership is the only check.
///
/// Inputs here are choice values; free text maps choice names to values first.
fn validate_string(rules: &StringRules, text: &str) -> Result<(), FieldErrorKind> {
    if !rules.choices.is_empty() {
        return if rules.choices.iter().any(|choice| choice.value == text) {
            Ok(())
        } else {
            Err(FieldErrorKind::NotInChoices {
                input: text.to_string(),
                choices: choice_names(&rules.choices),
            })
        };
    }
    let length = text.chars().count();
    if length < rules.min_length {
        return Err(FieldErrorKind::TooShort {
            min: rules.min_length,
            length,
        });
    }
    if length > rules.max_length {
        return Err(FieldErrorKind::TooLong {
            max: rules.max_length,
            length,
        });
    }
    Ok(())
}

/// Numeric values that can be compared and reported in errors.
trait Numeric: Copy + PartialOrd + std::fmt::Display {
    fn to_number(self) -> Number;
}

impl Numeric for i64 {
    fn to_number(self) -> Number {
        Number::from(self)
    }
}

impl Numeric for f64 {
    fn to_number(self) -> Number {
        Number::from_f64(self).unwrap_or_else(|| Number::from(0))
    }
}

fn validate_numeric<T: Numeric>(rules: &NumericRules<T>, value: T) -> Result<(), FieldErrorKind> {
    if !rules.choices.is_empty() {
        return if rules.choices.iter().any(|choice| choice.value == value) {
            Ok(())
        } else {
            Err(FieldErrorKind::NotInChoices {
                input: value.to_string(),
                choices: choice_names(&rules.choices),
            })
        };
    }
    if let Some(min) = rules.min {
        if value < min {
            return Err(FieldErrorKind::BelowMinimum {
                input: value.to_number(),
                min: min.to_number(),
            });
        }
    }
    if let Some(max) = rules.max {
        if value > max {
            return Err(FieldErrorKind::AboveMaximum {
                input: value.to_number(),
                max: max.to_number(),
            });
        }
    }
    Ok(())
}

fn choice_names<T>(choices: &[Choice<T>]) -> Vec<String> {
    choices.iter().map(|choice| choice.name.clone()).collect()
}

/// Resolve every parameter against a structured option source.
///
/// All descriptors are attempted in declared order; the error, if any,
/// carries exactly one entry per failing parameter.
pub async fn resolve_parameters(
    parameters: &[Parameter],
    source: &dyn OptionSource,
) -> Result<Arguments, ValidationErrors> {
    let mut arguments = Arguments::new();
    let mut errors = Vec::new();

    for parameter in parameters {
        match parameter.extract(source).await {
            Ok(value) => arguments.push(parameter.name(), value),
            Err(error) => errors.push(error),
        }
    }

    if errors.is_empty() {
        Ok(arguments)
    } else {
        Err(ValidationErrors { errors })
    }
}
