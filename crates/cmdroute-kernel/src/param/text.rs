//! Free-text argument parsing.
//!
//! Gateways that receive commands as plain message text hand the kernel one
//! string per parameter. Entity kinds carry an id; the id is looked up
//! through an `EntityResolver` scoped to the invocation's guild. After
//! parsing, the same rule checks as the structured path apply.

use super::{Arguments, FieldError, FieldErrorKind, ParamKind, Parameter, ValidationErrors};
use crate::context::{
    ChannelRef, GuildOrigin, InvocationContext, Mentionable, RoleRef, Snowflake, UserRef,
};
use crate::option::OptionValue;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// The lookup backend itself failed; distinct from "not found".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("entity lookup failed: {0}")]
pub struct ResolverError(pub String);

/// Entity lookups used by free-text parsing.
///
/// `Ok(None)` means the id does not name an entity in scope.
#[async_trait]
pub trait EntityResolver: Send + Sync {
    async fn user(&self, id: &Snowflake) -> Result<Option<UserRef>, ResolverError>;

    async fn member(
        &self,
        guild: &GuildOrigin,
        id: &Snowflake,
    ) -> Result<Option<UserRef>, ResolverError>;

    async fn role(&self, guild: &GuildOrigin, id: &Snowflake)
    -> Result<Option<RoleRef>, ResolverError>;

    async fn channel(
        &self,
        guild: &GuildOrigin,
        id: &Snowflake,
    ) -> Result<Option<ChannelRef>, ResolverError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ParseTextError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Lookup(#[from] ResolverError),
}

#[derive(Debug, thiserror::Error)]
pub enum TextResolveError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Lookup(#[from] ResolverError),
}

const TRUE_WORDS: [&str; 3] = ["true", "1", "yes"];
const FALSE_WORDS: [&str; 3] = ["false", "0", "no"];

impl Parameter {
    /// Parse one free-text input into a coerced value.
    ///
    /// `None` input is treated like an absent structured option.
    pub async fn parse_text(
        &self,
        ctx: &InvocationContext,
        resolver: &dyn EntityResolver,
        input: Option<&str>,
    ) -> Result<Option<OptionValue>, ParseTextError> {
        let Some(input) = input else {
            return self.absent().map_err(ParseTextError::from);
        };
        let value = match self.text_to_value(ctx, resolver, input).await? {
            Ok(value) => value,
            Err(kind) => return Err(self.error(kind).into()),
        };
        Ok(Some(self.finish(value).await?))
    }

    async fn text_to_value(
        &self,
        ctx: &InvocationContext,
        resolver: &dyn EntityResolver,
        input: &str,
    ) -> Result<Result<OptionValue, FieldErrorKind>, ResolverError> {
        let value = match &self.kind {
            ParamKind::String(rules) => {
                match rules.choices.iter().find(|choice| choice.name == input) {
                    Some(choice) => OptionValue::String(choice.value.clone()),
                    None => OptionValue::String(input.to_string()),
                }
            }
            ParamKind::Integer(rules) => {
                if let Some(choice) = rules.choices.iter().find(|choice| choice.name == input) {
                    OptionValue::Integer(choice.value)
                } else {
                    match input.trim().parse::<i64>() {
                        Ok(number) => OptionValue::Integer(number),
                        Err(_) => {
                            return Ok(Err(FieldErrorKind::NotInteger {
                                input: input.to_string(),
                            }));
                        }
                    }
                }
            }
            ParamKind::Number(rules) => {
                if let Some(choice) = rules.choices.iter().find(|choice| choice.name == input) {
                    OptionValue::Number(choice.value)
                } else {
                    match input.trim().parse::<f64>() {
                        Ok(number) if number.is_finite() => OptionValue::Number(number),
                        _ => {
                            return Ok(Err(FieldErrorKind::NotNumber {
                                input: input.to_string(),
                            }));
                        }
                    }
                }
            }
            ParamKind::Boolean => {
                let word = input.trim().to_lowercase();
                if TRUE_WORDS.contains(&word.as_str()) {
                    OptionValue::Boolean(true)
                } else if FALSE_WORDS.contains(&word.as_str()) {
                    OptionValue::Boolean(false)
                } else {
                    return Ok(Err(FieldErrorKind::NotBoolean {
                        input: input.to_string(),
                    }));
                }
            }
            ParamKind::User => {
                let Some(id) = Snowflake::parse(input) else {
                    return Ok(Err(not_an_id(input)));
                };
                match resolver.user(&id).await? {
                    Some(user) => OptionValue::User(user),
                    None => return Ok(Err(not_found("user", &id))),
                }
            }
            ParamKind::Role => {
                let (guild, id) = match guild_and_id(ctx, input) {
                    Ok(pair) => pair,
                    Err(kind) => return Ok(Err(kind)),
                };
                match resolver.role(guild, &id).await? {
                    Some(role) => OptionValue::Role(role),
                    None => return Ok(Err(not_found("role", &id))),
                }
            }
            ParamKind::Channel(_) => {
                let (guild, id) = match guild_and_id(ctx, input) {
                    Ok(pair) => pair,
                    Err(kind) => return Ok(Err(kind)),
                };
                match resolver.channel(guild, &id).await? {
                    Some(channel) => OptionValue::Channel(channel),
                    None => return Ok(Err(not_found("channel", &id))),
                }
            }
            ParamKind::Mentionable => {
                let (guild, id) = match guild_and_id(ctx, input) {
                    Ok(pair) => pair,
                    Err(kind) => return Ok(Err(kind)),
                };
                if let Some(role) = resolver.role(guild, &id).await? {
                    OptionValue::Mentionable(Mentionable::Role(role))
                } else if let Some(member) = resolver.member(guild, &id).await? {
                    OptionValue::Mentionable(Mentionable::User(member))
                } else {
                    return Ok(Err(not_found("role or member", &id)));
                }
            }
            ParamKind::Attachment => {
                return Ok(Err(FieldErrorKind::TextUnsupported {
                    kind: self.option_kind(),
                }));
            }
        };
        Ok(Ok(value))
    }
}

fn not_an_id(input: &str) -> FieldErrorKind {
    FieldErrorKind::NotAnId {
        input: input.to_string(),
    }
}

fn not_found(entity: &str, id: &Snowflake) -> FieldErrorKind {
    FieldErrorKind::EntityNotFound {
        entity: entity.to_string(),
        id: id.to_string(),
    }
}

/// Id syntax is checked before the guild requirement.
fn guild_and_id<'a>(
    ctx: &'a InvocationContext,
    input: &str,
) -> Result<(&'a GuildOrigin, Snowflake), FieldErrorKind> {
    let id = Snowflake::parse(input).ok_or_else(|| not_an_id(input))?;
    let guild = ctx.guild().ok_or(FieldErrorKind::GuildRequired)?;
    Ok((guild, id))
}

/// Resolve every parameter from free-text inputs keyed by parameter name.
///
/// Field failures are aggregated like the structured path. A resolver
/// failure aborts immediately.
pub async fn resolve_text_parameters(
    parameters: &[Parameter],
    inputs: &BTreeMap<String, String>,
    ctx: &InvocationContext,
    resolver: &dyn EntityResolver,
) -> Result<Arguments, TextResolveError> {
    let mut arguments = Arguments::new();
    let mut errors = Vec::new();

    for parameter in parameters {
        let input = inputs.get(parameter.name()).map(String::as_str);
        match parameter.parse_text(ctx, resolver, input).await {
            Ok(value) => arguments.push(parameter.name(), value),
            Err(ParseTextError::Field(error)) => errors.push(error),
            Err(ParseTextError::Lookup(error)) => return Err(error.into()),
        }
    }

    if errors.is_empty() {
        Ok(arguments)
    } else {
        Err(ValidationErrors { errors }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ChannelKind;
    use crate::param::{ChannelRules, Choice, NumericRules, StringRules};

    struct Directory;

    #[async_trait]
    impl EntityResolver for Directory {
        async fn user(&self, id: &Snowflake) -> Result<Option<UserRef>, ResolverError> {
            Ok((id.as_str() == "100").then(|| UserRef {
                id: id.clone(),
                name: "ana".to_string(),
            }))
        }

        async fn member(
            &self,
            _guild: &GuildOrigin,
            id: &Snowflake,
        ) -> Result<Option<UserRef>, ResolverError> {
            self.user(id).await
        }

        async fn role(
            &self,
            _guild: &GuildOrigin,
            id: &Snowflake,
        ) -> Result<Option<RoleRef>, ResolverError> {
            if id.as_str() == "999" {
                return Err(ResolverError("directory offline".to_string()));
            }
            Ok((id.as_str() == "200").then(|| RoleRef {
                id: id.clone(),
                name: "mods".to_string(),
            }))
        }

        async fn channel(
            &self,
            _guild: &GuildOrigin,
            id: &Snowflake,
        ) -> Result<Option<ChannelRef>, ResolverError> {
            Ok((id.as_str() == "300").then(|| ChannelRef {
                id: id.clone(),
                name: "voice".to_string(),
                kind: ChannelKind::GuildVoice,
            }))
        }
    }

    fn guild_ctx() -> InvocationContext {
        InvocationContext::in_guild(
            UserRef {
                id: Snowflake::new("100"),
                name: "ana".to_string(),
            },
            GuildOrigin {
                guild_id: Snowflake::new("1"),
                owner_id: Snowflake::new("100"),
                channel_id: Snowflake::new("2"),
                member_roles: Vec::new(),
            },
        )
    }

    fn dm_ctx() -> InvocationContext {
        InvocationContext::direct(
            UserRef {
                id: Snowflake::new("100"),
                name: "ana".to_string(),
            },
            Snowflake::new("3"),
        )
    }

    fn inputs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn field_kind(param: &Parameter, ctx: &InvocationContext, input: &str) -> FieldErrorKind {
        match param.parse_text(ctx, &Directory, Some(input)).await {
            Err(ParseTextError::Field(error)) => error.kind,
            other => panic!("expected a field error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn booleans_accept_word_forms() {
        let param = Parameter::boolean("flag", "flag");
        let forms = [
            ("TRUE", true),
            ("1", true),
            ("yes", true),
            ("no", false),
            ("0", false),
        ];
        for (input, expected) in forms {
            let value = param.parse_text(&dm_ctx(), &Directory, Some(input)).await.unwrap();
            assert_eq!(value, Some(OptionValue::Boolean(expected)), "input {input}");
        }
        assert!(matches!(
            field_kind(&param, &dm_ctx(), "maybe").await,
            FieldErrorKind::NotBoolean { .. }
        ));
    }

    #[tokio::test]
    async fn integers_reject_fractions_and_numbers_reject_nan() {
        let integer = Parameter::integer("n", "n", NumericRules::new());
        assert!(matches!(
            field_kind(&integer, &dm_ctx(), "5.0").await,
            FieldErrorKind::NotInteger { .. }
        ));

        let number = Parameter::number("x", "x", NumericRules::between(0.0, 1.0));
        assert!(matches!(
            field_kind(&number, &dm_ctx(), "NaN").await,
            FieldErrorKind::NotNumber { .. }
        ));
        assert!(matches!(
            field_kind(&number, &dm_ctx(), "1.5").await,
            FieldErrorKind::AboveMaximum { .. }
        ));
    }

    #[tokio::test]
    async fn choices_match_by_name() {
        let param = Parameter::string(
            "key",
            "key",
            StringRules::new().choices([Choice::new("Prefix", "prefix".to_string())]),
        );
        let value = param.parse_text(&dm_ctx(), &Directory, Some("Prefix")).await.unwrap();
        assert_eq!(value, Some(OptionValue::String("prefix".to_string())));
        assert!(matches!(
            field_kind(&param, &dm_ctx(), "other").await,
            FieldErrorKind::NotInChoices { .. }
        ));
    }

    #[tokio::test]
    async fn guild_entities_need_a_guild() {
        let role = Parameter::role("role", "role");
        assert_eq!(field_kind(&role, &dm_ctx(), "200").await, FieldErrorKind::GuildRequired);
        assert!(matches!(
            field_kind(&role, &dm_ctx(), "mods").await,
            FieldErrorKind::NotAnId { .. }
        ));

        let user = Parameter::user("who", "who");
        let value = user.parse_text(&dm_ctx(), &Directory, Some("100")).await.unwrap();
        assert!(matches!(value, Some(OptionValue::User(u)) if u.name == "ana"));
    }

    #[tokio::test]
    async fn mentionable_prefers_roles_then_members() {
        let param = Parameter::mentionable("target", "target");
        let ctx = guild_ctx();
        let role = param.parse_text(&ctx, &Directory, Some("200")).await.unwrap();
        assert!(matches!(role, Some(OptionValue::Mentionable(Mentionable::Role(_)))));
        let member = param.parse_text(&ctx, &Directory, Some("100")).await.unwrap();
        assert!(matches!(member, Some(OptionValue::Mentionable(Mentionable::User(_)))));
        assert!(matches!(
            field_kind(&param, &ctx, "5").await,
            FieldErrorKind::EntityNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn resolved_channels_still_face_the_allow_list() {
        let param =
            Parameter::channel("where", "where", ChannelRules::only([ChannelKind::GuildText]));
        assert!(matches!(
            field_kind(&param, &guild_ctx(), "300").await,
            FieldErrorKind::ChannelKindNotAllowed { .. }
        ));
    }

    #[tokio::test]
    async fn text_resolution_aggregates_fields_and_aborts_on_lookup_failure() {
        let params = [
            Parameter::integer("count", "count", NumericRules::between(1, 5)).required(),
            Parameter::attachment("file", "file"),
            Parameter::string("note", "note", StringRules::new()),
        ];
        let err = resolve_text_parameters(
            &params,
            &inputs(&[("count", "9"), ("file", "x")]),
            &guild_ctx(),
            &Directory,
        )
        .await
        .unwrap_err();
        let TextResolveError::Invalid(errors) = err else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.parameter_names(), vec!["count", "file"]);

        let params = [Parameter::role("role", "role")];
        let err = resolve_text_parameters(
            &params,
            &inputs(&[("role", "999")]),
            &guild_ctx(),
            &Directory,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TextResolveError::Lookup(_)));
    }
}
