//! Toy command modules for fixtures, the CLI and integration tests.
//!
//! ## Modules
//!
//! - **settings**: `config` group (guild only) with `set` (required integer
//!   `value` in 1..=10) and `get` (optional `key` from a choice list).
//!
//! - **deep**: a four-level tree that exercises export collapse.
//!   `a → b → c → {d, e}`, `a → b → f`, `a → g`. Every node on the `d`
//!   branch carries its own predicate, so the routed chain is observable.
//!
//! - **admin**: root leaves `purge` (server owner; text or announcement
//!   channel; optional bounded count) and `echo` (`fail` raises a handled
//!   error, `crash` an unexpected one).
//!
//! Caller id `13` is blocked by `not_blocked()`, which guards `deep` and
//! `echo`.
//!
//! `ToyDirectory` is a fixed `EntityResolver` for free-text parsing.

use crate::config::EngineConfig;
use crate::context::{ChannelKind, ChannelRef, GuildOrigin, RoleRef, Snowflake, UserRef};
use crate::error::TreeError;
use crate::node::{ExecutionError, GroupDef, HandleableError, LeafDef, NodeId};
use crate::param::{
    ChannelRules, Choice, EntityResolver, NumericRules, Parameter, ResolverError, StringRules,
};
use crate::predicate::{UseCase, Verdict, guild_only, server_owner};
use crate::registry::{CommandModule, Registry, RegistryBuilder};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Caller id that `not_blocked()` denies.
pub const BLOCKED_CALLER: &str = "13";

pub fn not_blocked() -> Arc<UseCase> {
    Arc::new(UseCase::from_fn("not blocked", |ctx| {
        Ok(if ctx.caller.id.as_str() == BLOCKED_CALLER {
            Verdict::deny("You are blocked from using this bot.")
        } else {
            Verdict::Satisfied
        })
    }))
}

fn gate(name: &str) -> Arc<UseCase> {
    Arc::new(UseCase::from_fn(name, |_| Ok(Verdict::Satisfied)))
}

fn logged(id: &'static str, description: &str) -> LeafDef {
    LeafDef::from_fn(id, description, move |ctx, args| {
        info!(command = id, caller = %ctx.caller.id, arguments = args.len(), "toy command ran");
        Ok(())
    })
}

pub struct SettingsModule;

impl CommandModule for SettingsModule {
    fn id(&self) -> &str {
        "settings"
    }

    fn build(&self, builder: &mut RegistryBuilder) -> Result<Vec<NodeId>, TreeError> {
        let config = builder.add_group(
            GroupDef::new("config", "Configure this server").permission(guild_only()),
        );
        builder.add_child_leaf(
            config,
            logged("set", "Set the configured value").parameter(
                Parameter::integer("value", "New value", NumericRules::between(1, 10)).required(),
            ),
        )?;
        builder.add_child_leaf(
            config,
            logged("get", "Show configuration").parameter(Parameter::string(
                "key",
                "Setting to show",
                StringRules::new().choices([
                    Choice::new("Prefix", "prefix".to_string()),
                    Choice::new("Language", "language".to_string()),
                ]),
            )),
        )?;
        Ok(vec![config])
    }
}

pub struct DeepModule;

impl CommandModule for DeepModule {
    fn id(&self) -> &str {
        "deep"
    }

    fn build(&self, builder: &mut RegistryBuilder) -> Result<Vec<NodeId>, TreeError> {
        let a = builder.add_group(
            GroupDef::new("a", "Deep root")
                .permission(not_blocked())
                .permission(gate("a gate")),
        );
        let b = builder.add_child_group(
            a,
            GroupDef::new("b", "Second level").permission(gate("b gate")),
        )?;
        let c = builder.add_child_group(
            b,
            GroupDef::new("c", "Third level").permission(gate("c gate")),
        )?;
        builder.add_child_leaf(c, logged("d", "Deepest leaf").permission(gate("d gate")))?;
        builder.add_child_leaf(c, logged("e", "Deep sibling"))?;
        builder.add_child_leaf(b, logged("f", "Middle leaf"))?;
        builder.add_child_leaf(a, logged("g", "Shallow leaf"))?;
        Ok(vec![a])
    }
}

pub struct AdminModule;

impl CommandModule for AdminModule {
    fn id(&self) -> &str {
        "admin"
    }

    fn build(&self, builder: &mut RegistryBuilder) -> Result<Vec<NodeId>, TreeError> {
        let purge = builder.add_leaf(
            logged("purge", "Delete recent messages")
                .permission(server_owner())
                .parameter(
                    Parameter::channel(
                        "channel",
                        "Channel to purge",
                        ChannelRules::only([
                            ChannelKind::GuildText,
                            ChannelKind::GuildAnnouncement,
                        ]),
                    )
                    .required(),
                )
                .parameter(Parameter::integer(
                    "count",
                    "Messages to delete",
                    NumericRules::between(1, 100),
                )),
        );
        let echo = builder.add_leaf(
            LeafDef::from_fn("echo", "Repeat some text", |_, args| {
                match args.string("text") {
                    Some("fail") => Err(HandleableError::new("echo asked to fail")
                        .with_display("Echo refused to repeat that.")
                        .into()),
                    Some("crash") => Err(ExecutionError::unexpected(
                        "echo_backend",
                        "echo backend unavailable",
                    )),
                    _ => Ok(()),
                }
            })
            .permission(not_blocked())
            .parameter(
                Parameter::string(
                    "text",
                    "Text to repeat",
                    StringRules::new().length(None, Some(200)),
                )
                .required(),
            ),
        );
        Ok(vec![purge, echo])
    }
}

pub fn toy_modules() -> Vec<Box<dyn CommandModule>> {
    vec![
        Box::new(SettingsModule),
        Box::new(DeepModule),
        Box::new(AdminModule),
    ]
}

/// Install every toy module and freeze.
pub fn toy_registry(config: EngineConfig) -> Result<Registry, TreeError> {
    let mut builder = RegistryBuilder::new(config);
    for module in toy_modules() {
        builder.install(module.as_ref())?;
    }
    builder.freeze()
}

/// Fixed directory: users 100/101, role 300, channels 400 (text) and
/// 401 (voice). Id `999` makes every lookup fail.
pub struct ToyDirectory;

const FAILING_ID: &str = "999";

fn check_backend(id: &Snowflake) -> Result<(), ResolverError> {
    if id.as_str() == FAILING_ID {
        Err(ResolverError("toy directory unavailable".to_string()))
    } else {
        Ok(())
    }
}

#[async_trait]
impl EntityResolver for ToyDirectory {
    async fn user(&self, id: &Snowflake) -> Result<Option<UserRef>, ResolverError> {
        check_backend(id)?;
        let name = match id.as_str() {
            "100" => "ana",
            "101" => "bo",
            _ => return Ok(None),
        };
        Ok(Some(UserRef {
            id: id.clone(),
            name: name.to_string(),
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
        check_backend(id)?;
        Ok((id.as_str() == "300").then(|| RoleRef {
            id: id.clone(),
            name: "moderators".to_string(),
        }))
    }

    async fn channel(
        &self,
        _guild: &GuildOrigin,
        id: &Snowflake,
    ) -> Result<Option<ChannelRef>, ResolverError> {
        check_backend(id)?;
        let (name, kind) = match id.as_str() {
            "400" => ("general", ChannelKind::GuildText),
            "401" => ("lounge", ChannelKind::GuildVoice),
            _ => return Ok(None),
        };
        Ok(Some(ChannelRef {
            id: id.clone(),
            name: name.to_string(),
            kind,
        }))
    }
}
