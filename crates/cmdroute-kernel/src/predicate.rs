//! Permission predicates ("use cases").
//!
//! A `UseCase` is a named async check over an `InvocationContext`. Each use
//! case may list initial use cases that run first, depth-first in declared
//! order, so prerequisite chains such as "in a guild, then server owner"
//! are shared by reference instead of repeated.
//!
//! Evaluation short-circuits: the first denial anywhere stops the walk.
//! A condition that fails outright returns `ConditionError`, which is not a
//! denial and propagates unchanged.

use crate::context::InvocationContext;
use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::trace;

/// Result of one condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Satisfied,
    Denied { reason: String },
}

impl Verdict {
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Denied {
            reason: reason.into(),
        }
    }
}

/// The first denial of a chain, tagged with the use case that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Denial {
    pub use_case: String,
    pub reason: String,
}

/// A condition failed for a reason other than denying access.
#[derive(Debug, thiserror::Error)]
#[error("condition failed: {source}")]
pub struct ConditionError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl ConditionError {
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

#[async_trait]
pub trait Condition: Send + Sync {
    async fn check(&self, ctx: &InvocationContext) -> Result<Verdict, ConditionError>;
}

/// Adapts a synchronous closure into a `Condition`.
pub struct ConditionFn<F>(pub F);

#[async_trait]
impl<F> Condition for ConditionFn<F>
where
    F: Fn(&InvocationContext) -> Result<Verdict, ConditionError> + Send + Sync,
{
    async fn check(&self, ctx: &InvocationContext) -> Result<Verdict, ConditionError> {
        (self.0)(ctx)
    }
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub struct UseCase {
    name: String,
    initial: Vec<Arc<UseCase>>,
    condition: Arc<dyn Condition>,
}

impl std::fmt::Debug for UseCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UseCase")
            .field("name", &self.name)
            .field(
                "initial",
                &self.initial.iter().map(|u| u.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl UseCase {
    pub fn new(name: impl Into<String>, condition: impl Condition + 'static) -> Self {
        Self {
            name: name.into(),
            initial: Vec::new(),
            condition: Arc::new(condition),
        }
    }

    pub fn from_fn<F>(name: impl Into<String>, condition: F) -> Self
    where
        F: Fn(&InvocationContext) -> Result<Verdict, ConditionError> + Send + Sync + 'static,
    {
        Self::new(name, ConditionFn(condition))
    }

    pub fn with_initial(mut self, initial: Arc<UseCase>) -> Self {
        self.initial.push(initial);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial(&self) -> &[Arc<UseCase>] {
        &self.initial
    }

    /// Initial use cases first, then this one's condition.
    ///
    /// Boxed because the walk recurses through `initial`.
    pub fn is_met<'a>(
        &'a self,
        ctx: &'a InvocationContext,
    ) -> BoxFuture<'a, Result<Option<Denial>, ConditionError>> {
        Box::pin(async move {
            for initial in &self.initial {
                if let Some(denial) = initial.is_met(ctx).await? {
                    return Ok(Some(denial));
                }
            }
            trace!(use_case = %self.name, "checking condition");
            match self.condition.check(ctx).await? {
                Verdict::Satisfied => Ok(None),
                Verdict::Denied { reason } => Ok(Some(Denial {
                    use_case: self.name.clone(),
                    reason,
                })),
            }
        })
    }
}

/// Evaluate a chain in order; `Ok(None)` means every use case is satisfied.
pub async fn evaluate_chain(
    chain: &[Arc<UseCase>],
    ctx: &InvocationContext,
) -> Result<Option<Denial>, ConditionError> {
    for use_case in chain {
        if let Some(denial) = use_case.is_met(ctx).await? {
            return Ok(Some(denial));
        }
    }
    Ok(None)
}

/// Satisfied only for invocations from a guild.
pub fn guild_only() -> Arc<UseCase> {
    Arc::new(UseCase::from_fn("guild only", |ctx| {
        Ok(if ctx.is_guild() {
            Verdict::Satisfied
        } else {
            Verdict::deny("This command can only be used inside a server!")
        })
    }))
}

/// Satisfied only for invocations from a direct conversation.
pub fn direct_only() -> Arc<UseCase> {
    Arc::new(UseCase::from_fn("direct only", |ctx| {
        Ok(if ctx.is_guild() {
            Verdict::deny("This command can only be used in direct messages!")
        } else {
            Verdict::Satisfied
        })
    }))
}

/// The caller owns the guild. Runs `guild_only` first.
pub fn server_owner() -> Arc<UseCase> {
    let owner = UseCase::from_fn("server owner", |ctx| {
        Ok(match ctx.guild() {
            Some(guild) if guild.owner_id == ctx.caller.id => Verdict::Satisfied,
            _ => Verdict::deny("You are not the server owner for this guild!"),
        })
    });
    Arc::new(owner.with_initial(guild_only()))
}
