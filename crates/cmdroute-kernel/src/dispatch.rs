//! Invocation dispatch: route → permit → coerce → execute.
//!
//! The dispatcher never returns `Err`. Every per-invocation failure is
//! folded into a `DispatchOutcome` at this boundary so the presentation
//! layer only ever sees one of the documented categories. Unexpected
//! failures are logged here with full detail and reach the caller as a
//! classification label only.
//!
//! Execution runs on its own tokio task, so a panicking command ends its
//! own invocation and nothing else.

use crate::error::RouteError;
use crate::invocation::InvocationRequest;
use crate::node::ExecutionError;
use crate::param::{Arguments, ValidationErrors, resolve_parameters};
use crate::predicate::{Denial, evaluate_chain};
use crate::registry::Registry;
use crate::router;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{Instrument, debug, error, info, info_span};

pub mod failure_class {
    pub const UNKNOWN_COMMAND: &str = "unknown_command";
    pub const COMMAND_NOT_FOUND: &str = "command_not_found";
    pub const PERMISSION_DENIED: &str = "permission_denied";
    pub const INVALID_ARGUMENTS: &str = "invalid_arguments";
    pub const HANDLED_FAILURE: &str = "handled_failure";
    pub const UNEXPECTED_FAILURE: &str = "unexpected_failure";
    pub const INVALID_REQUEST: &str = "invalid_request";
}

pub const DISPATCH_OUTCOME_KIND: &str = "cmdroute.dispatch_outcome.v1";

/// Classification given to a condition that failed instead of denying.
pub const CONDITION_FAILURE_LABEL: &str = "permission_check";
/// Classification given to a command that panicked.
pub const PANIC_LABEL: &str = "panic";

/// Linear pipeline position. Failures report the last stage reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStage {
    Idle,
    Routed,
    PermissionChecked,
    ParamsResolved,
    Executed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// `command` is the leaf's reference string.
    Executed {
        command: String,
        arguments: Arguments,
    },
    UnknownCommand {
        name: String,
    },
    CommandNotFound {
        path: String,
    },
    PermissionDenied {
        denial: Denial,
    },
    InvalidArguments {
        errors: ValidationErrors,
    },
    HandledFailure {
        message: String,
    },
    UnexpectedFailure {
        stage: DispatchStage,
        classification: String,
    },
}

impl From<RouteError> for DispatchOutcome {
    fn from(err: RouteError) -> Self {
        match err {
            RouteError::UnknownCommand { name } => Self::UnknownCommand { name },
            RouteError::CommandNotFound { path } => Self::CommandNotFound { path },
        }
    }
}

impl DispatchOutcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, Self::Executed { .. })
    }

    /// Stable failure class label; `None` on success.
    pub fn failure_class(&self) -> Option<&'static str> {
        match self {
            Self::Executed { .. } => None,
            Self::UnknownCommand { .. } => Some(failure_class::UNKNOWN_COMMAND),
            Self::CommandNotFound { .. } => Some(failure_class::COMMAND_NOT_FOUND),
            Self::PermissionDenied { .. } => Some(failure_class::PERMISSION_DENIED),
            Self::InvalidArguments { .. } => Some(failure_class::INVALID_ARGUMENTS),
            Self::HandledFailure { .. } => Some(failure_class::HANDLED_FAILURE),
            Self::UnexpectedFailure { .. } => Some(failure_class::UNEXPECTED_FAILURE),
        }
    }

    pub fn stage(&self) -> DispatchStage {
        match self {
            Self::Executed { .. } => DispatchStage::Executed,
            Self::UnknownCommand { .. } | Self::CommandNotFound { .. } => DispatchStage::Idle,
            Self::PermissionDenied { .. } => DispatchStage::Routed,
            Self::InvalidArguments { .. } => DispatchStage::PermissionChecked,
            Self::HandledFailure { .. } => DispatchStage::ParamsResolved,
            Self::UnexpectedFailure { stage, .. } => *stage,
        }
    }

    /// Plain-text summary suitable for a reply.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Executed { command, .. } => format!("{command} executed"),
            Self::UnknownCommand { name } => format!("`{name}` is not a command."),
            Self::CommandNotFound { path } => format!("`{path}` is not a valid command."),
            Self::PermissionDenied { denial } => {
                format!("You cannot use this command! {}", denial.reason)
            }
            Self::InvalidArguments { errors } => errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
            Self::HandledFailure { message } => message.clone(),
            Self::UnexpectedFailure { classification, .. } => {
                format!("There was an error while executing this command! `{classification}`")
            }
        }
    }

    /// Versioned JSON envelope with `accepted`/`rejected` result.
    pub fn to_envelope(&self) -> Value {
        let mut envelope = serde_json::json!({
            "schema": 1,
            "outcomeKind": DISPATCH_OUTCOME_KIND,
            "result": if self.is_executed() { "accepted" } else { "rejected" },
            "failureClasses": self.failure_class().into_iter().collect::<Vec<_>>(),
            "stage": self.stage(),
            "diagnostic": self.diagnostic(),
        });
        let Some(obj) = envelope.as_object_mut() else {
            return envelope;
        };
        match self {
            Self::Executed { command, arguments } => {
                obj.insert("command".to_string(), Value::String(command.clone()));
                obj.insert(
                    "arguments".to_string(),
                    serde_json::to_value(arguments).unwrap_or(Value::Null),
                );
            }
            Self::UnknownCommand { name } => {
                obj.insert("command".to_string(), Value::String(name.clone()));
            }
            Self::CommandNotFound { path } => {
                obj.insert("command".to_string(), Value::String(path.clone()));
            }
            Self::PermissionDenied { denial } => {
                obj.insert(
                    "denial".to_string(),
                    serde_json::to_value(denial).unwrap_or(Value::Null),
                );
            }
            Self::InvalidArguments { errors } => {
                obj.insert(
                    "errors".to_string(),
                    serde_json::to_value(&errors.errors).unwrap_or(Value::Null),
                );
            }
            Self::HandledFailure { .. } => {}
            Self::UnexpectedFailure { classification, .. } => {
                obj.insert(
                    "classification".to_string(),
                    Value::String(classification.clone()),
                );
            }
        }
        envelope
    }
}

/// Shared, cloneable entry point over a frozen registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn from_shared(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Must run inside a tokio runtime; execution is spawned onto it.
    pub async fn dispatch(&self, request: InvocationRequest) -> DispatchOutcome {
        let span = info_span!(
            "dispatch",
            command = request.command().unwrap_or_default(),
            origin = request.context.scope_label(),
        );
        async {
            let outcome = self.run(request).await;
            debug!(
                stage = ?outcome.stage(),
                failure_class = outcome.failure_class().unwrap_or("none"),
                "dispatch finished"
            );
            outcome
        }
        .instrument(span)
        .await
    }

    /// Parse a JSON request and return the outcome envelope as JSON text.
    pub async fn dispatch_json(&self, request_json: &str) -> String {
        let envelope = match serde_json::from_str::<InvocationRequest>(request_json) {
            Ok(request) => self.dispatch(request).await.to_envelope(),
            Err(source) => serde_json::json!({
                "schema": 1,
                "outcomeKind": DISPATCH_OUTCOME_KIND,
                "result": "rejected",
                "failureClasses": [failure_class::INVALID_REQUEST],
                "stage": DispatchStage::Idle,
                "diagnostic": format!("invalid invocation request: {source}"),
            }),
        };
        envelope.to_string()
    }

    async fn run(&self, request: InvocationRequest) -> DispatchOutcome {
        let registry = &self.registry;

        let Some((name, rest)) = request.path.split_first() else {
            return DispatchOutcome::UnknownCommand {
                name: String::new(),
            };
        };
        let Some(root) = registry.lookup_root(name) else {
            debug!(name = %name, "no root registered under name");
            return DispatchOutcome::UnknownCommand { name: name.clone() };
        };
        let resolution = match router::resolve(registry, root, rest) {
            Ok(resolution) => resolution,
            Err(err) => return err.into(),
        };

        match evaluate_chain(&resolution.chain, &request.context).await {
            Ok(None) => {}
            Ok(Some(denial)) => {
                debug!(use_case = %denial.use_case, "permission denied");
                return DispatchOutcome::PermissionDenied { denial };
            }
            Err(err) => {
                error!(error = %err, "permission condition failed");
                return DispatchOutcome::UnexpectedFailure {
                    stage: DispatchStage::Routed,
                    classification: CONDITION_FAILURE_LABEL.to_string(),
                };
            }
        }

        let Some(leaf) = registry.at(resolution.leaf).as_leaf() else {
            error!("resolution ended on a group");
            return DispatchOutcome::UnexpectedFailure {
                stage: DispatchStage::PermissionChecked,
                classification: "routing".to_string(),
            };
        };
        let arguments = match resolve_parameters(leaf.parameters(), &request.options).await {
            Ok(arguments) => arguments,
            Err(errors) => {
                debug!(failures = errors.len(), "argument validation failed");
                return DispatchOutcome::InvalidArguments { errors };
            }
        };

        let executor = leaf.executor();
        let context = request.context;
        let task_arguments = arguments.clone();
        let handle =
            tokio::spawn(async move { executor.execute(&context, &task_arguments).await });

        match handle.await {
            Ok(Ok(())) => DispatchOutcome::Executed {
                command: registry.reference_of(resolution.leaf),
                arguments,
            },
            Ok(Err(ExecutionError::Handleable(err))) => {
                info!(error = %err, "command reported a handled failure");
                DispatchOutcome::HandledFailure {
                    message: err.display_message().to_string(),
                }
            }
            Ok(Err(ExecutionError::Unexpected { label, source })) => {
                error!(label = %label, error = %source, "command failed unexpectedly");
                DispatchOutcome::UnexpectedFailure {
                    stage: DispatchStage::ParamsResolved,
                    classification: label,
                }
            }
            Err(join) => {
                let classification = if join.is_panic() { PANIC_LABEL } else { "cancelled" };
                error!(error = %join, "command task did not complete");
                DispatchOutcome::UnexpectedFailure {
                    stage: DispatchStage::ParamsResolved,
                    classification: classification.to_string(),
                }
            }
        }
    }
}
