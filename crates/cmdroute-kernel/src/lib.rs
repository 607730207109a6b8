//! # cmdroute kernel
//!
//! Hierarchical command routing for chat-bot command surfaces: a caller
//! supplies a path of command tokens plus raw option values, and the kernel
//! resolves exactly one executable leaf, checks the permission chain that
//! guards it, coerces its typed parameters, and runs it.
//!
//! The kernel is **transport-agnostic**: it consumes abstract invocations and
//! option sources and returns structured outcomes. Gateways, persistence and
//! reply rendering live outside.
//!
//! ## Architecture
//!
//! ```text
//! Parameter             ← typed argument descriptor, coercion + validation
//!     │
//! UseCase               ← async permission predicate with prerequisite chain
//!     │
//! Node (Group | Leaf)   ← command tree, arena-owned, parent links by NodeId
//!     │
//! RegistryBuilder       ← startup-only mutation: attach, register roots
//!     │ freeze()
//! Registry              ← read-only root lookup, routing, reference strings
//!     │
//! router / export       ← path resolution │ 3-level descriptor flattening
//!     │
//! Dispatcher            ← route → permit → coerce → execute → outcome
//! ```

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod export;
pub mod invocation;
pub mod node;
pub mod option;
pub mod param;
pub mod predicate;
pub mod registry;
pub mod router;
pub mod toy;

pub use config::{ConfigError, DEFAULT_SEPARATOR, EngineConfig, PROTOCOL_MAX_DEPTH};
pub use context::{
    AttachmentRef, ChannelKind, ChannelRef, GuildOrigin, InvocationContext, Mentionable, Origin,
    RoleRef, Snowflake, UserRef,
};
pub use dispatch::{
    DISPATCH_OUTCOME_KIND, DispatchOutcome, DispatchStage, Dispatcher, failure_class,
};
pub use error::{RouteError, TreeError};
pub use export::{
    ChoiceDescriptor, CommandDescriptor, FlatCommand, FlatEntry, FlatGroup, OptionDescriptor,
    branches, export_all, export_command, flatten,
};
pub use invocation::{
    InteractionData, InteractionError, InteractionOption, InvocationRequest, ResolvedData,
};
pub use node::{
    Execute, ExecuteFn, ExecutionError, GroupDef, GroupNode, HandleableError, LeafDef, LeafNode,
    Node, NodeId, NodeKind,
};
pub use option::{OptionKind, OptionSource, OptionValue, OptionValues};
pub use param::{
    Arguments, ChannelRules, CheckFn, Choice, EntityResolver, FieldError, FieldErrorKind,
    MAX_EXACT_INTEGER, NumericRules, ParamKind, Parameter, ParseTextError, ResolverError,
    StringRules, TextResolveError, ValidationErrors, ValueChecker, resolve_parameters,
    resolve_text_parameters,
};
pub use predicate::{
    Condition, ConditionError, ConditionFn, Denial, UseCase, Verdict, direct_only,
    evaluate_chain, guild_only, server_owner,
};
pub use registry::{CommandModule, Registry, RegistryBuilder};
pub use router::{Resolution, normalize_path, resolve};
