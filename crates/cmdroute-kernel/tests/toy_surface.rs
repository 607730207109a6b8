//! Integration tests for the toy registry's outward surfaces: exported
//! descriptors, reference strings and free-text argument resolution.

use cmdroute_kernel::toy::{ToyDirectory, toy_registry};
use cmdroute_kernel::{
    EngineConfig, FieldErrorKind, GuildOrigin, InvocationContext, LeafDef, RegistryBuilder,
    Snowflake, TextResolveError, TreeError, UserRef, export_all, export_command, flatten,
    resolve_text_parameters,
};
use serde_json::json;
use std::collections::BTreeMap;

fn guild_ctx() -> InvocationContext {
    InvocationContext::in_guild(
        UserRef {
            id: Snowflake::new("100"),
            name: "ana".to_string(),
        },
        GuildOrigin {
            guild_id: Snowflake::new("1"),
            owner_id: Snowflake::new("100"),
            channel_id: Snowflake::new("400"),
            member_roles: Vec::new(),
        },
    )
}

fn inputs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

#[test]
fn deep_tree_exports_within_three_levels() {
    let registry = toy_registry(EngineConfig::default()).unwrap();
    let a = registry.lookup_root("a").unwrap();
    let descriptor = serde_json::to_value(export_command(&registry, a).unwrap()).unwrap();

    assert_eq!(
        descriptor,
        json!({
            "name": "a",
            "description": "Deep root",
            "options": [
                {
                    "type": 2,
                    "name": "b_c",
                    "description": "Second level",
                    "options": [
                        {"type": 1, "name": "d", "description": "Deepest leaf"},
                        {"type": 1, "name": "e", "description": "Deep sibling"}
                    ]
                },
                {
                    "type": 2,
                    "name": "b",
                    "description": "Second level",
                    "options": [
                        {"type": 1, "name": "f", "description": "Middle leaf"}
                    ]
                },
                {"type": 1, "name": "g", "description": "Shallow leaf"}
            ]
        })
    );
}

#[test]
fn every_toy_root_exports() {
    let registry = toy_registry(EngineConfig::default()).unwrap();
    let names: Vec<String> = export_all(&registry)
        .unwrap()
        .into_iter()
        .map(|descriptor| descriptor.name)
        .collect();
    assert_eq!(names, vec!["config", "a", "purge", "echo"]);

    let purge = registry.lookup_root("purge").unwrap();
    let descriptor = serde_json::to_value(export_command(&registry, purge).unwrap()).unwrap();
    assert_eq!(descriptor["options"][0]["channel_types"], json!([0, 5]));
    assert_eq!(descriptor["options"][1]["min_value"], json!(1));
    assert_eq!(descriptor["options"][1]["required"], json!(false));
}

#[test]
fn references_reflect_collapsed_paths() {
    let registry = toy_registry(EngineConfig::default()).unwrap();
    let d = registry.route(&["a", "b", "c", "d"]).unwrap().leaf;
    let f = registry.route(&["a", "b", "f"]).unwrap().leaf;
    assert_eq!(registry.reference(d).unwrap(), "/a b_c d");
    assert_eq!(registry.reference(f).unwrap(), "/a b f");
}

#[test]
fn toy_handles_are_refused_by_another_registry() {
    let toy = toy_registry(EngineConfig::default()).unwrap();
    let echo = toy.lookup_root("echo").unwrap();

    let mut builder = RegistryBuilder::default();
    let ping = builder.add_leaf(LeafDef::from_fn("ping", "Check latency", |_, _| Ok(())));
    builder.register_root(ping).unwrap();
    let small = builder.freeze().unwrap();

    assert!(small.node(echo).is_none());
    assert!(matches!(small.reference(echo), Err(TreeError::UnknownNode(_))));
    assert!(matches!(small.deploy_display(echo), Err(TreeError::UnknownNode(_))));
    assert!(matches!(export_command(&small, echo), Err(TreeError::UnknownNode(_))));
    assert!(matches!(flatten(&small, echo), Err(TreeError::UnknownNode(_))));
    assert!(export_command(&small, ping).is_ok());
}

#[test]
fn custom_separator_changes_collapsed_ids() {
    let registry = toy_registry(EngineConfig::default().with_separator("-")).unwrap();
    let a = registry.lookup_root("a").unwrap();
    let descriptor = export_command(&registry, a).unwrap();
    assert_eq!(descriptor.options[0].name, "b-c");
    assert!(registry.route(&["a", "b-c", "e"]).is_ok());
}

#[tokio::test]
async fn purge_arguments_resolve_from_text() {
    let registry = toy_registry(EngineConfig::default()).unwrap();
    let purge = registry.lookup_root("purge").unwrap();
    let leaf = registry.node(purge).unwrap().as_leaf().unwrap();

    let arguments = resolve_text_parameters(
        leaf.parameters(),
        &inputs(&[("channel", "400"), ("count", "25")]),
        &guild_ctx(),
        &ToyDirectory,
    )
    .await
    .unwrap();
    assert_eq!(arguments.channel("channel").unwrap().name, "general");
    assert_eq!(arguments.integer("count"), Some(25));
}

#[tokio::test]
async fn purge_text_failures_aggregate() {
    let registry = toy_registry(EngineConfig::default()).unwrap();
    let purge = registry.lookup_root("purge").unwrap();
    let leaf = registry.node(purge).unwrap().as_leaf().unwrap();

    let err = resolve_text_parameters(
        leaf.parameters(),
        &inputs(&[("channel", "401"), ("count", "many")]),
        &guild_ctx(),
        &ToyDirectory,
    )
    .await
    .unwrap_err();
    let errors = match err {
        TextResolveError::Invalid(errors) => errors,
        other => panic!("expected field errors, got {other:?}"),
    };
    assert_eq!(errors.parameter_names(), vec!["channel", "count"]);
    assert!(matches!(
        errors.for_parameter("count").unwrap().kind,
        FieldErrorKind::NotInteger { .. }
    ));

    let err = resolve_text_parameters(
        leaf.parameters(),
        &inputs(&[("channel", "999")]),
        &guild_ctx(),
        &ToyDirectory,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, TextResolveError::Lookup(_)));
}
