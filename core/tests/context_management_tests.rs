// tests/context_management_tests.rs
mod common;

use common::*;
use pipewright::settings::{DEBUG_VAR, DISABLE_LOGS_VAR, ENV_VAR, TRACE_LIMIT_VAR};
use pipewright::{Context, ContextData, ContextError, Settings};
use serde::{Deserialize, Serialize};
use serial_test::serial;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
  id: u64,
  name: String,
}

#[test]
fn test_context_typed_round_trip_and_loud_failures() {
  let mut ctx = Context::new();
  ctx
    .insert(
      "user",
      User {
        id: 1,
        name: "ann".to_string(),
      },
    )
    .unwrap();
  ctx.insert("attempts", 3u32).unwrap();

  let user: User = ctx.get("user").unwrap();
  assert_eq!(user.name, "ann");
  assert_eq!(ctx.get::<u32>("attempts").unwrap(), 3);

  assert!(matches!(ctx.get::<User>("missing"), Err(ContextError::MissingKey { key }) if key == "missing"));
  assert!(matches!(
    ctx.get::<u32>("user"),
    Err(ContextError::TypeMismatch { key, .. }) if key == "user"
  ));
  assert_eq!(ctx.get_opt::<u32>("missing").unwrap(), None);
  assert!(ctx.get_opt::<u32>("user").is_err());
}

#[test]
fn test_context_keeps_insertion_order() {
  let mut ctx = Context::new();
  ctx.insert_value("zeta", serde_json::json!(1));
  ctx.insert_value("alpha", serde_json::json!(2));
  ctx.insert_value("mid", serde_json::json!(3));

  let keys: Vec<&String> = ctx.keys().collect();
  assert_eq!(keys, vec!["zeta", "alpha", "mid"]);

  assert_eq!(ctx.remove("alpha"), Some(serde_json::json!(2)));
  assert_eq!(ctx.len(), 2);
  assert!(!ctx.contains("alpha"));
}

#[test]
fn test_context_data_snapshot_of_struct_and_map() {
  let typed = ContextData::new(TestContext {
    counter: 2,
    ..TestContext::default()
  });
  let snapshot = typed.snapshot();
  assert_eq!(snapshot["counter"], 2);
  assert!(snapshot.contains_key("steps_executed"));

  let mut map = Context::new();
  map.insert("k", "v").unwrap();
  let dynamic = ContextData::new(map);
  let snapshot = dynamic.snapshot();
  assert_eq!(snapshot.len(), 1);
  assert_eq!(snapshot["k"], "v");

  let scalar = ContextData::new(5u8);
  assert_eq!(scalar.snapshot()["value"], 5);
}

#[test]
fn test_context_data_clones_share_state() {
  let ctx = ContextData::new(TestContext::default());
  let other = ctx.clone();
  other.write().counter = 10;
  assert_eq!(ctx.read().counter, 10);
  assert!(ctx.same_context(&other));
  assert!(!ctx.same_context(&ContextData::new(TestContext::default())));
}

#[test]
fn test_settings_from_lookup() {
  let vars: HashMap<&str, &str> = [
    (DEBUG_VAR, "true"),
    (DISABLE_LOGS_VAR, "1"),
    (ENV_VAR, "Production"),
    (TRACE_LIMIT_VAR, "12"),
  ]
  .into_iter()
  .collect();

  let settings = Settings::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

  assert!(settings.debug);
  assert!(!settings.logs_enabled);
  assert!(settings.production);
  assert_eq!(settings.trace_value_limit, 12);
}

#[test]
fn test_settings_defaults_and_invalid_values() {
  let defaults = Settings::from_lookup(|_| None);
  assert_eq!(defaults, Settings::default());

  let settings = Settings::from_lookup(|name| match name {
    TRACE_LIMIT_VAR => Some("lots".to_string()),
    DEBUG_VAR => Some("nope".to_string()),
    ENV_VAR => Some("staging".to_string()),
    _ => None,
  });
  assert_eq!(settings.trace_value_limit, 60);
  assert!(!settings.debug);
  assert!(!settings.production);
}

#[test]
#[serial]
fn test_settings_from_env() {
  std::env::set_var(DEBUG_VAR, "yes");
  std::env::set_var(ENV_VAR, "production");
  let settings = Settings::from_env();
  std::env::remove_var(DEBUG_VAR);
  std::env::remove_var(ENV_VAR);

  assert!(settings.debug);
  assert!(settings.production);
  assert!(settings.logs_enabled);
}
