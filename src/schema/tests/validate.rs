// SPDX-License-Identifier: MIT

#![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)] // tests panic/unwrap to assert exact error shapes

use super::suite::{compiled, value};
use crate::schema::error::{ErrorFlag, ErrorHandler, ErrorRecorder, ErrorTrap};
use crate::{Validator, Value};
use core::ops::ControlFlow;
use serde_json::json;
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_error_paths_for_nested_properties() {
    let v = compiled(json!({
        "type": "object",
        "properties": {
            "a": {
                "type": "object",
                "properties": {"b": {"type": "integer"}}
            }
        }
    }));
    let mut recorder = ErrorRecorder::default();
    v.validate_with_handler(&value(json!({"a": {"b": "x"}})), &mut recorder);
    assert_eq!(recorder.errors().len(), 1);
    assert_eq!(recorder.errors()[0].path.as_ref(), "[a].b");
}

#[test]
fn test_error_paths_for_array_items() {
    let v = compiled(json!({"type": "array", "items": {"type": "integer"}}));
    let mut recorder = ErrorRecorder::default();
    v.validate_with_handler(&value(json!([1, "x", 3.5])), &mut recorder);
    let paths: Vec<&str> = recorder.errors().iter().map(|e| e.path.as_ref()).collect();
    assert_eq!(paths, vec!["[1]", "[2]"]);
}

#[test]
fn test_error_records_offending_instance() {
    let v = compiled(json!({"type": "integer"}));
    let mut recorder = ErrorRecorder::default();
    v.validate_with_handler(&Value::from("oops"), &mut recorder);
    assert_eq!(recorder.errors()[0].instance, Value::from("oops"));
}

#[test]
fn test_validation_error_display() {
    let v = compiled(json!({"type": "object", "properties": {"a": {"type": "integer"}}}));
    let error = v.validate(&value(json!({"a": "x"}))).unwrap_err();
    let rendered = error.to_string();
    assert!(rendered.contains("at '[a]'"));
    assert!(rendered.contains("unexpected instance type"));
}

#[test]
fn test_validate_returns_first_error() {
    let v = compiled(json!({"type": "object", "required": ["a", "b"]}));
    let error = v.validate(&Value::new_object()).unwrap_err();
    assert!(error.message.contains("'a'"));
}

#[test]
fn test_error_flag_only_remembers() {
    let mut flag = ErrorFlag::default();
    assert!(!flag.has_error());
    assert_eq!(
        flag.error("", &Value::Null, "anything"),
        ControlFlow::Continue(())
    );
    assert!(flag.has_error());
}

#[test]
fn test_error_trap_keeps_first_and_breaks() {
    let mut trap = ErrorTrap::default();
    assert!(!trap.has_error());
    assert_eq!(
        trap.error("p", &Value::Null, "first"),
        ControlFlow::Break(())
    );
    assert_eq!(
        trap.error("q", &Value::Null, "second"),
        ControlFlow::Break(())
    );
    let error = trap.into_error().unwrap();
    assert_eq!(error.message.as_ref(), "first");
    assert_eq!(error.path.as_ref(), "p");
}

#[test]
fn test_fail_fast_stops_the_walk() {
    // the first failure must end the walk: the checker for property "b" is
    // never invoked when "a" already failed
    let calls = Rc::new(Cell::new(0));
    let seen = calls.clone();
    let mut validator = Validator::new();
    validator.set_format_checker(move |_, _| {
        seen.set(seen.get() + 1);
        anyhow::bail!("rejected")
    });
    validator
        .set_root_schema(&value(json!({
            "type": "object",
            "properties": {
                "a": {"type": "string", "format": "checked"},
                "b": {"type": "string", "format": "checked"}
            }
        })))
        .unwrap();

    let instance = value(json!({"a": "x", "b": "y"}));
    assert!(validator.validate(&instance).is_err());
    assert_eq!(calls.get(), 1);

    // an accumulating handler lets the walk finish and sees both failures
    let mut recorder = ErrorRecorder::default();
    validator.validate_with_handler(&instance, &mut recorder);
    assert_eq!(recorder.errors().len(), 2);
    assert_eq!(calls.get(), 3);
}

#[test]
fn test_validate_without_root_schema() {
    let validator = Validator::new();
    let error = validator.validate(&Value::from(1)).unwrap_err();
    assert!(error.message.contains("no root schema"));
}

#[test]
fn test_format_with_checker() {
    let mut validator = Validator::new();
    validator.set_format_checker(|format, text| match format {
        "even-length" if text.len() % 2 == 0 => Ok(()),
        "even-length" => anyhow::bail!("length is odd"),
        _ => Ok(()),
    });
    validator
        .set_root_schema(&value(json!({"type": "string", "format": "even-length"})))
        .unwrap();

    assert!(validator.validate(&Value::from("ab")).is_ok());
    let error = validator.validate(&Value::from("abc")).unwrap_err();
    assert!(error.message.contains("length is odd"));
}

#[test]
fn test_format_with_permissive_checker() {
    // unknown formats are the checker's call; this one accepts them
    let mut validator = Validator::new();
    validator.set_format_checker(|_, _| Ok(()));
    validator
        .set_root_schema(&value(json!({"type": "string", "format": "exotic"})))
        .unwrap();
    assert!(validator.validate(&Value::from("anything")).is_ok());
}

#[test]
fn test_format_without_checker_reports() {
    let v = compiled(json!({"type": "string", "format": "date-time"}));
    let error = v.validate(&Value::from("2026-01-01")).unwrap_err();
    assert!(error.message.contains("format checker was not provided"));
}

#[test]
fn test_scratch_failures_do_not_leak() {
    // `not`, `if` and `contains` consult sub-validations internally; only
    // the policy-level outcome may reach the handler
    let v = compiled(json!({
        "type": "array",
        "contains": {"type": "string"}
    }));
    let mut recorder = ErrorRecorder::default();
    v.validate_with_handler(&value(json!([1, "x", 2])), &mut recorder);
    assert!(!recorder.has_error());

    let v = compiled(json!({"if": {"type": "integer"}, "then": {"minimum": 0}}));
    let mut recorder = ErrorRecorder::default();
    v.validate_with_handler(&Value::from("text"), &mut recorder);
    assert!(!recorder.has_error());
}
