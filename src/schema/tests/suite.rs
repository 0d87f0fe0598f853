// SPDX-License-Identifier: MIT

#![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)] // tests panic/unwrap to assert exact error shapes

use crate::schema::error::ErrorRecorder;
use crate::{Validator, Value};
use serde_json::json;

pub(crate) fn value(json: serde_json::Value) -> Value {
    serde_json::from_value(json).unwrap()
}

pub(crate) fn compiled(schema: serde_json::Value) -> Validator {
    let mut validator = Validator::new();
    validator.set_root_schema(&value(schema)).unwrap();
    validator
}

pub(crate) fn try_compile(schema: serde_json::Value) -> anyhow::Result<Validator> {
    let mut validator = Validator::new();
    validator.set_root_schema(&value(schema))?;
    Ok(validator)
}

pub(crate) fn errors_for(validator: &Validator, instance: serde_json::Value) -> Vec<String> {
    let mut recorder = ErrorRecorder::default();
    validator.validate_with_handler(&value(instance), &mut recorder);
    recorder
        .errors()
        .iter()
        .map(|e| e.message.to_string())
        .collect()
}

pub(crate) fn valid(validator: &Validator, instance: serde_json::Value) -> bool {
    errors_for(validator, instance).is_empty()
}

#[test]
fn test_integer_bounds() {
    let v = compiled(json!({"type": "integer", "minimum": 0, "maximum": 10}));
    assert!(valid(&v, json!(5)));
    assert!(valid(&v, json!(0)));
    assert!(valid(&v, json!(10)));

    let errors = errors_for(&v, json!(11));
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("exceeds maximum of 10"));

    let errors = errors_for(&v, json!(-1));
    assert!(errors[0].contains("is below minimum of 0"));

    let errors = errors_for(&v, json!("5"));
    assert_eq!(errors, vec!["unexpected instance type"]);
}

#[test]
fn test_exclusive_bound_replaces_inclusive() {
    // the exclusive bound is read last and wins
    let v = compiled(json!({"type": "integer", "minimum": 0, "exclusiveMinimum": 5}));
    assert!(valid(&v, json!(6)));
    assert!(!valid(&v, json!(5)));
    assert!(!valid(&v, json!(0)));

    let v = compiled(json!({"type": "integer", "maximum": 10, "exclusiveMaximum": 5}));
    assert!(valid(&v, json!(4)));
    assert!(!valid(&v, json!(5)));
}

#[test]
fn test_multiple_of() {
    let v = compiled(json!({"type": "number", "multipleOf": 1.5}));
    assert!(valid(&v, json!(4.5)));
    assert!(valid(&v, json!(3)));
    // zero is a multiple of everything
    assert!(valid(&v, json!(0)));
    let errors = errors_for(&v, json!(5));
    assert!(errors[0].contains("is not a multiple of 1.5"));
}

#[test]
fn test_number_covers_integer_instances() {
    let v = compiled(json!({"type": "number", "maximum": 2.5}));
    assert!(valid(&v, json!(2)));
    assert!(valid(&v, json!(2.5)));
    assert!(!valid(&v, json!(3)));
}

#[test]
fn test_string_lengths_count_code_points() {
    let v = compiled(json!({"type": "string", "minLength": 3, "maxLength": 5}));
    // five code points, six bytes
    assert!(valid(&v, json!("héllo")));
    assert!(valid(&v, json!("abc")));

    let errors = errors_for(&v, json!("hé"));
    assert!(errors[0].contains("too short as per minLength (3)"));

    let errors = errors_for(&v, json!("héllo!"));
    assert!(errors[0].contains("too long as per maxLength (5)"));
}

#[test]
fn test_pattern_is_search_not_full_match() {
    let v = compiled(json!({"type": "string", "pattern": "ll"}));
    assert!(valid(&v, json!("hello")));
    let errors = errors_for(&v, json!("heart"));
    assert!(errors[0].contains("does not match regex pattern: ll"));
}

#[test]
fn test_invalid_pattern_fails_compilation() {
    let error = try_compile(json!({"type": "string", "pattern": "("})).unwrap_err();
    assert!(error.to_string().contains("invalid regex pattern"));
}

#[test]
fn test_type_list() {
    let v = compiled(json!({"type": ["integer", "string"]}));
    assert!(valid(&v, json!(5)));
    assert!(valid(&v, json!(-5)));
    assert!(valid(&v, json!("x")));
    assert_eq!(errors_for(&v, json!(true)), vec!["unexpected instance type"]);
    assert_eq!(errors_for(&v, json!(1.5)), vec!["unexpected instance type"]);
}

#[test]
fn test_boolean_schemas() {
    let accept = compiled(json!(true));
    assert!(valid(&accept, json!({"anything": [1, 2, 3]})));

    let reject = compiled(json!(false));
    let errors = errors_for(&reject, json!(1));
    assert!(errors[0].contains("false-schema"));
}

#[test]
fn test_null_type() {
    let v = compiled(json!({"type": "null"}));
    assert!(valid(&v, json!(null)));
    assert_eq!(errors_for(&v, json!(0)), vec!["unexpected instance type"]);
}

#[test]
fn test_enum_uses_deep_equality() {
    let v = compiled(json!({"enum": [1, "two", [3], {"a": 4}]}));
    assert!(valid(&v, json!(1)));
    // numerically equal across tags
    assert!(valid(&v, json!(1.0)));
    assert!(valid(&v, json!("two")));
    assert!(valid(&v, json!([3])));
    assert!(valid(&v, json!({"a": 4})));

    let errors = errors_for(&v, json!(2));
    assert_eq!(errors, vec!["instance not found in required enum"]);
}

#[test]
fn test_const() {
    let v = compiled(json!({"const": {"x": 1}}));
    assert!(valid(&v, json!({"x": 1})));
    assert!(valid(&v, json!({"x": 1.0})));
    assert_eq!(errors_for(&v, json!({"x": 2})), vec!["instance not const"]);
}

#[test]
fn test_one_of_counts_aliased_number_validator() {
    // an integer instance satisfies both branches because the "number"
    // validator is reused for integer instances
    let v = compiled(json!({"oneOf": [{"type": "integer"}, {"type": "number"}]}));
    let errors = errors_for(&v, json!(3));
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("more than one subschema has succeeded"));

    assert!(valid(&v, json!(1.5)));
}

#[test]
fn test_empty_combinations() {
    // an empty allOf accepts; empty anyOf and oneOf reject
    assert!(valid(&compiled(json!({"allOf": []})), json!(1)));

    let errors = errors_for(&compiled(json!({"anyOf": []})), json!(1));
    assert!(errors[0].contains("no subschema has succeeded"));

    let errors = errors_for(&compiled(json!({"oneOf": []})), json!(1));
    assert!(errors[0].contains("no subschema has succeeded"));
}

#[test]
fn test_all_of() {
    let v = compiled(json!({"allOf": [{"minimum": 0}, {"maximum": 10}]}));
    assert!(valid(&v, json!(5)));
    let errors = errors_for(&v, json!(11));
    assert!(errors[0].contains("all of them are required"));
}

#[test]
fn test_any_of() {
    let v = compiled(json!({"anyOf": [{"type": "string"}, {"type": "integer"}]}));
    assert!(valid(&v, json!("x")));
    assert!(valid(&v, json!(5)));
    assert!(!valid(&v, json!(1.5)));
}

#[test]
fn test_not() {
    let v = compiled(json!({"not": {"type": "string"}}));
    assert!(valid(&v, json!(5)));
    let errors = errors_for(&v, json!("x"));
    assert!(errors[0].contains("should NOT"));
}

#[test]
fn test_double_negation_is_identity() {
    let v = compiled(json!({"not": {"not": {"type": "integer"}}}));
    let plain = compiled(json!({"type": "integer"}));
    for instance in [json!(5), json!("x"), json!(1.5), json!(null)] {
        assert_eq!(
            valid(&v, instance.clone()),
            valid(&plain, instance.clone()),
            "double negation disagrees for {instance}"
        );
    }
}

#[test]
fn test_if_then_else() {
    let v = compiled(json!({
        "if": {"type": "integer"},
        "then": {"minimum": 0},
        "else": {"type": "string"}
    }));
    let errors = errors_for(&v, json!(-1));
    assert!(errors[0].contains("is below minimum of 0"));
    assert!(valid(&v, json!(1)));
    assert!(valid(&v, json!("x")));
}

#[test]
fn test_if_without_applicable_branch() {
    let v = compiled(json!({"if": {"type": "integer"}, "then": {"minimum": 0}}));
    // condition fails and there is no else: nothing to check
    assert!(valid(&v, json!("x")));
    assert!(!valid(&v, json!(-1)));
}

#[test]
fn test_required_properties() {
    let v = compiled(json!({
        "type": "object",
        "required": ["a"],
        "properties": {"a": {"type": "integer"}}
    }));
    assert!(valid(&v, json!({"a": 1})));

    let errors = errors_for(&v, json!({"b": 1}));
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("required property 'a' not found"));
}

#[test]
fn test_properties_without_type_keyword() {
    let v = compiled(json!({"properties": {"a": {"type": "integer"}}}));
    assert!(valid(&v, json!({"a": 1})));
    assert!(!valid(&v, json!({"a": "x"})));
    // non-objects are untouched by object keywords
    assert!(valid(&v, json!(5)));
}

#[test]
fn test_additional_properties() {
    let v = compiled(json!({
        "type": "object",
        "properties": {"a": {"type": "integer"}},
        "additionalProperties": {"type": "string"}
    }));
    assert!(valid(&v, json!({"a": 1, "b": "x"})));
    assert!(!valid(&v, json!({"b": 5})));
}

#[test]
fn test_pattern_properties() {
    let v = compiled(json!({
        "type": "object",
        "patternProperties": {"^n_": {"type": "integer"}},
        "additionalProperties": false
    }));
    assert!(valid(&v, json!({"n_a": 1})));
    assert!(!valid(&v, json!({"n_a": "x"})));
    // nothing matched, so the false-schema applies
    assert!(!valid(&v, json!({"other": 1})));
}

#[test]
fn test_property_names() {
    let v = compiled(json!({"type": "object", "propertyNames": {"maxLength": 3}}));
    assert!(valid(&v, json!({"ab": 1, "abc": 2})));
    let errors = errors_for(&v, json!({"abcd": 1}));
    assert!(errors[0].contains("too long as per maxLength (3)"));
}

#[test]
fn test_property_count_bounds() {
    let v = compiled(json!({"type": "object", "minProperties": 1, "maxProperties": 2}));
    assert!(valid(&v, json!({"a": 1})));
    assert_eq!(errors_for(&v, json!({})), vec!["too few properties"]);
    assert_eq!(
        errors_for(&v, json!({"a": 1, "b": 2, "c": 3})),
        vec!["too many properties"]
    );
}

#[test]
fn test_dependencies_array_shorthand() {
    let v = compiled(json!({"type": "object", "dependencies": {"a": ["b"]}}));
    assert!(valid(&v, json!({})));
    assert!(valid(&v, json!({"b": 1})));
    assert!(valid(&v, json!({"a": 1, "b": 2})));

    let errors = errors_for(&v, json!({"a": 1}));
    assert!(errors[0].contains("required property 'b' not found in object as a dependency"));
}

#[test]
fn test_dependencies_schema_form() {
    let v = compiled(json!({
        "type": "object",
        "dependencies": {"a": {"required": ["c"]}}
    }));
    assert!(valid(&v, json!({"b": 1})));
    assert!(valid(&v, json!({"a": 1, "c": 1})));
    assert!(!valid(&v, json!({"a": 1})));
}

#[test]
fn test_unique_items() {
    let v = compiled(json!({"type": "array", "uniqueItems": true}));
    assert!(valid(&v, json!([1, 2, 3])));

    let errors = errors_for(&v, json!([1, 2, 1]));
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("items have to be unique"));

    // deep equality across number tags
    assert!(!valid(&v, json!([1, 1.0])));
}

#[test]
fn test_uniform_items() {
    let v = compiled(json!({"type": "array", "items": {"type": "integer"}}));
    assert!(valid(&v, json!([1, 2, 3])));
    assert!(valid(&v, json!([])));
    assert!(!valid(&v, json!([1, "x"])));
}

#[test]
fn test_tuple_items() {
    let v = compiled(json!({
        "type": "array",
        "items": [{"type": "integer"}, {"type": "string"}],
        "additionalItems": {"type": "boolean"}
    }));
    assert!(valid(&v, json!([1, "x", true, false])));
    assert!(!valid(&v, json!([1, 2])));
    assert!(!valid(&v, json!([1, "x", 5])));

    // without additionalItems, elements past the tuple are accepted
    let open = compiled(json!({
        "type": "array",
        "items": [{"type": "integer"}]
    }));
    assert!(valid(&open, json!([1, "anything", null])));
}

#[test]
fn test_array_size_bounds() {
    let v = compiled(json!({"type": "array", "minItems": 1, "maxItems": 2}));
    assert!(valid(&v, json!([1])));
    assert_eq!(errors_for(&v, json!([])), vec!["has too few items"]);
    assert_eq!(errors_for(&v, json!([1, 2, 3])), vec!["has too many items"]);
}

#[test]
fn test_contains() {
    let v = compiled(json!({"type": "array", "contains": {"type": "string"}}));
    assert!(valid(&v, json!([1, "x"])));
    let errors = errors_for(&v, json!([1, 2]));
    assert!(errors[0].contains("does not contain required element"));
}

#[test]
fn test_errors_accumulate() {
    let v = compiled(json!({"type": "object", "required": ["a", "b"]}));
    let errors = errors_for(&v, json!({}));
    assert_eq!(errors.len(), 2);
}

#[test]
fn test_validation_is_deterministic() {
    let v = compiled(json!({
        "type": "object",
        "required": ["a", "b"],
        "properties": {"c": {"type": "integer", "minimum": 0}}
    }));
    let instance = json!({"c": -1});
    let first = errors_for(&v, instance.clone());
    let second = errors_for(&v, instance);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_annotations_are_ignored() {
    let v = compiled(json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "bounded",
        "description": "an integer with bounds",
        "default": 5,
        "type": "integer",
        "maximum": 10
    }));
    assert!(valid(&v, json!(5)));
    assert!(!valid(&v, json!(11)));
}
