// ABOUTME: Tests for InputSchema - validation, defaults, constraints,
// ABOUTME: pass-through of undeclared keys, and JSON Schema rendering.

use serde_json::json;

use super::*;
use crate::error::ToolError;

fn stats_schema() -> InputSchema {
    InputSchema::new()
        .param(ParamSpec::string("country").describe("Country name").required())
        .param(ParamSpec::integer("start_year").range(Some(1900.0), Some(2100.0)))
        .param(ParamSpec::string("mode").default_value("mean").one_of(["mean", "median"]))
}

#[test]
fn test_valid_arguments_pass_through() {
    let args = stats_schema()
        .validate(&json!({"country": "Austria", "start_year": 1980, "mode": "median"}))
        .unwrap();
    assert_eq!(args["country"], "Austria");
    assert_eq!(args["start_year"], 1980);
    assert_eq!(args["mode"], "median");
}

#[test]
fn test_default_inserted_for_missing_param() {
    let args = stats_schema().validate(&json!({"country": "France"})).unwrap();
    assert_eq!(args["mode"], "mean");
    assert!(!args.contains_key("start_year"));
}

#[test]
fn test_missing_required_param() {
    let err = stats_schema().validate(&json!({"start_year": 1980})).unwrap_err();
    match err {
        ToolError::InvalidArguments(msg) => assert!(msg.contains("country")),
        other => panic!("Expected InvalidArguments, got {:?}", other),
    }
}

#[test]
fn test_wrong_type_rejected() {
    let err = stats_schema()
        .validate(&json!({"country": "Austria", "start_year": "1980"}))
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidArguments(_)));
}

#[test]
fn test_whole_float_accepted_as_integer() {
    let args = stats_schema()
        .validate(&json!({"country": "Austria", "start_year": 1980.0}))
        .unwrap();
    assert_eq!(args["start_year"], 1980.0);
}

#[test]
fn test_range_and_enum_constraints() {
    let schema = stats_schema();
    assert!(schema.validate(&json!({"country": "A", "start_year": 1800})).is_err());
    assert!(schema.validate(&json!({"country": "A", "mode": "mode"})).is_err());
}

#[test]
fn test_null_allowed_for_optional_only() {
    let schema = stats_schema();
    let args = schema
        .validate(&json!({"country": "Austria", "start_year": null}))
        .unwrap();
    assert!(args["start_year"].is_null());
    assert!(schema.validate(&json!({"country": null})).is_err());
}

#[test]
fn test_null_and_non_object_input() {
    let schema = InputSchema::new().param(ParamSpec::integer("n").default_value(5));
    let args = schema.validate(&serde_json::Value::Null).unwrap();
    assert_eq!(args["n"], 5);

    assert!(schema.validate(&json!(["n", 5])).is_err());
}

#[test]
fn test_check_rejects_duplicates_and_bad_defaults() {
    let dup = InputSchema::new()
        .param(ParamSpec::string("a"))
        .param(ParamSpec::integer("a"));
    assert!(dup.check().is_err());

    let bad_default = InputSchema::new().param(ParamSpec::integer("n").default_value("five"));
    assert!(bad_default.check().is_err());

    assert!(stats_schema().check().is_ok());
}

#[test]
fn test_json_schema_rendering() {
    let rendered = stats_schema().to_json_schema();
    assert_eq!(rendered["type"], "object");
    assert_eq!(rendered["required"], json!(["country"]));
    assert_eq!(rendered["properties"]["country"]["description"], "Country name");
    assert_eq!(rendered["properties"]["start_year"]["minimum"], 1900.0);
    assert_eq!(rendered["properties"]["mode"]["default"], "mean");
    assert_eq!(rendered["properties"]["mode"]["enum"], json!(["mean", "median"]));
}
