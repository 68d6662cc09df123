//! JSON schema validators for qlreport DTOs.
//!
//! Schemas are generated from the types with schemars, the same way
//! `cargo xtask schema` generates the files under `schemas/`.

use jsonschema::JSONSchema;
use qlreport_types::{ConfigFile, QueryRunMetadata, ResultIndex};
use schemars::JsonSchema;
use serde::Serialize;

/// Error type for schema validation failures.
#[derive(Debug)]
pub struct SchemaValidationError {
    pub errors: Vec<String>,
}

impl std::fmt::Display for SchemaValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Schema validation failed: {}", self.errors.join("; "))
    }
}

impl std::error::Error for SchemaValidationError {}

/// Compiles the schemars schema of `T`.
pub fn compile_schema<T: JsonSchema>() -> JSONSchema {
    let schema = schemars::schema_for!(T);
    let value = serde_json::to_value(&schema).expect("schema should serialize");
    JSONSchema::compile(&value).expect("schema should compile")
}

/// Validates `value` against the schema generated for its own type.
pub fn validate_as<T: JsonSchema + Serialize>(value: &T) -> Result<(), SchemaValidationError> {
    let json = serde_json::to_value(value).expect("value should serialize to JSON");
    validate_json_as::<T>(&json)
}

/// Validates arbitrary JSON (e.g. a file the CLI wrote) against `T`'s schema.
pub fn validate_json_as<T: JsonSchema>(
    json: &serde_json::Value,
) -> Result<(), SchemaValidationError> {
    let schema = compile_schema::<T>();
    let result = schema.validate(json);
    match result {
        Ok(()) => Ok(()),
        Err(errors) => Err(SchemaValidationError {
            errors: errors.map(|e| e.to_string()).collect(),
        }),
    }
}

pub fn validate_result_index(index: &ResultIndex) -> Result<(), SchemaValidationError> {
    validate_as(index)
}

pub fn validate_config_file(config: &ConfigFile) -> Result<(), SchemaValidationError> {
    validate_as(config)
}

pub fn validate_run_metadata(meta: &QueryRunMetadata) -> Result<(), SchemaValidationError> {
    validate_as(meta)
}
