//! Structural validation seam.
//!
//! The engine does not interpret attribute values itself. Deciding whether a
//! request document conforms to a rule schema (types, enums, numeric bounds,
//! and the value semantics of `anyOf`/`allOf`/`oneOf`/`not`) is delegated to
//! a [`StructuralValidator`]. [`JsonSchemaValidator`] is the default backend.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

// ============================================================================
// Contract
// ============================================================================

/// Result of checking one document against a compiled schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Whether the document satisfies the schema.
    pub valid: bool,
    /// Human-readable violations; empty when `valid`.
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}

/// The validator refused to compile a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema rejected by validator: {0}")]
pub struct CompileError(pub String);

/// The validator failed while checking a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validator failure: {0}")]
pub struct ValidatorError(pub String);

/// Compiles schemas into reusable checkers.
///
/// Implementations must not mutate the schema, and compiled schemas must
/// treat a namespace missing from the document as its declared `default`.
pub trait StructuralValidator: Send + Sync {
    fn compile(&self, schema: &Value) -> Result<Box<dyn CompiledSchema>, CompileError>;
}

/// A schema ready to check request documents.
pub trait CompiledSchema: Send + Sync + fmt::Debug {
    fn validate(&self, document: &Value) -> Result<ValidationOutcome, ValidatorError>;
}

// ============================================================================
// jsonschema backend
// ============================================================================

/// [`StructuralValidator`] backed by the `jsonschema` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaValidator;

impl StructuralValidator for JsonSchemaValidator {
    fn compile(&self, schema: &Value) -> Result<Box<dyn CompiledSchema>, CompileError> {
        let compiled =
            jsonschema::JSONSchema::compile(schema).map_err(|e| CompileError(e.to_string()))?;

        Ok(Box::new(JsonSchemaCompiled {
            compiled,
            defaults: top_level_defaults(schema),
        }))
    }
}

struct JsonSchemaCompiled {
    compiled: jsonschema::JSONSchema,
    /// `(property, default)` pairs declared directly under the root.
    defaults: Vec<(String, Value)>,
}

impl fmt::Debug for JsonSchemaCompiled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaCompiled")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl CompiledSchema for JsonSchemaCompiled {
    fn validate(&self, document: &Value) -> Result<ValidationOutcome, ValidatorError> {
        let document = self.apply_defaults(document);

        let outcome = match self.compiled.validate(&document) {
            Ok(()) => ValidationOutcome::valid(),
            Err(errors) => ValidationOutcome::invalid(
                errors
                    .map(|e| format!("{}: {e}", e.instance_path))
                    .collect(),
            ),
        };
        Ok(outcome)
    }
}

impl JsonSchemaCompiled {
    /// Fills absent top-level keys with their declared defaults.
    ///
    /// Non-object documents are passed through untouched so the schema's own
    /// `type` check rejects them.
    fn apply_defaults(&self, document: &Value) -> Value {
        let mut document = document.clone();
        if let Value::Object(map) = &mut document {
            for (key, default) in &self.defaults {
                if !map.contains_key(key) {
                    map.insert(key.clone(), default.clone());
                }
            }
        }
        document
    }
}

fn top_level_defaults(schema: &Value) -> Vec<(String, Value)> {
    schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|properties| {
            properties
                .iter()
                .filter_map(|(key, prop)| Some((key.clone(), prop.get("default")?.clone())))
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================
