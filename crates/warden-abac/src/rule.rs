//! Compiled rules.
//!
//! A [`Rule`] wraps one user schema. Compilation extends the schema with the
//! base request contract (three top-level namespace containers, each
//! defaulting to an empty object), extracts the rule's attribute
//! requirements from the *unextended* schema, and hands the extended schema
//! to the structural validator once. Evaluation is stateless and never
//! fails: any validator error or panic is a deny.

use std::panic::{self, AssertUnwindSafe};

use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::attributes::AccessRequest;
use crate::extractor::{self, AttributeBuckets, Classification, ExtractError};
use crate::schema::{Namespace, SchemaNode};
use crate::validator::{CompileError, CompiledSchema, StructuralValidator, ValidationOutcome};

// ============================================================================
// Errors
// ============================================================================

/// Reasons a schema cannot become a [`Rule`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// The rule schema is not a JSON object.
    #[error("invalid rule: schema must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },

    /// Attribute paths could not be classified.
    #[error("invalid rule: {0}")]
    Extraction(#[from] ExtractError),

    /// The structural validator rejected the extended schema.
    #[error("invalid rule: {0}")]
    Schema(#[from] CompileError),
}

/// Result type for rule compilation.
pub type Result<T> = std::result::Result<T, RuleError>;

// ============================================================================
// Evaluation
// ============================================================================

/// Outcome of checking a request against a rule, before it is reduced to a
/// boolean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// The request conforms to the rule.
    Satisfied,
    /// The request violates the rule.
    Violated { errors: Vec<String> },
    /// The validator errored or panicked.
    Failed { message: String },
}

impl Evaluation {
    /// Only [`Evaluation::Satisfied`] grants access.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied)
    }
}

// ============================================================================
// Rule
// ============================================================================

/// A compiled access rule.
#[derive(Debug)]
pub struct Rule {
    /// The schema as registered.
    schema: Value,
    /// The schema extended with the base contract; what the validator sees.
    contract: Value,
    attributes: AttributeBuckets,
    compiled: Box<dyn CompiledSchema>,
}

impl Rule {
    /// Compiles a rule schema.
    pub fn compile(
        schema: &Value,
        validator: &dyn StructuralValidator,
        classification: Classification,
    ) -> Result<Self> {
        if !schema.is_object() {
            return Err(RuleError::NotAnObject {
                found: json_type_name(schema),
            });
        }

        let attributes = extractor::extract(&SchemaNode::parse(schema), classification)?;

        let mut contract = base_contract();
        merge(&mut contract, schema);
        let contract = lower_not_arrays(&contract);

        let compiled = validator.compile(&contract)?;
        debug!(
            attributes = attributes.len(),
            ?classification,
            "rule compiled"
        );

        Ok(Self {
            schema: schema.clone(),
            contract,
            attributes,
            compiled,
        })
    }

    /// The attribute paths this rule needs.
    pub fn attributes(&self) -> &AttributeBuckets {
        &self.attributes
    }

    /// The schema as registered.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// The extended schema handed to the validator.
    pub fn contract(&self) -> &Value {
        &self.contract
    }

    /// Decides a request. Returns `true` only if the request conforms.
    pub fn validate(
        &self,
        subject: Option<&Value>,
        object: Option<&Value>,
        environment: Option<&Value>,
    ) -> bool {
        let request = AccessRequest {
            subject: subject.cloned(),
            object: object.cloned(),
            environment: environment.cloned(),
        };
        self.evaluate(&request).is_satisfied()
    }

    /// Checks a request and reports why it passed or failed.
    pub fn evaluate(&self, request: &AccessRequest) -> Evaluation {
        let document = request.to_document();

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.compiled.validate(&document)));

        match result {
            Ok(Ok(ValidationOutcome { valid: true, .. })) => Evaluation::Satisfied,
            Ok(Ok(ValidationOutcome { errors, .. })) => Evaluation::Violated { errors },
            Ok(Err(e)) => {
                warn!(error = %e, "validator failed, denying");
                Evaluation::Failed {
                    message: e.to_string(),
                }
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(%message, "validator panicked, denying");
                Evaluation::Failed { message }
            }
        }
    }
}

// ============================================================================
// Schema Helpers
// ============================================================================

/// The structure every request document must have.
fn base_contract() -> Value {
    let mut properties = Map::new();
    for ns in Namespace::ALL {
        properties.insert(
            ns.as_str().to_string(),
            json!({ "type": "object", "default": {} }),
        );
    }

    json!({
        "type": "object",
        "required": Namespace::ALL.map(Namespace::as_str),
        "properties": properties,
    })
}

/// Deep-merges `overlay` into `base`. Objects merge key by key; anything
/// else in `overlay` replaces what `base` had.
fn merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Rewrites `not: [a, b, ..]` into the standard `not: {anyOf: [a, b, ..]}`.
///
/// Only schema positions are visited, so data under `enum`, `const` or
/// `default` is left alone.
fn lower_not_arrays(schema: &Value) -> Value {
    let Value::Object(map) = schema else {
        return schema.clone();
    };

    let mut out = Map::with_capacity(map.len());
    for (key, value) in map {
        let lowered = match (key.as_str(), value) {
            ("not", Value::Array(branches)) => json!({ "anyOf": lower_each(branches) }),
            // Subschema lists, including tuple-form `items`.
            ("anyOf" | "allOf" | "oneOf" | "items" | "prefixItems", Value::Array(branches)) => {
                Value::Array(lower_each(branches))
            }
            // Single subschemas.
            (
                "not" | "items" | "additionalItems" | "additionalProperties" | "contains"
                | "propertyNames" | "if" | "then" | "else" | "unevaluatedItems"
                | "unevaluatedProperties",
                _,
            ) => lower_not_arrays(value),
            // Name to subschema maps. Array members of `dependencies` are
            // property lists and pass through unchanged.
            (
                "properties" | "patternProperties" | "definitions" | "$defs" | "dependencies"
                | "dependentSchemas",
                Value::Object(children),
            ) => Value::Object(
                children
                    .iter()
                    .map(|(name, child)| (name.clone(), lower_not_arrays(child)))
                    .collect(),
            ),
            _ => value.clone(),
        };
        out.insert(key.clone(), lowered);
    }
    Value::Object(out)
}

fn lower_each(branches: &[Value]) -> Vec<Value> {
    branches.iter().map(lower_not_arrays).collect()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "validator panicked".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
