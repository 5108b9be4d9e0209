//! Request attribute documents.
//!
//! An access request carries up to three attribute maps:
//! - **Subject**: who is asking (role, department, clearance, ...)
//! - **Object**: what is being accessed (owner, classification, ...)
//! - **Environment**: the context of the request (time, location, ...)

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::schema::Namespace;

// ============================================================================
// Access Request
// ============================================================================

/// The attributes supplied with one access request.
///
/// A namespace left as `None` is omitted from the request document entirely;
/// the rule's base contract then supplies its default. That is not the same
/// as passing an explicit empty object, and the distinction is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Value>,
}

impl AccessRequest {
    /// Creates an empty request (every namespace omitted).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the subject attributes.
    pub fn with_subject(mut self, subject: Value) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Sets the object attributes.
    pub fn with_object(mut self, object: Value) -> Self {
        self.object = Some(object);
        self
    }

    /// Sets the environment attributes.
    pub fn with_environment(mut self, environment: Value) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Returns the attributes supplied for a namespace.
    pub fn get(&self, namespace: Namespace) -> Option<&Value> {
        match namespace {
            Namespace::Subject => self.subject.as_ref(),
            Namespace::Object => self.object.as_ref(),
            Namespace::Environment => self.environment.as_ref(),
        }
    }

    /// Builds the document the validator checks: `{subject, object,
    /// environment}` with only the supplied namespaces present.
    pub fn to_document(&self) -> Value {
        let mut document = Map::new();
        for ns in Namespace::ALL {
            if let Some(value) = self.get(ns) {
                document.insert(ns.as_str().to_string(), value.clone());
            }
        }
        Value::Object(document)
    }
}

// ============================================================================
// Environment Attributes
// ============================================================================

/// Time-of-request attributes for the environment namespace.
///
/// Computed from the server clock rather than supplied by the caller, which
/// makes them harder to forge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentAttributes {
    /// The timestamp of the access request.
    pub timestamp: DateTime<Utc>,
}

impl EnvironmentAttributes {
    pub fn from_timestamp(timestamp: DateTime<Utc>) -> Self {
        Self { timestamp }
    }

    pub fn now() -> Self {
        Self::from_timestamp(Utc::now())
    }

    /// Renders the environment namespace document:
    ///
    /// ```text
    /// { "time": { "hours": 0-23, "minutes": 0-59 },
    ///   "day":  { "weekday": 1-7 (Mon = 1), "is_weekend": bool } }
    /// ```
    pub fn to_value(&self) -> Value {
        let weekday = self.timestamp.weekday().number_from_monday();
        json!({
            "time": {
                "hours": self.timestamp.hour(),
                "minutes": self.timestamp.minute(),
            },
            "day": {
                "weekday": weekday,
                "is_weekend": weekday >= 6,
            },
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
