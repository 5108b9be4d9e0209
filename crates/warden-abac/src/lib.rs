//! # warden-abac: Schema-driven Attribute-Based Access Control
//!
//! Access rules are written as JSON-Schema-style documents over three
//! attribute namespaces: `subject`, `object` and `environment`. The engine
//! compiles each named rule once, works out which attributes it depends on,
//! and answers access requests with a fail-closed allow/deny decision.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  register(name, schema)                      │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Rule::compile                               │
//! │  ├─ Extract required attribute paths         │
//! │  ├─ Extend schema with base contract         │
//! │  └─ Compile with the structural validator    │
//! └─────────────────┬───────────────────────────┘
//!                   │  Compiled | Invalid
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  enforce(name, subject, object, environment) │
//! │  - Unknown / invalid rule  => deny           │
//! │  - Validator error / panic => deny           │
//! │  - Otherwise the validator decides           │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Examples
//!
//! ```
//! use serde_json::json;
//! use warden_abac::Engine;
//!
//! let mut engine = Engine::new();
//! engine.register("staff-only", &json!({
//!     "properties": {
//!         "subject": { "properties": { "staff": { "enum": [true] } } }
//!     }
//! }));
//!
//! assert_eq!(engine.attributes_list("staff-only", None), ["/subject/staff"]);
//! assert!(engine.enforce("staff-only", Some(&json!({ "staff": true })), None, None));
//! assert!(!engine.enforce("staff-only", Some(&json!({ "staff": false })), None, None));
//! assert!(!engine.enforce("no-such-rule", None, None, None));
//! ```

pub mod attributes;
pub mod engine;
pub mod extractor;
pub mod rule;
pub mod schema;
pub mod validator;

// Kani proofs for bounded model checking
#[cfg(any(test, kani))]
mod kani_proofs;

pub use attributes::{AccessRequest, EnvironmentAttributes};
pub use engine::{Decision, DecisionReason, Effect, Engine, EngineOptions, RuleEntry};
pub use extractor::{AttributeBuckets, Classification, ExtractError, extract};
pub use rule::{Evaluation, Rule, RuleError};
pub use schema::{Namespace, SchemaNode};
pub use validator::{
    CompileError, CompiledSchema, JsonSchemaValidator, StructuralValidator, ValidationOutcome,
    ValidatorError,
};
