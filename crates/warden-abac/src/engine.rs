//! Rule registry and enforcement.
//!
//! The [`Engine`] compiles named rules once at registration and answers
//! access requests against them. Every failure mode resolves to the safe
//! default:
//!
//! | Situation                        | `enforce` | `attributes_list` |
//! |----------------------------------|-----------|-------------------|
//! | Unknown rule name                | deny      | empty             |
//! | Rule failed to compile           | deny      | empty             |
//! | Validator errors or panics       | deny      | n/a               |
//!
//! No method on the engine returns an error or panics on bad input.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::attributes::AccessRequest;
use crate::extractor::{AttributeBuckets, Classification};
use crate::rule::{Evaluation, Rule, RuleError};
use crate::schema::Namespace;
use crate::validator::{JsonSchemaValidator, StructuralValidator};

// ============================================================================
// Options
// ============================================================================

/// Engine-wide settings applied at registration and enforcement time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// How extracted attribute paths are assigned to namespaces.
    pub classification: Classification,
    /// Log every access decision.
    pub audit: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            classification: Classification::Substring,
            audit: true,
        }
    }
}

// ============================================================================
// Registry Entries
// ============================================================================

/// What the registry holds for a rule name.
#[derive(Debug)]
pub enum RuleEntry {
    /// A usable rule.
    Compiled(Rule),
    /// Compilation failed. Stays until the name is registered again.
    Invalid(RuleError),
}

impl RuleEntry {
    pub fn is_compiled(&self) -> bool {
        matches!(self, Self::Compiled(_))
    }

    pub fn rule(&self) -> Option<&Rule> {
        match self {
            Self::Compiled(rule) => Some(rule),
            Self::Invalid(_) => None,
        }
    }
}

// ============================================================================
// Decision
// ============================================================================

/// Whether access is granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

impl Default for Effect {
    /// Defaults to `Deny`.
    fn default() -> Self {
        Self::Deny
    }
}

/// Why a decision came out the way it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionReason {
    /// The request satisfied the rule.
    Granted,
    /// The request violated the rule.
    Denied { errors: Vec<String> },
    /// No rule is registered under the name.
    UnknownRule,
    /// The rule failed to compile.
    InvalidRule { error: String },
    /// The validator errored or panicked while checking the request.
    ValidatorFailure { message: String },
}

/// The result of enforcing a named rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub effect: Effect,
    /// The rule name the request was checked against.
    pub rule: String,
    pub reason: DecisionReason,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        self.effect == Effect::Allow
    }

    fn deny(rule: &str, reason: DecisionReason) -> Self {
        Self {
            effect: Effect::Deny,
            rule: rule.to_string(),
            reason,
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Granted => f.write_str("request satisfies rule"),
            Self::Denied { errors } if errors.is_empty() => f.write_str("request violates rule"),
            Self::Denied { errors } => write!(f, "request violates rule: {}", errors.join("; ")),
            Self::UnknownRule => f.write_str("no such rule"),
            Self::InvalidRule { error } => write!(f, "rule is invalid: {error}"),
            Self::ValidatorFailure { message } => write!(f, "validator failure: {message}"),
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// A registry of named, compiled access rules.
///
/// Registration takes `&mut self`; lookups take `&self`, so once
/// registration is done an engine can be shared across threads for
/// concurrent enforcement.
pub struct Engine {
    rules: IndexMap<String, RuleEntry>,
    validator: Box<dyn StructuralValidator>,
    options: EngineOptions,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("rules", &self.rules)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates an empty engine using the default validator and options.
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            rules: IndexMap::new(),
            validator: Box::new(JsonSchemaValidator),
            options,
        }
    }

    /// Replaces the structural validator used for future registrations.
    pub fn with_validator(mut self, validator: Box<dyn StructuralValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Creates an engine and registers every `(name, schema)` pair.
    pub fn from_rules<I, K>(rules: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut engine = Self::new();
        engine.register_all(rules);
        engine
    }

    /// Registers every `(name, schema)` pair, in iteration order.
    pub fn register_all<I, K>(&mut self, rules: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        for (name, schema) in rules {
            self.register(name, &schema);
        }
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Compiles `schema` and stores it under `name`, replacing anything
    /// registered there before.
    ///
    /// Never fails: a schema that does not compile is stored as
    /// [`RuleEntry::Invalid`], which denies every request.
    pub fn register(&mut self, name: impl Into<String>, schema: &Value) {
        let name = name.into();
        let compiled = Rule::compile(schema, self.validator.as_ref(), self.options.classification);
        let entry = match compiled {
            Ok(rule) => {
                info!(
                    rule = %name,
                    attributes = rule.attributes().len(),
                    "rule registered"
                );
                RuleEntry::Compiled(rule)
            }
            Err(e) => {
                error!(rule = %name, error = %e, "rule failed to compile, marked invalid");
                RuleEntry::Invalid(e)
            }
        };
        self.rules.insert(name, entry);
    }

    /// Decides whether a request is allowed under the named rule.
    pub fn enforce(
        &self,
        name: &str,
        subject: Option<&Value>,
        object: Option<&Value>,
        environment: Option<&Value>,
    ) -> bool {
        let request = AccessRequest {
            subject: subject.cloned(),
            object: object.cloned(),
            environment: environment.cloned(),
        };
        self.evaluate(name, &request).is_allowed()
    }

    /// Like [`Engine::enforce`] but reports why.
    pub fn evaluate(&self, name: &str, request: &AccessRequest) -> Decision {
        let decision = match self.rules.get(name) {
            None => Decision::deny(name, DecisionReason::UnknownRule),
            Some(RuleEntry::Invalid(e)) => Decision::deny(
                name,
                DecisionReason::InvalidRule {
                    error: e.to_string(),
                },
            ),
            Some(RuleEntry::Compiled(rule)) => match rule.evaluate(request) {
                Evaluation::Satisfied => Decision {
                    effect: Effect::Allow,
                    rule: name.to_string(),
                    reason: DecisionReason::Granted,
                },
                Evaluation::Violated { errors } => {
                    Decision::deny(name, DecisionReason::Denied { errors })
                }
                Evaluation::Failed { message } => {
                    Decision::deny(name, DecisionReason::ValidatorFailure { message })
                }
            },
        };

        if self.options.audit {
            audit(&decision);
        }
        decision
    }

    /// Attribute paths the named rule needs.
    ///
    /// `namespace` selects one bucket; `None` or any unrecognized text
    /// returns all paths. Unknown and invalid rules yield an empty list.
    pub fn attributes_list(&self, name: &str, namespace: Option<&str>) -> Vec<String> {
        let Some(attributes) = self.attributes(name) else {
            return Vec::new();
        };

        match namespace.and_then(|ns| ns.parse::<Namespace>().ok()) {
            Some(ns) => attributes.get(ns).to_vec(),
            None => attributes.all(),
        }
    }

    /// The cached attribute buckets of a compiled rule.
    pub fn attributes(&self, name: &str) -> Option<&AttributeBuckets> {
        self.rule(name).map(Rule::attributes)
    }

    /// Registered rule names, valid or not, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.rules.keys().map(String::as_str).collect()
    }

    /// The compiled rule under `name`, if there is one.
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name).and_then(RuleEntry::rule)
    }

    pub fn entry(&self, name: &str) -> Option<&RuleEntry> {
        self.rules.get(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn audit(decision: &Decision) {
    match decision.effect {
        Effect::Allow => info!(rule = %decision.rule, "access granted"),
        Effect::Deny => warn!(
            rule = %decision.rule,
            reason = %decision.reason,
            "access denied"
        ),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{CompileError, CompiledSchema, ValidationOutcome, ValidatorError};
    use serde_json::json;

    /// Backend that compiles everything and then fails every request.
    struct Unavailable {
        panic: bool,
    }

    #[derive(Debug)]
    struct UnavailableSchema {
        panic: bool,
    }

    impl StructuralValidator for Unavailable {
        fn compile(&self, _schema: &Value) -> Result<Box<dyn CompiledSchema>, CompileError> {
            Ok(Box::new(UnavailableSchema { panic: self.panic }))
        }
    }

    impl CompiledSchema for UnavailableSchema {
        fn validate(&self, _document: &Value) -> Result<ValidationOutcome, ValidatorError> {
            if self.panic {
                panic!("validator crashed");
            }
            Err(ValidatorError("backend unavailable".to_string()))
        }
    }

    fn failing_engine(panic: bool) -> Engine {
        let mut engine = Engine::with_options(EngineOptions {
            audit: false,
            ..EngineOptions::default()
        })
        .with_validator(Box::new(Unavailable { panic }));
        engine.register("office-hours", &office_hours_rule());
        engine
    }

    fn office_hours_rule() -> Value {
        json!({
            "properties": {
                "subject": {
                    "properties": {
                        "staff": { "enum": [true] },
                        "department": { "enum": ["Computer Science", "Information Systems"] }
                    }
                },
                "environment": {
                    "properties": {
                        "time": {
                            "anyOf": [
                                { "properties": {
                                    "hours": { "minimum": 7, "maximum": 17 },
                                    "minutes": { "minimum": 30 }
                                } },
                                { "properties": {
                                    "hours": { "maximum": 17, "minimum": 8 }
                                } }
                            ]
                        }
                    }
                }
            }
        })
    }

    fn engine() -> Engine {
        let mut engine = Engine::with_options(EngineOptions {
            audit: false,
            ..EngineOptions::default()
        });
        engine.register("office-hours", &office_hours_rule());
        engine
    }

    #[test]
    fn test_deny_just_before_half_past() {
        let decision = engine().evaluate(
            "office-hours",
            &AccessRequest::new()
                .with_subject(json!({ "staff": false, "department": "Computer Science" }))
                .with_environment(json!({ "time": { "hours": 7, "minutes": 29 } })),
        );

        assert_eq!(decision.effect, Effect::Deny);
        assert!(matches!(
            decision.reason,
            DecisionReason::Denied { ref errors } if !errors.is_empty()
        ));
    }

    #[test]
    fn test_allow_staff_after_half_past() {
        let subject = json!({ "staff": true, "department": "Computer Science" });
        let environment = json!({ "time": { "hours": 7, "minutes": 31 } });

        assert!(engine().enforce("office-hours", Some(&subject), None, Some(&environment)));
    }

    #[test]
    fn test_deny_staff_before_half_past() {
        let subject = json!({ "staff": true, "department": "Computer Science" });
        let environment = json!({ "time": { "hours": 7, "minutes": 29 } });

        assert!(!engine().enforce("office-hours", Some(&subject), None, Some(&environment)));
    }

    #[test]
    fn test_attribute_counts() {
        let engine = engine();

        let subject = engine.attributes_list("office-hours", Some("subject"));
        assert_eq!(subject.len(), 2);
        assert!(subject.iter().all(|p| p.starts_with("/subject/")));

        let object = engine.attributes_list("office-hours", Some("object"));
        assert!(object.is_empty());

        let environment = engine.attributes_list("office-hours", Some("environment"));
        assert_eq!(environment.len(), 2);
        assert!(environment.iter().all(|p| p.starts_with("/environment/")));

        assert_eq!(engine.attributes_list("office-hours", None).len(), 4);
        assert_eq!(engine.attributes_list("office-hours", Some("everything")).len(), 4);
    }

    #[test]
    fn test_unknown_rule_fails_closed() {
        let engine = engine();
        assert!(!engine.enforce("nonexistent", None, None, None));
        assert!(engine.attributes_list("nonexistent", None).is_empty());
        assert_eq!(
            engine.evaluate("nonexistent", &AccessRequest::new()).reason,
            DecisionReason::UnknownRule
        );
    }

    #[test]
    fn test_invalid_rule_fails_closed() {
        let mut engine = engine();
        engine.register("bad", &json!("not a schema"));

        assert!(engine.is_registered("bad"));
        assert!(engine.rule("bad").is_none());
        assert!(!engine.enforce("bad", Some(&json!({})), Some(&json!({})), Some(&json!({}))));
        assert!(engine.attributes_list("bad", Some("subject")).is_empty());
        assert!(matches!(
            engine.evaluate("bad", &AccessRequest::new()).reason,
            DecisionReason::InvalidRule { .. }
        ));
    }

    #[test]
    fn test_schema_without_properties_is_still_a_rule() {
        let mut engine = engine();
        engine.register("scum", &json!({ "subject": { "scum": true } }));

        assert!(engine.entry("scum").is_some_and(RuleEntry::is_compiled));
        assert!(engine.attributes_list("scum", None).is_empty());
    }

    #[test]
    fn test_reregistration_replaces_everything() {
        let mut engine = engine();
        let subject = json!({ "staff": true, "department": "Computer Science" });
        let environment = json!({ "time": { "hours": 9, "minutes": 0 } });
        assert!(engine.enforce("office-hours", Some(&subject), None, Some(&environment)));

        engine.register(
            "office-hours",
            &json!({
                "properties": {
                    "object": { "properties": { "owner": { "enum": ["alice"] } } }
                }
            }),
        );

        assert_eq!(engine.attributes_list("office-hours", None), ["/object/owner"]);
        assert!(engine.attributes_list("office-hours", Some("subject")).is_empty());
        assert!(!engine.enforce(
            "office-hours",
            Some(&subject),
            Some(&json!({ "owner": "bob" })),
            Some(&environment)
        ));
        assert!(engine.enforce("office-hours", None, Some(&json!({ "owner": "alice" })), None));
    }

    #[test]
    fn test_reregistration_can_invalidate_and_recover() {
        let mut engine = engine();
        engine.register("office-hours", &json!(42));
        assert!(engine.attributes_list("office-hours", None).is_empty());

        engine.register("office-hours", &office_hours_rule());
        assert_eq!(engine.attributes_list("office-hours", None).len(), 4);
    }

    #[test]
    fn test_names_in_registration_order() {
        let mut engine = Engine::from_rules([
            ("zeta", json!({})),
            ("alpha", json!(null)),
            ("mid", office_hours_rule()),
        ]);
        engine.register("zeta", &json!({ "properties": {} }));

        assert_eq!(engine.names(), ["zeta", "alpha", "mid"]);
        assert_eq!(engine.len(), 3);
        assert!(!engine.entry("alpha").is_some_and(RuleEntry::is_compiled));
    }

    #[test]
    fn test_empty_engine() {
        let engine = Engine::new();
        assert!(engine.is_empty());
        assert!(engine.names().is_empty());
    }

    #[test]
    fn test_strict_classification_marks_rule_invalid() {
        let mut engine = Engine::with_options(EngineOptions {
            classification: Classification::FirstSegment,
            audit: false,
        });
        engine.register(
            "mixed",
            &json!({
                "properties": {
                    "subject": { "properties": { "id": {} } },
                    "request": { "properties": { "verb": {} } }
                }
            }),
        );
        assert!(engine.rule("mixed").is_none());
        assert!(!engine.enforce("mixed", None, None, None));
    }

    #[test]
    fn test_validator_error_denies_with_reason() {
        let engine = failing_engine(false);
        assert!(engine.rule("office-hours").is_some());

        let subject = json!({ "staff": true, "department": "Computer Science" });
        let request = AccessRequest::new().with_subject(subject.clone());
        let decision = engine.evaluate("office-hours", &request);

        assert_eq!(decision.effect, Effect::Deny);
        let DecisionReason::ValidatorFailure { message } = &decision.reason else {
            panic!("expected a validator failure, got {:?}", decision.reason);
        };
        assert!(message.contains("backend unavailable"));
        assert!(!engine.enforce("office-hours", Some(&subject), None, None));
    }

    #[test]
    fn test_validator_panic_denies_with_reason() {
        let engine = failing_engine(true);
        let decision = engine.evaluate("office-hours", &AccessRequest::new());

        assert!(!decision.is_allowed());
        assert_eq!(
            decision.reason,
            DecisionReason::ValidatorFailure {
                message: "validator crashed".to_string()
            }
        );
    }

    #[test]
    fn test_decision_reason_display() {
        let reason = DecisionReason::Denied {
            errors: vec!["/subject/staff: false is not one of [true]".to_string()],
        };
        assert!(reason.to_string().starts_with("request violates rule: /subject/staff"));
        assert_eq!(DecisionReason::UnknownRule.to_string(), "no such rule");
    }

    #[test]
    fn test_engine_is_shareable_after_registration() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }
}
