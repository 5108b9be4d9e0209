//! Kani proofs for rule enforcement
//!
//! These proofs verify the fail-closed properties of the engine using
//! bounded model checking. A trivial validator stands in for the real
//! backend so the state space stays small.
//!
//! **Proof Count**: 4 proofs (#1-4)
//!
//! Run with: `cargo kani --tests --harness verify_*`

#[cfg(kani)]
use crate::engine::{DecisionReason, Effect, Engine, EngineOptions};
#[cfg(kani)]
use crate::extractor::{Classification, classify};
#[cfg(kani)]
use crate::schema::Namespace;
#[cfg(kani)]
use crate::validator::{
    CompileError, CompiledSchema, StructuralValidator, ValidationOutcome, ValidatorError,
};
#[cfg(kani)]
use crate::AccessRequest;
#[cfg(kani)]
use serde_json::{Value, json};

/// Validator whose verdict is fixed at construction.
#[cfg(kani)]
#[derive(Debug, Clone, Copy)]
struct Fixed(bool);

#[cfg(kani)]
impl StructuralValidator for Fixed {
    fn compile(&self, _schema: &Value) -> Result<Box<dyn CompiledSchema>, CompileError> {
        Ok(Box::new(*self))
    }
}

#[cfg(kani)]
impl CompiledSchema for Fixed {
    fn validate(&self, _document: &Value) -> Result<ValidationOutcome, ValidatorError> {
        Ok(ValidationOutcome {
            valid: self.0,
            errors: Vec::new(),
        })
    }
}

#[cfg(kani)]
fn quiet_engine(verdict: bool) -> Engine {
    Engine::with_options(EngineOptions {
        classification: Classification::Substring,
        audit: false,
    })
    .with_validator(Box::new(Fixed(verdict)))
}

/// Proof #1: Unknown rules deny
///
/// **Property**: Enforcing a name that was never registered is a deny, even
/// when the validator would accept everything
#[cfg(kani)]
#[kani::proof]
#[kani::unwind(5)]
fn verify_unknown_rule_denies() {
    let mut engine = quiet_engine(true);
    engine.register("known", &json!({}));

    let decision = engine.evaluate("unknown", &AccessRequest::new());

    assert_eq!(decision.effect, Effect::Deny);
    assert_eq!(decision.reason, DecisionReason::UnknownRule);
    assert!(engine.attributes_list("unknown", None).is_empty());
}

/// Proof #2: Invalid rules deny
///
/// **Property**: A non-object schema is stored as invalid and every request
/// against it is denied
#[cfg(kani)]
#[kani::proof]
#[kani::unwind(5)]
fn verify_invalid_rule_denies() {
    let mut engine = quiet_engine(true);
    let schema = if kani::any() { json!(1) } else { json!(null) };
    engine.register("bad", &schema);

    assert!(engine.is_registered("bad"));
    assert!(!engine.enforce("bad", None, None, None));
}

/// Proof #3: Allow requires validator approval
///
/// **Property**: A compiled rule never allows a request the validator rejects
#[cfg(kani)]
#[kani::proof]
#[kani::unwind(5)]
fn verify_allow_requires_validator() {
    let verdict: bool = kani::any();
    let mut engine = quiet_engine(verdict);
    engine.register("rule", &json!({}));

    let allowed = engine.enforce("rule", None, None, None);

    assert_eq!(allowed, verdict);
}

/// Proof #4: First-segment classification agrees with the path root
///
/// **Property**: Under strict classification a namespace-rooted path is
/// assigned to exactly that namespace
#[cfg(kani)]
#[kani::proof]
#[kani::unwind(16)]
fn verify_first_segment_classification() {
    let index: usize = kani::any();
    kani::assume(index < Namespace::ALL.len());
    let namespace = Namespace::ALL[index];

    let path = format!("/{}/attr", namespace.as_str());
    let classified = classify(&path, Classification::FirstSegment);

    assert_eq!(classified, Ok(Some(namespace)));
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_proof_count() {
        // This test documents that we have 4 Kani proofs (#1-4)
        let proof_count = 4;
        assert_eq!(proof_count, 4, "Expected 4 Kani proofs for rule enforcement");
    }
}
