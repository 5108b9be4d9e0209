//! Attribute requirement extraction.
//!
//! Walks a rule schema depth-first and collects the JSON-Pointer paths of
//! every leaf constraint, i.e. every attribute the rule needs in order to be
//! evaluated. Paths are deduplicated (first occurrence wins) and kept in
//! discovery order, then split into the three namespace buckets.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::{Namespace, SchemaNode};

// ============================================================================
// Classification
// ============================================================================

/// How an attribute path is assigned to a namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    /// A path belongs to the first of `subject`, `object`, `environment`
    /// whose name occurs anywhere in the path text. Paths matching none are
    /// dropped.
    ///
    /// `/environment/subject_id` lands in the subject bucket under this mode.
    #[default]
    Substring,
    /// A path belongs to the namespace named by its first segment. Any other
    /// first segment is an [`ExtractError::UnknownNamespace`].
    FirstSegment,
}

/// Errors raised while classifying extracted paths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// A path does not start with a namespace (first-segment mode only).
    #[error("attribute path {path} is not under subject, object or environment")]
    UnknownNamespace { path: String },
}

// ============================================================================
// AttributeBuckets
// ============================================================================

/// Attribute paths required by a rule, split by namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeBuckets {
    /// Paths into the subject namespace.
    pub subject: Vec<String>,
    /// Paths into the object namespace.
    pub object: Vec<String>,
    /// Paths into the environment namespace.
    pub environment: Vec<String>,
}

impl AttributeBuckets {
    /// Returns the bucket for one namespace.
    pub fn get(&self, namespace: Namespace) -> &[String] {
        match namespace {
            Namespace::Subject => &self.subject,
            Namespace::Object => &self.object,
            Namespace::Environment => &self.environment,
        }
    }

    /// Returns `subject ++ object ++ environment`.
    pub fn all(&self) -> Vec<String> {
        let mut all = Vec::with_capacity(self.len());
        all.extend_from_slice(&self.subject);
        all.extend_from_slice(&self.object);
        all.extend_from_slice(&self.environment);
        all
    }

    /// Total number of paths across all buckets.
    pub fn len(&self) -> usize {
        self.subject.len() + self.object.len() + self.environment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn bucket_mut(&mut self, namespace: Namespace) -> &mut Vec<String> {
        match namespace {
            Namespace::Subject => &mut self.subject,
            Namespace::Object => &mut self.object,
            Namespace::Environment => &mut self.environment,
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Extracts the attribute requirements of a schema.
///
/// A root without `properties` yields empty buckets. With
/// [`Classification::Substring`] this never fails.
pub fn extract(
    schema: &SchemaNode,
    classification: Classification,
) -> Result<AttributeBuckets, ExtractError> {
    let mut paths = Vec::new();
    let mut chain = Vec::new();
    collect(schema, &mut chain, &mut paths);

    let mut buckets = AttributeBuckets::default();
    for path in paths {
        match classify(&path, classification)? {
            Some(namespace) => buckets.bucket_mut(namespace).push(path),
            None => tracing::debug!(%path, "attribute path outside every namespace, dropped"),
        }
    }
    Ok(buckets)
}

/// Assigns a single path to a namespace.
pub fn classify(
    path: &str,
    classification: Classification,
) -> Result<Option<Namespace>, ExtractError> {
    match classification {
        Classification::Substring => Ok(Namespace::ALL
            .into_iter()
            .find(|ns| path.contains(ns.as_str()))),
        Classification::FirstSegment => path
            .trim_start_matches('/')
            .split('/')
            .next()
            .and_then(|segment| segment.parse::<Namespace>().ok())
            .map(Some)
            .ok_or_else(|| ExtractError::UnknownNamespace {
                path: path.to_string(),
            }),
    }
}

// ============================================================================
// Tree Walk
// ============================================================================

/// Depth-first walk over a node's properties.
///
/// Only property containers contribute: a leaf reached directly (the root,
/// or a combinator branch) adds nothing at this level.
fn collect<'a>(node: &'a SchemaNode, chain: &mut Vec<&'a str>, paths: &mut Vec<String>) {
    let SchemaNode::Properties(children) = node else {
        return;
    };

    for (key, child) in children {
        chain.push(key.as_str());
        match child {
            SchemaNode::Properties(_) => collect(child, chain, paths),
            SchemaNode::AnyOf(branches)
            | SchemaNode::AllOf(branches)
            | SchemaNode::OneOf(branches)
            | SchemaNode::Not(branches) => {
                for branch in branches {
                    collect(branch, chain, paths);
                }
            }
            SchemaNode::Leaf => {
                let path = format!("/{}", chain.join("/"));
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        chain.pop();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{Value, json};

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
                                    "hours": { "minimum": 8, "maximum": 17 }
                                } }
                            ]
                        }
                    }
                }
            }
        })
    }

    fn extract_value(value: &Value) -> AttributeBuckets {
        extract(&SchemaNode::parse(value), Classification::Substring).expect("substring mode")
    }

    #[test]
    fn test_office_hours_rule_buckets() {
        let buckets = extract_value(&office_hours_rule());

        assert_eq!(buckets.subject, ["/subject/staff", "/subject/department"]);
        assert!(buckets.object.is_empty());
        assert_eq!(
            buckets.environment,
            ["/environment/time/hours", "/environment/time/minutes"]
        );
        assert_eq!(buckets.all().len(), 4);
    }

    #[test]
    fn test_path_through_several_branches_recorded_once() {
        let buckets = extract_value(&office_hours_rule());
        let hours = buckets
            .all()
            .iter()
            .filter(|p| p.as_str() == "/environment/time/hours")
            .count();
        assert_eq!(hours, 1);
    }

    #[test]
    fn test_root_without_properties_is_empty() {
        assert!(extract_value(&json!({ "type": "object" })).is_empty());
        assert!(extract_value(&json!({ "subject": { "scum": true } })).is_empty());
        let combinator_root = json!({ "anyOf": [{ "properties": { "subject": {} } }] });
        assert!(extract_value(&combinator_root).is_empty());
    }

    #[test]
    fn test_combinator_with_nested_properties() {
        let schema = json!({
            "properties": {
                "object": {
                    "allOf": [
                        { "properties": {
                            "owner": { "properties": { "id": { "type": "string" } } }
                        } },
                        { "oneOf": [ { "properties": { "kind": {} } } ] },
                        { "properties": { "size": { "maximum": 10 } } }
                    ]
                }
            }
        });
        let buckets = extract_value(&schema);
        // The nested oneOf sits directly inside an allOf branch without
        // properties, so it contributes nothing.
        assert_eq!(buckets.object, ["/object/owner/id", "/object/size"]);
    }

    #[test]
    fn test_leaf_only_branches_contribute_nothing() {
        let schema = json!({
            "properties": {
                "subject": {
                    "properties": {
                        "role": { "anyOf": [{ "enum": ["admin"] }, { "enum": ["owner"] }] },
                        "level": { "minimum": 2 }
                    }
                }
            }
        });
        assert_eq!(extract_value(&schema).subject, ["/subject/level"]);
    }

    #[test]
    fn test_not_branches_are_walked() {
        let schema = json!({
            "properties": {
                "environment": {
                    "not": [{ "properties": { "country": { "enum": ["XX"] } } }]
                },
                "object": {
                    "not": { "properties": { "archived": { "enum": [true] } } }
                }
            }
        });
        let buckets = extract_value(&schema);
        assert_eq!(buckets.environment, ["/environment/country"]);
        assert_eq!(buckets.object, ["/object/archived"]);
    }

    #[test]
    fn test_substring_precedence() {
        assert_eq!(
            classify("/environment/subject_id", Classification::Substring),
            Ok(Some(Namespace::Subject))
        );
        assert_eq!(
            classify("/object/environment", Classification::Substring),
            Ok(Some(Namespace::Object))
        );
        assert_eq!(classify("/other/field", Classification::Substring), Ok(None));
    }

    #[test]
    fn test_substring_drops_foreign_paths() {
        let schema = json!({
            "properties": {
                "subject": { "properties": { "id": {} } },
                "request": { "properties": { "verb": {} } }
            }
        });
        let buckets = extract_value(&schema);
        assert_eq!(buckets.all(), ["/subject/id"]);
    }

    #[test]
    fn test_first_segment_classification() {
        assert_eq!(
            classify("/environment/subject_id", Classification::FirstSegment),
            Ok(Some(Namespace::Environment))
        );

        let schema = SchemaNode::parse(&json!({
            "properties": { "request": { "properties": { "verb": {} } } }
        }));
        let err = extract(&schema, Classification::FirstSegment).unwrap_err();
        assert_eq!(
            err,
            ExtractError::UnknownNamespace {
                path: "/request/verb".to_string()
            }
        );
    }

    #[test]
    fn test_get_matches_fields() {
        let buckets = extract_value(&office_hours_rule());
        assert_eq!(buckets.get(Namespace::Subject), buckets.subject.as_slice());
        assert_eq!(buckets.get(Namespace::Object), buckets.object.as_slice());
        assert_eq!(
            buckets.get(Namespace::Environment),
            buckets.environment.as_slice()
        );
    }

    // ------------------------------------------------------------------------
    // Property tests
    // ------------------------------------------------------------------------

    fn arb_schema() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(json!({ "type": "string" })),
            Just(json!({ "minimum": 1 })),
            Just(json!({ "enum": [true] })),
        ];
        let key = prop_oneof![
            Just("subject"),
            Just("object"),
            Just("environment"),
            Just("id"),
            Just("time"),
            Just("level"),
        ];
        leaf.prop_recursive(4, 32, 4, move |inner| {
            prop_oneof![
                prop::collection::vec((key.clone(), inner.clone()), 1..4).prop_map(|entries| {
                    let props: serde_json::Map<String, Value> = entries
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v))
                        .collect();
                    json!({ "properties": props })
                }),
                prop::collection::vec(inner.clone(), 1..3)
                    .prop_map(|branches| json!({ "anyOf": branches })),
                prop::collection::vec(inner, 1..3).prop_map(|branches| json!({ "not": branches })),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_paths_are_unique(schema in arb_schema()) {
            let all = extract_value(&schema).all();
            let mut deduped = all.clone();
            deduped.sort();
            deduped.dedup();
            prop_assert_eq!(deduped.len(), all.len());
        }

        #[test]
        fn prop_buckets_partition_all(schema in arb_schema()) {
            let buckets = extract_value(&schema);
            prop_assert_eq!(
                buckets.subject.len() + buckets.object.len() + buckets.environment.len(),
                buckets.all().len()
            );
            for ns in Namespace::ALL {
                for path in buckets.get(ns) {
                    prop_assert!(path.starts_with('/'));
                    prop_assert!(path.contains(ns.as_str()));
                }
            }
        }
    }
}
