use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::extract::vocab::TEST_TYPES;

/// Accepted semantic metadata for one feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_type: Option<String>,
    #[serde(default)]
    pub risk_flags: Vec<String>,
    #[serde(default)]
    pub step_groups: Vec<StepGroup>,
    #[serde(default)]
    pub step_annotations: Vec<StepAnnotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepGroup {
    #[serde(default)]
    pub group: String,
    pub steps: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepAnnotation {
    pub index: usize,
    #[serde(default)]
    pub label: String,
}

/// A failed guardrail check, serialized with a machine-readable `code`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Violation {
    #[error("expected {expected} step annotations, got {actual}")]
    StepCountMismatch { expected: usize, actual: usize },
    #[error("annotation indices are not exactly 0..{expected}: {detail}")]
    InvalidAnnotationIndices { expected: usize, detail: String },
    #[error("step groups do not partition the step indices: {detail}")]
    GroupCoverageMismatch { detail: String },
    #[error("step groups reorder execution: {detail}")]
    GroupOrderViolation { detail: String },
    #[error("unknown test_type `{test_type}`")]
    UnknownTestType { test_type: String },
    #[error("output carries a populated steps array")]
    StepsRewriteAttempt,
    #[error("malformed enrichment output: {detail}")]
    MalformedOutput { detail: String },
}

/// Check an enrichment reply against a canonical model with `step_count` steps.
pub fn validate(step_count: usize, output: &Value) -> Result<Enrichment, Vec<Violation>> {
    let Some(object) = output.as_object() else {
        return Err(vec![Violation::MalformedOutput {
            detail: "reply is not a JSON object".to_string(),
        }]);
    };

    let mut violations = Vec::new();

    if matches!(object.get("steps"), Some(Value::Array(items)) if !items.is_empty()) {
        violations.push(Violation::StepsRewriteAttempt);
    }

    match object.get("step_annotations") {
        None | Some(Value::Null) => check_annotations(step_count, &[], &mut violations),
        Some(Value::Array(items)) => check_annotations(step_count, items, &mut violations),
        Some(_) => violations.push(Violation::MalformedOutput {
            detail: "step_annotations is not an array".to_string(),
        }),
    }

    match object.get("step_groups") {
        None | Some(Value::Null) => {}
        Some(Value::Array(groups)) if groups.is_empty() => {}
        Some(Value::Array(groups)) => check_groups(step_count, groups, &mut violations),
        Some(_) => violations.push(Violation::MalformedOutput {
            detail: "step_groups is not an array".to_string(),
        }),
    }

    match object.get("test_type") {
        None | Some(Value::Null) => {}
        Some(Value::String(label)) if TEST_TYPES.contains(&label.as_str()) => {}
        Some(Value::String(label)) => violations.push(Violation::UnknownTestType {
            test_type: label.clone(),
        }),
        Some(other) => violations.push(Violation::UnknownTestType {
            test_type: other.to_string(),
        }),
    }

    if !violations.is_empty() {
        return Err(violations);
    }

    serde_json::from_value(output.clone()).map_err(|err| {
        vec![Violation::MalformedOutput {
            detail: err.to_string(),
        }]
    })
}

fn check_annotations(expected: usize, items: &[Value], violations: &mut Vec<Violation>) {
    if items.len() != expected {
        violations.push(Violation::StepCountMismatch {
            expected,
            actual: items.len(),
        });
    }

    let mut indices = Vec::with_capacity(items.len());
    for item in items {
        match item.get("index").and_then(Value::as_u64) {
            Some(index) => indices.push(index as usize),
            None => {
                violations.push(Violation::InvalidAnnotationIndices {
                    expected,
                    detail: format!("annotation without an integer index: {item}"),
                });
                return;
            }
        }
    }
    indices.sort_unstable();
    if !is_exact_range(&indices, expected) {
        violations.push(Violation::InvalidAnnotationIndices {
            expected,
            detail: format!("got {indices:?}"),
        });
    }
}

fn check_groups(expected: usize, groups: &[Value], violations: &mut Vec<Violation>) {
    let mut flattened = Vec::new();
    let mut previous_max: Option<usize> = None;
    let mut ordered = true;

    for (position, group) in groups.iter().enumerate() {
        let Some(steps) = group.get("steps").and_then(Value::as_array) else {
            violations.push(Violation::GroupCoverageMismatch {
                detail: format!("group {position} has no steps array"),
            });
            return;
        };
        let mut members = Vec::with_capacity(steps.len());
        for step in steps {
            match step.as_u64() {
                Some(index) => members.push(index as usize),
                None => {
                    violations.push(Violation::GroupCoverageMismatch {
                        detail: format!("group {position} holds a non-index value {step}"),
                    });
                    return;
                }
            }
        }

        if members.windows(2).any(|pair| pair[0] >= pair[1]) {
            ordered = false;
        }
        if let (Some(max), Some(min)) = (previous_max, members.iter().min()) {
            if *min <= max {
                ordered = false;
            }
        }
        if let Some(max) = members.iter().max() {
            previous_max = Some(*max);
        }
        flattened.extend(members);
    }

    let mut covered = flattened.clone();
    covered.sort_unstable();
    if !is_exact_range(&covered, expected) {
        violations.push(Violation::GroupCoverageMismatch {
            detail: format!("grouped indices {covered:?} for {expected} steps"),
        });
    }
    if !ordered {
        violations.push(Violation::GroupOrderViolation {
            detail: format!("group order flattens to {flattened:?}"),
        });
    }
}

fn is_exact_range(sorted: &[usize], expected: usize) -> bool {
    sorted.len() == expected && sorted.iter().enumerate().all(|(i, v)| i == *v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn annotations(n: usize) -> Value {
        Value::Array(
            (0..n)
                .map(|i| json!({"index": i, "label": format!("step {i}")}))
                .collect(),
        )
    }

    #[test]
    fn well_formed_output_is_accepted() {
        let output = json!({
            "feature_label": "Login",
            "test_type": "AUTH",
            "risk_flags": [],
            "step_groups": [{"group": "Enter", "steps": [0, 1]}, {"group": "Submit", "steps": [2]}],
            "step_annotations": annotations(3),
        });
        let enrichment = validate(3, &output).expect("valid");
        assert_eq!(enrichment.test_type.as_deref(), Some("AUTH"));
        assert_eq!(enrichment.step_groups.len(), 2);
    }

    #[test]
    fn annotation_count_must_match_steps() {
        let output = json!({"step_annotations": annotations(2)});
        let violations = validate(3, &output).expect_err("count mismatch");
        assert!(violations.contains(&Violation::StepCountMismatch {
            expected: 3,
            actual: 2
        }));
    }

    #[test]
    fn duplicate_indices_are_rejected() {
        let output = json!({"step_annotations": [{"index": 0}, {"index": 0}]});
        let violations = validate(2, &output).expect_err("duplicates");
        assert!(matches!(
            violations.as_slice(),
            [Violation::InvalidAnnotationIndices { expected: 2, .. }]
        ));
    }

    #[test]
    fn groups_may_not_reorder_steps() {
        let output = json!({
            "step_groups": [{"group": "A", "steps": [2]}, {"group": "B", "steps": [0, 1]}],
            "step_annotations": annotations(3),
        });
        let violations = validate(3, &output).expect_err("reordered");
        assert_eq!(violations.len(), 1);
        assert!(matches!(violations[0], Violation::GroupOrderViolation { .. }));
    }

    #[test]
    fn groups_must_cover_every_step_once() {
        let output = json!({
            "step_groups": [{"group": "A", "steps": [0]}, {"group": "B", "steps": [2]}],
            "step_annotations": annotations(3),
        });
        let violations = validate(3, &output).expect_err("gap");
        assert!(matches!(violations[0], Violation::GroupCoverageMismatch { .. }));
    }

    #[test]
    fn vocabulary_and_rewrites_are_enforced() {
        let output = json!({
            "test_type": "SMOKE",
            "steps": [{"action": "click"}],
            "step_annotations": annotations(1),
        });
        let violations = validate(1, &output).expect_err("rewrite");
        assert_eq!(
            violations,
            vec![
                Violation::StepsRewriteAttempt,
                Violation::UnknownTestType {
                    test_type: "SMOKE".to_string()
                },
            ]
        );
    }

    #[test]
    fn violations_serialize_with_a_code() {
        let value = serde_json::to_value(Violation::StepCountMismatch {
            expected: 3,
            actual: 1,
        })
        .expect("serialize");
        assert_eq!(value, json!({"code": "STEP_COUNT_MISMATCH", "expected": 3, "actual": 1}));
    }
}
