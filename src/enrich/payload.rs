use serde::Serialize;

use crate::extract::vocab::TEST_TYPES;
use crate::intent::{
    ActionKind, AssertOperator, CanonicalHook, CanonicalIntentModel, ControlKind, FlowScope,
    HttpMethod,
};

/// What the enrichment service is allowed to see. Locators, line numbers and
/// provenance are left out so they cannot be echoed back or rewritten.
#[derive(Debug, Clone, Serialize)]
pub struct MinimalPayload {
    pub steps: Vec<MinimalStep>,
    pub assertions: Vec<MinimalAssertion>,
    pub lifecycle_hooks: Vec<CanonicalHook>,
    pub control_flow: Vec<MinimalControlFlow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MinimalStep {
    pub action: ActionKind,
    pub method: Option<HttpMethod>,
    pub endpoint: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MinimalAssertion {
    pub operator: AssertOperator,
    pub left: Option<String>,
    pub right: Option<String>,
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MinimalControlFlow {
    pub action: ControlKind,
    pub condition: String,
    pub scope: FlowScope,
}

pub fn minimize(model: &CanonicalIntentModel) -> MinimalPayload {
    MinimalPayload {
        steps: model
            .steps
            .iter()
            .map(|step| MinimalStep {
                action: step.action,
                method: step.method,
                endpoint: step.endpoint.clone(),
                value: step.value.clone(),
            })
            .collect(),
        assertions: model
            .assertions
            .iter()
            .map(|assertion| MinimalAssertion {
                operator: assertion.operator,
                left: assertion.left.clone(),
                right: assertion.right.clone(),
                condition: assertion.condition.clone(),
            })
            .collect(),
        lifecycle_hooks: model.lifecycle_hooks.clone(),
        control_flow: model
            .control_flow
            .iter()
            .map(|flow| MinimalControlFlow {
                action: flow.action,
                condition: flow.condition.clone(),
                scope: flow.scope,
            })
            .collect(),
    }
}

pub fn system_prompt() -> String {
    format!(
        "You are enhancing a canonical test intent model.\n\
         Rules:\n\
         - Do NOT add, remove, reorder, or modify steps.\n\
         - Do NOT return a `steps` array.\n\
         - Only provide semantic metadata: feature_label, test_type, risk_flags, step_groups, step_annotations.\n\
         - Reference steps by their zero-based index. Groups must keep execution order.\n\
         - Classify test_type as one of: {}.\n\
         - Reply with a single JSON object and nothing else.",
        TEST_TYPES.join(", ")
    )
}

pub fn build_prompt(payload: &MinimalPayload) -> Result<String, serde_json::Error> {
    let body = serde_json::to_string_pretty(payload)?;
    Ok(format!(
        r#"Enhance this test intent model with semantic metadata:
{body}

Return a JSON object with:
{{
  "feature_label": "Title of the test case",
  "test_type": "Classification",
  "risk_flags": ["detected", "risks"],
  "step_groups": [{{"group": "Group name", "steps": [0, 1]}}],
  "step_annotations": [{{"index": 0, "label": "Brief label for step 0"}}]
}}"#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{CanonicalStep, Locator, LocatorStrategy, StepMetadata};

    #[test]
    fn payload_drops_locators_and_provenance() {
        let mut step = CanonicalStep::new(ActionKind::Type);
        step.locator = Some(Locator::new(LocatorStrategy::Id, "secret-field"));
        step.value = Some("admin".to_string());
        step.metadata = Some(StepMetadata {
            source_method: "LoginPage.login".to_string(),
        });
        let model = CanonicalIntentModel {
            steps: vec![step],
            assertions: Vec::new(),
            locators: Vec::new(),
            lifecycle_hooks: Vec::new(),
            control_flow: Vec::new(),
            validation_warnings: Vec::new(),
            semantic_flags: Vec::new(),
            extraction_version: "v1".to_string(),
            debug_info: None,
        };

        let prompt = build_prompt(&minimize(&model)).expect("prompt");
        assert!(prompt.contains("\"value\": \"admin\""));
        assert!(!prompt.contains("secret-field"));
        assert!(!prompt.contains("LoginPage.login"));
    }

    #[test]
    fn system_prompt_lists_every_test_type() {
        let prompt = system_prompt();
        assert!(TEST_TYPES.iter().all(|t| prompt.contains(t)));
    }
}
