use std::collections::HashSet;

use serde_json::json;

use super::model::*;
use crate::extract::vocab::{SETUP_KEYWORDS, TEARDOWN_KEYWORDS};
use crate::extract::DYNAMIC;

pub const DEFAULT_EXTRACTION_VERSION: &str = "v1";

#[cfg(test)]
pub fn normalize(raw: &RawFactModel) -> CanonicalIntentModel {
    normalize_as(raw, DEFAULT_EXTRACTION_VERSION)
}

/// Pure and deterministic: the same raw facts always give the same model.
pub fn normalize_as(raw: &RawFactModel, extraction_version: &str) -> CanonicalIntentModel {
    let steps: Vec<CanonicalStep> = raw.raw_steps.iter().map(canonical_step).collect();
    let assertions: Vec<CanonicalAssertion> =
        raw.assertions.iter().map(canonical_assertion).collect();

    let (validation_warnings, semantic_flags) =
        derive_warnings(&steps, &assertions, &raw.expansion_notes);

    CanonicalIntentModel {
        steps,
        assertions,
        locators: canonical_locators(&raw.locators),
        lifecycle_hooks: canonical_hooks(&raw.lifecycle_hooks),
        control_flow: raw
            .control_flow
            .iter()
            .filter(|c| c.scope == FlowScope::Test)
            .map(|c| CanonicalControlFlow {
                action: c.action,
                condition: c.condition.clone(),
                scope: c.scope,
                line: c.line,
            })
            .collect(),
        validation_warnings,
        semantic_flags,
        extraction_version: extraction_version.to_string(),
        debug_info: debug_info(raw),
    }
}

fn metadata(source_method: &Option<String>) -> Option<StepMetadata> {
    source_method.as_ref().map(|m| StepMetadata {
        source_method: m.clone(),
    })
}

fn canonical_step(raw: &RawStep) -> CanonicalStep {
    let mut step = CanonicalStep::new(raw.action);
    match raw.action {
        ActionKind::Navigate => {
            step.url = raw.url.clone();
            step.url_ref = raw.url_ref.clone();
        }
        ActionKind::Type => {
            step.locator = raw.locator.clone();
            step.value = raw.value.clone();
            step.value_ref = raw.value_ref.clone();
        }
        ActionKind::HttpRequest => {
            step.method = raw.method;
            step.endpoint = raw.endpoint.clone();
            step.payload = raw.payload.clone();
            step.headers = raw.headers.clone();
            step.params = raw.params.clone();
        }
        ActionKind::GetAttribute => {
            step.locator = raw.locator.clone();
            step.value = raw.value.clone();
        }
        ActionKind::NavigateBack | ActionKind::NavigateForward | ActionKind::Refresh => {}
        _ => step.locator = raw.locator.clone(),
    }
    step.metadata = metadata(&raw.source_method);
    step
}

fn canonical_assertion(raw: &RawAssertion) -> CanonicalAssertion {
    CanonicalAssertion {
        operator: raw.operator,
        left: raw.left.clone(),
        right: raw.right.clone(),
        condition: raw.condition.clone(),
        message: raw.message.clone(),
        metadata: metadata(&raw.source_method),
    }
}

fn canonical_locators(raw: &[ResolvedLocator]) -> Vec<CanonicalLocator> {
    let mut seen = HashSet::new();
    raw.iter()
        .filter(|l| seen.insert((l.class.clone(), l.field_name.clone())))
        .map(|l| CanonicalLocator {
            class: l.class.clone(),
            field_name: l.field_name.clone(),
            strategy: l.strategy,
            value: l.value.clone(),
        })
        .collect()
}

/// Collapse an inferred hook label into `setup`/`teardown`, or keep it lower-cased.
pub fn hook_bucket(action: &str) -> String {
    let lowered = action.to_lowercase();
    if TEARDOWN_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        "teardown".to_string()
    } else if SETUP_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        "setup".to_string()
    } else {
        lowered
    }
}

fn canonical_hooks(raw: &[RawLifecycleHook]) -> Vec<CanonicalHook> {
    let mut seen = HashSet::new();
    raw.iter()
        .filter_map(|hook| {
            let action = hook_bucket(&hook.action);
            seen.insert((hook.hook_type, action.clone()))
                .then(|| CanonicalHook {
                    hook_type: hook.hook_type,
                    action,
                    method: hook.method.clone(),
                })
        })
        .collect()
}

fn mentions(step: &CanonicalStep, needle: &str) -> bool {
    [
        step.value.as_deref(),
        step.value_ref.as_deref(),
        step.locator.as_ref().map(|l| l.value.as_str()),
    ]
    .into_iter()
    .flatten()
    .any(|text| text.to_lowercase().contains(needle))
}

fn first_type_step_mentioning(steps: &[CanonicalStep], needle: &str) -> Option<usize> {
    steps
        .iter()
        .position(|s| s.action == ActionKind::Type && mentions(s, needle))
}

fn derive_warnings(
    steps: &[CanonicalStep],
    assertions: &[CanonicalAssertion],
    notes: &[ExpansionNote],
) -> (Vec<ValidationWarning>, Vec<SemanticFlag>) {
    let mut warnings = Vec::new();
    let mut flags = Vec::new();

    if assertions.is_empty() {
        warnings.push(ValidationWarning::NoAssertionPresent);
        flags.push(SemanticFlag::WeakTestStructure);
    }

    let duplicate_wait = steps.windows(2).any(|pair| {
        pair[0].action == ActionKind::Wait
            && pair[1].action == ActionKind::Wait
            && pair[0].locator.is_some()
            && pair[0].locator == pair[1].locator
    });
    if duplicate_wait {
        warnings.push(ValidationWarning::DuplicateWait);
    }

    let dynamic_url = steps.iter().any(|s| {
        s.action == ActionKind::Navigate
            && (s.url_ref.is_some() || s.url.as_deref().map_or(true, |u| u == DYNAMIC))
    });
    if dynamic_url {
        warnings.push(ValidationWarning::DynamicUrl);
    }

    if !steps.is_empty() && assertions.is_empty() {
        warnings.push(ValidationWarning::MissingPostActionValidation);
    }

    if let (Some(password), Some(email)) = (
        first_type_step_mentioning(steps, "password"),
        first_type_step_mentioning(steps, "email"),
    ) {
        if password < email {
            warnings.push(ValidationWarning::SuspiciousStepOrdering);
        }
    }

    if notes.iter().any(|n| n.kind == ExpansionNoteKind::Cycle) {
        warnings.push(ValidationWarning::CyclicPageObjectCall);
    }
    if notes.iter().any(|n| n.kind == ExpansionNoteKind::DepthLimit) {
        warnings.push(ValidationWarning::ExpansionDepthExceeded);
    }

    (warnings, flags)
}

fn debug_info(raw: &RawFactModel) -> Option<serde_json::Value> {
    if raw.diagnostics.is_empty() && raw.expansion_notes.is_empty() {
        return None;
    }
    Some(json!({
        "diagnostics": raw.diagnostics,
        "expansion_notes": raw.expansion_notes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail() -> CallDetail {
        CallDetail {
            call: "x".to_string(),
            file: "T.java".to_string(),
        }
    }

    fn step(action: ActionKind) -> RawStep {
        RawStep::new(action, detail())
    }

    fn typed(locator: &str, value: &str) -> RawStep {
        let mut s = step(ActionKind::Type);
        s.locator = Some(Locator::new(LocatorStrategy::Id, locator));
        s.value = Some(value.to_string());
        s
    }

    fn hook(hook_type: HookType, method: &str, action: &str) -> RawLifecycleHook {
        RawLifecycleHook {
            hook_type,
            method: method.to_string(),
            action: action.to_string(),
            file: "Base.java".to_string(),
        }
    }

    #[test]
    fn step_shapes_depend_on_action() {
        let mut nav = step(ActionKind::Navigate);
        nav.url = Some("https://x".to_string());
        nav.locator = Some(Locator::new(LocatorStrategy::Id, "ignored"));
        let mut expanded = step(ActionKind::Click);
        expanded.locator = Some(Locator::new(LocatorStrategy::Css, ".go"));
        expanded.source_method = Some("LoginPage.login".to_string());
        let raw = RawFactModel {
            raw_steps: vec![nav, expanded],
            ..Default::default()
        };

        let model = normalize(&raw);
        assert!(model.steps[0].locator.is_none());
        assert_eq!(model.steps[0].url.as_deref(), Some("https://x"));
        assert_eq!(model.steps[1].source_method(), Some("LoginPage.login"));
        assert_eq!(model.extraction_version, DEFAULT_EXTRACTION_VERSION);
    }

    #[test]
    fn hooks_collapse_into_setup_and_teardown() {
        let raw = RawFactModel {
            lifecycle_hooks: vec![
                hook(HookType::BeforeEach, "setUp", "driver_init"),
                hook(HookType::BeforeEach, "initDriver", "driver_init"),
                hook(HookType::AfterSuite, "tearDown", "browser_close"),
                hook(HookType::BeforeClass, "loadData", "loadData"),
            ],
            ..Default::default()
        };
        let hooks = normalize(&raw).lifecycle_hooks;
        let summary: Vec<_> = hooks
            .iter()
            .map(|h| (h.hook_type, h.action.as_str(), h.method.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (HookType::BeforeEach, "setup", "setUp"),
                (HookType::AfterSuite, "teardown", "tearDown"),
                (HookType::BeforeClass, "loaddata", "loadData"),
            ]
        );
    }

    #[test]
    fn control_flow_keeps_only_test_scope() {
        let record = |scope| ControlFlowRecord {
            action: ControlKind::If,
            condition: "x".to_string(),
            scope,
            file: "T.java".to_string(),
            line: 3,
        };
        let raw = RawFactModel {
            control_flow: vec![record(FlowScope::Test), record(FlowScope::Expansion)],
            ..Default::default()
        };
        assert_eq!(normalize(&raw).control_flow.len(), 1);
    }

    #[test]
    fn warnings_are_derived_once_in_fixed_order() {
        let mut wait = step(ActionKind::Wait);
        wait.locator = Some(Locator::new(LocatorStrategy::Id, "spin"));
        let mut nav = step(ActionKind::Navigate);
        nav.url = Some(DYNAMIC.to_string());
        nav.url_ref = Some("baseUrl".to_string());
        let raw = RawFactModel {
            raw_steps: vec![
                nav.clone(),
                nav,
                wait.clone(),
                wait.clone(),
                wait,
                typed("password", "secret"),
                typed("email", "a@b.c"),
            ],
            expansion_notes: vec![ExpansionNote {
                kind: ExpansionNoteKind::Cycle,
                target: "A.a".to_string(),
                via: Some("A.b".to_string()),
                file: "A.java".to_string(),
            }],
            ..Default::default()
        };
        let model = normalize(&raw);
        assert_eq!(
            model.validation_warnings,
            vec![
                ValidationWarning::NoAssertionPresent,
                ValidationWarning::DuplicateWait,
                ValidationWarning::DynamicUrl,
                ValidationWarning::MissingPostActionValidation,
                ValidationWarning::SuspiciousStepOrdering,
                ValidationWarning::CyclicPageObjectCall,
            ]
        );
        assert_eq!(model.semantic_flags, vec![SemanticFlag::WeakTestStructure]);
        assert!(model.debug_info.is_some());
    }

    #[test]
    fn email_before_password_is_not_suspicious() {
        let raw = RawFactModel {
            raw_steps: vec![typed("email", "a@b.c"), typed("password", "secret")],
            assertions: vec![RawAssertion::new(AssertOperator::True, detail())],
            ..Default::default()
        };
        let model = normalize(&raw);
        assert!(model.validation_warnings.is_empty());
        assert!(model.semantic_flags.is_empty());
        assert!(model.debug_info.is_none());
    }

    #[test]
    fn locators_are_deduplicated_by_class_and_field() {
        let resolved = ResolvedLocator {
            field_name: "user".to_string(),
            strategy: LocatorStrategy::Id,
            value: "u".to_string(),
            class: "LoginPage".to_string(),
            file: "LoginPage.java".to_string(),
        };
        let raw = RawFactModel {
            locators: vec![resolved.clone(), resolved],
            ..Default::default()
        };
        let locators = normalize(&raw).locators;
        assert_eq!(locators.len(), 1);
        assert_eq!(locators[0].class, "LoginPage");
    }
}
