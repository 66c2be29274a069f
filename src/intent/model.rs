use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Navigate,
    NavigateBack,
    NavigateForward,
    Refresh,
    Click,
    Type,
    Clear,
    Submit,
    GetText,
    GetAttribute,
    IsDisplayed,
    IsEnabled,
    IsSelected,
    Wait,
    SwitchFrame,
    HttpRequest,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::NavigateBack => "navigate_back",
            Self::NavigateForward => "navigate_forward",
            Self::Refresh => "refresh",
            Self::Click => "click",
            Self::Type => "type",
            Self::Clear => "clear",
            Self::Submit => "submit",
            Self::GetText => "get_text",
            Self::GetAttribute => "get_attribute",
            Self::IsDisplayed => "is_displayed",
            Self::IsEnabled => "is_enabled",
            Self::IsSelected => "is_selected",
            Self::Wait => "wait",
            Self::SwitchFrame => "switch_frame",
            Self::HttpRequest => "http_request",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorStrategy {
    Id,
    Xpath,
    Css,
    ClassName,
    Name,
    TagName,
    LinkText,
    PartialLinkText,
}

/// A UI element lookup descriptor, e.g. `{id, "username"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub strategy: LocatorStrategy,
    pub value: String,
}

impl Locator {
    pub fn new(strategy: LocatorStrategy, value: impl Into<String>) -> Self {
        Self {
            strategy,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub fn carries_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertOperator {
    Equals,
    NotEquals,
    True,
    False,
    Null,
    NotNull,
    Fail,
    That,
    Present,
    NotPresent,
}

/// Framework lifecycle category a hook runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookType {
    BeforeSuite,
    AfterSuite,
    BeforeClass,
    AfterClass,
    BeforeEach,
    AfterEach,
    BeforeTest,
    AfterTest,
}

impl HookType {
    pub fn is_setup(self) -> bool {
        matches!(
            self,
            Self::BeforeSuite | Self::BeforeClass | Self::BeforeEach | Self::BeforeTest
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    If,
    For,
    While,
    Do,
    Try,
    With,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowScope {
    /// Directly inside a test method body.
    Test,
    /// Inside an expanded page-object or wrapper method.
    Expansion,
}

// ----- raw facts -----

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallDetail {
    #[serde(rename = "fn")]
    pub call: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStep {
    pub action: ActionKind,
    pub detail: CallDetail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<Locator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_method: Option<String>,
}

impl RawStep {
    pub fn new(action: ActionKind, detail: CallDetail) -> Self {
        Self {
            action,
            detail,
            locator: None,
            url: None,
            url_ref: None,
            value: None,
            value_ref: None,
            method: None,
            endpoint: None,
            payload: None,
            headers: Vec::new(),
            params: Vec::new(),
            source_method: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAssertion {
    pub operator: AssertOperator,
    pub detail: CallDetail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_method: Option<String>,
}

impl RawAssertion {
    pub fn new(operator: AssertOperator, detail: CallDetail) -> Self {
        Self {
            operator,
            detail,
            left: None,
            right: None,
            condition: None,
            message: None,
            source_method: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocatorRef {
    pub class: String,
    pub field_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLocator {
    pub field_name: String,
    pub strategy: LocatorStrategy,
    pub value: String,
    pub class: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLifecycleHook {
    #[serde(rename = "type")]
    pub hook_type: HookType,
    pub method: String,
    /// Inferred label such as `driver_init`, or the method name.
    pub action: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFlowRecord {
    pub action: ControlKind,
    pub condition: String,
    pub scope: FlowScope,
    pub file: String,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionNoteKind {
    Cycle,
    DepthLimit,
}

/// A page-object call that resolved but was deliberately not expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionNote {
    pub kind: ExpansionNoteKind,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiagnostic {
    pub path: String,
    pub reason: String,
}

/// Facts collected by one extraction run over a feature's files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFactModel {
    pub raw_steps: Vec<RawStep>,
    pub assertions: Vec<RawAssertion>,
    pub locators: Vec<ResolvedLocator>,
    pub referenced_locators: Vec<LocatorRef>,
    pub lifecycle_hooks: Vec<RawLifecycleHook>,
    pub control_flow: Vec<ControlFlowRecord>,
    #[serde(default)]
    pub expansion_notes: Vec<ExpansionNote>,
    #[serde(default)]
    pub diagnostics: Vec<FileDiagnostic>,
}

// ----- canonical model -----

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepMetadata {
    pub source_method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalStep {
    pub action: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<Locator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<StepMetadata>,
}

impl CanonicalStep {
    pub fn new(action: ActionKind) -> Self {
        Self {
            action,
            locator: None,
            url: None,
            url_ref: None,
            value: None,
            value_ref: None,
            method: None,
            endpoint: None,
            payload: None,
            headers: Vec::new(),
            params: Vec::new(),
            metadata: None,
        }
    }

    #[cfg(test)]
    pub fn source_method(&self) -> Option<&str> {
        self.metadata.as_ref().map(|m| m.source_method.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalAssertion {
    pub operator: AssertOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<StepMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalLocator {
    pub class: String,
    pub field_name: String,
    pub strategy: LocatorStrategy,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalHook {
    #[serde(rename = "type")]
    pub hook_type: HookType,
    /// `setup`, `teardown`, or the lower-cased label when neither family matches.
    pub action: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalControlFlow {
    pub action: ControlKind,
    pub condition: String,
    pub scope: FlowScope,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationWarning {
    NoAssertionPresent,
    DuplicateWait,
    DynamicUrl,
    MissingPostActionValidation,
    SuspiciousStepOrdering,
    CyclicPageObjectCall,
    ExpansionDepthExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SemanticFlag {
    WeakTestStructure,
}

/// Framework-agnostic description of one feature's behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalIntentModel {
    pub steps: Vec<CanonicalStep>,
    pub assertions: Vec<CanonicalAssertion>,
    pub locators: Vec<CanonicalLocator>,
    pub lifecycle_hooks: Vec<CanonicalHook>,
    pub control_flow: Vec<CanonicalControlFlow>,
    pub validation_warnings: Vec<ValidationWarning>,
    pub semantic_flags: Vec<SemanticFlag>,
    pub extraction_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<Value>,
}

impl CanonicalIntentModel {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty() && self.assertions.is_empty()
    }
}
