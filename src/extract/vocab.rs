//! Call vocabularies recognised by the extraction walker.
//!
//! Names are compared after [`fold`], so `sendKeys`, `send_keys` and `SEND_KEYS`
//! all hit the same entry and one table serves every dialect.

use crate::intent::{ActionKind, AssertOperator, HookType, HttpMethod, LocatorStrategy};

pub fn fold(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn lookup<T: Copy>(table: &[(&str, T)], name: &str) -> Option<T> {
    let folded = fold(name);
    table
        .iter()
        .find(|(key, _)| *key == folded)
        .map(|(_, value)| *value)
}

/// Calls made directly on an element handle.
const UI_ACTIONS: &[(&str, ActionKind)] = &[
    ("click", ActionKind::Click),
    ("sendkeys", ActionKind::Type),
    ("clear", ActionKind::Clear),
    ("submit", ActionKind::Submit),
    ("gettext", ActionKind::GetText),
    ("getattribute", ActionKind::GetAttribute),
    ("isdisplayed", ActionKind::IsDisplayed),
    ("isenabled", ActionKind::IsEnabled),
    ("isselected", ActionKind::IsSelected),
];

/// Helper methods from BasePage/WebUtil style wrappers whose first argument is a locator.
const WRAPPER_ACTIONS: &[(&str, ActionKind)] = &[
    ("clickelement", ActionKind::Click),
    ("clickandwaitelement", ActionKind::Click),
    ("waittillclickableandclick", ActionKind::Click),
    ("inputtext", ActionKind::Type),
    ("entertext", ActionKind::Type),
    ("settext", ActionKind::Type),
    ("typetext", ActionKind::Type),
    ("gettext", ActionKind::GetText),
    ("waituntilelementisvisible", ActionKind::Wait),
    ("waituntilelementisclickable", ActionKind::Wait),
    ("iselementvisible", ActionKind::Wait),
    ("waitforelement", ActionKind::Wait),
    ("visibilityofelementlocated", ActionKind::Wait),
    ("presenceofelementlocated", ActionKind::Wait),
    ("elementtobeclickable", ActionKind::Wait),
    ("waitforframeandswitch", ActionKind::SwitchFrame),
    ("refresh", ActionKind::Refresh),
    ("click", ActionKind::Click),
    ("type", ActionKind::Type),
    ("wait", ActionKind::Wait),
    ("clear", ActionKind::Clear),
];

const DRIVER_RECEIVER_HINTS: &[&str] = &["driver", "browser"];

const ELEMENT_LOOKUPS: &[&str] = &["findelement", "findelements"];

/// Calls chained on `driver.navigate()`.
const NAVIGATION_CHAIN: &[(&str, ActionKind)] = &[
    ("to", ActionKind::Navigate),
    ("back", ActionKind::NavigateBack),
    ("forward", ActionKind::NavigateForward),
    ("refresh", ActionKind::Refresh),
];

const ASSERTIONS: &[(&str, AssertOperator)] = &[
    ("assertequals", AssertOperator::Equals),
    ("assertequal", AssertOperator::Equals),
    ("assertnotequals", AssertOperator::NotEquals),
    ("assertnotequal", AssertOperator::NotEquals),
    ("asserttrue", AssertOperator::True),
    ("assertfalse", AssertOperator::False),
    ("assertnull", AssertOperator::Null),
    ("assertisnone", AssertOperator::Null),
    ("assertnotnull", AssertOperator::NotNull),
    ("assertisnotnone", AssertOperator::NotNull),
    ("fail", AssertOperator::Fail),
    ("assertthat", AssertOperator::That),
    ("expect", AssertOperator::That),
    ("verify", AssertOperator::That),
    ("verifytrue", AssertOperator::True),
    ("verifyfalse", AssertOperator::False),
    ("verifyequals", AssertOperator::Equals),
    ("verifynotequals", AssertOperator::NotEquals),
    ("verifyelementpresent", AssertOperator::Present),
    ("verifyelementnotpresent", AssertOperator::NotPresent),
];

const ASSERTION_RECEIVER_HINTS: &[&str] = &["assert", "expect", "verify"];

const HTTP_VERBS: &[(&str, HttpMethod)] = &[
    ("get", HttpMethod::Get),
    ("post", HttpMethod::Post),
    ("put", HttpMethod::Put),
    ("delete", HttpMethod::Delete),
    ("patch", HttpMethod::Patch),
    ("head", HttpMethod::Head),
    ("options", HttpMethod::Options),
];

const API_UTIL_VERBS: &[(&str, HttpMethod)] = &[
    ("sendget", HttpMethod::Get),
    ("sendpost", HttpMethod::Post),
    ("sendput", HttpMethod::Put),
    ("senddelete", HttpMethod::Delete),
    ("sendpatch", HttpMethod::Patch),
    ("getrequest", HttpMethod::Get),
    ("postrequest", HttpMethod::Post),
    ("putrequest", HttpMethod::Put),
    ("deleterequest", HttpMethod::Delete),
];

const API_RECEIVER_HINTS: &[&str] = &[
    "restassured",
    "given",
    "when",
    "request",
    "apiutil",
    "spec",
    "client",
    "session",
];

/// Accessors that read a response rather than build a request.
const RESPONSE_ACCESSORS: &[&str] = &["json", "headers", "cookies", "body", "jsonpath"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderPart {
    Payload,
    Header,
    Param,
}

const REQUEST_BUILDER: &[(&str, BuilderPart)] = &[
    ("body", BuilderPart::Payload),
    ("header", BuilderPart::Header),
    ("headers", BuilderPart::Header),
    ("param", BuilderPart::Param),
    ("params", BuilderPart::Param),
    ("queryparam", BuilderPart::Param),
    ("queryparams", BuilderPart::Param),
    ("pathparam", BuilderPart::Param),
    ("formparam", BuilderPart::Param),
];

const LOCATOR_STRATEGIES: &[(&str, LocatorStrategy)] = &[
    ("xpath", LocatorStrategy::Xpath),
    ("id", LocatorStrategy::Id),
    ("cssselector", LocatorStrategy::Css),
    ("css", LocatorStrategy::Css),
    ("classname", LocatorStrategy::ClassName),
    ("name", LocatorStrategy::Name),
    ("tagname", LocatorStrategy::TagName),
    ("linktext", LocatorStrategy::LinkText),
    ("partiallinktext", LocatorStrategy::PartialLinkText),
];

const JAVA_LIFECYCLE_ANNOTATIONS: &[(&str, HookType)] = &[
    ("beforesuite", HookType::BeforeSuite),
    ("beforeall", HookType::BeforeSuite),
    ("aftersuite", HookType::AfterSuite),
    ("afterall", HookType::AfterSuite),
    ("beforeclass", HookType::BeforeClass),
    ("afterclass", HookType::AfterClass),
    ("beforemethod", HookType::BeforeEach),
    ("before", HookType::BeforeEach),
    ("beforeeach", HookType::BeforeEach),
    ("aftermethod", HookType::AfterEach),
    ("after", HookType::AfterEach),
    ("aftereach", HookType::AfterEach),
    ("beforetest", HookType::BeforeTest),
    ("aftertest", HookType::AfterTest),
];

const PYTHON_LIFECYCLE_METHODS: &[(&str, HookType)] = &[
    ("setup", HookType::BeforeEach),
    ("setupmethod", HookType::BeforeEach),
    ("teardown", HookType::AfterEach),
    ("teardownmethod", HookType::AfterEach),
    ("setupclass", HookType::BeforeClass),
    ("teardownclass", HookType::AfterClass),
    ("setupmodule", HookType::BeforeSuite),
    ("teardownmodule", HookType::AfterSuite),
];

const TEST_MARKERS: &[&str] = &["test", "parameterizedtest", "repeatedtest"];

/// Closed vocabulary for the enrichment `test_type` classification.
pub const TEST_TYPES: &[&str] = &[
    "CRUD_CREATE",
    "CRUD_READ",
    "CRUD_UPDATE",
    "CRUD_DELETE",
    "AUTH",
    "VALIDATION",
    "API_INTEGRATION",
    "UI_NAV",
];

pub const TEARDOWN_KEYWORDS: &[&str] = &[
    "teardown", "close", "quit", "exit", "stop", "after", "cleanup",
];

pub const SETUP_KEYWORDS: &[&str] = &["setup", "init", "start", "entry", "before", "prepare"];

const DRIVER_INIT_HINTS: &[&str] = &[
    "startsession",
    "getdriver",
    "newdriver",
    "chromedriver",
    "firefoxdriver",
    "browserdriver",
    "webdriver(",
    "webdriver.",
    "init",
    "setup",
];

const DRIVER_CLOSE_HINTS: &[&str] = &["closesession", "quit", "close", "teardown", "stop"];

const REPORT_HINTS: &[&str] = &["report", "extent", "allure"];

const LOG_HINTS: &[&str] = &["log", "logger"];

pub fn ui_action(name: &str) -> Option<ActionKind> {
    lookup(UI_ACTIONS, name)
}

pub fn wrapper_action(name: &str) -> Option<ActionKind> {
    lookup(WRAPPER_ACTIONS, name)
}

pub fn is_element_lookup(name: &str) -> bool {
    ELEMENT_LOOKUPS.contains(&fold(name).as_str())
}

pub fn navigation_chain(name: &str) -> Option<ActionKind> {
    lookup(NAVIGATION_CHAIN, name)
}

pub fn is_driver_receiver(receiver: &str) -> bool {
    let lowered = receiver.to_lowercase();
    DRIVER_RECEIVER_HINTS
        .iter()
        .any(|hint| lowered.contains(hint))
}

pub fn assertion(name: &str) -> Option<AssertOperator> {
    lookup(ASSERTIONS, name)
}

/// Assertion calls need an assertion-like receiver, no receiver (static import),
/// or `self`/`this` for xUnit-style `self.assertEqual`.
pub fn is_assertion_receiver(receiver: &str, name: &str) -> bool {
    if receiver.is_empty() {
        return true;
    }
    if matches!(receiver, "self" | "this") {
        return fold(name).starts_with("assert");
    }
    let lowered = receiver.to_lowercase();
    ASSERTION_RECEIVER_HINTS
        .iter()
        .any(|hint| lowered.contains(hint))
}

pub fn http_verb(name: &str) -> Option<HttpMethod> {
    lookup(HTTP_VERBS, name)
}

pub fn api_util_verb(name: &str) -> Option<HttpMethod> {
    lookup(API_UTIL_VERBS, name)
}

/// Hints are matched against the root of the receiver chain only.
pub fn is_api_receiver(receiver: &str) -> bool {
    let lowered = receiver_root(receiver).to_lowercase();
    !lowered.is_empty() && API_RECEIVER_HINTS.iter().any(|hint| lowered.contains(hint))
}

/// Leading identifier of a receiver expression, skipping `self.`/`this.`.
pub fn receiver_root(receiver: &str) -> &str {
    let trimmed = receiver.trim_start();
    let rest = ["self.", "this.", "cls."]
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .unwrap_or(trimmed)
        .trim_start();
    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(rest.len());
    &rest[..end]
}

pub fn is_response_accessor(name: &str) -> bool {
    RESPONSE_ACCESSORS.contains(&fold(name).as_str())
}

pub fn builder_part(name: &str) -> Option<BuilderPart> {
    lookup(REQUEST_BUILDER, name)
}

pub fn locator_strategy(name: &str) -> Option<LocatorStrategy> {
    lookup(LOCATOR_STRATEGIES, name)
}

pub fn java_lifecycle(annotation: &str) -> Option<HookType> {
    lookup(JAVA_LIFECYCLE_ANNOTATIONS, annotation)
}

pub fn python_lifecycle(method: &str) -> Option<HookType> {
    lookup(PYTHON_LIFECYCLE_METHODS, method)
}

pub fn is_test_marker(annotation: &str) -> bool {
    TEST_MARKERS.contains(&fold(annotation).as_str())
}

/// Guess what a lifecycle hook does from its body; falls back to the method name.
pub fn infer_hook_action(hook_type: HookType, method: &str, body_text: &str) -> String {
    let body = body_text.to_lowercase();
    let has = |hints: &[&str]| hints.iter().any(|hint| body.contains(hint));
    let setup = hook_type.is_setup();

    if setup && has(DRIVER_INIT_HINTS) {
        return "driver_init".to_string();
    }
    if !setup && has(DRIVER_CLOSE_HINTS) {
        return "browser_close".to_string();
    }
    if has(REPORT_HINTS) {
        return if setup { "report_setup" } else { "report_teardown" }.to_string();
    }
    if has(LOG_HINTS) {
        return if setup { "logging_setup" } else { "logging_teardown" }.to_string();
    }
    method.to_string()
}
