use std::collections::HashSet;
use std::mem;

use tracing::{debug, warn};
use tree_sitter::Node;

use crate::intent::{
    ActionKind, AssertOperator, CallDetail, ControlFlowRecord, ExpansionNote, ExpansionNoteKind,
    FlowScope, Locator, LocatorRef, RawAssertion, RawFactModel, RawLifecycleHook, RawStep,
    ResolvedLocator,
};
use crate::syntax::{is_comment, named_children, node_text, ParsedSource};

use super::dialect::{dialect_for, file_hooks, test_units, CallSite, Dialect, LocatorArg, Receiver};
use super::index::{MethodRef, WorkspaceIndex};
use super::vocab::{self, BuilderPart};

pub const DEFAULT_MAX_EXPANSION_DEPTH: usize = 5;

/// Placeholder for values only known at runtime; the expression goes to `*_ref`.
pub const DYNAMIC: &str = "dynamic";

#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    pub max_depth: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_EXPANSION_DEPTH,
        }
    }
}

/// Fluent request-builder parts waiting for a terminal HTTP verb.
#[derive(Debug, Default)]
struct ApiContext {
    payload: Option<String>,
    headers: Vec<String>,
    params: Vec<String>,
}

impl ApiContext {
    fn absorb(&mut self, part: BuilderPart, text: String) {
        match part {
            BuilderPart::Payload => self.payload = Some(text),
            BuilderPart::Header => self.headers.push(text),
            BuilderPart::Param => self.params.push(text),
        }
    }

    /// Attach everything accumulated so far to a request step, builder parts first.
    fn drain_into(&mut self, step: &mut RawStep) {
        let ctx = mem::take(self);
        if step.payload.is_none() {
            step.payload = ctx.payload;
        }
        let mut headers = ctx.headers;
        headers.append(&mut step.headers);
        step.headers = headers;
        let mut params = ctx.params;
        params.append(&mut step.params);
        step.params = params;
    }
}

/// The method body currently being walked.
struct Frame<'a> {
    parsed: &'a ParsedSource,
    dialect: &'static dyn Dialect,
    /// Class used to resolve `this`, fields and locators.
    class: Option<String>,
    body: Node<'a>,
    depth: usize,
    /// `Class.method` of the body, used as provenance inside expansions.
    label: String,
}

impl<'a> Frame<'a> {
    fn src(&self) -> &'a str {
        self.parsed.source.as_str()
    }

    fn text(&self, node: Node<'_>) -> String {
        node_text(&node, self.src())
    }

    fn file(&self) -> String {
        self.parsed.display_path()
    }

    fn detail(&self, call: &CallSite<'_>) -> CallDetail {
        CallDetail {
            call: call.name.clone(),
            file: self.file(),
        }
    }

    fn source_method(&self) -> Option<String> {
        (self.depth > 0).then(|| self.label.clone())
    }

    fn string(&self, node: Node<'_>) -> Option<String> {
        self.dialect.string_value(node, self.src())
    }

    /// Literal value, or the `dynamic` placeholder plus the expression text.
    fn value_of(&self, node: Node<'_>) -> (String, Option<String>) {
        match self.string(node) {
            Some(value) => (value, None),
            None => (DYNAMIC.to_string(), Some(self.text(node))),
        }
    }

    /// Last segment of a receiver chain: `json` for `response.json()`,
    /// `headers` for `response.headers`.
    fn tail(&self, object: Node<'_>) -> String {
        if let Some(inner) = self.dialect.call_site(object, self.src()) {
            return inner.name;
        }
        let text = self.text(object);
        text.rsplit('.').next().unwrap_or_default().trim().to_string()
    }

    fn positional(&self, call: &CallSite<'a>) -> Vec<Node<'a>> {
        call.args
            .iter()
            .copied()
            .filter(|a| a.kind() != "keyword_argument")
            .collect()
    }
}

struct ExpansionTarget {
    class: String,
    owner: String,
    method: String,
    body: MethodRef,
}

enum Recognized {
    Step {
        step: RawStep,
        reference: Option<LocatorRef>,
    },
    Assertion(RawAssertion),
    Builder(BuilderPart, String),
    Request(RawStep),
    Expand(ExpansionTarget),
    Refused(ExpansionNoteKind, String),
}

enum Classification {
    Classified(Recognized),
    Unrecognized,
}

use Classification::{Classified, Unrecognized};

type Classifier<'a> = fn(&Walker<'a>, &Frame<'a>, &CallSite<'a>) -> Classification;

pub(crate) struct Walker<'a> {
    index: &'a WorkspaceIndex,
    max_depth: usize,
    facts: RawFactModel,
    referenced: HashSet<LocatorRef>,
    /// `(owner, method)` pairs on the current expansion path.
    path: Vec<(String, String)>,
    /// Control-flow nesting inside the current frame.
    nesting: usize,
    api: ApiContext,
}

impl<'a> Walker<'a> {
    pub(crate) fn new(index: &'a WorkspaceIndex, options: &ExtractOptions) -> Self {
        Self {
            index,
            max_depth: options.max_depth,
            facts: RawFactModel::default(),
            referenced: HashSet::new(),
            path: Vec::new(),
            nesting: 0,
            api: ApiContext::default(),
        }
    }

    /// Walk every test unit of a feature file and collect its lifecycle hooks.
    pub(crate) fn walk_source(&mut self, parsed: &'a ParsedSource) {
        let dialect = dialect_for(parsed.language);
        let units = test_units(dialect, parsed.root(), &parsed.source);
        debug!(path = %parsed.display_path(), tests = units.len(), "walking feature file");

        for unit in units {
            let label = match &unit.class {
                Some(class) => format!("{}.{}", class, unit.name),
                None => unit.name.clone(),
            };
            let frame = Frame {
                parsed,
                dialect,
                class: unit.class.clone(),
                body: unit.body,
                depth: 0,
                label,
            };
            self.api = ApiContext::default();
            self.nesting = 0;
            self.path = vec![(unit.class.unwrap_or_default(), unit.name)];
            self.walk_block(&frame, unit.body);
        }
        self.path.clear();
        self.collect_hooks(parsed);
    }

    pub(crate) fn finish(mut self) -> RawFactModel {
        let index = self.index;
        self.facts.locators = self
            .facts
            .referenced_locators
            .iter()
            .filter_map(|reference| {
                let (owner, locator) = index.find_locator(&reference.class, &reference.field_name)?;
                Some(ResolvedLocator {
                    field_name: reference.field_name.clone(),
                    strategy: locator.strategy,
                    value: locator.value.clone(),
                    class: owner.to_string(),
                    file: index
                        .class_file(owner)
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                })
            })
            .collect();
        self.facts
    }

    fn collect_hooks(&mut self, parsed: &'a ParsedSource) {
        let dialect = dialect_for(parsed.language);
        let root = parsed.root();
        let src = parsed.source.as_str();
        let file = parsed.display_path();

        let mut hooks: Vec<RawLifecycleHook> = file_hooks(dialect, root, src)
            .into_iter()
            .map(|h| RawLifecycleHook {
                hook_type: h.hook_type,
                method: h.method,
                action: h.action,
                file: file.clone(),
            })
            .collect();

        for class in dialect.classes(root, src) {
            let Some(parent) = class.parent.as_deref() else {
                continue;
            };
            for ancestor in self.index.lineage(parent) {
                let Some(entry) = self.index.class(ancestor) else {
                    continue;
                };
                let ancestor_file = self
                    .index
                    .class_file(ancestor)
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                hooks.extend(entry.hooks.iter().map(|h| RawLifecycleHook {
                    hook_type: h.hook_type,
                    method: h.method.clone(),
                    action: h.action.clone(),
                    file: ancestor_file.clone(),
                }));
            }
        }

        for hook in hooks {
            let seen = self.facts.lifecycle_hooks.iter().any(|h| {
                h.hook_type == hook.hook_type && h.method == hook.method && h.action == hook.action
            });
            if !seen {
                self.facts.lifecycle_hooks.push(hook);
            }
        }
    }

    fn walk_block(&mut self, frame: &Frame<'a>, node: Node<'a>) {
        if frame.dialect.is_block(node) {
            for child in named_children(node) {
                self.walk(frame, child);
            }
        } else {
            self.walk(frame, node);
        }
    }

    fn walk(&mut self, frame: &Frame<'a>, node: Node<'a>) {
        if is_comment(&node) || frame.dialect.is_nested_definition(node) {
            return;
        }
        let src = frame.src();

        if let Some(operands) = frame.dialect.assertion_statement(node, src) {
            for child in named_children(node) {
                self.walk(frame, child);
            }
            let mut assertion = RawAssertion::new(
                operands.operator,
                CallDetail {
                    call: "assert".to_string(),
                    file: frame.file(),
                },
            );
            assertion.left = operands.left;
            assertion.right = operands.right;
            assertion.condition = operands.condition;
            assertion.source_method = frame.source_method();
            self.facts.assertions.push(assertion);
            return;
        }

        if let Some(construct) = frame.dialect.control_flow(node, src) {
            if self.nesting == 0 {
                self.facts.control_flow.push(ControlFlowRecord {
                    action: construct.kind,
                    condition: construct.condition,
                    scope: if frame.depth == 0 {
                        FlowScope::Test
                    } else {
                        FlowScope::Expansion
                    },
                    file: frame.file(),
                    line: node.start_position().row + 1,
                });
            }
            self.nesting += 1;
            for expr in construct.header {
                self.walk(frame, expr);
            }
            for block in construct.blocks {
                self.walk_block(frame, block);
            }
            self.nesting -= 1;
            return;
        }

        if let Some(call) = frame.dialect.call_site(node, src) {
            if let Some(object) = call.object {
                self.walk(frame, object);
            }
            if let Classified(recognized) = self.classify(frame, &call) {
                self.apply(frame, recognized);
            }
            for arg in &call.args {
                self.walk(frame, *arg);
            }
            return;
        }

        for child in named_children(node) {
            self.walk(frame, child);
        }
    }

    fn classify(&self, frame: &Frame<'a>, call: &CallSite<'a>) -> Classification {
        let layers: [Classifier<'a>; 6] = [
            Self::navigation,
            Self::element_action,
            Self::wrapper_action,
            Self::assertion,
            Self::request,
            Self::expansion,
        ];
        for layer in layers {
            if let outcome @ Classified(_) = layer(self, frame, call) {
                return outcome;
            }
        }
        Unrecognized
    }

    fn apply(&mut self, frame: &Frame<'a>, recognized: Recognized) {
        match recognized {
            Recognized::Step {
                mut step,
                reference,
            } => {
                if let Some(reference) = reference {
                    self.reference(reference);
                }
                step.source_method = frame.source_method();
                self.facts.raw_steps.push(step);
            }
            Recognized::Assertion(mut assertion) => {
                assertion.source_method = frame.source_method();
                self.facts.assertions.push(assertion);
            }
            Recognized::Builder(part, text) => self.api.absorb(part, text),
            Recognized::Request(mut step) => {
                self.api.drain_into(&mut step);
                step.source_method = frame.source_method();
                self.facts.raw_steps.push(step);
            }
            Recognized::Expand(target) => self.expand(frame, target),
            Recognized::Refused(kind, target) => {
                warn!(?kind, target = %target, via = %frame.label, "page-object call not expanded");
                self.facts.expansion_notes.push(ExpansionNote {
                    kind,
                    target,
                    via: Some(frame.label.clone()),
                    file: frame.file(),
                });
            }
        }
    }

    fn expand(&mut self, frame: &Frame<'a>, target: ExpansionTarget) {
        let index = self.index;
        let Some((parsed, body)) = index.method_body(target.body) else {
            warn!(owner = %target.owner, method = %target.method, "indexed method body not found");
            return;
        };
        let child = Frame {
            parsed,
            dialect: dialect_for(parsed.language),
            class: Some(target.class),
            body,
            depth: frame.depth + 1,
            label: format!("{}.{}", target.owner, target.method),
        };
        debug!(method = %child.label, depth = child.depth, "expanding page-object call");

        self.path.push((target.owner, target.method));
        let nesting = mem::take(&mut self.nesting);
        self.walk_block(&child, body);
        self.nesting = nesting;
        self.path.pop();
    }

    fn reference(&mut self, reference: LocatorRef) {
        if self.referenced.insert(reference.clone()) {
            self.facts.referenced_locators.push(reference);
        }
    }

    // ----- classifiers, in precedence order -----

    fn navigation(&self, frame: &Frame<'a>, call: &CallSite<'a>) -> Classification {
        let Some(object) = call.object else {
            return Unrecognized;
        };
        let via_navigate = frame
            .dialect
            .call_site(object, frame.src())
            .map(|inner| vocab::fold(&inner.name) == "navigate")
            .unwrap_or(false);

        let kind = if via_navigate {
            vocab::navigation_chain(&call.name)
        } else if vocab::is_driver_receiver(&frame.text(object)) {
            match vocab::fold(&call.name).as_str() {
                "get" => Some(ActionKind::Navigate),
                _ => vocab::navigation_chain(&call.name).filter(|k| *k != ActionKind::Navigate),
            }
        } else {
            None
        };
        let Some(kind) = kind else {
            return Unrecognized;
        };

        let mut step = RawStep::new(kind, frame.detail(call));
        if kind == ActionKind::Navigate {
            if let Some(arg) = frame.positional(call).first() {
                let (url, url_ref) = frame.value_of(*arg);
                step.url = Some(url);
                step.url_ref = url_ref;
            }
        }
        Classified(Recognized::Step {
            step,
            reference: None,
        })
    }

    fn element_action(&self, frame: &Frame<'a>, call: &CallSite<'a>) -> Classification {
        let (Some(kind), Some(object)) = (vocab::ui_action(&call.name), call.object) else {
            return Unrecognized;
        };
        let Some((locator, reference)) = self.element_locator(frame, object) else {
            return Unrecognized;
        };

        let mut step = RawStep::new(kind, frame.detail(call));
        step.locator = locator;
        let args = frame.positional(call);
        match kind {
            ActionKind::Type => {
                if let Some(arg) = args.first() {
                    let (value, value_ref) = frame.value_of(*arg);
                    step.value = Some(value);
                    step.value_ref = value_ref;
                }
            }
            ActionKind::GetAttribute => {
                step.value = args.first().and_then(|a| frame.string(*a));
            }
            _ => {}
        }
        Classified(Recognized::Step { step, reference })
    }

    fn wrapper_action(&self, frame: &Frame<'a>, call: &CallSite<'a>) -> Classification {
        let Some(kind) = vocab::wrapper_action(&call.name) else {
            return Unrecognized;
        };
        let args = frame.positional(call);
        let locator_arg = frame.dialect.locator_arg(&args, frame.src());
        let own_helper = match call.object {
            None => true,
            Some(object) => matches!(
                frame.dialect.receiver(object, frame.src()),
                Receiver::This | Receiver::Super
            ),
        };
        if locator_arg == LocatorArg::Absent && !own_helper {
            return Unrecognized;
        }

        let width = locator_arg.width();
        let (locator, reference) = self.resolve_locator(frame, locator_arg);
        let mut step = RawStep::new(kind, frame.detail(call));
        step.locator = locator;

        if kind == ActionKind::Type {
            let rest = &args[width.min(args.len())..];
            let literal = rest.iter().find_map(|a| frame.string(*a));
            match (literal, rest.first()) {
                (Some(value), _) => step.value = Some(value),
                (None, Some(arg)) => {
                    step.value = Some(DYNAMIC.to_string());
                    step.value_ref = Some(frame.text(*arg));
                }
                (None, None) => {}
            }
        }
        Classified(Recognized::Step { step, reference })
    }

    fn assertion(&self, frame: &Frame<'a>, call: &CallSite<'a>) -> Classification {
        let Some(operator) = vocab::assertion(&call.name) else {
            return Unrecognized;
        };
        let receiver = call.object.map(|o| frame.text(o)).unwrap_or_default();
        if !vocab::is_assertion_receiver(&receiver, &call.name) {
            return Unrecognized;
        }

        let args = frame.positional(call);
        let text = |idx: usize| args.get(idx).map(|a| frame.text(*a));
        let literal = |idx: usize| args.get(idx).and_then(|a| frame.string(*a));
        let message_kw = frame
            .dialect
            .keyword_arg(&call.args, "msg", frame.src())
            .map(|m| frame.string(m).unwrap_or_else(|| frame.text(m)));

        let mut assertion = RawAssertion::new(operator, frame.detail(call));
        match operator {
            AssertOperator::Equals | AssertOperator::NotEquals => {
                let leading_message = args.len() >= 3 && literal(0).is_some();
                if leading_message {
                    assertion.message = literal(0);
                    assertion.left = text(1);
                    assertion.right = text(2);
                } else {
                    assertion.left = text(0);
                    assertion.right = text(1);
                    assertion.message = literal(2).or_else(|| text(2));
                }
            }
            AssertOperator::Fail => {
                assertion.message = literal(0).or_else(|| text(0));
            }
            _ => {
                let leading_message = args.len() >= 2 && literal(0).is_some();
                if leading_message {
                    assertion.message = literal(0);
                    assertion.condition = text(1);
                } else {
                    assertion.condition = text(0);
                    assertion.message = literal(1).or_else(|| text(1));
                }
            }
        }
        if assertion.message.is_none() {
            assertion.message = message_kw;
        }
        Classified(Recognized::Assertion(assertion))
    }

    fn request(&self, frame: &Frame<'a>, call: &CallSite<'a>) -> Classification {
        let args = frame.positional(call);
        let receiver = call.object.map(|o| frame.text(o)).unwrap_or_default();
        let fluent = call
            .object
            .map(|o| frame.dialect.call_site(o, frame.src()).is_some())
            .unwrap_or(false);

        if let Some(part) = vocab::builder_part(&call.name) {
            if !args.is_empty() && (fluent || vocab::is_api_receiver(&receiver)) {
                let text = match part {
                    BuilderPart::Payload => frame.text(args[0]),
                    BuilderPart::Header | BuilderPart::Param => args
                        .iter()
                        .map(|a| frame.text(*a))
                        .collect::<Vec<_>>()
                        .join(", "),
                };
                return Classified(Recognized::Builder(part, text));
            }
        }

        let (method, util) = if let Some(method) = vocab::api_util_verb(&call.name) {
            (method, true)
        } else {
            // `response.json().get("id")` reads a body, it does not send anything.
            let reads_response = call
                .object
                .is_some_and(|o| vocab::is_response_accessor(&frame.tail(o)));
            let api_receiver =
                call.object.is_some() && vocab::is_api_receiver(&receiver) && !reads_response;
            match vocab::http_verb(&call.name) {
                Some(method) if api_receiver => (method, false),
                _ => return Unrecognized,
            }
        };

        let mut step = RawStep::new(ActionKind::HttpRequest, frame.detail(call));
        step.method = Some(method);
        let endpoint_at = if util && method.carries_body() && args.len() > 1 {
            1
        } else {
            0
        };
        step.endpoint = args
            .get(endpoint_at)
            .map(|a| frame.string(*a).unwrap_or_else(|| frame.text(*a)));
        if endpoint_at == 1 {
            step.payload = Some(frame.text(args[0]));
        }

        let keyword = |key: &str| {
            frame
                .dialect
                .keyword_arg(&call.args, key, frame.src())
                .map(|v| frame.text(v))
        };
        if let Some(payload) = keyword("json").or_else(|| keyword("data")) {
            step.payload = Some(payload);
        }
        step.headers.extend(keyword("headers"));
        step.params.extend(keyword("params"));

        Classified(Recognized::Request(step))
    }

    fn expansion(&self, frame: &Frame<'a>, call: &CallSite<'a>) -> Classification {
        let Some(class) = self.receiver_class(frame, call.object) else {
            return Unrecognized;
        };
        let Some((owner, body)) = self.index.find_method(&class, &call.name) else {
            return Unrecognized;
        };
        let target = format!("{}.{}", owner, call.name);
        if self
            .path
            .iter()
            .any(|(o, m)| o == owner && *m == call.name)
        {
            return Classified(Recognized::Refused(ExpansionNoteKind::Cycle, target));
        }
        if frame.depth >= self.max_depth {
            return Classified(Recognized::Refused(ExpansionNoteKind::DepthLimit, target));
        }
        Classified(Recognized::Expand(ExpansionTarget {
            class,
            owner: owner.to_string(),
            method: call.name.clone(),
            body,
        }))
    }

    // ----- resolution helpers -----

    fn resolve_locator(
        &self,
        frame: &Frame<'a>,
        arg: LocatorArg,
    ) -> (Option<Locator>, Option<LocatorRef>) {
        match arg {
            LocatorArg::Inline(locator) | LocatorArg::Spread(locator) => (Some(locator), None),
            LocatorArg::Field(field) => {
                if let Some((owner, locator)) = frame
                    .class
                    .as_deref()
                    .and_then(|class| self.index.find_locator(class, &field))
                {
                    let reference = LocatorRef {
                        class: owner.to_string(),
                        field_name: field,
                    };
                    return (Some(locator.clone()), Some(reference));
                }
                // `By user = By.id("u"); driver.findElement(user);`
                let local = frame
                    .dialect
                    .local_binding(frame.body, &field, frame.src())
                    .and_then(|b| b.initializer)
                    .map(|init| frame.dialect.locator_arg(&[init], frame.src()));
                match local {
                    Some(LocatorArg::Inline(locator)) | Some(LocatorArg::Spread(locator)) => {
                        (Some(locator), None)
                    }
                    _ => {
                        debug!(field = %field, "locator reference left unresolved");
                        (None, None)
                    }
                }
            }
            LocatorArg::Absent => (None, None),
        }
    }

    /// Locator of an element-valued receiver: a lookup call, a local bound to
    /// one, or a locator-carrying field.
    fn element_locator(
        &self,
        frame: &Frame<'a>,
        object: Node<'a>,
    ) -> Option<(Option<Locator>, Option<LocatorRef>)> {
        let src = frame.src();
        let lookup = |node: Node<'a>| {
            frame
                .dialect
                .call_site(node, src)
                .filter(|c| vocab::is_element_lookup(&c.name))
                .map(|c| {
                    let args = frame.positional(&c);
                    self.resolve_locator(frame, frame.dialect.locator_arg(&args, src))
                })
        };
        if let Some(found) = lookup(object) {
            return Some(found);
        }

        let name = match frame.dialect.receiver(object, src) {
            Receiver::Name(name) | Receiver::Field(name) => name,
            _ => return None,
        };
        if let Some(init) = frame
            .dialect
            .local_binding(frame.body, name, src)
            .and_then(|b| b.initializer)
        {
            return lookup(init);
        }
        let class = frame.class.as_deref()?;
        self.index.find_locator(class, name)?;
        Some(self.resolve_locator(frame, LocatorArg::Field(name.to_string())))
    }

    fn receiver_class(&self, frame: &Frame<'a>, object: Option<Node<'a>>) -> Option<String> {
        let current = frame.class.as_deref();
        let Some(object) = object else {
            return current.map(str::to_string);
        };
        let index = self.index;
        match frame.dialect.receiver(object, frame.src()) {
            Receiver::This => current.map(str::to_string),
            Receiver::Super => current
                .and_then(|c| index.parent_of(c))
                .map(str::to_string),
            Receiver::Field(field) => current
                .and_then(|c| index.field_type(c, field))
                .and_then(|t| index.match_class_name(t))
                .map(str::to_string),
            Receiver::Name(name) => self.name_class(frame, name),
            Receiver::Call(node) => {
                let inner = frame.dialect.call_site(node, frame.src())?;
                self.receiver_class(frame, inner.object)
            }
            Receiver::Expr(node) => frame
                .dialect
                .constructed_type(node, frame.src())
                .and_then(|t| index.match_class_name(&t))
                .map(str::to_string),
        }
    }

    /// Local variable type, then field type, then a class named like the identifier.
    fn name_class(&self, frame: &Frame<'a>, name: &str) -> Option<String> {
        let index = self.index;
        let src = frame.src();
        if let Some(binding) = frame.dialect.local_binding(frame.body, name, src) {
            let by_type = binding
                .declared_type
                .as_deref()
                .and_then(|t| index.match_class_name(t));
            let by_init = || {
                binding
                    .initializer
                    .and_then(|init| frame.dialect.constructed_type(init, src))
                    .and_then(|t| index.match_class_name(&t).map(str::to_string))
            };
            if let Some(class) = by_type.map(str::to_string).or_else(by_init) {
                return Some(class);
            }
        }
        if let Some(class) = frame
            .class
            .as_deref()
            .and_then(|c| index.field_type(c, name))
            .and_then(|t| index.match_class_name(t))
        {
            return Some(class.to_string());
        }
        index.match_class_name(name).map(str::to_string)
    }
}
