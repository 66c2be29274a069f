//! Language-specific answers to the questions the walker asks about syntax.

use tree_sitter::Node;

use crate::intent::{AssertOperator, ControlKind, HookType, Locator};
use crate::syntax::{node_text, SourceLanguage};

use super::java::JavaDialect;
use super::python::PythonDialect;
use super::vocab;

static JAVA: JavaDialect = JavaDialect;
static PYTHON: PythonDialect = PythonDialect;

pub fn dialect_for(language: SourceLanguage) -> &'static dyn Dialect {
    match language {
        SourceLanguage::Java => &JAVA,
        SourceLanguage::Python => &PYTHON,
    }
}

#[derive(Debug, Clone)]
pub struct ClassDecl<'t> {
    pub name: String,
    pub parent: Option<String>,
    pub body: Option<Node<'t>>,
}

/// An annotation (`@BeforeMethod`) or decorator (`@pytest.fixture(scope="session")`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub name: String,
    pub args: String,
}

#[derive(Debug, Clone)]
pub struct MethodDecl<'t> {
    pub name: String,
    pub body: Option<Node<'t>>,
    pub markers: Vec<Marker>,
}

#[derive(Debug, Clone)]
pub struct TestUnit<'t> {
    pub class: Option<String>,
    pub name: String,
    pub body: Node<'t>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookDecl {
    pub class: Option<String>,
    pub hook_type: HookType,
    pub method: String,
    pub action: String,
}

#[derive(Debug, Clone)]
pub struct CallSite<'t> {
    pub name: String,
    pub object: Option<Node<'t>>,
    pub args: Vec<Node<'t>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorArg {
    Inline(Locator),
    /// Strategy and value passed as two separate arguments, `find_element(By.ID, "v")`.
    Spread(Locator),
    Field(String),
    Absent,
}

impl LocatorArg {
    /// Number of leading arguments the locator occupies.
    pub fn width(&self) -> usize {
        match self {
            Self::Absent => 0,
            Self::Spread(_) => 2,
            Self::Inline(_) | Self::Field(_) => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControlConstruct<'t> {
    pub kind: ControlKind,
    pub condition: String,
    /// Expressions evaluated before the first block runs: the condition, the
    /// iterable, `with` items, try-with-resources declarations.
    pub header: Vec<Node<'t>>,
    pub blocks: Vec<Node<'t>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionOperands {
    pub operator: AssertOperator,
    pub left: Option<String>,
    pub right: Option<String>,
    pub condition: Option<String>,
}

/// What sits left of the dot in a call.
#[derive(Debug, Clone, Copy)]
pub enum Receiver<'t> {
    This,
    Super,
    Name(&'t str),
    Field(&'t str),
    Call(Node<'t>),
    Expr(Node<'t>),
}

#[derive(Debug, Clone)]
pub struct LocalBinding<'t> {
    pub declared_type: Option<String>,
    pub initializer: Option<Node<'t>>,
}

pub trait Dialect: Sync {
    fn classes<'t>(&self, root: Node<'t>, src: &str) -> Vec<ClassDecl<'t>>;

    fn methods<'t>(&self, class: &ClassDecl<'t>, src: &str) -> Vec<MethodDecl<'t>>;

    /// Free functions outside any class (pytest style).
    fn module_functions<'t>(&self, _root: Node<'t>, _src: &str) -> Vec<MethodDecl<'t>> {
        Vec::new()
    }

    fn locator_fields(&self, class: &ClassDecl<'_>, src: &str) -> Vec<(String, Locator)>;

    /// Field name to declared or constructed type.
    fn typed_fields(&self, class: &ClassDecl<'_>, src: &str) -> Vec<(String, String)>;

    fn is_test(&self, method: &MethodDecl<'_>) -> bool;

    fn hook_type(&self, method: &MethodDecl<'_>) -> Option<HookType>;

    fn call_site<'t>(&self, node: Node<'t>, src: &str) -> Option<CallSite<'t>>;

    /// Literal string value of an expression, `None` when it is computed at runtime.
    fn string_value(&self, node: Node<'_>, src: &str) -> Option<String>;

    fn locator_arg(&self, args: &[Node<'_>], src: &str) -> LocatorArg;

    fn control_flow<'t>(&self, node: Node<'t>, src: &str) -> Option<ControlConstruct<'t>>;

    fn assertion_statement(&self, node: Node<'_>, src: &str) -> Option<AssertionOperands>;

    fn receiver<'t>(&self, node: Node<'t>, src: &'t str) -> Receiver<'t>;

    fn constructed_type(&self, node: Node<'_>, src: &str) -> Option<String>;

    fn local_binding<'t>(&self, body: Node<'t>, name: &str, src: &str)
        -> Option<LocalBinding<'t>>;

    fn keyword_arg<'t>(&self, _args: &[Node<'t>], _key: &str, _src: &str) -> Option<Node<'t>> {
        None
    }

    fn is_block(&self, node: Node<'_>) -> bool;

    /// Nested classes and functions are not executed where they are declared.
    fn is_nested_definition(&self, node: Node<'_>) -> bool;
}

pub fn test_units<'t>(dialect: &dyn Dialect, root: Node<'t>, src: &str) -> Vec<TestUnit<'t>> {
    let mut units = Vec::new();
    for class in dialect.classes(root, src) {
        for method in dialect.methods(&class, src) {
            if let (true, Some(body)) = (dialect.is_test(&method), method.body) {
                units.push(TestUnit {
                    class: Some(class.name.clone()),
                    name: method.name,
                    body,
                });
            }
        }
    }
    for function in dialect.module_functions(root, src) {
        if let (true, Some(body)) = (dialect.is_test(&function), function.body) {
            units.push(TestUnit {
                class: None,
                name: function.name,
                body,
            });
        }
    }
    units.sort_by_key(|unit| unit.body.start_byte());
    units
}

pub fn class_hooks(dialect: &dyn Dialect, class: &ClassDecl<'_>, src: &str) -> Vec<HookDecl> {
    dialect
        .methods(class, src)
        .iter()
        .filter_map(|method| hook_decl(dialect, Some(&class.name), method, src))
        .collect()
}

/// Every lifecycle hook declared in a file, classes first, in declaration order.
pub fn file_hooks(dialect: &dyn Dialect, root: Node<'_>, src: &str) -> Vec<HookDecl> {
    let mut hooks: Vec<HookDecl> = dialect
        .classes(root, src)
        .iter()
        .flat_map(|class| class_hooks(dialect, class, src))
        .collect();
    hooks.extend(
        dialect
            .module_functions(root, src)
            .iter()
            .filter_map(|function| hook_decl(dialect, None, function, src)),
    );
    hooks
}

fn hook_decl(
    dialect: &dyn Dialect,
    class: Option<&String>,
    method: &MethodDecl<'_>,
    src: &str,
) -> Option<HookDecl> {
    let hook_type = dialect.hook_type(method)?;
    // The body alone: a hook named `setUp` says nothing about what it sets up.
    let body = method
        .body
        .map(|body| node_text(&body, src))
        .unwrap_or_default();
    Some(HookDecl {
        class: class.cloned(),
        hook_type,
        method: method.name.clone(),
        action: vocab::infer_hook_action(hook_type, &method.name, &body),
    })
}

/// Strip `extends`, package qualifiers and generic arguments from a type reference.
pub fn bare_type_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("extends").unwrap_or(trimmed).trim();
    let without_generics = trimmed.split('<').next().unwrap_or(trimmed);
    without_generics
        .rsplit('.')
        .next()
        .unwrap_or(without_generics)
        .trim()
        .to_string()
}
