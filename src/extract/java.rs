use tree_sitter::Node;

use crate::intent::{AssertOperator, ControlKind, HookType, Locator};
use crate::syntax::{descendants, is_comment, named_children, node_text};

use super::dialect::{
    bare_type_name, AssertionOperands, CallSite, ClassDecl, ControlConstruct, Dialect,
    LocalBinding, LocatorArg, Marker, MethodDecl, Receiver,
};
use super::vocab;

/// JUnit 4/5, TestNG, Selenium and RestAssured sources.
pub struct JavaDialect;

impl JavaDialect {
    fn markers(method: Node<'_>, src: &str) -> Vec<Marker> {
        named_children(method)
            .into_iter()
            .filter(|child| child.kind() == "modifiers")
            .flat_map(named_children)
            .filter(|m| matches!(m.kind(), "marker_annotation" | "annotation"))
            .filter_map(|annotation| {
                let name = annotation.child_by_field_name("name")?;
                let args = annotation
                    .child_by_field_name("arguments")
                    .map(|a| node_text(&a, src))
                    .unwrap_or_default();
                Some(Marker {
                    name: bare_type_name(&node_text(&name, src)),
                    args,
                })
            })
            .collect()
    }

    fn declarators(declaration: Node<'_>) -> Vec<Node<'_>> {
        named_children(declaration)
            .into_iter()
            .filter(|child| child.kind() == "variable_declarator")
            .collect()
    }

    fn declarator_name(declarator: Node<'_>, src: &str) -> Option<String> {
        declarator
            .child_by_field_name("name")
            .map(|name| node_text(&name, src))
    }

    /// First `By.<strategy>(...)` constructor anywhere under `node`.
    fn inline_locator(&self, node: Node<'_>, src: &str) -> Option<Locator> {
        descendants(node).into_iter().find_map(|candidate| {
            if candidate.kind() != "method_invocation" {
                return None;
            }
            let object = candidate.child_by_field_name("object")?;
            if node_text(&object, src) != "By" {
                return None;
            }
            let name = candidate.child_by_field_name("name")?;
            let strategy = vocab::locator_strategy(&node_text(&name, src))?;
            let args = candidate.child_by_field_name("arguments")?;
            let first = named_children(args).into_iter().find(|a| !is_comment(a))?;
            let value = self.string_value(first, src)?;
            Some(Locator::new(strategy, value))
        })
    }

    /// PageFactory `@FindBy(id = "v")` or `@FindBy(how = How.ID, using = "v")`.
    fn find_by(&self, field: Node<'_>, src: &str) -> Option<Locator> {
        let annotation = named_children(field)
            .into_iter()
            .filter(|child| child.kind() == "modifiers")
            .flat_map(named_children)
            .find(|m| {
                m.kind() == "annotation"
                    && m.child_by_field_name("name")
                        .map(|n| bare_type_name(&node_text(&n, src)) == "FindBy")
                        .unwrap_or(false)
            })?;
        let args = annotation.child_by_field_name("arguments")?;

        let mut how = None;
        let mut using = None;
        for pair in named_children(args)
            .into_iter()
            .filter(|p| p.kind() == "element_value_pair")
        {
            let (Some(key), Some(value)) = (
                pair.child_by_field_name("key"),
                pair.child_by_field_name("value"),
            ) else {
                continue;
            };
            let key = node_text(&key, src);
            match vocab::fold(&key).as_str() {
                "how" => {
                    let raw = node_text(&value, src);
                    how = vocab::locator_strategy(raw.rsplit('.').next().unwrap_or(&raw));
                }
                "using" => using = self.string_value(value, src),
                _ => {
                    if let (Some(strategy), Some(v)) =
                        (vocab::locator_strategy(&key), self.string_value(value, src))
                    {
                        return Some(Locator::new(strategy, v));
                    }
                }
            }
        }
        Some(Locator::new(how?, using?))
    }

    fn header(node: Node<'_>, src: &str) -> String {
        let text = node_text(&node, src);
        let head = text.split('{').next().unwrap_or(&text);
        head.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn condition(node: Node<'_>, src: &str) -> String {
        node.child_by_field_name("condition")
            .map(|c| {
                let text = node_text(&c, src);
                let trimmed = text.trim();
                trimmed
                    .strip_prefix('(')
                    .and_then(|t| t.strip_suffix(')'))
                    .unwrap_or(trimmed)
                    .trim()
                    .to_string()
            })
            .unwrap_or_default()
    }
}

impl Dialect for JavaDialect {
    fn classes<'t>(&self, root: Node<'t>, src: &str) -> Vec<ClassDecl<'t>> {
        descendants(root)
            .into_iter()
            .filter(|node| node.kind() == "class_declaration")
            .filter_map(|node| {
                let name = node_text(&node.child_by_field_name("name")?, src);
                let parent = node
                    .child_by_field_name("superclass")
                    .map(|s| bare_type_name(&node_text(&s, src)))
                    .filter(|p| !p.is_empty());
                Some(ClassDecl {
                    name,
                    parent,
                    body: node.child_by_field_name("body"),
                })
            })
            .collect()
    }

    fn methods<'t>(&self, class: &ClassDecl<'t>, src: &str) -> Vec<MethodDecl<'t>> {
        let Some(body) = class.body else {
            return Vec::new();
        };
        named_children(body)
            .into_iter()
            .filter(|member| member.kind() == "method_declaration")
            .filter_map(|member| {
                let name = node_text(&member.child_by_field_name("name")?, src);
                Some(MethodDecl {
                    name,
                    body: member.child_by_field_name("body"),
                    markers: Self::markers(member, src),
                })
            })
            .collect()
    }

    fn locator_fields(&self, class: &ClassDecl<'_>, src: &str) -> Vec<(String, Locator)> {
        let Some(body) = class.body else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for field in named_children(body)
            .into_iter()
            .filter(|m| m.kind() == "field_declaration")
        {
            let annotated = self.find_by(field, src);
            for declarator in Self::declarators(field) {
                let Some(name) = Self::declarator_name(declarator, src) else {
                    continue;
                };
                let locator = declarator
                    .child_by_field_name("value")
                    .and_then(|value| self.inline_locator(value, src))
                    .or_else(|| annotated.clone());
                if let Some(locator) = locator {
                    out.push((name, locator));
                }
            }
        }
        out
    }

    fn typed_fields(&self, class: &ClassDecl<'_>, src: &str) -> Vec<(String, String)> {
        let Some(body) = class.body else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for field in named_children(body)
            .into_iter()
            .filter(|m| m.kind() == "field_declaration")
        {
            let Some(ty) = field.child_by_field_name("type") else {
                continue;
            };
            let ty = bare_type_name(&node_text(&ty, src));
            for declarator in Self::declarators(field) {
                if let Some(name) = Self::declarator_name(declarator, src) {
                    out.push((name, ty.clone()));
                }
            }
        }
        out
    }

    fn is_test(&self, method: &MethodDecl<'_>) -> bool {
        method.markers.iter().any(|m| vocab::is_test_marker(&m.name))
    }

    fn hook_type(&self, method: &MethodDecl<'_>) -> Option<HookType> {
        method
            .markers
            .iter()
            .find_map(|m| vocab::java_lifecycle(&m.name))
    }

    fn call_site<'t>(&self, node: Node<'t>, src: &str) -> Option<CallSite<'t>> {
        if node.kind() != "method_invocation" {
            return None;
        }
        let name = node_text(&node.child_by_field_name("name")?, src);
        let args = node
            .child_by_field_name("arguments")
            .map(|a| {
                named_children(a)
                    .into_iter()
                    .filter(|n| !is_comment(n))
                    .collect()
            })
            .unwrap_or_default();
        Some(CallSite {
            name,
            object: node.child_by_field_name("object"),
            args,
        })
    }

    fn string_value(&self, node: Node<'_>, src: &str) -> Option<String> {
        match node.kind() {
            "string_literal" => {
                let text = node_text(&node, src);
                let inner = text
                    .strip_prefix("\"\"\"")
                    .and_then(|t| t.strip_suffix("\"\"\""))
                    .or_else(|| text.strip_prefix('"').and_then(|t| t.strip_suffix('"')))
                    .unwrap_or(&text);
                Some(inner.to_string())
            }
            "method_invocation" => {
                let call = self.call_site(node, src)?;
                let object = call.object.map(|o| node_text(&o, src));
                if call.name == "format" && object.as_deref() == Some("String") {
                    self.string_value(*call.args.first()?, src)
                } else {
                    None
                }
            }
            "parenthesized_expression" => self.string_value(node.named_child(0)?, src),
            _ => None,
        }
    }

    fn locator_arg(&self, args: &[Node<'_>], src: &str) -> LocatorArg {
        let Some(first) = args.first() else {
            return LocatorArg::Absent;
        };
        if let Some(locator) = self.inline_locator(*first, src) {
            return LocatorArg::Inline(locator);
        }
        match first.kind() {
            "identifier" => LocatorArg::Field(node_text(first, src)),
            "field_access" => {
                let object = first.child_by_field_name("object");
                let field = first.child_by_field_name("field");
                match (object, field) {
                    (Some(o), Some(f)) if o.kind() == "this" => {
                        LocatorArg::Field(node_text(&f, src))
                    }
                    _ => LocatorArg::Absent,
                }
            }
            _ => LocatorArg::Absent,
        }
    }

    fn control_flow<'t>(&self, node: Node<'t>, src: &str) -> Option<ControlConstruct<'t>> {
        let field = |name: &str| node.child_by_field_name(name);
        let body = field("body");
        let (kind, condition, header, blocks): (ControlKind, String, Vec<Node<'t>>, Vec<Node<'t>>) =
            match node.kind() {
                "if_statement" => (
                    ControlKind::If,
                    Self::condition(node, src),
                    field("condition").into_iter().collect(),
                    [field("consequence"), field("alternative")]
                        .into_iter()
                        .flatten()
                        .collect(),
                ),
                "for_statement" => (
                    ControlKind::For,
                    Self::header(node, src),
                    named_children(node)
                        .into_iter()
                        .filter(|c| Some(c.id()) != body.map(|b| b.id()))
                        .collect(),
                    body.into_iter().collect(),
                ),
                "enhanced_for_statement" => (
                    ControlKind::For,
                    Self::header(node, src),
                    field("value").into_iter().collect(),
                    body.into_iter().collect(),
                ),
                "while_statement" => (
                    ControlKind::While,
                    Self::condition(node, src),
                    field("condition").into_iter().collect(),
                    body.into_iter().collect(),
                ),
                // The condition runs after the body, so it is walked as a trailing block.
                "do_statement" => (
                    ControlKind::Do,
                    Self::condition(node, src),
                    Vec::new(),
                    [body, field("condition")].into_iter().flatten().collect(),
                ),
                "try_statement" | "try_with_resources_statement" => {
                    let mut blocks: Vec<Node<'t>> = body.into_iter().collect();
                    for clause in named_children(node) {
                        match clause.kind() {
                            "catch_clause" => blocks.extend(clause.child_by_field_name("body")),
                            "finally_clause" => blocks.extend(
                                named_children(clause)
                                    .into_iter()
                                    .filter(|c| c.kind() == "block"),
                            ),
                            _ => {}
                        }
                    }
                    let resources = field("resources");
                    let condition = resources.map(|r| node_text(&r, src)).unwrap_or_default();
                    (
                        ControlKind::Try,
                        condition,
                        resources.into_iter().collect(),
                        blocks,
                    )
                }
                _ => return None,
            };
        Some(ControlConstruct {
            kind,
            condition,
            header,
            blocks,
        })
    }

    fn assertion_statement(&self, node: Node<'_>, src: &str) -> Option<AssertionOperands> {
        if node.kind() != "assert_statement" {
            return None;
        }
        let condition = node.named_child(0).map(|c| node_text(&c, src));
        Some(AssertionOperands {
            operator: AssertOperator::True,
            left: None,
            right: None,
            condition,
        })
    }

    fn receiver<'t>(&self, node: Node<'t>, src: &'t str) -> Receiver<'t> {
        let text = node.utf8_text(src.as_bytes()).unwrap_or("");
        match node.kind() {
            "this" => Receiver::This,
            "super" => Receiver::Super,
            "identifier" => Receiver::Name(text),
            "field_access" => {
                let object = node.child_by_field_name("object");
                let field = node.child_by_field_name("field");
                match (object, field) {
                    (Some(o), Some(f)) if o.kind() == "this" => {
                        Receiver::Field(f.utf8_text(src.as_bytes()).unwrap_or(""))
                    }
                    _ => Receiver::Name(text.split('.').next().unwrap_or(text)),
                }
            }
            "method_invocation" => Receiver::Call(node),
            _ => Receiver::Expr(node),
        }
    }

    fn constructed_type(&self, node: Node<'_>, src: &str) -> Option<String> {
        match node.kind() {
            "object_creation_expression" => node
                .child_by_field_name("type")
                .map(|t| bare_type_name(&node_text(&t, src))),
            "parenthesized_expression" | "cast_expression" => {
                let inner = node
                    .child_by_field_name("value")
                    .or_else(|| node.named_child(node.named_child_count().checked_sub(1)?))?;
                self.constructed_type(inner, src)
            }
            _ => None,
        }
    }

    fn local_binding<'t>(
        &self,
        body: Node<'t>,
        name: &str,
        src: &str,
    ) -> Option<LocalBinding<'t>> {
        descendants(body)
            .into_iter()
            .filter(|n| n.kind() == "local_variable_declaration")
            .find_map(|decl| {
                let declared_type = decl
                    .child_by_field_name("type")
                    .map(|t| bare_type_name(&node_text(&t, src)))
                    .filter(|t| t != "var");
                Self::declarators(decl)
                    .into_iter()
                    .find(|d| Self::declarator_name(*d, src).as_deref() == Some(name))
                    .map(|d| LocalBinding {
                        declared_type,
                        initializer: d.child_by_field_name("value"),
                    })
            })
    }

    fn is_block(&self, node: Node<'_>) -> bool {
        node.kind() == "block"
    }

    fn is_nested_definition(&self, node: Node<'_>) -> bool {
        matches!(
            node.kind(),
            "class_declaration"
                | "interface_declaration"
                | "enum_declaration"
                | "record_declaration"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::dialect::{class_hooks, test_units};
    use crate::intent::LocatorStrategy;
    use crate::syntax::{ParsedSource, SourceLanguage};

    fn parse(src: &str) -> ParsedSource {
        ParsedSource::parse("Fixture.java", SourceLanguage::Java, src).expect("parse java")
    }

    const PAGE: &str = r#"
public class LoginPage extends BasePage<LoginPage> {
    private By username = By.id("user");
    private By row = By.xpath(String.format("//tr[%d]", 1));
    @FindBy(how = How.CSS, using = ".submit")
    private WebElement submit;
    @FindBy(name = "pwd")
    private WebElement password;
    private HomePage home;

    public void login(String user) {
        type(username, user);
    }
}
"#;

    #[test]
    fn class_declaration_exposes_parent_without_generics() {
        let parsed = parse(PAGE);
        let classes = JavaDialect.classes(parsed.root(), &parsed.source);
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].name, "LoginPage");
        assert_eq!(classes[0].parent.as_deref(), Some("BasePage"));
    }

    #[test]
    fn locator_fields_cover_constructors_templates_and_find_by() {
        let parsed = parse(PAGE);
        let class = &JavaDialect.classes(parsed.root(), &parsed.source)[0];
        let fields = JavaDialect.locator_fields(class, &parsed.source);
        assert_eq!(
            fields,
            vec![
                ("username".to_string(), Locator::new(LocatorStrategy::Id, "user")),
                ("row".to_string(), Locator::new(LocatorStrategy::Xpath, "//tr[%d]")),
                ("submit".to_string(), Locator::new(LocatorStrategy::Css, ".submit")),
                ("password".to_string(), Locator::new(LocatorStrategy::Name, "pwd")),
            ]
        );
        let typed = JavaDialect.typed_fields(class, &parsed.source);
        assert!(typed.contains(&("home".to_string(), "HomePage".to_string())));
    }

    #[test]
    fn annotated_methods_become_tests_and_hooks() {
        let parsed = parse(
            r#"
class LoginTest {
    @BeforeMethod(alwaysRun = true)
    public void setUp() { driver = new ChromeDriver(); }

    @Test
    public void logsIn() { driver.get("https://x"); }

    @org.junit.jupiter.api.AfterAll
    static void shutdown() { driver.quit(); }

    void helper() {}
}
"#,
        );
        let root = parsed.root();
        let units = test_units(&JavaDialect, root, &parsed.source);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name, "logsIn");
        assert_eq!(units[0].class.as_deref(), Some("LoginTest"));

        let class = &JavaDialect.classes(root, &parsed.source)[0];
        let hooks = class_hooks(&JavaDialect, class, &parsed.source);
        let summary: Vec<_> = hooks
            .iter()
            .map(|h| (h.hook_type, h.method.as_str(), h.action.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (HookType::BeforeEach, "setUp", "driver_init"),
                (HookType::AfterSuite, "shutdown", "browser_close"),
            ]
        );
    }

    #[test]
    fn string_values_accept_literals_and_format_templates_only() {
        let parsed = parse(
            r#"class A { void m() { f("plain", String.format("/u/%s", id), base + "/x"); } }"#,
        );
        let call = descendants(parsed.root())
            .into_iter()
            .find_map(|n| JavaDialect.call_site(n, &parsed.source))
            .expect("call");
        let values: Vec<_> = call
            .args
            .iter()
            .map(|a| JavaDialect.string_value(*a, &parsed.source))
            .collect();
        assert_eq!(
            values,
            vec![Some("plain".to_string()), Some("/u/%s".to_string()), None]
        );
    }

    #[test]
    fn try_blocks_include_catch_and_finally() {
        let parsed = parse(
            r#"class A { void m() { try { a(); } catch (Exception e) { b(); } finally { c(); } } }"#,
        );
        let node = descendants(parsed.root())
            .into_iter()
            .find(|n| n.kind() == "try_statement")
            .expect("try");
        let construct = JavaDialect.control_flow(node, &parsed.source).expect("construct");
        assert_eq!(construct.kind, ControlKind::Try);
        assert_eq!(construct.blocks.len(), 3);
    }

    #[test]
    fn resources_and_loop_iterables_are_header_expressions() {
        let parsed = parse(
            r#"class A { void m() {
                try (Response r = api.fetch()) { a(); }
                for (String id : repo.ids()) { b(id); }
                do { c(); } while (more());
            } }"#,
        );
        let constructs: Vec<_> = descendants(parsed.root())
            .into_iter()
            .filter_map(|n| JavaDialect.control_flow(n, &parsed.source))
            .collect();
        assert_eq!(constructs.len(), 3);
        assert_eq!(constructs[0].kind, ControlKind::Try);
        assert_eq!(constructs[0].header.len(), 1);
        assert_eq!(
            node_text(&constructs[1].header[0], &parsed.source),
            "repo.ids()"
        );
        assert_eq!(constructs[2].kind, ControlKind::Do);
        assert!(constructs[2].header.is_empty());
        assert_eq!(constructs[2].blocks.len(), 2);
    }

    #[test]
    fn set_up_hooks_are_judged_by_their_body() {
        let parsed = parse(
            r#"
class OrdersTest {
    @BeforeMethod
    public void setUp() { orders = seedOrders(3); }
}
"#,
        );
        let class = &JavaDialect.classes(parsed.root(), &parsed.source)[0];
        let hooks = class_hooks(&JavaDialect, class, &parsed.source);
        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks[0].action, "setUp");
    }

    #[test]
    fn local_binding_reports_declared_type_and_initializer() {
        let parsed = parse(r#"class A { void m() { LoginPage lp = new LoginPage(driver); } }"#);
        let binding = JavaDialect
            .local_binding(parsed.root(), "lp", &parsed.source)
            .expect("binding");
        assert_eq!(binding.declared_type.as_deref(), Some("LoginPage"));
        let init = binding.initializer.expect("initializer");
        assert_eq!(
            JavaDialect.constructed_type(init, &parsed.source).as_deref(),
            Some("LoginPage")
        );
    }
}
