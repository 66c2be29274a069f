use tree_sitter::Node;

use crate::intent::{AssertOperator, ControlKind, HookType, Locator};
use crate::syntax::{descendants, is_comment, named_children, node_text};

use super::dialect::{
    bare_type_name, AssertionOperands, CallSite, ClassDecl, ControlConstruct, Dialect,
    LocalBinding, LocatorArg, Marker, MethodDecl, Receiver,
};
use super::vocab;

/// pytest, unittest, Selenium and requests sources.
pub struct PythonDialect;

fn is_self(node: Node<'_>, src: &str) -> bool {
    node.kind() == "identifier" && matches!(node_text(&node, src).as_str(), "self" | "cls")
}

fn starts_uppercase(name: &str) -> bool {
    name.chars().next().map(char::is_uppercase).unwrap_or(false)
}

impl PythonDialect {
    fn function_decl<'t>(&self, node: Node<'t>, src: &str) -> Option<MethodDecl<'t>> {
        let (function, markers) = match node.kind() {
            "function_definition" => (node, Vec::new()),
            "decorated_definition" => {
                let function = node.child_by_field_name("definition")?;
                if function.kind() != "function_definition" {
                    return None;
                }
                let markers = named_children(node)
                    .into_iter()
                    .filter(|c| c.kind() == "decorator")
                    .filter_map(|d| Self::marker(d, src))
                    .collect();
                (function, markers)
            }
            _ => return None,
        };
        Some(MethodDecl {
            name: node_text(&function.child_by_field_name("name")?, src),
            body: function.child_by_field_name("body"),
            markers,
        })
    }

    fn marker(decorator: Node<'_>, src: &str) -> Option<Marker> {
        let expr = decorator.named_child(0)?;
        let (target, args) = if expr.kind() == "call" {
            let args = expr
                .child_by_field_name("arguments")
                .map(|a| node_text(&a, src))
                .unwrap_or_default();
            (expr.child_by_field_name("function")?, args)
        } else {
            (expr, String::new())
        };
        let name = match target.kind() {
            "attribute" => node_text(&target.child_by_field_name("attribute")?, src),
            _ => node_text(&target, src),
        };
        Some(Marker { name, args })
    }

    /// `(By.ID, "v")` or `("css selector", "v")`.
    fn locator_pair(&self, items: &[Node<'_>], src: &str) -> Option<Locator> {
        let [how, what, ..] = items else {
            return None;
        };
        let strategy = match how.kind() {
            "attribute" => {
                let object = how.child_by_field_name("object")?;
                if !node_text(&object, src).ends_with("By") {
                    return None;
                }
                vocab::locator_strategy(&node_text(&how.child_by_field_name("attribute")?, src))?
            }
            _ => vocab::locator_strategy(&self.string_value(*how, src)?)?,
        };
        Some(Locator::new(strategy, self.string_value(*what, src)?))
    }

    fn tuple_items<'t>(node: Node<'t>) -> Option<Vec<Node<'t>>> {
        match node.kind() {
            "tuple" | "expression_list" => Some(named_children(node)),
            "parenthesized_expression" => node.named_child(0).and_then(Self::tuple_items),
            _ => None,
        }
    }

    fn class_assignments<'t>(body: Node<'t>) -> Vec<Node<'t>> {
        named_children(body)
            .into_iter()
            .filter(|s| s.kind() == "expression_statement")
            .filter_map(|s| s.named_child(0))
            .filter(|a| a.kind() == "assignment")
            .collect()
    }

    fn fixture_scope(marker: &Marker) -> HookType {
        let args = marker.args.to_lowercase();
        if args.contains("\"session\"") || args.contains("'session'") {
            HookType::BeforeSuite
        } else if ["\"class\"", "'class'", "\"module\"", "'module'"]
            .iter()
            .any(|scope| args.contains(scope))
        {
            HookType::BeforeClass
        } else {
            HookType::BeforeEach
        }
    }

    fn comparison(&self, node: Node<'_>, src: &str) -> AssertionOperands {
        let operands = named_children(node);
        let operators: Vec<&str> = (0..node.child_count())
            .filter_map(|i| node.child(i))
            .filter(|c| !c.is_named())
            .map(|c| c.kind())
            .collect();
        let text = |n: &Node| node_text(n, src);

        if let ([left, right], [op]) = (operands.as_slice(), operators.as_slice()) {
            let right_text = text(right);
            let pair = |operator| AssertionOperands {
                operator,
                left: Some(text(left)),
                right: Some(right_text.clone()),
                condition: None,
            };
            let unary = |operator| AssertionOperands {
                operator,
                left: None,
                right: None,
                condition: Some(text(left)),
            };
            match (*op, right_text.as_str()) {
                ("==", _) => return pair(AssertOperator::Equals),
                ("!=", _) => return pair(AssertOperator::NotEquals),
                ("is", "None") => return unary(AssertOperator::Null),
                ("is not", "None") => return unary(AssertOperator::NotNull),
                _ => {}
            }
        }
        AssertionOperands {
            operator: AssertOperator::True,
            left: None,
            right: None,
            condition: Some(text(&node)),
        }
    }
}

impl Dialect for PythonDialect {
    fn classes<'t>(&self, root: Node<'t>, src: &str) -> Vec<ClassDecl<'t>> {
        descendants(root)
            .into_iter()
            .filter(|n| n.kind() == "class_definition")
            .filter_map(|node| {
                let name = node_text(&node.child_by_field_name("name")?, src);
                let parent = node
                    .child_by_field_name("superclasses")
                    .and_then(|supers| {
                        named_children(supers)
                            .into_iter()
                            .find(|s| matches!(s.kind(), "identifier" | "attribute"))
                    })
                    .map(|s| bare_type_name(&node_text(&s, src)))
                    .filter(|p| p != "object");
                Some(ClassDecl {
                    name,
                    parent,
                    body: node.child_by_field_name("body"),
                })
            })
            .collect()
    }

    fn methods<'t>(&self, class: &ClassDecl<'t>, src: &str) -> Vec<MethodDecl<'t>> {
        class
            .body
            .map(|body| {
                named_children(body)
                    .into_iter()
                    .filter_map(|member| self.function_decl(member, src))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn module_functions<'t>(&self, root: Node<'t>, src: &str) -> Vec<MethodDecl<'t>> {
        named_children(root)
            .into_iter()
            .filter_map(|member| self.function_decl(member, src))
            .collect()
    }

    fn locator_fields(&self, class: &ClassDecl<'_>, src: &str) -> Vec<(String, Locator)> {
        let Some(body) = class.body else {
            return Vec::new();
        };
        Self::class_assignments(body)
            .into_iter()
            .filter_map(|assignment| {
                let left = assignment.child_by_field_name("left")?;
                if left.kind() != "identifier" {
                    return None;
                }
                let items = Self::tuple_items(assignment.child_by_field_name("right")?)?;
                let locator = self.locator_pair(&items, src)?;
                Some((node_text(&left, src), locator))
            })
            .collect()
    }

    fn typed_fields(&self, class: &ClassDecl<'_>, src: &str) -> Vec<(String, String)> {
        let Some(body) = class.body else {
            return Vec::new();
        };
        descendants(body)
            .into_iter()
            .filter(|n| n.kind() == "assignment")
            .filter_map(|assignment| {
                let left = assignment.child_by_field_name("left")?;
                let field = match left.kind() {
                    "attribute" if is_self(left.child_by_field_name("object")?, src) => {
                        node_text(&left.child_by_field_name("attribute")?, src)
                    }
                    "identifier" => node_text(&left, src),
                    _ => return None,
                };
                let ty = assignment
                    .child_by_field_name("type")
                    .map(|t| bare_type_name(&node_text(&t, src)))
                    .or_else(|| {
                        self.constructed_type(assignment.child_by_field_name("right")?, src)
                    })?;
                Some((field, ty))
            })
            .collect()
    }

    fn is_test(&self, method: &MethodDecl<'_>) -> bool {
        method.name.starts_with("test")
    }

    fn hook_type(&self, method: &MethodDecl<'_>) -> Option<HookType> {
        vocab::python_lifecycle(&method.name).or_else(|| {
            method
                .markers
                .iter()
                .find(|m| m.name == "fixture")
                .map(Self::fixture_scope)
        })
    }

    fn call_site<'t>(&self, node: Node<'t>, src: &str) -> Option<CallSite<'t>> {
        if node.kind() != "call" {
            return None;
        }
        let function = node.child_by_field_name("function")?;
        let (name, object) = match function.kind() {
            "attribute" => (
                node_text(&function.child_by_field_name("attribute")?, src),
                function.child_by_field_name("object"),
            ),
            "identifier" => (node_text(&function, src), None),
            _ => return None,
        };
        let args = match node.child_by_field_name("arguments") {
            Some(a) if a.kind() == "argument_list" => named_children(a)
                .into_iter()
                .filter(|n| !is_comment(n))
                .collect(),
            Some(a) => vec![a],
            None => Vec::new(),
        };
        Some(CallSite {
            name,
            object,
            args,
        })
    }

    fn string_value(&self, node: Node<'_>, src: &str) -> Option<String> {
        match node.kind() {
            "string" => {
                if named_children(node)
                    .iter()
                    .any(|c| c.kind() == "interpolation")
                {
                    return None;
                }
                let text = node_text(&node, src);
                let quoted = text.trim_start_matches(|c: char| c.is_ascii_alphabetic());
                ["\"\"\"", "'''", "\"", "'"]
                    .iter()
                    .find_map(|q| quoted.strip_prefix(q).and_then(|t| t.strip_suffix(q)))
                    .map(str::to_string)
            }
            "call" => {
                let call = self.call_site(node, src)?;
                if call.name != "format" {
                    return None;
                }
                self.string_value(call.object?, src)
            }
            "parenthesized_expression" => self.string_value(node.named_child(0)?, src),
            _ => None,
        }
    }

    fn locator_arg(&self, args: &[Node<'_>], src: &str) -> LocatorArg {
        let Some(first) = args.first().copied() else {
            return LocatorArg::Absent;
        };
        if let Some(locator) = self.locator_pair(args, src) {
            return LocatorArg::Spread(locator);
        }
        if let Some(items) = Self::tuple_items(first) {
            return self
                .locator_pair(&items, src)
                .map(LocatorArg::Inline)
                .unwrap_or(LocatorArg::Absent);
        }
        match first.kind() {
            "list_splat" => match first.named_child(0) {
                Some(inner) => self.locator_arg(&[inner], src),
                None => LocatorArg::Absent,
            },
            "identifier" => LocatorArg::Field(node_text(&first, src)),
            "attribute" => {
                let object = first.child_by_field_name("object");
                let attribute = first.child_by_field_name("attribute");
                match (object, attribute) {
                    (Some(o), Some(a))
                        if is_self(o, src)
                            || (o.kind() == "identifier"
                                && starts_uppercase(&node_text(&o, src))) =>
                    {
                        LocatorArg::Field(node_text(&a, src))
                    }
                    _ => LocatorArg::Absent,
                }
            }
            _ => LocatorArg::Absent,
        }
    }

    fn control_flow<'t>(&self, node: Node<'t>, src: &str) -> Option<ControlConstruct<'t>> {
        let field = |name: &str| node.child_by_field_name(name);
        let text = |n: Option<Node<'t>>| n.map(|n| node_text(&n, src)).unwrap_or_default();
        let clause_blocks = |kinds: &[&str]| -> Vec<Node<'t>> {
            named_children(node)
                .into_iter()
                .filter(|c| kinds.contains(&c.kind()))
                .filter_map(|c| {
                    c.child_by_field_name("consequence")
                        .or_else(|| c.child_by_field_name("body"))
                        .or_else(|| named_children(c).into_iter().find(|b| b.kind() == "block"))
                })
                .collect()
        };

        let (kind, condition, header, blocks): (ControlKind, String, Vec<Node<'t>>, Vec<Node<'t>>) =
            match node.kind() {
                "if_statement" => {
                    let mut blocks: Vec<Node<'t>> = field("consequence").into_iter().collect();
                    // `elif` clauses are walked whole so their conditions keep source order.
                    blocks.extend(
                        named_children(node)
                            .into_iter()
                            .filter(|c| c.kind() == "elif_clause"),
                    );
                    blocks.extend(clause_blocks(&["else_clause"]));
                    (
                        ControlKind::If,
                        text(field("condition")),
                        field("condition").into_iter().collect(),
                        blocks,
                    )
                }
                "for_statement" => {
                    let mut blocks: Vec<Node<'t>> = field("body").into_iter().collect();
                    blocks.extend(clause_blocks(&["else_clause"]));
                    let header = format!("for {} in {}", text(field("left")), text(field("right")));
                    (
                        ControlKind::For,
                        header,
                        field("right").into_iter().collect(),
                        blocks,
                    )
                }
                "while_statement" => {
                    let mut blocks: Vec<Node<'t>> = field("body").into_iter().collect();
                    blocks.extend(clause_blocks(&["else_clause"]));
                    (
                        ControlKind::While,
                        text(field("condition")),
                        field("condition").into_iter().collect(),
                        blocks,
                    )
                }
                "try_statement" => {
                    let mut blocks: Vec<Node<'t>> = field("body").into_iter().collect();
                    blocks.extend(clause_blocks(&[
                        "except_clause",
                        "except_group_clause",
                        "else_clause",
                        "finally_clause",
                    ]));
                    (ControlKind::Try, String::new(), Vec::new(), blocks)
                }
                "with_statement" => {
                    let clause = named_children(node)
                        .into_iter()
                        .find(|c| c.kind() == "with_clause");
                    (
                        ControlKind::With,
                        text(clause),
                        clause.into_iter().collect(),
                        field("body").into_iter().collect(),
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
        let expr = node.named_child(0)?;
        let mut operands = match expr.kind() {
            "comparison_operator" => self.comparison(expr, src),
            "not_operator" => AssertionOperands {
                operator: AssertOperator::False,
                left: None,
                right: None,
                condition: expr
                    .child_by_field_name("argument")
                    .map(|a| node_text(&a, src)),
            },
            _ => AssertionOperands {
                operator: AssertOperator::True,
                left: None,
                right: None,
                condition: Some(node_text(&expr, src)),
            },
        };
        if operands.condition.is_none() && operands.left.is_none() {
            operands.condition = Some(node_text(&expr, src));
        }
        Some(operands)
    }

    fn receiver<'t>(&self, node: Node<'t>, src: &'t str) -> Receiver<'t> {
        let text = node.utf8_text(src.as_bytes()).unwrap_or("");
        match node.kind() {
            "identifier" if matches!(text, "self" | "cls") => Receiver::This,
            "identifier" => Receiver::Name(text),
            "attribute" => {
                let object = node.child_by_field_name("object");
                let attribute = node.child_by_field_name("attribute");
                match (object, attribute) {
                    (Some(o), Some(a)) if is_self(o, src) => {
                        Receiver::Field(a.utf8_text(src.as_bytes()).unwrap_or(""))
                    }
                    _ => Receiver::Name(text.split('.').next().unwrap_or(text)),
                }
            }
            "call" => {
                let callee = node
                    .child_by_field_name("function")
                    .filter(|f| f.kind() == "identifier")
                    .map(|f| node_text(&f, src));
                match callee.as_deref() {
                    Some("super") => Receiver::Super,
                    Some(name) if starts_uppercase(name) => Receiver::Expr(node),
                    _ => Receiver::Call(node),
                }
            }
            _ => Receiver::Expr(node),
        }
    }

    fn constructed_type(&self, node: Node<'_>, src: &str) -> Option<String> {
        if node.kind() != "call" {
            return None;
        }
        let function = node.child_by_field_name("function")?;
        let name = match function.kind() {
            "identifier" => node_text(&function, src),
            "attribute" => node_text(&function.child_by_field_name("attribute")?, src),
            _ => return None,
        };
        starts_uppercase(&name).then_some(name)
    }

    fn local_binding<'t>(
        &self,
        body: Node<'t>,
        name: &str,
        src: &str,
    ) -> Option<LocalBinding<'t>> {
        descendants(body)
            .into_iter()
            .filter(|n| n.kind() == "assignment")
            .find(|a| {
                a.child_by_field_name("left")
                    .map(|l| l.kind() == "identifier" && node_text(&l, src) == name)
                    .unwrap_or(false)
            })
            .map(|a| LocalBinding {
                declared_type: a
                    .child_by_field_name("type")
                    .map(|t| bare_type_name(&node_text(&t, src))),
                initializer: a.child_by_field_name("right"),
            })
    }

    fn keyword_arg<'t>(&self, args: &[Node<'t>], key: &str, src: &str) -> Option<Node<'t>> {
        args.iter()
            .filter(|a| a.kind() == "keyword_argument")
            .find(|a| {
                a.child_by_field_name("name")
                    .map(|n| node_text(&n, src) == key)
                    .unwrap_or(false)
            })
            .and_then(|a| a.child_by_field_name("value"))
    }

    fn is_block(&self, node: Node<'_>) -> bool {
        node.kind() == "block"
    }

    fn is_nested_definition(&self, node: Node<'_>) -> bool {
        matches!(
            node.kind(),
            "function_definition" | "class_definition" | "decorated_definition"
        )
    }
}
