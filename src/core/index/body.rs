// src/core/index/body.rs
use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use super::super::languages::{node_text, raw_type_name, simple_name};

/// The expression a call is made on, kept unresolved until the index is complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Receiver {
    /// `foo()`
    Implicit,
    /// `this.foo()`
    This,
    /// `super.foo()`
    Super,
    /// `service.foo()`, `Util.foo()`, `com.x.Util::foo`
    Name(String),
    /// `this.repo.foo()`, `a.b.foo()`
    Field { target: Box<Receiver>, name: String },
    /// `a.b().foo()`
    Call { target: Box<Receiver>, name: String, arg_count: usize },
    /// `((Foo) x).foo()`, `new Foo().foo()`
    Typed(String),
    /// Anything the heuristics do not follow
    Unknown,
}

impl Receiver {
    /// Dotted source path for name-only chains (`a.b.c`), used as a last
    /// resort when the chain names a qualified class.
    pub fn dotted_path(&self) -> Option<String> {
        match self {
            Receiver::Name(name) => Some(name.clone()),
            Receiver::Field { target, name } => target.dotted_path().map(|t| format!("{}.{}", t, name)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    /// `x.foo(a, b)`
    Invocation,
    /// `x::foo`
    MethodReference,
}

/// One outbound call found in a method body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub name: String,
    /// Argument count; unknown for method references
    pub arg_count: Option<usize>,
    pub receiver: Receiver,
    pub kind: CallKind,
    /// Condition of the nearest enclosing `if`, else of an enclosing `for`
    pub condition: Option<String>,
}

/// Facts gathered from one method body in a single walk
#[derive(Debug, Clone, Default)]
pub struct BodyFacts {
    pub call_sites: Vec<CallSite>,
    /// Local declarations (locals, loop variables, typed lambda and catch parameters)
    pub locals: Vec<(String, String)>,
    /// Simple names of types in `throw new X(...)`
    pub thrown_types: Vec<String>,
}

/// Walk a method body in source order. Lambda bodies are ordinary subtrees,
/// so calls inside them are collected in place.
pub fn collect_body_facts(body: Node, source: &str) -> BodyFacts {
    let mut facts = BodyFacts::default();
    let mut stack = vec![body];

    while let Some(node) = stack.pop() {
        match node.kind() {
            "method_invocation" => {
                if let Some(site) = invocation_site(node, body, source) {
                    facts.call_sites.push(site);
                }
            }
            "method_reference" => {
                if let Some(site) = method_reference_site(node, body, source) {
                    facts.call_sites.push(site);
                }
            }
            "local_variable_declaration" => collect_declarators(node, source, &mut facts.locals),
            "enhanced_for_statement" => {
                if let (Some(ty), Some(name)) = (node.child_by_field_name("type"), node.child_by_field_name("name")) {
                    facts.locals.push((node_text(name, source).to_string(), node_text(ty, source).to_string()));
                }
            }
            "lambda_expression" => {
                if let Some(params) = node.child_by_field_name("parameters") {
                    if params.kind() == "formal_parameters" {
                        let mut cursor = params.walk();
                        for param in params.named_children(&mut cursor) {
                            if let (Some(ty), Some(name)) = (param.child_by_field_name("type"), param.child_by_field_name("name")) {
                                facts.locals.push((node_text(name, source).to_string(), node_text(ty, source).to_string()));
                            }
                        }
                    }
                }
            }
            "catch_formal_parameter" => {
                let name = node.child_by_field_name("name");
                let ty = find_named_child(node, "catch_type").and_then(|t| t.named_child(0));
                if let (Some(ty), Some(name)) = (ty, name) {
                    facts.locals.push((node_text(name, source).to_string(), node_text(ty, source).to_string()));
                }
            }
            "throw_statement" => {
                if let Some(created) = node.named_child(0).filter(|n| n.kind() == "object_creation_expression") {
                    if let Some(ty) = created.child_by_field_name("type") {
                        let name = raw_type_name(node_text(ty, source));
                        facts.thrown_types.push(simple_name(&name).to_string());
                    }
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    facts
}

fn find_named_child<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|child| child.kind() == kind);
    found
}

fn collect_declarators(node: Node, source: &str, locals: &mut Vec<(String, String)>) {
    let Some(ty) = node.child_by_field_name("type") else {
        return;
    };
    let declared = node_text(ty, source);

    let mut cursor = node.walk();
    for declarator in node.children_by_field_name("declarator", &mut cursor) {
        let Some(name) = declarator.child_by_field_name("name") else {
            continue;
        };

        let mut type_name = declared.to_string();
        if declared == "var" {
            // `var x = new T(...)` is the one inference worth doing
            match declarator.child_by_field_name("value")
                .filter(|value| value.kind() == "object_creation_expression")
                .and_then(|value| value.child_by_field_name("type"))
            {
                Some(created) => type_name = node_text(created, source).to_string(),
                None => continue,
            }
        }

        locals.push((node_text(name, source).to_string(), type_name));
    }
}

fn invocation_site(node: Node, body: Node, source: &str) -> Option<CallSite> {
    let name = node_text(node.child_by_field_name("name")?, source).to_string();
    let arg_count = node.child_by_field_name("arguments")
        .map(|args| args.named_child_count())
        .unwrap_or(0);
    let receiver = node.child_by_field_name("object")
        .map(|object| receiver_of(object, source))
        .unwrap_or(Receiver::Implicit);

    Some(CallSite {
        name,
        arg_count: Some(arg_count),
        receiver,
        kind: CallKind::Invocation,
        condition: enclosing_condition(node, body, source),
    })
}

fn method_reference_site(node: Node, body: Node, source: &str) -> Option<CallSite> {
    let target = node.child(node.child_count().checked_sub(1)?)?;
    if target.kind() != "identifier" {
        // `Foo::new` builds an object; there is no method body to follow
        return None;
    }

    let scope = node.named_child(0)?;
    if scope.id() == target.id() {
        return None;
    }

    Some(CallSite {
        name: node_text(target, source).to_string(),
        arg_count: None,
        receiver: receiver_of(scope, source),
        kind: CallKind::MethodReference,
        condition: enclosing_condition(node, body, source),
    })
}

fn receiver_of(node: Node, source: &str) -> Receiver {
    match node.kind() {
        "this" => Receiver::This,
        "super" => Receiver::Super,
        "identifier" | "type_identifier" | "scoped_identifier" | "scoped_type_identifier" => {
            Receiver::Name(node_text(node, source).to_string())
        }
        "generic_type" => Receiver::Typed(node_text(node, source).to_string()),
        "field_access" => {
            let field = node.child_by_field_name("field");
            match (node.child_by_field_name("object"), field) {
                (_, Some(field)) if field.kind() == "this" => Receiver::This,
                (Some(object), Some(field)) => Receiver::Field {
                    target: Box::new(receiver_of(object, source)),
                    name: node_text(field, source).to_string(),
                },
                _ => Receiver::Unknown,
            }
        }
        "method_invocation" => {
            let Some(name) = node.child_by_field_name("name") else {
                return Receiver::Unknown;
            };
            let target = node.child_by_field_name("object")
                .map(|object| receiver_of(object, source))
                .unwrap_or(Receiver::Implicit);
            let arg_count = node.child_by_field_name("arguments")
                .map(|args| args.named_child_count())
                .unwrap_or(0);
            Receiver::Call {
                target: Box::new(target),
                name: node_text(name, source).to_string(),
                arg_count,
            }
        }
        "parenthesized_expression" => node.named_child(0)
            .map(|inner| receiver_of(inner, source))
            .unwrap_or(Receiver::Unknown),
        "cast_expression" | "object_creation_expression" => node.child_by_field_name("type")
            .map(|ty| Receiver::Typed(node_text(ty, source).to_string()))
            .unwrap_or(Receiver::Unknown),
        _ => Receiver::Unknown,
    }
}

/// Nearest enclosing `if` condition within the body, else the test of an
/// enclosing classic `for`
fn enclosing_condition(node: Node, body: Node, source: &str) -> Option<String> {
    let mut for_condition = None;
    let mut current = node.parent();

    while let Some(ancestor) = current {
        if ancestor.id() == body.id() {
            break;
        }
        match ancestor.kind() {
            "if_statement" => {
                if let Some(condition) = ancestor.child_by_field_name("condition") {
                    return Some(strip_parens(node_text(condition, source)).to_string());
                }
            }
            "for_statement" if for_condition.is_none() => {
                for_condition = ancestor.child_by_field_name("condition")
                    .map(|c| node_text(c, source).to_string());
            }
            _ => {}
        }
        current = ancestor.parent();
    }

    for_condition
}

fn strip_parens(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed.strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .map(str::trim)
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::languages::JavaParser;

    fn facts_for(body_source: &str) -> BodyFacts {
        let source = format!("class T {{ void m() {} }}", body_source);
        let mut parser = JavaParser::new().unwrap();
        let tree = parser.parse(&source).unwrap();

        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            if node.kind() == "method_declaration" {
                let body = node.child_by_field_name("body").unwrap();
                return collect_body_facts(body, &source);
            }
            let mut cursor = node.walk();
            stack.extend(node.named_children(&mut cursor).collect::<Vec<_>>());
        }
        panic!("no method in test source");
    }

    #[test]
    fn test_calls_are_collected_in_source_order_including_lambdas() {
        let facts = facts_for(
            "{ validate(x); CompletableFuture.supplyAsync(() -> service.create(a)); repo.items().forEach(this::log); }",
        );
        let names: Vec<_> = facts.call_sites.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["validate", "supplyAsync", "create", "forEach", "items", "log"]);

        let create = facts.call_sites.iter().find(|c| c.name == "create").unwrap();
        assert_eq!(create.receiver, Receiver::Name("service".to_string()));
        assert_eq!(create.arg_count, Some(1));

        let log = facts.call_sites.iter().find(|c| c.name == "log").unwrap();
        assert_eq!(log.kind, CallKind::MethodReference);
        assert_eq!(log.receiver, Receiver::This);

        let for_each = facts.call_sites.iter().find(|c| c.name == "forEach").unwrap();
        assert_eq!(
            for_each.receiver,
            Receiver::Call {
                target: Box::new(Receiver::Name("repo".to_string())),
                name: "items".to_string(),
                arg_count: 0
            }
        );
    }

    #[test]
    fn test_constructor_references_are_ignored() {
        let facts = facts_for("{ list.stream().map(Order::new).map(Mapper::toDto); }");
        assert!(facts.call_sites.iter().all(|c| c.name != "new"));
        assert!(facts.call_sites.iter().any(|c| c.name == "toDto" && c.receiver == Receiver::Name("Mapper".to_string())));
    }

    #[test]
    fn test_enclosing_conditions() {
        let facts = facts_for(
            "{ if (order.isPaid()) { notifier.send(order); } for (int i = 0; i < n; i++) { audit.log(i); } plain.call(); }",
        );
        let send = facts.call_sites.iter().find(|c| c.name == "send").unwrap();
        assert_eq!(send.condition.as_deref(), Some("order.isPaid()"));

        let log = facts.call_sites.iter().find(|c| c.name == "log").unwrap();
        assert_eq!(log.condition.as_deref(), Some("i < n"));

        let plain = facts.call_sites.iter().find(|c| c.name == "call").unwrap();
        assert_eq!(plain.condition, None);
    }

    #[test]
    fn test_locals_and_thrown_types() {
        let facts = facts_for(
            "{ OrderRepository repo = factory.get(); var helper = new PriceHelper(); for (Item item : items) {} \
              try { x(); } catch (IllegalStateException e) { throw new OrderNotFoundException(id); } }",
        );
        assert!(facts.locals.contains(&("repo".to_string(), "OrderRepository".to_string())));
        assert!(facts.locals.contains(&("helper".to_string(), "PriceHelper".to_string())));
        assert!(facts.locals.contains(&("item".to_string(), "Item".to_string())));
        assert!(facts.locals.contains(&("e".to_string(), "IllegalStateException".to_string())));
        assert_eq!(facts.thrown_types, vec!["OrderNotFoundException".to_string()]);
    }

    #[test]
    fn test_field_access_receivers() {
        let facts = facts_for("{ this.orderService.create(r); }");
        let create = &facts.call_sites[0];
        assert_eq!(
            create.receiver,
            Receiver::Field { target: Box::new(Receiver::This), name: "orderService".to_string() }
        );
    }
}
