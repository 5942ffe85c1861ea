// src/core/languages/java.rs - Java syntax helpers on top of tree-sitter
use tree_sitter::{Node, Parser, Tree};

use crate::error::{SpecsworthError, Result};

/// Java parser using Tree-sitter
pub struct JavaParser {
    parser: Parser,
}

impl JavaParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let java_language = tree_sitter_java::language();
        parser.set_language(&java_language)
            .map_err(|e| SpecsworthError::Parser(format!("Failed to set Java language: {}", e)))?;

        Ok(Self { parser })
    }

    /// Parse Java source into a syntax tree
    pub fn parse(&mut self, content: &str) -> Result<Tree> {
        self.parser.parse(content, None)
            .ok_or_else(|| SpecsworthError::Parser("Failed to parse Java code".to_string()))
    }
}

/// Extract text content of a node
pub fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

/// Find the first direct child of a node with the given kind
pub fn find_child_by_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|child| child.kind() == kind);
    found
}

/// Last dotted segment of a (possibly qualified) name
pub fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name).trim()
}

/// Reduce a written type to its raw class name: `List<Foo>[]` -> `List`
pub fn raw_type_name(type_text: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(type_text.len());

    for ch in type_text.chars() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            '[' | ']' => {}
            c if c.is_whitespace() => {}
            c => out.push(c),
        }
    }

    out.trim_end_matches("...").to_string()
}

/// Primitive and pseudo types never resolve to a class
pub fn is_primitive(type_name: &str) -> bool {
    matches!(
        type_name,
        "void" | "boolean" | "byte" | "char" | "short" | "int" | "long" | "float" | "double" | "var" | ""
    )
}

/// A single annotation argument value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementValue {
    /// A string literal (or a concatenation of literals), unquoted
    Str(String),
    /// `Foo.class`, carrying the written type name
    ClassLiteral(String),
    /// `{a, b, c}`
    Array(Vec<ElementValue>),
    /// Any other expression, kept as source text (`RequestMethod.POST`, `true`, constants)
    Expr(String),
}

impl ElementValue {
    /// First string literal, looking into arrays
    pub fn first_string(&self) -> Option<String> {
        match self {
            ElementValue::Str(s) => Some(s.clone()),
            ElementValue::Array(values) => values.first().and_then(|v| v.first_string()),
            _ => None,
        }
    }

    /// Raw text of the value, or of the first array element
    pub fn first_text(&self) -> Option<String> {
        match self {
            ElementValue::Str(s) | ElementValue::Expr(s) | ElementValue::ClassLiteral(s) => Some(s.clone()),
            ElementValue::Array(values) => values.first().and_then(|v| v.first_text()),
        }
    }

    /// Flattened list of referenced type names (`Foo.class`, `{A.class, B.class}`)
    pub fn class_names(&self) -> Vec<String> {
        match self {
            ElementValue::ClassLiteral(name) => vec![simple_name(name).to_string()],
            ElementValue::Array(values) => values.iter().flat_map(|v| v.class_names()).collect(),
            ElementValue::Expr(text) => {
                let text = text.trim().trim_end_matches(".class");
                vec![simple_name(text).to_string()]
            }
            ElementValue::Str(_) => vec![],
        }
    }
}

/// An annotation as written on a declaration or parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Simple name (`GetMapping` for `@org.springframework...GetMapping`)
    pub name: String,
    /// Arguments in declaration order; a lone unnamed argument is keyed `value`
    pub arguments: Vec<(String, ElementValue)>,
}

impl Annotation {
    pub fn argument(&self, key: &str) -> Option<&ElementValue> {
        self.arguments.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// First string found under any of the keys, in key order
    pub fn string_argument(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|key| self.argument(key))
            .find_map(|value| value.first_string())
    }
}

/// Find an annotation by simple name
pub fn find_annotation<'a>(annotations: &'a [Annotation], name: &str) -> Option<&'a Annotation> {
    annotations.iter().find(|a| a.name == name)
}

/// Collect the annotations held in a declaration's `modifiers` child
pub fn annotations_of(node: Node, source: &str) -> Vec<Annotation> {
    match find_child_by_kind(node, "modifiers") {
        Some(modifiers) => {
            let mut cursor = modifiers.walk();
            let annotations = modifiers.children(&mut cursor)
                .filter_map(|child| parse_annotation(child, source))
                .collect();
            annotations
        }
        None => Vec::new(),
    }
}

/// Parse an `annotation` or `marker_annotation` node
pub fn parse_annotation(node: Node, source: &str) -> Option<Annotation> {
    if node.kind() != "annotation" && node.kind() != "marker_annotation" {
        return None;
    }

    let name_node = node.child_by_field_name("name")?;
    let name = simple_name(node_text(name_node, source)).to_string();

    let mut arguments = Vec::new();
    if let Some(args) = node.child_by_field_name("arguments") {
        let mut cursor = args.walk();
        for child in args.named_children(&mut cursor) {
            if child.kind() == "element_value_pair" {
                let key = child.child_by_field_name("key")
                    .map(|k| node_text(k, source).to_string())
                    .unwrap_or_default();
                if let Some(value) = child.child_by_field_name("value") {
                    arguments.push((key, parse_element_value(value, source)));
                }
            } else if !child.is_extra() {
                arguments.push(("value".to_string(), parse_element_value(child, source)));
            }
        }
    }

    Some(Annotation { name, arguments })
}

fn parse_element_value(node: Node, source: &str) -> ElementValue {
    match node.kind() {
        "string_literal" => ElementValue::Str(unquote(node_text(node, source))),
        "class_literal" => {
            let text = node_text(node, source);
            ElementValue::ClassLiteral(text.trim_end_matches(".class").trim().to_string())
        }
        "element_value_array_initializer" | "array_initializer" => {
            let mut cursor = node.walk();
            let values = node.named_children(&mut cursor)
                .filter(|child| !child.is_extra())
                .map(|child| parse_element_value(child, source))
                .collect();
            ElementValue::Array(values)
        }
        "parenthesized_expression" => match node.named_child(0) {
            Some(inner) => parse_element_value(inner, source),
            None => ElementValue::Expr(node_text(node, source).to_string()),
        },
        "binary_expression" => {
            let left = node.child_by_field_name("left").map(|n| parse_element_value(n, source));
            let right = node.child_by_field_name("right").map(|n| parse_element_value(n, source));
            match (left, right) {
                (Some(ElementValue::Str(l)), Some(ElementValue::Str(r))) => ElementValue::Str(l + &r),
                _ => ElementValue::Expr(node_text(node, source).to_string()),
            }
        }
        _ => ElementValue::Expr(node_text(node, source).to_string()),
    }
}

fn unquote(literal: &str) -> String {
    let inner = literal.trim().trim_start_matches('"').trim_end_matches('"');
    inner.replace("\\\"", "\"").replace("\\\\", "\\")
}

/// Parsed javadoc comment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Javadoc {
    /// Free-text description preceding the block tags
    pub description: String,
    /// `@param name text` tags
    pub params: Vec<(String, String)>,
}

impl Javadoc {
    /// Parse the raw text of a `/** ... */` comment
    pub fn parse(comment: &str) -> Self {
        let body = comment.trim()
            .trim_start_matches("/**")
            .trim_end_matches("*/");

        let mut description_lines = Vec::new();
        let mut params: Vec<(String, String)> = Vec::new();
        let mut in_tags = false;
        let mut current_param: Option<usize> = None;

        for line in body.lines() {
            let content = line.trim().trim_start_matches('*').trim();

            if content.starts_with('@') {
                in_tags = true;
                current_param = None;
                if let Some(rest) = content.strip_prefix("@param") {
                    let rest = rest.trim();
                    let mut parts = rest.splitn(2, char::is_whitespace);
                    let name = parts.next().unwrap_or_default().to_string();
                    let text = parts.next().unwrap_or_default().trim().to_string();
                    if !name.is_empty() {
                        params.push((name, text));
                        current_param = Some(params.len() - 1);
                    }
                }
                continue;
            }

            if in_tags {
                if let (Some(idx), false) = (current_param, content.is_empty()) {
                    let entry = &mut params[idx].1;
                    if !entry.is_empty() {
                        entry.push(' ');
                    }
                    entry.push_str(content);
                }
            } else {
                description_lines.push(content.to_string());
            }
        }

        let description = description_lines.join("\n").trim().to_string();
        Self { description, params }
    }

    /// First non-empty line of the description
    pub fn summary(&self) -> Option<&str> {
        self.description.lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter()
            .find(|(n, _)| n == name)
            .map(|(_, text)| text.as_str())
            .filter(|text| !text.is_empty())
    }
}

/// Javadoc attached to a declaration: the nearest preceding `/** */` sibling,
/// looking past line comments only.
pub fn javadoc_of(node: Node, source: &str) -> Option<Javadoc> {
    let mut sibling = node.prev_sibling();

    while let Some(prev) = sibling {
        let text = node_text(prev, source);
        match prev.kind() {
            "block_comment" | "comment" if text.starts_with("/**") => {
                return Some(Javadoc::parse(text));
            }
            "line_comment" => sibling = prev.prev_sibling(),
            "comment" if text.starts_with("//") => sibling = prev.prev_sibling(),
            _ => return None,
        }
    }

    None
}
