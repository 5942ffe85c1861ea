// src/core/index/source_index.rs
use std::collections::{BTreeMap, BTreeSet, HashMap};
use rayon::prelude::*;
use tracing::debug;
use tree_sitter::Node;

use crate::error::{SpecsworthError, Result};
use super::super::languages::{
    annotations_of, find_child_by_kind, is_primitive, javadoc_of, node_text, raw_type_name, simple_name,
};
use super::super::parser::SourceFile;
use super::body::collect_body_facts;
use super::records::{
    ClassKind, ClassRecord, FileContext, FileId, MethodId, MethodRecord, ParameterRecord, SourcePosition,
};

/// `java.lang` types are visible without an import
const JAVA_LANG_TYPES: &[&str] = &[
    "Object", "String", "Integer", "Long", "Short", "Byte", "Double", "Float", "Boolean",
    "Character", "Number", "Math", "System", "Thread", "Runnable", "Iterable", "Comparable",
    "Exception", "RuntimeException", "Throwable", "Error", "Enum", "Record", "StringBuilder",
    "Class", "Void", "CharSequence", "AutoCloseable", "Override", "Deprecated",
];

/// Classes and methods of a single file, before folding
#[derive(Debug)]
struct PartialIndex {
    file: FileContext,
    classes: Vec<ClassRecord>,
    methods: Vec<MethodRecord>,
}

/// Immutable map of every declared class, method and supertype relation in a project
#[derive(Debug, Default)]
pub struct SourceIndex {
    files: Vec<FileContext>,
    classes: BTreeMap<String, ClassRecord>,
    /// Qualified names in file order, then declaration order
    class_order: Vec<String>,
    methods: Vec<MethodRecord>,
    methods_by_name: HashMap<(String, String), Vec<MethodId>>,
    implementors: BTreeMap<String, BTreeSet<String>>,
    by_simple_name: BTreeMap<String, Vec<String>>,
}

impl SourceIndex {
    /// Index every class-like declaration in the loaded files.
    ///
    /// Files are indexed independently in parallel and folded in file order.
    /// A qualified name declared twice is a caller error.
    pub fn build(files: &[SourceFile]) -> Result<Self> {
        let partials: Vec<PartialIndex> = files
            .par_iter()
            .enumerate()
            .map(|(id, file)| index_file(id, file))
            .collect();

        let mut index = SourceIndex::default();
        for partial in partials {
            index.fold(partial)?;
        }
        index.link_supertypes();

        debug!(
            "Indexed {} classes and {} methods from {} files",
            index.classes.len(),
            index.methods.len(),
            index.files.len()
        );

        Ok(index)
    }

    fn fold(&mut self, partial: PartialIndex) -> Result<()> {
        let offset = self.methods.len();
        self.files.push(partial.file);

        for mut class in partial.classes {
            if let Some(existing) = self.classes.get(&class.qualified_name) {
                return Err(SpecsworthError::DuplicateClass {
                    name: class.qualified_name.clone(),
                    first: self.files[existing.file].path.clone(),
                    second: self.files[class.file].path.clone(),
                });
            }

            for id in class.methods.iter_mut() {
                *id += offset;
            }

            self.by_simple_name
                .entry(class.simple_name.clone())
                .or_default()
                .push(class.qualified_name.clone());
            self.class_order.push(class.qualified_name.clone());
            self.classes.insert(class.qualified_name.clone(), class);
        }

        for method in partial.methods {
            let id = self.methods.len();
            self.methods_by_name
                .entry((method.owning_class.clone(), method.name.clone()))
                .or_default()
                .push(id);
            self.methods.push(method);
        }

        Ok(())
    }

    /// Qualify declared supertypes now that every class is known
    fn link_supertypes(&mut self) {
        let mut resolved: Vec<(String, Vec<String>)> = Vec::new();
        for class in self.classes.values() {
            let supertypes = class.declared_supertypes.iter()
                .filter_map(|written| self.qualify_type(written, class))
                .collect();
            resolved.push((class.qualified_name.clone(), supertypes));
        }

        for (name, supertypes) in resolved {
            for supertype in &supertypes {
                self.implementors
                    .entry(supertype.clone())
                    .or_default()
                    .insert(name.clone());
            }
            if let Some(class) = self.classes.get_mut(&name) {
                class.supertypes = supertypes;
            }
        }
    }

    pub fn class(&self, qualified_name: &str) -> Option<&ClassRecord> {
        self.classes.get(qualified_name)
    }

    /// All classes in file order, then declaration order
    pub fn classes(&self) -> impl Iterator<Item = &ClassRecord> {
        self.class_order.iter().filter_map(|name| self.classes.get(name))
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn method(&self, id: MethodId) -> &MethodRecord {
        &self.methods[id]
    }

    pub fn get_method(&self, id: MethodId) -> Option<&MethodRecord> {
        self.methods.get(id)
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Methods declared directly on a class, in source order
    pub fn methods_of<'a>(&'a self, class: &'a ClassRecord) -> impl Iterator<Item = (MethodId, &'a MethodRecord)> + 'a {
        class.methods.iter().map(move |&id| (id, &self.methods[id]))
    }

    /// Every overload of `name` declared on `class`
    pub fn methods_named(&self, class: &str, name: &str) -> &[MethodId] {
        self.methods_by_name
            .get(&(class.to_string(), name.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Classes that extend or implement `supertype`, sorted by name
    pub fn implementors(&self, supertype: &str) -> impl Iterator<Item = &String> {
        self.implementors.get(supertype).into_iter().flatten()
    }

    /// Qualified names of classes declared with this simple name, in file order
    pub fn classes_with_simple_name(&self, simple: &str) -> &[String] {
        self.by_simple_name.get(simple).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn file(&self, id: FileId) -> &FileContext {
        &self.files[id]
    }

    /// Best-guess qualified name for a type written inside `context`.
    ///
    /// Order: explicit qualification, single-type import, member type of the
    /// current or an enclosing class, same package, wildcard import, `java.lang`,
    /// and finally the same-package guess even when it is not indexed.
    pub fn qualify_type(&self, type_text: &str, context: &ClassRecord) -> Option<String> {
        let raw = raw_type_name(type_text);
        if is_primitive(&raw) {
            return None;
        }

        let file = &self.files[context.file];

        if raw.contains('.') {
            if self.classes.contains_key(&raw) {
                return Some(raw);
            }
            let in_package = join_package(&file.package, &raw);
            if self.classes.contains_key(&in_package) {
                return Some(in_package);
            }
            let (head, rest) = raw.split_once('.').unwrap_or((raw.as_str(), ""));
            if let Some(import) = file.imports.iter().find(|i| !i.ends_with(".*") && simple_name(i) == head) {
                return Some(format!("{}.{}", import, rest));
            }
            return Some(raw);
        }

        if let Some(import) = file.imports.iter().find(|i| !i.ends_with(".*") && simple_name(i) == raw) {
            return Some(import.clone());
        }

        let mut scope = Some(context.qualified_name.clone());
        while let Some(current) = scope {
            let candidate = format!("{}.{}", current, raw);
            if self.classes.contains_key(&candidate) {
                return Some(candidate);
            }
            scope = self.classes.get(&current).and_then(|c| c.enclosing.clone());
        }

        let same_package = join_package(&file.package, &raw);
        if self.classes.contains_key(&same_package) {
            return Some(same_package);
        }

        for import in file.imports.iter().filter(|i| i.ends_with(".*")) {
            let candidate = format!("{}.{}", import.trim_end_matches(".*"), raw);
            if self.classes.contains_key(&candidate) {
                return Some(candidate);
            }
        }

        if JAVA_LANG_TYPES.contains(&raw.as_str()) {
            return Some(format!("java.lang.{}", raw));
        }

        Some(same_package)
    }
}

fn join_package(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", package, name)
    }
}

fn index_file(file_id: FileId, file: &SourceFile) -> PartialIndex {
    let root = file.tree.root_node();
    let source = file.source.as_str();

    let mut package = String::new();
    let mut imports = Vec::new();
    let mut type_nodes = Vec::new();

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "package_declaration" => {
                if let Some(name) = qualified_name_child(child) {
                    package = node_text(name, source).to_string();
                }
            }
            "import_declaration" => {
                let is_static = child.children(&mut child.walk()).any(|c| c.kind() == "static");
                if let (false, Some(name)) = (is_static, qualified_name_child(child)) {
                    let mut import = node_text(name, source).to_string();
                    if find_child_by_kind(child, "asterisk").is_some() {
                        import.push_str(".*");
                    }
                    imports.push(import);
                }
            }
            kind if is_type_declaration(kind) => type_nodes.push(child),
            _ => {}
        }
    }

    let mut partial = PartialIndex {
        file: FileContext {
            path: file.path.clone(),
            package,
            imports,
        },
        classes: Vec::new(),
        methods: Vec::new(),
    };

    for node in type_nodes {
        index_type(&mut partial, file_id, node, source, None);
    }

    partial
}

fn is_type_declaration(kind: &str) -> bool {
    matches!(
        kind,
        "class_declaration" | "interface_declaration" | "enum_declaration" | "record_declaration"
    )
}

fn qualified_name_child(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor)
        .find(|c| c.kind() == "identifier" || c.kind() == "scoped_identifier");
    found
}

fn index_type(partial: &mut PartialIndex, file_id: FileId, node: Node, source: &str, enclosing: Option<&str>) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let simple = node_text(name_node, source).to_string();
    let qualified_name = match enclosing {
        Some(outer) => format!("{}.{}", outer, simple),
        None => join_package(&partial.file.package, &simple),
    };

    let kind = match node.kind() {
        "interface_declaration" => ClassKind::Interface,
        "enum_declaration" => ClassKind::Enum,
        "record_declaration" => ClassKind::Record,
        _ => ClassKind::Class,
    };

    let mut class = ClassRecord {
        qualified_name: qualified_name.clone(),
        simple_name: simple,
        kind,
        file: file_id,
        annotations: annotations_of(node, source),
        javadoc: javadoc_of(node, source),
        fields: Vec::new(),
        declared_supertypes: declared_supertypes(node, source),
        supertypes: Vec::new(),
        methods: Vec::new(),
        enclosing: enclosing.map(str::to_string),
    };

    let mut nested = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        for member in body_members(body) {
            match member.kind() {
                "method_declaration" => {
                    let method = index_method(member, source, &qualified_name, file_id);
                    class.methods.push(partial.methods.len());
                    partial.methods.push(method);
                }
                "field_declaration" | "constant_declaration" => {
                    collect_fields(member, source, &mut class.fields);
                }
                kind if is_type_declaration(kind) => nested.push(member),
                _ => {}
            }
        }
    }

    partial.classes.push(class);

    for member in nested {
        index_type(partial, file_id, member, source, Some(&qualified_name));
    }
}

/// Members of a class, interface, record or enum body
fn body_members(body: Node) -> Vec<Node> {
    let mut members = Vec::new();
    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        if child.kind() == "enum_body_declarations" {
            let mut inner = child.walk();
            members.extend(child.named_children(&mut inner));
        } else {
            members.push(child);
        }
    }
    members
}

fn declared_supertypes(node: Node, source: &str) -> Vec<String> {
    let mut written = Vec::new();

    if let Some(superclass) = node.child_by_field_name("superclass") {
        if let Some(ty) = superclass.named_child(0) {
            written.push(node_text(ty, source).to_string());
        }
    }

    let lists = [
        node.child_by_field_name("interfaces"),
        find_child_by_kind(node, "extends_interfaces"),
    ];
    for holder in lists.into_iter().flatten() {
        if let Some(type_list) = find_child_by_kind(holder, "type_list") {
            let mut cursor = type_list.walk();
            for ty in type_list.named_children(&mut cursor) {
                written.push(node_text(ty, source).to_string());
            }
        }
    }

    written
}

fn collect_fields(node: Node, source: &str, fields: &mut Vec<(String, String)>) {
    let Some(ty) = node.child_by_field_name("type") else {
        return;
    };
    let type_name = node_text(ty, source).to_string();

    let mut cursor = node.walk();
    for declarator in node.children_by_field_name("declarator", &mut cursor) {
        if let Some(name) = declarator.child_by_field_name("name") {
            fields.push((node_text(name, source).to_string(), type_name.clone()));
        }
    }
}

fn index_method(node: Node, source: &str, owning_class: &str, file_id: FileId) -> MethodRecord {
    let name = node.child_by_field_name("name")
        .map(|n| node_text(n, source).to_string())
        .unwrap_or_default();
    let return_type = node.child_by_field_name("type")
        .map(|n| node_text(n, source).to_string())
        .unwrap_or_else(|| "void".to_string());

    let parameters = node.child_by_field_name("parameters")
        .map(|params| index_parameters(params, source))
        .unwrap_or_default();

    let mut thrown_types: Vec<String> = Vec::new();
    if let Some(throws) = find_child_by_kind(node, "throws") {
        let mut cursor = throws.walk();
        for ty in throws.named_children(&mut cursor) {
            thrown_types.push(simple_name(&raw_type_name(node_text(ty, source))).to_string());
        }
    }

    let (body, locals, call_sites) = match node.child_by_field_name("body") {
        Some(block) => {
            let facts = collect_body_facts(block, source);
            for thrown in facts.thrown_types {
                if !thrown_types.contains(&thrown) {
                    thrown_types.push(thrown);
                }
            }
            (Some(node_text(block, source).to_string()), facts.locals, facts.call_sites)
        }
        None => (None, Vec::new(), Vec::new()),
    };

    let start = node.start_position();

    MethodRecord {
        owning_class: owning_class.to_string(),
        name,
        parameters,
        return_type,
        annotations: annotations_of(node, source),
        javadoc: javadoc_of(node, source),
        body,
        thrown_types,
        locals,
        call_sites,
        position: SourcePosition {
            file: file_id,
            line: start.row + 1,
            column: start.column + 1,
            byte_offset: node.start_byte(),
        },
    }
}

fn index_parameters(params: Node, source: &str) -> Vec<ParameterRecord> {
    let mut records = Vec::new();
    let mut cursor = params.walk();

    for param in params.named_children(&mut cursor) {
        match param.kind() {
            "formal_parameter" => {
                let type_name = param.child_by_field_name("type")
                    .map(|t| node_text(t, source).to_string())
                    .unwrap_or_default();
                let name = param.child_by_field_name("name")
                    .map(|n| node_text(n, source).to_string())
                    .unwrap_or_default();
                records.push(ParameterRecord {
                    name,
                    type_name,
                    annotations: annotations_of(param, source),
                });
            }
            "spread_parameter" => {
                let mut inner = param.walk();
                let children: Vec<Node> = param.named_children(&mut inner).collect();
                let type_name = children.iter()
                    .find(|c| c.kind() != "modifiers" && c.kind() != "variable_declarator")
                    .map(|t| format!("{}...", node_text(*t, source)))
                    .unwrap_or_default();
                let name = children.iter()
                    .find(|c| c.kind() == "variable_declarator")
                    .and_then(|d| d.child_by_field_name("name"))
                    .map(|n| node_text(n, source).to_string())
                    .unwrap_or_default();
                records.push(ParameterRecord {
                    name,
                    type_name,
                    annotations: annotations_of(param, source),
                });
            }
            _ => {}
        }
    }

    records
}
