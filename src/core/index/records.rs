// src/core/index/records.rs
use std::path::PathBuf;
use serde::{Deserialize, Serialize};

use super::super::languages::{Annotation, Javadoc};
use super::body::CallSite;

/// Position of a file in the loaded file list
pub type FileId = usize;

/// Position of a method in the index's method arena
pub type MethodId = usize;

/// Per-file facts every class in the file shares
#[derive(Debug, Clone)]
pub struct FileContext {
    pub path: PathBuf,
    /// Package name, empty for the default package
    pub package: String,
    /// Non-static imports as written (`com.x.Foo`, `com.x.*`)
    pub imports: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
    Record,
}

/// A declared class-like type. Built once during indexing.
#[derive(Debug, Clone)]
pub struct ClassRecord {
    /// Canonical name: package + enclosing types + simple name
    pub qualified_name: String,
    pub simple_name: String,
    pub kind: ClassKind,
    pub file: FileId,
    pub annotations: Vec<Annotation>,
    pub javadoc: Option<Javadoc>,
    /// Declared fields in source order (name, written type)
    pub fields: Vec<(String, String)>,
    /// Extended/implemented types as written
    pub declared_supertypes: Vec<String>,
    /// Best-guess qualified names of `declared_supertypes`, in declaration order
    pub supertypes: Vec<String>,
    /// Methods declared directly in this type, in source order
    pub methods: Vec<MethodId>,
    /// Canonical name of the enclosing type for nested declarations
    pub enclosing: Option<String>,
}

impl ClassRecord {
    /// Written type of a declared field
    pub fn field_type(&self, name: &str) -> Option<&str> {
        self.fields.iter()
            .find(|(field, _)| field == name)
            .map(|(_, ty)| ty.as_str())
    }
}

/// Start of a declaration in its source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    pub file: FileId,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
    pub byte_offset: usize,
}

#[derive(Debug, Clone)]
pub struct ParameterRecord {
    pub name: String,
    /// Type as written
    pub type_name: String,
    pub annotations: Vec<Annotation>,
}

/// Read-only view of a method declaration
#[derive(Debug, Clone)]
pub struct MethodRecord {
    pub owning_class: String,
    pub name: String,
    pub parameters: Vec<ParameterRecord>,
    /// Return type as written
    pub return_type: String,
    pub annotations: Vec<Annotation>,
    pub javadoc: Option<Javadoc>,
    /// Source text of the body block; `None` for abstract and interface methods
    pub body: Option<String>,
    /// Types named in the `throws` clause and in `throw new` expressions (simple names)
    pub thrown_types: Vec<String>,
    /// Local declarations in the body (name, written type)
    pub locals: Vec<(String, String)>,
    /// Outbound calls in source order
    pub call_sites: Vec<CallSite>,
    pub position: SourcePosition,
}

impl MethodRecord {
    pub fn body_present(&self) -> bool {
        self.body.is_some()
    }

    pub fn parameter_types(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.type_name.clone()).collect()
    }

    /// Declared type of a parameter or local, parameters first
    pub fn local_type(&self, name: &str) -> Option<&str> {
        self.parameters.iter()
            .find(|p| p.name == name)
            .map(|p| p.type_name.as_str())
            .or_else(|| {
                self.locals.iter()
                    .find(|(local, _)| local == name)
                    .map(|(_, ty)| ty.as_str())
            })
    }

    /// `ReturnType name(Type a, Type b)`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.parameters.iter()
            .map(|p| format!("{} {}", p.type_name, p.name))
            .collect();
        format!("{} {}({})", self.return_type, self.name, params.join(", "))
    }

    /// Javadoc description text, if any
    pub fn javadoc_text(&self) -> Option<&str> {
        self.javadoc.as_ref()
            .map(|doc| doc.description.as_str())
            .filter(|text| !text.is_empty())
    }
}
