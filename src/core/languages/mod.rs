//! Language-specific syntax support
//!
//! Java is the only source language the REST analysis understands; this module
//! wraps the tree-sitter grammar and the small syntax models (annotations,
//! javadoc, type names) the index and extractors share.

mod java;

pub use java::{
    annotations_of, find_annotation, find_child_by_kind, is_primitive, javadoc_of, node_text,
    parse_annotation, raw_type_name, simple_name, Annotation, ElementValue, JavaParser, Javadoc,
};
