//! Project-wide source index
//!
//! Built once from the loaded files and read-only afterwards. Every later
//! stage (endpoint extraction, error-code scanning, call-chain resolution)
//! queries the index instead of re-walking syntax trees.

mod body;
mod records;
mod source_index;

pub use body::{collect_body_facts, BodyFacts, CallKind, CallSite, Receiver};
pub use records::{
    ClassKind, ClassRecord, FileContext, FileId, MethodId, MethodRecord, ParameterRecord, SourcePosition,
};
pub use source_index::SourceIndex;

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    use super::SourceIndex;
    use crate::core::languages::JavaParser;
    use crate::core::parser::SourceLoader;

    /// Index in-memory `(path, source)` pairs
    pub fn index_sources(sources: &[(&str, &str)]) -> SourceIndex {
        let mut parser = JavaParser::new().unwrap();
        let files: Vec<_> = sources.iter()
            .map(|(path, source)| {
                SourceLoader::parse_source(&mut parser, PathBuf::from(path), source.to_string()).unwrap()
            })
            .collect();
        SourceIndex::build(&files).unwrap()
    }
}
