use std::path::{Path, PathBuf};
use ignore::WalkBuilder;
use rayon::prelude::*;
use sha2::{Sha256, Digest};
use tracing::{debug, warn};
use tree_sitter::Tree;

use crate::config::ParsingConfig;
use crate::error::{SpecsworthError, Result};
use super::languages::JavaParser;

/// Declaration kinds that make a parse tree worth keeping
const TYPE_DECLARATION_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
];

/// A parsed source file. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File path as discovered under the source root
    pub path: PathBuf,

    /// Content hash for change detection
    pub content_hash: String,

    /// Raw source content
    pub source: String,

    /// Parsed syntax tree
    pub tree: Tree,
}

/// Reads and parses every source file under a set of roots
pub struct SourceLoader {
    config: ParsingConfig,
}

impl SourceLoader {
    pub fn new(config: &ParsingConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Load every matching file under the roots. Files that cannot be read or
    /// parsed are logged and skipped; the result is sorted by path.
    pub fn load_directories<P: AsRef<Path>>(&self, roots: &[P]) -> Result<Vec<SourceFile>> {
        let mut paths = Vec::new();
        for root in roots {
            paths.extend(self.discover_files(root.as_ref()));
        }
        paths.sort();
        paths.dedup();

        debug!("Discovered {} candidate source files", paths.len());

        let mut files: Vec<SourceFile> = paths
            .par_iter()
            .map_init(
                || JavaParser::new().ok(),
                |parser, path| match parser.as_mut() {
                    Some(parser) => self.load_file(parser, path),
                    None => Err(SpecsworthError::Parser("Java grammar unavailable".to_string())),
                },
            )
            .filter_map(|loaded| match loaded {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!("⚠️ Skipping source file: {}", e);
                    None
                }
            })
            .collect();

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    /// Read and parse a single file from disk
    pub fn load_file(&self, parser: &mut JavaParser, path: &Path) -> Result<SourceFile> {
        let metadata = std::fs::metadata(path)?;
        if metadata.len() as usize > self.config.max_file_size {
            return Err(SpecsworthError::Parser(
                format!("File {} exceeds maximum size limit", path.display())
            ));
        }

        let source = std::fs::read_to_string(path)
            .map_err(|e| SpecsworthError::FileSystem(format!("{}: {}", path.display(), e)))?;

        Self::parse_source(parser, path.to_path_buf(), source)
    }

    /// Parse in-memory source text
    pub fn parse_source(parser: &mut JavaParser, path: PathBuf, source: String) -> Result<SourceFile> {
        let tree = parser.parse(&source)?;

        let root = tree.root_node();
        if root.has_error() {
            let mut cursor = root.walk();
            let has_declarations = root.named_children(&mut cursor)
                .any(|child| TYPE_DECLARATION_KINDS.contains(&child.kind()));
            if !has_declarations {
                return Err(SpecsworthError::Parser(
                    format!("{} could not be parsed", path.display())
                ));
            }
            debug!("{} parsed with recoverable syntax errors", path.display());
        }

        let content_hash = calculate_hash(&source);
        debug!("Parsed {} ({})", path.display(), &content_hash[..12]);

        Ok(SourceFile {
            path,
            content_hash,
            source,
            tree,
        })
    }

    /// Walk a root, respecting ignore files, and keep configured extensions
    fn discover_files(&self, root: &Path) -> Vec<PathBuf> {
        if !root.exists() {
            warn!("Source root {} does not exist", root.display());
            return Vec::new();
        }

        let walker = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(true)
            .build();

        let mut found = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && self.should_parse_file(path) {
                        found.push(path.to_path_buf());
                    }
                }
                Err(e) => warn!("Failed to read directory entry: {}", e),
            }
        }
        found
    }

    /// Determine if a file should be parsed based on configuration
    fn should_parse_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.config.file_extensions.iter().any(|configured| configured == ext))
            .unwrap_or(false)
    }
}

/// Calculate SHA256 hash of content
fn calculate_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
