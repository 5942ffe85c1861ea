use std::path::PathBuf;

use thiserror::Error;

/// Main error type for Specsworth operations
#[derive(Error, Debug)]
pub enum SpecsworthError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Class {name} is declared in both {} and {}", first.display(), second.display())]
    DuplicateClass {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Call-chain resolution failed: {0}")]
    Resolution(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, SpecsworthError>;
