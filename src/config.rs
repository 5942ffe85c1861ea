use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{SpecsworthError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Whether to use LLM enhancement
    pub enabled: bool,

    /// LLM provider (currently "openai", which covers any OpenAI-compatible endpoint)
    pub provider: String,

    /// Model name (e.g., "gpt-4o-mini")
    pub model: String,

    /// API key (for external providers)
    pub api_key: Option<String>,

    /// Base URL of the chat-completions API
    pub base_url: Option<String>,

    /// Maximum tokens for LLM responses
    pub max_tokens: Option<u32>,

    /// Temperature for LLM responses (0.0 to 1.0)
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Source code parsing configuration
    pub parsing: ParsingConfig,

    /// Static analysis bounds and filters
    pub analysis: AnalysisConfig,

    /// Output settings
    pub output: OutputConfig,

    /// LLM integration settings
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Source directories to analyze
    pub source_dirs: Vec<PathBuf>,

    /// Output directory for generated specs
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsingConfig {
    /// File extensions to parse
    pub file_extensions: Vec<String>,

    /// Maximum file size to parse (in bytes)
    pub max_file_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Maximum call-chain depth below the endpoint method
    pub call_chain_depth: usize,

    /// Soft character budget for one call-chain trace
    pub call_chain_max_chars: usize,

    /// Maximum length of the endpoint body snippet handed to the enhancer
    pub body_snippet_chars: usize,

    /// Maximum number of distinct called-method names per endpoint
    pub called_methods_limit: usize,

    /// Maximum javadoc length per call-chain node
    pub javadoc_snippet_chars: usize,

    /// Namespaces whose types are never traced into
    pub excluded_namespaces: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output formats to write ("openapi", "json", "markdown")
    pub formats: Vec<String>,

    /// Also write the enhancer context records
    pub include_context: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            call_chain_depth: 3,
            call_chain_max_chars: 12_000,
            body_snippet_chars: 2_000,
            called_methods_limit: 10,
            javadoc_snippet_chars: 300,
            excluded_namespaces: vec![
                "java.".to_string(),
                "javax.".to_string(),
                "jakarta.".to_string(),
                "org.springframework.".to_string(),
                "org.junit.".to_string(),
            ],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig {
                name: "Unnamed Project".to_string(),
                source_dirs: vec![PathBuf::from("src")],
                output_dir: PathBuf::from("spec"),
            },
            parsing: ParsingConfig {
                file_extensions: vec!["java".to_string()],
                max_file_size: 1024 * 1024, // 1MB
            },
            analysis: AnalysisConfig::default(),
            output: OutputConfig {
                formats: vec!["openapi".to_string(), "json".to_string(), "markdown".to_string()],
                include_context: false,
            },
            llm: LlmConfig {
                enabled: false,
                provider: "openai".to_string(),
                model: "gpt-4o-mini".to_string(),
                api_key: None,
                base_url: Some("https://api.openai.com/v1".to_string()),
                max_tokens: Some(1024),
                temperature: Some(0.3),
            },
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| SpecsworthError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SpecsworthError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                let candidates = [
                    "Specsworth.toml",
                    "specsworth.toml",
                    ".specsworth.toml",
                ];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("specsworth.toml");

        let mut config = Config::default();
        config.analysis.call_chain_depth = 5;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.analysis.call_chain_depth, 5);
        assert_eq!(loaded.parsing.file_extensions, vec!["java".to_string()]);
    }

    #[test]
    fn test_missing_explicit_config_falls_back_to_default() {
        let config = Config::load_or_default(Some("/definitely/not/here.toml")).unwrap();
        assert_eq!(config.analysis.call_chain_max_chars, 12_000);
        assert!(!config.llm.enabled);
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[project\nname = ").unwrap();

        match Config::load(&path) {
            Err(SpecsworthError::Config(_)) => {}
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }
}
