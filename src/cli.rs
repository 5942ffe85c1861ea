use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::Result;

use crate::core::{AnalyzeOptions, Engine};

#[derive(Parser)]
#[command(name = "specsworth")]
#[command(about = "Recovers a documented REST specification from Java sources")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a source tree and write the specification
    Analyze {
        /// Source directory to analyze (defaults to the configured source dirs)
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Output directory for the specification
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum call-chain depth below each endpoint
        #[arg(long)]
        depth: Option<usize>,

        /// Character budget for one call-chain trace
        #[arg(long)]
        max_chars: Option<usize>,

        /// Externally produced spec.json to merge over the analysed one
        #[arg(long)]
        merge: Option<PathBuf>,

        /// Skip LLM enhancement even when configured
        #[arg(long)]
        no_llm: bool,
    },

    /// Write a default configuration file
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command {
            Commands::Analyze { source, output, depth, max_chars, merge, no_llm } => {
                let options = AnalyzeOptions { source, output, depth, max_chars, merge, no_llm };
                engine.analyze(options).await.map(|_| ())
            }
            Commands::Init { path } => {
                engine.init(path).await.map(|_| ())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_flags_parse() {
        let cli = Cli::parse_from([
            "specsworth", "analyze", "--source", "src/main/java", "--depth", "5",
            "--max-chars", "4000", "--no-llm", "--verbose",
        ]);

        assert!(cli.verbose);
        match cli.command {
            Commands::Analyze { source, depth, max_chars, no_llm, merge, .. } => {
                assert_eq!(source, Some(PathBuf::from("src/main/java")));
                assert_eq!(depth, Some(5));
                assert_eq!(max_chars, Some(4000));
                assert!(no_llm);
                assert!(merge.is_none());
            }
            Commands::Init { .. } => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_init_accepts_global_config() {
        let cli = Cli::parse_from(["specsworth", "init", "--path", "demo", "--config", "custom.toml"]);

        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Commands::Init { path: Some(_) }));
    }
}
