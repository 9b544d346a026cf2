//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - candidates: list the most promising single-word changes per sentence
//! - highlight: report awkward words with suggestions, no edits
//! - refine: apply edits automatically or interactively

use clap::{Args, Parser, Subcommand};
use eyre::{Context, Result};
use std::fs;
use std::io::Read;
use std::path::PathBuf;

use flow_refine::config::RefineConfig;

/// Flow - flag awkward words and propose fluent replacements
#[derive(Parser, Debug)]
#[command(name = "flow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Threshold overrides; unset flags keep the config file values.
#[derive(Args, Debug, Default, Clone)]
pub struct ThresholdArgs {
    /// Flag words at or above this entropy (bits)
    #[arg(long, global = true)]
    pub min_entropy: Option<f64>,

    /// Flag words whose original token ranks at or below this position
    #[arg(long, global = true)]
    pub max_rank: Option<usize>,

    /// Required windowed PLL improvement
    #[arg(long, global = true)]
    pub min_pll_gain: Option<f64>,

    /// Required sentence-embedding cosine similarity
    #[arg(long, global = true)]
    pub min_similarity: Option<f64>,

    /// Words on each side of an edit included in the PLL window
    #[arg(long, global = true)]
    pub pll_window: Option<usize>,

    /// Edit budget per sentence
    #[arg(long, global = true)]
    pub max_edits: Option<usize>,

    /// Model predictions considered per flagged word
    #[arg(long, global = true)]
    pub top_k: Option<usize>,

    /// Require entailment in addition to similarity
    #[arg(long, global = true)]
    pub use_nli: bool,
}

impl ThresholdArgs {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut RefineConfig) {
        if let Some(v) = self.min_entropy {
            config.min_entropy = v;
        }
        if let Some(v) = self.max_rank {
            config.max_original_rank = v;
        }
        if let Some(v) = self.min_pll_gain {
            config.min_pll_gain = v;
        }
        if let Some(v) = self.min_similarity {
            config.min_sbert_cosine = v;
        }
        if let Some(v) = self.pll_window {
            config.pll_window_size = v;
        }
        if let Some(v) = self.max_edits {
            config.max_edits_per_sentence = v;
        }
        if let Some(v) = self.top_k {
            config.top_k_candidates = v;
        }
        if self.use_nli {
            config.use_nli_check = true;
        }
    }
}

/// Where the input text comes from.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Text to process (reads stdin when neither text nor --file is given)
    pub text: Option<String>,

    /// Read the text from a file
    #[arg(short, long, conflicts_with = "text")]
    pub file: Option<PathBuf>,
}

impl InputArgs {
    pub fn read(&self) -> Result<String> {
        if let Some(text) = &self.text {
            return Ok(text.clone());
        }
        if let Some(path) = &self.file {
            return fs::read_to_string(path).context(format!("Failed to read {}", path.display()));
        }
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        Ok(buffer)
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the most promising single-word changes in each sentence
    Candidates {
        #[command(flatten)]
        input: InputArgs,

        /// Changes shown per sentence
        #[arg(short = 'n', long, default_value_t = 5)]
        top: usize,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report flagged words and suggestions without editing
    Highlight {
        #[command(flatten)]
        input: InputArgs,

        /// Suggestions shown per flagged word
        #[arg(short, long)]
        suggestions: Option<usize>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply edits to the text
    Refine {
        #[command(flatten)]
        input: InputArgs,

        /// Confirm every edit at a prompt
        #[arg(short, long)]
        interactive: bool,

        /// Also write the refined text to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["flow"]).is_err());
    }

    #[test]
    fn test_highlight_with_text() {
        let cli = Cli::try_parse_from(["flow", "highlight", "The utilize of technology.", "-s", "5", "--json"]).unwrap();
        match cli.command {
            Commands::Highlight {
                input,
                suggestions,
                json,
            } => {
                assert_eq!(input.text.as_deref(), Some("The utilize of technology."));
                assert_eq!(suggestions, Some(5));
                assert!(json);
            }
            _ => panic!("Expected highlight command"),
        }
    }

    #[test]
    fn test_refine_interactive_from_file() {
        let cli = Cli::try_parse_from(["flow", "refine", "--file", "essay.txt", "--interactive"]).unwrap();
        match cli.command {
            Commands::Refine { input, interactive, .. } => {
                assert!(interactive);
                assert_eq!(input.file, Some(PathBuf::from("essay.txt")));
                assert!(input.text.is_none());
            }
            _ => panic!("Expected refine command"),
        }
    }

    #[test]
    fn test_candidates_defaults_to_five() {
        let cli = Cli::try_parse_from(["flow", "candidates", "We utilize tools."]).unwrap();
        match cli.command {
            Commands::Candidates { input, top, json } => {
                assert_eq!(input.text.as_deref(), Some("We utilize tools."));
                assert_eq!(top, 5);
                assert!(!json);
            }
            _ => panic!("Expected candidates command"),
        }

        let cli = Cli::try_parse_from(["flow", "candidates", "-n", "10", "x"]).unwrap();
        assert!(matches!(cli.command, Commands::Candidates { top: 10, .. }));
    }

    #[test]
    fn test_refine_output_file() {
        let cli = Cli::try_parse_from(["flow", "refine", "text", "-o", "refined.txt"]).unwrap();
        match cli.command {
            Commands::Refine { output, .. } => assert_eq!(output, Some(PathBuf::from("refined.txt"))),
            _ => panic!("Expected refine command"),
        }
    }

    #[test]
    fn test_text_and_file_conflict() {
        assert!(Cli::try_parse_from(["flow", "refine", "text", "--file", "x.txt"]).is_err());
    }

    #[test]
    fn test_threshold_overrides() {
        let cli = Cli::try_parse_from([
            "flow",
            "refine",
            "text",
            "--min-entropy",
            "3.5",
            "--max-edits",
            "1",
            "--pll-window",
            "3",
            "--use-nli",
        ])
        .unwrap();

        let mut config = RefineConfig::default();
        cli.thresholds.apply(&mut config);
        assert_eq!(config.min_entropy, 3.5);
        assert_eq!(config.max_edits_per_sentence, 1);
        assert_eq!(config.pll_window_size, 3);
        assert!(config.use_nli_check);
        // Untouched values keep their defaults
        assert_eq!(config.max_original_rank, 50);
        assert_eq!(config.top_k_candidates, 20);
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["flow", "-v", "-c", "/tmp/flow.yml", "highlight", "x"]).unwrap();
        assert!(cli.is_verbose());
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/flow.yml")));
    }

    #[test]
    fn test_read_text_input() {
        let input = InputArgs {
            text: Some("hello".to_string()),
            file: None,
        };
        assert_eq!(input.read().unwrap(), "hello");
    }

    #[test]
    fn test_read_file_input() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"From a file.").unwrap();
        let input = InputArgs {
            text: None,
            file: Some(file.path().to_path_buf()),
        };
        assert_eq!(input.read().unwrap(), "From a file.");
    }

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }
}
