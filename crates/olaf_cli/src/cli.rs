//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Olaf: a terminal chat client for a local Ollama server.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "olaf", version, about)]
pub struct CliArgs {
    /// Path to the JSON configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Directory holding sessions and preferences.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the Ollama server.
    #[arg(long = "ollama-url")]
    pub ollama_url: Option<String>,

    /// Base URL of the web search server.
    #[arg(long = "search-url")]
    pub search_url: Option<String>,

    /// Augment prompts with web search results.
    #[arg(long = "search", conflicts_with = "no_search")]
    pub search: bool,

    /// Disable web search augmentation even when configured.
    #[arg(long = "no-search")]
    pub no_search: bool,

    /// Chat provider: `ollama` or `mock`.
    #[arg(long = "provider")]
    pub provider: Option<String>,

    /// Log filter (trace, debug, info, warn, error, or an env-filter directive).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Append logs to this file instead of stderr.
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,
}

impl CliArgs {
    /// `Some` only when one of `--search` / `--no-search` was given.
    #[must_use]
    pub fn search_override(&self) -> Option<bool> {
        if self.search {
            Some(true)
        } else if self.no_search {
            Some(false)
        } else {
            None
        }
    }
}
