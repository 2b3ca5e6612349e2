use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone, PartialEq, Eq)]
#[command(name = "askbox")]
#[command(
    about = "Conversational helper for math, unit conversion, weather and Wikipedia summaries",
    long_about = "Conversational helper for math, unit conversion, weather and Wikipedia summaries\n\nConfig file loading:\n  - --config <path> (explicit file, overrides default path discovery)\n  - Default search path when --config is not provided:\n    1. $XDG_CONFIG_HOME/askbox/config.toml\n    2. ~/.config/askbox/config.toml"
)]
pub struct CliArgs {
    /// Load config from this file path instead of the default discovery path.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Answer a single message, print the reply and exit.
    #[arg(long, value_name = "TEXT")]
    pub once: Option<String>,

    /// Print lookup HTTP requests and responses to stderr (secrets redacted).
    #[arg(long, short)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,
}
