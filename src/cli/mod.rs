mod args;
mod commands;
mod repl;
mod theme;
mod transcript;

pub use args::CliArgs;
pub use repl::{AppState, PROMPT, run_repl};
pub use theme::Theme;
pub use transcript::{Role, Transcript, Turn};
