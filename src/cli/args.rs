use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::notebook::Patch;

#[derive(Debug, Parser, Clone, PartialEq, Eq)]
#[command(name = "nbfix")]
#[command(
    about = "Patch the conversation-memory lab notebook and demo chat history handling",
    long_about = "Patch the conversation-memory lab notebook and demo chat history handling\n\nConfig file loading:\n  - --config <path> (explicit file, overrides default path discovery)\n  - Default search path when --config is not provided:\n    1. $XDG_CONFIG_HOME/nbfix/config.toml\n    2. ~/.config/nbfix/config.toml\n\nEnvironment (a local .env file is honoured):\n  OPENAI_API_KEY, OPENAI_MODEL, OPENAI_BASE_URL, NBFIX_NOTEBOOK"
)]
pub struct CliArgs {
    /// Load config from this file path instead of the default discovery path.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log HTTP requests and responses (secrets redacted) to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Replace the stateless pain-point cell with the history-preserving version.
    FixMemory(PatchArgs),
    /// Prepend client setup and API-key checks to the fixed cell.
    AddSetup(PatchArgs),
    /// Insert a markdown cell explaining the fix after the fixed cell.
    AddExplanation(PatchArgs),
    /// Run fix-memory, add-setup and add-explanation in order, writing once.
    ApplyAll(PatchArgs),
    /// Run the conversation memory demo against the chat API.
    Demo(DemoArgs),
}

impl CliCommand {
    pub fn patches(&self) -> Option<(&PatchArgs, Vec<Patch>)> {
        match self {
            Self::FixMemory(args) => Some((args, vec![Patch::FixMemory])),
            Self::AddSetup(args) => Some((args, vec![Patch::AddSetup])),
            Self::AddExplanation(args) => Some((args, vec![Patch::AddExplanation])),
            Self::ApplyAll(args) => Some((args, Patch::ALL.to_vec())),
            Self::Demo(_) => None,
        }
    }
}

#[derive(Debug, Args, Clone, Default, PartialEq, Eq)]
pub struct PatchArgs {
    /// Notebook to patch. Defaults to the configured notebook path.
    #[arg(long, value_name = "PATH")]
    pub notebook: Option<PathBuf>,

    /// Report what would change without writing the notebook.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args, Clone, Default, PartialEq, Eq)]
pub struct DemoArgs {
    /// Only run the history-preserving conversation.
    #[arg(long)]
    pub skip_stateless: bool,
}
