pub mod chat;
pub mod cli;
pub mod config;
pub mod http;
pub mod llm;
pub mod notebook;
pub mod trace;

use anyhow::{Result, anyhow, bail};
use chat::demo;
use cli::{CliArgs, CliCommand, DemoArgs};
use config::AppConfig;
use http::client::HttpClient;
use http::debug::HttpDebugConfig;
use llm::openai::OpenAiProvider;
use llm::provider::LlmError;
use notebook::{Notebook, Patch, PatchOutcome};
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use trace::{SessionTrace, TraceEvent};

pub async fn run(args: CliArgs) -> Result<()> {
    let config = AppConfig::load_with_path(args.config.as_deref())?;
    let trace = SessionTrace::open_or_warn(&generate_session_id());

    match &args.command {
        CliCommand::Demo(demo_args) => {
            run_demo(&config, demo_args, args.verbose, trace.as_ref()).await
        }
        command => {
            let Some((patch_args, patches)) = command.patches() else {
                bail!("internal error: {command:?} is not a notebook patch command");
            };
            let path = patch_args
                .notebook
                .clone()
                .unwrap_or_else(|| config.notebook_path.clone());
            let mut stdout = io::stdout();
            run_patches(
                &path,
                &patches,
                patch_args.dry_run,
                trace.as_ref(),
                &mut stdout,
            )?;
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub outcomes: Vec<(Patch, PatchOutcome)>,
    pub written: bool,
}

/// Loads the notebook, applies `patches` in order and writes it back once.
/// Any failing patch aborts the run before anything is written.
pub fn run_patches<W: Write>(
    path: &Path,
    patches: &[Patch],
    dry_run: bool,
    trace: Option<&SessionTrace>,
    out: &mut W,
) -> Result<PatchReport> {
    let mut notebook =
        Notebook::load(path).map_err(|err| anyhow!("Failed to load notebook: {err}"))?;
    if let Some(trace) = trace {
        trace.record(TraceEvent::NotebookLoaded {
            path,
            cells: notebook.len(),
        });
    }

    let mut outcomes = Vec::with_capacity(patches.len());
    for &patch in patches {
        let outcome = patch.apply(&mut notebook).map_err(|err| {
            anyhow!(
                "Failed to apply {} to {}: {err}",
                patch.name(),
                path.display()
            )
        })?;
        let line = patch.describe(outcome);
        if let Some(trace) = trace {
            trace.record(TraceEvent::PatchResult(&line));
        }
        writeln!(out, "{line}")?;
        outcomes.push((patch, outcome));
    }

    let changed = outcomes.iter().any(|(_, outcome)| outcome.is_applied());
    if !changed {
        writeln!(
            out,
            "Notebook {} already up to date; nothing written",
            path.display()
        )?;
        return Ok(PatchReport {
            outcomes,
            written: false,
        });
    }

    if dry_run {
        writeln!(out, "Dry run: {} not written", path.display())?;
        return Ok(PatchReport {
            outcomes,
            written: false,
        });
    }

    notebook
        .save(path)
        .map_err(|err| anyhow!("Failed to write notebook: {err}"))?;
    if let Some(trace) = trace {
        trace.record(TraceEvent::NotebookSaved {
            path,
            cells: notebook.len(),
        });
    }
    writeln!(out, "Notebook {} updated successfully!", path.display())?;

    Ok(PatchReport {
        outcomes,
        written: true,
    })
}

async fn run_demo(
    config: &AppConfig,
    args: &DemoArgs,
    verbose: bool,
    trace: Option<&SessionTrace>,
) -> Result<()> {
    let http = HttpClient::new(reqwest::Client::new(), HttpDebugConfig::from_verbose(verbose))
        .with_trace(trace.cloned());
    let provider = OpenAiProvider::new(
        http,
        config.openai_api_key.clone(),
        config.openai_model.clone(),
        config.openai_base_url.clone(),
    )
    .map_err(|err| match err {
        LlmError::MissingApiKey => {
            anyhow!("Please set your OPENAI_API_KEY in a .env file or config file")
        }
        other => anyhow!(other),
    })?;

    let mut stdout = io::stdout();
    demo::run_memory_demo(&provider, trace, &mut stdout).await?;
    if !args.skip_stateless {
        demo::run_stateless_demo(&provider, trace, &mut stdout).await?;
    }
    demo::write_summary(&mut stdout)
}

fn generate_session_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis());
    format!("{millis:x}-{:x}", std::process::id())
}
