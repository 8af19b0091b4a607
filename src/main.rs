use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use fs_err as fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use codestorm::config::Config;
use codestorm::coordinator::{CancelHandle, Coordinator};
use codestorm::corrector::CorrectionOptions;
use codestorm::events;
use codestorm::output;
use codestorm::prompt::language_from_path;
use codestorm::provider::ModelRegistry;
use codestorm::ux;
use codestorm::wire::{file_name, FileDescription, FileOrigin, GeneratedFile, TechnologyStack};

mod cli;

use cli::{Cli, Command, OutputArgs};

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn cancel_on_ctrl_c(handle: CancelHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "cancelando: la llamada en curso se descartará".yellow());
            handle.cancel();
        }
    });
}

/// A coordinator plus the task draining its events to the terminal.
struct Session {
    coord: Coordinator,
    follower: JoinHandle<Vec<String>>,
}

impl Session {
    fn start(registry: ModelRegistry, cfg: &Config, quiet: bool) -> Self {
        let (tx, rx) = events::channel();
        let follower = tokio::spawn(ux::follow_events(rx, quiet));
        let coord = Coordinator::new(Arc::new(registry), cfg.clone(), tx);
        cancel_on_ctrl_c(coord.cancel_handle());
        Self { coord, follower }
    }

    /// Closes the event channel and waits for the terminal to catch up.
    async fn finish(self) -> Result<Vec<String>> {
        drop(self.coord);
        Ok(self.follower.await?)
    }
}

fn load_stack(path: &Path) -> Result<TechnologyStack> {
    let text = fs::read_to_string(path)?;
    let stack = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?,
        _ => serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?,
    };
    Ok(stack)
}

fn write_output(files: &[GeneratedFile], out: &OutputArgs, cfg: &Config) -> Result<()> {
    if files.is_empty() {
        return Ok(());
    }
    let root = out.out_dir.clone().unwrap_or_else(|| PathBuf::from(&cfg.out_dir));
    if !out.dry_run
        && !out.yes
        && !ux::confirm(&format!("Write {} file(s) to {}?", files.len(), root.display()))
    {
        println!("Aborted by user.");
        return Ok(());
    }
    let summary = output::write_files(&root, files, out.dry_run)?;
    ux::print_write_dashboard(&summary, out.dry_run);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_generate(
    registry: ModelRegistry,
    cfg: &Config,
    quiet: bool,
    paths: Vec<String>,
    description: String,
    context: String,
    dependencies: Vec<String>,
    plan: Option<PathBuf>,
    stack: Option<PathBuf>,
    out: OutputArgs,
) -> Result<()> {
    let files: Vec<FileDescription> = match plan {
        Some(p) => serde_json::from_str(&fs::read_to_string(&p)?)
            .with_context(|| format!("parsing plan {}", p.display()))?,
        None => paths
            .iter()
            .map(|p| FileDescription::new(p.as_str(), description.as_str()).with_dependencies(dependencies.clone()))
            .collect(),
    };
    let stack = stack.as_deref().map(load_stack).transpose()?;

    let mut session = Session::start(registry, cfg, quiet);
    let result = match files.as_slice() {
        [single] => session.coord.generate_file(single, &context, stack.as_ref()).await.map(|f| vec![f]),
        many => session.coord.generate_from_plan(many, &context, stack.as_ref()).await,
    };
    let tasks = session.coord.tasks().to_vec();
    session.finish().await?;

    ux::print_task_tree(&tasks);
    let generated = result?;
    ux::print_files_dashboard(&generated);
    write_output(&generated, &out, cfg)
}

async fn run_website(
    registry: ModelRegistry,
    cfg: &Config,
    quiet: bool,
    description: String,
    save_proposal: bool,
    out: OutputArgs,
) -> Result<()> {
    let mut session = Session::start(registry, cfg, quiet);
    let outcome = session.coord.generate_website(&description).await;
    session.finish().await?;

    ux::print_task_tree(&outcome.tasks);
    if let Some(analysis) = &outcome.analysis {
        ux::print_analysis(analysis);
    }
    let mut files = outcome.files.clone();
    ux::print_files_dashboard(&files);
    if save_proposal {
        if let Some(p) = &outcome.proposal {
            let json = serde_json::to_string_pretty(p)?;
            files.push(GeneratedFile::new("design-proposal.json", json, "json".into(), FileOrigin::Generated));
        }
    }
    write_output(&files, &out, cfg)?;

    if !outcome.succeeded() {
        bail!("website generation did not complete");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_correct(
    registry: ModelRegistry,
    cfg: &Config,
    quiet: bool,
    file: PathBuf,
    language: Option<String>,
    options: CorrectionOptions,
    assist: Option<String>,
    write: bool,
    json: bool,
) -> Result<()> {
    let code = fs::read_to_string(&file)?;
    let label = file.to_string_lossy().to_string();
    let language = language.unwrap_or_else(|| language_from_path(&label));
    if let Some(m) = &assist {
        if !registry.contains(m) {
            bail!("unknown model '{m}'; run `codestorm models`");
        }
    }

    let mut session = Session::start(registry, cfg, quiet || json);
    let result = session.coord.correct_code(&code, &language, &options, assist.as_deref()).await;
    session.finish().await?;
    let report = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let diff = output::unified_diff(&code, &report.code_generation.corrected_code, file_name(&label));
        ux::print_correction(&report, &diff);
    }

    if write && report.code_generation.corrected_code != code {
        fs::write(&file, &report.code_generation.corrected_code)?;
        println!("{} {}", "updated".green().bold(), file.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();
    init_tracing(&args.log_level);

    let mut cfg = Config::load(args.config.as_deref())?;
    if let Some(m) = &args.model {
        cfg.model = m.clone();
    }
    if let Some(t) = args.timeout_secs {
        cfg.timeout_secs = t;
    }

    let registry = if args.offline {
        ModelRegistry::offline(&cfg)
    } else {
        ModelRegistry::from_config(&cfg)?
    };
    if !registry.contains(&cfg.model) {
        bail!("unknown model '{}'; run `codestorm models`", cfg.model);
    }
    tracing::debug!(model = %cfg.model, offline = args.offline, "configuration loaded");

    match args.command {
        Command::Generate { paths, description, context, dependencies, plan, stack, output } => {
            run_generate(registry, &cfg, args.quiet, paths, description, context, dependencies, plan, stack, output)
                .await
        }
        Command::Website { description, save_proposal, output } => {
            run_website(registry, &cfg, args.quiet, description, save_proposal, output).await
        }
        Command::Correct { file, language, no_security, no_performance, assist, write, json } => {
            let options = CorrectionOptions {
                analyze_security: !no_security,
                analyze_performance: !no_performance,
                ..CorrectionOptions::default()
            };
            run_correct(registry, &cfg, args.quiet, file, language, options, assist, write, json).await
        }
        Command::Models => {
            ux::print_models(&cfg, &registry);
            Ok(())
        }
    }
}
