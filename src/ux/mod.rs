use colored::Colorize;
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

use crate::coordinator::{CoordinatorTask, TaskStatus};
use crate::design::InstructionAnalysis;
use crate::corrector::{AgentStatus, CorrectionReport};
use crate::events::{EventReceiver, StudioEvent};
use crate::output::{colorize_diff, WriteKind, WriteSummary};
use crate::config::Config;
use crate::provider::{Backend, ModelRegistry, MODELS};
use crate::wire::GeneratedFile;

pub fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    let _ = io::stdout().flush();
    let mut s = String::new();
    if io::stdin().read_line(&mut s).is_ok() {
        let ans = s.trim().to_lowercase();
        ans == "y" || ans == "yes" || ans == "s" || ans == "si" || ans == "sí"
    } else {
        false
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new(100);
    let style = ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn current_step(tasks: &[CoordinatorTask]) -> Option<&CoordinatorTask> {
    tasks.iter().rev().find_map(|t| {
        current_step(&t.subtasks).or(if t.status == TaskStatus::Working { Some(t) } else { None })
    })
}

/// Drains coordinator events into a progress bar until the channel closes.
/// Returns the error messages seen along the way.
pub async fn follow_events(mut rx: EventReceiver, quiet: bool) -> Vec<String> {
    let pb = if quiet { ProgressBar::hidden() } else { spinner() };
    let mut errors = Vec::new();

    while let Some(ev) = rx.recv().await {
        match ev {
            StudioEvent::Progress(p) => {
                pb.set_position(p.percent.into());
                pb.set_message(format!("{} {}", p.agent.dimmed(), p.message));
            }
            StudioEvent::TaskUpdate(tasks) => {
                if let Some(root) = tasks.first() {
                    pb.set_position(root.progress.into());
                }
                if let Some(t) = current_step(&tasks) {
                    pb.set_message(t.description.clone());
                }
            }
            StudioEvent::FilesGenerated(files) => {
                if let Some(last) = files.last() {
                    pb.println(format!("  {} {}", "✓".green(), last.path));
                }
            }
            StudioEvent::DesignProposalUpdate(Some(p)) => {
                let tag = if p.fallback { " (respaldo)".yellow().to_string() } else { String::new() };
                pb.println(format!("  {} {}{}", "diseño:".bold(), p.title, tag));
            }
            StudioEvent::DesignProposalUpdate(None) => {}
            StudioEvent::Error(msg) => {
                pb.println(format!("  {} {}", "error:".red().bold(), msg));
                errors.push(msg);
            }
        }
    }
    pb.finish_and_clear();
    errors
}

pub fn print_task_tree(tasks: &[CoordinatorTask]) {
    fn walk(t: &CoordinatorTask, depth: usize) {
        let badge = match t.status {
            TaskStatus::Completed => "[OK]".green().bold(),
            TaskStatus::Failed => "[FAIL]".red().bold(),
            TaskStatus::Working => "[...]".yellow().bold(),
            TaskStatus::Pending => "[ ]".dimmed(),
        };
        let took = t
            .end_time
            .map(|end| format!("  {}ms", (end - t.start_time).num_milliseconds()))
            .unwrap_or_default();
        println!("{}{} {}{}", "  ".repeat(depth), badge, t.description, took.dimmed());
        if let Some(e) = &t.error {
            println!("{}   {}", "  ".repeat(depth), e.red());
        }
        for s in &t.subtasks {
            walk(s, depth + 1);
        }
    }
    for t in tasks {
        walk(t, 0);
    }
}

pub fn print_analysis(analysis: &InstructionAnalysis) {
    let source = if analysis.fallback { " (defaults)".dimmed() } else { "".normal() };
    println!("\n{} {}{}", "Design direction:".bold(), analysis.summary(), source);
    println!("  {} {}", "Audience:".dimmed(), analysis.target_audience);
}

pub fn print_files_dashboard(files: &[GeneratedFile]) {
    println!("\n{}", "┏━━━━━━━━━━━━━━━━━━━━━━ Generated files ━━━━━━━━━━━━━━━━━━━━━┓".bold());
    for f in files {
        let origin = if f.is_fallback() { "[PLACEHOLDER]".yellow().bold() } else { "[GENERATED]".green().bold() };
        println!(
            "  {}  {}  {}  {}",
            origin,
            f.path,
            f.language.dimmed(),
            format_size(f.content.len(), DECIMAL)
        );
    }
    println!("{}", "┗━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┛".bold());
}

pub fn print_write_dashboard(sum: &WriteSummary, dry: bool) {
    let title = if dry { "Dry run" } else { "Write results" };
    println!("\n{}", format!("━━━━━━━━━━━━━━━━━━━━ {title} ━━━━━━━━━━━━━━━━━━━━").bold());
    println!(
        "  {}: {}   {}: {}   {}: {}   {}: {}   {}: {}",
        "Created".green().bold(),
        sum.created,
        "Updated".yellow().bold(),
        sum.updated,
        "Unchanged".bold(),
        sum.unchanged,
        "Placeholders".magenta().bold(),
        sum.placeholders,
        "Written".bold(),
        format_size(sum.bytes_written, DECIMAL)
    );
    for d in &sum.details {
        let label = match d.kind {
            WriteKind::Created => "[CREATE]".green().bold(),
            WriteKind::Updated => "[UPDATE]".yellow().bold(),
            WriteKind::Unchanged => "[SAME]".dimmed(),
        };
        let before = d.bytes_before.map(|b| format_size(b, DECIMAL)).unwrap_or_else(|| "-".into());
        println!("  {label}  {}  ({before} → {})", d.path.display(), format_size(d.bytes_after, DECIMAL));
    }
}

fn status_badge(s: AgentStatus) -> colored::ColoredString {
    match s {
        AgentStatus::Success => "success".green().bold(),
        AgentStatus::Warning => "warning".yellow().bold(),
        AgentStatus::Error => "error".red().bold(),
    }
}

pub fn print_correction(report: &CorrectionReport, diff: &str) {
    let a = &report.agent_status;
    println!(
        "\n{}  analizador: {}  detector: {}  generador: {}",
        "Agentes".bold(),
        status_badge(a.analyzer),
        status_badge(a.detector),
        status_badge(a.generator)
    );
    for e in &report.error_analysis.errors {
        println!(
            "  {} línea {}: {} {}",
            format!("[{}]", e.severity.as_str()).yellow(),
            e.line_start,
            e.message,
            format!("({})", e.kind.as_str()).dimmed()
        );
    }
    if !diff.is_empty() {
        println!("\n{}", colorize_diff(diff, 120));
    }
    println!("\n{}", crate::corrector::comprehensive_report(report));
}

pub fn print_models(cfg: &Config, registry: &ModelRegistry) {
    println!("{}", "Modelos disponibles".bold());
    for info in &MODELS {
        let default = if info.name == cfg.model { " (predeterminado)".cyan().to_string() } else { String::new() };
        let creds = if info.backend.has_credentials(cfg) { "✓".green() } else { "sin clave".red() };
        let fallback = registry
            .fallback_order()
            .iter()
            .position(|m| m == info.name)
            .map(|i| format!("  respaldo #{}", i + 1))
            .unwrap_or_default();
        let id = if info.backend == Backend::Ollama { cfg.ollama_model.as_str() } else { info.model_id };
        println!(
            "  {:<22} {:<10} {:<26} {}{}{}",
            info.name,
            info.backend.as_str(),
            id,
            creds,
            fallback.dimmed(),
            default
        );
    }
}
