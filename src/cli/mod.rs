use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "codestorm", version, about = "Model-driven file and website generation with multi-agent code correction")]
pub struct Cli {
    /// TOML config file; environment variables override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Model display name, e.g. "Claude 3.7".
    #[arg(long, global = true)]
    pub model: Option<String>,

    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Run without network access; every file becomes a placeholder.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    #[arg(long, global = true, default_value_t = false)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Defaults to `out_dir` from the config.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Write without asking.
    #[arg(long, short = 'y', default_value_t = false)]
    pub yes: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate one or more files from descriptions.
    Generate {
        /// Paths to generate, e.g. index.html.
        #[arg(required_unless_present = "plan")]
        paths: Vec<String>,

        #[arg(long, short = 'd', default_value = "")]
        description: String,

        /// Project context shared by every file.
        #[arg(long, default_value = "")]
        context: String,

        #[arg(long = "dep")]
        dependencies: Vec<String>,

        /// JSON array of `{path, description, dependencies}`.
        #[arg(long, conflicts_with = "paths")]
        plan: Option<PathBuf>,

        /// Technology stack as a JSON or TOML file.
        #[arg(long)]
        stack: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Design and generate a static website from a description.
    Website {
        description: String,

        /// Also save the design proposal as design-proposal.json.
        #[arg(long, default_value_t = false)]
        save_proposal: bool,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Analyze and correct a source file.
    Correct {
        file: PathBuf,

        /// Defaults to the language implied by the file extension.
        #[arg(long)]
        language: Option<String>,

        #[arg(long, default_value_t = false)]
        no_security: bool,

        #[arg(long, default_value_t = false)]
        no_performance: bool,

        /// Refine the rule-based result with this model.
        #[arg(long)]
        assist: Option<String>,

        /// Overwrite the file with the corrected code.
        #[arg(long, default_value_t = false)]
        write: bool,

        /// Print the full result as JSON instead of the report.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List the configured models and the fallback order.
    Models,
}
