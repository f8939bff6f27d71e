//! Clipforge CLI: compile declarative compositions and render them.
//!
//! Usage:
//!   clipforge <FILE>              Compile, save, and render every format
//!   clipforge render <FILE>       Same as above
//!   clipforge validate <FILE>     Check a composition document
//!   clipforge inspect <FILE>      Summarize a saved .xges project
//!   clipforge check               Check media backend availability

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clipforge_common::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "clipforge",
    about = "Declarative video compositions, compiled to timelines and rendered",
    version,
    author,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit structured JSON logs
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(flatten)]
    render: RenderArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug, Clone, Default)]
struct RenderArgs {
    /// Composition file (JSON)
    file: Option<PathBuf>,

    /// Compile and save the project, print the planned passes, render nothing
    #[arg(long)]
    dry_run: bool,

    /// Play the timeline instead of rendering it
    #[arg(long, conflicts_with = "dry_run")]
    preview: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a composition and render every requested format
    Render(RenderArgs),

    /// Parse a composition and print its summary
    Validate {
        /// Composition file (JSON)
        file: PathBuf,

        /// Print the parsed composition as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarize a saved project file
    Inspect {
        /// Project file (.xges)
        file: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check media backend availability
    Check,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    clipforge_common::logging::init_logging(&config.logging);

    match cli.command {
        Some(Commands::Render(args)) => render(args, &config),
        Some(Commands::Validate { file, json }) => commands::validate::run(file, json, &config),
        Some(Commands::Inspect { file, json }) => commands::inspect::run(file, json),
        Some(Commands::Check) => commands::check::run(&config),
        None => render(cli.render, &config),
    }
}

fn render(args: RenderArgs, config: &AppConfig) -> anyhow::Result<()> {
    let Some(file) = args.file else {
        Cli::command().print_help()?;
        println!();
        anyhow::bail!("missing input file");
    };
    commands::render::run(file, args.dry_run, args.preview, config)
}
