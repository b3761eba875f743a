//! callbridge CLI
//!
//! Classifies the signatures listed in a generator manifest and emits the
//! `bridge_shapes!` invocation covering them.

use std::path::PathBuf;

use callbridge_abi::TargetAbi;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "callbridge")]
#[command(about = "Interpreter/native call bridge generator", long_about = None)]
#[command(version)]
struct Cli {
    /// When to use colored output (auto, always, never)
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the shape of every method in a manifest
    Classify {
        /// Generator manifest (TOML)
        manifest: PathBuf,
        /// Target ABI, overriding the manifest
        #[arg(short, long, value_parser = parse_target)]
        target: Option<TargetAbi>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Emit the bridge_shapes! invocation for a manifest
    Generate {
        /// Generator manifest (TOML)
        manifest: PathBuf,
        /// Target ABI, overriding the manifest
        #[arg(short, long, value_parser = parse_target)]
        target: Option<TargetAbi>,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Wrap the invocation in `pub mod <NAME>`
        #[arg(short, long)]
        module: Option<String>,
    },

    /// Explain mangled shapes slot by slot
    Demangle {
        /// Mangled shapes, e.g. "i4i8i4"
        #[arg(required = true)]
        shapes: Vec<String>,
    },

    /// List supported target ABIs
    Targets,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

fn parse_target(s: &str) -> Result<TargetAbi, String> {
    s.parse()
}

fn init_tracing() {
    // Initialize tracing if CALLBRIDGE_LOG is set
    if let Ok(filter) = EnvFilter::try_from_env("CALLBRIDGE_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let color = output::resolve_color_choice(cli.color.as_deref());

    match cli.command {
        Commands::Classify {
            manifest,
            target,
            format,
        } => commands::classify::execute(&manifest, target, format, color),

        Commands::Generate {
            manifest,
            target,
            output,
            module,
        } => commands::generate::execute(&manifest, target, output.as_deref(), module.as_deref()),

        Commands::Demangle { shapes } => commands::demangle::execute(&shapes, color),

        Commands::Targets => commands::targets::execute(color),
    }
}
