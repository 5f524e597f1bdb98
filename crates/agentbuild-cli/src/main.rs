//! agentbuild CLI tool.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::GlobalArgs;

#[derive(Parser)]
#[command(name = "agentbuild")]
#[command(about = "Build, repack and deploy agent installers", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a client template for the target
    Build,
    /// Repack a template into an unconfigured installer
    Repack {
        /// Template to repack [default: ClientBuilder.template_path]
        #[arg(long)]
        package: Option<PathBuf>,
        /// Installer to write [default: ClientBuilder.output_path]
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Assemble a configured installer from a template
    Deploy {
        /// Template to deploy [default: ClientBuilder.template_path]
        #[arg(long)]
        template: Option<PathBuf>,
        /// Installer to write [default: ClientBuilder.output_path]
        #[arg(long)]
        output: Option<PathBuf>,
        /// Plugin files to embed, replacing Client.plugins
        #[arg(short, long, num_args = 1..)]
        plugins: Vec<PathBuf>,
    },
    /// Validate the configuration for the target
    Validate,
    /// Print the resolved configuration for the target as JSON
    ShowConfig,
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let global = &cli.global;
    match cli.command {
        Commands::Build => {
            commands::build::build(global)?;
        }
        Commands::Repack { package, output } => {
            commands::deploy::repack(global, package.as_deref(), output.as_deref())?;
        }
        Commands::Deploy {
            template,
            output,
            plugins,
        } => {
            commands::deploy::deploy(global, template.as_deref(), output.as_deref(), &plugins)?;
        }
        Commands::Validate => {
            commands::config::validate(global)?;
        }
        Commands::ShowConfig => {
            let shown = commands::config::show_config(global)?;
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
