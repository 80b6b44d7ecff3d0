//! crdkit CLI - complete Kubernetes CustomResourceDefinitions from OpenAPI schemas

use clap::{Parser, Subcommand};
use crdkit_core::{DEFAULT_CONFIG_FILE, FieldPath};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod error;
mod exit_codes;

#[derive(Parser)]
#[command(name = "crdkit")]
#[command(author = "crdkit Contributors")]
#[command(version)]
#[command(about = "Complete Kubernetes CustomResourceDefinitions from OpenAPI schemas", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Complete every CRD listed in a config file and render the manifests
    Generate {
        /// Generation config
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Output file (overrides the config; stdout when neither is set)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Omit the empty status block and null creation timestamp
        #[arg(long)]
        strip_generated: bool,

        /// Show per-version details
        #[arg(short, long)]
        verbose: bool,
    },

    /// Check that every version schema of CRD manifests is structural
    Check {
        /// CRD manifest files (multi-document YAML allowed)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Mark fields of a schema document with x-kubernetes-preserve-unknown-fields
    Mark {
        /// Schema document (JSON or YAML)
        schema: PathBuf,

        /// Dot-separated field paths, `[]` descends into array items
        #[arg(required = true)]
        paths: Vec<FieldPath>,
    },
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version land here too
            let code = if err.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    init_logging(cli.debug);

    let result = match cli.command {
        Commands::Generate {
            config,
            output,
            strip_generated,
            verbose,
        } => commands::generate::run(&config, output.as_deref(), strip_generated, verbose),

        Commands::Check { files } => commands::check::run(&files),

        Commands::Mark { schema, paths } => commands::mark::run(&schema, &paths),
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
