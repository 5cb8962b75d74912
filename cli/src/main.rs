// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # splitstore CLI
//!
//! The `splitstore` binary runs the router and the backend nodes, and acts
//! as a one-shot client against a running router.
//!
//! ## Commands
//!
//! - `splitstore serve router|node <class>|all` - Run servers until Ctrl-C
//! - `splitstore upload|download|remove|archive|list` - Client operations
//! - `splitstore config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{ConfigCommand, ServeCommand};

/// splitstore - namespace-partitioned file store
#[derive(Parser)]
#[command(name = "splitstore")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "SPLITSTORE_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "SPLITSTORE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the router and/or backend nodes
    #[command(name = "serve")]
    Serve {
        #[command(subcommand)]
        command: ServeCommand,
    },

    /// Upload a local file into a directory of the store
    #[command(name = "upload")]
    Upload {
        /// Local file to upload
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Destination directory (e.g. ~/smain/docs)
        #[arg(value_name = "DESTINATION")]
        destination: String,
    },

    /// Download a file from the store
    #[command(name = "download")]
    Download {
        /// Store path (e.g. ~/smain/docs/a.pdf)
        #[arg(value_name = "PATH")]
        path: String,

        /// Output file (default: the file's name in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove a file from the store
    #[command(name = "remove")]
    Remove {
        #[arg(value_name = "PATH")]
        path: String,
    },

    /// Download a tar archive of every file of one extension
    #[command(name = "archive")]
    Archive {
        /// Extension including the dot (e.g. .pdf)
        #[arg(value_name = "EXTENSION")]
        extension: String,

        /// Output file (default: <ext>files.tar)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Unpack the archive into this directory after download
        #[arg(long, value_name = "DIR")]
        extract: Option<PathBuf>,
    },

    /// List the files of every class in a directory
    #[command(name = "list")]
    List {
        #[arg(value_name = "PATH")]
        path: String,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Serve { command } => commands::serve::handle_command(command, cli.config).await,
        Commands::Upload { file, destination } => {
            commands::file::upload(cli.config, file, destination).await
        }
        Commands::Download { path, output } => {
            commands::file::download(cli.config, path, output).await
        }
        Commands::Remove { path } => commands::file::remove(cli.config, path).await,
        Commands::Archive {
            extension,
            output,
            extract,
        } => commands::file::archive(cli.config, extension, output, extract).await,
        Commands::List { path } => commands::file::list(cli.config, path).await,
        Commands::Config { command } => commands::config::handle_command(command, cli.config).await,
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
