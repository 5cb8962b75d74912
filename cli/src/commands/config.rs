// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use splitstore_core::domain::extension::ExtensionClass;
use splitstore_core::domain::node_config::StoreConfig;

const CONFIG_TEMPLATE: &str = include_str!("../../templates/config.yaml");

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective configuration as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./splitstore.yaml)
        #[arg(short, long, default_value = "./splitstore.yaml")]
        output: PathBuf,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config_override, paths, yaml).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output } => generate(output).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    let config = StoreConfig::load_or_default(config_override.clone()).context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. SPLITSTORE_CONFIG_PATH: {}",
            std::env::var("SPLITSTORE_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./splitstore.yaml");
        println!("  4. ~/.splitstore/config.yaml");
        println!("  5. /etc/splitstore/config.yaml");
        println!();
    }

    if as_yaml {
        print!("{}", serde_yaml::to_string(&config).context("Failed to render configuration")?);
        return Ok(());
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Storage:".bold());
    match config.home_dir() {
        Ok(home) => println!("  Home: {}", home.display()),
        Err(e) => println!("  Home: {}", e.to_string().red()),
    }
    println!("  Home marker: {}", config.home_marker);
    println!();

    println!("{}", "Transfer:".bold());
    println!("  Buffer size: {} bytes", config.transfer.buffer_size);
    println!("  Connect timeout: {:?}", config.transfer.connect_timeout);
    println!("  I/O timeout: {:?}", config.transfer.io_timeout);
    println!();

    println!("{}", "Nodes:".bold());
    for class in ExtensionClass::ALL {
        let spec = config.nodes.spec(class);
        println!(
            "  {} ({}) → {} files on {}:{}",
            spec.name.bold(),
            class,
            spec.extension,
            spec.host,
            spec.port
        );
    }
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = StoreConfig::load_or_default(config_path).context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf) -> Result<()> {
    std::fs::write(&output, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
