// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Server commands
//!
//! Commands: router, node, all

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::info;

use splitstore_core::domain::extension::ExtensionClass;
use splitstore_core::domain::node::StorageTopology;
use splitstore_core::domain::node_config::StoreConfig;
use splitstore_core::presentation::{bind_node, bind_router};

#[derive(Subcommand)]
pub enum ServeCommand {
    /// Run the router (client-facing node)
    Router,

    /// Run one backend node
    Node {
        /// Node to run: its name (spdf), class (backend-a) or extension (pdf)
        #[arg(value_name = "NODE")]
        node: String,
    },

    /// Run the router and both backend nodes in this process
    All,
}

pub async fn handle_command(command: ServeCommand, config_override: Option<PathBuf>) -> Result<()> {
    let config = StoreConfig::load_or_default(config_override).context("Failed to load configuration")?;
    let topology = Arc::new(config.topology().context("Invalid configuration")?);

    let classes = match command {
        ServeCommand::Router => vec![ExtensionClass::Local],
        ServeCommand::Node { node } => vec![resolve_node(&topology, &node)?],
        ServeCommand::All => vec![
            ExtensionClass::BackendA,
            ExtensionClass::BackendB,
            ExtensionClass::Local,
        ],
    };

    let mut tokens: Vec<CancellationToken> = Vec::new();
    let mut servers = JoinSet::new();

    for class in classes {
        let node = topology.owner(class);
        if class == ExtensionClass::Local {
            let server = bind_router(topology.clone(), &config.transfer).await?;
            tokens.push(server.shutdown_token());
            servers.spawn(server.run());
        } else {
            let server = bind_node(topology.clone(), class, &config.transfer).await?;
            tokens.push(server.shutdown_token());
            servers.spawn(server.run());
        }
        println!(
            "{} {} ({} files) on {}, root {}",
            "✓ Serving".green(),
            node.name.bold(),
            node.extension,
            node.endpoint,
            node.root.display()
        );
    }

    shutdown_signal().await;
    info!("Shutdown signal received");
    for token in &tokens {
        token.cancel();
    }

    while let Some(result) = servers.join_next().await {
        result
            .context("Server task panicked")?
            .context("Server failed")?;
    }

    info!("All servers stopped");
    Ok(())
}

fn resolve_node(topology: &StorageTopology, selector: &str) -> Result<ExtensionClass> {
    let by_class = match selector {
        "backend-a" => Some(ExtensionClass::BackendA),
        "backend-b" => Some(ExtensionClass::BackendB),
        _ => None,
    };
    let suffix = if selector.starts_with('.') {
        selector.to_string()
    } else {
        format!(".{}", selector)
    };

    let class = by_class
        .or_else(|| topology.node_by_name(selector).map(|node| node.class))
        .or_else(|| topology.extensions().class_of_suffix(&suffix))
        .with_context(|| format!("Unknown node '{}'", selector))?;

    if !class.is_remote() {
        anyhow::bail!("'{}' is the router; use `splitstore serve router`", selector);
    }
    Ok(class)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
