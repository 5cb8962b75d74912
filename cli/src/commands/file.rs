// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! One-shot client commands against a running router
//!
//! Commands: upload, download, remove, archive, list

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

use splitstore_core::domain::node_config::StoreConfig;
use splitstore_core::infrastructure::archive::unpack_archive;
use splitstore_core::presentation::StoreClient;

async fn connect(config_override: Option<PathBuf>) -> Result<StoreClient> {
    let config = StoreConfig::load_or_default(config_override).context("Failed to load configuration")?;
    let router = &config.nodes.local;
    StoreClient::connect_with((router.host.as_str(), router.port), &config.transfer)
        .await
        .with_context(|| format!("Failed to connect to router at {}:{}", router.host, router.port))
}

pub async fn upload(config_override: Option<PathBuf>, file: PathBuf, destination: String) -> Result<()> {
    let mut client = connect(config_override).await?;
    let reply = client
        .upload(&file, &destination)
        .await
        .with_context(|| format!("Upload of {} failed", file.display()))?;
    println!("{}", format!("✓ {}", reply).green());
    Ok(())
}

pub async fn download(config_override: Option<PathBuf>, path: String, output: Option<PathBuf>) -> Result<()> {
    let output = match output {
        Some(output) => output,
        None => default_download_name(&path)?,
    };

    let mut client = connect(config_override).await?;
    let bytes = client
        .download(&path, &output)
        .await
        .with_context(|| format!("Download of {} failed", path))?;
    println!(
        "{}",
        format!("✓ Downloaded {} ({} bytes) to {}", path, bytes, output.display()).green()
    );
    Ok(())
}

pub async fn remove(config_override: Option<PathBuf>, path: String) -> Result<()> {
    let mut client = connect(config_override).await?;
    let reply = client
        .remove(&path)
        .await
        .with_context(|| format!("Remove of {} failed", path))?;
    println!("{}", format!("✓ {}", reply).green());
    Ok(())
}

pub async fn archive(
    config_override: Option<PathBuf>,
    extension: String,
    output: Option<PathBuf>,
    extract: Option<PathBuf>,
) -> Result<()> {
    let output = output.unwrap_or_else(|| default_archive_name(&extension));

    let mut client = connect(config_override).await?;
    let bytes = client
        .archive(&extension, &output)
        .await
        .with_context(|| format!("Archive of {} files failed", extension))?;
    println!(
        "{}",
        format!("✓ Archive saved to {} ({} bytes)", output.display(), bytes).green()
    );

    if let Some(dir) = extract {
        unpack_archive(output.clone(), dir.clone())
            .await
            .with_context(|| format!("Failed to unpack {}", output.display()))?;
        println!("{}", format!("✓ Extracted into {}", dir.display()).green());
    }
    Ok(())
}

pub async fn list(config_override: Option<PathBuf>, path: String) -> Result<()> {
    let mut client = connect(config_override).await?;
    let listing = client
        .display(&path)
        .await
        .with_context(|| format!("Listing of {} failed", path))?;

    println!("{}", format!("Files in {}:", path).bold());
    for line in listing.lines() {
        if line.starts_with("Failed to get") || line == "No files found in the directory" {
            println!("  {}", line.yellow());
        } else {
            println!("  {}", line);
        }
    }
    Ok(())
}

fn default_download_name(path: &str) -> Result<PathBuf> {
    Path::new(path)
        .file_name()
        .map(PathBuf::from)
        .with_context(|| format!("Cannot derive a local file name from {}; use --output", path))
}

/// `.pdf` -> `pdffiles.tar`
fn default_archive_name(extension: &str) -> PathBuf {
    PathBuf::from(format!("{}files.tar", extension.trim_start_matches('.')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names() {
        assert_eq!(default_archive_name(".c"), PathBuf::from("cfiles.tar"));
        assert_eq!(default_archive_name(".pdf"), PathBuf::from("pdffiles.tar"));
        assert_eq!(
            default_download_name("~/smain/docs/a.txt").unwrap(),
            PathBuf::from("a.txt")
        );
        assert!(default_download_name("~/smain/..").is_err());
    }
}
