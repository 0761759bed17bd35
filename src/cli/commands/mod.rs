use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

pub mod check_rfw;
pub mod demo;
pub mod show_config;
pub mod validate_proposal;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

/// Read and parse a JSON document given on the command line.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

pub async fn show_usage() -> Result<()> {
    println!("🌟 stars-grants - proposal and RFW lifecycle engine");
    println!();
    println!("Commands:");
    println!("  ⚙️  stars-grants show-config                 # Effective configuration");
    println!("  📝 stars-grants validate-proposal <file>    # Publish validation");
    println!("  🧮 stars-grants check-rfw <file>            # Milestone integrity and totals");
    println!("  🎬 stars-grants demo                        # In-memory walkthrough");
    Ok(())
}
