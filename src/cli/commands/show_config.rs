use anyhow::Result;

use super::Command;
use crate::config::GrantsConfig;

pub struct ShowConfigCommand {
    config: GrantsConfig,
}

impl ShowConfigCommand {
    pub fn new(config: GrantsConfig) -> Self {
        Self { config }
    }
}

impl Command for ShowConfigCommand {
    async fn execute(&self) -> Result<()> {
        print!("{}", self.config.to_toml()?);
        Ok(())
    }
}
