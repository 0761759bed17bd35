use anyhow::Result;
use std::path::PathBuf;

use super::{read_json, Command};
use crate::ids::SequentialIds;
use crate::rfw::{NewRfw, Rfw};

pub struct CheckRfwCommand {
    pub file: PathBuf,
}

impl CheckRfwCommand {
    pub fn new(file: PathBuf) -> Self {
        Self { file }
    }
}

impl Command for CheckRfwCommand {
    async fn execute(&self) -> Result<()> {
        let document: NewRfw = read_json(&self.file)?;
        let rfw = Rfw::create(document, &[], &mut SequentialIds::new())?;
        rfw.check_milestone_integrity()?;

        println!("✅ RFW milestones are contiguous");
        println!("   🪜 Milestones: {}", rfw.milestones.len());
        println!("   💰 Bounty: {}", rfw.bounty());
        println!("   ⏱️  Effort: {} - {}", rfw.effort_from(), rfw.effort_to());
        Ok(())
    }
}
