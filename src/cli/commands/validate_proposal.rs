use anyhow::Result;
use std::path::PathBuf;

use super::{read_json, Command};
use crate::ids::SequentialIds;
use crate::proposal::{NewProposal, Proposal};
use crate::user::User;

pub struct ValidateProposalCommand {
    pub file: PathBuf,
    pub check_dates: bool,
}

impl ValidateProposalCommand {
    pub fn new(file: PathBuf) -> Self {
        Self {
            file,
            check_dates: false,
        }
    }

    pub fn with_check_dates(mut self, check_dates: bool) -> Self {
        self.check_dates = check_dates;
        self
    }
}

impl Command for ValidateProposalCommand {
    async fn execute(&self) -> Result<()> {
        let document: NewProposal = read_json(&self.file)?;
        let proposal = Proposal::create(document, User::new(0, "validator", ""), &mut SequentialIds::new())?;

        proposal.validate_publishable()?;
        if self.check_dates {
            proposal.validate_milestone_dates()?;
        }

        println!("✅ Proposal is publishable");
        println!("   🎯 Target: {}", proposal.target);
        println!("   🪜 Milestones: {}", proposal.milestones.len());
        Ok(())
    }
}
