use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "stars-grants")]
#[command(about = "Grant proposal and request-for-work payout lifecycle engine")]
#[command(long_about = "stars-grants runs the proposal, milestone and RFW lifecycles: \
                       approval gates, payout stages, worker and claim review, and the \
                       history and notifications each transition produces.")]
pub struct Cli {
    /// Configuration file, layered over defaults and under STARS_GRANTS_* variables
    #[arg(long, global = true, default_value = "stars-grants.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the effective configuration as TOML
    ShowConfig,
    /// Run publish validation on a proposal JSON file
    ValidateProposal {
        /// Proposal document (title, brief, content, category, target, milestones)
        file: PathBuf,
        /// Also require milestone estimates on or after the first of this month
        #[arg(long, help = "Check milestone date estimates as submission does")]
        check_dates: bool,
    },
    /// Check milestone index integrity of an RFW JSON file and print its totals
    CheckRfw {
        /// RFW document (title, milestones with index, effort and bounty)
        file: PathBuf,
    },
    /// Walk a proposal and an RFW through their happy paths in memory
    Demo,
}
