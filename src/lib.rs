// stars-grants - grant proposal and request-for-work lifecycle engine
// This exposes the domain aggregates, services and collaborator seams

pub mod cli;
pub mod config;
pub mod effects;
pub mod errors;
pub mod history;
pub mod ids;
pub mod listing;
pub mod milestone;
pub mod notifications;
pub mod observability;
pub mod proposal;
pub mod rfw;
pub mod services;
pub mod status;
pub mod store;
pub mod tag;
pub mod telemetry;
pub mod user;
pub mod views;

// Re-export key types for easy access
pub use config::{config, init_config, GrantsConfig};
pub use effects::TransitionEffects;
pub use errors::{GrantError, Result};
pub use history::{HistoryDraft, HistoryEvent, HistoryEventView};
pub use ids::{EntityKind, Id, IdGenerator, RandomIds, SequentialIds};
pub use listing::{Page, ProposalQuery};
pub use milestone::{FinalMilestoneRule, Milestone, MilestoneDraft};
pub use notifications::{
    Delivery, Notification, NotificationDispatcher, NotificationEvent, Notifier, Recipient, UserDirectory,
};
pub use observability::{lifecycle_metrics, OperationTimer};
pub use proposal::{NewProposal, Proposal, ProposalEdit};
pub use rfw::{NewRfw, Rfw, RfwEdit, RfwMilestoneInput};
pub use services::{HistoryService, Lifecycle, ProposalService, RfwService};
pub use status::{
    Category, MilestoneStage, ProposalSort, ProposalStage, ProposalStatus, RfwMilestoneClaimStage, RfwStatus,
    RfwWorkerStatus,
};
pub use store::{GrantStore, InMemoryStore, UnitOfWork};
pub use tag::Tag;
pub use telemetry::{create_transition_span, generate_correlation_id, init_telemetry};
pub use user::User;
pub use views::{worker_portfolio, ProposalView, RfwView};
