//! Closed status/stage registries for every lifecycle entity.
//!
//! Values serialize as SCREAMING_SNAKE_CASE strings. Parsing an unknown value
//! fails with a validation error naming the enum, so no string outside the
//! registry can ever be written to a status field.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::GrantError;

macro_rules! status_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Membership check for raw input
            pub fn includes(value: &str) -> bool {
                Self::ALL.iter().any(|v| v.as_str() == value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = GrantError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| {
                        GrantError::validation(format!(
                            "{} is not a valid {}",
                            s,
                            stringify!($name)
                        ))
                    })
            }
        }
    };
}

status_enum!(
    /// Top-level proposal lifecycle position
    ProposalStatus {
        Draft => "DRAFT",
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
        Live => "LIVE",
        Deleted => "DELETED",
    }
);

status_enum!(
    /// Secondary progress dimension of a proposal
    ProposalStage {
        Preview => "PREVIEW",
        FundingRequired => "FUNDING_REQUIRED",
        Wip => "WIP",
        Completed => "COMPLETED",
        Failed => "FAILED",
        Canceled => "CANCELED",
    }
);

status_enum!(
    ProposalSort {
        Newest => "NEWEST",
        Oldest => "OLDEST",
    }
);

status_enum!(
    Category {
        DevTool => "DEV_TOOL",
        CoreDev => "CORE_DEV",
        AppDevArvo => "APP_DEV_ARVO",
        AppDevAzimuth => "APP_DEV_AZIMUTH",
        AppDevOther => "APP_DEV_OTHER",
        Community => "COMMUNITY",
        Documentation => "DOCUMENTATION",
        Security => "SECURITY",
        Design => "DESIGN",
    }
);

status_enum!(
    /// Payout sub-lifecycle of a proposal milestone
    MilestoneStage {
        Idle => "IDLE",
        Requested => "REQUESTED",
        Rejected => "REJECTED",
        Accepted => "ACCEPTED",
        Paid => "PAID",
    }
);

status_enum!(
    RfwStatus {
        Draft => "DRAFT",
        Live => "LIVE",
        Closed => "CLOSED",
    }
);

status_enum!(
    RfwWorkerStatus {
        Requested => "REQUESTED",
        Accepted => "ACCEPTED",
        Rejected => "REJECTED",
    }
);

status_enum!(
    RfwMilestoneClaimStage {
        Requested => "REQUESTED",
        Rejected => "REJECTED",
        Accepted => "ACCEPTED",
    }
);

impl Default for ProposalStatus {
    fn default() -> Self {
        ProposalStatus::Draft
    }
}

impl Default for ProposalStage {
    fn default() -> Self {
        ProposalStage::Preview
    }
}

impl Default for MilestoneStage {
    fn default() -> Self {
        MilestoneStage::Idle
    }
}

impl Default for RfwStatus {
    fn default() -> Self {
        RfwStatus::Draft
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Community
    }
}

impl Default for ProposalSort {
    fn default() -> Self {
        ProposalSort::Newest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_includes() {
        assert!(ProposalStatus::includes("DRAFT"));
        assert!(ProposalStatus::includes("DELETED"));
        assert!(!ProposalStatus::includes("draft"));
        assert!(!ProposalStatus::includes("WIP"));
        assert!(ProposalStage::includes("WIP"));
        assert!(MilestoneStage::includes("PAID"));
        assert!(!RfwMilestoneClaimStage::includes("PAID"));
    }

    #[test]
    fn test_parse_roundtrip_for_every_value() {
        for stage in MilestoneStage::ALL {
            assert_eq!(stage.as_str().parse::<MilestoneStage>().unwrap(), *stage);
        }
        for category in Category::ALL {
            assert_eq!(category.to_string().parse::<Category>().unwrap(), *category);
        }
    }

    #[test]
    fn test_parse_unknown_value_names_enum() {
        let err = "LAUNCHED".parse::<RfwStatus>().unwrap_err();
        assert_eq!(err.code(), "VALIDATION");
        assert!(err.to_string().contains("RfwStatus"));
        assert!(err.to_string().contains("LAUNCHED"));
    }

    #[test]
    fn test_serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&ProposalStage::FundingRequired).unwrap();
        assert_eq!(json, "\"FUNDING_REQUIRED\"");
        let parsed: Category = serde_json::from_str("\"APP_DEV_ARVO\"").unwrap();
        assert_eq!(parsed, Category::AppDevArvo);
        assert!(serde_json::from_str::<RfwWorkerStatus>("\"PAID\"").is_err());
    }

    #[test]
    fn test_registry_sizes() {
        assert_eq!(ProposalStatus::ALL.len(), 6);
        assert_eq!(ProposalStage::ALL.len(), 6);
        assert_eq!(MilestoneStage::ALL.len(), 5);
        assert_eq!(RfwStatus::ALL.len(), 3);
        assert_eq!(RfwWorkerStatus::ALL.len(), 3);
        assert_eq!(RfwMilestoneClaimStage::ALL.len(), 3);
        assert_eq!(Category::ALL.len(), 9);
    }
}
