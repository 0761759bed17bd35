use serde::{Deserialize, Serialize};

use crate::errors::{GrantError, Result};
use crate::ids::{EntityKind, Id, IdGenerator};

/// Shared label. RFWs link to tags by id and never own them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Id,
    pub text: String,
    #[serde(default)]
    pub description: String,
    pub color: String,
}

impl Tag {
    pub fn create(
        text: impl Into<String>,
        description: impl Into<String>,
        color: impl Into<String>,
        ids: &mut dyn IdGenerator,
    ) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(GrantError::validation("Tag text cannot be empty"));
        }
        Ok(Self {
            id: ids.next_id(EntityKind::Tag),
            text,
            description: description.into(),
            color: color.into(),
        })
    }
}

pub fn tag_exists(tags: &[Tag], id: Id) -> bool {
    tags.iter().any(|t| t.id == id)
}
