//! Development branches: thematic groupings of quests for display.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::{BranchId, QuestId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevelopmentBranch {
    pub id: BranchId,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub parent_branch_id: Option<BranchId>,
    pub level: u32,
    pub icon: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchDraft {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub parent_branch_id: Option<BranchId>,
    pub level: u32,
    pub icon: Option<String>,
    pub color: Option<String>,
}

impl BranchDraft {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: String::new(),
            parent_branch_id: None,
            level: 1,
            icon: None,
            color: None,
        }
    }

    pub fn with_parent(mut self, parent: BranchId, level: u32) -> Self {
        self.parent_branch_id = Some(parent);
        self.level = level;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_style(mut self, icon: impl Into<String>, color: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self.color = Some(color.into());
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("Branch name cannot be empty"));
        }
        if self.level < 1 {
            return Err(DomainError::validation("Branch level starts at 1"));
        }
        if self.parent_branch_id.is_some() && self.level == 1 {
            return Err(DomainError::validation(
                "Only top-level branches may sit at level 1",
            ));
        }
        Ok(())
    }

    pub fn into_branch(self, id: BranchId) -> DevelopmentBranch {
        DevelopmentBranch {
            id,
            name: self.name,
            display_name: self.display_name,
            description: self.description,
            parent_branch_id: self.parent_branch_id,
            level: self.level,
            icon: self.icon,
            color: self.color,
        }
    }
}

/// Weighted membership of a quest in a branch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuestBranch {
    pub quest_id: QuestId,
    pub branch_id: BranchId,
    pub weight: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_branch_is_valid() {
        assert!(BranchDraft::new("health", "Health").validate().is_ok());
    }

    #[test]
    fn child_branch_must_be_deeper() {
        let mut draft = BranchDraft::new("running", "Running").with_parent(BranchId::new(1), 2);
        assert!(draft.validate().is_ok());
        draft.level = 1;
        assert!(draft.validate().is_err());
    }
}
