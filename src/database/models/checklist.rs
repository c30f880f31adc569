use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::account::DbId;

pub const DEFAULT_CHECKLIST_TITLE: &str = "checklist";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    pub id: DbId,
    pub student_id: Uuid,
    pub title: String,
    pub items: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ChecklistItem {
    pub text: String,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub is_public: bool,
    /// Must only name the owner's friends
    #[serde(default)]
    pub shared_with: Vec<Uuid>,
}

impl ChecklistItem {
    pub fn visible_to(&self, viewer: Uuid) -> bool {
        self.is_public || self.shared_with.contains(&viewer)
    }
}

/// Body of checklist create / replace requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
}

impl ChecklistInput {
    pub fn title_or_default(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => DEFAULT_CHECKLIST_TITLE.to_string(),
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ChecklistRow {
    pub id: DbId,
    pub student_id: Uuid,
    pub title: String,
}

impl ChecklistRow {
    pub fn with_items(self, items: Vec<ChecklistItem>) -> Checklist {
        Checklist {
            id: self.id,
            student_id: self.student_id,
            title: self.title,
            items,
        }
    }
}
