use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::account::DbId;

/// Shared lesson definition owned by the teacher who created it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TimetableEntry {
    pub id: DbId,
    pub teacher_id: Uuid,
    pub location: String,
    pub day: String,
    pub period: String,
    pub subject: String,
}

/// Client-supplied lesson fields; id and teacher come from the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTimetableEntry {
    pub location: String,
    pub day: String,
    pub period: String,
    pub subject: String,
}

impl NewTimetableEntry {
    pub fn into_entry(self, id: DbId, teacher_id: Uuid) -> TimetableEntry {
        TimetableEntry {
            id,
            teacher_id,
            location: self.location,
            day: self.day,
            period: self.period,
            subject: self.subject,
        }
    }
}

/// A student's timetable with its entry ids resolved
#[derive(Debug, Clone, Serialize)]
pub struct TimetableView {
    pub owner: Uuid,
    pub is_public: bool,
    pub entries: Vec<TimetableEntry>,
}
