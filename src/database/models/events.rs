use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::account::{DbId, SchoolId};

/// Per-grade participation in a school event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attendance {
    No,
    NotApplicable,
    Yes,
}

impl Attendance {
    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            -1 => Some(Attendance::No),
            0 => Some(Attendance::NotApplicable),
            1 => Some(Attendance::Yes),
            _ => None,
        }
    }

    pub fn code(self) -> i8 {
        match self {
            Attendance::No => -1,
            Attendance::NotApplicable => 0,
            Attendance::Yes => 1,
        }
    }

    pub fn attends(self) -> bool {
        self == Attendance::Yes
    }
}

/// One school calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Events {
    #[serde(default)]
    pub id: DbId,
    pub school_id: SchoolId,
    pub month: i16,
    #[serde(default)]
    pub events: Vec<EventEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEntry {
    pub date: NaiveDate,
    #[serde(default)]
    pub date_kind: String,
    pub event_name: String,
    #[serde(default)]
    pub event_contents: String,
    #[serde(default)]
    pub first_grade: i8,
    #[serde(default)]
    pub second_grade: i8,
    #[serde(default)]
    pub third_grade: i8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<NaiveDate>,
}

impl EventEntry {
    /// Attendance for grade 1..=3; `None` for other grades or invalid codes
    pub fn attendance(&self, grade: u8) -> Option<Attendance> {
        let code = match grade {
            1 => self.first_grade,
            2 => self.second_grade,
            3 => self.third_grade,
            _ => return None,
        };
        Attendance::from_code(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attendance_codes_are_tri_state() {
        assert_eq!(Attendance::from_code(1), Some(Attendance::Yes));
        assert_eq!(Attendance::from_code(0), Some(Attendance::NotApplicable));
        assert_eq!(Attendance::from_code(-1), Some(Attendance::No));
        assert_eq!(Attendance::from_code(2), None);
        assert!(Attendance::Yes.attends());
        assert!(!Attendance::NotApplicable.attends());
    }

    #[test]
    fn entry_attendance_by_grade() {
        let entry: EventEntry = serde_json::from_str(
            r#"{"date":"2024-03-04","event_name":"opening ceremony","first_grade":1,"second_grade":-1}"#,
        )
        .unwrap();
        assert_eq!(entry.attendance(1), Some(Attendance::Yes));
        assert_eq!(entry.attendance(2), Some(Attendance::No));
        assert_eq!(entry.attendance(3), Some(Attendance::NotApplicable));
        assert_eq!(entry.attendance(4), None);
    }
}
