//! Field-level checks for every entity.
//!
//! Each function is pure and reports the first offending field. Handlers call
//! these after binding a request body and before touching the database.

use chrono::Datelike;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::OnceLock;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{
    Account, Allergy, Attendance, CafeteriaMenu, ChecklistInput, DbId, Events, NewTimetableEntry,
    PermissionInfo, PermissionLevel, School, StudentInfo, TeacherInfo, Timetable,
};

/// bcrypt ignores input past this many bytes
pub const MAX_PASSWORD_BYTES: usize = 72;
pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type FieldResult = Result<(), FieldError>;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"))
}

fn required(field: &str, value: &str) -> FieldResult {
    if value.trim().is_empty() {
        return Err(FieldError::new(field, "is required"));
    }
    Ok(())
}

fn positive(field: &str, value: i16) -> FieldResult {
    if value <= 0 {
        return Err(FieldError::new(field, "must be greater than 0"));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> FieldResult {
    required("name", name)?;
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(FieldError::new("name", format!("must be at most {} characters", MAX_NAME_CHARS)));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> FieldResult {
    required("email", email)?;
    if !email_pattern().is_match(email) {
        return Err(FieldError::new("email", "is not a valid email address"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> FieldResult {
    if password.is_empty() {
        return Err(FieldError::new("password", "is required"));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(FieldError::new(
            "password",
            format!("must be at most {} bytes", MAX_PASSWORD_BYTES),
        ));
    }
    Ok(())
}

/// Flat, level-dependent fields as they arrive in registration and profile bodies
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PermissionParts {
    #[serde(default)]
    pub school_id: Option<String>,
    #[serde(default)]
    pub grade: Option<i16>,
    #[serde(default)]
    pub class: Option<i16>,
    #[serde(default)]
    pub number: Option<i16>,
}

/// Build the variant named by `level` from flat request fields.
///
/// Fields belonging to another level are rejected rather than dropped.
pub fn permission_from_parts(level: &str, parts: &PermissionParts) -> Result<PermissionInfo, FieldError> {
    let level: PermissionLevel = level
        .parse()
        .map_err(|reason: String| FieldError::new("level", reason))?;

    let stray = |field: &str, present: bool| -> FieldResult {
        if present {
            return Err(FieldError::new(field, format!("is not allowed for {} accounts", level)));
        }
        Ok(())
    };

    let info = match level {
        PermissionLevel::Student => PermissionInfo::Student(StudentInfo {
            school_id: parts
                .school_id
                .clone()
                .ok_or_else(|| FieldError::new("school_id", "is required"))?,
            timetable: Timetable::default(),
            grade: parts.grade.ok_or_else(|| FieldError::new("grade", "is required"))?,
            class: parts.class.ok_or_else(|| FieldError::new("class", "is required"))?,
            number: parts.number.ok_or_else(|| FieldError::new("number", "is required"))?,
            checklist_id: None,
            friends: Vec::new(),
        }),
        PermissionLevel::Teacher => {
            stray("grade", parts.grade.is_some())?;
            stray("class", parts.class.is_some())?;
            stray("number", parts.number.is_some())?;
            PermissionInfo::Teacher(TeacherInfo {
                school_id: parts
                    .school_id
                    .clone()
                    .ok_or_else(|| FieldError::new("school_id", "is required"))?,
            })
        }
        PermissionLevel::Admin => {
            stray("school_id", parts.school_id.is_some())?;
            stray("grade", parts.grade.is_some())?;
            stray("class", parts.class.is_some())?;
            stray("number", parts.number.is_some())?;
            PermissionInfo::Admin
        }
        PermissionLevel::Unknown => {
            return Err(FieldError::new("level", "must be student, teacher or admin"));
        }
    };

    validate_permission(&info, None)?;
    Ok(info)
}

/// Level-specific rules. `owner` enables the self-friendship check.
pub fn validate_permission(info: &PermissionInfo, owner: Option<Uuid>) -> FieldResult {
    match info {
        PermissionInfo::Student(student) => {
            required("school_id", &student.school_id)?;
            positive("grade", student.grade)?;
            positive("class", student.class)?;
            positive("number", student.number)?;
            validate_timetable_entries(&student.timetable.entries)?;

            let mut seen = HashSet::new();
            for friend in &student.friends {
                if friend.is_nil() || Some(*friend) == owner {
                    return Err(FieldError::new("friends", format!("invalid friend id {}", friend)));
                }
                if !seen.insert(friend) {
                    return Err(FieldError::new("friends", format!("duplicate friend id {}", friend)));
                }
            }
            Ok(())
        }
        PermissionInfo::Teacher(teacher) => required("school_id", &teacher.school_id),
        PermissionInfo::Admin => Ok(()),
        PermissionInfo::Unknown => Err(FieldError::new("level", "must be student, teacher or admin")),
    }
}

/// Registration input, before the password is hashed
pub fn validate_new_account(name: &str, email: &str, password: &str, permission: &PermissionInfo) -> FieldResult {
    validate_name(name)?;
    validate_email(email)?;
    validate_password(password)?;
    validate_permission(permission, None)
}

/// Checks a fully-formed account before it is written
pub fn validate_account(account: &Account) -> FieldResult {
    if account.user_id.is_nil() {
        return Err(FieldError::new("user_id", "is required"));
    }
    validate_name(&account.name)?;
    validate_email(&account.email)?;
    if account.password_hash.is_empty() {
        return Err(FieldError::new("password", "is required"));
    }
    validate_permission(&account.permission, Some(account.user_id))
}

pub fn validate_timetable_entry(entry: &NewTimetableEntry) -> FieldResult {
    required("location", &entry.location)?;
    required("day", &entry.day)?;
    required("period", &entry.period)?;
    required("subject", &entry.subject)
}

pub fn validate_timetable_entries(entries: &[DbId]) -> FieldResult {
    let mut seen = HashSet::new();
    for id in entries {
        if *id <= 0 {
            return Err(FieldError::new("entries", format!("invalid entry id {}", id)));
        }
        if !seen.insert(id) {
            return Err(FieldError::new("entries", format!("duplicate entry id {}", id)));
        }
    }
    Ok(())
}

/// `friends` is the owning student's friend list
pub fn validate_checklist(checklist: &ChecklistInput, friends: &[Uuid]) -> FieldResult {
    if let Some(title) = &checklist.title {
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(FieldError::new("title", format!("must be at most {} characters", MAX_TITLE_CHARS)));
        }
    }
    for (i, item) in checklist.items.iter().enumerate() {
        required(&format!("items[{}].text", i), &item.text)?;
        if let Some(outsider) = item.shared_with.iter().find(|id| !friends.contains(id)) {
            return Err(FieldError::new(
                format!("items[{}].shared_with", i),
                format!("{} is not a friend", outsider),
            ));
        }
    }
    Ok(())
}

pub fn validate_allergy(field: &str, code: i16) -> FieldResult {
    if Allergy::from_code(code).is_none() {
        return Err(FieldError::new(field, format!("unknown allergy code {}", code)));
    }
    Ok(())
}

pub fn validate_menu(menu: &CafeteriaMenu) -> FieldResult {
    required("school_id", &menu.school_id)?;
    required("meal_name", &menu.meal_name)?;
    if menu.items.is_empty() {
        return Err(FieldError::new("items", "must contain at least one item"));
    }
    for (i, item) in menu.items.iter().enumerate() {
        required(&format!("items[{}].name", i), &item.name)?;
        for code in &item.allergies {
            validate_allergy(&format!("items[{}].allergy", i), *code)?;
        }
    }
    Ok(())
}

pub fn validate_month(month: i16) -> FieldResult {
    if !(1..=12).contains(&month) {
        return Err(FieldError::new("month", "must be between 1 and 12"));
    }
    Ok(())
}

pub fn validate_attendance(field: &str, code: i8) -> FieldResult {
    if Attendance::from_code(code).is_none() {
        return Err(FieldError::new(field, "must be -1, 0 or 1"));
    }
    Ok(())
}

pub fn validate_events(events: &Events) -> FieldResult {
    required("school_id", &events.school_id)?;
    validate_month(events.month)?;
    for (i, entry) in events.events.iter().enumerate() {
        if entry.date.month() as i16 != events.month {
            return Err(FieldError::new(
                format!("events[{}].date", i),
                format!("{} is outside month {}", entry.date, events.month),
            ));
        }
        required(&format!("events[{}].event_name", i), &entry.event_name)?;
        validate_attendance(&format!("events[{}].first_grade", i), entry.first_grade)?;
        validate_attendance(&format!("events[{}].second_grade", i), entry.second_grade)?;
        validate_attendance(&format!("events[{}].third_grade", i), entry.third_grade)?;
    }
    Ok(())
}

pub fn validate_school(school: &School) -> FieldResult {
    required("school_id", &school.school_id)?;
    if !School::is_valid_id(&school.school_id) {
        return Err(FieldError::new(
            "school_id",
            "may only contain letters, digits, '-' and '_'",
        ));
    }
    required("region_id", &school.region_id)?;
    required("school_name", &school.school_name)?;
    required("region_name", &school.region_name)?;
    if school.organization_email_only {
        match school.email_domain.as_deref() {
            Some(domain) if !domain.trim().is_empty() => {}
            _ => return Err(FieldError::new("email_domain", "is required for organization-only schools")),
        }
    }
    Ok(())
}
