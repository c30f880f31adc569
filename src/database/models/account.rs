use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Database row id shared by every table
pub type DbId = i64;

/// Opaque school registry identifier, e.g. "S1"
pub type SchoolId = String;

/// Discriminator selecting which variant payload an account carries.
///
/// The numeric codes are what the `accounts.permission_level` column stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Unknown,
    Student,
    Teacher,
    Admin,
}

impl PermissionLevel {
    pub fn code(self) -> i16 {
        match self {
            PermissionLevel::Unknown => 0,
            PermissionLevel::Student => 1,
            PermissionLevel::Teacher => 2,
            PermissionLevel::Admin => 3,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(PermissionLevel::Unknown),
            1 => Some(PermissionLevel::Student),
            2 => Some(PermissionLevel::Teacher),
            3 => Some(PermissionLevel::Admin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionLevel::Unknown => "unknown",
            PermissionLevel::Student => "student",
            PermissionLevel::Teacher => "teacher",
            PermissionLevel::Admin => "admin",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unknown" => Ok(PermissionLevel::Unknown),
            "student" => Ok(PermissionLevel::Student),
            "teacher" => Ok(PermissionLevel::Teacher),
            "admin" => Ok(PermissionLevel::Admin),
            other => Err(format!("unknown permission level '{}'", other)),
        }
    }
}

/// A student's ordered list of timetable entry references
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timetable {
    #[serde(default)]
    pub entries: Vec<DbId>,
    /// Only lock / unlock change this
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentInfo {
    pub school_id: SchoolId,
    #[serde(default)]
    pub timetable: Timetable,
    pub grade: i16,
    pub class: i16,
    pub number: i16,
    #[serde(default)]
    pub checklist_id: Option<DbId>,
    #[serde(default)]
    pub friends: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherInfo {
    pub school_id: SchoolId,
}

/// Level-specific account payload. The tag and the payload can never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "lowercase")]
pub enum PermissionInfo {
    Unknown,
    Student(StudentInfo),
    Teacher(TeacherInfo),
    Admin,
}

impl PermissionInfo {
    pub fn level(&self) -> PermissionLevel {
        match self {
            PermissionInfo::Unknown => PermissionLevel::Unknown,
            PermissionInfo::Student(_) => PermissionLevel::Student,
            PermissionInfo::Teacher(_) => PermissionLevel::Teacher,
            PermissionInfo::Admin => PermissionLevel::Admin,
        }
    }

    pub fn as_student(&self) -> Option<&StudentInfo> {
        match self {
            PermissionInfo::Student(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_student_mut(&mut self) -> Option<&mut StudentInfo> {
        match self {
            PermissionInfo::Student(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_teacher(&self) -> Option<&TeacherInfo> {
        match self {
            PermissionInfo::Teacher(info) => Some(info),
            _ => None,
        }
    }

    /// School the account belongs to, if its level has one
    pub fn school_id(&self) -> Option<&str> {
        match self {
            PermissionInfo::Student(info) => Some(&info.school_id),
            PermissionInfo::Teacher(info) => Some(&info.school_id),
            PermissionInfo::Admin | PermissionInfo::Unknown => None,
        }
    }
}

/// Identity record. `password_hash` never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: DbId,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: Vec<u8>,
    pub permission: PermissionInfo,
}

impl Account {
    pub fn level(&self) -> PermissionLevel {
        self.permission.level()
    }

    /// What another account may see: a student's friends and checklist
    /// reference are dropped, and timetable entries too while it is locked.
    pub fn seen_by(mut self, viewer: Uuid) -> Account {
        if self.user_id == viewer {
            return self;
        }
        if let Some(student) = self.permission.as_student_mut() {
            student.friends.clear();
            student.checklist_id = None;
            if !student.timetable.is_public {
                student.timetable.entries.clear();
            }
        }
        self
    }
}

/// Errors raised when a stored row cannot be turned back into an [`Account`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlattenError {
    #[error("unknown permission level code {0}")]
    UnknownLevel(i16),

    #[error("{level} account is missing column '{column}'")]
    MissingColumn {
        level: PermissionLevel,
        column: &'static str,
    },

    #[error("{level} account has unexpected value in column '{column}'")]
    UnexpectedColumn {
        level: PermissionLevel,
        column: &'static str,
    },
}

/// One `accounts` row. Variant fields are nullable columns; which ones are
/// populated is decided by `permission_level`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct FlatAccount {
    pub id: DbId,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub password: Vec<u8>,
    pub permission_level: i16,
    pub school_id: Option<String>,
    pub timetable_entries: Option<Vec<i64>>,
    pub timetable_is_public: Option<bool>,
    pub grade: Option<i16>,
    pub class: Option<i16>,
    pub number: Option<i16>,
    pub checklist_id: Option<i64>,
    pub friends: Option<Vec<Uuid>>,
}

impl FlatAccount {
    /// Column list in the order the repository selects them
    pub const COLUMNS: &'static str = "id, user_id, name, email, password, permission_level, \
        school_id, timetable_entries, timetable_is_public, grade, class, number, \
        checklist_id, friends";

    pub fn flatten(account: &Account) -> Self {
        let mut row = FlatAccount {
            id: account.id,
            user_id: account.user_id,
            name: account.name.clone(),
            email: account.email.clone(),
            password: account.password_hash.clone(),
            permission_level: account.level().code(),
            school_id: None,
            timetable_entries: None,
            timetable_is_public: None,
            grade: None,
            class: None,
            number: None,
            checklist_id: None,
            friends: None,
        };

        match &account.permission {
            PermissionInfo::Student(info) => {
                row.school_id = Some(info.school_id.clone());
                row.timetable_entries = Some(info.timetable.entries.clone());
                row.timetable_is_public = Some(info.timetable.is_public);
                row.grade = Some(info.grade);
                row.class = Some(info.class);
                row.number = Some(info.number);
                row.checklist_id = info.checklist_id;
                row.friends = Some(info.friends.clone());
            }
            PermissionInfo::Teacher(info) => {
                row.school_id = Some(info.school_id.clone());
            }
            PermissionInfo::Admin | PermissionInfo::Unknown => {}
        }

        row
    }

    pub fn restore(self) -> Result<Account, FlattenError> {
        let level = PermissionLevel::from_code(self.permission_level)
            .ok_or(FlattenError::UnknownLevel(self.permission_level))?;

        let permission = match level {
            PermissionLevel::Student => PermissionInfo::Student(StudentInfo {
                school_id: required(level, "school_id", self.school_id)?,
                timetable: Timetable {
                    entries: required(level, "timetable_entries", self.timetable_entries)?,
                    is_public: required(level, "timetable_is_public", self.timetable_is_public)?,
                },
                grade: required(level, "grade", self.grade)?,
                class: required(level, "class", self.class)?,
                number: required(level, "number", self.number)?,
                checklist_id: self.checklist_id,
                friends: required(level, "friends", self.friends)?,
            }),
            PermissionLevel::Teacher => {
                self.reject_student_columns(level)?;
                PermissionInfo::Teacher(TeacherInfo {
                    school_id: required(level, "school_id", self.school_id)?,
                })
            }
            PermissionLevel::Admin | PermissionLevel::Unknown => {
                self.reject_student_columns(level)?;
                absent(level, "school_id", &self.school_id)?;
                if level == PermissionLevel::Admin {
                    PermissionInfo::Admin
                } else {
                    PermissionInfo::Unknown
                }
            }
        };

        Ok(Account {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            email: self.email,
            password_hash: self.password,
            permission,
        })
    }

    fn reject_student_columns(&self, level: PermissionLevel) -> Result<(), FlattenError> {
        absent(level, "timetable_entries", &self.timetable_entries)?;
        absent(level, "timetable_is_public", &self.timetable_is_public)?;
        absent(level, "grade", &self.grade)?;
        absent(level, "class", &self.class)?;
        absent(level, "number", &self.number)?;
        absent(level, "checklist_id", &self.checklist_id)?;
        absent(level, "friends", &self.friends)
    }
}

fn required<T>(level: PermissionLevel, column: &'static str, value: Option<T>) -> Result<T, FlattenError> {
    value.ok_or(FlattenError::MissingColumn { level, column })
}

fn absent<T>(level: PermissionLevel, column: &'static str, value: &Option<T>) -> Result<(), FlattenError> {
    match value {
        Some(_) => Err(FlattenError::UnexpectedColumn { level, column }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(permission: PermissionInfo) -> Account {
        Account {
            id: 7,
            user_id: Uuid::new_v4(),
            name: "Kim".to_string(),
            email: "kim@ex.com".to_string(),
            password_hash: b"$2b$04$hash".to_vec(),
            permission,
        }
    }

    fn student(entries: Vec<DbId>, friends: Vec<Uuid>, checklist_id: Option<DbId>) -> Account {
        base(PermissionInfo::Student(StudentInfo {
            school_id: "S1".to_string(),
            timetable: Timetable { entries, is_public: true },
            grade: 2,
            class: 3,
            number: 15,
            checklist_id,
            friends,
        }))
    }

    #[test]
    fn others_see_no_friends_and_no_locked_timetable() {
        let friend = Uuid::new_v4();
        let mut account = student(vec![3, 1], vec![friend], Some(9));
        let owner = account.user_id;

        assert_eq!(account.clone().seen_by(owner), account);

        let public = account.clone().seen_by(friend);
        let info = public.permission.as_student().unwrap();
        assert_eq!(info.timetable.entries, vec![3, 1]);
        assert!(info.friends.is_empty());
        assert_eq!(info.checklist_id, None);

        account.permission.as_student_mut().unwrap().timetable.is_public = false;
        let locked = account.seen_by(friend);
        let info = locked.permission.as_student().unwrap();
        assert!(info.timetable.entries.is_empty());
        assert!(!info.timetable.is_public);
    }

    #[test]
    fn round_trips_every_level() {
        let accounts = vec![
            student(vec![3, 1, 2], vec![Uuid::new_v4(), Uuid::new_v4()], Some(9)),
            student(vec![], vec![], None),
            base(PermissionInfo::Teacher(TeacherInfo { school_id: "S1".to_string() })),
            base(PermissionInfo::Admin),
            base(PermissionInfo::Unknown),
        ];

        for account in accounts {
            let row = FlatAccount::flatten(&account);
            assert_eq!(row.permission_level, account.level().code());
            let restored = row.clone().restore().unwrap();
            assert_eq!(restored, account);
            assert_eq!(FlatAccount::flatten(&restored), row);
        }
    }

    #[test]
    fn empty_lists_stay_distinct_from_missing_columns() {
        let row = FlatAccount::flatten(&student(vec![], vec![], None));
        assert_eq!(row.timetable_entries, Some(vec![]));
        assert_eq!(row.friends, Some(vec![]));
    }

    #[test]
    fn teacher_row_leaves_student_columns_null() {
        let row = FlatAccount::flatten(&base(PermissionInfo::Teacher(TeacherInfo {
            school_id: "S9".to_string(),
        })));
        assert_eq!(row.school_id.as_deref(), Some("S9"));
        assert!(row.grade.is_none());
        assert!(row.friends.is_none());
        assert!(row.timetable_entries.is_none());
    }

    #[test]
    fn restore_rejects_unknown_level_code() {
        let mut row = FlatAccount::flatten(&base(PermissionInfo::Admin));
        row.permission_level = 9;
        assert_eq!(row.restore(), Err(FlattenError::UnknownLevel(9)));
    }

    #[test]
    fn restore_rejects_student_without_grade() {
        let mut row = FlatAccount::flatten(&student(vec![1], vec![], None));
        row.grade = None;
        assert_eq!(
            row.restore(),
            Err(FlattenError::MissingColumn {
                level: PermissionLevel::Student,
                column: "grade"
            })
        );
    }

    #[test]
    fn restore_rejects_columns_from_another_level() {
        let mut row = FlatAccount::flatten(&base(PermissionInfo::Teacher(TeacherInfo {
            school_id: "S1".to_string(),
        })));
        row.friends = Some(vec![]);
        assert_eq!(
            row.restore(),
            Err(FlattenError::UnexpectedColumn {
                level: PermissionLevel::Teacher,
                column: "friends"
            })
        );

        let mut row = FlatAccount::flatten(&base(PermissionInfo::Admin));
        row.school_id = Some("S1".to_string());
        assert!(matches!(row.restore(), Err(FlattenError::UnexpectedColumn { column: "school_id", .. })));
    }

    #[test]
    fn accessors_only_match_their_level() {
        let account = student(vec![], vec![], None);
        assert!(account.permission.as_student().is_some());
        assert!(account.permission.as_teacher().is_none());

        let teacher = base(PermissionInfo::Teacher(TeacherInfo { school_id: "S1".to_string() }));
        assert!(teacher.permission.as_student().is_none());
        assert_eq!(teacher.permission.school_id(), Some("S1"));
        assert_eq!(base(PermissionInfo::Admin).permission.school_id(), None);
    }

    #[test]
    fn serialized_account_hides_password_and_tags_level() {
        let json = serde_json::to_value(student(vec![1], vec![], None)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["permission"]["level"], "student");
        assert_eq!(json["permission"]["grade"], 2);
        assert_eq!(json["permission"]["timetable"]["entries"][0], 1);
    }

    #[test]
    fn level_codes_and_names_are_stable() {
        for level in [
            PermissionLevel::Unknown,
            PermissionLevel::Student,
            PermissionLevel::Teacher,
            PermissionLevel::Admin,
        ] {
            assert_eq!(PermissionLevel::from_code(level.code()), Some(level));
            assert_eq!(level.as_str().parse::<PermissionLevel>(), Ok(level));
        }
        assert_eq!(PermissionLevel::from_code(4), None);
        assert!("principal".parse::<PermissionLevel>().is_err());
    }
}
