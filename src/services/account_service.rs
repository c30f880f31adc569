//! Registration, login, profile updates and OAuth login resolution.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{AuthError, EMAIL_CLAIM, USER_ID_CLAIM};
use crate::database::models::{Account, DbId, PermissionInfo, School};
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{
    permission_from_parts, validate_account, validate_email, validate_name, validate_new_account,
    validate_password, validate_permission, FieldError, PermissionParts,
};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// `student`, `teacher` or `admin`
    pub level: String,
    #[serde(flatten)]
    pub parts: PermissionParts,
    /// Signed email assertion from the OAuth callback; when present the
    /// address must match it
    #[serde(default)]
    pub email_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Registered {
    pub id: DbId,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `PUT /<level>/config` body. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(flatten)]
    pub parts: PermissionParts,
    #[serde(default)]
    pub friends: Option<Vec<Uuid>>,
}

/// Outcome of an OAuth callback
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum OAuthLogin {
    /// Known account: a session token
    Session { token: String },
    /// Unknown address: a signed assertion to carry into registration
    Unregistered { email: String },
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn stray(field: &str, present: bool, level: &str) -> Result<(), FieldError> {
    if present {
        return Err(FieldError::new(field, format!("is not allowed for {} accounts", level)));
    }
    Ok(())
}

/// Merge `update` into `account`. The permission level never changes; the
/// password is handled by the caller since it needs hashing.
pub fn apply_profile_update(mut account: Account, update: &ProfileUpdate) -> Result<Account, FieldError> {
    if let Some(level) = &update.level {
        if !level.eq_ignore_ascii_case(account.level().as_str()) {
            return Err(FieldError::new("level", "cannot be changed"));
        }
    }
    if let Some(name) = &update.name {
        validate_name(name)?;
        account.name = name.trim().to_string();
    }
    if let Some(email) = &update.email {
        let email = normalize_email(email);
        validate_email(&email)?;
        account.email = email;
    }

    let parts = &update.parts;
    match &mut account.permission {
        PermissionInfo::Student(student) => {
            if let Some(school_id) = &parts.school_id {
                student.school_id = school_id.clone();
            }
            if let Some(grade) = parts.grade {
                student.grade = grade;
            }
            if let Some(class) = parts.class {
                student.class = class;
            }
            if let Some(number) = parts.number {
                student.number = number;
            }
            if let Some(friends) = &update.friends {
                student.friends = friends.clone();
            }
        }
        PermissionInfo::Teacher(teacher) => {
            stray("grade", parts.grade.is_some(), "teacher")?;
            stray("class", parts.class.is_some(), "teacher")?;
            stray("number", parts.number.is_some(), "teacher")?;
            stray("friends", update.friends.is_some(), "teacher")?;
            if let Some(school_id) = &parts.school_id {
                teacher.school_id = school_id.clone();
            }
        }
        PermissionInfo::Admin | PermissionInfo::Unknown => {
            stray("school_id", parts.school_id.is_some(), "admin")?;
            stray("grade", parts.grade.is_some(), "admin")?;
            stray("class", parts.class.is_some(), "admin")?;
            stray("number", parts.number.is_some(), "admin")?;
            stray("friends", update.friends.is_some(), "admin")?;
        }
    }

    validate_permission(&account.permission, Some(account.user_id))?;
    Ok(account)
}

pub struct AccountService<'a> {
    state: &'a AppState,
}

impl<'a> AccountService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// School the account belongs to must exist and accept its address
    async fn check_school(&self, permission: &PermissionInfo, email: &str) -> Result<(), ApiError> {
        let Some(school_id) = permission.school_id() else {
            return Ok(());
        };
        let school: School = self
            .state
            .db
            .schools()
            .find(school_id)
            .await?
            .ok_or_else(|| ApiError::bad_request(format!("School {} is not registered", school_id)))?;
        if !school.accepts_email(email) {
            return Err(FieldError::new("email", "must use the school's organization domain").into());
        }
        Ok(())
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<Registered, ApiError> {
        let permission = permission_from_parts(&request.level, &request.parts)?;
        let email = normalize_email(&request.email);
        validate_new_account(&request.name, &email, &request.password, &permission)?;

        if let Some(token) = &request.email_token {
            let asserted: String = self.state.tokens.verify(token, EMAIL_CLAIM)?;
            if normalize_email(&asserted) != email {
                return Err(ApiError::unauthorized("Email does not match the verified address"));
            }
        }

        self.check_school(&permission, &email).await?;

        let password_hash = hash_password(request.password, self.state.config.security.bcrypt_cost).await?;
        let account = Account {
            id: 0,
            user_id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            email,
            password_hash,
            permission,
        };
        validate_account(&account)?;

        let stored = self.state.db.accounts().insert(&account).await?;
        info!("Registered {} account {}", stored.level(), stored.user_id);
        Ok(Registered {
            id: stored.id,
            user_id: stored.user_id,
        })
    }

    /// Returns a session token for valid credentials
    pub async fn login(&self, request: LoginRequest) -> Result<String, ApiError> {
        let email = normalize_email(&request.email);
        let Some(account) = self.state.db.accounts().find_by_email(&email).await? else {
            self.state
                .decoy_hash
                .verify(request.password, self.state.config.security.bcrypt_cost)
                .await;
            warn!("Login failed: unknown email");
            return Err(AuthError::InvalidCredentials.into());
        };

        if !verify_password(request.password, account.password_hash.clone()).await {
            warn!("Login failed for account {}", account.user_id);
            return Err(AuthError::InvalidCredentials.into());
        }

        info!("Account {} logged in", account.user_id);
        Ok(self.state.tokens.issue(USER_ID_CLAIM, &account.user_id)?)
    }

    /// Idempotent: applying the same update twice stores the same account
    pub async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<Account, ApiError> {
        let accounts = self.state.db.accounts();
        let current = accounts.find_by_user_id(user_id).await?;
        let previous_school = current.permission.school_id().map(str::to_string);
        let previous_email = current.email.clone();

        let mut account = apply_profile_update(current, &update)?;

        if let Some(password) = update.password {
            validate_password(&password)?;
            account.password_hash = hash_password(password, self.state.config.security.bcrypt_cost).await?;
        }

        if account.permission.school_id().map(str::to_string) != previous_school || account.email != previous_email {
            self.check_school(&account.permission, &account.email).await?;
        }

        if let Some(student) = account.permission.as_student() {
            if !accounts.students_exist(&student.friends).await? {
                return Err(FieldError::new("friends", "every friend must be a registered student").into());
            }
        }

        validate_account(&account)?;
        Ok(accounts.update(&account).await?)
    }

    /// Map a provider-verified email to a session or a registration assertion
    pub async fn resolve_oauth_email(&self, email: &str) -> Result<OAuthLogin, ApiError> {
        let email = normalize_email(email);
        match self.state.db.accounts().find_by_email(&email).await? {
            Some(account) => {
                info!("Account {} logged in through OAuth", account.user_id);
                Ok(OAuthLogin::Session {
                    token: self.state.tokens.issue(USER_ID_CLAIM, &account.user_id)?,
                })
            }
            None => Ok(OAuthLogin::Unregistered {
                email: self.state.tokens.issue(EMAIL_CLAIM, &email)?,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{StudentInfo, TeacherInfo, Timetable};

    fn student() -> Account {
        Account {
            id: 7,
            user_id: Uuid::new_v4(),
            name: "Kim".to_string(),
            email: "kim@ex.com".to_string(),
            password_hash: b"hash".to_vec(),
            permission: PermissionInfo::Student(StudentInfo {
                school_id: "S1".to_string(),
                timetable: Timetable {
                    entries: vec![3, 1],
                    is_public: true,
                },
                grade: 2,
                class: 3,
                number: 15,
                checklist_id: Some(4),
                friends: vec![],
            }),
        }
    }

    fn teacher() -> Account {
        Account {
            permission: PermissionInfo::Teacher(TeacherInfo {
                school_id: "S1".to_string(),
            }),
            ..student()
        }
    }

    #[test]
    fn update_merges_only_given_fields() {
        let before = student();
        let update = ProfileUpdate {
            name: Some("Kim Minji".to_string()),
            parts: PermissionParts {
                grade: Some(3),
                ..PermissionParts::default()
            },
            ..ProfileUpdate::default()
        };

        let after = apply_profile_update(before.clone(), &update).unwrap();
        assert_eq!(after.name, "Kim Minji");
        let info = after.permission.as_student().unwrap();
        assert_eq!(info.grade, 3);
        assert_eq!(info.class, 3);
        // lock state and checklist reference are not profile fields
        assert!(info.timetable.is_public);
        assert_eq!(info.timetable.entries, vec![3, 1]);
        assert_eq!(info.checklist_id, Some(4));
    }

    #[test]
    fn update_is_idempotent() {
        let update = ProfileUpdate {
            email: Some(" Kim@EX.com ".to_string()),
            parts: PermissionParts {
                number: Some(9),
                ..PermissionParts::default()
            },
            friends: Some(vec![Uuid::new_v4()]),
            ..ProfileUpdate::default()
        };
        let once = apply_profile_update(student(), &update).unwrap();
        let twice = apply_profile_update(once.clone(), &update).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.email, "kim@ex.com");
    }

    #[test]
    fn level_cannot_change() {
        let update = ProfileUpdate {
            level: Some("admin".to_string()),
            ..ProfileUpdate::default()
        };
        assert_eq!(apply_profile_update(student(), &update).unwrap_err().field, "level");

        let same = ProfileUpdate {
            level: Some("Student".to_string()),
            ..ProfileUpdate::default()
        };
        assert!(apply_profile_update(student(), &same).is_ok());
    }

    #[test]
    fn teacher_rejects_student_fields() {
        let update = ProfileUpdate {
            parts: PermissionParts {
                grade: Some(1),
                ..PermissionParts::default()
            },
            ..ProfileUpdate::default()
        };
        assert_eq!(apply_profile_update(teacher(), &update).unwrap_err().field, "grade");
    }

    #[test]
    fn student_cannot_befriend_self() {
        let account = student();
        let update = ProfileUpdate {
            friends: Some(vec![account.user_id]),
            ..ProfileUpdate::default()
        };
        assert_eq!(apply_profile_update(account, &update).unwrap_err().field, "friends");
    }

    #[test]
    fn zero_grade_is_rejected() {
        let update = ProfileUpdate {
            parts: PermissionParts {
                grade: Some(0),
                ..PermissionParts::default()
            },
            ..ProfileUpdate::default()
        };
        assert_eq!(apply_profile_update(student(), &update).unwrap_err().field, "grade");
    }
}
