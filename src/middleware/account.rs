use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::database::models::{Account, PermissionLevel, StudentInfo, TeacherInfo};
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller's account, loaded fresh for each request
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

#[async_trait]
impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_user = parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        match state.db.accounts().find_by_user_id(auth_user.user_id).await {
            Ok(account) => Ok(CurrentAccount(account)),
            // token outlived its account
            Err(DatabaseError::NotFound(_)) => Err(ApiError::unauthorized("Account no longer exists")),
            Err(e) => Err(e.into()),
        }
    }
}

impl CurrentAccount {
    pub fn user_id(&self) -> Uuid {
        self.0.user_id
    }

    pub fn level(&self) -> PermissionLevel {
        self.0.level()
    }

    pub fn require_level(&self, level: PermissionLevel) -> Result<(), ApiError> {
        if self.level() != level {
            return Err(ApiError::forbidden(format!("Only {} accounts may do this", level)));
        }
        Ok(())
    }

    pub fn student(&self) -> Result<&StudentInfo, ApiError> {
        self.0
            .permission
            .as_student()
            .ok_or_else(|| ApiError::forbidden("Only student accounts may do this"))
    }

    pub fn teacher(&self) -> Result<&TeacherInfo, ApiError> {
        self.0
            .permission
            .as_teacher()
            .ok_or_else(|| ApiError::forbidden("Only teacher accounts may do this"))
    }

    /// Teachers and admins
    pub fn require_staff(&self) -> Result<(), ApiError> {
        match self.level() {
            PermissionLevel::Teacher | PermissionLevel::Admin => Ok(()),
            _ => Err(ApiError::forbidden("Only teacher or admin accounts may do this")),
        }
    }

    /// Admins may act on any school; teachers only on their own
    pub fn require_school_staff(&self, school_id: &str) -> Result<(), ApiError> {
        match self.level() {
            PermissionLevel::Admin => Ok(()),
            PermissionLevel::Teacher if self.0.permission.school_id() == Some(school_id) => Ok(()),
            PermissionLevel::Teacher => Err(ApiError::forbidden("Teachers may only manage their own school")),
            _ => Err(ApiError::forbidden("Only teacher or admin accounts may do this")),
        }
    }
}
