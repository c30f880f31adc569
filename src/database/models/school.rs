use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::account::{DbId, SchoolId};

/// Registry entry referenced by accounts, menus and events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct School {
    #[serde(default)]
    pub id: DbId,
    pub school_id: SchoolId,
    pub region_id: String,
    pub school_name: String,
    pub region_name: String,
    #[serde(default)]
    pub organization_email_only: bool,
    /// Required domain for registrations when `organization_email_only` is set
    #[serde(default)]
    pub email_domain: Option<String>,
}

impl School {
    /// Registry ids are limited to `[A-Za-z0-9_-]`, so they map one-to-one onto file names
    pub fn is_valid_id(school_id: &str) -> bool {
        !school_id.is_empty()
            && school_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    pub fn accepts_email(&self, email: &str) -> bool {
        if !self.organization_email_only {
            return true;
        }
        let Some(domain) = self.email_domain.as_deref() else {
            return false;
        };
        email
            .rsplit_once('@')
            .map(|(_, host)| host.eq_ignore_ascii_case(domain.trim_start_matches('@')))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn school(organization_email_only: bool, email_domain: Option<&str>) -> School {
        School {
            id: 1,
            school_id: "S1".to_string(),
            region_id: "R1".to_string(),
            school_name: "Daejeon High".to_string(),
            region_name: "Daejeon".to_string(),
            organization_email_only,
            email_domain: email_domain.map(str::to_string),
        }
    }

    #[test]
    fn open_school_accepts_any_address() {
        assert!(school(false, None).accepts_email("kim@gmail.com"));
    }

    #[test]
    fn organization_school_checks_domain() {
        let s = school(true, Some("djhs.kr"));
        assert!(s.accepts_email("kim@djhs.kr"));
        assert!(s.accepts_email("kim@DJHS.KR"));
        assert!(!s.accepts_email("kim@gmail.com"));
        assert!(!s.accepts_email("kim.djhs.kr"));
        assert!(!school(true, None).accepts_email("kim@djhs.kr"));
    }
}
