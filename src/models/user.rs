use serde::{Deserialize, Serialize};

/// Administrative role of the signed-in user. Determines which of the
/// user's organization ids scopes QR-authorized actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    University,
    College,
    Department,
    None,
}

/// Organization affiliation ids, keyed by admin role
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationInfo {
    #[serde(default)]
    pub university_id: Option<String>,
    #[serde(default)]
    pub college_id: Option<String>,
    #[serde(default)]
    pub department_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub admin: AdminRole,
    #[serde(default)]
    pub organization_info: OrganizationInfo,
}

impl AuthUser {
    /// Organization id that scopes this user's QR-authorized actions,
    /// selected by admin role. None for non-admin users.
    pub fn scoped_organization_id(&self) -> Option<&str> {
        let info = &self.organization_info;
        match self.admin {
            AdminRole::University => info.university_id.as_deref(),
            AdminRole::College => info.college_id.as_deref(),
            AdminRole::Department => info.department_id.as_deref(),
            AdminRole::None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(admin: AdminRole) -> AuthUser {
        AuthUser {
            id: "u-1".into(),
            name: "test".into(),
            admin,
            organization_info: OrganizationInfo {
                university_id: Some("univ-1".into()),
                college_id: Some("col-1".into()),
                department_id: Some("dept-1".into()),
            },
        }
    }

    #[test]
    fn test_scoped_organization_id_by_role() {
        assert_eq!(user(AdminRole::University).scoped_organization_id(), Some("univ-1"));
        assert_eq!(user(AdminRole::College).scoped_organization_id(), Some("col-1"));
        assert_eq!(user(AdminRole::Department).scoped_organization_id(), Some("dept-1"));
        assert_eq!(user(AdminRole::None).scoped_organization_id(), None);
    }
}
