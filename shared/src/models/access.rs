//! Tenant roles and document visibility rules

use serde::{Deserialize, Serialize};

/// Role of a user inside one condominium
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "system_role", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    Admin,
    Member,
}

impl SystemRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemRole::Admin => "admin",
            SystemRole::Member => "member",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, SystemRole::Admin)
    }
}

impl std::fmt::Display for SystemRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SystemRole {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(SystemRole::Admin),
            // "user" is accepted for rows written before the rename
            "member" | "user" => Ok(SystemRole::Member),
            _ => Err("Unknown system role"),
        }
    }
}

/// Who may see a document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "document_visibility", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Members,
    Admin,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Members => "members",
            Visibility::Admin => "admin",
        }
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Members
    }
}

/// Effective visibility: explicit override, else folder default, else members
pub fn resolve_visibility(
    override_visibility: Option<Visibility>,
    folder_default: Option<Visibility>,
) -> Visibility {
    override_visibility.or(folder_default).unwrap_or_default()
}

/// Access check against an effective visibility.
///
/// `role` is `None` when the caller is not a member of the condominium.
pub fn can_access(visibility: Visibility, role: Option<SystemRole>) -> bool {
    match visibility {
        Visibility::Public => true,
        Visibility::Members => role.is_some(),
        Visibility::Admin => role.map(|r| r.is_admin()).unwrap_or(false),
    }
}

/// Role gate used by every tenant-scoped operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRequirement {
    Member,
    Admin,
}

/// Why a role gate refused the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("not a member of this condominium")]
    NotAMember,
    #[error("administrator role required")]
    AdminRequired,
}

impl RoleRequirement {
    pub fn check(&self, role: Option<SystemRole>) -> Result<SystemRole, AccessDenied> {
        let role = role.ok_or(AccessDenied::NotAMember)?;
        match self {
            RoleRequirement::Member => Ok(role),
            RoleRequirement::Admin if role.is_admin() => Ok(role),
            RoleRequirement::Admin => Err(AccessDenied::AdminRequired),
        }
    }
}

/// Whether changing one admin's membership would leave the condominium
/// without any administrator
pub fn would_orphan_condominium(
    admin_count: i64,
    current_role: SystemRole,
    new_role: Option<SystemRole>,
) -> bool {
    current_role.is_admin() && !new_role.map(|r| r.is_admin()).unwrap_or(false) && admin_count <= 1
}
