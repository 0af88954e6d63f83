//! Project, maintenance and initiative lifecycles

use serde::{Deserialize, Serialize};

/// Project status. Progression is strictly linear.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "project_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Proposed,
    Approved,
    InProgress,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub const SEQUENCE: [ProjectStatus; 5] = [
        ProjectStatus::Proposed,
        ProjectStatus::Approved,
        ProjectStatus::InProgress,
        ProjectStatus::Completed,
        ProjectStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Proposed => "proposed",
            ProjectStatus::Approved => "approved",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }

    /// The single successor, `None` once archived
    pub fn next(&self) -> Option<ProjectStatus> {
        match self {
            ProjectStatus::Proposed => Some(ProjectStatus::Approved),
            ProjectStatus::Approved => Some(ProjectStatus::InProgress),
            ProjectStatus::InProgress => Some(ProjectStatus::Completed),
            ProjectStatus::Completed => Some(ProjectStatus::Archived),
            ProjectStatus::Archived => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maintenance request status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "maintenance_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl MaintenanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceStatus::Open => "open",
            MaintenanceStatus::InProgress => "in_progress",
            MaintenanceStatus::Resolved => "resolved",
            MaintenanceStatus::Closed => "closed",
        }
    }

    pub fn allowed_transitions(&self) -> &'static [MaintenanceStatus] {
        match self {
            MaintenanceStatus::Open => &[MaintenanceStatus::InProgress, MaintenanceStatus::Closed],
            MaintenanceStatus::InProgress => {
                &[MaintenanceStatus::Resolved, MaintenanceStatus::Closed]
            }
            MaintenanceStatus::Resolved => {
                &[MaintenanceStatus::Closed, MaintenanceStatus::InProgress]
            }
            MaintenanceStatus::Closed => &[],
        }
    }

    pub fn can_transition_to(&self, target: MaintenanceStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }
}

impl std::fmt::Display for MaintenanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maintenance request urgency
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "maintenance_priority", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum MaintenancePriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// Initiative status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "initiative_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum InitiativeStatus {
    Open,
    UnderReview,
    Accepted,
    Rejected,
}

impl InitiativeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InitiativeStatus::Open => "open",
            InitiativeStatus::UnderReview => "under_review",
            InitiativeStatus::Accepted => "accepted",
            InitiativeStatus::Rejected => "rejected",
        }
    }

    pub fn is_decided(&self) -> bool {
        matches!(self, InitiativeStatus::Accepted | InitiativeStatus::Rejected)
    }

    /// Open and under-review initiatives still collect support
    pub fn accepts_support(&self) -> bool {
        !self.is_decided()
    }

    pub fn can_transition_to(&self, target: InitiativeStatus) -> bool {
        match (self, target) {
            (InitiativeStatus::Open, InitiativeStatus::UnderReview) => true,
            (InitiativeStatus::Open | InitiativeStatus::UnderReview, t) => t.is_decided(),
            _ => false,
        }
    }
}

impl std::fmt::Display for InitiativeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
