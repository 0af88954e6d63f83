//! Condominium (tenant), settings and notification kinds

use serde::{Deserialize, Serialize};

/// Per-condominium settings with their defaults
#[derive(Debug, Clone, Serialize)]
pub struct SettingsDefaults {
    pub currency: &'static str,
    pub fiscal_year_start_month: i16,
    pub allow_member_initiatives: bool,
    pub notify_on_announcement: bool,
    pub notify_on_ballot: bool,
}

pub const DEFAULT_SETTINGS: SettingsDefaults = SettingsDefaults {
    currency: "EUR",
    fiscal_year_start_month: 1,
    allow_member_initiatives: true,
    notify_on_announcement: true,
    notify_on_ballot: true,
};

/// Kind of an in-app notification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "notification_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Announcement,
    BallotOpened,
    MaintenanceUpdated,
    ProjectUpdated,
    System,
}

impl NotificationKind {
    /// Workflow name forwarded to the automation webhook, if any
    pub fn workflow(&self) -> Option<&'static str> {
        match self {
            NotificationKind::Announcement => Some("announcement-published"),
            NotificationKind::BallotOpened => Some("ballot-opened"),
            NotificationKind::MaintenanceUpdated => Some("maintenance-updated"),
            NotificationKind::ProjectUpdated => Some("project-updated"),
            NotificationKind::System => None,
        }
    }
}
