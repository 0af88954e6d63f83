//! Business logic services for the Condominium Management Platform

pub mod announcement;
pub mod auth;
pub mod ballot;
pub mod budget;
pub mod condominium;
pub mod document;
pub mod export;
pub mod initiative;
pub mod maintenance;
pub mod member;
pub mod notification;
pub mod project;

pub use announcement::AnnouncementService;
pub use auth::AuthService;
pub use ballot::BallotService;
pub use budget::BudgetService;
pub use condominium::CondominiumService;
pub use document::DocumentService;
pub use initiative::InitiativeService;
pub use maintenance::MaintenanceService;
pub use member::MemberService;
pub use notification::NotificationService;
pub use project::ProjectService;
