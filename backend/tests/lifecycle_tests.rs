//! Lifecycle tests
//!
//! Property-based and unit tests for:
//! - Linear project progression
//! - Maintenance request transitions
//! - Initiative review and decisions

use proptest::prelude::*;
use shared::{InitiativeStatus, MaintenanceStatus, ProjectStatus};

// ============================================================================
// Property Test Strategies
// ============================================================================

fn project_status_strategy() -> impl Strategy<Value = ProjectStatus> {
    proptest::sample::select(ProjectStatus::SEQUENCE.to_vec())
}

fn maintenance_status_strategy() -> impl Strategy<Value = MaintenanceStatus> {
    prop_oneof![
        Just(MaintenanceStatus::Open),
        Just(MaintenanceStatus::InProgress),
        Just(MaintenanceStatus::Resolved),
        Just(MaintenanceStatus::Closed),
    ]
}

fn initiative_status_strategy() -> impl Strategy<Value = InitiativeStatus> {
    prop_oneof![
        Just(InitiativeStatus::Open),
        Just(InitiativeStatus::UnderReview),
        Just(InitiativeStatus::Accepted),
        Just(InitiativeStatus::Rejected),
    ]
}

fn position(status: ProjectStatus) -> usize {
    ProjectStatus::SEQUENCE
        .iter()
        .position(|s| *s == status)
        .unwrap()
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// A project only ever moves exactly one step forward
    #[test]
    fn test_project_advances_one_step(status in project_status_strategy()) {
        match status.next() {
            Some(next) => prop_assert_eq!(position(next), position(status) + 1),
            None => prop_assert_eq!(status, ProjectStatus::Archived),
        }
    }

    /// Advancing enough times always ends archived
    #[test]
    fn test_project_reaches_archived(status in project_status_strategy()) {
        let mut current = status;
        let mut steps = 0;
        while let Some(next) = current.next() {
            current = next;
            steps += 1;
        }
        prop_assert_eq!(current, ProjectStatus::Archived);
        prop_assert_eq!(steps, ProjectStatus::SEQUENCE.len() - 1 - position(status));
    }

    /// Maintenance never transitions to itself and never leaves closed
    #[test]
    fn test_maintenance_transitions(
        from in maintenance_status_strategy(),
        to in maintenance_status_strategy(),
    ) {
        prop_assert!(!from.can_transition_to(from));
        if from == MaintenanceStatus::Closed {
            prop_assert!(!from.can_transition_to(to));
        }
        prop_assert_eq!(from.can_transition_to(to), from.allowed_transitions().contains(&to));
    }

    /// Every non-closed request can be closed
    #[test]
    fn test_maintenance_can_always_close(from in maintenance_status_strategy()) {
        prop_assert_eq!(
            from.can_transition_to(MaintenanceStatus::Closed),
            from != MaintenanceStatus::Closed
        );
    }

    /// Decided initiatives are final and stop collecting support
    #[test]
    fn test_initiative_decisions_final(
        from in initiative_status_strategy(),
        to in initiative_status_strategy(),
    ) {
        if from.is_decided() {
            prop_assert!(!from.can_transition_to(to));
            prop_assert!(!from.accepts_support());
        } else {
            prop_assert!(from.accepts_support());
        }
        prop_assert!(!from.can_transition_to(InitiativeStatus::Open));
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod status_tests {
    use super::*;

    #[test]
    fn test_project_sequence_order() {
        let names: Vec<&str> = ProjectStatus::SEQUENCE.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            names,
            vec!["proposed", "approved", "in_progress", "completed", "archived"]
        );
    }

    #[test]
    fn test_resolved_request_can_be_reopened() {
        assert!(MaintenanceStatus::Resolved.can_transition_to(MaintenanceStatus::InProgress));
        assert!(!MaintenanceStatus::InProgress.can_transition_to(MaintenanceStatus::Open));
    }

    #[test]
    fn test_open_request_cannot_skip_to_resolved() {
        assert!(!MaintenanceStatus::Open.can_transition_to(MaintenanceStatus::Resolved));
    }

    #[test]
    fn test_review_is_optional() {
        assert!(InitiativeStatus::Open.can_transition_to(InitiativeStatus::UnderReview));
        assert!(InitiativeStatus::Open.can_transition_to(InitiativeStatus::Rejected));
        assert!(!InitiativeStatus::UnderReview.can_transition_to(InitiativeStatus::UnderReview));
    }

    #[test]
    fn test_statuses_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&ProjectStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::to_string(&InitiativeStatus::UnderReview).unwrap(),
            "\"under_review\""
        );
        assert_eq!(MaintenanceStatus::InProgress.to_string(), "in_progress");
    }
}
