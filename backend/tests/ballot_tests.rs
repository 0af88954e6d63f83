//! Ballot tests
//!
//! Property-based and unit tests for:
//! - Ballot definitions (option sets, max selections)
//! - Vote selection rules per ballot kind
//! - Voting windows and result leaders

use chrono::{Duration, Utc};
use proptest::prelude::*;
use shared::{
    accepts_votes, validate_ballot_definition, validate_selection, BallotError, BallotKind,
    BallotResults, BallotStatus, OptionTally, YES_NO_OPTIONS,
};
use uuid::Uuid;

// ============================================================================
// Property Test Strategies
// ============================================================================

fn option_ids(n: usize) -> Vec<Uuid> {
    (0..n).map(|_| Uuid::new_v4()).collect()
}

/// Distinct option labels
fn labels_strategy() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::hash_set("[a-z]{3,12}", 2..8).prop_map(|set| set.into_iter().collect())
}

fn status_strategy() -> impl Strategy<Value = BallotStatus> {
    prop_oneof![
        Just(BallotStatus::Draft),
        Just(BallotStatus::Open),
        Just(BallotStatus::Closed),
    ]
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Any set of distinct labels is a valid single-choice ballot
    #[test]
    fn test_distinct_labels_are_valid(labels in labels_strategy()) {
        prop_assert!(validate_ballot_definition(BallotKind::SingleChoice, &labels, None).is_ok());
    }

    /// max_selections must lie within 1..=option count
    #[test]
    fn test_max_selections_bounds(labels in labels_strategy(), max in -2i32..12) {
        let result = validate_ballot_definition(BallotKind::MultipleChoice, &labels, Some(max));
        let in_range = max >= 1 && (max as usize) <= labels.len();
        prop_assert_eq!(result.is_ok(), in_range);
    }

    /// Yes/no ballots ignore whatever labels are requested
    #[test]
    fn test_yes_no_labels_fixed(labels in proptest::collection::vec("[a-z]{0,6}", 0..5)) {
        let persisted = BallotKind::YesNo.option_labels(&labels);
        prop_assert_eq!(persisted, YES_NO_OPTIONS.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    }

    /// Any single known option is a valid selection on every kind
    #[test]
    fn test_single_known_option_is_valid(count in 2usize..8, pick in 0usize..8) {
        let options = option_ids(count);
        let chosen = options[pick % count];
        for kind in [BallotKind::SingleChoice, BallotKind::YesNo, BallotKind::MultipleChoice] {
            prop_assert!(validate_selection(kind, &options, &[chosen], None).is_ok());
        }
    }

    /// Multiple-choice selections above the limit are rejected with the limit
    #[test]
    fn test_multiple_choice_limit(count in 2usize..8, max in 1i32..8) {
        let options = option_ids(count);
        let result = validate_selection(BallotKind::MultipleChoice, &options, &options, Some(max));
        if count > max as usize {
            prop_assert_eq!(result, Err(BallotError::TooManySelections(max as usize)));
        } else {
            prop_assert!(result.is_ok());
        }
    }

    /// Only open ballots inside their window accept votes
    #[test]
    fn test_voting_window(status in status_strategy(), offset_minutes in -600i64..600) {
        let now = Utc::now();
        let closes_at = now + Duration::minutes(offset_minutes);
        let accepted = accepts_votes(status, Some(closes_at), now);
        prop_assert_eq!(accepted, status == BallotStatus::Open && offset_minutes > 0);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod selection_tests {
    use super::*;

    #[test]
    fn test_open_ballot_without_deadline_accepts_votes() {
        assert!(accepts_votes(BallotStatus::Open, None, Utc::now()));
        assert!(!accepts_votes(BallotStatus::Draft, None, Utc::now()));
    }

    #[test]
    fn test_empty_selection_errors_depend_on_kind() {
        let options = option_ids(3);
        assert_eq!(
            validate_selection(BallotKind::MultipleChoice, &options, &[], None),
            Err(BallotError::NothingSelected)
        );
        assert_eq!(
            validate_selection(BallotKind::SingleChoice, &options, &[], None),
            Err(BallotError::ExactlyOneRequired)
        );
    }

    #[test]
    fn test_option_from_another_ballot_rejected() {
        let options = option_ids(2);
        let other = Uuid::new_v4();
        assert_eq!(
            validate_selection(BallotKind::MultipleChoice, &options, &[options[0], other], None),
            Err(BallotError::UnknownOption(other))
        );
    }

    #[test]
    fn test_blank_label_rejected() {
        let labels = vec!["Repaint".to_string(), "   ".to_string()];
        assert_eq!(
            validate_ballot_definition(BallotKind::SingleChoice, &labels, None),
            Err(BallotError::EmptyOption)
        );
    }

    #[test]
    fn test_status_progression() {
        assert_eq!(BallotStatus::Draft.next(), Some(BallotStatus::Open));
        assert_eq!(BallotStatus::Open.next(), Some(BallotStatus::Closed));
        assert_eq!(BallotStatus::Closed.next(), None);
    }

    #[test]
    fn test_leaders_on_tie() {
        let tally = |votes| OptionTally {
            option_id: Uuid::new_v4(),
            label: format!("option {}", votes),
            votes,
        };
        let results = BallotResults {
            ballot_id: Uuid::new_v4(),
            voters: 6,
            options: vec![tally(3), tally(1), tally(3)],
        };
        assert_eq!(results.leaders().len(), 2);

        let empty = BallotResults {
            ballot_id: Uuid::new_v4(),
            voters: 0,
            options: vec![tally(0), tally(0)],
        };
        assert!(empty.leaders().is_empty());
    }
}
