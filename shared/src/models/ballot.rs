//! Ballot, option and vote models

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Question type of a ballot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "ballot_kind", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum BallotKind {
    SingleChoice,
    MultipleChoice,
    YesNo,
}

/// Fixed option set of a yes/no ballot
pub const YES_NO_OPTIONS: [&str; 2] = ["Yes", "No"];

impl BallotKind {
    pub fn allows_multiple(&self) -> bool {
        matches!(self, BallotKind::MultipleChoice)
    }

    /// Option labels to persist for a new ballot of this kind
    pub fn option_labels(&self, requested: &[String]) -> Vec<String> {
        match self {
            BallotKind::YesNo => YES_NO_OPTIONS.iter().map(|s| s.to_string()).collect(),
            _ => requested.iter().map(|s| s.trim().to_string()).collect(),
        }
    }
}

/// Lifecycle of a ballot: draft, then open, then closed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "ballot_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum BallotStatus {
    Draft,
    Open,
    Closed,
}

impl BallotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BallotStatus::Draft => "draft",
            BallotStatus::Open => "open",
            BallotStatus::Closed => "closed",
        }
    }

    pub fn next(&self) -> Option<BallotStatus> {
        match self {
            BallotStatus::Draft => Some(BallotStatus::Open),
            BallotStatus::Open => Some(BallotStatus::Closed),
            BallotStatus::Closed => None,
        }
    }
}

/// Whether votes are accepted right now
pub fn accepts_votes(
    status: BallotStatus,
    closes_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    status == BallotStatus::Open && closes_at.map(|c| now < c).unwrap_or(true)
}

/// Reasons a ballot definition or a vote is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BallotError {
    #[error("a ballot needs at least two options")]
    TooFewOptions,
    #[error("option labels must not be empty")]
    EmptyOption,
    #[error("option labels must be unique")]
    DuplicateOption,
    #[error("max_selections must be between 1 and the number of options")]
    InvalidMaxSelections,
    #[error("select exactly one option")]
    ExactlyOneRequired,
    #[error("select at least one option")]
    NothingSelected,
    #[error("the same option was selected more than once")]
    DuplicateSelection,
    #[error("at most {0} options may be selected")]
    TooManySelections(usize),
    #[error("option {0} does not belong to this ballot")]
    UnknownOption(Uuid),
}

/// Validate the option set of a new ballot
pub fn validate_ballot_definition(
    kind: BallotKind,
    labels: &[String],
    max_selections: Option<i32>,
) -> Result<(), BallotError> {
    let labels = kind.option_labels(labels);

    if labels.len() < 2 {
        return Err(BallotError::TooFewOptions);
    }
    if labels.iter().any(|l| l.is_empty()) {
        return Err(BallotError::EmptyOption);
    }

    let mut seen = HashSet::new();
    if !labels.iter().all(|l| seen.insert(l.to_lowercase())) {
        return Err(BallotError::DuplicateOption);
    }

    if let (BallotKind::MultipleChoice, Some(max)) = (kind, max_selections) {
        if max < 1 || max as usize > labels.len() {
            return Err(BallotError::InvalidMaxSelections);
        }
    }

    Ok(())
}

/// Validate a member's selection against the ballot's options
pub fn validate_selection(
    kind: BallotKind,
    ballot_options: &[Uuid],
    selection: &[Uuid],
    max_selections: Option<i32>,
) -> Result<(), BallotError> {
    if selection.is_empty() {
        return Err(if kind.allows_multiple() {
            BallotError::NothingSelected
        } else {
            BallotError::ExactlyOneRequired
        });
    }

    if !kind.allows_multiple() && selection.len() != 1 {
        return Err(BallotError::ExactlyOneRequired);
    }

    let mut seen = HashSet::new();
    if !selection.iter().all(|id| seen.insert(*id)) {
        return Err(BallotError::DuplicateSelection);
    }

    if let Some(max) = max_selections.filter(|_| kind.allows_multiple()) {
        let max = max.max(1) as usize;
        if selection.len() > max {
            return Err(BallotError::TooManySelections(max));
        }
    }

    if let Some(unknown) = selection.iter().find(|id| !ballot_options.contains(id)) {
        return Err(BallotError::UnknownOption(*unknown));
    }

    Ok(())
}

/// Per-option vote count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OptionTally {
    pub option_id: Uuid,
    pub label: String,
    pub votes: i64,
}

/// Aggregated results of a ballot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotResults {
    pub ballot_id: Uuid,
    pub voters: i64,
    pub options: Vec<OptionTally>,
}

impl BallotResults {
    /// Options with the highest count; several on a tie, none without votes
    pub fn leaders(&self) -> Vec<&OptionTally> {
        let top = self.options.iter().map(|o| o.votes).max().unwrap_or(0);
        if top == 0 {
            return Vec::new();
        }
        self.options.iter().filter(|o| o.votes == top).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn test_yes_no_ignores_requested_labels() {
        let labels = BallotKind::YesNo.option_labels(&["Maybe".to_string()]);
        assert_eq!(labels, vec!["Yes".to_string(), "No".to_string()]);
        assert!(validate_ballot_definition(BallotKind::YesNo, &[], None).is_ok());
    }

    #[test]
    fn test_single_choice_requires_exactly_one() {
        let options = ids(3);
        assert!(validate_selection(BallotKind::SingleChoice, &options, &options[..1], None).is_ok());
        assert_eq!(
            validate_selection(BallotKind::SingleChoice, &options, &options[..2], None),
            Err(BallotError::ExactlyOneRequired)
        );
        assert_eq!(
            validate_selection(BallotKind::YesNo, &options, &[], None),
            Err(BallotError::ExactlyOneRequired)
        );
    }

    #[test]
    fn test_multiple_choice_limits() {
        let options = ids(4);
        assert!(validate_selection(BallotKind::MultipleChoice, &options, &options, None).is_ok());
        assert_eq!(
            validate_selection(BallotKind::MultipleChoice, &options, &options[..3], Some(2)),
            Err(BallotError::TooManySelections(2))
        );
        assert_eq!(
            validate_selection(
                BallotKind::MultipleChoice,
                &options,
                &[options[0], options[0]],
                None
            ),
            Err(BallotError::DuplicateSelection)
        );
    }

    #[test]
    fn test_foreign_option_rejected() {
        let options = ids(2);
        let stranger = Uuid::new_v4();
        assert_eq!(
            validate_selection(BallotKind::SingleChoice, &options, &[stranger], None),
            Err(BallotError::UnknownOption(stranger))
        );
    }

    #[test]
    fn test_definition_rules() {
        let one = vec!["Only".to_string()];
        assert_eq!(
            validate_ballot_definition(BallotKind::SingleChoice, &one, None),
            Err(BallotError::TooFewOptions)
        );
        let dup = vec!["Red".to_string(), "red ".to_string()];
        assert_eq!(
            validate_ballot_definition(BallotKind::SingleChoice, &dup, None),
            Err(BallotError::DuplicateOption)
        );
        let three = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        assert_eq!(
            validate_ballot_definition(BallotKind::MultipleChoice, &three, Some(4)),
            Err(BallotError::InvalidMaxSelections)
        );
        assert!(validate_ballot_definition(BallotKind::MultipleChoice, &three, Some(3)).is_ok());
    }

    #[test]
    fn test_accepts_votes_respects_deadline() {
        let now = Utc::now();
        assert!(accepts_votes(BallotStatus::Open, None, now));
        assert!(!accepts_votes(
            BallotStatus::Open,
            Some(now - chrono::Duration::minutes(1)),
            now
        ));
        assert!(!accepts_votes(BallotStatus::Draft, None, now));
    }

    #[test]
    fn test_leaders_on_tie() {
        let results = BallotResults {
            ballot_id: Uuid::new_v4(),
            voters: 4,
            options: vec![
                OptionTally { option_id: Uuid::new_v4(), label: "A".into(), votes: 2 },
                OptionTally { option_id: Uuid::new_v4(), label: "B".into(), votes: 2 },
                OptionTally { option_id: Uuid::new_v4(), label: "C".into(), votes: 0 },
            ],
        };
        assert_eq!(results.leaders().len(), 2);
    }
}
