//! Review folding logic
//!
//! GitHub keeps every review a user ever submitted on a pull request; only
//! the most recent one reflects their current position. The gate folds the
//! full review history into a latest-state-per-reviewer map and asks whether
//! any QE user currently approves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Review state GitHub reports for an approval in the REST listing
pub const APPROVED: &str = "APPROVED";

/// A single pull request review as listed by the GitHub API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    /// Login of the reviewer
    pub reviewer: String,
    /// Review state as reported by GitHub (e.g. "APPROVED", "CHANGES_REQUESTED")
    pub state: String,
    /// When the review was submitted; missing for reviews still pending
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Fold reviews into the latest state per reviewer login.
///
/// Reviews are sorted by submission time before folding, so the result does
/// not depend on the order the API returned them in. Reviews without a
/// timestamp sort first and are overwritten by any dated review from the
/// same login.
pub fn latest_review_states(reviews: &[Review]) -> HashMap<String, String> {
    let mut sorted: Vec<&Review> = reviews.iter().collect();
    sorted.sort_by_key(|r| r.submitted_at);

    let mut latest = HashMap::new();
    for review in sorted {
        latest.insert(review.reviewer.clone(), review.state.clone());
    }
    latest
}

/// Whether any QE user's latest review state is an approval
pub fn any_qe_approved(latest: &HashMap<String, String>, qe_users: &[String]) -> bool {
    qe_users
        .iter()
        .any(|user| latest.get(user).map(String::as_str) == Some(APPROVED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn review(reviewer: &str, state: &str, minute: u32) -> Review {
        Review {
            reviewer: reviewer.to_string(),
            state: state.to_string(),
            submitted_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap()),
        }
    }

    fn qe_users() -> Vec<String> {
        vec!["qe-alice".to_string(), "qe-bob".to_string()]
    }

    #[test]
    fn test_latest_state_wins() {
        let reviews = vec![
            review("qe-alice", "APPROVED", 1),
            review("qe-alice", "CHANGES_REQUESTED", 2),
        ];

        let latest = latest_review_states(&reviews);
        assert_eq!(latest.get("qe-alice").unwrap(), "CHANGES_REQUESTED");
        assert!(!any_qe_approved(&latest, &qe_users()));
    }

    #[test]
    fn test_out_of_order_reviews_are_sorted_by_timestamp() {
        // Delivered newest-first; the fold must still pick the later review
        let reviews = vec![
            review("qe-alice", "APPROVED", 5),
            review("qe-alice", "CHANGES_REQUESTED", 1),
        ];

        let latest = latest_review_states(&reviews);
        assert_eq!(latest.get("qe-alice").unwrap(), "APPROVED");
        assert!(any_qe_approved(&latest, &qe_users()));
    }

    #[test]
    fn test_resubmitted_approval_counts() {
        let reviews = vec![
            review("qe-bob", "CHANGES_REQUESTED", 1),
            review("qe-bob", "APPROVED", 2),
        ];

        let latest = latest_review_states(&reviews);
        assert!(any_qe_approved(&latest, &qe_users()));
    }

    #[test]
    fn test_non_qe_approval_does_not_count() {
        let reviews = vec![review("random-contributor", "APPROVED", 1)];

        let latest = latest_review_states(&reviews);
        assert!(!any_qe_approved(&latest, &qe_users()));
    }

    #[test]
    fn test_multiple_reviewers_tracked_independently() {
        let reviews = vec![
            review("qe-alice", "CHANGES_REQUESTED", 1),
            review("qe-bob", "APPROVED", 2),
            review("qe-alice", "COMMENTED", 3),
        ];

        let latest = latest_review_states(&reviews);
        assert_eq!(latest.get("qe-alice").unwrap(), "COMMENTED");
        assert_eq!(latest.get("qe-bob").unwrap(), "APPROVED");
        assert!(any_qe_approved(&latest, &qe_users()));
    }

    #[test]
    fn test_undated_review_loses_to_dated_one() {
        let reviews = vec![
            Review {
                reviewer: "qe-alice".to_string(),
                state: "APPROVED".to_string(),
                submitted_at: None,
            },
            review("qe-alice", "DISMISSED", 1),
        ];

        let latest = latest_review_states(&reviews);
        assert_eq!(latest.get("qe-alice").unwrap(), "DISMISSED");
    }

    #[test]
    fn test_empty_reviews_yield_no_approval() {
        let latest = latest_review_states(&[]);
        assert!(latest.is_empty());
        assert!(!any_qe_approved(&latest, &qe_users()));
    }

    #[test]
    fn test_lowercase_approved_is_not_an_approval() {
        // The REST listing reports upper-case states; anything else is not
        // treated as an approval.
        let reviews = vec![review("qe-alice", "approved", 1)];
        let latest = latest_review_states(&reviews);
        assert!(!any_qe_approved(&latest, &qe_users()));
    }
}
