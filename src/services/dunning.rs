//! Dunning schedule evaluation.

use chrono::{DateTime, Utc};

/// Trigger offsets (days after the first failure of the episode) that have
/// been reached. The configured list is treated as an unordered set.
pub fn offsets_due(
    dunning_email_days: &[i32],
    failing_since: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Vec<i32> {
    let days_failing = (now - failing_since).num_days();
    let mut due: Vec<i32> = dunning_email_days
        .iter()
        .copied()
        .filter(|&offset| i64::from(offset) <= days_failing)
        .collect();
    due.sort_unstable();
    due.dedup();
    due
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_no_offsets_due_before_first_trigger() {
        let now = Utc::now();
        let failing_since = now - Duration::hours(12);
        assert!(offsets_due(&[1, 3, 7], failing_since, now).is_empty());
    }

    #[test]
    fn test_reached_offsets_in_order() {
        let now = Utc::now();
        let failing_since = now - Duration::days(4);
        assert_eq!(offsets_due(&[7, 1, 3], failing_since, now), vec![1, 3]);
    }

    #[test]
    fn test_zero_offset_fires_immediately() {
        let now = Utc::now();
        assert_eq!(offsets_due(&[0], now, now), vec![0]);
    }

    #[test]
    fn test_duplicate_offsets_collapse() {
        let now = Utc::now();
        let failing_since = now - Duration::days(2);
        assert_eq!(offsets_due(&[1, 1, 2], failing_since, now), vec![1, 2]);
    }
}
