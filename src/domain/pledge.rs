//! Pledge domain entity and its state machine.
//!
//! A pledge is a donor's recurring commitment to a fund. All lifecycle
//! transitions are computed here as pure functions of the pledge, the
//! tenant's settings, and the charge outcome, so the processor stays thin
//! and the transitions are testable without a database.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::settings::PledgeSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PledgeStatus {
    Active,
    Paused,
    Cancelled,
    Completed,
}

impl PledgeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PledgeStatus::Cancelled | PledgeStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PledgeStatus::Active => "active",
            PledgeStatus::Paused => "paused",
            PledgeStatus::Cancelled => "cancelled",
            PledgeStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    /// Advances a charge time by one period. Month-based frequencies use
    /// calendar months so a Jan 31 pledge lands on Feb 28/29 rather than
    /// drifting.
    pub fn advance(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Frequency::Weekly => from + Duration::weeks(1),
            Frequency::Biweekly => from + Duration::weeks(2),
            Frequency::Monthly => from
                .checked_add_months(Months::new(1))
                .unwrap_or(from + Duration::days(30)),
            Frequency::Quarterly => from
                .checked_add_months(Months::new(3))
                .unwrap_or(from + Duration::days(91)),
            Frequency::Yearly => from
                .checked_add_months(Months::new(12))
                .unwrap_or(from + Duration::days(365)),
        }
    }

    /// Advances from a scheduled charge time until the result is in the
    /// future. A pledge that sat paused through several periods resumes on
    /// its original cadence instead of being charged for every missed one.
    pub fn advance_past(&self, from: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut next = self.advance(from);
        while next <= now {
            next = self.advance(next);
        }
        next
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Pledge {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub donor_user_id: Option<Uuid>,
    pub fund_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub frequency: Frequency,
    pub status: PledgeStatus,
    pub failure_count: i32,
    pub next_charge_at: DateTime<Utc>,
    pub failing_since: Option<DateTime<Utc>>,
    pub total_amount_cents: i64,
    pub total_charges_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pledge {
    pub fn new(
        tenant_id: Uuid,
        donor_user_id: Option<Uuid>,
        fund_id: Uuid,
        amount_cents: i64,
        currency: String,
        frequency: Frequency,
        next_charge_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            donor_user_id,
            fund_id,
            amount_cents,
            currency,
            frequency,
            status: PledgeStatus::Active,
            failure_count: 0,
            next_charge_at,
            failing_since: None,
            total_amount_cents: 0,
            total_charges_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The field values a pledge should hold after a charge attempt, plus what
/// happened, for event recording and the run report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargePlan {
    pub status: PledgeStatus,
    pub failure_count: i32,
    pub next_charge_at: DateTime<Utc>,
    pub failing_since: Option<DateTime<Utc>>,
    /// Amount to add to the running totals; zero on failure.
    pub charged_cents: i64,
    pub paused_now: bool,
    pub resumed_now: bool,
}

/// Computes the transition for a charge attempt on an active or paused
/// pledge. `scheduled_at` is the `next_charge_at` the pledge was due at
/// when it was claimed, which anchors the one-period advance on success.
pub fn plan_charge_outcome(
    pledge: &Pledge,
    settings: &PledgeSettings,
    scheduled_at: DateTime<Utc>,
    succeeded: bool,
    now: DateTime<Utc>,
) -> ChargePlan {
    if succeeded {
        let resumed = pledge.status == PledgeStatus::Paused && settings.auto_resume_on_success;
        let status = if pledge.status == PledgeStatus::Paused && !settings.auto_resume_on_success {
            PledgeStatus::Paused
        } else {
            PledgeStatus::Active
        };
        ChargePlan {
            status,
            failure_count: 0,
            next_charge_at: pledge.frequency.advance_past(scheduled_at, now),
            failing_since: None,
            charged_cents: pledge.amount_cents,
            paused_now: false,
            resumed_now: resumed,
        }
    } else {
        let failure_count = pledge.failure_count + 1;
        let pauses = pledge.status == PledgeStatus::Active
            && failure_count >= settings.max_failures_before_pause;
        ChargePlan {
            status: if pauses || pledge.status == PledgeStatus::Paused {
                PledgeStatus::Paused
            } else {
                PledgeStatus::Active
            },
            failure_count,
            next_charge_at: now + Duration::hours(settings.retry_interval_hours as i64),
            // Keep the start of the current failure episode so dunning
            // offsets count from the first failure, not the latest.
            failing_since: pledge.failing_since.or(Some(now)),
            charged_cents: 0,
            paused_now: pauses,
            resumed_now: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pledge_with(status: PledgeStatus, failure_count: i32) -> Pledge {
        let mut p = Pledge::new(
            Uuid::new_v4(),
            Some(Uuid::new_v4()),
            Uuid::new_v4(),
            5000,
            "USD".to_string(),
            Frequency::Monthly,
            Utc::now() - Duration::days(1),
        );
        p.status = status;
        p.failure_count = failure_count;
        p
    }

    #[test]
    fn test_successful_charge_resets_failures_and_advances() {
        let mut pledge = pledge_with(PledgeStatus::Active, 2);
        pledge.failing_since = Some(Utc::now() - Duration::days(3));
        let settings = PledgeSettings::default();
        let now = Utc::now();
        let scheduled = pledge.next_charge_at;

        let plan = plan_charge_outcome(&pledge, &settings, scheduled, true, now);

        assert_eq!(plan.status, PledgeStatus::Active);
        assert_eq!(plan.failure_count, 0);
        assert_eq!(plan.failing_since, None);
        assert_eq!(plan.charged_cents, 5000);
        assert!(plan.next_charge_at > now);
        // due yesterday, so one calendar month out lands ~29-30 days ahead
        assert!(plan.next_charge_at - now < Duration::days(32));
    }

    #[test]
    fn test_failure_below_threshold_stays_active() {
        let pledge = pledge_with(PledgeStatus::Active, 0);
        let settings = PledgeSettings {
            max_failures_before_pause: 3,
            retry_interval_hours: 6,
            ..PledgeSettings::default()
        };
        let now = Utc::now();

        let plan = plan_charge_outcome(&pledge, &settings, pledge.next_charge_at, false, now);

        assert_eq!(plan.status, PledgeStatus::Active);
        assert_eq!(plan.failure_count, 1);
        assert!(!plan.paused_now);
        assert_eq!(plan.next_charge_at, now + Duration::hours(6));
        assert_eq!(plan.failing_since, Some(now));
    }

    #[test]
    fn test_failure_at_threshold_pauses() {
        let pledge = pledge_with(PledgeStatus::Active, 2);
        let settings = PledgeSettings {
            max_failures_before_pause: 3,
            ..PledgeSettings::default()
        };

        let plan =
            plan_charge_outcome(&pledge, &settings, pledge.next_charge_at, false, Utc::now());

        assert_eq!(plan.status, PledgeStatus::Paused);
        assert_eq!(plan.failure_count, 3);
        assert!(plan.paused_now);
    }

    #[test]
    fn test_single_failure_pauses_when_threshold_is_one() {
        let pledge = pledge_with(PledgeStatus::Active, 0);
        let settings = PledgeSettings {
            max_failures_before_pause: 1,
            ..PledgeSettings::default()
        };

        let plan =
            plan_charge_outcome(&pledge, &settings, pledge.next_charge_at, false, Utc::now());

        assert_eq!(plan.status, PledgeStatus::Paused);
        assert!(plan.paused_now);
    }

    #[test]
    fn test_paused_retry_success_auto_resumes() {
        let pledge = pledge_with(PledgeStatus::Paused, 3);
        let settings = PledgeSettings {
            auto_resume_on_success: true,
            ..PledgeSettings::default()
        };

        let plan =
            plan_charge_outcome(&pledge, &settings, pledge.next_charge_at, true, Utc::now());

        assert_eq!(plan.status, PledgeStatus::Active);
        assert_eq!(plan.failure_count, 0);
        assert!(plan.resumed_now);
    }

    #[test]
    fn test_paused_retry_success_without_auto_resume_stays_paused() {
        let pledge = pledge_with(PledgeStatus::Paused, 3);
        let settings = PledgeSettings {
            auto_resume_on_success: false,
            ..PledgeSettings::default()
        };

        let plan =
            plan_charge_outcome(&pledge, &settings, pledge.next_charge_at, true, Utc::now());

        assert_eq!(plan.status, PledgeStatus::Paused);
        assert_eq!(plan.failure_count, 0);
        assert_eq!(plan.charged_cents, 5000);
        assert!(!plan.resumed_now);
    }

    #[test]
    fn test_paused_retry_failure_keeps_counting() {
        let pledge = pledge_with(PledgeStatus::Paused, 3);
        let settings = PledgeSettings::default();

        let plan =
            plan_charge_outcome(&pledge, &settings, pledge.next_charge_at, false, Utc::now());

        assert_eq!(plan.status, PledgeStatus::Paused);
        assert_eq!(plan.failure_count, 4);
        assert!(!plan.paused_now);
    }

    #[test]
    fn test_failing_since_is_not_overwritten_by_later_failures() {
        let mut pledge = pledge_with(PledgeStatus::Active, 1);
        let episode_start = Utc::now() - Duration::days(2);
        pledge.failing_since = Some(episode_start);
        let settings = PledgeSettings::default();

        let plan =
            plan_charge_outcome(&pledge, &settings, pledge.next_charge_at, false, Utc::now());

        assert_eq!(plan.failing_since, Some(episode_start));
    }

    #[test]
    fn test_monthly_advance_handles_short_months() {
        let jan31 = Utc.with_ymd_and_hms(2025, 1, 31, 9, 0, 0).unwrap();
        let next = Frequency::Monthly.advance(jan31);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 2, 28, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_advance_past_skips_missed_periods() {
        let start = Utc::now() - Duration::weeks(5);
        let next = Frequency::Weekly.advance_past(start, Utc::now());
        assert!(next > Utc::now());
        assert!(next - Utc::now() <= Duration::weeks(1));
    }
}
