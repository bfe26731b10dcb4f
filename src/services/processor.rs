//! Pledge processor: the "Process Due Pledges" and "Retry Failed Pledges"
//! operations behind the admin triggers.
//!
//! Each pledge is claimed with a conditional update before its charge is
//! attempted, so re-running the processor (or two racing runs) charges a
//! due pledge at most once per period. A declined or unreachable gateway
//! is the normal failed outcome and never aborts the batch; database
//! errors do abort, since there is no partial-commit design.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::models::event_kind;
use crate::db::queries;
use crate::domain::{plan_charge_outcome, Pledge, PledgeSettings};
use crate::error::Result;
use crate::gateway::{ChargeGateway, ChargeOutcome, ChargeRequest};
use crate::services::dunning;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProcessReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Claimed by a concurrent run between selection and claim.
    pub skipped: usize,
    pub message: String,
}

pub struct PledgeProcessor {
    pool: PgPool,
    gateway: Arc<dyn ChargeGateway>,
}

impl PledgeProcessor {
    pub fn new(pool: PgPool, gateway: Arc<dyn ChargeGateway>) -> Self {
        Self { pool, gateway }
    }

    /// Charges every active pledge whose `next_charge_at` has passed.
    /// Settings are passed in explicitly; the processor never reads them
    /// ambiently.
    pub async fn process_due(
        &self,
        tenant_id: Uuid,
        settings: &PledgeSettings,
    ) -> Result<ProcessReport> {
        let now = Utc::now();
        let due = queries::select_due_pledges(&self.pool, tenant_id, now).await?;
        debug!(%tenant_id, count = due.len(), "due pledges selected");

        let report = self.charge_batch(tenant_id, settings, due, now).await?;
        info!(%tenant_id, %report.message, "process run complete");

        Ok(ProcessReport {
            message: format!(
                "Processed {} due pledge(s): {} succeeded, {} failed",
                report.processed, report.succeeded, report.failed
            ),
            ..report
        })
    }

    /// Re-attempts paused pledges and active pledges with outstanding
    /// failures whose last attempt is older than the retry interval.
    pub async fn retry_failed(
        &self,
        tenant_id: Uuid,
        settings: &PledgeSettings,
    ) -> Result<ProcessReport> {
        let now = Utc::now();
        let cutoff = now - Duration::hours(settings.retry_interval_hours as i64);
        let eligible = queries::select_retry_pledges(&self.pool, tenant_id, cutoff).await?;
        debug!(%tenant_id, count = eligible.len(), "retry-eligible pledges selected");

        let report = self.charge_batch(tenant_id, settings, eligible, now).await?;
        info!(%tenant_id, %report.message, "retry run complete");

        Ok(ProcessReport {
            message: format!(
                "Retried {} pledge(s): {} succeeded, {} still failing",
                report.processed, report.succeeded, report.failed
            ),
            ..report
        })
    }

    async fn charge_batch(
        &self,
        tenant_id: Uuid,
        settings: &PledgeSettings,
        pledges: Vec<Pledge>,
        now: DateTime<Utc>,
    ) -> Result<ProcessReport> {
        let mut succeeded = 0;
        let mut failed = 0;
        let mut skipped = 0;

        for pledge in pledges {
            let observed = pledge.next_charge_at;
            let hold_until = now + Duration::hours(settings.retry_interval_hours as i64);

            let claimed = queries::claim_pledge_for_charge(
                &self.pool,
                tenant_id,
                pledge.id,
                observed,
                hold_until,
            )
            .await?;
            if !claimed {
                debug!(pledge_id = %pledge.id, "pledge already claimed, skipping");
                skipped += 1;
                continue;
            }

            let charge_ok = self.attempt_charge(&pledge).await;
            let plan = plan_charge_outcome(&pledge, settings, observed, charge_ok, now);
            let updated = queries::apply_charge_plan(&self.pool, tenant_id, pledge.id, &plan).await?;

            if charge_ok {
                succeeded += 1;
                queries::insert_event(
                    &self.pool,
                    tenant_id,
                    pledge.id,
                    event_kind::CHARGE_SUCCEEDED,
                    json!({
                        "amount_cents": pledge.amount_cents,
                        "scheduled_at": observed,
                        "next_charge_at": updated.next_charge_at,
                    }),
                )
                .await?;
                if plan.resumed_now {
                    info!(pledge_id = %pledge.id, "pledge auto-resumed after successful retry");
                    queries::insert_event(
                        &self.pool,
                        tenant_id,
                        pledge.id,
                        event_kind::AUTO_RESUMED,
                        json!({}),
                    )
                    .await?;
                }
            } else {
                failed += 1;
                queries::insert_event(
                    &self.pool,
                    tenant_id,
                    pledge.id,
                    event_kind::CHARGE_FAILED,
                    json!({
                        "failure_count": plan.failure_count,
                        "retry_at": updated.next_charge_at,
                    }),
                )
                .await?;
                if plan.paused_now {
                    warn!(
                        pledge_id = %pledge.id,
                        failure_count = plan.failure_count,
                        "pledge paused after reaching failure threshold"
                    );
                    queries::insert_event(
                        &self.pool,
                        tenant_id,
                        pledge.id,
                        event_kind::AUTO_PAUSED,
                        json!({ "failure_count": plan.failure_count }),
                    )
                    .await?;
                }
                self.record_dunning(tenant_id, &updated, settings, now).await?;
            }
        }

        let processed = succeeded + failed;
        Ok(ProcessReport {
            processed,
            succeeded,
            failed,
            skipped,
            message: summarize(processed, succeeded, failed),
        })
    }

    /// A gateway decline and a gateway transport error both resolve to
    /// "charge failed"; neither propagates out of the batch.
    async fn attempt_charge(&self, pledge: &Pledge) -> bool {
        let request = ChargeRequest {
            tenant_id: pledge.tenant_id,
            pledge_id: pledge.id,
            donor_user_id: pledge.donor_user_id,
            amount_cents: pledge.amount_cents,
            currency: pledge.currency.clone(),
        };

        match self.gateway.charge(&request).await {
            Ok(ChargeOutcome::Approved { reference }) => {
                info!(pledge_id = %pledge.id, %reference, "charge approved");
                true
            }
            Ok(ChargeOutcome::Declined { reason }) => {
                info!(pledge_id = %pledge.id, %reason, "charge declined");
                false
            }
            Err(e) => {
                warn!(pledge_id = %pledge.id, error = %e, "gateway error, treating as failed charge");
                false
            }
        }
    }

    async fn record_dunning(
        &self,
        tenant_id: Uuid,
        pledge: &Pledge,
        settings: &PledgeSettings,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let Some(failing_since) = pledge.failing_since else {
            return Ok(());
        };

        for offset in dunning::offsets_due(&settings.dunning_email_days, failing_since, now) {
            let recorded = queries::insert_dunning_event(
                &self.pool,
                tenant_id,
                pledge.id,
                offset,
                failing_since,
            )
            .await?;
            if recorded {
                info!(
                    pledge_id = %pledge.id,
                    offset_days = offset,
                    "dunning notice recorded"
                );
            }
        }

        Ok(())
    }
}

fn summarize(processed: usize, succeeded: usize, failed: usize) -> String {
    format!(
        "{} pledge(s) processed: {} succeeded, {} failed",
        processed, succeeded, failed
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_counts() {
        assert_eq!(
            summarize(5, 4, 1),
            "5 pledge(s) processed: 4 succeeded, 1 failed"
        );
    }

    #[test]
    fn test_summarize_empty_batch() {
        assert_eq!(
            summarize(0, 0, 0),
            "0 pledge(s) processed: 0 succeeded, 0 failed"
        );
    }
}
