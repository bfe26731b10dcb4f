//! Per-tenant pledge processing settings.

use serde::{Deserialize, Serialize};

/// One row per tenant; tenants without a persisted row get `Default`.
/// Only the settings handlers are allowed to mutate these; the processor
/// receives them as an explicit argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PledgeSettings {
    pub max_failures_before_pause: i32,
    pub retry_interval_hours: i32,
    pub grace_period_days: i32,
    pub auto_resume_on_success: bool,
    pub dunning_email_days: Vec<i32>,
}

impl Default for PledgeSettings {
    fn default() -> Self {
        Self {
            max_failures_before_pause: 3,
            retry_interval_hours: 24,
            grace_period_days: 7,
            auto_resume_on_success: true,
            dunning_email_days: vec![1, 3, 7],
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("maxFailuresBeforePause must be at least 1, got {0}")]
    MaxFailuresTooLow(i32),
    #[error("retryIntervalHours must be at least 1, got {0}")]
    RetryIntervalTooLow(i32),
    #[error("gracePeriodDays must not be negative, got {0}")]
    GracePeriodNegative(i32),
    #[error("dunningEmailDays values must not be negative, got {0}")]
    DunningDayNegative(i32),
}

impl PledgeSettings {
    /// Rejects out-of-bounds values outright; nothing is clamped.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_failures_before_pause < 1 {
            return Err(SettingsError::MaxFailuresTooLow(
                self.max_failures_before_pause,
            ));
        }
        if self.retry_interval_hours < 1 {
            return Err(SettingsError::RetryIntervalTooLow(self.retry_interval_hours));
        }
        if self.grace_period_days < 0 {
            return Err(SettingsError::GracePeriodNegative(self.grace_period_days));
        }
        if let Some(&day) = self.dunning_email_days.iter().find(|&&d| d < 0) {
            return Err(SettingsError::DunningDayNegative(day));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(PledgeSettings::default().validate(), Ok(()));
    }

    #[test]
    fn test_zero_max_failures_rejected() {
        let settings = PledgeSettings {
            max_failures_before_pause: 0,
            ..PledgeSettings::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::MaxFailuresTooLow(0)));
    }

    #[test]
    fn test_zero_retry_interval_rejected() {
        let settings = PledgeSettings {
            retry_interval_hours: 0,
            ..PledgeSettings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::RetryIntervalTooLow(0))
        );
    }

    #[test]
    fn test_negative_grace_period_rejected() {
        let settings = PledgeSettings {
            grace_period_days: -1,
            ..PledgeSettings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::GracePeriodNegative(-1))
        );
    }

    #[test]
    fn test_negative_dunning_day_rejected() {
        let settings = PledgeSettings {
            dunning_email_days: vec![0, 3, -2],
            ..PledgeSettings::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::DunningDayNegative(-2)));
    }

    #[test]
    fn test_unsorted_dunning_days_accepted() {
        let settings = PledgeSettings {
            dunning_email_days: vec![7, 1, 3],
            ..PledgeSettings::default()
        };
        assert_eq!(settings.validate(), Ok(()));
    }
}
