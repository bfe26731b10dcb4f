pub mod pledge;
pub mod settings;

pub use pledge::{plan_charge_outcome, ChargePlan, Frequency, Pledge, PledgeStatus};
pub use settings::{PledgeSettings, SettingsError};
