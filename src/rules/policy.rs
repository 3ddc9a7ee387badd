use crate::config::Config;

/// Hours in one standard workday; quotas are kept in days of this length.
pub const HOURS_PER_DAY: f64 = 8.0;

/// Tunable thresholds of the leave rules.
#[derive(Debug, Clone, PartialEq)]
pub struct LeavePolicy {
    /// Sick-leave quota for employees without an admin-set value.
    pub default_sick_quota_days: f64,
    /// Personal-leave quota for employees without an admin-set value.
    pub default_personal_quota_days: f64,
    /// Requests above this many chargeable hours need general-manager sign-off.
    pub long_leave_hours: f64,
}

impl Default for LeavePolicy {
    fn default() -> Self {
        Self {
            default_sick_quota_days: 30.0,
            default_personal_quota_days: 14.0,
            long_leave_hours: 24.0,
        }
    }
}

impl LeavePolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_sick_quota_days: config.default_sick_quota_days,
            default_personal_quota_days: config.default_personal_quota_days,
            long_leave_hours: config.long_leave_hours,
        }
    }

    pub fn is_long_leave(&self, hours: f64) -> bool {
        hours > self.long_leave_hours
    }
}

/// Personal leave is taken in two-hour steps (2, 4, 6, 8, ...).
///
/// Kept on its own so the rule can be narrowed to an explicit set of
/// allowed lengths without touching the validators.
pub fn personal_leave_hours_allowed(hours: f64) -> bool {
    let steps = hours / 2.0;
    hours > 0.0 && (steps - steps.round()).abs() < 1e-9
}

pub fn hours_to_days(hours: f64) -> f64 {
    hours / HOURS_PER_DAY
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
