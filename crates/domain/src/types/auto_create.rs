//! Auto-create eligibility
//!
//! Whether a lesson's hours count toward automatic timesheet creation is a
//! per-staff preference with history. The most recent change at or before
//! the lesson start wins; without any history the partner-wide default
//! applies.

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Append-only record of a staff preference change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoCreateFlagActivityLog {
    pub id: String,
    pub staff_id: String,
    pub flag_on: bool,
    pub change_time: DateTime<Utc>,
}

/// Resolves the eligibility flag per staff at a fixed reference time
#[derive(Debug, Clone, Default)]
pub struct AutoCreateFlagResolver {
    latest: AHashMap<String, (DateTime<Utc>, bool)>,
    partner_default: bool,
}

impl AutoCreateFlagResolver {
    /// Entries after `reference` are ignored.
    #[must_use]
    pub fn new(
        logs: &[AutoCreateFlagActivityLog],
        reference: DateTime<Utc>,
        partner_default: bool,
    ) -> Self {
        let mut latest: AHashMap<String, (DateTime<Utc>, bool)> = AHashMap::new();
        for log in logs.iter().filter(|log| log.change_time <= reference) {
            match latest.get(&log.staff_id) {
                Some((seen, _)) if *seen > log.change_time => {}
                _ => {
                    latest.insert(log.staff_id.clone(), (log.change_time, log.flag_on));
                }
            }
        }
        Self { latest, partner_default }
    }

    #[must_use]
    pub fn resolve(&self, staff_id: &str) -> bool {
        self.latest.get(staff_id).map_or(self.partner_default, |(_, flag_on)| *flag_on)
    }
}
