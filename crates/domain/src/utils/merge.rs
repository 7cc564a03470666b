//! Combining partial timesheet sets
//!
//! A batch of lesson events can build several partial timesheets for the
//! same staff, location and date. They are folded together by key; output
//! keeps first-seen key order so results are deterministic.

use ahash::AHashMap;

use crate::errors::{Result, TimesheetError};
use crate::types::{Timesheet, TimesheetKey};

/// Merge `incoming` into `accumulated`.
///
/// Disjoint keys are appended; shared keys are combined with
/// [`Timesheet::merge`].
///
/// # Errors
///
/// Returns the generic merge conflict when two timesheets sharing a key
/// disagree on a scalar field.
pub fn merge_timesheet_lists(
    accumulated: Vec<Timesheet>,
    incoming: Vec<Timesheet>,
) -> Result<Vec<Timesheet>> {
    let mut slots: Vec<Option<Timesheet>> =
        Vec::with_capacity(accumulated.len() + incoming.len());
    let mut index: AHashMap<TimesheetKey, usize> = AHashMap::new();

    for timesheet in accumulated.into_iter().chain(incoming) {
        match index.get(&timesheet.key()) {
            Some(&slot) => {
                let existing = slots[slot].take().ok_or_else(TimesheetError::merge_failed)?;
                slots[slot] = Some(existing.merge(timesheet)?);
            }
            None => {
                index.insert(timesheet.key(), slots.len());
                slots.push(Some(timesheet));
            }
        }
    }
    Ok(slots.into_iter().flatten().collect())
}
