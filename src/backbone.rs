use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::keys::MonthKey;

/// One month of the canonical analysis window: the first-of-month date plus
/// its join key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackboneRow {
    pub date: NaiveDate,
    pub month: MonthKey,
}

/// Build the contiguous month sequence for the closed window [start, end].
/// This is the single source of truth for which months exist; every join is
/// driven from it so a missing source value shows up as an explicit null
/// instead of a silently absent row.
pub fn build_backbone(start: MonthKey, end: MonthKey) -> Vec<BackboneRow> {
    let mut rows = Vec::new();
    let mut current = start;
    while current <= end {
        rows.push(BackboneRow {
            date: current.first_day(),
            month: current,
        });
        current = current.succ();
    }
    rows
}
