//! Freshness gate for detection records

use std::sync::Arc;

use log::debug;

use comms_if::eqpt::det::DetectionRecord;

/// Default maximum age of a usable record.
///
/// Units: seconds
pub const DEFAULT_STALENESS_BUDGET_S: f64 = 0.5;

/// Returns the record if it is still usable at `now_s`, otherwise `None`.
///
/// A record is stale once `now_s - record.timestamp` exceeds `staleness_budget_s`. A stale record
/// is indistinguishable from one that never arrived.
pub fn usable(
    record: Option<Arc<DetectionRecord>>,
    now_s: f64,
    staleness_budget_s: f64,
) -> Option<Arc<DetectionRecord>> {
    let record = record?;
    let age_s = record.age_s(now_s);

    // NaN ages fail the comparison and are treated as stale
    if age_s <= staleness_budget_s {
        Some(record)
    } else {
        debug!(
            "Detection record {} is stale ({:.3} s old)",
            record.frame_id_str(),
            age_s
        );
        None
    }
}
