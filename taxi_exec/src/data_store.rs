//! # Data Store

use log::warn;

use crate::tm::TaxiTm;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u64,

    // Telemetry
    /// Telemetry from the last completed cycle
    pub tm: Option<TaxiTm>,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Total number of cycle overruns in this session
    pub num_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    pub fn cycle_start(&mut self) {
        self.tm = None;
    }

    /// Perform actions required at the end of a cycle.
    pub fn cycle_end(&mut self) {
        self.num_cycles += 1;
    }

    /// Record that this cycle finished within its period.
    pub fn cycle_on_time(&mut self) {
        self.num_consec_cycle_overruns = 0;
    }

    /// Record that this cycle overran its period.
    ///
    /// A warning is issued when the number of consecutive overruns reaches `consec_limit`.
    pub fn cycle_overrun(&mut self, overrun_s: f64, consec_limit: u64) {
        self.num_consec_cycle_overruns += 1;
        self.num_cycle_overruns += 1;

        warn!("Cycle overran by {:.06} s", overrun_s);

        if consec_limit > 0 && self.num_consec_cycle_overruns == consec_limit {
            warn!(
                "{} consecutive cycle overruns, the control loop cannot keep up",
                consec_limit
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_overrun_counters() {
        let mut ds = DataStore::default();

        ds.cycle_overrun(0.01, 2);
        ds.cycle_overrun(0.01, 2);
        assert_eq!(ds.num_consec_cycle_overruns, 2);

        ds.cycle_on_time();
        ds.cycle_overrun(0.01, 2);
        assert_eq!(ds.num_consec_cycle_overruns, 1);
        assert_eq!(ds.num_cycle_overruns, 3);

        ds.cycle_end();
        assert_eq!(ds.num_cycles, 1);
    }

    #[test]
    fn test_cycle_start_clears_tm() {
        let mut ds = DataStore::default();
        ds.num_cycles = 4;

        ds.cycle_start();
        assert!(ds.tm.is_none());
        assert_eq!(ds.num_cycles, 4);
    }
}
