//! # Telemetry
//!
//! A [`TaxiTm`] record is produced on every cycle and handed to each registered [`TmSink`]. Sinks
//! decide for themselves what to keep, so the control loop never has to know how often anything is
//! logged.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::Path;

use log::info;
use serde::Serialize;

use crate::obs_avoid::ObsAction;
use util::{
    archive::{ArchiveError, Archiver},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Telemetry archive file, relative to the session archive directory.
pub const TM_ARCHIVE_PATH: &str = "taxi_tm.csv";

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Consumer of per-cycle telemetry.
pub trait TmSink {
    fn send(&mut self, tm: &TaxiTm) -> Result<(), TmError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry for one control cycle.
#[derive(Debug, Clone, Serialize)]
pub struct TaxiTm {
    pub cycle: u64,

    /// Wall clock time of the cycle.
    ///
    /// Units: seconds since the unix epoch
    pub time_s: f64,

    /// Age of the detection record used, empty if none was usable.
    ///
    /// Units: seconds
    pub record_age_s: Option<f64>,

    pub num_objects: usize,
    pub num_decoded: usize,
    pub num_malformed: usize,
    pub packet_count: u64,

    /// Units: centimeters
    pub distance_cm: f64,

    pub action: ObsAction,
    pub reason: String,
    pub speed_factor: f64,

    /// Units: degrees
    pub lane_offset_deg: i32,

    /// Units: degrees
    pub steer_angle_deg: i32,

    pub speed: u8,

    /// Planned avoidance steering offset.
    ///
    /// Units: degrees
    pub avoid_steer_offset_deg: i32,

    pub avoid_speed: u8,
}

/// Logs a summary of every `period_cycles`-th record.
pub struct LogTmSink {
    period_cycles: u64,
}

/// Writes every record to a CSV file.
pub struct ArchiveTmSink {
    archiver: Archiver,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TmError {
    #[error("Could not archive telemetry: {0}")]
    ArchiveError(#[from] ArchiveError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LogTmSink {
    pub fn new(period_cycles: u64) -> Self {
        Self {
            period_cycles: period_cycles.max(1),
        }
    }

    /// True if the record for this cycle is logged.
    pub fn is_sampled(&self, cycle: u64) -> bool {
        cycle % self.period_cycles == 0
    }
}

impl TmSink for LogTmSink {
    fn send(&mut self, tm: &TaxiTm) -> Result<(), TmError> {
        if !self.is_sampled(tm.cycle) {
            return Ok(());
        }

        let age = match tm.record_age_s {
            Some(a) => format!("{:.3} s", a),
            None => String::from("none"),
        };

        info!(
            "[{}] {}: {} | steer {} deg (lane {:+}) speed {} | range {:.1} cm | det age {}, {} objects, {} packets",
            tm.cycle,
            tm.action,
            tm.reason,
            tm.steer_angle_deg,
            tm.lane_offset_deg,
            tm.speed,
            tm.distance_cm,
            age,
            tm.num_objects,
            tm.packet_count
        );

        Ok(())
    }
}

impl ArchiveTmSink {
    /// Archive into the session's archive directory.
    pub fn new(session: &Session) -> Result<Self, TmError> {
        Ok(Self {
            archiver: Archiver::from_path(session, TM_ARCHIVE_PATH)?,
        })
    }

    /// Archive into an explicit file.
    pub fn from_file_path<P: AsRef<Path>>(path: P) -> Result<Self, TmError> {
        Ok(Self {
            archiver: Archiver::from_file_path(path)?,
        })
    }
}

impl TmSink for ArchiveTmSink {
    fn send(&mut self, tm: &TaxiTm) -> Result<(), TmError> {
        self.archiver.serialise(tm)?;
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn tm(cycle: u64, record_age_s: Option<f64>) -> TaxiTm {
        TaxiTm {
            cycle,
            time_s: 1000.0,
            record_age_s,
            num_objects: 0,
            num_decoded: 0,
            num_malformed: 0,
            packet_count: 3,
            distance_cm: 42.0,
            action: ObsAction::Clear,
            reason: String::from("No obstacles"),
            speed_factor: 1.0,
            lane_offset_deg: -4,
            steer_angle_deg: 86,
            speed: 40,
            avoid_steer_offset_deg: -4,
            avoid_speed: 50,
        }
    }

    #[test]
    fn test_log_sampling() {
        let sink = LogTmSink::new(10);
        assert!(sink.is_sampled(0));
        assert!(!sink.is_sampled(5));
        assert!(sink.is_sampled(20));

        // A zero period logs every cycle
        assert!(LogTmSink::new(0).is_sampled(7));
    }

    #[test]
    fn test_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tm").join("taxi_tm.csv");

        let mut sink = ArchiveTmSink::from_file_path(&path).unwrap();
        sink.send(&tm(0, None)).unwrap();
        sink.send(&tm(1, Some(0.25))).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("cycle,time_s,record_age_s"));
        assert!(lines[1].starts_with("0,1000.0,,"));
        assert!(lines[2].contains("Clear"));
    }
}
