use crate::director::actuation::ActuationPhase;
use crate::director::selector::{SelectionStrategy, TargetSelection};
use crate::input::MovementIntent;
use crate::snapshot::DetectionSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

/// What the tick made of the latest detection record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SnapshotStatus {
    Fresh,
    /// No readable record in the directory.
    Missing,
    Stale,
    /// A record without a frame id.
    Unidentified,
}

/// State carried through the stages of one tick.
pub struct TickContext {
    pub now: DateTime<Utc>,
    pub snapshot: Option<DetectionSnapshot>,
    pub status: SnapshotStatus,
    pub selection: Option<TargetSelection>,
    pub timings: StageTimings,
    pub started: Instant,
}

impl TickContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            snapshot: None,
            status: SnapshotStatus::Missing,
            selection: None,
            timings: StageTimings::new(),
            started: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> i64 {
        self.now.timestamp_millis()
    }

    /// The selection, but only if the snapshot was usable.
    pub fn usable_selection(&self) -> Option<&TargetSelection> {
        match self.status {
            SnapshotStatus::Fresh => self.selection.as_ref(),
            _ => None,
        }
    }
}

/// Per-stage wall time of a tick, in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageTimings {
    pub load_us: u64,
    pub select_us: u64,
    pub actuate_us: u64,
    pub total_us: u64,
}

impl StageTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_duration(&mut self, stage: StageType, duration_us: u64) {
        match stage {
            StageType::Load => self.load_us = duration_us,
            StageType::Select => self.select_us = duration_us,
            StageType::Actuate => self.actuate_us = duration_us,
        }
    }

    pub fn finalize(&mut self, started: Instant) {
        self.total_us = started.elapsed().as_micros() as u64;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StageType {
    Load,
    Select,
    Actuate,
}

/// Summary of one finished tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub frame_id: Option<String>,
    pub status: SnapshotStatus,
    pub strategy: Option<SelectionStrategy>,
    pub phase: ActuationPhase,
    pub intents: Vec<MovementIntent>,
    pub replanned: bool,
    pub failed_dispatches: usize,
    pub timings: StageTimings,
}

impl TickReport {
    pub fn count_intents(&self, name: &str) -> usize {
        self.intents.iter().filter(|i| i.name() == name).count()
    }
}
