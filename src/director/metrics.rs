use crate::director::context::{SnapshotStatus, TickReport};
use crate::input::MovementIntent;

const ALPHA: f32 = 0.1; // EWMA smoothing factor

/// Running counters for the tick loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectorStats {
    pub ticks: u64,
    pub idle_ticks: u64,
    pub missing_snapshots: u64,
    pub stale_snapshots: u64,
    pub recenters: u64,
    pub drag_moves: u64,
    pub releases: u64,
    pub replans: u64,
    pub failed_dispatches: u64,

    pub avg_tick_us: f32,
    pub max_tick_us: u64,
    pub avg_load_us: f32,
    pub avg_select_us: f32,
    pub avg_actuate_us: f32,
}

impl DirectorStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn update_ewma(current: f32, new_value: u64, alpha: f32) -> f32 {
        current * (1.0 - alpha) + new_value as f32 * alpha
    }

    pub fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        match report.status {
            SnapshotStatus::Missing => self.missing_snapshots += 1,
            SnapshotStatus::Stale | SnapshotStatus::Unidentified => self.stale_snapshots += 1,
            SnapshotStatus::Fresh => {}
        }
        if report.intents.is_empty() {
            self.idle_ticks += 1;
        }
        for intent in &report.intents {
            match intent {
                MovementIntent::Recenter { .. } => self.recenters += 1,
                MovementIntent::DragMove { .. } => self.drag_moves += 1,
                MovementIntent::ReleaseDrag => self.releases += 1,
            }
        }
        if report.replanned {
            self.replans += 1;
        }
        self.failed_dispatches += report.failed_dispatches as u64;

        let timings = &report.timings;
        self.avg_tick_us = Self::update_ewma(self.avg_tick_us, timings.total_us, ALPHA);
        self.max_tick_us = self.max_tick_us.max(timings.total_us);
        self.avg_load_us = Self::update_ewma(self.avg_load_us, timings.load_us, ALPHA);
        self.avg_select_us = Self::update_ewma(self.avg_select_us, timings.select_us, ALPHA);
        self.avg_actuate_us = Self::update_ewma(self.avg_actuate_us, timings.actuate_us, ALPHA);
    }

    pub fn log_summary(&self) {
        tracing::info!(
            "Director: {} ticks ({} idle), {} missing / {} stale snapshots, {} recenters, {} drag moves, {} releases, {} replans, tick avg {:.0}us max {}us",
            self.ticks,
            self.idle_ticks,
            self.missing_snapshots,
            self.stale_snapshots,
            self.recenters,
            self.drag_moves,
            self.releases,
            self.replans,
            self.avg_tick_us,
            self.max_tick_us
        );
        if self.failed_dispatches > 0 {
            tracing::warn!("Director: {} intents failed to dispatch", self.failed_dispatches);
        }
        tracing::debug!(
            "Director stages: load {:.0}us, select {:.0}us, actuate {:.0}us",
            self.avg_load_us,
            self.avg_select_us,
            self.avg_actuate_us
        );
    }
}
