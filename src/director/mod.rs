pub mod actuation;
pub mod clustering;
pub mod context;
pub mod metrics;
pub mod planner;
pub mod selector;
pub mod state;

pub use actuation::{ActuationMachine, ActuationPhase};
pub use context::{SnapshotStatus, StageType, TickContext, TickReport};
pub use metrics::DirectorStats;
pub use planner::PathPlanner;
pub use selector::{PrioritySelector, SelectionStrategy, TargetSelection};
pub use state::CameraState;

use crate::config::Settings;
use crate::input::{InputInjector, MovementIntent};
use crate::snapshot::{DetectionSnapshot, SnapshotLoader};
use chrono::{DateTime, Utc};
use std::time::Instant;

/// One tick = load the latest snapshot, pick targets, move the camera.
///
/// The director owns the `CameraState` and the injector; nothing else
/// mutates either, so calling `tick` from a single task is all the
/// serialization needed.
pub struct Director {
    loader: SnapshotLoader,
    selector: PrioritySelector,
    machine: ActuationMachine,
    state: CameraState,
    injector: Box<dyn InputInjector>,
    stats: DirectorStats,
    stale_ms: u64,
    last_status: Option<SnapshotStatus>,
}

impl Director {
    pub fn new(settings: &Settings, injector: Box<dyn InputInjector>) -> Self {
        Self {
            loader: SnapshotLoader::from_settings(settings),
            selector: PrioritySelector::from_settings(settings),
            machine: ActuationMachine::from_settings(settings),
            state: CameraState::new(),
            injector,
            stats: DirectorStats::new(),
            stale_ms: settings.stale_ms,
            last_status: None,
        }
    }

    /// Run one tick against the newest record on disk.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let mut ctx = TickContext::new(now);
        let load_start = Instant::now();
        ctx.snapshot = self.loader.latest();
        ctx.timings
            .record_duration(StageType::Load, load_start.elapsed().as_micros() as u64);
        self.run(ctx)
    }

    /// Run one tick against a snapshot obtained elsewhere.
    pub fn tick_with(
        &mut self,
        snapshot: Option<DetectionSnapshot>,
        now: DateTime<Utc>,
    ) -> TickReport {
        let mut ctx = TickContext::new(now);
        ctx.snapshot = snapshot;
        self.run(ctx)
    }

    fn run(&mut self, mut ctx: TickContext) -> TickReport {
        ctx.status = self.classify(ctx.snapshot.as_ref(), ctx.now);
        self.note_status(ctx.status, ctx.snapshot.as_ref(), ctx.now);

        if ctx.status == SnapshotStatus::Fresh {
            if let Some(snapshot) = &ctx.snapshot {
                let select_start = Instant::now();
                let selection = self.selector.select(snapshot);
                tracing::debug!(
                    "Frame {}: {:?} picked {} point(s) from {} detection(s)",
                    snapshot.frame_id,
                    selection.strategy,
                    selection.points.len(),
                    snapshot.detections.len()
                );
                ctx.selection = Some(selection);
                ctx.timings
                    .record_duration(StageType::Select, select_start.elapsed().as_micros() as u64);
            }
        }

        let actuate_start = Instant::now();
        let outcome = self.machine.tick(
            &mut self.state,
            ctx.usable_selection(),
            ctx.now_ms(),
            self.injector.as_mut(),
        );
        ctx.timings
            .record_duration(StageType::Actuate, actuate_start.elapsed().as_micros() as u64);
        ctx.timings.finalize(ctx.started);

        let report = TickReport {
            frame_id: ctx.snapshot.as_ref().map(|s| s.frame_id.clone()),
            status: ctx.status,
            strategy: ctx.selection.as_ref().map(|s| s.strategy),
            phase: outcome.phase,
            intents: outcome.intents,
            replanned: outcome.replanned,
            failed_dispatches: outcome.failed_dispatches,
            timings: ctx.timings,
        };
        self.stats.record(&report);
        report
    }

    fn classify(&self, snapshot: Option<&DetectionSnapshot>, now: DateTime<Utc>) -> SnapshotStatus {
        match snapshot {
            None => SnapshotStatus::Missing,
            Some(snapshot) if snapshot.frame_id.trim().is_empty() => SnapshotStatus::Unidentified,
            Some(snapshot) if snapshot.is_stale(now, self.stale_ms) => SnapshotStatus::Stale,
            Some(_) => SnapshotStatus::Fresh,
        }
    }

    fn note_status(
        &mut self,
        status: SnapshotStatus,
        snapshot: Option<&DetectionSnapshot>,
        now: DateTime<Utc>,
    ) {
        if self.last_status == Some(status) {
            return;
        }
        match (status, snapshot) {
            (SnapshotStatus::Fresh, Some(snapshot)) => {
                tracing::debug!("Detections resumed at frame {}", snapshot.frame_id)
            }
            (SnapshotStatus::Stale, Some(snapshot)) => tracing::debug!(
                "Frame {} is stale ({}ms old), holding camera",
                snapshot.frame_id,
                snapshot.age_ms(now)
            ),
            _ => tracing::debug!("Snapshot status now {:?}", status),
        }
        self.last_status = Some(status);
    }

    /// Release any held drag and flush the injector. Called on shutdown.
    pub fn release(&mut self) -> Vec<MovementIntent> {
        let intents = self.machine.release(&mut self.state, self.injector.as_mut());
        if let Err(e) = self.injector.flush() {
            tracing::warn!("{} flush failed: {}", self.injector.name(), e);
        }
        intents
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn stats(&self) -> &DirectorStats {
        &self.stats
    }

    pub fn injector_name(&self) -> &'static str {
        self.injector.name()
    }

    pub fn detections_dir(&self) -> &std::path::Path {
        self.loader.dir()
    }
}
