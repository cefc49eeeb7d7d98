use crate::common::NormPoint;
use crate::config::Settings;
use crate::director::planner::PathPlanner;
use crate::director::selector::TargetSelection;
use crate::director::state::CameraState;
use crate::input::{InputInjector, MovementIntent};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActuationPhase {
    /// No usable target, or nothing held.
    Idle,
    /// A discrete jump was issued this tick.
    Recentering,
    /// A drag is held, moving or not.
    Dragging,
}

/// What one tick of the machine did.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuationOutcome {
    pub phase: ActuationPhase,
    pub intents: Vec<MovementIntent>,
    pub replanned: bool,
    pub failed_dispatches: usize,
}

impl ActuationOutcome {
    fn new() -> Self {
        Self {
            phase: ActuationPhase::Idle,
            intents: Vec::new(),
            replanned: false,
            failed_dispatches: 0,
        }
    }
}

/// Decides between recentering, dragging and releasing, under the timing
/// gates. All mutation happens on the `CameraState` passed in.
#[derive(Debug, Clone)]
pub struct ActuationMachine {
    planner: PathPlanner,
    deadzone: f64,
    max_step_norm: f64,
    recenter_threshold: f64,
    min_action_interval_ms: i64,
    min_click_interval_ms: i64,
    drag_release_ms: i64,
}

impl ActuationMachine {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            planner: PathPlanner::from_settings(settings),
            deadzone: settings.deadzone,
            max_step_norm: settings.max_step_norm,
            recenter_threshold: settings.recenter_threshold,
            min_action_interval_ms: settings.min_action_interval_ms as i64,
            min_click_interval_ms: settings.min_click_interval_ms as i64,
            drag_release_ms: settings.drag_release_ms as i64,
        }
    }

    pub fn planner(&self) -> &PathPlanner {
        &self.planner
    }

    pub fn tick(
        &self,
        state: &mut CameraState,
        selection: Option<&TargetSelection>,
        now_ms: i64,
        injector: &mut dyn InputInjector,
    ) -> ActuationOutcome {
        let mut outcome = ActuationOutcome::new();

        let points = match selection {
            Some(selection) if selection.has_targets() => selection.points.as_slice(),
            _ => {
                self.go_idle(state, injector, &mut outcome);
                return outcome;
            }
        };
        let target = points[0];
        state.current_target = Some(target);

        let click_ready = now_ms - state.last_click_ms >= self.min_click_interval_ms;
        let far_off = target.offset_from_center() >= self.recenter_threshold;
        if !state.viewport_placed || (far_off && !state.is_dragging && click_ready) {
            if self.recenter(state, points, now_ms, injector, &mut outcome) {
                outcome.phase = ActuationPhase::Recentering;
                return outcome;
            }
        }

        // No drag before the viewport has been placed once.
        if !state.viewport_placed {
            outcome.phase = ActuationPhase::Idle;
            return outcome;
        }

        outcome.replanned = self.planner.plan(state, points);
        self.planner.smooth(state);

        if now_ms - state.last_action_ms < self.min_action_interval_ms {
            self.release_if_stale(state, now_ms, injector, &mut outcome);
            outcome.phase = Self::resting_phase(state);
            return outcome;
        }

        self.drag_step(state, now_ms, injector, &mut outcome);
        outcome
    }

    /// Release any held drag. Used on shutdown.
    pub fn release(
        &self,
        state: &mut CameraState,
        injector: &mut dyn InputInjector,
    ) -> Vec<MovementIntent> {
        let mut outcome = ActuationOutcome::new();
        Self::release_drag(state, injector, &mut outcome);
        outcome.intents
    }

    fn go_idle(
        &self,
        state: &mut CameraState,
        injector: &mut dyn InputInjector,
        outcome: &mut ActuationOutcome,
    ) {
        Self::release_drag(state, injector, outcome);
        state.clear_plan();
        state.current_target = None;
        outcome.phase = ActuationPhase::Idle;
    }

    /// Hard cut to `points[0]` with a click. Returns false if the injector
    /// refused, in which case the viewport placement is unchanged.
    fn recenter(
        &self,
        state: &mut CameraState,
        points: &[NormPoint],
        now_ms: i64,
        injector: &mut dyn InputInjector,
        outcome: &mut ActuationOutcome,
    ) -> bool {
        let target = points[0];
        Self::release_drag(state, injector, outcome);
        if !Self::emit(
            injector,
            MovementIntent::Recenter {
                x: target.x,
                y: target.y,
            },
            outcome,
        ) {
            return false;
        }

        tracing::info!(
            "Recentered on ({:.3}, {:.3}), offset {:.3}",
            target.x,
            target.y,
            target.offset_from_center()
        );
        state.smoothed = target;
        state.last_applied = target;
        state.viewport_placed = true;
        state.last_click_ms = now_ms;
        state.last_action_ms = now_ms;
        state.clear_plan();
        if points.len() > 1 {
            outcome.replanned = self.planner.plan(state, &points[1..]);
        }
        true
    }

    fn drag_step(
        &self,
        state: &mut CameraState,
        now_ms: i64,
        injector: &mut dyn InputInjector,
        outcome: &mut ActuationOutcome,
    ) {
        let max_step = self.max_step_norm;
        let dx = (state.smoothed.x - state.last_applied.x).clamp(-max_step, max_step);
        let dy = (state.smoothed.y - state.last_applied.y).clamp(-max_step, max_step);
        if dx.abs() < self.deadzone && dy.abs() < self.deadzone {
            self.release_if_stale(state, now_ms, injector, outcome);
            outcome.phase = Self::resting_phase(state);
            return;
        }

        if !state.is_dragging {
            let start = state.last_applied;
            if !Self::emit(
                injector,
                MovementIntent::DragMove {
                    x: start.x,
                    y: start.y,
                },
                outcome,
            ) {
                outcome.phase = Self::resting_phase(state);
                return;
            }
            state.is_dragging = true;
        }

        let next = NormPoint::new(state.last_applied.x + dx, state.last_applied.y + dy);
        if Self::emit(injector, MovementIntent::DragMove { x: next.x, y: next.y }, outcome) {
            state.last_applied = next;
            state.last_movement_ms = now_ms;
            state.last_action_ms = now_ms;
            self.planner.settle(state, next);
        }
        outcome.phase = ActuationPhase::Dragging;
    }

    fn release_if_stale(
        &self,
        state: &mut CameraState,
        now_ms: i64,
        injector: &mut dyn InputInjector,
        outcome: &mut ActuationOutcome,
    ) {
        if state.is_dragging && now_ms - state.last_movement_ms >= self.drag_release_ms {
            Self::release_drag(state, injector, outcome);
        }
    }

    fn release_drag(
        state: &mut CameraState,
        injector: &mut dyn InputInjector,
        outcome: &mut ActuationOutcome,
    ) {
        if !state.is_dragging {
            return;
        }
        Self::emit(injector, MovementIntent::ReleaseDrag, outcome);
        // A failed release still ends the gesture on our side.
        state.is_dragging = false;
    }

    fn emit(
        injector: &mut dyn InputInjector,
        intent: MovementIntent,
        outcome: &mut ActuationOutcome,
    ) -> bool {
        match injector.dispatch(intent) {
            Ok(()) => {
                outcome.intents.push(intent);
                true
            }
            Err(e) => {
                outcome.failed_dispatches += 1;
                tracing::warn!("{} failed to dispatch {}: {}", injector.name(), intent.name(), e);
                false
            }
        }
    }

    fn resting_phase(state: &CameraState) -> ActuationPhase {
        if state.is_dragging {
            ActuationPhase::Dragging
        } else {
            ActuationPhase::Idle
        }
    }
}
