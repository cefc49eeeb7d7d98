use crate::common::NormPoint;
use crate::config::Settings;
use crate::director::state::CameraState;

/// Smallest waypoint spacing; bounds the queue length of a single replan.
pub const MIN_STEP_NORM: f64 = 1e-4;

/// Turns selected targets into a waypoint queue and eases the camera along it.
#[derive(Debug, Clone)]
pub struct PathPlanner {
    alpha: f64,
    blend_factor: f64,
    step_norm: f64,
    settle_norm: f64,
    replan_norm: f64,
}

impl PathPlanner {
    pub fn new(
        alpha: f64,
        blend_factor: f64,
        step_norm: f64,
        settle_norm: f64,
        replan_norm: f64,
    ) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            blend_factor: blend_factor.clamp(0.0, 1.0),
            step_norm: step_norm.max(MIN_STEP_NORM),
            settle_norm: settle_norm.max(0.0),
            replan_norm: replan_norm.max(0.0),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.alpha,
            settings.target_blend_factor,
            settings.waypoint_step_norm,
            settings.waypoint_settle_norm,
            settings.target_replan_norm,
        )
    }

    /// Blend raw targets against the motion anchor. Each blended point becomes
    /// the anchor for the next, so a flip in priorities moves the path only
    /// part of the way.
    pub fn blend_path(&self, state: &CameraState, points: &[NormPoint]) -> Vec<NormPoint> {
        let mut anchor = state.planned_final_target().unwrap_or(state.smoothed);
        points
            .iter()
            .map(|point| {
                let blended = NormPoint::new(
                    anchor.x + (point.x - anchor.x) * self.blend_factor,
                    anchor.y + (point.y - anchor.y) * self.blend_factor,
                );
                anchor = blended;
                blended
            })
            .collect()
    }

    pub fn needs_replan(&self, state: &CameraState, path: &[NormPoint]) -> bool {
        let Some(previous) = state.planned_final_target() else {
            return true;
        };
        let Some(next) = path.last() else {
            return false;
        };
        state.waypoints.is_empty()
            || state.waypoints.path_len() != path.len()
            || previous.distance(next) > self.replan_norm
    }

    /// Evenly spaced steps from `start` through every path point.
    pub fn build_waypoints(&self, start: NormPoint, path: &[NormPoint]) -> Vec<NormPoint> {
        let mut waypoints = Vec::new();
        let mut from = start;
        for target in path {
            let steps = ((from.distance(target) / self.step_norm).ceil() as usize).max(1);
            for step in 1..=steps {
                waypoints.push(from.lerp(target, step as f64 / steps as f64));
            }
            from = *target;
        }
        if waypoints.is_empty() {
            if let Some(last) = path.last() {
                waypoints.push(*last);
            }
        }
        waypoints
    }

    /// Blend `points` and rebuild the queue when the path moved materially.
    /// Returns whether a rebuild happened.
    pub fn plan(&self, state: &mut CameraState, points: &[NormPoint]) -> bool {
        if points.is_empty() {
            state.clear_plan();
            return false;
        }
        let path = self.blend_path(state, points);
        if !self.needs_replan(state, &path) {
            return false;
        }
        let Some(final_target) = path.last().copied() else {
            return false;
        };
        let waypoints = self.build_waypoints(state.smoothed, &path);
        tracing::debug!(
            "Replanned {} waypoint(s) towards ({:.3}, {:.3})",
            waypoints.len(),
            final_target.x,
            final_target.y
        );
        state.waypoints.replace(waypoints, final_target, path.len());
        true
    }

    /// Exponential moving average towards the head waypoint.
    pub fn smooth(&self, state: &mut CameraState) {
        let Some(head) = state.waypoints.head() else {
            return;
        };
        state.smoothed = NormPoint::new(
            self.alpha * head.x + (1.0 - self.alpha) * state.smoothed.x,
            self.alpha * head.y + (1.0 - self.alpha) * state.smoothed.y,
        );
        self.settle(state, state.smoothed);
    }

    /// Advance past the head waypoint if `position` is within the settle
    /// distance of it.
    pub fn settle(&self, state: &mut CameraState, position: NormPoint) -> bool {
        match state.waypoints.head() {
            Some(head) if position.distance(&head) <= self.settle_norm => {
                state.waypoints.advance();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> PathPlanner {
        PathPlanner::new(0.5, 0.5, 0.1, 0.02, 0.1)
    }

    fn close(a: NormPoint, x: f64, y: f64) -> bool {
        (a.x - x).abs() < 1e-9 && (a.y - y).abs() < 1e-9
    }

    #[test]
    fn blending_chains_from_previous_blended_point() {
        let mut state = CameraState::new();
        state.smoothed = NormPoint::new(0.0, 0.0);
        let path = planner().blend_path(
            &state,
            &[NormPoint::new(1.0, 0.0), NormPoint::new(1.0, 1.0)],
        );
        assert!(close(path[0], 0.5, 0.0));
        // Second point blends from (0.5, 0), not from the raw (1, 0).
        assert!(close(path[1], 0.75, 0.5));
    }

    #[test]
    fn blending_prefers_planned_final_target_as_anchor() {
        let mut state = CameraState::new();
        state.smoothed = NormPoint::new(0.0, 0.0);
        let anchor = NormPoint::new(0.8, 0.8);
        state.waypoints.replace(vec![anchor], anchor, 1);
        let path = planner().blend_path(&state, &[NormPoint::new(0.4, 0.8)]);
        assert!(close(path[0], 0.6, 0.8));
    }

    #[test]
    fn waypoints_are_evenly_spaced_and_end_on_target() {
        let waypoints = planner().build_waypoints(
            NormPoint::new(0.1, 0.5),
            &[NormPoint::new(0.45, 0.5)],
        );
        assert_eq!(waypoints.len(), 4);
        assert!(close(waypoints[3], 0.45, 0.5));
        for pair in waypoints.windows(2) {
            assert!(pair[0].distance(&pair[1]) <= 0.1 + 1e-9);
        }
    }

    #[test]
    fn tiny_step_is_floored() {
        let p = PathPlanner::new(0.5, 0.5, 1e-12, 0.02, 0.1);
        let waypoints = p.build_waypoints(NormPoint::new(0.0, 0.0), &[NormPoint::new(1.0, 1.0)]);
        let bound = (2f64.sqrt() / MIN_STEP_NORM).ceil() as usize;
        assert!(waypoints.len() <= bound);
        assert_eq!(waypoints.last().copied(), Some(NormPoint::new(1.0, 1.0)));
    }

    #[test]
    fn zero_distance_still_enqueues_target() {
        let here = NormPoint::new(0.3, 0.3);
        let waypoints = planner().build_waypoints(here, &[here]);
        assert_eq!(waypoints, vec![here]);
    }

    #[test]
    fn replans_only_on_material_change() {
        let p = planner();
        let mut state = CameraState::new();
        assert!(p.plan(&mut state, &[NormPoint::new(0.7, 0.5)]));
        let queued = state.waypoints.clone();

        // Same target again: blended final drifts less than the replan threshold.
        assert!(!p.plan(&mut state, &[NormPoint::new(0.62, 0.5)]));
        assert_eq!(state.waypoints, queued);

        // Point count changed.
        assert!(p.plan(
            &mut state,
            &[NormPoint::new(0.6, 0.5), NormPoint::new(0.6, 0.6)]
        ));
        assert_eq!(state.waypoints.path_len(), 2);

        // Large divergence.
        let before = state.planned_final_target().expect("planned");
        assert!(p.plan(
            &mut state,
            &[NormPoint::new(0.0, 0.0), NormPoint::new(0.0, 0.0)]
        ));
        let after = state.planned_final_target().expect("planned");
        assert!(before.distance(&after) > 0.1);
    }

    #[test]
    fn drained_queue_forces_replan() {
        let p = planner();
        let mut state = CameraState::new();
        p.plan(&mut state, &[NormPoint::new(0.52, 0.5)]);
        while !state.waypoints.is_empty() {
            state.waypoints.advance();
        }
        assert!(state.planned_final_target().is_none());
        assert!(p.plan(&mut state, &[NormPoint::new(0.52, 0.5)]));
    }

    #[test]
    fn smoothing_converges_and_drains_queue() {
        let p = planner();
        let mut state = CameraState::new();
        p.plan(&mut state, &[NormPoint::new(0.9, 0.1)]);
        for _ in 0..200 {
            p.smooth(&mut state);
        }
        assert!(state.waypoints.is_empty());
        assert!(state.planned_final_target().is_none());
        assert!(state.smoothed.distance(&NormPoint::new(0.7, 0.3)) <= 0.02 + 1e-9);
    }

    #[test]
    fn queue_stays_in_unit_square_for_any_targets() {
        let p = PathPlanner::new(0.4, 1.0, 0.03, 0.01, 0.05);
        let mut state = CameraState::new();
        let targets = [
            NormPoint { x: 1.4, y: -0.3 },
            NormPoint { x: -2.0, y: 0.5 },
            NormPoint { x: 0.5, y: 3.0 },
            NormPoint { x: 0.99, y: 0.01 },
        ];
        for i in 0..40 {
            let a = targets[i % targets.len()];
            let b = targets[(i + 1) % targets.len()];
            p.plan(&mut state, &[a, b]);
            p.smooth(&mut state);
            assert!(state.waypoints.iter().all(|w| w.is_normalized()));
            assert!(state.smoothed.is_normalized());
            assert_eq!(
                state.planned_final_target().is_none(),
                state.waypoints.is_empty()
            );
        }
    }
}
