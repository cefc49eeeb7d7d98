use crate::common::NormPoint;
use std::collections::VecDeque;

/// FIFO of intermediate points towards the planned path's last point.
///
/// The planned final target is present exactly when the queue is non-empty;
/// every mutation goes through methods that keep the two in step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaypointQueue {
    points: VecDeque<NormPoint>,
    final_target: Option<NormPoint>,
    path_len: usize,
}

impl WaypointQueue {
    pub fn head(&self) -> Option<NormPoint> {
        self.points.front().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormPoint> {
        self.points.iter()
    }

    pub fn final_target(&self) -> Option<NormPoint> {
        self.final_target
    }

    /// Number of points in the path the queue was last built from.
    pub fn path_len(&self) -> usize {
        self.path_len
    }

    /// Replace the queue. Points are clamped; an empty `waypoints` clears.
    pub fn replace(&mut self, waypoints: Vec<NormPoint>, final_target: NormPoint, path_len: usize) {
        if waypoints.is_empty() {
            self.clear();
            return;
        }
        self.points = waypoints
            .into_iter()
            .map(|p| NormPoint::new(p.x, p.y))
            .collect();
        self.final_target = Some(NormPoint::new(final_target.x, final_target.y));
        self.path_len = path_len;
    }

    /// Drop the head waypoint; clears the final target once drained.
    pub fn advance(&mut self) -> Option<NormPoint> {
        let reached = self.points.pop_front();
        if self.points.is_empty() {
            self.final_target = None;
            self.path_len = 0;
        }
        reached
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.final_target = None;
        self.path_len = 0;
    }
}

/// The single mutable record the tick loop owns. Timestamps are epoch
/// milliseconds; zero means "never".
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    pub smoothed: NormPoint,
    /// Last position actually sent to the injector.
    pub last_applied: NormPoint,
    pub viewport_placed: bool,
    pub is_dragging: bool,
    pub last_action_ms: i64,
    pub last_click_ms: i64,
    pub last_movement_ms: i64,
    pub current_target: Option<NormPoint>,
    pub waypoints: WaypointQueue,
}

impl CameraState {
    pub fn new() -> Self {
        Self {
            smoothed: NormPoint::CENTER,
            last_applied: NormPoint::CENTER,
            viewport_placed: false,
            is_dragging: false,
            last_action_ms: 0,
            last_click_ms: 0,
            last_movement_ms: 0,
            current_target: None,
            waypoints: WaypointQueue::default(),
        }
    }

    pub fn planned_final_target(&self) -> Option<NormPoint> {
        self.waypoints.final_target()
    }

    pub fn clear_plan(&mut self) {
        self.waypoints.clear();
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new()
    }
}
