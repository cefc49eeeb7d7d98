use crate::common::NormPoint;
use crate::config::Settings;
use crate::director::clustering::{self, Cluster, pixel_centroid};
use crate::snapshot::{Detection, DetectionSnapshot, Team};
use serde::Serialize;

type StageFn = fn(&PrioritySelector, &[Detection], u32, u32) -> Vec<NormPoint>;

/// Most points of interest a single selection returns.
pub const MAX_TARGETS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SelectionStrategy {
    /// Players of both teams fighting each other.
    Engagement,
    /// Players pushing an enemy tower or nexus.
    StructurePressure,
    /// Groups of a single team's players.
    PerTeam,
    /// Centroid of every player, or of every detection.
    Centroid,
    /// Nothing was detected.
    FrameCenter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetSelection {
    pub points: Vec<NormPoint>,
    pub strategy: SelectionStrategy,
}

impl TargetSelection {
    /// `FrameCenter` carries a point but is not something worth moving to.
    pub fn has_targets(&self) -> bool {
        self.strategy != SelectionStrategy::FrameCenter && !self.points.is_empty()
    }

    pub fn primary(&self) -> Option<NormPoint> {
        self.points.first().copied()
    }
}

/// Priority cascade over the detections of one frame. The first stage that
/// yields anything wins.
pub struct PrioritySelector {
    player_pair_threshold_px: f64,
    structure_threshold_px: f64,
}

struct RankedCluster {
    size: usize,
    spread: f64,
    centroid: NormPoint,
}

impl PrioritySelector {
    pub fn new(player_pair_threshold_px: f64, structure_threshold_px: f64) -> Self {
        Self {
            player_pair_threshold_px,
            structure_threshold_px,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.player_pair_threshold_px,
            settings.structure_threshold_px,
        )
    }

    pub fn select(&self, snapshot: &DetectionSnapshot) -> TargetSelection {
        self.select_from(&snapshot.detections, snapshot.width, snapshot.height)
    }

    pub fn select_from(
        &self,
        detections: &[Detection],
        width: u32,
        height: u32,
    ) -> TargetSelection {
        let stages: [(SelectionStrategy, StageFn); 3] = [
            (SelectionStrategy::Engagement, Self::engagement_targets),
            (SelectionStrategy::StructurePressure, Self::structure_pressure_targets),
            (SelectionStrategy::PerTeam, Self::per_team_targets),
        ];
        for (strategy, stage) in stages {
            let points = stage(self, detections, width, height);
            if !points.is_empty() {
                return TargetSelection { points, strategy };
            }
        }
        Self::fallback(detections, width, height)
    }

    fn engagement_targets(
        &self,
        detections: &[Detection],
        width: u32,
        height: u32,
    ) -> Vec<NormPoint> {
        let players: Vec<Detection> = detections
            .iter()
            .filter(|d| d.kind.is_player())
            .cloned()
            .collect();
        let threshold = self.player_pair_threshold_px;
        let clusters =
            clustering::cluster(&players, |a, b| clustering::player_link(a, b, threshold));
        let engaged = clusters
            .into_iter()
            .filter(|c| c.has_player_of(Team::Blue) && c.has_player_of(Team::Red));
        Self::ranked_centroids(engaged, width, height)
            .into_iter()
            .take(MAX_TARGETS)
            .collect()
    }

    fn structure_pressure_targets(
        &self,
        detections: &[Detection],
        width: u32,
        height: u32,
    ) -> Vec<NormPoint> {
        let candidates: Vec<Detection> = detections
            .iter()
            .filter(|d| d.kind.is_player() || d.kind.is_structure())
            .cloned()
            .collect();
        let player_px = self.player_pair_threshold_px;
        let structure_px = self.structure_threshold_px;
        let clusters = clustering::cluster(&candidates, |a, b| {
            clustering::player_link(a, b, player_px)
                || clustering::structure_link(a, b, structure_px)
        });
        let pressured = clusters.into_iter().filter(|c| {
            Team::ALL
                .iter()
                .any(|team| c.has_player_of(*team) && c.has_structure_of(team.opponent()))
        });
        Self::ranked_centroids(pressured, width, height)
            .into_iter()
            .take(MAX_TARGETS)
            .collect()
    }

    fn per_team_targets(
        &self,
        detections: &[Detection],
        width: u32,
        height: u32,
    ) -> Vec<NormPoint> {
        let threshold = self.player_pair_threshold_px;
        let mut points = Vec::with_capacity(MAX_TARGETS);
        for team in Team::ALL {
            let players: Vec<Detection> = detections
                .iter()
                .filter(|d| d.kind.is_player() && d.team() == Some(team))
                .cloned()
                .collect();
            let clusters =
                clustering::cluster(&players, |a, b| clustering::player_link(a, b, threshold));
            for centroid in Self::ranked_centroids(clusters, width, height) {
                if points.len() == MAX_TARGETS {
                    return points;
                }
                points.push(centroid);
            }
        }
        points
    }

    fn fallback(detections: &[Detection], width: u32, height: u32) -> TargetSelection {
        let players: Vec<Detection> = detections
            .iter()
            .filter(|d| d.kind.is_player())
            .cloned()
            .collect();
        if !players.is_empty() {
            return TargetSelection {
                points: vec![pixel_centroid(&players, width, height)],
                strategy: SelectionStrategy::Centroid,
            };
        }
        if !detections.is_empty() {
            return TargetSelection {
                points: vec![pixel_centroid(detections, width, height)],
                strategy: SelectionStrategy::Centroid,
            };
        }
        TargetSelection {
            points: vec![NormPoint::CENTER],
            strategy: SelectionStrategy::FrameCenter,
        }
    }

    /// Largest first, then tightest, then by position for a stable order.
    fn ranked_centroids(
        clusters: impl IntoIterator<Item = Cluster>,
        width: u32,
        height: u32,
    ) -> Vec<NormPoint> {
        let mut ranked: Vec<RankedCluster> = clusters
            .into_iter()
            .filter(|c| !c.is_empty())
            .map(|c| RankedCluster {
                size: c.len(),
                spread: c.spread(width, height),
                centroid: c.centroid(width, height),
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.size
                .cmp(&a.size)
                .then_with(|| a.spread.total_cmp(&b.spread))
                .then_with(|| a.centroid.x.total_cmp(&b.centroid.x))
                .then_with(|| a.centroid.y.total_cmp(&b.centroid.y))
        });
        ranked.into_iter().map(|r| r.centroid).collect()
    }
}
