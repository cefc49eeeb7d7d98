//! Connected-component grouping of detections.
//!
//! Detections are graph nodes; two nodes share an edge when the link
//! predicate holds in either direction. Each component is discovered with a
//! breadth-first walk, so membership depends only on connectivity and never
//! on input order.

use crate::common::NormPoint;
use crate::snapshot::{Detection, Team};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct Cluster {
    pub members: Vec<Detection>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Mean pixel position normalized by frame size.
    pub fn centroid(&self, width: u32, height: u32) -> NormPoint {
        pixel_centroid(&self.members, width, height)
    }

    /// Mean normalized distance of members to the centroid.
    pub fn spread(&self, width: u32, height: u32) -> f64 {
        if self.members.is_empty() {
            return 0.0;
        }
        let centroid = self.centroid(width, height);
        let total: f64 = self
            .members
            .iter()
            .map(|m| m.norm_point().distance(&centroid))
            .sum();
        total / self.members.len() as f64
    }

    pub fn has_player_of(&self, team: Team) -> bool {
        self.members
            .iter()
            .any(|m| m.kind.is_player() && m.team() == Some(team))
    }

    pub fn has_structure_of(&self, team: Team) -> bool {
        self.members
            .iter()
            .any(|m| m.kind.is_structure() && m.team() == Some(team))
    }
}

pub fn pixel_centroid(members: &[Detection], width: u32, height: u32) -> NormPoint {
    if members.is_empty() || width == 0 || height == 0 {
        return NormPoint::CENTER;
    }
    let n = members.len() as f64;
    let mean_x = members.iter().map(|m| m.pixel_x).sum::<f64>() / n;
    let mean_y = members.iter().map(|m| m.pixel_y).sum::<f64>() / n;
    NormPoint::new(mean_x / width as f64, mean_y / height as f64)
}

/// Partition `detections` into components under `link`.
pub fn cluster<F>(detections: &[Detection], link: F) -> Vec<Cluster>
where
    F: Fn(&Detection, &Detection) -> bool,
{
    let mut visited = vec![false; detections.len()];
    let mut clusters = Vec::new();

    for start in 0..detections.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut frontier = VecDeque::from([start]);
        let mut members = Vec::new();

        while let Some(i) = frontier.pop_front() {
            members.push(detections[i].clone());
            for j in 0..detections.len() {
                if visited[j] {
                    continue;
                }
                let (a, b) = (&detections[i], &detections[j]);
                if link(a, b) || link(b, a) {
                    visited[j] = true;
                    frontier.push_back(j);
                }
            }
        }
        clusters.push(Cluster { members });
    }

    clusters
}

/// Two players within `threshold_px` of each other, regardless of team.
pub fn player_link(a: &Detection, b: &Detection, threshold_px: f64) -> bool {
    a.kind.is_player() && b.kind.is_player() && a.pixel_distance(b) <= threshold_px
}

/// A player within `threshold_px` of an opposing team's structure.
pub fn structure_link(a: &Detection, b: &Detection, threshold_px: f64) -> bool {
    let (player, structure) = if a.kind.is_player() && b.kind.is_structure() {
        (a, b)
    } else if b.kind.is_player() && a.kind.is_structure() {
        (b, a)
    } else {
        return false;
    };
    match (player.team(), structure.team()) {
        (Some(attacker), Some(owner)) if attacker != owner => {
            player.pixel_distance(structure) <= threshold_px
        }
        _ => false,
    }
}
