use crate::common::NormPoint;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Team {
    Blue,
    Red,
}

impl Team {
    /// Fixed enumeration order used by the per-team cascade stage.
    pub const ALL: [Team; 2] = [Team::Blue, Team::Red];

    pub fn opponent(self) -> Team {
        match self {
            Team::Blue => Team::Red,
            Team::Red => Team::Blue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DetectionKind {
    Unknown,
    BluePlayer,
    RedPlayer,
    BlueTower,
    RedTower,
    BlueNexus,
    RedNexus,
}

impl DetectionKind {
    pub fn team(self) -> Option<Team> {
        match self {
            DetectionKind::BluePlayer | DetectionKind::BlueTower | DetectionKind::BlueNexus => {
                Some(Team::Blue)
            }
            DetectionKind::RedPlayer | DetectionKind::RedTower | DetectionKind::RedNexus => {
                Some(Team::Red)
            }
            DetectionKind::Unknown => None,
        }
    }

    pub fn is_player(self) -> bool {
        matches!(self, DetectionKind::BluePlayer | DetectionKind::RedPlayer)
    }

    /// Towers and nexuses.
    pub fn is_structure(self) -> bool {
        matches!(
            self,
            DetectionKind::BlueTower
                | DetectionKind::RedTower
                | DetectionKind::BlueNexus
                | DetectionKind::RedNexus
        )
    }

    /// Numeric class ids emitted by the detector model.
    pub fn from_class_id(id: i64) -> Self {
        match id {
            0 => DetectionKind::BluePlayer,
            1 => DetectionKind::RedPlayer,
            2 => DetectionKind::BlueTower,
            3 => DetectionKind::RedTower,
            4 => DetectionKind::BlueNexus,
            5 => DetectionKind::RedNexus,
            _ => DetectionKind::Unknown,
        }
    }

    /// Case and separator insensitive: `BluePlayer`, `blue_player` and
    /// `blue-player` all map to the same kind.
    pub fn from_label(label: &str) -> Self {
        let folded: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match folded.as_str() {
            "blueplayer" => DetectionKind::BluePlayer,
            "redplayer" => DetectionKind::RedPlayer,
            "bluetower" => DetectionKind::BlueTower,
            "redtower" => DetectionKind::RedTower,
            "bluenexus" => DetectionKind::BlueNexus,
            "rednexus" => DetectionKind::RedNexus,
            _ => DetectionKind::Unknown,
        }
    }

    /// A recognized label wins, otherwise the numeric id is consulted.
    pub fn resolve(label: Option<&str>, class_id: Option<i64>) -> Self {
        let from_label = label.map(Self::from_label).unwrap_or(DetectionKind::Unknown);
        if from_label != DetectionKind::Unknown {
            return from_label;
        }
        class_id
            .map(Self::from_class_id)
            .unwrap_or(DetectionKind::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub kind: DetectionKind,
    pub norm_x: f64,
    pub norm_y: f64,
    pub pixel_x: f64,
    pub pixel_y: f64,
    pub confidence: f32,
}

impl Detection {
    pub fn team(&self) -> Option<Team> {
        self.kind.team()
    }

    pub fn norm_point(&self) -> NormPoint {
        NormPoint::new(self.norm_x, self.norm_y)
    }

    pub fn pixel_distance(&self, other: &Detection) -> f64 {
        (self.pixel_x - other.pixel_x).hypot(self.pixel_y - other.pixel_y)
    }
}
