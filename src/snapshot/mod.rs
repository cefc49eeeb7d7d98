pub mod detection;
pub mod loader;
pub mod record;

pub use detection::{Detection, DetectionKind, Team};
pub use loader::{DetectionSnapshot, SnapshotLoader};
