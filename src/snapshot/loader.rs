use crate::config::Settings;
use crate::error::SnapshotError;
use crate::snapshot::detection::{Detection, DetectionKind};
use crate::snapshot::record::DetectionRecord;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub const RECORD_SUFFIX: &str = ".detections.json";

/// One frame's worth of detections, immutable once loaded.
#[derive(Debug, Clone)]
pub struct DetectionSnapshot {
    pub frame_id: String,
    pub source_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub detections: Vec<Detection>,
    pub written_at: DateTime<Utc>,
}

impl DetectionSnapshot {
    pub fn age_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.written_at).num_milliseconds()
    }

    pub fn is_stale(&self, now: DateTime<Utc>, stale_ms: u64) -> bool {
        self.age_ms(now) > stale_ms as i64
    }
}

/// Reads the newest detection record from a directory.
pub struct SnapshotLoader {
    dir: PathBuf,
    expected_version: i64,
    min_confidence: f32,
}

impl SnapshotLoader {
    pub fn new(dir: impl Into<PathBuf>, expected_version: i64) -> Self {
        Self {
            dir: dir.into(),
            expected_version,
            min_confidence: 0.0,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.resolved_detections_dir(),
            settings.expected_schema_version,
        )
        .with_min_confidence(settings.min_confidence)
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence.max(0.0);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Latest record, or `None` on any failure. Never errors past this point.
    pub fn latest(&self) -> Option<DetectionSnapshot> {
        match self.load_latest() {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::debug!("No usable snapshot: {}", e);
                None
            }
        }
    }

    pub fn load_latest(&self) -> Result<DetectionSnapshot, SnapshotError> {
        let (path, modified) = self.latest_record()?;
        self.load_path(&path, modified)
    }

    /// Newest record by modification time, ties broken by file name.
    fn latest_record(&self) -> Result<(PathBuf, SystemTime), SnapshotError> {
        if !self.dir.is_dir() {
            return Err(SnapshotError::MissingDirectory(self.dir.clone()));
        }
        let entries =
            std::fs::read_dir(&self.dir).map_err(|e| SnapshotError::Io(e, self.dir.clone()))?;

        let mut latest: Option<(SystemTime, String, PathBuf)> = None;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(RECORD_SUFFIX) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let newer = match &latest {
                Some((best_time, best_name, _)) => (modified, &name) > (*best_time, best_name),
                None => true,
            };
            if newer {
                latest = Some((modified, name, entry.path()));
            }
        }

        latest
            .map(|(modified, _, path)| (path, modified))
            .ok_or_else(|| SnapshotError::NoRecords(self.dir.clone()))
    }

    pub fn load_path(
        &self,
        path: &Path,
        modified: SystemTime,
    ) -> Result<DetectionSnapshot, SnapshotError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SnapshotError::Io(e, path.to_path_buf()))?;
        let record: DetectionRecord =
            serde_json::from_str(&raw).map_err(|e| SnapshotError::Parse(e, path.to_path_buf()))?;
        self.build_snapshot(record, path, modified)
    }

    fn build_snapshot(
        &self,
        record: DetectionRecord,
        path: &Path,
        modified: SystemTime,
    ) -> Result<DetectionSnapshot, SnapshotError> {
        if record.version != self.expected_version {
            return Err(SnapshotError::SchemaMismatch {
                expected: self.expected_version,
                found: record.version,
            });
        }
        let (frame_width, frame_height) =
            match (u32::try_from(record.width), u32::try_from(record.height)) {
                (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
                _ => {
                    return Err(SnapshotError::InvalidDimensions {
                        width: record.width,
                        height: record.height,
                    })
                }
            };
        let width = f64::from(frame_width);
        let height = f64::from(frame_height);

        let mut detections = Vec::with_capacity(record.objects.len());
        for (index, object) in record.objects.iter().enumerate() {
            let center = object
                .pixel_center()
                .ok_or(SnapshotError::InvalidObject(index))?;
            if object.conf < self.min_confidence {
                continue;
            }
            detections.push(Detection {
                kind: DetectionKind::resolve(object.label.as_deref(), object.class_id),
                norm_x: (center.x / width).clamp(0.0, 1.0),
                norm_y: (center.y / height).clamp(0.0, 1.0),
                pixel_x: center.x,
                pixel_y: center.y,
                confidence: object.conf,
            });
        }

        // Capture time after the file's mtime means producer clock skew.
        let file_time = DateTime::<Utc>::from(modified);
        let written_at = record
            .ts
            .filter(|ts| ts.is_finite())
            .and_then(|ts| DateTime::from_timestamp_millis((ts * 1000.0) as i64))
            .filter(|ts| *ts <= file_time)
            .unwrap_or(file_time);

        Ok(DetectionSnapshot {
            frame_id: record.frame.into_string(),
            source_path: path.to_path_buf(),
            width: frame_width,
            height: frame_height,
            detections,
            written_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn write_record(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).expect("write record");
        path
    }

    fn set_mtime(path: &Path, secs_after_epoch: u64) {
        let file = std::fs::File::options()
            .write(true)
            .open(path)
            .expect("open");
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs_after_epoch))
            .expect("set mtime");
    }

    const VALID: &str = r#"{"version": 3, "frame": "000010", "ts": 1700000000.0,
        "width": 1000, "height": 500,
        "objects": [
            {"class": "blue_player", "conf": 0.9, "center": {"x": 250, "y": 100}},
            {"class_id": 3, "conf": 0.8, "center": {"x": 1200, "y": -20}},
            {"class": "minion", "conf": 0.4, "bbox": {"x": 0, "y": 0, "w": 10, "h": 10}}
        ]}"#;

    #[test]
    fn missing_directory_yields_none() {
        let loader = SnapshotLoader::new("/definitely/not/here", 3);
        assert!(matches!(
            loader.load_latest(),
            Err(SnapshotError::MissingDirectory(_))
        ));
        assert!(loader.latest().is_none());
    }

    #[test]
    fn empty_directory_yields_no_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_record(dir.path(), "000001.detections.json.tmp", VALID);
        let loader = SnapshotLoader::new(dir.path(), 3);
        assert!(matches!(loader.load_latest(), Err(SnapshotError::NoRecords(_))));
    }

    #[test]
    fn normalizes_and_clamps_coordinates() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_record(dir.path(), "000010.detections.json", VALID);
        let snapshot = SnapshotLoader::new(dir.path(), 3)
            .load_latest()
            .expect("snapshot");

        assert_eq!(snapshot.frame_id, "000010");
        assert_eq!((snapshot.width, snapshot.height), (1000, 500));
        assert_eq!(snapshot.detections.len(), 3);

        let blue = &snapshot.detections[0];
        assert_eq!(blue.kind, DetectionKind::BluePlayer);
        assert_eq!((blue.norm_x, blue.norm_y), (0.25, 0.2));

        let tower = &snapshot.detections[1];
        assert_eq!(tower.kind, DetectionKind::RedTower);
        assert_eq!((tower.norm_x, tower.norm_y), (1.0, 0.0));

        // Unrecognized labels stay in the raw list.
        assert_eq!(snapshot.detections[2].kind, DetectionKind::Unknown);
        for d in &snapshot.detections {
            assert!((0.0..=1.0).contains(&d.norm_x));
            assert!((0.0..=1.0).contains(&d.norm_y));
        }
        assert_eq!(snapshot.written_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn rejects_schema_mismatch_and_bad_dimensions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loader = SnapshotLoader::new(dir.path(), 3);

        let old = write_record(
            dir.path(),
            "a.detections.json",
            r#"{"version": 2, "frame": "1", "width": 10, "height": 10, "objects": []}"#,
        );
        assert!(matches!(
            loader.load_path(&old, SystemTime::now()),
            Err(SnapshotError::SchemaMismatch { expected: 3, found: 2 })
        ));

        let flat = write_record(
            dir.path(),
            "b.detections.json",
            r#"{"version": 3, "frame": "1", "width": 0, "height": 10, "objects": []}"#,
        );
        assert!(matches!(
            loader.load_path(&flat, SystemTime::now()),
            Err(SnapshotError::InvalidDimensions { width: 0, height: 10 })
        ));

        let oversized = write_record(
            dir.path(),
            "e.detections.json",
            r#"{"version": 3, "frame": "1", "width": 4294967396, "height": 10,
                "objects": [{"class": "blue_player", "conf": 0.9, "center": {"x": 50, "y": 5}}]}"#,
        );
        assert!(matches!(
            loader.load_path(&oversized, SystemTime::now()),
            Err(SnapshotError::InvalidDimensions { width: 4_294_967_396, height: 10 })
        ));

        let broken = write_record(dir.path(), "c.detections.json", "{\"version\": 3,");
        assert!(matches!(
            loader.load_path(&broken, SystemTime::now()),
            Err(SnapshotError::Parse(_, _))
        ));

        let no_position = write_record(
            dir.path(),
            "d.detections.json",
            r#"{"version": 3, "frame": "1", "width": 10, "height": 10,
                "objects": [{"class": "red_player", "conf": 0.5}]}"#,
        );
        assert!(matches!(
            loader.load_path(&no_position, SystemTime::now()),
            Err(SnapshotError::InvalidObject(0))
        ));
    }

    #[test]
    fn picks_most_recently_written_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let older = write_record(
            dir.path(),
            "000099.detections.json",
            r#"{"version": 3, "frame": "000099", "width": 10, "height": 10}"#,
        );
        let newer = write_record(
            dir.path(),
            "000100.detections.json",
            r#"{"version": 3, "frame": "000100", "width": 10, "height": 10}"#,
        );
        set_mtime(&older, 2_000);
        set_mtime(&newer, 1_000);

        let snapshot = SnapshotLoader::new(dir.path(), 3)
            .load_latest()
            .expect("snapshot");
        assert_eq!(snapshot.frame_id, "000099");
        // No ts field: age comes from the file's modification time.
        assert_eq!(snapshot.written_at.timestamp(), 2_000);
    }

    #[test]
    fn equal_mtimes_fall_back_to_file_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let later_name = write_record(
            dir.path(),
            "000201.detections.json",
            r#"{"version": 3, "frame": "000201", "width": 10, "height": 10}"#,
        );
        let earlier_name = write_record(
            dir.path(),
            "000200.detections.json",
            r#"{"version": 3, "frame": "000200", "width": 10, "height": 10}"#,
        );
        set_mtime(&later_name, 5_000);
        set_mtime(&earlier_name, 5_000);

        let snapshot = SnapshotLoader::new(dir.path(), 3)
            .load_latest()
            .expect("snapshot");
        assert_eq!(snapshot.frame_id, "000201");
    }

    #[test]
    fn capture_time_ahead_of_file_uses_file_time() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_record(
            dir.path(),
            "000300.detections.json",
            r#"{"version": 3, "frame": "000300", "ts": 9000.5, "width": 10, "height": 10}"#,
        );
        set_mtime(&path, 3_000);

        let snapshot = SnapshotLoader::new(dir.path(), 3)
            .load_latest()
            .expect("snapshot");
        assert_eq!(snapshot.written_at.timestamp(), 3_000);
        let now = DateTime::from_timestamp(3_010, 0).expect("timestamp");
        assert!(snapshot.is_stale(now, 1_500));
    }

    #[test]
    fn min_confidence_filters_detections() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_record(dir.path(), "000010.detections.json", VALID);
        let snapshot = SnapshotLoader::new(dir.path(), 3)
            .with_min_confidence(0.5)
            .load_latest()
            .expect("snapshot");
        assert_eq!(snapshot.detections.len(), 2);
    }

    #[test]
    fn staleness_is_measured_from_write_time() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_record(dir.path(), "000010.detections.json", VALID);
        let snapshot = SnapshotLoader::new(dir.path(), 3)
            .load_latest()
            .expect("snapshot");
        let written = snapshot.written_at;
        assert!(!snapshot.is_stale(written + chrono::Duration::milliseconds(1_000), 1_500));
        assert!(snapshot.is_stale(written + chrono::Duration::milliseconds(1_501), 1_500));
    }
}
