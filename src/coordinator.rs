use crate::{
    config::Settings,
    director::{Director, DirectorStats, TickReport},
    error::AppError,
    input::{InputInjector, JournalInjector, TracingInjector},
};
use chrono::Utc;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Runs the director on a fixed interval until cancelled.
pub struct Coordinator {
    director_task: Option<tokio::task::JoinHandle<DirectorStats>>,
    cancel_token: CancellationToken,
}

impl Coordinator {
    fn new(settings: &Settings, director: Director) -> Self {
        let cancel_token = CancellationToken::new();

        Self {
            director_task: Some(Self::start_director_task(
                director,
                Duration::from_millis(settings.tick_interval_ms),
                Duration::from_millis(settings.stats_interval_ms),
                cancel_token.clone(),
            )),
            cancel_token,
        }
    }

    fn start_director_task(
        mut director: Director,
        tick_interval: Duration,
        stats_interval: Duration,
        cancel_token: CancellationToken,
    ) -> tokio::task::JoinHandle<DirectorStats> {
        tokio::spawn(async move {
            tracing::info!(
                "Director watching {} every {}ms via {}",
                director.detections_dir().display(),
                tick_interval.as_millis(),
                director.injector_name()
            );
            let mut ticker = tokio::time::interval(tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_summary = Instant::now();

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    _ = ticker.tick() => {
                        director.tick(Utc::now());
                        if !stats_interval.is_zero() && last_summary.elapsed() >= stats_interval {
                            director.stats().log_summary();
                            last_summary = Instant::now();
                        }
                    }
                }
            }

            let released = director.release();
            tracing::info!("Director stopped, released {} held gesture(s)", released.len());
            director.stats().log_summary();
            director.stats().clone()
        })
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Signal the loop to stop after the current tick.
    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    /// Wait for the loop to finish and return its final counters.
    pub async fn join(mut self) -> Result<DirectorStats, AppError> {
        match self.director_task.take() {
            Some(task) => Ok(task.await?),
            None => Ok(DirectorStats::default()),
        }
    }

    pub async fn shutdown(self) -> Result<DirectorStats, AppError> {
        self.stop();
        self.join().await
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Injector chosen from settings: the intent journal when configured,
/// otherwise log-only.
pub fn default_injector(settings: &Settings) -> Result<Box<dyn InputInjector>, AppError> {
    match settings.resolved_intent_journal() {
        Some(path) => {
            tracing::info!("Appending intents to {}", path.display());
            Ok(Box::new(JournalInjector::open(&path, settings.click_hold_ms)?))
        }
        None => Ok(Box::new(TracingInjector::new(settings.click_hold_ms))),
    }
}

pub struct CoordinatorBuilder {
    settings: Settings,
    injector: Option<Box<dyn InputInjector>>,
}

impl CoordinatorBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            injector: None,
        }
    }

    // Sets the detections directory, this will override the loaded settings.
    pub fn detections_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings.detections_dir = dir.into();
        self
    }

    // Adjusts the tick interval, this will override the loaded settings.
    pub fn tick_interval_ms(mut self, tick_interval_ms: u64) -> Self {
        self.settings.tick_interval_ms = tick_interval_ms;
        self
    }

    pub fn stats_interval_ms(mut self, stats_interval_ms: u64) -> Self {
        self.settings.stats_interval_ms = stats_interval_ms;
        self
    }

    pub fn injector(mut self, injector: Box<dyn InputInjector>) -> Self {
        self.injector = Some(injector);
        self
    }

    fn into_director(self) -> Result<(Settings, Director), AppError> {
        self.settings.validate()?;
        let injector = match self.injector {
            Some(injector) => injector,
            None => default_injector(&self.settings)?,
        };
        let director = Director::new(&self.settings, injector);
        Ok((self.settings, director))
    }

    /// Start the tick loop. Must be called inside a tokio runtime.
    pub fn build(self) -> Result<Coordinator, AppError> {
        let (settings, director) = self.into_director()?;
        Ok(Coordinator::new(&settings, director))
    }

    /// Run a single tick, release any drag it started and return its report.
    pub fn run_once(self) -> Result<TickReport, AppError> {
        let (_, mut director) = self.into_director()?;
        let report = director.tick(Utc::now());
        director.release();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::director::{ActuationPhase, SnapshotStatus};
    use crate::input::{MovementIntent, RecordingInjector};
    use std::path::Path;

    const ENGAGEMENT: &str = r#"{"version": 3, "frame": 42, "width": 1000, "height": 1000,
        "objects": [
            {"class_id": 0, "conf": 0.9, "center": {"x": 300, "y": 300}},
            {"class_id": 1, "conf": 0.9, "center": {"x": 400, "y": 300}}
        ]}"#;

    fn write_engagement(dir: &Path) {
        std::fs::write(dir.join("000042.detections.json"), ENGAGEMENT).expect("write");
    }

    #[tokio::test]
    async fn test_coordinator_ticks_until_stopped() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_engagement(dir.path());
        let recorder = RecordingInjector::default();

        let coordinator = CoordinatorBuilder::new(Settings::default())
            .detections_dir(dir.path())
            .tick_interval_ms(10)
            .stats_interval_ms(0)
            .injector(Box::new(recorder.clone()))
            .build()
            .expect("Failed to build coordinator");
        tokio::time::sleep(Duration::from_millis(120)).await;
        let stats = coordinator.shutdown().await.expect("join");

        assert!(stats.ticks >= 2);
        assert_eq!(stats.recenters, 1);
        assert_eq!(
            recorder.intents().first(),
            Some(&MovementIntent::Recenter { x: 0.35, y: 0.3 })
        );
    }

    #[tokio::test]
    async fn test_coordinator_stops_from_cancel_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let coordinator = CoordinatorBuilder::new(Settings::default())
            .detections_dir(dir.path())
            .tick_interval_ms(10)
            .injector(Box::new(RecordingInjector::default()))
            .build()
            .expect("Failed to build coordinator");
        let token = coordinator.cancel_token();
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        let stats = tokio::time::timeout(Duration::from_secs(5), coordinator.join())
            .await
            .expect("loop stopped")
            .expect("join");
        assert!(stats.ticks >= 1);
        assert_eq!(stats.missing_snapshots, stats.ticks);
    }

    #[tokio::test]
    async fn test_coordinator_rejects_invalid_settings() {
        let result = CoordinatorBuilder::new(Settings::default().with_alpha(0.0))
            .injector(Box::new(RecordingInjector::default()))
            .build();
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn run_once_reports_single_tick() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_engagement(dir.path());

        let report = CoordinatorBuilder::new(Settings::default())
            .detections_dir(dir.path())
            .injector(Box::new(RecordingInjector::default()))
            .run_once()
            .expect("run once");
        assert_eq!(report.status, SnapshotStatus::Fresh);
        assert_eq!(report.frame_id.as_deref(), Some("42"));
        assert_eq!(report.phase, ActuationPhase::Recentering);
    }

    #[test]
    fn journal_is_used_when_configured() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_engagement(dir.path());
        let journal = dir.path().join("out").join("intents.jsonl");
        let mut settings = Settings::default().with_detections_dir(dir.path());
        settings.intent_journal = Some(journal.clone());

        CoordinatorBuilder::new(settings).run_once().expect("run once");

        let contents = std::fs::read_to_string(&journal).expect("journal");
        let first: serde_json::Value =
            serde_json::from_str(contents.lines().next().expect("line")).expect("json");
        assert_eq!(first["type"], "recenter");
    }
}
