use crate::director::planner::MIN_STEP_NORM;
use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides, e.g. `DIRECTOR_ALPHA=0.5`.
pub const ENV_PREFIX: &str = "DIRECTOR";
/// Overrides `base_dir`, shared with the capture and detection services.
pub const BASE_DIR_ENV: &str = "NEXUS_BASE_DIR";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Smoothing and movement
    pub alpha: f64,
    pub deadzone: f64,
    pub max_step_norm: f64,
    pub recenter_threshold: f64,

    // Timing gates
    pub stale_ms: u64,
    pub min_action_interval_ms: u64,
    pub min_click_interval_ms: u64,
    pub click_hold_ms: u64,
    pub drag_release_ms: u64,

    // Clustering
    pub player_pair_threshold_px: f64,
    pub structure_threshold_px: f64,

    // Path planning
    pub waypoint_step_norm: f64,
    pub waypoint_settle_norm: f64,
    pub target_replan_norm: f64,
    pub target_blend_factor: f64,

    // Runtime
    pub base_dir: PathBuf,
    pub detections_dir: PathBuf,
    pub expected_schema_version: i64,
    pub min_confidence: f32,
    pub tick_interval_ms: u64,
    pub stats_interval_ms: u64,
    pub log_level: String,
    pub intent_journal: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            alpha: 0.35,
            deadzone: 0.004,
            max_step_norm: 0.08,
            recenter_threshold: 0.35,
            stale_ms: 1_500,
            min_action_interval_ms: 60,
            min_click_interval_ms: 750,
            click_hold_ms: 40,
            drag_release_ms: 400,
            player_pair_threshold_px: 160.0,
            structure_threshold_px: 220.0,
            waypoint_step_norm: 0.05,
            waypoint_settle_norm: 0.015,
            target_replan_norm: 0.12,
            target_blend_factor: 0.6,
            base_dir: PathBuf::from("."),
            detections_dir: PathBuf::from("sessions/current/state/detections"),
            expected_schema_version: 3,
            min_confidence: 0.0,
            tick_interval_ms: 100,
            stats_interval_ms: 2_000,
            log_level: "info".to_string(),
            intent_journal: None,
        }
    }
}

impl Settings {
    /// Layer defaults, an optional config file and `DIRECTOR_*` environment
    /// variables, then validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Same as [`Settings::load`], but reads overrides from `env` instead of the
    /// process environment when given.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let use_process_env = env.is_none();
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .try_parsing(true)
                .source(env),
        );

        let mut settings: Settings = builder.build()?.try_deserialize()?;
        if use_process_env {
            if let Ok(base_dir) = std::env::var(BASE_DIR_ENV) {
                settings.base_dir = PathBuf::from(base_dir);
            }
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: &str) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.to_string(),
            }
        }

        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(invalid("alpha", "must be in (0, 1]"));
        }
        if !(self.target_blend_factor > 0.0 && self.target_blend_factor <= 1.0) {
            return Err(invalid("target_blend_factor", "must be in (0, 1]"));
        }
        if !(0.0..=0.5).contains(&self.recenter_threshold) {
            return Err(invalid("recenter_threshold", "must be in [0, 0.5]"));
        }
        if self.deadzone < 0.0 {
            return Err(invalid("deadzone", "must not be negative"));
        }
        if self.max_step_norm <= 0.0 {
            return Err(invalid("max_step_norm", "must be positive"));
        }
        if !(self.waypoint_step_norm >= MIN_STEP_NORM) {
            return Err(invalid("waypoint_step_norm", "must be at least 1e-4"));
        }
        if self.waypoint_settle_norm <= 0.0 {
            return Err(invalid("waypoint_settle_norm", "must be positive"));
        }
        if self.target_replan_norm < 0.0 {
            return Err(invalid("target_replan_norm", "must not be negative"));
        }
        if self.player_pair_threshold_px < 0.0 || self.structure_threshold_px < 0.0 {
            return Err(invalid("clustering thresholds", "must not be negative"));
        }
        if self.tick_interval_ms == 0 {
            return Err(invalid("tick_interval_ms", "must be greater than 0"));
        }
        Ok(())
    }

    /// Directory holding detection records, resolved against `base_dir`.
    pub fn resolved_detections_dir(&self) -> PathBuf {
        if self.detections_dir.is_absolute() {
            self.detections_dir.clone()
        } else {
            self.base_dir.join(&self.detections_dir)
        }
    }

    pub fn resolved_intent_journal(&self) -> Option<PathBuf> {
        self.intent_journal.as_ref().map(|path| {
            if path.is_absolute() {
                path.clone()
            } else {
                self.base_dir.join(path)
            }
        })
    }

    pub fn with_detections_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.detections_dir = dir.into();
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_stale_ms(mut self, stale_ms: u64) -> Self {
        self.stale_ms = stale_ms;
        self
    }

    pub fn with_min_click_interval_ms(mut self, interval_ms: u64) -> Self {
        self.min_click_interval_ms = interval_ms;
        self
    }

    pub fn with_min_action_interval_ms(mut self, interval_ms: u64) -> Self {
        self.min_action_interval_ms = interval_ms;
        self
    }

    pub fn with_drag_release_ms(mut self, release_ms: u64) -> Self {
        self.drag_release_ms = release_ms;
        self
    }

    pub fn with_target_blend_factor(mut self, factor: f64) -> Self {
        self.target_blend_factor = factor;
        self
    }

    pub fn with_recenter_threshold(mut self, threshold: f64) -> Self {
        self.recenter_threshold = threshold;
        self
    }
}
