//! Runtime configuration loaded from environment variables.
//!
//! Every engine limit has a default in `canvas::consts`; an environment
//! variable of the same name overrides it. Unparseable values fall back to the
//! default, while values that parse but make no sense (a zero-sized canvas, a
//! zero sample limit) are rejected with a [`ConfigError`].

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use canvas::config::EngineConfig;

const DEFAULT_DEMO_SHAPES: usize = 25;

/// Host configuration: the engine limits plus demo knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppConfig {
    pub engine: EngineConfig,
    /// Shapes seeded for the multi-selection part of the demo.
    pub demo_shapes: usize,
}

impl AppConfig {
    /// Read overrides from the environment and validate the result.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the resulting limits are unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            canvas_width: env_parse("CANVAS_WIDTH", defaults.canvas_width),
            canvas_height: env_parse("CANVAS_HEIGHT", defaults.canvas_height),
            drag_threshold: env_parse("DRAG_THRESHOLD", defaults.drag_threshold),
            stale_lock_ms: env_parse("STALE_LOCK_MS", defaults.stale_lock_ms),
            large_selection_threshold: env_parse("LARGE_SELECTION_THRESHOLD", defaults.large_selection_threshold),
            large_selection_interval_ms: env_parse("LARGE_SELECTION_INTERVAL_MS", defaults.large_selection_interval_ms),
            sample_queue_limit: env_parse("SAMPLE_QUEUE_LIMIT", defaults.sample_queue_limit),
            frame_interval_ms: env_parse("FRAME_INTERVAL_MS", defaults.frame_interval_ms),
            ..defaults
        };
        let config = Self { engine, demo_shapes: env_parse("DEMO_SHAPES", DEFAULT_DEMO_SHAPES) };
        config.validate()?;
        Ok(config)
    }

    /// Check that the limits describe a usable canvas.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let e = &self.engine;
        if !(e.canvas_width.is_finite() && e.canvas_height.is_finite() && e.canvas_width > 0.0 && e.canvas_height > 0.0)
        {
            return Err(ConfigError::InvalidCanvas { width: e.canvas_width, height: e.canvas_height });
        }
        if !e.drag_threshold.is_finite() || e.drag_threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(e.drag_threshold));
        }
        if e.stale_lock_ms == 0 {
            return Err(ConfigError::Zero("STALE_LOCK_MS"));
        }
        if e.sample_queue_limit == 0 {
            return Err(ConfigError::Zero("SAMPLE_QUEUE_LIMIT"));
        }
        if e.frame_interval_ms == 0 {
            return Err(ConfigError::Zero("FRAME_INTERVAL_MS"));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { engine: EngineConfig::default(), demo_shapes: DEFAULT_DEMO_SHAPES }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("canvas must have a positive finite size, got {width}x{height}")]
    InvalidCanvas { width: f64, height: f64 },
    #[error("drag threshold must be a non-negative number, got {0}")]
    InvalidThreshold(f64),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}
