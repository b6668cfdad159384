//! Loop configuration.
//!
//! Defaults can be overridden from a JSON document or from environment
//! variables:
//!
//! | Variable | Field |
//! |---|---|
//! | `ENGINE_FIXED_HZ` | `fixed_hz` |
//! | `ENGINE_MAX_FIXED_STEPS` | `max_fixed_steps_per_frame` |
//! | `ENGINE_MAX_FRAME_DELTA_MS` | `max_frame_delta_ms` |

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LoopError;

/// Environment variable overriding [`LoopConfig::fixed_hz`].
pub const FIXED_HZ_ENV: &str = "ENGINE_FIXED_HZ";
/// Environment variable overriding [`LoopConfig::max_fixed_steps_per_frame`].
pub const MAX_FIXED_STEPS_ENV: &str = "ENGINE_MAX_FIXED_STEPS";
/// Environment variable overriding [`LoopConfig::max_frame_delta_ms`].
pub const MAX_FRAME_DELTA_MS_ENV: &str = "ENGINE_MAX_FRAME_DELTA_MS";

/// Default fixed simulation rate.
pub const DEFAULT_FIXED_HZ: f64 = 60.0;
/// Default cap on fixed steps per frame.
pub const DEFAULT_MAX_FIXED_STEPS: u32 = 5;
/// Default frame delta clamp.
pub const DEFAULT_MAX_FRAME_DELTA_MS: u64 = 250;
/// Default FPS averaging window, in frames.
pub const DEFAULT_FPS_WINDOW: usize = 120;

/// Slowest accepted fixed rate: one step every 1000 seconds.
pub const MIN_FIXED_HZ: f64 = 0.001;
/// Fastest accepted fixed rate: one step every 100 microseconds.
pub const MAX_FIXED_HZ: f64 = 10_000.0;
/// Largest accepted frame budget.
pub const MAX_FRAME_BUDGET_MS: f64 = 60_000.0;

/// Timing parameters of a [`GameLoop`](crate::GameLoop).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Fixed simulation steps per second.
    pub fixed_hz: f64,
    /// Most fixed steps run in one frame before the backlog is deferred.
    pub max_fixed_steps_per_frame: u32,
    /// Frame deltas above this are clamped.
    pub max_frame_delta_ms: u64,
    /// Number of frames the FPS estimate averages over.
    pub fps_window: usize,
    /// Per-frame processing budget; frames taking longer are counted.
    pub frame_budget_ms: Option<f64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            fixed_hz: DEFAULT_FIXED_HZ,
            max_fixed_steps_per_frame: DEFAULT_MAX_FIXED_STEPS,
            max_frame_delta_ms: DEFAULT_MAX_FRAME_DELTA_MS,
            fps_window: DEFAULT_FPS_WINDOW,
            frame_budget_ms: None,
        }
    }
}

impl LoopConfig {
    /// Parses and validates a JSON document. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::Parse`] for malformed JSON and
    /// [`LoopError::InvalidConfig`] for out-of-range values.
    pub fn from_json_str(json: &str) -> Result<Self, LoopError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by the `ENGINE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::InvalidConfig`] if a variable does not parse or
    /// the result is out of range.
    pub fn from_env() -> Result<Self, LoopError> {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from `lookup`, which maps variable names to values.
    ///
    /// # Errors
    ///
    /// See [`LoopConfig::from_env`].
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, LoopError> {
        if let Some(hz) = parse_var(&lookup, FIXED_HZ_ENV)? {
            self.fixed_hz = hz;
        }
        if let Some(steps) = parse_var(&lookup, MAX_FIXED_STEPS_ENV)? {
            self.max_fixed_steps_per_frame = steps;
        }
        if let Some(ms) = parse_var(&lookup, MAX_FRAME_DELTA_MS_ENV)? {
            self.max_frame_delta_ms = ms;
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks every field is in range.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), LoopError> {
        if !(MIN_FIXED_HZ..=MAX_FIXED_HZ).contains(&self.fixed_hz) {
            return Err(invalid(format!(
                "fixed_hz must be in {MIN_FIXED_HZ}..={MAX_FIXED_HZ}, got {}",
                self.fixed_hz
            )));
        }
        if self.max_fixed_steps_per_frame == 0 {
            return Err(invalid("max_fixed_steps_per_frame must be at least 1".into()));
        }
        if self.max_frame_delta_ms == 0 {
            return Err(invalid("max_frame_delta_ms must be at least 1".into()));
        }
        if self.fps_window == 0 {
            return Err(invalid("fps_window must be at least 1".into()));
        }
        if let Some(budget) = self.frame_budget_ms {
            if !(budget > 0.0 && budget <= MAX_FRAME_BUDGET_MS) {
                return Err(invalid(format!(
                    "frame_budget_ms must be in (0, {MAX_FRAME_BUDGET_MS}], got {budget}"
                )));
            }
        }
        Ok(())
    }

    /// Duration of one fixed step.
    ///
    /// A rate outside the accepted range yields the default step.
    #[must_use]
    pub fn fixed_step(&self) -> Duration {
        let hz = if (MIN_FIXED_HZ..=MAX_FIXED_HZ).contains(&self.fixed_hz) {
            self.fixed_hz
        } else {
            DEFAULT_FIXED_HZ
        };
        Duration::from_secs_f64(1.0 / hz)
    }

    /// Largest frame delta fed to the accumulator.
    #[must_use]
    pub fn max_frame_delta(&self) -> Duration {
        Duration::from_millis(self.max_frame_delta_ms)
    }

    /// Per-frame processing budget, if one is set and representable.
    #[must_use]
    pub fn frame_budget(&self) -> Option<Duration> {
        self.frame_budget_ms
            .and_then(|ms| Duration::try_from_secs_f64(ms / 1000.0).ok())
    }
}

fn invalid(message: String) -> LoopError {
    LoopError::InvalidConfig(message)
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, LoopError> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(format!("{name}={raw:?} is not a valid value"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LoopConfig::default();
        assert_eq!(config.fixed_hz, 60.0);
        assert_eq!(config.max_fixed_steps_per_frame, 5);
        assert_eq!(config.max_frame_delta(), Duration::from_millis(250));
        assert!(config.validate().is_ok());
        assert!(config.frame_budget().is_none());
    }

    #[test]
    fn test_json_partial_document_keeps_defaults() {
        let config = LoopConfig::from_json_str(r#"{ "fixed_hz": 120.0, "frame_budget_ms": 8.0 }"#).unwrap();
        assert_eq!(config.fixed_hz, 120.0);
        assert_eq!(config.max_fixed_steps_per_frame, DEFAULT_MAX_FIXED_STEPS);
        assert_eq!(config.frame_budget(), Some(Duration::from_millis(8)));
    }

    #[test]
    fn test_json_rejects_bad_values() {
        assert!(matches!(
            LoopConfig::from_json_str(r#"{ "max_fixed_steps_per_frame": 0 }"#),
            Err(LoopError::InvalidConfig(_))
        ));
        assert!(matches!(
            LoopConfig::from_json_str(r#"{ "fixed_hz": -1.0 }"#),
            Err(LoopError::InvalidConfig(_))
        ));
        for doc in [
            r#"{ "fixed_hz": 1e-30 }"#,
            r#"{ "fixed_hz": 0.0 }"#,
            r#"{ "fixed_hz": 1e12 }"#,
            r#"{ "frame_budget_ms": 0.0 }"#,
            r#"{ "frame_budget_ms": -4.0 }"#,
            r#"{ "frame_budget_ms": 1e300 }"#,
        ] {
            assert!(
                matches!(LoopConfig::from_json_str(doc), Err(LoopError::InvalidConfig(_))),
                "{doc} should be rejected"
            );
        }
        assert!(LoopConfig::from_json_str(r#"{ "fixed_hz": 10000.0, "frame_budget_ms": 60000.0 }"#).is_ok());
        assert!(matches!(
            LoopConfig::from_json_str("{ not json"),
            Err(LoopError::Parse(_))
        ));
    }

    #[test]
    fn test_overrides_apply() {
        let config = LoopConfig::default()
            .with_overrides(vars(&[
                (FIXED_HZ_ENV, "30"),
                (MAX_FIXED_STEPS_ENV, " 3 "),
                (MAX_FRAME_DELTA_MS_ENV, "100"),
            ]))
            .unwrap();
        assert_eq!(config.fixed_hz, 30.0);
        assert_eq!(config.max_fixed_steps_per_frame, 3);
        assert_eq!(config.max_frame_delta_ms, 100);
    }

    #[test]
    fn test_override_parse_failure() {
        let err = LoopConfig::default()
            .with_overrides(vars(&[(MAX_FIXED_STEPS_ENV, "many")]))
            .unwrap_err();
        assert!(err.to_string().contains(MAX_FIXED_STEPS_ENV));
    }

    #[test]
    fn test_fixed_step_duration() {
        let config = LoopConfig {
            fixed_hz: 50.0,
            ..LoopConfig::default()
        };
        assert_eq!(config.fixed_step(), Duration::from_millis(20));
    }

    #[test]
    fn test_unvalidated_extremes_do_not_panic() {
        let config = LoopConfig {
            fixed_hz: 1e-30,
            frame_budget_ms: Some(1e300),
            ..LoopConfig::default()
        };
        assert_eq!(config.fixed_step(), LoopConfig::default().fixed_step());
        assert!(config.frame_budget().is_none());

        let fast = LoopConfig {
            fixed_hz: f64::NAN,
            ..LoopConfig::default()
        };
        assert!(fast.fixed_step() > Duration::ZERO);
    }
}
