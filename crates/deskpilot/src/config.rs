//! Runtime tuning for waits, searches and gestures
//!
//! Layered as defaults, then an optional JSON file, then `DESKPILOT_*`
//! environment variables.

use crate::search::ElementSearch;
use crate::AutomationError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

pub const ENV_PREFIX: &str = "DESKPILOT_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    pub wait_interval_ms: u64,
    pub wait_timeout_ms: u64,
    pub slow_path_timeout_ms: u64,
    pub slow_path_max_nodes: usize,
    pub wheel_unit: i32,
    pub drag_settle_ms: u64,
    pub drag_steps: u32,
    pub double_click_delay_ms: u64,
    pub visible_windows_only: bool,
    pub include_untitled_windows: bool,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            wait_interval_ms: 200,
            wait_timeout_ms: 10_000,
            slow_path_timeout_ms: 5_000,
            slow_path_max_nodes: 10_000,
            wheel_unit: 120,
            drag_settle_ms: 50,
            drag_steps: 20,
            double_click_delay_ms: 50,
            visible_windows_only: true,
            include_untitled_windows: false,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, AutomationError> {
    raw.trim().parse().map_err(|_| {
        AutomationError::InvalidArgument(format!("{ENV_PREFIX}{key}: cannot parse '{raw}'"))
    })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, AutomationError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AutomationError::InvalidArgument(format!(
            "{ENV_PREFIX}{key}: expected a boolean, got '{raw}'"
        ))),
    }
}

impl AutomationConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AutomationError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            AutomationError::InvalidArgument(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            AutomationError::InvalidArgument(format!("invalid config {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "loaded automation config");
        Ok(config)
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self, AutomationError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override fields from `lookup("DESKPILOT_<FIELD>")`. A value that does
    /// not parse is an error; a missing one leaves the field alone.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), AutomationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |field: &str| lookup(&format!("{ENV_PREFIX}{field}"));

        if let Some(v) = get("WAIT_INTERVAL_MS") {
            self.wait_interval_ms = parse_env("WAIT_INTERVAL_MS", &v)?;
        }
        if let Some(v) = get("WAIT_TIMEOUT_MS") {
            self.wait_timeout_ms = parse_env("WAIT_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("SLOW_PATH_TIMEOUT_MS") {
            self.slow_path_timeout_ms = parse_env("SLOW_PATH_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("SLOW_PATH_MAX_NODES") {
            self.slow_path_max_nodes = parse_env("SLOW_PATH_MAX_NODES", &v)?;
        }
        if let Some(v) = get("WHEEL_UNIT") {
            self.wheel_unit = parse_env("WHEEL_UNIT", &v)?;
        }
        if let Some(v) = get("DRAG_SETTLE_MS") {
            self.drag_settle_ms = parse_env("DRAG_SETTLE_MS", &v)?;
        }
        if let Some(v) = get("DRAG_STEPS") {
            self.drag_steps = parse_env("DRAG_STEPS", &v)?;
        }
        if let Some(v) = get("DOUBLE_CLICK_DELAY_MS") {
            self.double_click_delay_ms = parse_env("DOUBLE_CLICK_DELAY_MS", &v)?;
        }
        if let Some(v) = get("VISIBLE_WINDOWS_ONLY") {
            self.visible_windows_only = parse_bool("VISIBLE_WINDOWS_ONLY", &v)?;
        }
        if let Some(v) = get("INCLUDE_UNTITLED_WINDOWS") {
            self.include_untitled_windows = parse_bool("INCLUDE_UNTITLED_WINDOWS", &v)?;
        }

        if self.wait_interval_ms == 0 {
            warn!("wait_interval_ms of 0 would busy-poll, using 1");
            self.wait_interval_ms = 1;
        }
        Ok(())
    }

    pub fn wait_interval(&self) -> Duration {
        Duration::from_millis(self.wait_interval_ms.max(1))
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn slow_path_timeout(&self) -> Duration {
        Duration::from_millis(self.slow_path_timeout_ms)
    }

    /// Search engine whose slow path falls back to the configured limits
    pub fn element_search(&self) -> ElementSearch {
        ElementSearch::new(self.slow_path_timeout(), self.slow_path_max_nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let c = AutomationConfig::default();
        assert_eq!(c.wait_interval_ms, 200);
        assert_eq!(c.wait_timeout_ms, 10_000);
        assert_eq!(c.slow_path_timeout_ms, 5_000);
        assert_eq!(c.slow_path_max_nodes, 10_000);
        assert_eq!(c.wheel_unit, 120);
        assert!(c.visible_windows_only);
        assert!(!c.include_untitled_windows);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let c: AutomationConfig = serde_json::from_str(r#"{"wait_timeout_ms": 2500}"#).unwrap();
        assert_eq!(c.wait_timeout_ms, 2500);
        assert_eq!(c.wait_interval_ms, 200);
    }

    #[test]
    fn test_env_overrides_fields() {
        let mut c = AutomationConfig::default();
        c.apply_env(env(&[
            ("DESKPILOT_WAIT_INTERVAL_MS", "50"),
            ("DESKPILOT_VISIBLE_WINDOWS_ONLY", "false"),
            ("DESKPILOT_DRAG_STEPS", " 7 "),
        ]))
        .unwrap();
        assert_eq!(c.wait_interval_ms, 50);
        assert!(!c.visible_windows_only);
        assert_eq!(c.drag_steps, 7);
    }

    #[test]
    fn test_env_rejects_garbage() {
        let mut c = AutomationConfig::default();
        let err = c
            .apply_env(env(&[("DESKPILOT_SLOW_PATH_MAX_NODES", "lots")]))
            .unwrap_err();
        assert!(matches!(err, AutomationError::InvalidArgument(_)));
    }

    #[test]
    fn test_zero_interval_is_raised() {
        let mut c = AutomationConfig::default();
        c.apply_env(env(&[("DESKPILOT_WAIT_INTERVAL_MS", "0")]))
            .unwrap();
        assert_eq!(c.wait_interval_ms, 1);
    }
}
