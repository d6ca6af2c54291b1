//! Runtime configuration.
//!
//! Loaded from an optional TOML file, then overridden from `CRUCIBLE_*`
//! environment variables. Every field has a default, so an empty file (or
//! no file) yields a usable configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{CrucibleError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Parallel candidate plans per attempt.
    pub drafts: u32,
    pub max_attempts: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            drafts: 1,
            max_attempts: 2,
        }
    }
}

/// Gate thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GauntletConfig {
    /// Minimum style score on a 0-10 scale (inclusive).
    pub min_style_score: f32,
    /// Highest allowed cyclomatic complexity for a single unit (inclusive).
    pub max_complexity: u32,
}

impl Default for GauntletConfig {
    fn default() -> Self {
        Self {
            min_style_score: 7.0,
            max_complexity: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
    /// Fix attempts per unit before the final lint check.
    pub max_attempts: u32,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrucibleConfig {
    /// Parent directory of every run's output location.
    pub output_root: PathBuf,
    /// Where run reports go. Reports are skipped when unset.
    pub report_dir: Option<PathBuf>,
    pub planner: PlannerConfig,
    pub gauntlet: GauntletConfig,
    pub retry: RetryConfig,
    pub debug: DebugConfig,
    pub tool_timeout_secs: u64,
    /// Plan paths sent through the retry loop after generation.
    pub contested_paths: Vec<PathBuf>,
}

impl Default for CrucibleConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("generated_projects"),
            report_dir: None,
            planner: PlannerConfig::default(),
            gauntlet: GauntletConfig::default(),
            retry: RetryConfig::default(),
            debug: DebugConfig::default(),
            tool_timeout_secs: 90,
            contested_paths: Vec::new(),
        }
    }
}

impl CrucibleConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| CrucibleError::Config(e.to_string()))
    }

    /// Load `path` (if given) and apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    CrucibleError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `CRUCIBLE_*` overrides. `lookup` abstracts the environment so
    /// tests do not have to mutate process state.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CRUCIBLE_OUTPUT_ROOT") {
            self.output_root = PathBuf::from(v);
        }
        if let Some(v) = parse_env(&lookup, "CRUCIBLE_MAX_ATTEMPTS")? {
            self.retry.max_attempts = v;
        }
        if let Some(v) = parse_env(&lookup, "CRUCIBLE_MIN_STYLE_SCORE")? {
            self.gauntlet.min_style_score = v;
        }
        if let Some(v) = parse_env(&lookup, "CRUCIBLE_MAX_COMPLEXITY")? {
            self.gauntlet.max_complexity = v;
        }
        if let Some(v) = parse_env(&lookup, "CRUCIBLE_TOOL_TIMEOUT_SECS")? {
            self.tool_timeout_secs = v;
        }
        if let Some(v) = parse_env(&lookup, "CRUCIBLE_PLAN_DRAFTS")? {
            self.planner.drafts = v;
        }
        Ok(())
    }
}

fn parse_env<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| CrucibleError::Config(format!("{key}={raw:?}: {e}"))),
    }
}
