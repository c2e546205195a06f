use crate::error::{HookError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// CheckToggle
// ---------------------------------------------------------------------------

/// Either `name: false` or `name: { enabled: false }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckToggle {
    Flag(bool),
    Table {
        #[serde(default = "default_enabled")]
        enabled: bool,
    },
}

fn default_enabled() -> bool {
    true
}

impl CheckToggle {
    pub fn enabled(&self) -> bool {
        match self {
            CheckToggle::Flag(b) => *b,
            CheckToggle::Table { enabled } => *enabled,
        }
    }
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Limits {
    #[serde(default = "default_content_warn_bytes")]
    pub content_warn_bytes: u64,
    #[serde(default = "default_content_block_bytes")]
    pub content_block_bytes: u64,
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
    /// Per-check budget. `0` disables the timeout.
    #[serde(default = "default_check_timeout_ms")]
    pub check_timeout_ms: u64,
    /// Budget for one external tool (linter, type checker).
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

fn default_content_warn_bytes() -> u64 {
    256 * 1024
}

fn default_content_block_bytes() -> u64 {
    1024 * 1024
}

fn default_max_nesting_depth() -> usize {
    5
}

fn default_check_timeout_ms() -> u64 {
    5_000
}

fn default_tool_timeout_secs() -> u64 {
    60
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            content_warn_bytes: default_content_warn_bytes(),
            content_block_bytes: default_content_block_bytes(),
            max_nesting_depth: default_max_nesting_depth(),
            check_timeout_ms: default_check_timeout_ms(),
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// PathsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Roots besides the working directory that file actions may touch.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_allowed_roots: Vec<PathBuf>,
}

// ---------------------------------------------------------------------------
// HookConfig (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HookConfig {
    #[serde(default)]
    pub checks: BTreeMap<String, CheckToggle>,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub paths: PathsConfig,
}

impl HookConfig {
    /// Absent keys are enabled.
    pub fn is_enabled(&self, check_name: &str) -> bool {
        self.checks
            .get(check_name)
            .map(CheckToggle::enabled)
            .unwrap_or(true)
    }

    pub fn set_enabled(&mut self, check_name: &str, enabled: bool) {
        self.checks
            .insert(check_name.to_string(), CheckToggle::Table { enabled });
    }

    /// `None` when the per-check timeout is disabled.
    pub fn check_timeout(&self) -> Option<Duration> {
        match self.limits.check_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.limits.tool_timeout_secs.max(1))
    }

    /// Strict load: a missing or unparseable file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(HookError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: HookConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Fail-open load used on the hook path: anything short of a readable,
    /// well-formed file yields the defaults (every check enabled).
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(HookError::ConfigNotFound(_)) => Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable hook config");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self, known_checks: &[&str]) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for name in self.checks.keys() {
            if !known_checks.contains(&name.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("unknown check '{name}' in checks"),
                });
            }
        }

        let limits = &self.limits;
        if limits.content_warn_bytes >= limits.content_block_bytes {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "limits.content_warn_bytes ({}) must be below limits.content_block_bytes ({})",
                    limits.content_warn_bytes, limits.content_block_bytes
                ),
            });
        }

        if limits.check_timeout_ms == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "limits.check_timeout_ms is 0: a slow check can stall the host"
                    .to_string(),
            });
        }

        if limits.tool_timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "limits.tool_timeout_secs is 0: treated as 1s".to_string(),
            });
        }

        if limits.max_nesting_depth == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "limits.max_nesting_depth is 0: every nested block will warn"
                    .to_string(),
            });
        }

        for root in &self.paths.extra_allowed_roots {
            if !root.is_absolute() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "paths.extra_allowed_roots entry '{}' must be absolute",
                        root.display()
                    ),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
