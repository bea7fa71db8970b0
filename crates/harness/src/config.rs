//! Harness configuration: TOML file + `DRIVERKIT_*` env overrides + defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HarnessError, HarnessResult};

/// Harness configuration, loaded once at process start and shared read-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Default scheme/host/port/path for page addresses
    pub target: TargetConfig,

    /// Timeouts pushed into each new driver session
    pub timeouts: TimeoutConfig,

    /// Artifact output
    pub artifacts: ArtifactConfig,

    /// Example page fixture server
    pub fixtures: FixtureConfig,

    /// Platform the suite is running against (None = unspecified)
    pub context_platform: Option<String>,

    /// Root directory for `file` scheme page addresses
    pub resource_root: PathBuf,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            target: TargetConfig::default(),
            timeouts: TimeoutConfig::default(),
            artifacts: ArtifactConfig::default(),
            fixtures: FixtureConfig::default(),
            context_platform: None,
            resource_root: PathBuf::from("tests/resources"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TargetConfig {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    /// Base path that relative page paths are resolved against
    pub path: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            port: None,
            path: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutConfig {
    pub script_secs: u64,
    pub implicit_secs: u64,
    pub page_load_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            script_secs: 30,
            implicit_secs: 15,
            page_load_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArtifactConfig {
    pub output_dir: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("test-results/artifacts"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FixtureConfig {
    pub enabled: bool,
    pub host: String,
    /// 0 = pick a free port
    pub port: u16,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 0,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file, falling back to defaults when it is absent
    pub fn load(path: &Path) -> HarnessResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> HarnessResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DRIVERKIT_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> HarnessResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> HarnessResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DRIVERKIT_TARGET_SCHEME") {
            self.target.scheme = v;
        }
        if let Some(v) = lookup("DRIVERKIT_TARGET_HOST") {
            self.target.host = v;
        }
        if let Some(v) = lookup("DRIVERKIT_TARGET_PORT") {
            self.target.port = Some(parse_env("DRIVERKIT_TARGET_PORT", &v)?);
        }
        if let Some(v) = lookup("DRIVERKIT_TARGET_PATH") {
            self.target.path = v;
        }
        if let Some(v) = lookup("DRIVERKIT_CONTEXT_PLATFORM") {
            self.context_platform = Some(v).filter(|p| !p.is_empty());
        }
        if let Some(v) = lookup("DRIVERKIT_ARTIFACT_DIR") {
            self.artifacts.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("DRIVERKIT_FIXTURES_ENABLED") {
            self.fixtures.enabled = parse_env("DRIVERKIT_FIXTURES_ENABLED", &v)?;
        }
        if let Some(v) = lookup("DRIVERKIT_FIXTURES_PORT") {
            self.fixtures.port = parse_env("DRIVERKIT_FIXTURES_PORT", &v)?;
        }
        self.validate()
    }

    pub fn validate(&self) -> HarnessResult<()> {
        if self.target.scheme.trim().is_empty() {
            return Err(HarnessError::InvalidConfig("target.scheme must not be empty".into()));
        }
        if self.target.host.trim().is_empty() {
            return Err(HarnessError::InvalidConfig("target.host must not be empty".into()));
        }
        let t = &self.timeouts;
        if t.script_secs == 0 || t.implicit_secs == 0 || t.page_load_secs == 0 {
            return Err(HarnessError::InvalidConfig("timeouts must be non-zero".into()));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> HarnessResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| HarnessError::InvalidConfig(format!("{key}: cannot parse '{value}'")))
}
