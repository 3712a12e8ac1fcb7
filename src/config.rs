// src/config.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_AWK_COMMAND: &str = "COMPUTE_AWK_COMMAND";
pub const ENV_AWK_TIMEOUT_SECS: &str = "COMPUTE_AWK_TIMEOUT_SECS";
pub const ENV_MAX_CONCURRENT: &str = "COMPUTE_MAX_CONCURRENT";
pub const ENV_CONNECTORS_DIR: &str = "COMPUTE_CONNECTORS_DIR";

/// Engine settings. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fallback `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_filter: String,
    pub awk_command: String,
    pub awk_timeout_secs: u64,
    pub max_concurrent_pipelines: usize,
    pub connectors_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            awk_command: "awk".to_string(),
            awk_timeout_secs: 120,
            max_concurrent_pipelines: 4,
            connectors_dir: PathBuf::from("connectors"),
        }
    }
}

impl EngineConfig {
    /// Read `path` when given (defaults otherwise), then apply environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading config {:?}", path))?;
                serde_yaml::from_str::<Option<EngineConfig>>(&text)
                    .with_context(|| format!("parsing config {:?}", path))?
                    .unwrap_or_default()
            }
            None => EngineConfig::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate();
        Ok(config)
    }

    /// Replace values that would stall the engine with their defaults.
    fn validate(&mut self) {
        if self.max_concurrent_pipelines == 0 {
            let fallback = EngineConfig::default().max_concurrent_pipelines;
            warn!(
                "validate: max_concurrent_pipelines must be positive, using {}",
                fallback
            );
            self.max_concurrent_pipelines = fallback;
        }
    }

    /// Apply `COMPUTE_*` overrides looked up through `var`. Unparseable
    /// numbers are ignored.
    pub fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(cmd) = var(ENV_AWK_COMMAND).filter(|v| !v.trim().is_empty()) {
            self.awk_command = cmd;
        }
        if let Some(raw) = var(ENV_AWK_TIMEOUT_SECS) {
            match raw.trim().parse() {
                Ok(secs) => self.awk_timeout_secs = secs,
                Err(_) => warn!("apply_overrides: ignoring {}={:?}", ENV_AWK_TIMEOUT_SECS, raw),
            }
        }
        if let Some(raw) = var(ENV_MAX_CONCURRENT) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.max_concurrent_pipelines = n,
                _ => warn!("apply_overrides: ignoring {}={:?}", ENV_MAX_CONCURRENT, raw),
            }
        }
        if let Some(dir) = var(ENV_CONNECTORS_DIR).filter(|v| !v.trim().is_empty()) {
            self.connectors_dir = PathBuf::from(dir);
        }
    }

    pub fn awk_timeout(&self) -> Duration {
        Duration::from_secs(self.awk_timeout_secs)
    }

    /// Install the global fmt subscriber. `RUST_LOG` wins over `log_filter`.
    pub fn init_tracing(&self) {
        let env = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.log_filter));
        fmt::Subscriber::builder()
            .with_env_filter(env)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn defaults_when_file_is_partial_or_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("engine.yaml");
        fs::write(&path, "awk_timeout_secs: 30\n")?;
        let config = EngineConfig::load(Some(&path))?;
        assert_eq!(config.awk_timeout(), Duration::from_secs(30));
        assert_eq!(config.awk_command, "awk");
        assert_eq!(config.max_concurrent_pipelines, 4);

        fs::write(&path, "")?;
        let parsed: Option<EngineConfig> = serde_yaml::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(parsed.unwrap_or_default(), EngineConfig::default());
        Ok(())
    }

    #[test]
    fn environment_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_AWK_COMMAND, "gawk"),
            (ENV_AWK_TIMEOUT_SECS, "soon"),
            (ENV_MAX_CONCURRENT, "8"),
            (ENV_CONNECTORS_DIR, "/etc/connectors"),
        ]
        .into_iter()
        .collect();
        let mut config = EngineConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.awk_command, "gawk");
        assert_eq!(config.awk_timeout_secs, 120);
        assert_eq!(config.max_concurrent_pipelines, 8);
        assert_eq!(config.connectors_dir, PathBuf::from("/etc/connectors"));
    }

    #[test]
    fn zero_concurrency_falls_back_to_default() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("engine.yaml");
        fs::write(&path, "max_concurrent_pipelines: 0\n")?;
        let config = EngineConfig::load(Some(&path))?;
        assert_eq!(config.max_concurrent_pipelines, 4);
        Ok(())
    }

    #[test]
    fn unreadable_file_is_an_error() {
        assert!(EngineConfig::load(Some(Path::new("/nonexistent/engine.yaml"))).is_err());
    }
}
