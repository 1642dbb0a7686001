//! Configuration file support.
//!
//! Settings come from a global file (`~/.resbench/config.toml`) overridden by a
//! local one (`./.resbenchrc`). Command-line flags override both.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResbenchConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub gather: GatherConfig,

    #[serde(default)]
    pub manifest: ManifestConfig,

    #[serde(default)]
    pub bench: BenchConfig,
}

/// Defaults for `resbench gather`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatherConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub warmup_steps: Option<u64>,
    #[serde(default)]
    pub batch_size: Option<u32>,
}

/// Defaults and credentials for `resbench manifest`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestConfig {
    #[serde(default)]
    pub filename: Option<PathBuf>,
    #[serde(default)]
    pub dataset: Option<String>,
    #[serde(default)]
    pub storage_account: Option<String>,
    #[serde(default)]
    pub registry_server: Option<String>,
    #[serde(default)]
    pub registry_username: Option<String>,
    #[serde(default)]
    pub registry_password: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub run_script: Option<String>,
}

/// Defaults for `resbench bench`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub num_steps: Option<u64>,
    #[serde(default)]
    pub warmup_steps: Option<u64>,
    #[serde(default)]
    pub num_devices: Option<u64>,
    #[serde(default)]
    pub examples_per_epoch: Option<u64>,
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Overwrite `dst` when `src` is set.
fn merge_opt<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
    if let Some(value) = src {
        *dst = Some(value.clone());
    }
}

impl ResbenchConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
    }

    /// Get default global configuration file path.
    pub fn default_global_path() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".resbench")
            .join("config.toml")
    }

    /// Get default local configuration file path.
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".resbenchrc")
    }

    /// Discover and load configuration files.
    ///
    /// Loads `global` (or the default global path), then the local
    /// `./.resbenchrc` on top. Missing files are skipped; a file that exists but
    /// does not parse is an error.
    pub fn discover_and_load(global: Option<&Path>) -> ConfigResult<Self> {
        let mut config = Self::default();

        let global_path = global.map_or_else(Self::default_global_path, Path::to_path_buf);
        match Self::load_from_file(&global_path) {
            Ok(global_config) => config.merge(&global_config),
            Err(ConfigError::NotFound(_)) if global.is_none() => {}
            Err(e) => return Err(e),
        }

        match Self::load_from_file(&Self::default_local_path()) {
            Ok(local_config) => config.merge(&local_config),
            Err(ConfigError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        Ok(config)
    }

    /// Merge another configuration into this one.
    ///
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &Self) {
        merge_opt(&mut self.log_level, &other.log_level);

        let (g, og) = (&mut self.gather, &other.gather);
        merge_opt(&mut g.dir, &og.dir);
        merge_opt(&mut g.pattern, &og.pattern);
        merge_opt(&mut g.output, &og.output);
        merge_opt(&mut g.warmup_steps, &og.warmup_steps);
        merge_opt(&mut g.batch_size, &og.batch_size);

        let (m, om) = (&mut self.manifest, &other.manifest);
        merge_opt(&mut m.filename, &om.filename);
        merge_opt(&mut m.dataset, &om.dataset);
        merge_opt(&mut m.storage_account, &om.storage_account);
        merge_opt(&mut m.registry_server, &om.registry_server);
        merge_opt(&mut m.registry_username, &om.registry_username);
        merge_opt(&mut m.registry_password, &om.registry_password);
        merge_opt(&mut m.access_token, &om.access_token);
        merge_opt(&mut m.run_script, &om.run_script);

        let (b, ob) = (&mut self.bench, &other.bench);
        merge_opt(&mut b.data_dir, &ob.data_dir);
        merge_opt(&mut b.batch_size, &ob.batch_size);
        merge_opt(&mut b.num_steps, &ob.num_steps);
        merge_opt(&mut b.warmup_steps, &ob.warmup_steps);
        merge_opt(&mut b.num_devices, &ob.num_devices);
        merge_opt(&mut b.examples_per_epoch, &ob.examples_per_epoch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
log_level = "debug"

[gather]
pattern = "*.log"
batch_size = 256

[manifest]
dataset = "imagenet-mini"
"#,
        )
        .unwrap();

        let config = ResbenchConfig::load_from_file(&path).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.gather.pattern.as_deref(), Some("*.log"));
        assert_eq!(config.gather.batch_size, Some(256));
        assert_eq!(config.gather.warmup_steps, None);
        assert_eq!(config.manifest.dataset.as_deref(), Some("imagenet-mini"));
        assert_eq!(config.bench, BenchConfig::default());
    }

    #[test]
    fn test_load_missing_and_invalid() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.toml");
        assert!(matches!(ResbenchConfig::load_from_file(&missing), Err(ConfigError::NotFound(_))));

        let bad = temp.path().join("bad.toml");
        std::fs::write(&bad, "[gather\nbatch_size = ").unwrap();
        assert!(matches!(ResbenchConfig::load_from_file(&bad), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_merge_overrides_only_set_values() {
        let mut base = ResbenchConfig::default();
        base.gather.pattern = Some("*.stderr".to_string());
        base.gather.batch_size = Some(32);

        let mut local = ResbenchConfig::default();
        local.gather.batch_size = Some(64);
        local.bench.num_devices = Some(8);

        base.merge(&local);
        assert_eq!(base.gather.pattern.as_deref(), Some("*.stderr"));
        assert_eq!(base.gather.batch_size, Some(64));
        assert_eq!(base.bench.num_devices, Some(8));
    }

    #[test]
    fn test_explicit_global_path_must_exist() {
        let temp = TempDir::new().unwrap();
        let result = ResbenchConfig::discover_and_load(Some(&temp.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
