//! CLI configuration loading and merging.

use anyhow::Context;
use resbench_core::{ManifestConfig, ManifestSettings, ResbenchConfig};
use std::path::Path;

/// Environment variable holding the storage access token for manifests.
pub const STORAGE_TOKEN_ENV: &str = "RESBENCH_STORAGE_TOKEN";

/// Environment variable holding the container registry password for manifests.
pub const REGISTRY_PASSWORD_ENV: &str = "RESBENCH_REGISTRY_PASSWORD";

/// Load and merge CLI configuration.
///
/// Configuration precedence:
/// 1. CLI arguments (handled by clap)
/// 2. Local config file (./.resbenchrc)
/// 3. Global config file (--config, or ~/.resbench/config.toml)
/// 4. Defaults
pub fn load_config(global: Option<&Path>) -> anyhow::Result<ResbenchConfig> {
    ResbenchConfig::discover_and_load(global).context("Failed to load configuration")
}

/// Resolve manifest settings from configuration and environment.
///
/// Credentials come from the environment when set, then the config file,
/// then placeholders.
pub fn manifest_settings(config: &ManifestConfig) -> ManifestSettings {
    let mut settings = ManifestSettings::default();

    if let Some(ref account) = config.storage_account {
        settings.storage_account = account.clone();
    }
    if let Some(ref server) = config.registry_server {
        settings.registry_server = server.clone();
    }
    if let Some(ref username) = config.registry_username {
        settings.registry_username = username.clone();
    }
    if let Some(ref script) = config.run_script {
        settings.run_script = script.clone();
    }

    if let Some(token) = std::env::var(STORAGE_TOKEN_ENV).ok().or_else(|| config.access_token.clone()) {
        settings.access_token = token;
    }
    if let Some(password) = std::env::var(REGISTRY_PASSWORD_ENV).ok().or_else(|| config.registry_password.clone()) {
        settings.registry_password = password;
    }

    settings
}
