//! Configuration layering, fallback logic, and environment overrides

use std::collections::HashMap;

use camino::Utf8PathBuf;
use souk_core::error::SoukError;
use tracing::debug;

use crate::toml::{validate_config, AuthSection, SoukConfig};
use crate::ConfigResult;

/// Project configuration file name
pub const CONFIG_TOML: &str = "souk.toml";
/// Fallback project configuration file name
pub const CONFIG_JSON: &str = "souk.json";

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
    /// Location of the per-user configuration
    global_path: Option<Utf8PathBuf>,
}

/// Configuration layering and merging
#[derive(Debug, Default)]
pub struct ConfigLayering {
    /// Global configuration
    global_config: Option<SoukConfig>,
    /// Project configuration
    project_config: Option<SoukConfig>,
    /// Environment overrides
    env_overrides: HashMap<String, String>,
    /// CLI flag overrides
    cli_overrides: HashMap<String, String>,
}

/// Configuration source tracking
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Global config file
    Global(Utf8PathBuf),
    /// Project souk.toml file
    ProjectToml(Utf8PathBuf),
    /// Project souk.json file (fallback)
    ProjectJson(Utf8PathBuf),
    /// Environment variable
    Environment(String),
    /// CLI flag
    CommandLine,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self {
            cwd,
            global_path: Self::default_global_path(),
        }
    }

    /// Read the per-user configuration from `path` instead of the home directory
    pub fn with_global_path(mut self, path: Utf8PathBuf) -> Self {
        self.global_path = Some(path);
        self
    }

    /// `~/.souk/config.toml`, if the home directory is known
    pub fn default_global_path() -> Option<Utf8PathBuf> {
        let home_dir = dirs::home_dir()?;
        let home_dir = Utf8PathBuf::try_from(home_dir).ok()?;
        Some(home_dir.join(".souk").join("config.toml"))
    }

    /// Load project configuration with fallbacks
    pub async fn load_project_config(&self) -> ConfigResult<(SoukConfig, ConfigSource)> {
        // First, try to find souk.toml
        let toml_path = self.resolve_config_path(CONFIG_TOML)?;
        if toml_path.exists() {
            let config = crate::toml::load_from_file(&toml_path).await?;
            return Ok((config, ConfigSource::ProjectToml(toml_path)));
        }

        // Fall back to souk.json if no souk.toml
        let json_path = self.resolve_config_path(CONFIG_JSON)?;
        if json_path.exists() {
            let config = crate::json::load_from_file(&json_path).await?;
            return Ok((config, ConfigSource::ProjectJson(json_path)));
        }

        // No configuration found
        Err(SoukError::config(
            "config",
            "No souk.toml or souk.json found in current directory or parent directories",
        ))
    }

    /// Find configuration file in project (walks up directory tree)
    pub fn resolve_config_path(&self, filename: &str) -> ConfigResult<Utf8PathBuf> {
        let mut current = self.cwd.as_path();

        loop {
            let config_path = current.join(filename);
            if config_path.exists() {
                return Ok(config_path);
            }

            // Move up one directory
            if let Some(parent) = current.parent() {
                current = parent;
            } else {
                // Reached filesystem root
                break;
            }
        }

        // Return path in current directory even if it doesn't exist
        Ok(self.cwd.join(filename))
    }

    /// Load global configuration
    pub async fn load_global_config(&self) -> ConfigResult<Option<(SoukConfig, Utf8PathBuf)>> {
        match &self.global_path {
            Some(path) if path.exists() => {
                let config = crate::toml::load_from_file(path).await?;
                Ok(Some((config, path.clone())))
            },
            _ => Ok(None),
        }
    }

    /// Resolve the effective configuration from every layer.
    ///
    /// Precedence, lowest first: built-in defaults, global file, project file,
    /// `SOUK_*` environment variables, CLI flags.
    pub async fn load(
        &self,
        env_overrides: HashMap<String, String>,
        cli_overrides: HashMap<String, String>,
    ) -> ConfigResult<(SoukConfig, Vec<ConfigSource>)> {
        let mut sources = Vec::new();
        let mut layering = ConfigLayering::new();

        if let Some((global, path)) = self.load_global_config().await? {
            sources.push(ConfigSource::Global(path));
            layering = layering.with_global(global);
        }

        match self.load_project_config().await {
            Ok((project, source)) => {
                sources.push(source);
                layering = layering.with_project(project);
            },
            Err(SoukError::Config { field, .. }) if field == "config" => {
                debug!(cwd = %self.cwd, "No project configuration found");
            },
            Err(e) => return Err(e),
        }

        sources.extend(env_overrides.keys().map(|key| ConfigSource::Environment(key.clone())));
        if !cli_overrides.is_empty() {
            sources.push(ConfigSource::CommandLine);
        }

        let config = layering.with_env(env_overrides).with_cli(cli_overrides).merge()?;
        debug!(?sources, "Resolved configuration");
        Ok((config, sources))
    }
}

impl ConfigLayering {
    /// Create a new configuration layering system
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global(mut self, config: SoukConfig) -> Self {
        self.global_config = Some(config);
        self
    }

    pub fn with_project(mut self, config: SoukConfig) -> Self {
        self.project_config = Some(config);
        self
    }

    pub fn with_env(mut self, overrides: HashMap<String, String>) -> Self {
        self.env_overrides = overrides;
        self
    }

    pub fn with_cli(mut self, overrides: HashMap<String, String>) -> Self {
        self.cli_overrides = overrides;
        self
    }

    /// Merge the collected layers
    pub fn merge(self) -> ConfigResult<SoukConfig> {
        Self::merge_configs(
            self.global_config,
            self.project_config,
            self.env_overrides,
            self.cli_overrides,
        )
    }

    /// Merge multiple configuration layers.
    ///
    /// Project `[client]` and `[retry]` sections replace the global ones;
    /// cache prefixes and credentials missing from the project are taken from
    /// the global file.
    pub fn merge_configs(
        global_config: Option<SoukConfig>,
        project_config: Option<SoukConfig>,
        env_overrides: HashMap<String, String>,
        cli_overrides: HashMap<String, String>,
    ) -> ConfigResult<SoukConfig> {
        let mut merged = match (global_config, project_config) {
            (Some(global), Some(mut project)) => {
                // Merge global cache prefixes that aren't overridden
                for (prefix, section) in global.cache {
                    project.cache.entry(prefix).or_insert(section);
                }
                if project.auth.is_none() {
                    project.auth = global.auth;
                }
                project
            },
            (None, Some(project)) => project,
            (Some(global), None) => global,
            (None, None) => SoukConfig::default(),
        };

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut merged, &env_overrides)?;

        // Apply CLI flag overrides (highest priority)
        Self::apply_cli_overrides(&mut merged, &cli_overrides)?;

        validate_config(&merged)?;
        Ok(merged)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(config: &mut SoukConfig, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "SOUK_BASE_URL" => config.client.base_url = value.clone(),
                "SOUK_TIMEOUT_MS" => config.client.timeout_ms = parse_number(key, value)?,
                "SOUK_MAX_RETRIES" => config.retry.max_retries = parse_number(key, value)?,
                "SOUK_RETRY_DELAY_MS" => config.retry.retry_delay_ms = parse_number(key, value)?,
                "SOUK_AUTH_TOKEN" => {
                    config.auth = Some(AuthSection {
                        token: value.clone(),
                    })
                },
                _ => {
                    // Unknown environment variable, ignore
                },
            }
        }

        Ok(())
    }

    /// Apply CLI flag overrides
    fn apply_cli_overrides(config: &mut SoukConfig, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "base_url" => config.client.base_url = value.clone(),
                "timeout_ms" => config.client.timeout_ms = parse_number(key, value)?,
                "max_retries" => config.retry.max_retries = parse_number(key, value)?,
                "retry_delay_ms" => config.retry.retry_delay_ms = parse_number(key, value)?,
                "token" => {
                    config.auth = Some(AuthSection {
                        token: value.clone(),
                    })
                },
                _ => {
                    // Unknown CLI override, ignore
                },
            }
        }

        Ok(())
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars().filter(|(key, _)| key.starts_with("SOUK_")).collect()
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> ConfigResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| SoukError::config(field, format!("Invalid number '{}': {}", value, e)))
}
