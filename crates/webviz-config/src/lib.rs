//! Configuration management for the webviz site writer.
//!
//! Parses `webviz.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! Caller-side settings can be applied during load via [`Overrides`].
//!
//! ## Environment Variable Expansion
//!
//! Path-valued fields support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `output.destination`
//! - `template.path`

mod expand;

use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "webviz.toml";

/// Default output directory, relative to the config file.
const DEFAULT_DESTINATION: &str = "html_output";

/// Parameter names the writer passes to every template on its own.
///
/// Global parameters with these names would be shadowed at render time.
pub const RESERVED_PARAMETERS: [&str; 3] = ["page", "root_folder", "current_page"];

/// Settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct Overrides {
    /// Override output destination directory.
    pub destination: Option<PathBuf>,
    /// Override the policy for pre-existing output.
    pub on_existing: Option<OnExisting>,
    /// Override the page template path.
    pub template: Option<PathBuf>,
    /// Extra global parameters, as string values. Later entries win.
    pub parameters: Vec<(String, String)>,
}

/// What to do when the destination already holds output from an earlier run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnExisting {
    /// Refuse to write into a dirty destination.
    #[default]
    Fail,
    /// Remove the previous output before writing.
    Clean,
    /// Write over the previous output, keeping files that are not replaced.
    Keep,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output configuration (paths are relative strings from TOML).
    output: OutputConfigRaw,
    /// Template configuration (paths are relative strings from TOML).
    template: TemplateConfigRaw,
    /// Global parameters passed to every page render.
    pub parameters: Map<String, Value>,

    /// Resolved output configuration (set after loading).
    #[serde(skip)]
    pub output_resolved: OutputConfig,
    /// Resolved template configuration (set after loading).
    #[serde(skip)]
    pub template_resolved: TemplateConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw output configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OutputConfigRaw {
    destination: Option<String>,
    on_existing: Option<OnExisting>,
}

/// Resolved output configuration with absolute paths.
#[derive(Debug, Default)]
pub struct OutputConfig {
    /// Directory the site is written to.
    pub destination: PathBuf,
    /// Policy for a destination that is not clean.
    pub on_existing: OnExisting,
}

/// Raw template configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TemplateConfigRaw {
    path: Option<String>,
}

/// Resolved template configuration.
#[derive(Debug, Default)]
pub struct TemplateConfig {
    /// Page template file, if one is configured.
    pub path: Option<PathBuf>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`output.destination`").
        field: String,
        /// Error message (e.g., "${`REPORT_DIR`} not set").
        message: String,
    },
}

impl Config {
    /// Load configuration from file with optional overrides.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `webviz.toml` in current directory and parents.
    ///
    /// Overrides are applied after loading and path resolution, so they take
    /// precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration does not validate.
    pub fn load(
        config_path: Option<&Path>,
        overrides: Option<&Overrides>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(overrides) = overrides {
            config.apply_overrides(overrides);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply overrides to the configuration.
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(destination) = &overrides.destination {
            self.output_resolved.destination.clone_from(destination);
        }
        if let Some(on_existing) = overrides.on_existing {
            self.output_resolved.on_existing = on_existing;
        }
        if let Some(template) = &overrides.template {
            self.template_resolved.path = Some(template.clone());
        }
        for (key, value) in &overrides.parameters {
            self.parameters
                .insert(key.clone(), Value::String(value.clone()));
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            output: OutputConfigRaw::default(),
            template: TemplateConfigRaw::default(),
            parameters: Map::new(),
            output_resolved: OutputConfig {
                destination: base.join(DEFAULT_DESTINATION),
                on_existing: OnExisting::default(),
            },
            template_resolved: TemplateConfig::default(),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_output()?;
        self.validate_template()?;
        self.validate_parameters()?;
        Ok(())
    }

    fn validate_output(&self) -> Result<(), ConfigError> {
        if self.output_resolved.destination.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "output.destination cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_template(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.template_resolved.path
            && !path.is_file()
        {
            return Err(ConfigError::Validation(format!(
                "template.path does not exist: {}",
                path.display()
            )));
        }
        Ok(())
    }

    fn validate_parameters(&self) -> Result<(), ConfigError> {
        if let Some(name) = RESERVED_PARAMETERS
            .iter()
            .find(|name| self.parameters.contains_key(**name))
        {
            return Err(ConfigError::Validation(format!(
                "parameters.{name} is reserved for the page renderer"
            )));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref destination) = self.output.destination {
            self.output.destination =
                Some(expand::expand_env(destination, "output.destination")?);
        }
        if let Some(ref path) = self.template.path {
            self.template.path = Some(expand::expand_env(path, "template.path")?);
        }
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let destination = self
            .output
            .destination
            .as_deref()
            .unwrap_or(DEFAULT_DESTINATION);

        self.output_resolved = OutputConfig {
            destination: config_dir.join(destination),
            on_existing: self.output.on_existing.unwrap_or_default(),
        };
        self.template_resolved = TemplateConfig {
            path: self.template.path.as_deref().map(|p| config_dir.join(p)),
        };
    }
}
