//! Configuration management for figura.
//!
//! Parses `figura.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! Values are layered in this order, later layers winning:
//!
//! 1. built-in defaults
//! 2. `figura.toml`
//! 3. `FIGURA_*` environment variables
//! 4. [`CliSettings`]
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `output.url_prefix`
//! - `output.base_path`
//! - `plantuml.bin`
//! - `drawio.docker_bin`
//! - `drawio.image`

mod expand;

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the content directory scanned for documents.
    pub content_dir: Option<PathBuf>,
    /// Override the asset output directory.
    pub output_dir: Option<PathBuf>,
    /// Override the URL base path.
    pub base_path: Option<String>,
    /// Force the polling watcher.
    pub poll: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "figura.toml";

/// `PlantUML` CLI shipped by the `node-plantuml` package.
const LOCAL_PUML_BIN: &str = "node_modules/.bin/puml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Documentation configuration (paths are relative strings from TOML).
    docs: DocsConfigRaw,
    /// Output configuration (paths are relative strings from TOML).
    output: OutputConfigRaw,
    /// `PlantUML` backend configuration.
    plantuml: PlantUmlConfigRaw,
    /// Draw.io export configuration.
    pub drawio: DrawioConfig,
    /// Watch mode tuning.
    pub watch: WatchConfig,

    /// Resolved docs configuration (set after loading).
    #[serde(skip)]
    pub docs_resolved: DocsConfig,
    /// Resolved output configuration (set after loading).
    #[serde(skip)]
    pub output_resolved: OutputConfig,
    /// Resolved `PlantUML` configuration (set after loading).
    #[serde(skip)]
    pub plantuml_resolved: PlantUmlConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw docs configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DocsConfigRaw {
    content_dir: Option<String>,
    project_dir: Option<String>,
    extensions: Option<Vec<String>>,
}

/// Resolved documentation configuration with absolute paths.
#[derive(Debug, Default)]
pub struct DocsConfig {
    /// Directory scanned recursively for documents.
    pub content_dir: PathBuf,
    /// Project root. Draw.io sources and the staging area must live below it
    /// because it is bind-mounted into the export container.
    pub project_dir: PathBuf,
    /// Document file extensions, without the leading dot.
    pub extensions: Vec<String>,
}

/// Raw output configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OutputConfigRaw {
    dir: Option<String>,
    cache_dir: Option<String>,
    url_prefix: Option<String>,
    base_path: Option<String>,
}

/// Resolved output configuration.
#[derive(Debug, Default)]
pub struct OutputConfig {
    /// Asset store root containing `light/` and `dark/`.
    pub dir: PathBuf,
    /// Scratch directory for staged sources and exports.
    pub cache_dir: PathBuf,
    /// Public URL prefix of the asset store, e.g. `/diagrams/`.
    pub url_prefix: String,
    /// Optional site base path prepended to generated URLs.
    pub base_path: Option<String>,
}

/// Raw `PlantUML` configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PlantUmlConfigRaw {
    bin: Option<String>,
}

/// Resolved `PlantUML` configuration.
#[derive(Debug, Default)]
pub struct PlantUmlConfig {
    /// `puml` executable to invoke.
    pub bin: PathBuf,
}

/// Draw.io export configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DrawioConfig {
    /// Container runtime executable.
    pub docker_bin: String,
    /// Exporter image.
    pub image: String,
    /// Per-export timeout in seconds, enforced by the exporter itself.
    pub command_timeout: u32,
    /// Run the container as the owner of the staging directory.
    pub run_as_user: bool,
}

impl Default for DrawioConfig {
    fn default() -> Self {
        Self {
            docker_bin: "docker".to_owned(),
            image: "rlespinasse/drawio-export:latest".to_owned(),
            command_timeout: 180,
            run_as_user: false,
        }
    }
}

/// Watch mode tuning parameters.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiet period after the last event before a pass starts.
    pub debounce_ms: u64,
    /// How long changed files must stay unchanged on disk.
    pub stable_ms: u64,
    /// Interval between stability probes.
    pub stable_poll_ms: u64,
    /// How long self-touched documents are ignored.
    pub ignore_ms: u64,
    /// Scan interval for the polling watcher.
    pub scan_interval_ms: u64,
    /// Use the polling watcher instead of native file system events.
    pub poll: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            stable_ms: 600,
            stable_poll_ms: 150,
            ignore_ms: 1500,
            scan_interval_ms: 800,
            poll: false,
        }
    }
}

impl WatchConfig {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub fn stable(&self) -> Duration {
        Duration::from_millis(self.stable_ms)
    }

    #[must_use]
    pub fn stable_poll(&self) -> Duration {
        Duration::from_millis(self.stable_poll_ms)
    }

    #[must_use]
    pub fn ignore(&self) -> Duration {
        Duration::from_millis(self.ignore_ms)
    }

    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }
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
    /// Environment variable error during expansion or override.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path or variable name (e.g., "`drawio.image`").
        field: String,
        /// Error message (e.g., "${`DRAWIO_IMAGE`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a duration field to be non-zero.
fn require_positive(value: u64, field: &str) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}

/// Lexically normalize a path, resolving `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `figura.toml` in current directory and parents.
    ///
    /// Environment overrides are applied after path resolution and CLI
    /// settings after that, so CLI arguments take precedence.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// an environment override is malformed, or validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, cli_settings, |name| std::env::var(name).ok())
    }

    /// Like [`Config::load`], reading environment variables through `lookup`.
    pub fn load_with_env<F>(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path, &lookup)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered, &lookup)?
        } else {
            Self::default_with_cwd()
        };

        config.apply_env(&lookup)?;

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    ///
    /// Relative directories are taken from the current working directory.
    fn apply_cli_settings(&mut self, settings: &CliSettings) -> Result<(), ConfigError> {
        if let Some(content_dir) = &settings.content_dir {
            self.docs_resolved.content_dir = std::path::absolute(content_dir)?;
        }
        if let Some(output_dir) = &settings.output_dir {
            self.output_resolved.dir = std::path::absolute(output_dir)?;
        }
        if let Some(base_path) = &settings.base_path {
            self.output_resolved.base_path = Some(base_path.clone());
        }
        if let Some(poll) = settings.poll {
            self.watch.poll = poll;
        }
        Ok(())
    }

    /// Apply `FIGURA_*` environment variable overrides.
    fn apply_env<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bin) = lookup("FIGURA_PLANTUML_BIN") {
            self.plantuml_resolved.bin = PathBuf::from(bin);
        }
        if let Some(bin) = lookup("FIGURA_DRAWIO_DOCKER_BIN") {
            self.drawio.docker_bin = bin;
        }
        if let Some(image) = lookup("FIGURA_DRAWIO_IMAGE") {
            self.drawio.image = image;
        }
        if let Some(timeout) = lookup("FIGURA_DRAWIO_COMMAND_TIMEOUT") {
            self.drawio.command_timeout = parse_env_number("FIGURA_DRAWIO_COMMAND_TIMEOUT", &timeout)?;
        }
        if let Some(flag) = lookup("FIGURA_DRAWIO_RUN_AS_USER") {
            self.drawio.run_as_user = flag == "true";
        }
        if let Some(base_path) = lookup("FIGURA_BASE_PATH") {
            self.output_resolved.base_path = Some(base_path).filter(|p| !p.is_empty());
        }

        let durations: [(&str, &mut u64); 5] = [
            ("FIGURA_WATCH_DEBOUNCE_MS", &mut self.watch.debounce_ms),
            ("FIGURA_WATCH_STABLE_MS", &mut self.watch.stable_ms),
            ("FIGURA_WATCH_STABLE_POLL_MS", &mut self.watch.stable_poll_ms),
            ("FIGURA_WATCH_IGNORE_MS", &mut self.watch.ignore_ms),
            ("FIGURA_WATCH_SCAN_INTERVAL_MS", &mut self.watch.scan_interval_ms),
        ];
        for (name, slot) in durations {
            if let Some(value) = lookup(name) {
                *slot = parse_env_number(name, &value)?;
            }
        }

        Ok(())
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
        let mut config = Self {
            docs: DocsConfigRaw::default(),
            output: OutputConfigRaw::default(),
            plantuml: PlantUmlConfigRaw::default(),
            drawio: DrawioConfig::default(),
            watch: WatchConfig::default(),
            docs_resolved: DocsConfig::default(),
            output_resolved: OutputConfig::default(),
            plantuml_resolved: PlantUmlConfig::default(),
            config_path: None,
        };
        config.resolve_paths(base);
        config
    }

    /// Load configuration from a specific file.
    fn load_from_file<F>(path: &Path, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = std::path::absolute(path)?;
        let content = std::fs::read_to_string(&path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars(lookup)?;

        let config_dir = path.parent().unwrap_or(Path::new("/"));
        config.resolve_paths(config_dir);
        config.config_path = Some(path);

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically at the end of [`Config::load`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_docs()?;
        self.validate_output()?;
        self.validate_drawio()?;
        self.validate_watch()?;
        Ok(())
    }

    fn validate_docs(&self) -> Result<(), ConfigError> {
        if self.docs_resolved.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "docs.extensions cannot be empty".to_owned(),
            ));
        }
        for ext in &self.docs_resolved.extensions {
            require_non_empty(ext, "docs.extensions")?;
            if ext.starts_with('.') {
                return Err(ConfigError::Validation(format!(
                    "docs.extensions entries must not start with a dot (got \"{ext}\")"
                )));
            }
        }
        Ok(())
    }

    fn validate_output(&self) -> Result<(), ConfigError> {
        let prefix = &self.output_resolved.url_prefix;
        if !prefix.starts_with('/') || !prefix.ends_with('/') {
            return Err(ConfigError::Validation(format!(
                "output.url_prefix must start and end with '/' (got \"{prefix}\")"
            )));
        }

        if let Some(base_path) = &self.output_resolved.base_path
            && !base_path.starts_with('/')
        {
            return Err(ConfigError::Validation(format!(
                "output.base_path must start with '/' (got \"{base_path}\")"
            )));
        }

        // The exporter only sees the project directory through its bind mount
        let cache_dir = normalize(&self.output_resolved.cache_dir);
        let project_dir = normalize(&self.docs_resolved.project_dir);
        if !cache_dir.starts_with(&project_dir) {
            return Err(ConfigError::Validation(format!(
                "output.cache_dir ({}) must be inside docs.project_dir ({})",
                cache_dir.display(),
                project_dir.display()
            )));
        }

        Ok(())
    }

    fn validate_drawio(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.drawio.docker_bin, "drawio.docker_bin")?;
        require_non_empty(&self.drawio.image, "drawio.image")?;
        if self.drawio.command_timeout == 0 {
            return Err(ConfigError::Validation(
                "drawio.command_timeout must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_watch(&self) -> Result<(), ConfigError> {
        require_positive(self.watch.debounce_ms, "watch.debounce_ms")?;
        require_positive(self.watch.stable_ms, "watch.stable_ms")?;
        require_positive(self.watch.stable_poll_ms, "watch.stable_poll_ms")?;
        require_positive(self.watch.ignore_ms, "watch.ignore_ms")?;
        require_positive(self.watch.scan_interval_ms, "watch.scan_interval_ms")?;
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expand = |value: &str, field: &str| expand::expand_with(value, field, lookup);

        if let Some(ref prefix) = self.output.url_prefix {
            self.output.url_prefix = Some(expand(prefix, "output.url_prefix")?);
        }
        if let Some(ref base_path) = self.output.base_path {
            self.output.base_path = Some(expand(base_path, "output.base_path")?);
        }
        if let Some(ref bin) = self.plantuml.bin {
            self.plantuml.bin = Some(expand(bin, "plantuml.bin")?);
        }
        self.drawio.docker_bin = expand(&self.drawio.docker_bin, "drawio.docker_bin")?;
        self.drawio.image = expand(&self.drawio.image, "drawio.image")?;

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        let project_dir = self
            .docs
            .project_dir
            .as_deref()
            .map_or_else(|| config_dir.to_path_buf(), |dir| config_dir.join(dir));
        self.docs_resolved = DocsConfig {
            content_dir: resolve(self.docs.content_dir.as_deref(), "docs"),
            extensions: self
                .docs
                .extensions
                .clone()
                .unwrap_or_else(|| vec!["md".to_owned(), "mdx".to_owned()]),
            project_dir: project_dir.clone(),
        };

        self.output_resolved = OutputConfig {
            dir: resolve(self.output.dir.as_deref(), "public/diagrams"),
            cache_dir: resolve(self.output.cache_dir.as_deref(), ".cache/figura"),
            url_prefix: self
                .output
                .url_prefix
                .clone()
                .unwrap_or_else(|| "/diagrams/".to_owned()),
            base_path: self.output.base_path.clone().filter(|p| !p.is_empty()),
        };

        self.plantuml_resolved = PlantUmlConfig {
            bin: match &self.plantuml.bin {
                Some(bin) => PathBuf::from(bin),
                None => default_puml_bin(&project_dir),
            },
        };
    }
}

/// Prefer the project-local `puml` over the one on `PATH`.
fn default_puml_bin(project_dir: &Path) -> PathBuf {
    let local = project_dir.join(LOCAL_PUML_BIN);
    if local.exists() {
        local
    } else {
        PathBuf::from("puml")
    }
}

fn parse_env_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::EnvVar {
        field: name.to_owned(),
        message: format!("expected a non-negative integer, got \"{value}\""),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.docs_resolved.content_dir, PathBuf::from("/test/docs"));
        assert_eq!(config.docs_resolved.project_dir, PathBuf::from("/test"));
        assert_eq!(config.docs_resolved.extensions, vec!["md", "mdx"]);
        assert_eq!(
            config.output_resolved.dir,
            PathBuf::from("/test/public/diagrams")
        );
        assert_eq!(
            config.output_resolved.cache_dir,
            PathBuf::from("/test/.cache/figura")
        );
        assert_eq!(config.output_resolved.url_prefix, "/diagrams/");
        assert_eq!(config.output_resolved.base_path, None);
        assert_eq!(config.plantuml_resolved.bin, PathBuf::from("puml"));
        assert_eq!(config.drawio.docker_bin, "docker");
        assert_eq!(config.drawio.image, "rlespinasse/drawio-export:latest");
        assert_eq!(config.drawio.command_timeout, 180);
        assert!(!config.drawio.run_as_user);
        assert_eq!(config.watch, WatchConfig::default());
    }

    #[test]
    fn test_watch_durations() {
        let watch = WatchConfig::default();
        assert_eq!(watch.debounce(), Duration::from_millis(300));
        assert_eq!(watch.stable(), Duration::from_millis(600));
        assert_eq!(watch.stable_poll(), Duration::from_millis(150));
        assert_eq!(watch.ignore(), Duration::from_millis(1500));
        assert_eq!(watch.scan_interval(), Duration::from_millis(800));
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.drawio.docker_bin, "docker");
        assert_eq!(config.watch.debounce_ms, 300);
    }

    #[test]
    fn test_parse_drawio_and_watch_config() {
        let toml = r#"
[drawio]
docker_bin = "podman"
image = "example/drawio:26"
command_timeout = 60
run_as_user = true

[watch]
debounce_ms = 100
stable_ms = 250
poll = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.drawio.docker_bin, "podman");
        assert_eq!(config.drawio.image, "example/drawio:26");
        assert_eq!(config.drawio.command_timeout, 60);
        assert!(config.drawio.run_as_user);
        assert_eq!(config.watch.debounce_ms, 100);
        assert_eq!(config.watch.stable_ms, 250);
        assert_eq!(config.watch.stable_poll_ms, 150);
        assert!(config.watch.poll);
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[docs]
content_dir = "content/docs"
extensions = ["mdx"]

[output]
dir = "public/kubos/diagrams"
cache_dir = ".cache"
url_prefix = "/kubos/diagrams/"
base_path = "/handbook"

[plantuml]
bin = "/usr/local/bin/puml"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.docs_resolved.content_dir,
            PathBuf::from("/project/content/docs")
        );
        assert_eq!(config.docs_resolved.extensions, vec!["mdx"]);
        assert_eq!(
            config.output_resolved.dir,
            PathBuf::from("/project/public/kubos/diagrams")
        );
        assert_eq!(
            config.output_resolved.cache_dir,
            PathBuf::from("/project/.cache")
        );
        assert_eq!(config.output_resolved.url_prefix, "/kubos/diagrams/");
        assert_eq!(
            config.output_resolved.base_path,
            Some("/handbook".to_owned())
        );
        assert_eq!(
            config.plantuml_resolved.bin,
            PathBuf::from("/usr/local/bin/puml")
        );
    }

    #[test]
    fn test_local_puml_bin_preferred() {
        let dir = tempfile::tempdir().unwrap();
        let bin_dir = dir.path().join("node_modules/.bin");
        std::fs::create_dir_all(&bin_dir).unwrap();
        std::fs::write(bin_dir.join("puml"), "#!/bin/sh\n").unwrap();

        let config = Config::default_with_base(dir.path());

        assert_eq!(config.plantuml_resolved.bin, bin_dir.join("puml"));
    }

    #[test]
    fn test_load_from_file_expands_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[drawio]
image = "${REGISTRY}/drawio-export:latest"

[output]
base_path = "${SITE_BASE:-/docs}"
"#,
        )
        .unwrap();

        let config =
            Config::load_with_env(Some(&path), None, env(&[("REGISTRY", "ghcr.io/acme")]))
                .unwrap();

        assert_eq!(config.drawio.image, "ghcr.io/acme/drawio-export:latest");
        assert_eq!(config.output_resolved.base_path, Some("/docs".to_owned()));
        assert_eq!(config.config_path, Some(path));
        assert_eq!(
            config.docs_resolved.content_dir,
            dir.path().join("docs")
        );
    }

    #[test]
    fn test_load_missing_var_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[plantuml]\nbin = \"${PUML_HOME}/puml\"\n").unwrap();

        let err = Config::load_with_env(Some(&path), None, no_env).unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("plantuml.bin"));
        assert!(err.to_string().contains("PUML_HOME"));
    }

    #[test]
    fn test_load_explicit_path_not_found() {
        let err = Config::load_with_env(Some(Path::new("/nonexistent/figura.toml")), None, no_env)
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_apply_env_overrides() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let lookup = env(&[
            ("FIGURA_PLANTUML_BIN", "/opt/puml"),
            ("FIGURA_DRAWIO_DOCKER_BIN", "podman"),
            ("FIGURA_DRAWIO_IMAGE", "drawio:pinned"),
            ("FIGURA_DRAWIO_COMMAND_TIMEOUT", "90"),
            ("FIGURA_DRAWIO_RUN_AS_USER", "true"),
            ("FIGURA_WATCH_DEBOUNCE_MS", "50"),
            ("FIGURA_WATCH_STABLE_MS", "500"),
            ("FIGURA_WATCH_STABLE_POLL_MS", "120"),
            ("FIGURA_WATCH_IGNORE_MS", "2000"),
            ("FIGURA_WATCH_SCAN_INTERVAL_MS", "400"),
            ("FIGURA_BASE_PATH", "/handbook"),
        ]);

        config.apply_env(&lookup).unwrap();

        assert_eq!(config.plantuml_resolved.bin, PathBuf::from("/opt/puml"));
        assert_eq!(config.drawio.docker_bin, "podman");
        assert_eq!(config.drawio.image, "drawio:pinned");
        assert_eq!(config.drawio.command_timeout, 90);
        assert!(config.drawio.run_as_user);
        assert_eq!(
            config.watch,
            WatchConfig {
                debounce_ms: 50,
                stable_ms: 500,
                stable_poll_ms: 120,
                ignore_ms: 2000,
                scan_interval_ms: 400,
                poll: false,
            }
        );
        assert_eq!(
            config.output_resolved.base_path,
            Some("/handbook".to_owned())
        );
    }

    #[test]
    fn test_apply_env_run_as_user_requires_literal_true() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config
            .apply_env(&env(&[("FIGURA_DRAWIO_RUN_AS_USER", "yes")]))
            .unwrap();
        assert!(!config.drawio.run_as_user);
    }

    #[test]
    fn test_apply_env_invalid_number() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let err = config
            .apply_env(&env(&[("FIGURA_WATCH_STABLE_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("FIGURA_WATCH_STABLE_MS"));
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            content_dir: Some(PathBuf::from("/custom/docs")),
            output_dir: Some(PathBuf::from("/custom/out")),
            base_path: Some("/base".to_owned()),
            poll: Some(true),
        };

        config.apply_cli_settings(&overrides).unwrap();

        assert_eq!(
            config.docs_resolved.content_dir,
            PathBuf::from("/custom/docs")
        );
        assert_eq!(config.output_resolved.dir, PathBuf::from("/custom/out"));
        assert_eq!(config.output_resolved.base_path, Some("/base".to_owned()));
        assert!(config.watch.poll);
        // Unchanged
        assert_eq!(
            config.output_resolved.cache_dir,
            PathBuf::from("/test/.cache/figura")
        );
    }

    #[test]
    fn test_relative_cli_dirs_resolve_from_cwd() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            content_dir: Some(PathBuf::from("docs")),
            output_dir: Some(PathBuf::from("public/diagrams")),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides).unwrap();

        let cwd = std::env::current_dir().unwrap();
        assert_eq!(config.docs_resolved.content_dir, cwd.join("docs"));
        assert_eq!(config.output_resolved.dir, cwd.join("public/diagrams"));
    }

    #[test]
    fn test_load_relative_config_path() {
        let dir = tempfile::tempdir_in(".").unwrap();
        let cwd = std::env::current_dir().unwrap();
        let relative = dir.path().strip_prefix(&cwd).unwrap_or(dir.path());
        let relative = relative.join(CONFIG_FILENAME);
        std::fs::write(&relative, "").unwrap();

        let config = Config::load_with_env(Some(&relative), None, no_env).unwrap();

        let project_dir = &config.docs_resolved.project_dir;
        assert!(project_dir.is_absolute(), "{}", project_dir.display());
        assert!(!project_dir.as_os_str().is_empty());
        assert_eq!(config.docs_resolved.content_dir, project_dir.join("docs"));
        assert!(config.config_path.unwrap().is_absolute());
    }

    #[test]
    fn test_cli_settings_win_over_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "").unwrap();
        let settings = CliSettings {
            base_path: Some("/from-cli".to_owned()),
            ..Default::default()
        };

        let config = Config::load_with_env(
            Some(&path),
            Some(&settings),
            env(&[("FIGURA_BASE_PATH", "/from-env")]),
        )
        .unwrap();

        assert_eq!(
            config.output_resolved.base_path,
            Some("/from-cli".to_owned())
        );
    }

    // Validation tests

    /// Assert that validation fails with expected substrings in the error message.
    fn assert_validation_error(config: &Config, expected_substrings: &[&str]) {
        let result = config.validate();
        assert!(result.is_err(), "Expected validation to fail");
        let err = result.unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        let msg = err.to_string();
        for s in expected_substrings {
            assert!(
                msg.contains(s),
                "Expected error to contain '{s}', got: {msg}"
            );
        }
    }

    #[test]
    fn test_validate_default_config_passes() {
        let config = Config::default_with_base(Path::new("/test"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_cache_dir_outside_project() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.output_resolved.cache_dir = PathBuf::from("/tmp/figura");
        assert_validation_error(&config, &["cache_dir", "project_dir"]);
    }

    #[test]
    fn test_validate_cache_dir_escaping_with_parent_component() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.output_resolved.cache_dir = PathBuf::from("/test/../elsewhere/cache");
        assert_validation_error(&config, &["cache_dir"]);
    }

    #[test]
    fn test_validate_url_prefix_slashes() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.output_resolved.url_prefix = "diagrams".to_owned();
        assert_validation_error(&config, &["url_prefix", "'/'"]);
    }

    #[test]
    fn test_validate_base_path_must_be_absolute() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.output_resolved.base_path = Some("docs".to_owned());
        assert_validation_error(&config, &["base_path"]);
    }

    #[test]
    fn test_validate_empty_extensions() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.docs_resolved.extensions.clear();
        assert_validation_error(&config, &["docs.extensions", "empty"]);
    }

    #[test]
    fn test_validate_dotted_extension() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.docs_resolved.extensions = vec![".md".to_owned()];
        assert_validation_error(&config, &["docs.extensions", ".md"]);
    }

    #[test]
    fn test_validate_drawio_image_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.drawio.image = String::new();
        assert_validation_error(&config, &["drawio.image", "empty"]);
    }

    #[test]
    fn test_validate_drawio_timeout_zero() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.drawio.command_timeout = 0;
        assert_validation_error(&config, &["command_timeout"]);
    }

    #[test]
    fn test_validate_watch_zero_duration() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.watch.stable_poll_ms = 0;
        assert_validation_error(&config, &["watch.stable_poll_ms", "greater than 0"]);
    }
}
