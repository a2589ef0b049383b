//! Configuration for the wr rendering pipeline.
//!
//! Parses `wr.toml` files with serde and discovers them in the current
//! directory or its parents. Command line values are applied on top through
//! [`CliSettings`].
//!
//! ```toml
//! [rendering]
//! default_syntax = "xwiki/2.0"
//! target_syntax = "xhtml/1.0"
//! max_macro_depth = 32
//!
//! [macros]
//! disabled = ["include"]
//!
//! [[macros.wiki]]
//! id = "greet"
//! description = "Greets someone"
//! body = "Hello **{{get name=\"macro.params.who\"/}}**"
//! parameters = [{ name = "who", mandatory = true }]
//!
//! [wiki]
//! base_url = "${WIKI_URL:-/wiki}"
//! source_dir = "pages"
//!
//! [wiki.interwiki]
//! wikipedia = "https://en.wikipedia.org/wiki/"
//! ```
//!
//! ## Environment Variable Expansion
//!
//! `wiki.base_url` and `wiki.source_dir` support `${VAR}` (error if unset) and
//! `${VAR:-default}`.

mod expand;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use wr_xdom::Syntax;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "wr.toml";

/// Upper bound accepted for `rendering.max_macro_depth`.
const MAX_MACRO_DEPTH_LIMIT: usize = 1024;

/// CLI settings that override configuration file values.
///
/// Only `Some` values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Syntax of the input document.
    pub default_syntax: Option<Syntax>,
    /// Syntax to render to.
    pub target_syntax: Option<Syntax>,
    pub max_macro_depth: Option<usize>,
    /// Directory documents are included from.
    pub source_dir: Option<PathBuf>,
    pub base_url: Option<String>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "rendering")]
    rendering_raw: RenderingConfigRaw,
    pub macros: MacrosConfig,
    #[serde(rename = "wiki")]
    wiki_raw: WikiConfigRaw,

    /// Resolved rendering configuration (set after loading).
    #[serde(skip)]
    pub rendering: RenderingConfig,
    /// Resolved wiki configuration (set after loading).
    #[serde(skip)]
    pub wiki: WikiConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// `[rendering]` as written in TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RenderingConfigRaw {
    default_syntax: Option<String>,
    target_syntax: Option<String>,
    max_macro_depth: Option<usize>,
}

/// Resolved rendering configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderingConfig {
    /// Syntax assumed for input without an explicit syntax.
    pub default_syntax: Syntax,
    pub target_syntax: Syntax,
    /// Macro nesting limit; `None` keeps the transformation default.
    pub max_macro_depth: Option<usize>,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            default_syntax: Syntax::XWIKI_2_0,
            target_syntax: Syntax::XHTML_1_0,
            max_macro_depth: None,
        }
    }
}

/// Macro configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MacrosConfig {
    /// Identifiers of built-in macros that are not registered.
    pub disabled: Vec<String>,
    /// Macros defined in wiki markup (`[[macros.wiki]]`).
    pub wiki: Vec<WikiMacroConfig>,
}

impl MacrosConfig {
    /// Whether the macro `id` is disabled (case-insensitive).
    #[must_use]
    pub fn is_disabled(&self, id: &str) -> bool {
        self.disabled.iter().any(|d| d.eq_ignore_ascii_case(id))
    }
}

/// One `[[macros.wiki]]` entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WikiMacroConfig {
    pub id: String,
    pub description: String,
    /// Markup the macro expands to.
    pub body: String,
    /// Syntax of `body`; `rendering.default_syntax` when unset.
    pub syntax: Option<String>,
    /// Reject calls inside a paragraph.
    pub standalone: bool,
    pub parameters: Vec<WikiMacroParameterConfig>,
}

impl WikiMacroConfig {
    /// Syntax of the body, falling back to `default`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if `syntax` is not a valid identifier.
    pub fn body_syntax(&self, default: &Syntax) -> Result<Syntax, ConfigError> {
        parse_syntax(self.syntax.as_deref(), default.clone(), "macros.wiki.syntax")
    }
}

/// Parameter of a wiki macro; every value is a string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WikiMacroParameterConfig {
    pub name: String,
    pub description: String,
    pub mandatory: bool,
    pub default: Option<String>,
}

/// `[wiki]` as written in TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct WikiConfigRaw {
    base_url: Option<String>,
    source_dir: Option<String>,
    interwiki: BTreeMap<String, String>,
}

/// Resolved wiki configuration with absolute paths.
#[derive(Debug, Default)]
pub struct WikiConfig {
    /// Prefix of generated document and attachment URLs.
    pub base_url: String,
    /// Directory other documents are read from.
    pub source_dir: PathBuf,
    /// Interwiki alias to URL prefix.
    pub interwiki: BTreeMap<String, String>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`wiki.base_url`").
        field: String,
        /// Error message (e.g., "${`WIKI_URL`} not set").
        message: String,
    },
}

fn parse_syntax(value: Option<&str>, default: Syntax, field: &str) -> Result<Syntax, ConfigError> {
    match value {
        None => Ok(default),
        Some(id) => id
            .parse()
            .map_err(|err| ConfigError::Validation(format!("{field}: {err}"))),
    }
}

impl Config {
    /// Load configuration with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise searches
    /// for `wr.toml` in the current directory and its parents, falling back to
    /// defaults. CLI settings take precedence over file values.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit `config_path` doesn't exist, or if reading,
    /// parsing, expansion or validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
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

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(syntax) = &settings.default_syntax {
            self.rendering.default_syntax = syntax.clone();
        }
        if let Some(syntax) = &settings.target_syntax {
            self.rendering.target_syntax = syntax.clone();
        }
        if let Some(depth) = settings.max_macro_depth {
            self.rendering.max_macro_depth = Some(depth);
        }
        if let Some(source_dir) = &settings.source_dir {
            self.wiki.source_dir.clone_from(source_dir);
        }
        if let Some(base_url) = &settings.base_url {
            self.wiki.base_url.clone_from(base_url);
        }
    }

    /// Search for the config file in the current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        Self::discover_from(&mut current)
    }

    fn discover_from(current: &mut PathBuf) -> Option<PathBuf> {
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

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Default config with paths relative to `base`.
    fn default_with_base(base: &Path) -> Self {
        Self {
            rendering_raw: RenderingConfigRaw::default(),
            macros: MacrosConfig::default(),
            wiki_raw: WikiConfigRaw::default(),
            rendering: RenderingConfig::default(),
            wiki: WikiConfig {
                base_url: String::new(),
                source_dir: base.to_path_buf(),
                interwiki: BTreeMap::new(),
            },
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any check fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_rendering()?;
        self.validate_macros()?;
        self.validate_wiki()?;
        Ok(())
    }

    fn validate_rendering(&self) -> Result<(), ConfigError> {
        if let Some(depth) = self.rendering.max_macro_depth {
            if depth == 0 {
                return Err(ConfigError::Validation(
                    "rendering.max_macro_depth must be greater than 0".to_owned(),
                ));
            }
            if depth > MAX_MACRO_DEPTH_LIMIT {
                return Err(ConfigError::Validation(format!(
                    "rendering.max_macro_depth cannot exceed {MAX_MACRO_DEPTH_LIMIT}"
                )));
            }
        }
        Ok(())
    }

    fn validate_macros(&self) -> Result<(), ConfigError> {
        if self.macros.disabled.iter().any(|id| id.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "macros.disabled cannot contain empty identifiers".to_owned(),
            ));
        }
        for m in &self.macros.wiki {
            if m.id.trim().is_empty() || m.id.contains(char::is_whitespace) {
                return Err(ConfigError::Validation(format!(
                    "macros.wiki: invalid macro id [{}]",
                    m.id
                )));
            }
            if m.parameters.iter().any(|p| p.name.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "macros.wiki: macro [{}] has a parameter without name",
                    m.id
                )));
            }
            m.body_syntax(&self.rendering.default_syntax)?;
        }
        Ok(())
    }

    fn validate_wiki(&self) -> Result<(), ConfigError> {
        let url = &self.wiki.base_url;
        if !url.is_empty()
            && !url.starts_with('/')
            && !url.starts_with("http://")
            && !url.starts_with("https://")
        {
            return Err(ConfigError::Validation(
                "wiki.base_url must be a path or start with http:// or https://".to_owned(),
            ));
        }
        for (alias, prefix) in &self.wiki.interwiki {
            if alias.trim().is_empty() || prefix.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "wiki.interwiki entries need a non-empty alias and URL prefix".to_owned(),
                ));
            }
        }
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref url) = self.wiki_raw.base_url {
            self.wiki_raw.base_url = Some(expand::expand_env(url, "wiki.base_url")?);
        }
        if let Some(ref dir) = self.wiki_raw.source_dir {
            self.wiki_raw.source_dir = Some(expand::expand_env(dir, "wiki.source_dir")?);
        }
        Ok(())
    }

    /// Parse syntax identifiers and resolve paths against `config_dir`.
    fn resolve(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let defaults = RenderingConfig::default();
        self.rendering = RenderingConfig {
            default_syntax: parse_syntax(
                self.rendering_raw.default_syntax.as_deref(),
                defaults.default_syntax,
                "rendering.default_syntax",
            )?,
            target_syntax: parse_syntax(
                self.rendering_raw.target_syntax.as_deref(),
                defaults.target_syntax,
                "rendering.target_syntax",
            )?,
            max_macro_depth: self.rendering_raw.max_macro_depth,
        };

        self.wiki = WikiConfig {
            base_url: self
                .wiki_raw
                .base_url
                .as_deref()
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_owned(),
            source_dir: config_dir.join(self.wiki_raw.source_dir.as_deref().unwrap_or(".")),
            interwiki: self.wiki_raw.interwiki.clone(),
        };

        Ok(())
    }
}
