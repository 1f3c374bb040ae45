use crate::error::ConfigError;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static ENV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$ENV\{([^}]+)\}").expect("env placeholder regex"));
static FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$FILE\{([^}]+)\}").expect("file placeholder regex"));

fn default_db_path() -> String {
    "sqlite://blog.sqlite".into()
}

fn default_site_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".into())
}

fn default_per_page() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".into()
}

fn replace_all<F>(re: &Regex, text: &str, mut lookup: F) -> Result<String, ConfigError>
where
    F: FnMut(&str) -> Result<String, ConfigError>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        out.push_str(&lookup(name.as_str())?);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Expand `$ENV{NAME}` and `$FILE{path}` placeholders. Environment
/// placeholders are expanded first, so a file path may come from the
/// environment.
fn expand_placeholders(text: &str) -> Result<String, ConfigError> {
    let text = replace_all(&ENV_RE, text, |var| {
        std::env::var(var)
            .map_err(|_| ConfigError::Invalid(format!("environment variable {var} is not set")))
    })?;
    replace_all(&FILE_RE, &text, |path| {
        std::fs::read_to_string(path)
            .map(|s| s.trim_end_matches(['\r', '\n']).to_string())
            .map_err(|_| ConfigError::FileNotFound(path.to_string()))
    })
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_site_name")]
    pub site_name: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a placeholder cannot be
    /// expanded, the TOML is malformed, or validation fails.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.to_string()))?;
        Self::from_toml(&text)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let text = expand_placeholders(text)?;
        let cfg: Config = toml::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret_key.trim().is_empty() {
            return Err(ConfigError::MissingField("secret_key"));
        }
        if self.per_page == 0 {
            return Err(ConfigError::Invalid("per_page must be at least 1".into()));
        }
        if !(self.db_path.starts_with("sqlite:") || self.db_path.starts_with("memory:")) {
            return Err(ConfigError::Invalid(format!(
                "unsupported db_path '{}', expected sqlite: or memory:",
                self.db_path
            )));
        }
        Ok(())
    }
}
