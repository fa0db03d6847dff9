//! Configuration loading and gateway URL resolution
//!
//! The gateway base URL is resolved once at startup. A persisted override
//! only takes effect on the next run: an active session never re-points
//! in-flight polling at a different gateway.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Compiled-in gateway base URL
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8000";

/// Environment variable providing the deployment default gateway URL
pub const GATEWAY_URL_ENV: &str = "UAMP_GATEWAY_URL";

/// Application directory name under the platform config directory
const APP_DIR: &str = "uamp";

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Persisted user configuration (`~/.config/uamp/config.toml`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// User override of the gateway base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_url: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR).join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Load the TOML config, falling back to defaults when missing or invalid
///
/// A broken config file must never prevent startup; problems are logged.
pub fn load_toml_config(path: &Path) -> TomlConfig {
    if !path.exists() {
        debug!(path = %path.display(), "No config file, using defaults");
        return TomlConfig::default();
    }

    match read_toml_config(path) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
            TomlConfig::default()
        }
    }
}

/// Read and parse the TOML config, reporting errors
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Write the TOML config atomically (temp file + rename)
///
/// On unix the file is restricted to the owner (0600).
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    std::fs::write(&tmp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}

/// Normalize and validate a gateway base URL
///
/// Accepts `http://` and `https://` URLs; strips surrounding whitespace and
/// trailing slashes.
pub fn normalize_gateway_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("gateway URL must not be empty".to_string()));
    }

    let rest = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .ok_or_else(|| {
            Error::InvalidInput(format!(
                "gateway URL must start with http:// or https:// (got '{}')",
                trimmed
            ))
        })?;

    if rest.is_empty() || rest.starts_with('/') {
        return Err(Error::InvalidInput(format!("gateway URL has no host: '{}'", trimmed)));
    }

    Ok(trimmed.to_string())
}

/// Where the resolved gateway URL came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlSource {
    /// Command-line flag, this session only
    CommandLine,
    /// Persisted override in the config file
    Override,
    /// `UAMP_GATEWAY_URL` environment default
    Environment,
    /// Compiled-in default
    CompiledDefault,
}

impl fmt::Display for UrlSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UrlSource::CommandLine => "command line",
            UrlSource::Override => "saved override",
            UrlSource::Environment => "environment",
            UrlSource::CompiledDefault => "default",
        };
        f.write_str(label)
    }
}

/// Gateway base URL as fixed for the lifetime of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGatewayUrl {
    pub url: String,
    pub source: UrlSource,
}

/// Resolves and persists the gateway base URL
///
/// Priority order:
/// 1. Command-line argument (highest priority)
/// 2. Persisted override in the TOML config file
/// 3. Environment variable default
/// 4. Compiled default (fallback)
#[derive(Debug, Clone)]
pub struct GatewayUrlResolver {
    config_path: PathBuf,
}

impl GatewayUrlResolver {
    /// Resolver using the platform config file location
    pub fn new() -> Result<Self> {
        Ok(Self::with_config_path(default_config_path()?))
    }

    /// Resolver bound to an explicit config file
    pub fn with_config_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Default URL when no override is stored (environment, then compiled)
    pub fn default_url(&self) -> ResolvedGatewayUrl {
        if let Ok(url) = std::env::var(GATEWAY_URL_ENV) {
            match normalize_gateway_url(&url) {
                Ok(url) => {
                    return ResolvedGatewayUrl {
                        url,
                        source: UrlSource::Environment,
                    }
                }
                Err(e) => warn!(error = %e, "Ignoring invalid {}", GATEWAY_URL_ENV),
            }
        }

        ResolvedGatewayUrl {
            url: DEFAULT_GATEWAY_URL.to_string(),
            source: UrlSource::CompiledDefault,
        }
    }

    /// Resolve the base URL for this session
    pub fn resolve(&self, cli_arg: Option<&str>) -> Result<ResolvedGatewayUrl> {
        // Priority 1: Command-line argument
        if let Some(url) = cli_arg {
            return Ok(ResolvedGatewayUrl {
                url: normalize_gateway_url(url)?,
                source: UrlSource::CommandLine,
            });
        }

        // Priority 2: Persisted override
        let config = load_toml_config(&self.config_path);
        if let Some(url) = config.gateway_url.as_deref() {
            match normalize_gateway_url(url) {
                Ok(url) => {
                    return Ok(ResolvedGatewayUrl {
                        url,
                        source: UrlSource::Override,
                    })
                }
                Err(e) => warn!(error = %e, "Ignoring invalid saved gateway URL"),
            }
        }

        // Priority 3 and 4: Environment default, then compiled default
        Ok(self.default_url())
    }

    /// Store a gateway URL override; applies from the next run
    pub fn persist_override(&self, url: &str) -> Result<String> {
        let url = normalize_gateway_url(url)?;
        let mut config = self.load_for_update()?;
        config.gateway_url = Some(url.clone());
        write_toml_config(&config, &self.config_path)?;

        info!(url = %url, path = %self.config_path.display(),
            "Saved gateway URL override (takes effect on next run)");
        Ok(url)
    }

    /// Remove any stored override; returns whether one existed
    pub fn clear_override(&self) -> Result<bool> {
        if !self.config_path.exists() {
            return Ok(false);
        }

        let mut config = self.load_for_update()?;
        let existed = config.gateway_url.take().is_some();
        if existed {
            write_toml_config(&config, &self.config_path)?;
            info!(path = %self.config_path.display(),
                "Cleared gateway URL override (takes effect on next run)");
        }
        Ok(existed)
    }

    /// Existing config must parse before it is rewritten, so that unrelated
    /// fields are preserved rather than silently replaced with defaults.
    fn load_for_update(&self) -> Result<TomlConfig> {
        if self.config_path.exists() {
            read_toml_config(&self.config_path).map_err(|e| {
                Error::Config(format!(
                    "cannot update {}: {}",
                    self.config_path.display(),
                    e
                ))
            })
        } else {
            Ok(TomlConfig::default())
        }
    }
}
