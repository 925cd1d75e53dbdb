use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::utils::crypto::decode_secret;
use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_DIRECTORY_MAIL_ATTR, DEFAULT_DIRECTORY_NAME_ATTR,
    DEFAULT_DIRECTORY_PASSWORD_ATTR, DEFAULT_DIRECTORY_PORT, DEFAULT_DIRECTORY_SEARCH_ATTR,
    DEFAULT_DIRECTORY_TIMEOUT_SECS, DEFAULT_DIRECTORY_TLS_PORT, DEFAULT_HOST,
    DEFAULT_PORT, DEFAULT_PROXY_EMAIL_HEADER, DEFAULT_PROXY_FIRST_NAME_HEADER,
    DEFAULT_PROXY_LAST_NAME_HEADER, DEFAULT_PROXY_LOGIN_HEADER, DEFAULT_SESSION_TTL_DAYS,
};

// =============================================================================
// Trust Mode Enum
// =============================================================================

/// The single authentication strategy active for the process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustMode {
    /// No authenticator; only previously issued sessions are honored
    Disabled,
    /// Identity asserted by a pre-authenticating reverse proxy
    Proxy,
    /// Credentials verified against a directory service
    Directory,
    /// Credentials verified against locally stored password hashes
    #[default]
    Local,
}

impl TrustMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustMode::Disabled => "disabled",
            TrustMode::Proxy => "proxy",
            TrustMode::Directory => "directory",
            TrustMode::Local => "local",
        }
    }
}

impl fmt::Display for TrustMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Directory Authentication Sub-mode
// =============================================================================

/// How the directory verifies the end-user's password once the entry is found
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryAuthMode {
    /// Re-bind as the found entry with the submitted password
    #[default]
    Bind,
    /// Compare the submitted password with the entry's password attribute
    Local,
}

impl fmt::Display for DirectoryAuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryAuthMode::Bind => write!(f, "bind"),
            DirectoryAuthMode::Local => write!(f, "local"),
        }
    }
}

// =============================================================================
// File Config Structs (all fields optional for partial configs)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Proxy header names (nested under auth)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProxyFileConfig {
    pub login_header: Option<String>,
    pub email_header: Option<String>,
    pub first_name_header: Option<String>,
    pub last_name_header: Option<String>,
}

/// Directory service parameters (nested under auth)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DirectoryFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<bool>,
    pub search_base: Option<String>,
    pub search_user: Option<String>,
    pub search_auth: Option<String>,
    pub search_attr: Option<String>,
    pub mail_attr: Option<String>,
    pub name_attr: Option<String>,
    pub first_name_attr: Option<String>,
    pub last_name_attr: Option<String>,
    pub authenticate: Option<DirectoryAuthMode>,
    pub password_attr: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Authentication configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AuthFileConfig {
    pub trust_mode: Option<TrustMode>,
    pub session_ttl_days: Option<u32>,
    pub session_secret: Option<String>,
    pub create_home_project: Option<bool>,
    pub proxy: Option<ProxyFileConfig>,
    pub directory: Option<DirectoryFileConfig>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub auth: Option<AuthFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

/// Overwrite `$target` with `$source` when the latter is set
macro_rules! merge_field {
    ($target:expr, $source:expr, $name:literal) => {
        if $source.is_some() {
            tracing::trace!(value = ?$source, concat!("Merging ", $name));
            $target = $source;
        }
    };
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            merge_field!(current.host, server.host, "server.host");
            merge_field!(current.port, server.port, "server.port");
        }

        let Some(auth) = other.auth else {
            return;
        };
        let current = self.auth.get_or_insert_with(AuthFileConfig::default);
        merge_field!(current.trust_mode, auth.trust_mode, "auth.trust_mode");
        merge_field!(
            current.session_ttl_days,
            auth.session_ttl_days,
            "auth.session_ttl_days"
        );
        if auth.session_secret.is_some() {
            tracing::trace!("Merging auth.session_secret");
            current.session_secret = auth.session_secret;
        }
        merge_field!(
            current.create_home_project,
            auth.create_home_project,
            "auth.create_home_project"
        );

        if let Some(proxy) = auth.proxy {
            let cur = current.proxy.get_or_insert_with(ProxyFileConfig::default);
            merge_field!(cur.login_header, proxy.login_header, "auth.proxy.login_header");
            merge_field!(cur.email_header, proxy.email_header, "auth.proxy.email_header");
            merge_field!(
                cur.first_name_header,
                proxy.first_name_header,
                "auth.proxy.first_name_header"
            );
            merge_field!(
                cur.last_name_header,
                proxy.last_name_header,
                "auth.proxy.last_name_header"
            );
        }

        if let Some(dir) = auth.directory {
            let cur = current
                .directory
                .get_or_insert_with(DirectoryFileConfig::default);
            merge_field!(cur.host, dir.host, "auth.directory.host");
            merge_field!(cur.port, dir.port, "auth.directory.port");
            merge_field!(cur.tls, dir.tls, "auth.directory.tls");
            merge_field!(cur.search_base, dir.search_base, "auth.directory.search_base");
            merge_field!(cur.search_user, dir.search_user, "auth.directory.search_user");
            if dir.search_auth.is_some() {
                tracing::trace!("Merging auth.directory.search_auth");
                cur.search_auth = dir.search_auth;
            }
            merge_field!(cur.search_attr, dir.search_attr, "auth.directory.search_attr");
            merge_field!(cur.mail_attr, dir.mail_attr, "auth.directory.mail_attr");
            merge_field!(cur.name_attr, dir.name_attr, "auth.directory.name_attr");
            merge_field!(
                cur.first_name_attr,
                dir.first_name_attr,
                "auth.directory.first_name_attr"
            );
            merge_field!(
                cur.last_name_attr,
                dir.last_name_attr,
                "auth.directory.last_name_attr"
            );
            merge_field!(cur.authenticate, dir.authenticate, "auth.directory.authenticate");
            merge_field!(cur.password_attr, dir.password_attr, "auth.directory.password_attr");
            merge_field!(cur.timeout_secs, dir.timeout_secs, "auth.directory.timeout_secs");
        }
    }
}

// =============================================================================
// Runtime Config Structs (final merged configuration)
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Names of the headers a trusted reverse proxy injects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub login_header: String,
    pub email_header: String,
    pub first_name_header: String,
    pub last_name_header: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            login_header: DEFAULT_PROXY_LOGIN_HEADER.to_string(),
            email_header: DEFAULT_PROXY_EMAIL_HEADER.to_string(),
            first_name_header: DEFAULT_PROXY_FIRST_NAME_HEADER.to_string(),
            last_name_header: DEFAULT_PROXY_LAST_NAME_HEADER.to_string(),
        }
    }
}

/// Directory service parameters
#[derive(Clone)]
pub struct DirectoryConfig {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub search_base: String,
    /// Distinguished name of the service account used for searching
    pub search_user: String,
    pub search_auth: String,
    pub search_attr: String,
    pub mail_attr: String,
    pub name_attr: String,
    pub first_name_attr: Option<String>,
    pub last_name_attr: Option<String>,
    pub authenticate: DirectoryAuthMode,
    pub password_attr: String,
    pub timeout: Duration,
}

impl DirectoryConfig {
    /// Attributes requested from the directory on every search
    pub fn requested_attributes(&self) -> Vec<String> {
        let mut attrs = vec![self.mail_attr.clone(), self.name_attr.clone()];
        attrs.extend(self.first_name_attr.iter().cloned());
        attrs.extend(self.last_name_attr.iter().cloned());
        if self.authenticate == DirectoryAuthMode::Local {
            attrs.push(self.password_attr.clone());
        }
        attrs
    }
}

impl fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("search_base", &self.search_base)
            .field("search_user", &self.search_user)
            .field("search_auth", &"<redacted>")
            .field("search_attr", &self.search_attr)
            .field("mail_attr", &self.mail_attr)
            .field("name_attr", &self.name_attr)
            .field("first_name_attr", &self.first_name_attr)
            .field("last_name_attr", &self.last_name_attr)
            .field("authenticate", &self.authenticate)
            .field("password_attr", &self.password_attr)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Authentication configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub trust_mode: TrustMode,
    pub session_ttl_days: u32,
    /// Hex-encoded signing secret; a random one is generated when absent
    pub session_secret: Option<String>,
    pub create_home_project: bool,
    pub proxy: ProxyConfig,
    pub directory: Option<DirectoryConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            trust_mode: TrustMode::default(),
            session_ttl_days: DEFAULT_SESSION_TTL_DAYS,
            session_secret: None,
            create_home_project: true,
            proxy: ProxyConfig::default(),
            directory: None,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("trust_mode", &self.trust_mode)
            .field("session_ttl_days", &self.session_ttl_days)
            .field(
                "session_secret",
                &self.session_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("create_home_project", &self.create_home_project)
            .field("proxy", &self.proxy)
            .field("directory", &self.directory)
            .finish()
    }
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.gatehouse/gatehouse.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let config = Self::from_sources(file_config, cli);
        config.validate()?;

        tracing::debug!(config = ?config, "Configuration loaded");
        Ok(config)
    }

    /// Layer defaults, file config and CLI/env overrides
    fn from_sources(file_config: FileConfig, cli: &CliConfig) -> Self {
        let file_server = file_config.server.unwrap_or_default();
        let file_auth = file_config.auth.unwrap_or_default();
        let file_proxy = file_auth.proxy.unwrap_or_default();

        let server = ServerConfig {
            host: cli
                .host
                .clone()
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT),
        };

        let defaults = ProxyConfig::default();
        let proxy = ProxyConfig {
            login_header: file_proxy.login_header.unwrap_or(defaults.login_header),
            email_header: file_proxy.email_header.unwrap_or(defaults.email_header),
            first_name_header: file_proxy
                .first_name_header
                .unwrap_or(defaults.first_name_header),
            last_name_header: file_proxy
                .last_name_header
                .unwrap_or(defaults.last_name_header),
        };

        // The search credential may come from env so it stays out of config files
        let directory = file_auth.directory.map(|dir| {
            let tls = dir.tls.unwrap_or(false);
            let default_port = if tls {
                DEFAULT_DIRECTORY_TLS_PORT
            } else {
                DEFAULT_DIRECTORY_PORT
            };
            DirectoryConfig {
                host: dir.host.unwrap_or_default(),
                port: dir.port.unwrap_or(default_port),
                tls,
                search_base: dir.search_base.unwrap_or_default(),
                search_user: dir.search_user.unwrap_or_default(),
                search_auth: cli
                    .directory_search_auth
                    .clone()
                    .or(dir.search_auth)
                    .unwrap_or_default(),
                search_attr: dir
                    .search_attr
                    .unwrap_or_else(|| DEFAULT_DIRECTORY_SEARCH_ATTR.to_string()),
                mail_attr: dir
                    .mail_attr
                    .unwrap_or_else(|| DEFAULT_DIRECTORY_MAIL_ATTR.to_string()),
                name_attr: dir
                    .name_attr
                    .unwrap_or_else(|| DEFAULT_DIRECTORY_NAME_ATTR.to_string()),
                first_name_attr: dir.first_name_attr,
                last_name_attr: dir.last_name_attr,
                authenticate: dir.authenticate.unwrap_or_default(),
                password_attr: dir
                    .password_attr
                    .unwrap_or_else(|| DEFAULT_DIRECTORY_PASSWORD_ATTR.to_string()),
                timeout: Duration::from_secs(
                    dir.timeout_secs.unwrap_or(DEFAULT_DIRECTORY_TIMEOUT_SECS),
                ),
            }
        });

        let auth = AuthConfig {
            trust_mode: cli
                .trust_mode
                .or(file_auth.trust_mode)
                .unwrap_or_default(),
            session_ttl_days: cli
                .session_ttl_days
                .or(file_auth.session_ttl_days)
                .unwrap_or(DEFAULT_SESSION_TTL_DAYS),
            session_secret: cli.session_secret.clone().or(file_auth.session_secret),
            create_home_project: file_auth.create_home_project.unwrap_or(true),
            proxy,
            directory,
        };

        Self { server, auth }
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }

        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }

        if self.auth.session_ttl_days == 0 {
            anyhow::bail!("Configuration error: auth.session_ttl_days must be greater than 0");
        }

        if let Some(ref secret) = self.auth.session_secret {
            let bytes = decode_secret(secret).map_err(|_| {
                anyhow::anyhow!("Configuration error: auth.session_secret must be hex encoded")
            })?;
            if bytes.len() < 32 {
                anyhow::bail!(
                    "Configuration error: auth.session_secret must be at least 32 bytes (64 hex chars)"
                );
            }
        }

        let proxy = &self.auth.proxy;
        for (name, value) in [
            ("login_header", &proxy.login_header),
            ("email_header", &proxy.email_header),
            ("first_name_header", &proxy.first_name_header),
            ("last_name_header", &proxy.last_name_header),
        ] {
            if axum::http::HeaderName::from_bytes(value.as_bytes()).is_err() {
                anyhow::bail!(
                    "Configuration error: auth.proxy.{} is not a valid header name: '{}'",
                    name,
                    value
                );
            }
        }

        if self.auth.trust_mode == TrustMode::Directory {
            let Some(ref dir) = self.auth.directory else {
                anyhow::bail!(
                    "Configuration error: auth.directory is required when trust_mode is directory"
                );
            };
            if dir.host.is_empty() {
                anyhow::bail!("Configuration error: auth.directory.host must not be empty");
            }
            if dir.search_user.is_empty() || dir.search_auth.is_empty() {
                anyhow::bail!(
                    "Configuration error: auth.directory.search_user and search_auth are required"
                );
            }
            if dir.search_attr.is_empty() {
                anyhow::bail!("Configuration error: auth.directory.search_attr must not be empty");
            }
            if dir.timeout.is_zero() {
                anyhow::bail!(
                    "Configuration error: auth.directory.timeout_secs must be greater than 0"
                );
            }
            if !dir.tls {
                tracing::warn!(
                    host = %dir.host,
                    "Directory connection is not encrypted; passwords travel in clear text"
                );
            }
        }

        Ok(())
    }
}

/// Get the profile config path (~/.gatehouse/gatehouse.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}
