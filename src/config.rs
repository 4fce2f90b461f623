//! Configuration management
//!
//! Configuration is loaded once at process start (YAML file plus
//! `SESSION_GATEWAY_`-prefixed environment variables) into an explicit
//! [`Config`] struct and injected into every component. Business logic
//! never re-reads ambient environment state.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Deployment mode, resolved once at startup.
///
/// Every dev/prod branch in the flow controllers goes through this enum;
/// nothing derives the mode from URLs or hostnames at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Local development: client-credentials login, non-Secure cookies
    #[default]
    Development,
    /// Production: SSO assertion flow only, Secure cookies
    Production,
}

impl DeploymentMode {
    /// True in development mode
    #[must_use]
    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    /// True in production mode
    #[must_use]
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before processing config.
    /// Loaded in order; variables land in the process environment.
    pub env_files: Vec<String>,
    /// Deployment mode (`development` or `production`)
    pub mode: DeploymentMode,
    /// Server configuration
    pub server: ServerConfig,
    /// Authorization server configuration
    pub auth_server: AuthServerConfig,
    /// Session cookie / signing configuration
    pub session: SessionConfig,
    /// SSO configuration (production)
    pub sso: SsoConfig,
    /// Backend API configuration
    pub backend: BackendConfig,
    /// Page routing configuration (edge redirects)
    pub pages: PagesConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Authorization server (token endpoint) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthServerConfig {
    /// Base URL of the authorization server (token endpoint is
    /// `{base_url}/oauth2/rest/token`)
    pub base_url: String,
    /// Identity domain sent in the `X-OAUTH-IDENTITY-DOMAIN-NAME` header
    pub identity_domain: String,
    /// Scope requested on both grant flows
    pub scope: String,
    /// Client ID for the client-credentials flow (development only)
    pub client_id: Option<String>,
    /// Client secret for the client-credentials flow (development only)
    pub client_secret: Option<String>,
    /// Optional PEM bundle with extra root certificates (self-signed /
    /// internal CAs) for the outbound HTTPS client
    pub ca_bundle: Option<PathBuf>,
    /// Outbound request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for AuthServerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            identity_domain: String::new(),
            scope: String::new(),
            client_id: None,
            client_secret: None,
            ca_bundle: None,
            timeout_secs: 30,
        }
    }
}

/// Session cookie and signing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Symmetric signing secret. Rotating it invalidates every
    /// outstanding session (documented operational behavior).
    pub secret: String,
    /// Name of the session cookie
    pub cookie_name: String,
    /// Session lifetime in seconds (cookie Max-Age and codec expiry)
    pub max_age_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            cookie_name: "app_session".to_string(),
            max_age_secs: 3600,
        }
    }
}

/// SSO configuration (production mode)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SsoConfig {
    /// Name of the externally set SSO assertion cookie
    pub cookie_name: String,
    /// External SSO login URL to redirect to when no assertion is present
    pub login_url: String,
    /// External SSO logout URL returned on logout
    pub logout_url: String,
}

impl Default for SsoConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sso_session".to_string(),
            login_url: String::new(),
            logout_url: String::new(),
        }
    }
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend API
    pub base_url: String,
    /// Value of the `X-Origin-Service` header on proxied calls
    pub origin_service: String,
    /// Value of the `X-Origin-Application` header on proxied calls
    pub origin_application: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            origin_service: "session-gateway".to_string(),
            origin_application: "session-gateway".to_string(),
        }
    }
}

/// Page routing configuration for the edge redirect middleware
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PagesConfig {
    /// Path of the login page
    pub login_path: String,
    /// Path of the authenticated landing page
    pub home_path: String,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            home_path: "/".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from an optional YAML file plus environment
    /// variables (`SESSION_GATEWAY_` prefix, `__` for nesting).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
        }

        let figment = |path: Option<&Path>| {
            let mut figment = Figment::new();
            if let Some(p) = path {
                figment = figment.merge(Yaml::file(p));
            }
            figment.merge(Env::prefixed("SESSION_GATEWAY_").split("__"))
        };

        let config: Self = figment(path)
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        if config.env_files.is_empty() {
            return Ok(config);
        }

        // Env files may carry SESSION_GATEWAY_ variables of their own;
        // rebuild the figment after loading them so those overrides land
        // in the final config (a merged `Figment` caches provider data,
        // so re-extracting the old one would miss the new variables).
        config.load_env_files();
        figment(path)
            .extract()
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Load configured env files into the process environment
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let path = Path::new(path_str);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => tracing::info!("Loaded env file: {path_str}"),
                    Err(e) => tracing::warn!("Failed to load env file {path_str}: {e}"),
                }
            } else {
                tracing::debug!("Env file not found (skipped): {path_str}");
            }
        }
    }

    /// Validate that the configuration is complete for the selected mode.
    ///
    /// Missing values here are *configuration* errors, distinct from any
    /// remote failure, and fatal at startup.
    pub fn validate(&self) -> Result<()> {
        if self.auth_server.base_url.trim().is_empty() {
            return Err(Error::Config(
                "auth_server.base_url is required".to_string(),
            ));
        }
        if url::Url::parse(&self.auth_server.base_url).is_err() {
            return Err(Error::Config(format!(
                "auth_server.base_url is not a valid URL: {}",
                self.auth_server.base_url
            )));
        }
        if self.session.secret.trim().is_empty() {
            return Err(Error::Config("session.secret is required".to_string()));
        }
        if self.session.secret.len() < 32 {
            tracing::warn!(
                "session.secret is shorter than 32 bytes; use a longer random secret"
            );
        }
        if self.backend.base_url.trim().is_empty() {
            return Err(Error::Config("backend.base_url is required".to_string()));
        }
        if url::Url::parse(&self.backend.base_url).is_err() {
            return Err(Error::Config(format!(
                "backend.base_url is not a valid URL: {}",
                self.backend.base_url
            )));
        }

        match self.mode {
            DeploymentMode::Development => {
                if self.auth_server.client_id.is_none()
                    || self.auth_server.client_secret.is_none()
                {
                    return Err(Error::Config(
                        "auth_server.client_id and auth_server.client_secret are required in development mode"
                            .to_string(),
                    ));
                }
            }
            DeploymentMode::Production => {
                if self.sso.login_url.trim().is_empty() || self.sso.logout_url.trim().is_empty() {
                    return Err(Error::Config(
                        "sso.login_url and sso.logout_url are required in production mode"
                            .to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_dev_config() -> Config {
        Config {
            mode: DeploymentMode::Development,
            auth_server: AuthServerConfig {
                base_url: "https://auth.example.com".to_string(),
                identity_domain: "ExampleDomain".to_string(),
                scope: "api.read".to_string(),
                client_id: Some("client".to_string()),
                client_secret: Some("secret".to_string()),
                ..AuthServerConfig::default()
            },
            session: SessionConfig {
                secret: "0123456789abcdef0123456789abcdef".to_string(),
                ..SessionConfig::default()
            },
            backend: BackendConfig {
                base_url: "https://api.example.com".to_string(),
                ..BackendConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn valid_development_config_passes() {
        assert!(valid_dev_config().validate().is_ok());
    }

    #[test]
    fn missing_base_url_is_config_error() {
        let mut config = valid_dev_config();
        config.auth_server.base_url = String::new();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn malformed_base_url_is_config_error() {
        let mut config = valid_dev_config();
        config.auth_server.base_url = "not a url".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("not a valid URL"));
    }

    #[test]
    fn missing_secret_is_config_error() {
        let mut config = valid_dev_config();
        config.session.secret = String::new();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn development_requires_client_credentials() {
        let mut config = valid_dev_config();
        config.auth_server.client_secret = None;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("client_secret"));
    }

    #[test]
    fn production_requires_sso_urls() {
        let mut config = valid_dev_config();
        config.mode = DeploymentMode::Production;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.sso.login_url = "https://sso.example.com/login".to_string();
        config.sso.logout_url = "https://sso.example.com/logout".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn mode_deserializes_from_lowercase() {
        let mode: DeploymentMode = serde_json::from_str("\"production\"").unwrap();
        assert!(mode.is_production());
        let mode: DeploymentMode = serde_json::from_str("\"development\"").unwrap();
        assert!(mode.is_development());
    }

    #[test]
    fn default_mode_is_development() {
        assert!(DeploymentMode::default().is_development());
    }

    #[test]
    fn env_file_variables_override_config_values() {
        let dir = tempfile::tempdir().unwrap();

        let env_path = dir.path().join("gateway.env");
        std::fs::write(&env_path, "SESSION_GATEWAY_SERVER__PORT=9999\n").unwrap();

        let yaml_path = dir.path().join("config.yaml");
        std::fs::write(
            &yaml_path,
            format!(
                "server:\n  port: 8080\nenv_files:\n  - {}\n",
                env_path.display()
            ),
        )
        .unwrap();

        let config = Config::load(Some(&yaml_path)).unwrap();
        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn missing_env_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let yaml_path = dir.path().join("config.yaml");
        std::fs::write(
            &yaml_path,
            "env_files:\n  - /nonexistent/path/gateway.env\n",
        )
        .unwrap();

        // Missing files are skipped, not fatal
        let config = Config::load(Some(&yaml_path)).unwrap();
        assert_eq!(config.session.cookie_name, "app_session");
    }
}
