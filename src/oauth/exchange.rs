//! Token exchange client
//!
//! Performs the two OAuth2 grant exchanges against the authorization
//! server's token endpoint. Both flows share one outbound HTTPS client
//! with a bounded timeout and optional extra root certificates.
//!
//! Failure semantics matter here: a missing base URL or client credential
//! is a *configuration* error ([`crate::Error::Config`]); a rejection from
//! the authorization server is a *remote* error carrying the upstream
//! status and body ([`crate::Error::Exchange`]). Callers pick the HTTP
//! status from the variant.

use std::fs;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::AuthServerConfig;
use crate::{Error, Result};

/// Grant type for the client-credentials flow
pub const GRANT_CLIENT_CREDENTIALS: &str = "CLIENT_CREDENTIALS";
/// Grant type for the JWT-bearer assertion flow
pub const GRANT_JWT_BEARER: &str = "JWT_BEARER";
/// Identity domain header sent on every exchange
pub const IDENTITY_DOMAIN_HEADER: &str = "X-OAUTH-IDENTITY-DOMAIN-NAME";

const TOKEN_PATH: &str = "/oauth2/rest/token";

/// Token endpoint response. Transient: consumed immediately to build or
/// update a session, never persisted verbatim.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Access token for backend API calls
    pub access_token: String,
    /// Lifetime in seconds
    pub expires_in: u64,
    /// Token type (usually "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Build the shared outbound HTTPS client: rustls, bounded timeout,
/// optional extra root certificates from a PEM bundle.
pub fn build_http_client(config: &AuthServerConfig) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .use_rustls_tls();

    if let Some(ref path) = config.ca_bundle {
        let pem = fs::read(path).map_err(|e| {
            Error::Config(format!("Cannot read CA bundle {}: {e}", path.display()))
        })?;
        let certs = reqwest::Certificate::from_pem_bundle(&pem)
            .map_err(|e| Error::Config(format!("Invalid CA bundle {}: {e}", path.display())))?;
        for cert in certs {
            builder = builder.add_root_certificate(cert);
        }
        debug!(path = %path.display(), "Added custom root certificates");
    }

    Ok(builder.build()?)
}

/// Client for the authorization server's token endpoint
pub struct TokenExchanger {
    http: Client,
    base_url: String,
    identity_domain: String,
    scope: String,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl TokenExchanger {
    /// Create an exchanger over a shared HTTP client.
    ///
    /// Fails with a configuration error if the base URL is missing.
    pub fn new(http: Client, config: &AuthServerConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(Error::Config(
                "auth_server.base_url is not configured".to_string(),
            ));
        }

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            identity_domain: config.identity_domain.clone(),
            scope: config.scope.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }

    /// Exchange the configured client id/secret for an access token
    /// (`grant_type=CLIENT_CREDENTIALS`, HTTP Basic auth).
    ///
    /// Development mode only; missing credentials are a configuration
    /// error, not a remote failure.
    pub async fn exchange_client_credentials(&self) -> Result<TokenResponse> {
        let (Some(client_id), Some(client_secret)) = (&self.client_id, &self.client_secret) else {
            return Err(Error::Config(
                "auth_server.client_id and auth_server.client_secret are not configured"
                    .to_string(),
            ));
        };

        debug!("Requesting token via client-credentials grant");
        self.post_token(
            &[
                ("grant_type", GRANT_CLIENT_CREDENTIALS),
                ("scope", &self.scope),
            ],
            Some((client_id, client_secret)),
        )
        .await
    }

    /// Exchange an externally issued SSO assertion for an access token
    /// (`grant_type=JWT_BEARER`, no Basic auth).
    pub async fn exchange_jwt_bearer(&self, assertion: &str) -> Result<TokenResponse> {
        debug!("Requesting token via JWT-bearer grant");
        self.post_token(
            &[
                ("grant_type", GRANT_JWT_BEARER),
                ("scope", &self.scope),
                ("assertion", assertion),
            ],
            None,
        )
        .await
    }

    async fn post_token(
        &self,
        params: &[(&str, &str)],
        basic_auth: Option<(&str, &str)>,
    ) -> Result<TokenResponse> {
        let url = format!("{}{TOKEN_PATH}", self.base_url);

        let mut request = self
            .http
            .post(&url)
            .header(IDENTITY_DOMAIN_HEADER, &self.identity_domain)
            .form(params);

        if let Some((id, secret)) = basic_auth {
            request = request.basic_auth(id, Some(secret));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(status, "Authorization server rejected token exchange");
            return Err(Error::Exchange { status, body });
        }

        Ok(response.json().await?)
    }
}
