//! Login with Amazon token exchange.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::debug;

use super::credential::{AccessToken, Credential};
use super::provider::CredentialSource;
use crate::client::LwaConfig;
use crate::clock::{Clock, SystemClock};
use crate::{Error, Result};

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// The OAuth grant used for the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LwaGrant {
    /// Seller-authorized calls, using the configured refresh token.
    RefreshToken,
    /// Grantless calls limited to one scope,
    /// e.g. `sellingpartnerapi::notifications`.
    ClientCredentials {
        /// The requested scope
        scope: String,
    },
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

/// Exchanges LWA app credentials for a bearer access token.
#[derive(Clone)]
pub struct LwaTokenSource {
    http: reqwest::Client,
    config: LwaConfig,
    grant: LwaGrant,
    clock: Arc<dyn Clock>,
}

impl LwaTokenSource {
    /// Create a refresh-token source.
    pub fn new(http: reqwest::Client, config: LwaConfig) -> Self {
        Self {
            http,
            config,
            grant: LwaGrant::RefreshToken,
            clock: Arc::new(SystemClock),
        }
    }

    /// Create a grantless source for `scope`.
    pub fn grantless(http: reqwest::Client, config: LwaConfig, scope: impl Into<String>) -> Self {
        Self {
            grant: LwaGrant::ClientCredentials {
                scope: scope.into(),
            },
            ..Self::new(http, config)
        }
    }

    /// Use `clock` to stamp token expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The grant this source requests.
    pub fn grant(&self) -> &LwaGrant {
        &self.grant
    }

    fn form(&self) -> Vec<(&'static str, &str)> {
        let mut form = vec![
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
        ];
        match &self.grant {
            LwaGrant::RefreshToken => {
                form.push(("grant_type", "refresh_token"));
                form.push(("refresh_token", self.config.refresh_token.expose_secret()));
            }
            LwaGrant::ClientCredentials { scope } => {
                form.push(("grant_type", "client_credentials"));
                form.push(("scope", scope.as_str()));
            }
        }
        form
    }
}

#[async_trait]
impl CredentialSource for LwaTokenSource {
    type Secret = AccessToken;

    fn name(&self) -> &'static str {
        match self.grant {
            LwaGrant::RefreshToken => "lwa",
            LwaGrant::ClientCredentials { .. } => "lwa-grantless",
        }
    }

    async fn fetch(&self) -> Result<Credential<AccessToken>> {
        debug!(url = %self.config.token_url, grant = ?self.grant, "Requesting LWA access token");

        let response = self
            .http
            .post(self.config.token_url.clone())
            .form(&self.form())
            .send()
            .await
            .map_err(|e| Error::Auth(format!("LWA token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Auth(format!("LWA token response unreadable: {}", e)))?;

        if !status.is_success() {
            return Err(Error::Auth(format!(
                "LWA token exchange failed ({}): {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Auth(format!("Malformed LWA token response: {}", e)))?;

        let access_token = token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Auth("LWA token response has no access_token".to_string()))?;

        let lifetime = token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        if lifetime <= 0 {
            return Err(Error::Auth(format!(
                "LWA token response has non-positive expires_in: {}",
                lifetime
            )));
        }

        let expires_at = Duration::try_seconds(lifetime)
            .and_then(|ttl| self.clock.now().checked_add_signed(ttl))
            .ok_or_else(|| {
                Error::Auth(format!("LWA token response has out-of-range expires_in: {}", lifetime))
            })?;

        Ok(Credential::new(AccessToken::new(access_token), expires_at))
    }
}

impl std::fmt::Debug for LwaTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LwaTokenSource")
            .field("token_url", &self.config.token_url.as_str())
            .field("client_id", &self.config.client_id)
            .field("grant", &self.grant)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use secrecy::SecretString;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> LwaConfig {
        LwaConfig {
            token_url: format!("{}/auth/o2/token", server.uri()).parse().unwrap(),
            client_id: "amzn1.application-oa2-client.test".to_string(),
            client_secret: SecretString::from("client-secret".to_string()),
            refresh_token: SecretString::from("Atzr|refresh".to_string()),
        }
    }

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_refresh_token_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/o2/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=Atzr%7Crefresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "Atza|fresh",
                "token_type": "bearer",
                "expires_in": 1800
            })))
            .expect(1)
            .mount(&server)
            .await;

        let clock = clock();
        let source = LwaTokenSource::new(reqwest::Client::new(), config(&server))
            .with_clock(Arc::new(clock.clone()));

        let credential = source.fetch().await.unwrap();
        assert_eq!(credential.secret().expose(), "Atza|fresh");
        assert_eq!(credential.expires_at(), clock.now() + Duration::seconds(1800));
    }

    #[tokio::test]
    async fn test_missing_expires_in_defaults_to_an_hour() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "Atza|x" })),
            )
            .mount(&server)
            .await;

        let clock = clock();
        let source = LwaTokenSource::new(reqwest::Client::new(), config(&server))
            .with_clock(Arc::new(clock.clone()));

        let credential = source.fetch().await.unwrap();
        assert_eq!(credential.expires_at(), clock.now() + Duration::hours(1));
    }

    #[tokio::test]
    async fn test_grantless_sends_scope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("scope=sellingpartnerapi%3A%3Anotifications"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "Atc|g", "expires_in": 3600 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let source = LwaTokenSource::grantless(
            reqwest::Client::new(),
            config(&server),
            "sellingpartnerapi::notifications",
        );
        assert_eq!(source.name(), "lwa-grantless");
        assert_eq!(source.fetch().await.unwrap().secret().expose(), "Atc|g");
    }

    #[tokio::test]
    async fn test_failures_map_to_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "The request has an invalid grant parameter"
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "expires_in": 3600 })),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "access_token": "Atza|x", "expires_in": 0 }),
            ))
            .mount(&server)
            .await;

        let source = LwaTokenSource::new(reqwest::Client::new(), config(&server));

        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, Error::Auth(ref m) if m.contains("invalid_grant")));

        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, Error::Auth(ref m) if m.contains("no access_token")));

        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, Error::Auth(ref m) if m.contains("non-positive")));
    }

    #[tokio::test]
    async fn test_out_of_range_lifetime_is_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "Atza|x",
                "expires_in": i64::MAX
            })))
            .mount(&server)
            .await;

        let source = LwaTokenSource::new(reqwest::Client::new(), config(&server));
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, Error::Auth(ref m) if m.contains("out-of-range")));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = LwaConfig {
            token_url: "https://api.amazon.com/auth/o2/token".parse().unwrap(),
            client_id: "client".to_string(),
            client_secret: SecretString::from("shh".to_string()),
            refresh_token: SecretString::from("Atzr|shh".to_string()),
        };
        let source = LwaTokenSource::new(reqwest::Client::new(), config);
        let debug = format!("{:?}", source);
        assert!(!debug.contains("shh"));
    }
}
