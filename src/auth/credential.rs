//! Credential values.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// A secret paired with the instant it stops being valid.
///
/// Credentials are immutable. A refresh produces a new `Credential` rather
/// than mutating the old one, so a request holding an `Arc<Credential<_>>`
/// keeps signing with the value it started with.
#[derive(Clone)]
pub struct Credential<T> {
    secret: T,
    expires_at: DateTime<Utc>,
}

impl<T> Credential<T> {
    /// Create a credential.
    pub fn new(secret: T, expires_at: DateTime<Utc>) -> Self {
        Self { secret, expires_at }
    }

    /// The secret.
    pub fn secret(&self) -> &T {
        &self.secret
    }

    /// Absolute expiry.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the credential is unusable at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether `now` falls inside the refresh margin before expiry.
    pub fn needs_refresh_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now.checked_add_signed(margin)
            .map_or(true, |deadline| deadline >= self.expires_at)
    }
}

impl<T> fmt::Debug for Credential<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Temporary AWS credentials from a role assumption.
#[derive(Clone, Debug)]
pub struct AwsCredentials {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: SecretString,
    /// Session token; present for STS credentials
    pub session_token: Option<SecretString>,
}

impl AwsCredentials {
    /// Create credentials.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::from(secret_access_key.into()),
            session_token: session_token.map(SecretString::from),
        }
    }
}

/// A Login with Amazon bearer token.
#[derive(Clone, Debug)]
pub struct AccessToken(SecretString);

impl AccessToken {
    /// Wrap a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token value.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_expiry_checks() {
        let expires = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        let cred = Credential::new(AccessToken::new("Atza|token"), expires);

        let before = expires - Duration::minutes(10);
        assert!(!cred.is_expired_at(before));
        assert!(!cred.needs_refresh_at(before, Duration::minutes(5)));
        assert!(cred.needs_refresh_at(before, Duration::minutes(10)));
        assert!(cred.is_expired_at(expires));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let cred = Credential::new(
            AwsCredentials::new("AKIDEXAMPLE", "super-secret-key", Some("session-tok".into())),
            Utc::now(),
        );
        let debug = format!("{:?}", cred);
        assert!(!debug.contains("super-secret-key"));
        assert!(!debug.contains("session-tok"));
        assert!(debug.contains("REDACTED"));

        let token = AccessToken::new("Atza|secret");
        assert!(!format!("{:?}", token).contains("Atza|secret"));
        assert_eq!(token.expose(), "Atza|secret");
    }
}
