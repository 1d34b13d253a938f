//! Role assumption through AWS STS.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sts::error::DisplayErrorContext;
use aws_sdk_sts::Client as StsClient;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::credential::{AwsCredentials, Credential};
use super::provider::CredentialSource;
use crate::client::StsConfig;
use crate::{Error, Result};

/// Mints temporary AWS credentials by assuming the configured IAM role.
///
/// The SDK's own credential chain (environment, profile, instance metadata)
/// supplies the identity that performs the assumption.
#[derive(Debug, Clone)]
pub struct StsRoleSource {
    client: StsClient,
    config: StsConfig,
}

impl StsRoleSource {
    /// Build a source, loading the SDK configuration for the STS region.
    pub async fn new(config: StsConfig) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint.as_str());
        }
        let sdk_config = loader.load().await;

        Self::with_client(StsClient::new(&sdk_config), config)
    }

    /// Build a source around an existing STS client.
    pub fn with_client(client: StsClient, config: StsConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl CredentialSource for StsRoleSource {
    type Secret = AwsCredentials;

    fn name(&self) -> &'static str {
        "sts"
    }

    async fn fetch(&self) -> Result<Credential<AwsCredentials>> {
        info!("Calling AWS STS AssumeRole");
        debug!(
            role_arn = %self.config.role_arn,
            session_name = %self.config.session_name,
            "Assuming role"
        );

        let response = self
            .client
            .assume_role()
            .role_arn(&self.config.role_arn)
            .role_session_name(&self.config.session_name)
            .set_external_id(self.config.external_id.clone())
            .set_duration_seconds(self.config.duration_secs)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("AssumeRole failed: {}", DisplayErrorContext(&e))))?;

        let creds = response
            .credentials()
            .ok_or_else(|| Error::Auth("AWS STS returned no credentials".to_string()))?;

        let expiration = creds.expiration();
        let expires_at = DateTime::<Utc>::from_timestamp(expiration.secs(), expiration.subsec_nanos())
            .ok_or_else(|| {
                Error::Auth(format!("AWS STS returned an invalid expiration: {}", expiration))
            })?;

        Ok(Credential::new(
            AwsCredentials::new(
                creds.access_key_id(),
                creds.secret_access_key(),
                Some(creds.session_token().to_string()),
            ),
            expires_at,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_sts::config::Credentials;
    use chrono::TimeZone;
    use secrecy::ExposeSecret;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ASSUME_ROLE_RESPONSE: &str = r#"<AssumeRoleResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <AssumeRoleResult>
    <Credentials>
      <AccessKeyId>ASIAEXAMPLE</AccessKeyId>
      <SecretAccessKey>role-secret</SecretAccessKey>
      <SessionToken>role-session</SessionToken>
      <Expiration>2030-01-01T12:00:00Z</Expiration>
    </Credentials>
    <AssumedRoleUser>
      <Arn>arn:aws:sts::123456789012:assumed-role/SellingPartnerApi/marketfit-spapi</Arn>
      <AssumedRoleId>AROAEXAMPLE:marketfit-spapi</AssumedRoleId>
    </AssumedRoleUser>
  </AssumeRoleResult>
  <ResponseMetadata>
    <RequestId>c6104cbe-af31-11e0-8154-cbc7ccf896c7</RequestId>
  </ResponseMetadata>
</AssumeRoleResponse>"#;

    const ACCESS_DENIED: &str = r#"<ErrorResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <Error>
    <Type>Sender</Type>
    <Code>AccessDenied</Code>
    <Message>User is not authorized to perform: sts:AssumeRole</Message>
  </Error>
  <RequestId>4b0c3c2e-0f5a-11e0-8154-cbc7ccf896c7</RequestId>
</ErrorResponse>"#;

    fn source(server: &MockServer) -> StsRoleSource {
        let sdk_config = aws_sdk_sts::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("AKIDEXAMPLE", "caller-secret", None, None, "test"))
            .endpoint_url(server.uri())
            .build();

        let mut config = StsConfig::new("arn:aws:iam::123456789012:role/SellingPartnerApi", "us-east-1");
        config.external_id = Some("A2SELLERID".to_string());
        StsRoleSource::with_client(StsClient::from_conf(sdk_config), config)
    }

    #[tokio::test]
    async fn test_assume_role() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("Action=AssumeRole"))
            .and(body_string_contains("RoleSessionName=marketfit-spapi"))
            .and(body_string_contains("ExternalId=A2SELLERID"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/xml")
                    .set_body_string(ASSUME_ROLE_RESPONSE),
            )
            .expect(1)
            .mount(&server)
            .await;

        let credential = source(&server).fetch().await.unwrap();
        let secret = credential.secret();

        assert_eq!(secret.access_key_id, "ASIAEXAMPLE");
        assert_eq!(secret.secret_access_key.expose_secret(), "role-secret");
        assert_eq!(
            secret.session_token.as_ref().map(|t| t.expose_secret().to_string()),
            Some("role-session".to_string())
        );
        assert_eq!(
            credential.expires_at(),
            Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_assume_role_denied() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("content-type", "text/xml")
                    .set_body_string(ACCESS_DENIED),
            )
            .mount(&server)
            .await;

        let err = source(&server).fetch().await.unwrap_err();
        assert!(matches!(err, Error::Auth(ref m) if m.contains("AccessDenied")));
    }
}
