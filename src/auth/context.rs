use std::sync::Arc;

use url::Url;

use super::credential::{AccessToken, AwsCredentials, Credential};

/// Everything needed to sign one request.
///
/// Built per request from the latest provider snapshots and dropped with it.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// AWS credentials from role assumption
    pub aws: Arc<Credential<AwsCredentials>>,
    /// LWA access token
    pub token: Arc<Credential<AccessToken>>,
    /// AWS signing region, e.g. `us-east-1`
    pub region: String,
    /// SP-API endpoint base URL
    pub endpoint: Url,
}

impl AuthContext {
    /// Assemble a context.
    pub fn new(
        aws: Arc<Credential<AwsCredentials>>,
        token: Arc<Credential<AccessToken>>,
        region: impl Into<String>,
        endpoint: Url,
    ) -> Self {
        Self {
            aws,
            token,
            region: region.into(),
            endpoint,
        }
    }
}
