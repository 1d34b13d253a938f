//! The SP-API client facade.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::api::{CatalogService, CompareService, PricingService};
use crate::auth::{
    AccessToken, AuthContext, AwsCredentials, CachedProvider, CredentialSource, LwaTokenSource,
    StsRoleSource,
};
use crate::clock::{Clock, Sleeper, SystemClock};
use crate::signing::RequestSigner;
use crate::{Error, Result, SellingRegion};

use super::config::SpApiConfig;
use super::request::{DraftRequest, SignedRequest};
use super::transport::{ApiResponse, Transport};

/// Which LWA token a request carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenScope {
    /// The seller's refresh-token grant
    Seller,
    /// A grantless token for one scope,
    /// e.g. `sellingpartnerapi::notifications`
    Grantless(String),
}

/// The main client for interacting with the Selling Partner API.
///
/// Built once and shared: cloning is cheap and every clone uses the same
/// credential caches and connection pool. Resource access goes through
/// service structs returned by [`catalog`](Self::catalog),
/// [`pricing`](Self::pricing) and [`compare`](Self::compare).
///
/// # Example
///
/// ```no_run
/// use marketfit_spapi::{Asin, Marketplace, SpApiClient, SpApiConfig};
///
/// # async fn example() -> marketfit_spapi::Result<()> {
/// let client = SpApiClient::new(SpApiConfig::from_env()?).await?;
/// let asin = Asin::new("B000123456")?;
///
/// if let Some(item) = client.catalog().lookup_item(&asin, Marketplace::US).await? {
///     println!("{:?}", item.title());
/// }
///
/// if let Some(pricing) = client.pricing().get_pricing(&asin, Marketplace::US).await? {
///     println!("{:?} {:?}", pricing.price, pricing.currency);
/// }
/// # Ok(())
/// # }
/// ```
pub struct SpApiClient {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) config: SpApiConfig,
    aws_credentials: CachedProvider<AwsCredentials>,
    access_token: Arc<CachedProvider<AccessToken>>,
    grantless: Mutex<HashMap<String, Arc<CachedProvider<AccessToken>>>>,
    lwa_http: reqwest::Client,
    signer: RequestSigner,
    transport: Transport,
    clock: Arc<dyn Clock>,
}

impl SpApiClient {
    /// Create a client that assumes the configured role through STS.
    pub async fn new(config: SpApiConfig) -> Result<Self> {
        Self::builder(config).build().await
    }

    /// Create a client from environment variables.
    ///
    /// See [`SpApiConfig::from_lookup`] for the variables read.
    pub async fn from_env() -> Result<Self> {
        Self::new(SpApiConfig::from_env()?).await
    }

    /// Start a builder for injecting credential sources or time sources.
    pub fn builder(config: SpApiConfig) -> SpApiClientBuilder {
        SpApiClientBuilder::new(config)
    }

    /// Get the catalog items service.
    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(self.inner.clone())
    }

    /// Get the product pricing service.
    pub fn pricing(&self) -> PricingService {
        PricingService::new(self.inner.clone())
    }

    /// Get the cross-marketplace comparison service.
    pub fn compare(&self) -> CompareService {
        CompareService::new(self.inner.clone())
    }

    /// The configuration the client was built with.
    pub fn config(&self) -> &SpApiConfig {
        &self.inner.config
    }

    /// GET a resource not covered by a typed service.
    ///
    /// Returns `Ok(None)` for a 404 or an empty body.
    ///
    /// ```no_run
    /// use marketfit_spapi::{SellingRegion, SpApiClient};
    ///
    /// # async fn example(client: SpApiClient) -> marketfit_spapi::Result<()> {
    /// let participations: Option<serde_json::Value> = client
    ///     .get_json(SellingRegion::NorthAmerica, "/sellers/v1/marketplaceParticipations", &[])
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        region: SellingRegion,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let draft = DraftRequest::get(path).query_pairs_from(query.iter().copied());
        self.inner.get_json(&draft, &TokenScope::Seller, region).await
    }

    /// GET a grantless resource, authorized by a `client_credentials` token
    /// for `scope`.
    pub async fn get_json_grantless<T: DeserializeOwned>(
        &self,
        scope: &str,
        region: SellingRegion,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let draft = DraftRequest::get(path).query_pairs_from(query.iter().copied());
        self.inner
            .get_json(&draft, &TokenScope::Grantless(scope.to_string()), region)
            .await
    }

    /// Sign and send an arbitrary request.
    pub async fn send(
        &self,
        draft: &DraftRequest,
        scope: &TokenScope,
        region: SellingRegion,
    ) -> Result<ApiResponse> {
        self.inner.send(draft, scope, region).await
    }

    /// Drop every cached credential; the next call exchanges afresh.
    pub fn invalidate_credentials(&self) {
        self.inner.invalidate_credentials();
    }
}

impl ClientInner {
    fn token_provider(&self, scope: &TokenScope) -> Arc<CachedProvider<AccessToken>> {
        let scope = match scope {
            TokenScope::Seller => return Arc::clone(&self.access_token),
            TokenScope::Grantless(scope) => scope,
        };

        let mut grantless = self.grantless.lock();
        let provider = grantless.entry(scope.clone()).or_insert_with(|| {
            debug!(scope = %scope, "Creating grantless token provider");
            let source = LwaTokenSource::grantless(
                self.lwa_http.clone(),
                self.config.lwa.clone(),
                scope.clone(),
            )
            .with_clock(Arc::clone(&self.clock));
            Arc::new(CachedProvider::new(
                source,
                Arc::clone(&self.clock),
                self.config.client.lwa_refresh_margin,
            ))
        });
        Arc::clone(provider)
    }

    /// Gather fresh credentials for one request.
    pub(crate) async fn auth_context(
        &self,
        scope: &TokenScope,
        region: SellingRegion,
    ) -> Result<AuthContext> {
        let endpoint = self.config.endpoint_for(region)?;
        let tokens = self.token_provider(scope);

        let (aws, token) =
            tokio::try_join!(self.aws_credentials.credential(), tokens.credential())?;

        Ok(AuthContext::new(aws, token, region.aws_region(), endpoint))
    }

    /// Acquire credentials and sign `draft` for one attempt.
    async fn sign_attempt(
        &self,
        draft: &DraftRequest,
        scope: &TokenScope,
        region: SellingRegion,
    ) -> Result<SignedRequest> {
        let ctx = self.auth_context(scope, region).await?;
        self.signer.sign(&ctx, draft, self.clock.now())
    }

    /// Sign and send one request.
    ///
    /// Each attempt is signed just before it is sent, so a retry after a
    /// long backoff picks up refreshed credentials. A 401 or 403 clears the
    /// cached credentials so the next call starts from fresh exchanges. The
    /// failing call itself is not repeated.
    pub(crate) async fn send(
        &self,
        draft: &DraftRequest,
        scope: &TokenScope,
        region: SellingRegion,
    ) -> Result<ApiResponse> {
        let result = self
            .transport
            .execute_signed(|| self.sign_attempt(draft, scope, region))
            .await;
        if let Err(Error::Client { status, .. }) = &result {
            if *status == 401 || *status == 403 {
                warn!(status = *status, path = %draft.path(), "SP-API rejected credentials; clearing caches");
                self.aws_credentials.invalidate();
                self.token_provider(scope).invalidate();
            }
        }
        result
    }

    /// Send and decode a JSON body; `None` for a 404 or an empty body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        draft: &DraftRequest,
        scope: &TokenScope,
        region: SellingRegion,
    ) -> Result<Option<T>> {
        let response = match self.send(draft, scope, region).await {
            Ok(response) => response,
            Err(Error::Client { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        if response.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&response.body)
            .map(Some)
            .map_err(|e| Error::Parse(format!("{} {}: {}", draft.method(), draft.path(), e)))
    }

    pub(crate) fn invalidate_credentials(&self) {
        self.aws_credentials.invalidate();
        self.access_token.invalidate();
        for provider in self.grantless.lock().values() {
            provider.invalidate();
        }
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// Builder for [`SpApiClient`].
///
/// Every hook is optional. Unset sources default to STS role assumption
/// and the LWA refresh-token grant described by the config.
///
/// ```no_run
/// use std::sync::Arc;
/// use marketfit_spapi::{SpApiClient, SpApiConfig};
/// use marketfit_spapi::clock::SystemClock;
///
/// # async fn example() -> marketfit_spapi::Result<()> {
/// let client = SpApiClient::builder(SpApiConfig::from_env()?)
///     .clock(Arc::new(SystemClock))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct SpApiClientBuilder {
    config: SpApiConfig,
    aws_source: Option<Arc<dyn CredentialSource<Secret = AwsCredentials>>>,
    token_source: Option<Arc<dyn CredentialSource<Secret = AccessToken>>>,
    clock: Option<Arc<dyn Clock>>,
    sleeper: Option<Arc<dyn Sleeper>>,
}

impl SpApiClientBuilder {
    /// Start from `config`.
    pub fn new(config: SpApiConfig) -> Self {
        Self {
            config,
            aws_source: None,
            token_source: None,
            clock: None,
            sleeper: None,
        }
    }

    /// Use `source` for AWS credentials instead of STS.
    pub fn aws_credentials_source(
        mut self,
        source: impl CredentialSource<Secret = AwsCredentials>,
    ) -> Self {
        self.aws_source = Some(Arc::new(source));
        self
    }

    /// Use `source` for the seller access token instead of LWA.
    pub fn access_token_source(mut self, source: impl CredentialSource<Secret = AccessToken>) -> Self {
        self.token_source = Some(Arc::new(source));
        self
    }

    /// Use `clock` for expiry checks and signing timestamps.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use `sleeper` between retry attempts.
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the config is inconsistent and
    /// [`Error::Http`] if the HTTP client cannot be constructed.
    pub async fn build(self) -> Result<SpApiClient> {
        let config = self.config;
        config.validate()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let http = Transport::http_client(&config.client)?;
        let lwa_http = http.clone();

        let aws_source: Arc<dyn CredentialSource<Secret = AwsCredentials>> = match self.aws_source {
            Some(source) => source,
            None => Arc::new(StsRoleSource::new(config.sts.clone()).await),
        };
        let token_source: Arc<dyn CredentialSource<Secret = AccessToken>> = match self.token_source {
            Some(source) => source,
            None => Arc::new(
                LwaTokenSource::new(lwa_http.clone(), config.lwa.clone())
                    .with_clock(Arc::clone(&clock)),
            ),
        };

        let mut transport =
            Transport::new(http, config.client.retry.clone()).with_clock(Arc::clone(&clock));
        if let Some(sleeper) = self.sleeper {
            transport = transport.with_sleeper(sleeper);
        }

        let inner = ClientInner {
            aws_credentials: CachedProvider::from_arc(
                aws_source,
                Arc::clone(&clock),
                config.client.sts_refresh_margin,
            ),
            access_token: Arc::new(CachedProvider::from_arc(
                token_source,
                Arc::clone(&clock),
                config.client.lwa_refresh_margin,
            )),
            grantless: Mutex::new(HashMap::new()),
            lwa_http,
            signer: RequestSigner::default(),
            transport,
            clock,
            config,
        };

        Ok(SpApiClient {
            inner: Arc::new(inner),
        })
    }
}

impl Clone for SpApiClient {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl std::fmt::Debug for SpApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpApiClient")
            .field("region", &self.inner.config.region)
            .field("endpoint_url", &self.inner.config.endpoint_url)
            .field("client", &self.inner.config.client)
            .finish()
    }
}
