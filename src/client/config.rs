//! Client configuration options.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::{Error, Result, SellingRegion};

/// Default Login with Amazon token endpoint.
pub const DEFAULT_LWA_TOKEN_URL: &str = "https://api.amazon.com/auth/o2/token";

/// Default STS role session name.
pub const DEFAULT_SESSION_NAME: &str = "marketfit-spapi";

/// Transport and refresh tuning for the SP-API client.
///
/// # Example
///
/// ```
/// use marketfit_spapi::{ClientConfig, RetryPolicy};
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(60))
///     .with_retry(RetryPolicy::default().with_max_attempts(6))
///     .with_user_agent("my-app/1.0");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Per-attempt timeout, covering connect through body
    pub timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// User-Agent header value
    pub user_agent: String,
    /// Retry configuration
    pub retry: RetryPolicy,
    /// How long before expiry AWS credentials are replaced
    pub sts_refresh_margin: Duration,
    /// How long before expiry LWA tokens are replaced
    pub lwa_refresh_margin: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            user_agent: format!("marketfit-spapi/{} (Language=Rust)", env!("CARGO_PKG_VERSION")),
            retry: RetryPolicy::default(),
            sts_refresh_margin: Duration::from_secs(5 * 60),
            lwa_refresh_margin: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the AWS credential refresh margin.
    pub fn with_sts_refresh_margin(mut self, margin: Duration) -> Self {
        self.sts_refresh_margin = margin;
        self
    }

    /// Set the LWA token refresh margin.
    pub fn with_lwa_refresh_margin(mut self, margin: Duration) -> Self {
        self.lwa_refresh_margin = margin;
        self
    }
}

/// Bounded retry with exponential backoff.
///
/// Attempt `n` (1-based) that fails retryably waits
/// `base_delay * multiplier^(n-1)`, plus or minus up to `jitter`, capped at
/// `max_delay`. `max_attempts` counts the first attempt and is never zero.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
    /// Maximum random deviation added to or removed from each delay
    pub jitter: Duration,
    /// Upper bound for any single delay, `Retry-After` included
    pub max_delay: Duration,
    /// HTTP status codes to retry on
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            jitter: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
            retry_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Set the total attempts. Zero is raised to one.
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max.max(1);
        self
    }

    /// Set the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the backoff multiplier. Values below one are treated as one.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = if multiplier.is_finite() { multiplier.max(1.0) } else { 1.0 };
        self
    }

    /// Set the jitter bound.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Set the maximum single delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Replace the retryable status set.
    pub fn with_retry_statuses(mut self, statuses: impl Into<Vec<u16>>) -> Self {
        self.retry_statuses = statuses.into();
        self
    }

    /// Backoff after failed attempt `attempt` (1-based), before jitter.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let nanos = self.base_delay.as_nanos() as f64 * self.multiplier.powi(exponent);
        let max_nanos = self.max_delay.as_nanos() as f64;
        if !nanos.is_finite() || nanos >= max_nanos {
            return self.max_delay;
        }
        Duration::from_nanos(nanos.round() as u64)
    }

    /// Check if a status code should be retried.
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }
}

/// STS role assumption settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StsConfig {
    /// IAM role to assume
    pub role_arn: String,
    /// AWS region of the STS endpoint
    pub region: String,
    /// Role session name
    pub session_name: String,
    /// External id passed to AssumeRole
    pub external_id: Option<String>,
    /// Requested session duration in seconds
    pub duration_secs: Option<i32>,
    /// STS endpoint override
    pub endpoint_url: Option<Url>,
}

impl StsConfig {
    /// Settings for `role_arn` in `region`, with defaults elsewhere.
    pub fn new(role_arn: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            role_arn: role_arn.into(),
            region: region.into(),
            session_name: DEFAULT_SESSION_NAME.to_string(),
            external_id: None,
            duration_secs: None,
            endpoint_url: None,
        }
    }
}

/// Login with Amazon app credentials.
#[derive(Debug, Clone)]
pub struct LwaConfig {
    /// Token endpoint
    pub token_url: Url,
    /// LWA client id
    pub client_id: String,
    /// LWA client secret
    pub client_secret: SecretString,
    /// Seller refresh token
    pub refresh_token: SecretString,
}

/// Everything needed to build an [`SpApiClient`](crate::SpApiClient).
#[derive(Debug, Clone)]
pub struct SpApiConfig {
    /// Role assumption
    pub sts: StsConfig,
    /// Token exchange
    pub lwa: LwaConfig,
    /// Home selling region
    pub region: SellingRegion,
    /// Endpoint override for every marketplace, e.g. the sandbox or a proxy
    pub endpoint_url: Option<Url>,
    /// Transport tuning
    pub client: ClientConfig,
}

impl SpApiConfig {
    /// Load from the process environment, reading `.env` first if present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming every missing required variable, or
    /// the first variable with an invalid value.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve variable names.
    ///
    /// Required: `ROLE_ARN`, `REGION`, `LWA_CLIENT_ID`,
    /// `LWA_CLIENT_SECRET`, `LWA_REFRESH_TOKEN`.
    ///
    /// Optional: `SELLER_ID`, `LWA_TOKEN_URL`, `SP_API_ENDPOINT_URL`,
    /// `STS_ENDPOINT_URL`, `SPAPI_MAX_ATTEMPTS`, `SPAPI_BASE_DELAY_MS`,
    /// `SPAPI_BACKOFF_MULTIPLIER`, `SPAPI_JITTER_MS`,
    /// `SPAPI_CONNECT_TIMEOUT_SECS`, `SPAPI_TIMEOUT_SECS`.
    ///
    /// ```
    /// use marketfit_spapi::SpApiConfig;
    ///
    /// let config = SpApiConfig::from_lookup(|key| match key {
    ///     "ROLE_ARN" => Some("arn:aws:iam::123456789012:role/spapi".into()),
    ///     "REGION" => Some("eu".into()),
    ///     "LWA_CLIENT_ID" => Some("client".into()),
    ///     "LWA_CLIENT_SECRET" => Some("secret".into()),
    ///     "LWA_REFRESH_TOKEN" => Some("Atzr|token".into()),
    ///     _ => None,
    /// })
    /// .unwrap();
    ///
    /// assert_eq!(config.sts.region, "eu-west-1");
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let required = [
            "ROLE_ARN",
            "REGION",
            "LWA_CLIENT_ID",
            "LWA_CLIENT_SECRET",
            "LWA_REFRESH_TOKEN",
        ];
        let missing: Vec<&str> = required.iter().copied().filter(|k| get(k).is_none()).collect();
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }
        let require = |key: &str| {
            get(key).ok_or_else(|| Error::Config(format!("{} is not set", key)))
        };

        let region_value = require("REGION")?;
        let region: SellingRegion = region_value
            .parse()
            .map_err(|_| Error::Config(format!("REGION has an unknown value: {}", region_value)))?;
        // An explicit AWS region wins over the region implied by a short code.
        let aws_region = if SellingRegion::from_aws_region(&region_value).is_some() {
            region_value.clone()
        } else {
            region.aws_region().to_string()
        };

        let mut sts = StsConfig::new(require("ROLE_ARN")?, aws_region);
        sts.external_id = get("SELLER_ID");
        sts.endpoint_url = parse_optional(&get, "STS_ENDPOINT_URL", |v| v.parse::<Url>().ok())?;

        let token_url = match get("LWA_TOKEN_URL") {
            Some(v) => v
                .parse::<Url>()
                .map_err(|e| Error::Config(format!("LWA_TOKEN_URL is not a URL: {}", e)))?,
            None => Url::parse(DEFAULT_LWA_TOKEN_URL)?,
        };
        let lwa = LwaConfig {
            token_url,
            client_id: require("LWA_CLIENT_ID")?,
            client_secret: SecretString::from(require("LWA_CLIENT_SECRET")?),
            refresh_token: SecretString::from(require("LWA_REFRESH_TOKEN")?),
        };

        let mut retry = RetryPolicy::default();
        if let Some(n) = parse_optional(&get, "SPAPI_MAX_ATTEMPTS", |v| {
            v.parse::<u32>().ok().filter(|n| *n >= 1)
        })? {
            retry = retry.with_max_attempts(n);
        }
        if let Some(ms) = parse_optional(&get, "SPAPI_BASE_DELAY_MS", |v| v.parse::<u64>().ok())? {
            retry = retry.with_base_delay(Duration::from_millis(ms));
        }
        if let Some(m) = parse_optional(&get, "SPAPI_BACKOFF_MULTIPLIER", |v| {
            v.parse::<f64>().ok().filter(|m| m.is_finite() && *m >= 1.0)
        })? {
            retry = retry.with_multiplier(m);
        }
        if let Some(ms) = parse_optional(&get, "SPAPI_JITTER_MS", |v| v.parse::<u64>().ok())? {
            retry = retry.with_jitter(Duration::from_millis(ms));
        }

        let mut client = ClientConfig::default().with_retry(retry);
        if let Some(secs) = parse_optional(&get, "SPAPI_CONNECT_TIMEOUT_SECS", positive_secs)? {
            client = client.with_connect_timeout(secs);
        }
        if let Some(secs) = parse_optional(&get, "SPAPI_TIMEOUT_SECS", positive_secs)? {
            client = client.with_timeout(secs);
        }

        let config = Self {
            sts,
            lwa,
            region,
            endpoint_url: parse_optional(&get, "SP_API_ENDPOINT_URL", |v| v.parse::<Url>().ok())?,
            client,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if !self.sts.role_arn.starts_with("arn:") {
            return Err(Error::Config(format!(
                "ROLE_ARN must be an IAM role ARN: {}",
                self.sts.role_arn
            )));
        }
        if let Some(secs) = self.sts.duration_secs {
            if !(900..=43_200).contains(&secs) {
                return Err(Error::Config(format!(
                    "STS session duration must be between 900 and 43200 seconds: {}",
                    secs
                )));
            }
        }
        for (name, url) in [
            ("LWA_TOKEN_URL", Some(&self.lwa.token_url)),
            ("SP_API_ENDPOINT_URL", self.endpoint_url.as_ref()),
            ("STS_ENDPOINT_URL", self.sts.endpoint_url.as_ref()),
        ] {
            if let Some(url) = url {
                if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
                    return Err(Error::Config(format!("{} must be an http(s) URL: {}", name, url)));
                }
            }
        }
        Ok(())
    }

    /// Endpoint requests for `region` go to.
    pub fn endpoint_for(&self, region: SellingRegion) -> Result<Url> {
        match &self.endpoint_url {
            Some(url) => Ok(url.clone()),
            None => Ok(Url::parse(region.endpoint_url())?),
        }
    }
}

fn positive_secs(v: &str) -> Option<Duration> {
    v.parse::<u64>().ok().filter(|s| *s > 0).map(Duration::from_secs)
}

fn parse_optional<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>> {
    match get(key) {
        None => Ok(None),
        Some(raw) => parse(&raw)
            .map(Some)
            .ok_or_else(|| Error::Config(format!("{} has an invalid value: {}", key, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn base_env() -> HashMap<String, String> {
        env(&[
            ("ROLE_ARN", "arn:aws:iam::123456789012:role/SellingPartner"),
            ("REGION", "us-east-1"),
            ("LWA_CLIENT_ID", "amzn1.application-oa2-client.abc"),
            ("LWA_CLIENT_SECRET", "secret"),
            ("LWA_REFRESH_TOKEN", "Atzr|refresh"),
        ])
    }

    fn load(vars: &HashMap<String, String>) -> Result<SpApiConfig> {
        SpApiConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.sts_refresh_margin, Duration::from_secs(300));
        assert_eq!(config.lwa_refresh_margin, Duration::from_secs(60));
    }

    #[test]
    fn test_retry_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_for_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_for_attempt(3), Duration::from_secs(4));
    }

    #[test]
    fn test_retry_backoff_max() {
        let policy = RetryPolicy::default()
            .with_base_delay(Duration::from_secs(10))
            .with_max_delay(Duration::from_secs(30));

        // 10 * 2^3 = 80, but capped at 30
        assert_eq!(policy.backoff_for_attempt(4), Duration::from_secs(30));
        assert_eq!(policy.backoff_for_attempt(500), Duration::from_secs(30));
    }

    #[test]
    fn test_max_attempts_at_least_one() {
        assert_eq!(RetryPolicy::default().max_attempts(), 4);
        assert_eq!(RetryPolicy::default().with_max_attempts(0).max_attempts(), 1);
        assert_eq!(RetryPolicy::no_retry().max_attempts(), 1);
    }

    #[test]
    fn test_should_retry_status() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry_status(429));
        assert!(policy.should_retry_status(503));
        assert!(!policy.should_retry_status(404));
        assert!(!policy.should_retry_status(501));
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.region, SellingRegion::NorthAmerica);
        assert_eq!(config.sts.region, "us-east-1");
        assert_eq!(config.sts.session_name, DEFAULT_SESSION_NAME);
        assert_eq!(config.sts.external_id, None);
        assert_eq!(config.lwa.token_url.as_str(), DEFAULT_LWA_TOKEN_URL);
        assert_eq!(config.lwa.refresh_token.expose_secret(), "Atzr|refresh");
        assert!(config.endpoint_url.is_none());
        assert_eq!(
            config.endpoint_for(config.region).unwrap().as_str(),
            "https://sellingpartnerapi-na.amazon.com/"
        );
    }

    #[test]
    fn test_from_lookup_reports_every_missing_variable() {
        let mut vars = base_env();
        vars.remove("ROLE_ARN");
        vars.remove("LWA_REFRESH_TOKEN");
        vars.insert("LWA_CLIENT_ID".into(), "   ".into());

        match load(&vars) {
            Err(Error::Config(message)) => {
                assert!(message.contains("ROLE_ARN"));
                assert!(message.contains("LWA_CLIENT_ID"));
                assert!(message.contains("LWA_REFRESH_TOKEN"));
                assert!(!message.contains("REGION"));
            }
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_lookup_optional_values() {
        let mut vars = base_env();
        vars.extend(env(&[
            ("REGION", "fe"),
            ("SELLER_ID", "A2SELLER"),
            ("SP_API_ENDPOINT_URL", "http://127.0.0.1:9000"),
            ("SPAPI_MAX_ATTEMPTS", "6"),
            ("SPAPI_BASE_DELAY_MS", "50"),
            ("SPAPI_BACKOFF_MULTIPLIER", "3"),
            ("SPAPI_JITTER_MS", "0"),
            ("SPAPI_TIMEOUT_SECS", "10"),
        ]));

        let config = load(&vars).unwrap();
        assert_eq!(config.region, SellingRegion::FarEast);
        assert_eq!(config.sts.region, "us-west-2");
        assert_eq!(config.sts.external_id.as_deref(), Some("A2SELLER"));
        assert_eq!(config.client.retry.max_attempts(), 6);
        assert_eq!(config.client.retry.base_delay, Duration::from_millis(50));
        assert_eq!(config.client.retry.multiplier, 3.0);
        assert_eq!(config.client.retry.jitter, Duration::ZERO);
        assert_eq!(config.client.timeout, Duration::from_secs(10));
        assert_eq!(
            config.endpoint_for(SellingRegion::Europe).unwrap().as_str(),
            "http://127.0.0.1:9000/"
        );
    }

    #[test]
    fn test_from_lookup_invalid_values() {
        for (key, value) in [
            ("REGION", "mars-1"),
            ("SPAPI_MAX_ATTEMPTS", "0"),
            ("SPAPI_BACKOFF_MULTIPLIER", "0.5"),
            ("SPAPI_TIMEOUT_SECS", "soon"),
            ("SP_API_ENDPOINT_URL", "not a url"),
            ("ROLE_ARN", "SellingPartnerRole"),
        ] {
            let mut vars = base_env();
            vars.insert(key.into(), value.into());
            match load(&vars) {
                Err(Error::Config(message)) => assert!(message.contains(key), "{}", message),
                other => panic!("Expected Config error for {}, got {:?}", key, other),
            }
        }
    }
}
