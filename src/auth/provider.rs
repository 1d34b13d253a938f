//! Cached credential providers with single-flight refresh.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::credential::Credential;
use crate::clock::Clock;
use crate::{Error, Result};

/// Something that can mint a fresh credential.
///
/// Implementations perform exactly one external exchange per call and never
/// retry; caching and refresh timing belong to [`CachedProvider`].
#[async_trait]
pub trait CredentialSource: Send + Sync + 'static {
    /// The secret this source produces.
    type Secret: Send + Sync + 'static;

    /// Short name used in logs, e.g. `sts` or `lwa`.
    fn name(&self) -> &'static str;

    /// Perform the exchange.
    async fn fetch(&self) -> Result<Credential<Self::Secret>>;
}

type FetchResult<T> = std::result::Result<Arc<Credential<T>>, String>;
type InFlight<T> = Shared<BoxFuture<'static, FetchResult<T>>>;

struct State<T> {
    current: Option<Arc<Credential<T>>>,
    in_flight: Option<InFlight<T>>,
}

/// Caches the credential of a [`CredentialSource`] and refreshes it before
/// it expires.
///
/// # Thread Safety
///
/// `CachedProvider` is shared across tasks. The current credential is an
/// immutable snapshot swapped under a short lock that is never held across
/// an `.await`. When a refresh is due, the first caller starts it and every
/// concurrent caller awaits that same exchange, so one refresh window costs
/// one external call.
pub struct CachedProvider<T> {
    source: Arc<dyn CredentialSource<Secret = T>>,
    clock: Arc<dyn Clock>,
    refresh_margin: chrono::Duration,
    state: Mutex<State<T>>,
    exchanges: AtomicU64,
}

impl<T: Send + Sync + 'static> CachedProvider<T> {
    /// Wrap a source.
    ///
    /// `refresh_margin` is how long before expiry a credential is replaced.
    pub fn new(
        source: impl CredentialSource<Secret = T>,
        clock: Arc<dyn Clock>,
        refresh_margin: Duration,
    ) -> Self {
        Self::from_arc(Arc::new(source), clock, refresh_margin)
    }

    /// Wrap a shared source.
    pub fn from_arc(
        source: Arc<dyn CredentialSource<Secret = T>>,
        clock: Arc<dyn Clock>,
        refresh_margin: Duration,
    ) -> Self {
        Self {
            source,
            clock,
            refresh_margin: chrono::Duration::from_std(refresh_margin)
                .unwrap_or_else(|_| chrono::Duration::zero()),
            state: Mutex::new(State {
                current: None,
                in_flight: None,
            }),
            exchanges: AtomicU64::new(0),
        }
    }

    /// Return a credential that is valid now and outside the refresh
    /// margin, refreshing it first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the exchange fails. Nothing is cached on
    /// failure, so the next call starts a new exchange.
    pub async fn credential(&self) -> Result<Arc<Credential<T>>> {
        let fetch = {
            let mut state = self.state.lock();
            let now = self.clock.now();

            if let Some(current) = &state.current {
                if !current.needs_refresh_at(now, self.refresh_margin) {
                    return Ok(Arc::clone(current));
                }
            }

            match &state.in_flight {
                Some(fetch) => fetch.clone(),
                None => {
                    let fetch = self.start_exchange();
                    state.in_flight = Some(fetch.clone());
                    fetch
                }
            }
        };

        let result = fetch.clone().await;

        let mut state = self.state.lock();
        if state
            .in_flight
            .as_ref()
            .is_some_and(|pending| pending.ptr_eq(&fetch))
        {
            state.in_flight = None;
        }

        match result {
            Ok(credential) => {
                let newer = state
                    .current
                    .as_ref()
                    .map_or(true, |c| c.expires_at() <= credential.expires_at());
                if newer {
                    state.current = Some(Arc::clone(&credential));
                }
                Ok(credential)
            }
            Err(message) => Err(Error::Auth(message)),
        }
    }

    /// The cached credential, without refreshing.
    pub fn cached(&self) -> Option<Arc<Credential<T>>> {
        self.state.lock().current.clone()
    }

    /// Drop the cached credential so the next call exchanges again.
    pub fn invalidate(&self) {
        self.state.lock().current = None;
    }

    /// Number of external exchanges started so far.
    pub fn exchange_count(&self) -> u64 {
        self.exchanges.load(Ordering::Relaxed)
    }

    /// Name of the underlying source.
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    fn start_exchange(&self) -> InFlight<T> {
        self.exchanges.fetch_add(1, Ordering::Relaxed);
        let source = Arc::clone(&self.source);
        let clock = Arc::clone(&self.clock);

        async move {
            let name = source.name();
            debug!(source = name, "Refreshing credential");

            let credential = source.fetch().await.map_err(|e| {
                warn!(source = name, error = %e, "Credential exchange failed");
                match e {
                    Error::Auth(message) => message,
                    other => other.to_string(),
                }
            })?;

            if credential.is_expired_at(clock.now()) {
                warn!(source = name, "Credential exchange returned an expired credential");
                return Err(format!(
                    "{} returned a credential that expired at {}",
                    name,
                    credential.expires_at()
                ));
            }

            info!(
                source = name,
                expires_at = %credential.expires_at(),
                "Credential refreshed"
            );
            Ok(Arc::new(credential))
        }
        .boxed()
        .shared()
    }
}

impl<T: Send + Sync + 'static> std::fmt::Debug for CachedProvider<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedProvider")
            .field("source", &self.source.name())
            .field("refresh_margin", &self.refresh_margin)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AccessToken;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::AtomicU32;

    struct CountingSource {
        calls: Arc<AtomicU32>,
        clock: ManualClock,
        lifetime: chrono::Duration,
        fail: bool,
    }

    #[async_trait]
    impl CredentialSource for CountingSource {
        type Secret = AccessToken;

        fn name(&self) -> &'static str {
            "counting"
        }

        async fn fetch(&self) -> Result<Credential<AccessToken>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail {
                return Err(Error::Auth("token endpoint said no".into()));
            }
            Ok(Credential::new(
                AccessToken::new(format!("token-{}", n)),
                self.clock.now() + self.lifetime,
            ))
        }
    }

    fn provider(fail: bool) -> (CachedProvider<AccessToken>, Arc<AtomicU32>, ManualClock) {
        let calls = Arc::new(AtomicU32::new(0));
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());
        let source = CountingSource {
            calls: Arc::clone(&calls),
            clock: clock.clone(),
            lifetime: chrono::Duration::hours(1),
            fail,
        };
        let provider = CachedProvider::new(
            source,
            Arc::new(clock.clone()),
            Duration::from_secs(60),
        );
        (provider, calls, clock)
    }

    #[tokio::test]
    async fn test_caches_until_margin() {
        let (provider, calls, clock) = provider(false);

        let first = provider.credential().await.unwrap();
        clock.advance(chrono::Duration::minutes(58));
        let second = provider.credential().await.unwrap();
        assert_eq!(first.secret().expose(), second.secret().expose());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // 59 minutes in: inside the 60 second margin
        clock.advance(chrono::Duration::seconds(61));
        let third = provider.credential().await.unwrap();
        assert_eq!(third.secret().expose(), "token-2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(provider.exchange_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_exchange() {
        let (provider, calls, _clock) = provider(false);

        let results =
            futures_util::future::join_all((0..32).map(|_| provider.credential())).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap().secret().expose(), "token-1");
        }
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let (provider, calls, _clock) = provider(true);

        let err = provider.credential().await.unwrap_err();
        assert!(matches!(err, Error::Auth(ref m) if m == "token endpoint said no"));
        assert!(provider.cached().is_none());

        assert!(provider.credential().await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_exchange() {
        let (provider, calls, _clock) = provider(false);
        provider.credential().await.unwrap();
        provider.invalidate();
        assert!(provider.cached().is_none());
        provider.credential().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_abandoned_exchange_is_resumed_not_repeated() {
        let (provider, calls, _clock) = provider(false);

        // Cancel the first caller while its exchange is in flight.
        let abandoned =
            tokio::time::timeout(Duration::from_millis(1), provider.credential()).await;
        assert!(abandoned.is_err());

        let credential = provider.credential().await.unwrap();
        assert_eq!(credential.secret().expose(), "token-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_debug_names_source() {
        let (provider, _, _) = provider(false);
        let debug = format!("{:?}", provider);
        assert!(debug.contains("counting"));
        assert_eq!(provider.source_name(), "counting");
    }
}
