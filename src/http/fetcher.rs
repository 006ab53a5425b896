//! Fetch-with-retry engine in front of the response store

use crate::cache::ResponseStore;
use crate::config::SnowcastConfig;
use crate::http::{ExpiryRules, RateLimiter, UrlModifiers};
use crate::{Result, SnowcastError};
use rand::RngExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Caller predicate over a parsed body; `false` rejects it.
pub type Validator<'a> = dyn Fn(&Value) -> bool + Send + Sync + 'a;

/// Bounded retry budget with a uniformly random pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            min_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            min_delay,
            max_delay,
        }
    }

    /// Retries without pausing.
    #[must_use]
    pub fn immediate(max_retries: u32) -> Self {
        Self::new(max_retries, Duration::ZERO, Duration::ZERO)
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Next pause, drawn uniformly from `[min_delay, max_delay]`.
    #[must_use]
    pub fn delay(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        let low = u64::try_from(self.min_delay.as_millis()).unwrap_or(u64::MAX);
        let high = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::rng().random_range(low..=high))
    }
}

/// A single `get_json` call.
pub struct FetchRequest<'a> {
    pub url: &'a str,
    /// Skip the store lookup and go to the network.
    pub forced_refresh: bool,
    pub headers: Vec<(String, String)>,
    pub validator: Option<&'a Validator<'a>>,
}

impl<'a> FetchRequest<'a> {
    #[must_use]
    pub fn new(url: &'a str) -> Self {
        Self {
            url,
            forced_refresh: false,
            headers: Vec::new(),
            validator: None,
        }
    }

    #[must_use]
    pub fn forced_refresh(mut self, forced_refresh: bool) -> Self {
        self.forced_refresh = forced_refresh;
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: Option<&'a Validator<'a>>) -> Self {
        self.validator = validator;
        self
    }
}

/// Issues GET requests, serving fresh bodies from the store when an expiry rule allows it.
///
/// Without a store nothing is persisted and every call goes to the network.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    store: Option<Arc<ResponseStore>>,
    rules: ExpiryRules,
    modifiers: UrlModifiers,
    limiter: Option<RateLimiter>,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl Fetcher {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            store: None,
            rules: ExpiryRules::default(),
            modifiers: UrlModifiers::default(),
            limiter: None,
            retry: RetryPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Builds a fetcher from the `http` and `cache` configuration sections.
    pub fn from_config(config: &SnowcastConfig, store: Option<Arc<ResponseStore>>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(u64::from(config.http.timeout_seconds)))
            .user_agent(config.http.user_agent.clone())
            .build()
            .map_err(|e| SnowcastError::config(format!("Failed to build HTTP client: {e}")))?;

        let rules = config
            .expiry_rules()
            .map_err(|e| SnowcastError::config(e.to_string()))?;
        let modifiers = config
            .url_modifiers()
            .map_err(|e| SnowcastError::config(e.to_string()))?;
        let retry = RetryPolicy::new(
            config.http.max_retries,
            Duration::from_secs(u64::from(config.http.retry_delay_min_seconds)),
            Duration::from_secs(u64::from(config.http.retry_delay_max_seconds)),
        );

        let mut fetcher = Self::new(client)
            .with_rules(rules)
            .with_modifiers(modifiers)
            .with_retry(retry);
        if let Some(store) = store {
            fetcher = fetcher.with_store(store);
        }
        if let Some(limiter) = RateLimiter::per_minute(config.http.requests_per_minute) {
            fetcher = fetcher.with_limiter(limiter);
        }
        Ok(fetcher)
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<ResponseStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_rules(mut self, rules: ExpiryRules) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub fn with_modifiers(mut self, modifiers: UrlModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    #[must_use]
    pub fn with_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that interrupts retry sleeps and stops new attempts.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Fetches `url` as JSON, serving from the store when a rule allows it.
    pub async fn fetch(&self, url: &str, validator: Option<&Validator<'_>>) -> Result<Value> {
        self.execute(&FetchRequest::new(url).validator(validator))
            .await
    }

    pub async fn get_json(
        &self,
        url: &str,
        forced_refresh: bool,
        validator: Option<&Validator<'_>>,
    ) -> Result<Value> {
        self.execute(
            &FetchRequest::new(url)
                .forced_refresh(forced_refresh)
                .validator(validator),
        )
        .await
    }

    #[tracing::instrument(name = "fetch", skip(self, request), fields(url = request.url))]
    pub async fn execute(&self, request: &FetchRequest<'_>) -> Result<Value> {
        if !request.forced_refresh
            && let Some(value) = self.cached(request.url).await
        {
            return Ok(value);
        }

        let attempts = self.retry.attempts();
        let mut attempt = 1;
        loop {
            if self.cancel.is_cancelled() {
                return Err(SnowcastError::Cancelled);
            }

            match self.attempt(request).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    let delay = self.retry.delay();
                    warn!(
                        attempt,
                        attempts,
                        error = %err,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Fetch failed, retrying"
                    );
                    tokio::select! {
                        () = self.cancel.cancelled() => return Err(SnowcastError::Cancelled),
                        () = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_retryable() {
                        warn!(attempts, error = %err, "Retry budget exhausted");
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Fresh stored body for `url`; store failures count as a miss.
    async fn cached(&self, url: &str) -> Option<Value> {
        let store = self.store.as_ref()?;
        let ttl = self.rules.ttl_for(url)?;

        let body = match store.lookup(url, ttl).await {
            Ok(body) => body?,
            Err(e) => {
                warn!("Response store lookup failed: {e}");
                return None;
            }
        };

        match serde_json::from_slice(&body) {
            Ok(value) => {
                debug!("Serving response from store");
                Some(value)
            }
            Err(e) => {
                warn!("Stored response is not valid JSON, refetching: {e}");
                None
            }
        }
    }

    async fn attempt(&self, request: &FetchRequest<'_>) -> Result<Value> {
        let target = self.modifiers.apply(request.url);

        if let Some(limiter) = &self.limiter {
            tokio::select! {
                () = self.cancel.cancelled() => return Err(SnowcastError::Cancelled),
                () = limiter.wait() => {}
            }
        }

        let mut builder = self.client.get(&target);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SnowcastError::network(&target, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SnowcastError::http(&target, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SnowcastError::network(&target, e.to_string()))?;
        info!(bytes = body.len(), "Fetched {target}");

        // Stored under the caller's URL so lookups ignore mirrors.
        if let Some(store) = &self.store
            && let Err(e) = store.append(request.url, &body).await
        {
            warn!("Failed to persist response: {e}");
        }

        let value: Value = serde_json::from_slice(&body)
            .map_err(|e| SnowcastError::parse(format!("Invalid JSON from {target}: {e}")))?;

        if let Some(validator) = request.validator
            && !validator(&value)
        {
            return Err(SnowcastError::validation(&target));
        }

        Ok(value)
    }
}
