use backoff::backoff::Backoff;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use crate::app::ports::HttpClientPort;
use crate::identifier;
use crate::observability::metrics;
use crate::pipeline::ingestion::retry::RetryPolicy;
use crate::types::{LookupError, RawLookupResult, RawPayload};

/// Outcome of a single HTTP attempt, before the retry decision
enum Attempt {
    Done(Result<RawPayload, LookupError>),
    Transient(LookupError),
}

/// Issues one logical lookup per identifier against the registry.
///
/// The HTTP port is shared read-only by every worker; retry state lives on
/// the stack of each call.
pub struct ResolutionClient {
    http: Arc<dyn HttpClientPort>,
    url_template: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl ResolutionClient {
    pub fn new(
        http: Arc<dyn HttpClientPort>,
        url_template: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http,
            url_template: url_template.into(),
            timeout,
            retry,
        }
    }

    pub fn url_for(&self, identifier: &str) -> String {
        self.url_template.replace("{}", identifier)
    }

    /// Normalize, validate and look up one raw query.
    pub async fn resolve(&self, query: String) -> RawLookupResult {
        let cnpj = identifier::normalize(&query);
        if !identifier::validate(&cnpj) {
            return RawLookupResult::failure(query, cnpj, false, LookupError::InvalidFormat);
        }
        self.resolve_normalized(query, cnpj).await
    }

    /// Look up an identifier the caller already normalized.
    pub async fn resolve_normalized(&self, query: String, cnpj: String) -> RawLookupResult {
        match self.lookup(&cnpj).await {
            Ok(payload) => RawLookupResult::success(query, cnpj, payload),
            Err(err) => {
                let format_valid = err != LookupError::InvalidFormat;
                RawLookupResult::failure(query, cnpj, format_valid, err)
            }
        }
    }

    /// Fetch the payload for a normalized identifier, retrying transient
    /// failures under the retry policy. Invalid identifiers never reach the network.
    #[instrument(skip(self), fields(cnpj = %cnpj))]
    pub async fn lookup(&self, cnpj: &str) -> Result<RawPayload, LookupError> {
        if !identifier::validate(cnpj) {
            return Err(LookupError::InvalidFormat);
        }

        let url = self.url_for(cnpj);
        let started = Instant::now();
        let mut backoff = self.retry.backoff();
        let mut attempt = 0;

        let result = loop {
            attempt += 1;
            match self.attempt(&url).await {
                Attempt::Done(result) => break result,
                Attempt::Transient(err) => {
                    if attempt >= self.retry.max_attempts {
                        let formatted = identifier::format(cnpj);
                        warn!(
                            attempt,
                            cnpj = formatted.as_deref().unwrap_or(cnpj),
                            error = %err,
                            "Retry budget exhausted"
                        );
                        break Err(LookupError::RetriesExhausted {
                            attempts: attempt,
                            last: err.to_string(),
                        });
                    }
                    let wait = backoff.next_backoff().unwrap_or(self.retry.max_delay);
                    warn!(
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "Transient registry failure, retrying after backoff"
                    );
                    metrics::resolver::lookup_retried(&err.kind());
                    tokio::time::sleep(wait).await;
                }
            }
        };

        let outcome = match &result {
            Ok(_) => "ok".to_string(),
            Err(err) => err.kind(),
        };
        debug!(attempts = attempt, outcome = %outcome, "Lookup finished");
        metrics::resolver::lookup_completed(&outcome, started.elapsed());
        result
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let response = match tokio::time::timeout(self.timeout, self.http.get(url)).await {
            Ok(Ok(response)) => response,
            Ok(Err(message)) => return self.transport_failure(message),
            Err(_) => {
                return self.transport_failure(format!("timed out after {}ms", self.timeout.as_millis()))
            }
        };

        match response.status {
            200 => Attempt::Done(
                serde_json::from_slice::<RawPayload>(&response.bytes)
                    .map_err(|e| LookupError::Json(e.to_string())),
            ),
            404 => Attempt::Done(Err(LookupError::NotFound)),
            status if self.retry.is_retryable_status(status) => {
                Attempt::Transient(LookupError::Http(status))
            }
            status => Attempt::Done(Err(LookupError::Http(status))),
        }
    }

    fn transport_failure(&self, message: String) -> Attempt {
        let err = LookupError::Transport(message);
        if self.retry.retry_transport_errors {
            Attempt::Transient(err)
        } else {
            Attempt::Done(Err(err))
        }
    }
}
