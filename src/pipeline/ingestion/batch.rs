use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, instrument};

use crate::identifier;
use crate::observability::metrics;
use crate::pipeline::ingestion::resolver::ResolutionClient;
use crate::types::{LookupError, RawLookupResult};

/// Runs resolution client calls over a bounded pool of workers.
///
/// Every input produces exactly one result. Results arrive in completion
/// order; callers that need input order must re-key by `query`.
pub struct BatchResolver {
    client: Arc<ResolutionClient>,
    workers: usize,
    delay: Duration,
}

impl BatchResolver {
    pub fn new(client: Arc<ResolutionClient>, workers: usize, delay: Duration) -> Self {
        Self {
            client,
            workers: workers.max(1),
            delay,
        }
    }

    #[instrument(skip_all, fields(queries = queries.len(), workers = self.workers))]
    pub async fn resolve_all(&self, queries: Vec<String>) -> Vec<RawLookupResult> {
        let total = queries.len();
        metrics::resolver::batch_started(total);
        info!("Starting batch resolution");

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, RawLookupResult)>();
        let mut inputs: Vec<(String, String)> = Vec::with_capacity(total);
        let mut handles = Vec::new();

        for (index, query) in queries.into_iter().enumerate() {
            let cnpj = identifier::normalize(&query);
            inputs.push((query.clone(), cnpj.clone()));

            if !identifier::validate(&cnpj) {
                let result = RawLookupResult::failure(query, cnpj, false, LookupError::InvalidFormat);
                let _ = tx.send((index, result));
                continue;
            }

            // Wait for a free slot before spawning so at most `workers` calls run
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!(error = %e, "Worker pool closed");
                    let result = RawLookupResult::failure(query, cnpj, true, LookupError::TaskFailed(e.to_string()));
                    let _ = tx.send((index, result));
                    continue;
                }
            };

            let client = self.client.clone();
            let tx = tx.clone();
            let delay = self.delay;
            handles.push(tokio::spawn(async move {
                let result = client.resolve_normalized(query, cnpj).await;
                let _ = tx.send((index, result));
                // Throttle: the slot stays taken for `delay` after each call
                tokio::time::sleep(delay).await;
                drop(permit);
            }));
        }
        drop(tx);

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Lookup task failed");
            }
        }

        let mut seen = vec![false; total];
        let mut results = Vec::with_capacity(total);
        while let Some((index, result)) = rx.recv().await {
            seen[index] = true;
            results.push(result);
        }

        // Anything without a result (panicked task, closed pool) is still reported
        for (index, (query, cnpj)) in inputs.into_iter().enumerate() {
            if !seen[index] {
                results.push(RawLookupResult::failure(
                    query,
                    cnpj,
                    true,
                    LookupError::TaskFailed("lookup did not complete".to_string()),
                ));
            }
        }

        let found = results.iter().filter(|r| r.is_found()).count();
        info!(found, failed = results.len() - found, "Batch resolution finished");
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ingestion::retry::RetryPolicy;
    use crate::pipeline::ingestion::test_support::{FakeResponse, ScriptedHttp};
    use std::collections::HashMap;

    const URL: &str = "https://registry.test/cnpj/{}";

    fn resolver(http: Arc<ScriptedHttp>, workers: usize) -> BatchResolver {
        let retry = RetryPolicy::default()
            .with_base_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(2));
        let client = Arc::new(ResolutionClient::new(http, URL, Duration::from_secs(1), retry));
        BatchResolver::new(client, workers, Duration::from_millis(1))
    }

    fn counts(results: &[RawLookupResult]) -> HashMap<String, usize> {
        let mut map = HashMap::new();
        for r in results {
            *map.entry(r.query.clone()).or_insert(0) += 1;
        }
        map
    }

    #[tokio::test]
    async fn test_every_input_yields_one_result() {
        let http = Arc::new(
            ScriptedHttp::new(FakeResponse::json(r#"{"nome":"X"}"#))
                .with_latency(Duration::from_millis(5)),
        );
        let queries: Vec<String> = vec![
            "11444777000161",
            "27.865.757/0001-02",
            "11222333000181",
            "33000167000101",
            "19131243000197",
            "00000000000000",
            "",
            "abc",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let results = resolver(http.clone(), 2).resolve_all(queries.clone()).await;

        assert_eq!(results.len(), queries.len());
        let per_query = counts(&results);
        for q in &queries {
            assert_eq!(per_query.get(q), Some(&1), "query {q:?}");
        }
        // Only the five valid identifiers hit the network
        assert_eq!(http.calls(), 5);
        assert_eq!(results.iter().filter(|r| r.is_found()).count(), 5);
    }

    #[tokio::test]
    async fn test_worker_bound_is_respected() {
        let http = Arc::new(
            ScriptedHttp::new(FakeResponse::json("{}")).with_latency(Duration::from_millis(15)),
        );
        let queries: Vec<String> = std::iter::repeat("11444777000161".to_string()).take(12).collect();

        let results = resolver(http.clone(), 3).resolve_all(queries).await;

        assert_eq!(results.len(), 12);
        assert_eq!(http.calls(), 12);
        assert!(http.max_in_flight() <= 3, "max in flight {}", http.max_in_flight());
        assert!(http.max_in_flight() >= 2);
    }

    #[tokio::test]
    async fn test_delay_spaces_calls_within_a_slot() {
        let http = Arc::new(ScriptedHttp::new(FakeResponse::json("{}")));
        let retry = RetryPolicy::default()
            .with_base_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(2));
        let client = Arc::new(ResolutionClient::new(http.clone(), URL, Duration::from_secs(1), retry));
        let batch = BatchResolver::new(client, 1, Duration::from_millis(40));
        let queries = vec![
            "11444777000161".to_string(),
            "27865757000102".to_string(),
            "11222333000181".to_string(),
        ];

        let started = std::time::Instant::now();
        let results = batch.resolve_all(queries).await;
        let elapsed = started.elapsed();

        assert_eq!(results.len(), 3);
        assert_eq!(http.calls(), 3);
        // One slot: each later call waits out the previous call's pause
        assert!(elapsed >= Duration::from_millis(80), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_batch() {
        let ok = URL.replace("{}", "11444777000161");
        let missing = URL.replace("{}", "11222333000181");
        let broken = URL.replace("{}", "33000167000101");
        let http = Arc::new(
            ScriptedHttp::new(FakeResponse::Status(500, String::new()))
                .script(&ok, vec![FakeResponse::json("{}")])
                .script(&missing, vec![FakeResponse::Status(404, String::new())])
                .script(&broken, vec![FakeResponse::json("not json")]),
        );
        let queries = vec![
            "11444777000161".to_string(),
            "11222333000181".to_string(),
            "33000167000101".to_string(),
            "19131243000197".to_string(),
        ];

        let results = resolver(http, 2).resolve_all(queries).await;
        let by_query: HashMap<_, _> = results.iter().map(|r| (r.query.as_str(), r)).collect();

        assert_eq!(results.len(), 4);
        assert!(by_query["11444777000161"].is_found());
        assert_eq!(by_query["11222333000181"].error, Some(LookupError::NotFound));
        assert!(matches!(by_query["33000167000101"].error, Some(LookupError::Json(_))));
        assert!(matches!(
            by_query["19131243000197"].error,
            Some(LookupError::RetriesExhausted { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let http = Arc::new(ScriptedHttp::new(FakeResponse::json("{}")));
        assert!(resolver(http, 4).resolve_all(Vec::new()).await.is_empty());
    }
}
