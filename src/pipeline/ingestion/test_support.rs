//! Scripted HTTP port for resolver tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::app::ports::{HttpClientPort, HttpGetResult};

#[derive(Clone, Debug)]
pub enum FakeResponse {
    Status(u16, String),
    Transport(String),
}

impl FakeResponse {
    pub fn json(body: &str) -> Self {
        FakeResponse::Status(200, body.to_string())
    }
}

/// Answers per URL from a queue; once a queue is drained the last answer repeats.
pub struct ScriptedHttp {
    scripts: Mutex<HashMap<String, VecDeque<FakeResponse>>>,
    fallback: FakeResponse,
    latency: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedHttp {
    pub fn new(fallback: FakeResponse) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn script(self, url: &str, responses: Vec<FakeResponse>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), responses.into_iter().collect());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self, url: &str) -> FakeResponse {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| self.fallback.clone()),
            None => self.fallback.clone(),
        }
    }
}

#[async_trait]
impl HttpClientPort for ScriptedHttp {
    async fn get(&self, url: &str) -> Result<HttpGetResult, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let response = self.next_response(url);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match response {
            FakeResponse::Status(status, body) => Ok(HttpGetResult {
                status,
                bytes: body.into_bytes(),
                content_type: "application/json".to_string(),
            }),
            FakeResponse::Transport(message) => Err(message),
        }
    }
}
