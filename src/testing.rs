// src/testing.rs
// In-memory archive used by unit tests.

use crate::edgar::client::Fetch;
use crate::utils::error::EdgarError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub enum FakeResponse {
    Body(Vec<u8>),
    NotFound,
    Transient,
}

impl FakeResponse {
    pub fn body(text: &str) -> Self {
        FakeResponse::Body(text.as_bytes().to_vec())
    }
}

/// Serves canned responses per URL and counts every request.
/// Unknown URLs answer 404. The last response of a sequence repeats.
#[derive(Default)]
pub struct FakeArchive {
    responses: Mutex<HashMap<String, VecDeque<FakeResponse>>>,
    calls: Mutex<HashMap<String, usize>>,
    order: Mutex<Vec<String>>,
}

impl FakeArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sequence(self, url: &str, responses: Vec<FakeResponse>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), responses.into());
        self
    }

    pub fn with_response(self, url: &str, response: FakeResponse) -> Self {
        self.with_sequence(url, vec![response])
    }

    pub fn with_body(self, url: &str, body: &str) -> Self {
        self.with_response(url, FakeResponse::body(body))
    }

    pub fn with_json(self, url: &str, value: serde_json::Value) -> Self {
        self.with_body(url, &value.to_string())
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// URLs in the order they were requested.
    pub fn requested(&self) -> Vec<String> {
        self.order.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetch for FakeArchive {
    async fn get(&self, url: &str) -> Result<Vec<u8>, EdgarError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        self.order.lock().unwrap().push(url.to_string());

        let response = {
            let mut responses = self.responses.lock().unwrap();
            match responses.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match response {
            Some(FakeResponse::Body(bytes)) => Ok(bytes),
            Some(FakeResponse::Transient) => {
                Err(EdgarError::Transient(format!("HTTP 503 for {}", url)))
            }
            Some(FakeResponse::NotFound) | None => Err(EdgarError::NotFound(url.to_string())),
        }
    }
}
