use crate::transport::{Endpoint, HttpClient, RawResponse};
use async_trait::async_trait;
use fiesta_core::Result;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays canned responses and records what was sent.
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<RawResponse>>>,
    fallback: Option<Result<RawResponse>>,
    sent: Mutex<Vec<(String, Vec<(String, String)>, Value)>>,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<RawResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn always(response: Result<RawResponse>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(response),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last_body(&self) -> Value {
        self.sent.lock().unwrap().last().unwrap().2.clone()
    }

    pub fn last_url(&self) -> String {
        self.sent.lock().unwrap().last().unwrap().0.clone()
    }

    pub fn last_headers(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().last().unwrap().1.clone()
    }
}

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn post_json(&self, endpoint: &Endpoint, body: &Value) -> Result<RawResponse> {
        self.sent.lock().unwrap().push((
            endpoint.url().to_string(),
            endpoint.headers().to_vec(),
            body.clone(),
        ));
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(response) => response,
            None => self
                .fallback
                .clone()
                .expect("ScriptedClient ran out of responses"),
        }
    }
}
