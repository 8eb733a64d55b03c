#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use govtalk_client::Transport;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone)]
#[error("mock transport: {0}")]
pub struct MockTransportError(pub String);

/// Replays queued replies and records every request it was handed.
#[derive(Clone, Default)]
pub struct MockTransport {
    replies: Arc<Mutex<VecDeque<Result<String, MockTransportError>>>>,
    requests: Arc<Mutex<Vec<(Url, String)>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, raw: &str) -> &Self {
        self.replies.lock().unwrap().push_back(Ok(raw.to_owned()));
        self
    }

    pub fn fail(&self, reason: &str) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(MockTransportError(reason.to_owned())));
        self
    }

    pub fn requests(&self) -> Vec<(Url, String)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    type Error = MockTransportError;

    async fn exchange(&self, endpoint: &Url, request: &str) -> Result<String, Self::Error> {
        self.requests
            .lock()
            .unwrap()
            .push((endpoint.clone(), request.to_owned()));

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(MockTransportError("no reply queued".to_owned())))
    }
}
