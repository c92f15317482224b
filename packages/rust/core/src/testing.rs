//! In-memory [`Fetcher`] for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use docenrich_fetch::Fetcher;
use docenrich_shared::{EnrichError, Result};

use crate::context::{Context, ContextBuilder};

enum Canned {
    Json(Value),
    Text(String),
    NotFound,
    Fail(String),
}

/// Serves canned responses by exact address and records every request.
#[derive(Default)]
pub(crate) struct FakeFetcher {
    responses: HashMap<String, Canned>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn json(mut self, url: &str, value: Value) -> Self {
        self.responses.insert(url.into(), Canned::Json(value));
        self
    }

    pub(crate) fn text(mut self, url: &str, body: &str) -> Self {
        self.responses.insert(url.into(), Canned::Text(body.into()));
        self
    }

    pub(crate) fn not_found(mut self, url: &str) -> Self {
        self.responses.insert(url.into(), Canned::NotFound);
        self
    }

    pub(crate) fn fail(mut self, url: &str, message: &str) -> Self {
        self.responses.insert(url.into(), Canned::Fail(message.into()));
        self
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn respond(&self, url: &str) -> Result<&Canned> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.responses.get(url) {
            Some(Canned::NotFound) => Err(EnrichError::not_found(url)),
            Some(Canned::Fail(message)) => Err(EnrichError::fetch(url, message.clone())),
            Some(canned) => Ok(canned),
            None => Err(EnrichError::fetch(url, "unexpected request")),
        }
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        match self.respond(url)? {
            Canned::Json(value) => Ok(value.clone()),
            _ => Err(EnrichError::fetch(url, "canned response is not JSON")),
        }
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        match self.respond(url)? {
            Canned::Text(body) => Ok(body.clone()),
            _ => Err(EnrichError::fetch(url, "canned response is not text")),
        }
    }
}

/// Context builder over a shared fake, keeping a handle for request assertions.
pub(crate) fn context_with(fetcher: FakeFetcher, prefix: &str) -> (ContextBuilder, Arc<FakeFetcher>) {
    let fetcher = Arc::new(fetcher);
    let builder = Context::builder(fetcher.clone()).prefix(prefix);
    (builder, fetcher)
}
