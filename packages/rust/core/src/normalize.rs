//! Normalization of handler and transform return values.
//!
//! Handlers may answer with a plain value, a deferred value, or a lazy
//! sequence. [`normalize`] is the only place that tells them apart.

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use futures::stream::{BoxStream, Stream};
use futures::{FutureExt, StreamExt};
use serde_json::{Map, Value};

use docenrich_shared::{Patch, Result};

/// What a component handler or custom transform hands back.
pub enum HandlerResult {
    /// Already computed.
    Value(Value),
    /// Still in flight.
    Deferred(BoxFuture<'static, Result<Value>>),
    /// Lazy sequence; only the first item is used.
    Sequence(BoxStream<'static, Result<Value>>),
}

impl HandlerResult {
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    /// A result that contributes nothing.
    pub fn empty() -> Self {
        Self::Value(Value::Null)
    }

    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value>> + Send + 'static,
    {
        Self::Deferred(future.boxed())
    }

    pub fn sequence<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Value>> + Send + 'static,
    {
        Self::Sequence(stream.boxed())
    }

    /// Sequence over already-known items.
    pub fn sequence_of(items: Vec<Value>) -> Self {
        Self::sequence(futures::stream::iter(items.into_iter().map(Ok)))
    }
}

impl fmt::Debug for HandlerResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
            Self::Sequence(_) => f.write_str("Sequence(..)"),
        }
    }
}

impl From<Value> for HandlerResult {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Option<Value>> for HandlerResult {
    fn from(value: Option<Value>) -> Self {
        Self::Value(value.unwrap_or(Value::Null))
    }
}

impl From<Patch> for HandlerResult {
    fn from(patch: Patch) -> Self {
        Self::Value(patch.into())
    }
}

/// JavaScript-style falsiness for JSON values.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Resolve a [`HandlerResult`] to exactly one value.
///
/// Falsy results, and sequences that end without an item, become `{}`.
/// Errors from deferred values and sequences propagate unchanged.
pub async fn normalize(result: HandlerResult) -> Result<Value> {
    let resolved = match result {
        HandlerResult::Value(value) => value,
        HandlerResult::Deferred(future) => future.await?,
        HandlerResult::Sequence(mut stream) => match stream.next().await {
            Some(item) => item?,
            None => Value::Null,
        },
    };

    if is_falsy(&resolved) {
        Ok(Value::Object(Map::new()))
    } else {
        Ok(resolved)
    }
}
