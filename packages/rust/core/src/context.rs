//! Per-run configuration threaded through every step.
//!
//! A [`Context`] is immutable once built and cheap to clone, so handlers
//! that return deferred work can move a copy into their future.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use docenrich_fetch::Fetcher;
use docenrich_shared::{Document, Result, SiteDescriptor};

use crate::normalize::HandlerResult;

// ---------------------------------------------------------------------------
// Plugin traits
// ---------------------------------------------------------------------------

/// Produces enrichment data for one component type.
pub trait ComponentHandler: Send + Sync {
    /// Called with the node's reference string, the node itself, and the run context.
    fn handle(&self, reference: &str, node: &Value, ctx: &Context) -> Result<HandlerResult>;
}

impl<F> ComponentHandler for F
where
    F: Fn(&str, &Value, &Context) -> Result<HandlerResult> + Send + Sync,
{
    fn handle(&self, reference: &str, node: &Value, ctx: &Context) -> Result<HandlerResult> {
        self(reference, node, ctx)
    }
}

/// Produces arbitrary enrichment data for a whole document.
pub trait Transform: Send + Sync {
    fn apply(&self, doc: &Document, ctx: &Context) -> Result<HandlerResult>;
}

impl<F> Transform for F
where
    F: Fn(&Document, &Context) -> Result<HandlerResult> + Send + Sync,
{
    fn apply(&self, doc: &Document, ctx: &Context) -> Result<HandlerResult> {
        self(doc, ctx)
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Immutable configuration bag for one enrichment run.
#[derive(Clone)]
pub struct Context {
    /// Base address for same-site fetches.
    pub prefix: String,
    /// The site the document belongs to.
    pub site: Option<SiteDescriptor>,
    handlers: Arc<HashMap<String, Arc<dyn ComponentHandler>>>,
    transforms: Option<Arc<IndexMap<String, Arc<dyn Transform>>>>,
    fetcher: Arc<dyn Fetcher>,
}

impl Context {
    pub fn builder(fetcher: Arc<dyn Fetcher>) -> ContextBuilder {
        ContextBuilder {
            prefix: String::new(),
            site: None,
            handlers: HashMap::new(),
            transforms: None,
            fetcher,
        }
    }

    pub fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    /// Handler registered for a component type, if any.
    pub fn handler(&self, component_type: &str) -> Option<&Arc<dyn ComponentHandler>> {
        self.handlers.get(component_type)
    }

    /// Registered transforms in registration order, or `None` if none were configured.
    pub fn transforms(&self) -> Option<impl Iterator<Item = (&str, &Arc<dyn Transform>)>> {
        self.transforms
            .as_ref()
            .map(|map| map.iter().map(|(name, t)| (name.as_str(), t)))
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handlers: Vec<&String> = self.handlers.keys().collect();
        handlers.sort();
        f.debug_struct("Context")
            .field("prefix", &self.prefix)
            .field("site", &self.site)
            .field("handlers", &handlers)
            .field(
                "transforms",
                &self
                    .transforms
                    .as_ref()
                    .map(|map| map.keys().collect::<Vec<_>>()),
            )
            .finish_non_exhaustive()
    }
}

/// Builder for [`Context`].
pub struct ContextBuilder {
    prefix: String,
    site: Option<SiteDescriptor>,
    handlers: HashMap<String, Arc<dyn ComponentHandler>>,
    transforms: Option<IndexMap<String, Arc<dyn Transform>>>,
    fetcher: Arc<dyn Fetcher>,
}

impl ContextBuilder {
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn site(mut self, site: SiteDescriptor) -> Self {
        self.site = Some(site);
        self
    }

    /// Register a handler closure for a component type.
    pub fn handler<F>(self, component_type: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&str, &Value, &Context) -> Result<HandlerResult> + Send + Sync + 'static,
    {
        self.handler_arc(component_type, Arc::new(handler))
    }

    pub fn handler_arc(
        mut self,
        component_type: impl Into<String>,
        handler: Arc<dyn ComponentHandler>,
    ) -> Self {
        self.handlers.insert(component_type.into(), handler);
        self
    }

    /// Register a transform closure. Later registrations win on key collisions.
    pub fn transform<F>(self, name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&Document, &Context) -> Result<HandlerResult> + Send + Sync + 'static,
    {
        self.transform_arc(name, Arc::new(transform))
    }

    pub fn transform_arc(mut self, name: impl Into<String>, transform: Arc<dyn Transform>) -> Self {
        self.transforms
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), transform);
        self
    }

    pub fn build(self) -> Context {
        Context {
            prefix: self.prefix,
            site: self.site,
            handlers: Arc::new(self.handlers),
            transforms: self.transforms.map(Arc::new),
            fetcher: self.fetcher,
        }
    }
}
