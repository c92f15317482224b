//! Step sequencing: run enrichment steps over one document.
//!
//! Steps run in the order given. Each patch is applied before the next step
//! runs, so later steps see earlier results (URL validation checks the url
//! that publish data just set). The first failing step aborts the document.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use tracing::{debug, info, instrument};

use docenrich_shared::{Document, EnrichError, Patch, Result};

use crate::context::Context;
use crate::steps;
use crate::walker;

/// One enrichment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Handlers,
    PublishData,
    ScheduleTime,
    PublishUrlValidation,
    SiteSlug,
    CustomTransforms,
}

/// Every step, in the order a full enrichment runs them.
///
/// The configured default (`[defaults] steps`) is narrower: it leaves out
/// `handlers` and `custom-transforms`, which need caller-registered plugins.
pub const ALL_STEPS: [Step; 6] = [
    Step::Handlers,
    Step::PublishData,
    Step::ScheduleTime,
    Step::PublishUrlValidation,
    Step::SiteSlug,
    Step::CustomTransforms,
];

impl Step {
    /// Name used in config files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Handlers => "handlers",
            Self::PublishData => "publish-data",
            Self::ScheduleTime => "schedule-time",
            Self::PublishUrlValidation => "validate-publish-url",
            Self::SiteSlug => "site-slug",
            Self::CustomTransforms => "custom-transforms",
        }
    }

    /// Run this step against a document.
    pub async fn run(&self, doc: &Document, ctx: &Context) -> Result<Patch> {
        match self {
            Self::Handlers => walker::apply_handlers(doc, ctx).await,
            Self::PublishData => steps::add_publish_data(doc, ctx).await,
            Self::ScheduleTime => steps::add_schedule_time(doc, ctx).await,
            Self::PublishUrlValidation => steps::validate_publish_url(doc, ctx).await,
            Self::SiteSlug => steps::add_site_slug(doc, ctx).await,
            Self::CustomTransforms => steps::apply_custom_transforms(doc, ctx).await,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Step {
    type Err = EnrichError;

    fn from_str(s: &str) -> Result<Self> {
        ALL_STEPS
            .into_iter()
            .find(|step| step.as_str() == s.trim())
            .ok_or_else(|| EnrichError::config(format!("unknown step '{s}'")))
    }
}

/// Parse a list of step names, keeping their order.
pub fn parse_steps<S: AsRef<str>>(names: &[S]) -> Result<Vec<Step>> {
    names.iter().map(|name| name.as_ref().parse()).collect()
}

/// Enrich a document by running `steps` in order.
#[instrument(skip_all, fields(uri = %doc.uri, steps = steps.len()))]
pub async fn enrich_document(mut doc: Document, ctx: &Context, steps: &[Step]) -> Result<Document> {
    let start = Instant::now();
    info!("starting enrichment");

    for step in steps {
        let patch = step.run(&doc, ctx).await?;
        debug!(%step, keys = patch.len(), "step complete");
        patch.apply_to(&mut doc)?;
    }

    info!(elapsed_ms = start.elapsed().as_millis() as u64, "enrichment complete");
    Ok(doc)
}
