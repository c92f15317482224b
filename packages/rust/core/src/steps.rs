//! Enrichment steps.
//!
//! Each step takes `(document, context)`, fetches what it needs through the
//! context's [`Fetcher`](docenrich_fetch::Fetcher) and returns a [`Patch`].
//! Where a step defines a fallback for a missing resource it matches on
//! [`EnrichError::is_not_found`]; every other failure propagates unchanged.

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use docenrich_fetch::address;
use docenrich_shared::{Document, EnrichError, Patch, Result, ScheduleEntry, format_instant};

use crate::context::Context;
use crate::merge::merge_all;
use crate::normalize::{HandlerResult, normalize};

// ---------------------------------------------------------------------------
// PublishData
// ---------------------------------------------------------------------------

/// Add `url`, `published` and `publishTime` from the published variant.
///
/// A missing published variant yields `{published: false}` with no `url`.
#[instrument(skip_all, fields(uri = %doc.uri))]
pub async fn add_publish_data(doc: &Document, ctx: &Context) -> Result<Patch> {
    let url = address::published_url(&ctx.prefix, &doc.uri);

    match ctx.fetcher().fetch_json(&url).await {
        Ok(published) => Ok(publish_patch(&published)),
        Err(e) if e.is_not_found() => {
            debug!(%url, "no published variant");
            Ok(Patch::new().with("published", false))
        }
        Err(e) => Err(e),
    }
}

fn publish_patch(published: &Value) -> Patch {
    let url = match published.get("url") {
        Some(Value::String(url)) => Value::String(url.clone()),
        Some(other) => {
            warn!(url = %other, "published variant url is not a string");
            Value::Null
        }
        None => Value::Null,
    };
    let mut patch = Patch::new().with("url", url).with("published", true);

    match published.get("lastModified").and_then(parse_instant) {
        Some(instant) => patch.insert("publishTime", format_instant(&instant)),
        None => warn!("published variant has no usable lastModified"),
    }

    patch
}

/// Epoch milliseconds, or an RFC 3339 string.
fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// ScheduleTime
// ---------------------------------------------------------------------------

/// Add `scheduled` and `scheduledTime` from the site-wide schedule.
///
/// The schedule must exist: any fetch failure, including not-found, fails the step.
#[instrument(skip_all, fields(uri = %doc.uri))]
pub async fn add_schedule_time(doc: &Document, ctx: &Context) -> Result<Patch> {
    let url = address::schedule_url(&ctx.prefix);
    let schedule = ctx.fetcher().fetch_json(&url).await?;

    let Value::Array(entries) = schedule else {
        return Err(EnrichError::fetch(&url, "schedule is not a list"));
    };

    let publish = address::publish_address(&ctx.prefix, &doc.uri)?;
    let entry = entries
        .into_iter()
        .filter_map(|raw| serde_json::from_value::<ScheduleEntry>(raw).ok())
        .find(|entry| entry.publish == publish);

    match entry {
        Some(entry) => Ok(Patch::new()
            .with("scheduled", true)
            .with("scheduledTime", entry.at)),
        None => Ok(Patch::new().with("scheduled", false)),
    }
}

// ---------------------------------------------------------------------------
// PublishUrlValidation
// ---------------------------------------------------------------------------

/// Check that the document's `url` still maps back to its `uri`.
///
/// Returns `{}` when it does (or when there is no url), and `{url: null}`
/// when the mapping points elsewhere or does not exist.
#[instrument(skip_all, fields(uri = %doc.uri))]
pub async fn validate_publish_url(doc: &Document, ctx: &Context) -> Result<Patch> {
    let Some(public_url) = doc.url.as_deref() else {
        return Ok(Patch::new());
    };

    let lookup = address::uri_lookup_url(&ctx.prefix, public_url);
    match ctx.fetcher().fetch_text(&lookup).await {
        Ok(canonical) if canonical.trim() == doc.uri => Ok(Patch::new()),
        Ok(canonical) => {
            debug!(%public_url, canonical = canonical.trim(), "url points at another page");
            Ok(stale_url())
        }
        Err(e) if e.is_not_found() => {
            debug!(%public_url, "url has no canonical mapping");
            Ok(stale_url())
        }
        Err(e) => Err(e),
    }
}

fn stale_url() -> Patch {
    Patch::new().with("url", Value::Null)
}

// ---------------------------------------------------------------------------
// SiteSlug
// ---------------------------------------------------------------------------

/// Add `siteSlug` from the context's site.
pub async fn add_site_slug(_doc: &Document, ctx: &Context) -> Result<Patch> {
    let site = ctx
        .site
        .as_ref()
        .ok_or_else(|| EnrichError::config("missing site in context"))?;
    Ok(Patch::new().with("siteSlug", site.slug.clone()))
}

// ---------------------------------------------------------------------------
// CustomTransforms
// ---------------------------------------------------------------------------

/// Run every configured transform and merge their results in registration order.
#[instrument(skip_all, fields(uri = %doc.uri))]
pub async fn apply_custom_transforms(doc: &Document, ctx: &Context) -> Result<Patch> {
    let Some(transforms) = ctx.transforms() else {
        return Ok(Patch::new());
    };

    let pending = transforms
        .map(|(name, transform)| {
            debug!(transform = name, "applying transform");
            transform.apply(doc, ctx)
        })
        .collect::<Result<Vec<HandlerResult>>>()?;

    let values = try_join_all(pending.into_iter().map(normalize)).await?;
    Ok(merge_all(values))
}
