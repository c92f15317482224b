//! Document enrichment engine for docenrich.
//!
//! A document is enriched by steps of the shape `(document, context) -> Patch`:
//! - [`walker::apply_handlers`] runs caller-supplied component handlers over the page's content tree
//! - [`steps`] holds the publish-data, schedule, url-validation, site-slug and custom-transform steps
//! - [`normalize`] and [`merge`] turn handler results into one patch
//! - [`pipeline`] runs a list of steps and applies their patches

pub mod context;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod steps;
pub mod walker;

#[cfg(test)]
mod testing;

pub use context::{ComponentHandler, Context, ContextBuilder, Transform};
pub use merge::merge_all;
pub use normalize::{HandlerResult, normalize};
pub use pipeline::{ALL_STEPS, Step, enrich_document, parse_steps};
pub use steps::{
    add_publish_data, add_schedule_time, add_site_slug, apply_custom_transforms,
    validate_publish_url,
};
pub use walker::{apply_handlers, component_type};
