//! Component-handler resolution over a page's content tree.
//!
//! The page JSON is walked in document order. Any object with a string
//! `_ref` naming a component whose type has a registered handler is handed
//! to that handler and not descended into. Everything else is searched for
//! deeper matches.

use std::sync::{Arc, LazyLock};

use futures::future::try_join_all;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, instrument};

use docenrich_fetch::address;
use docenrich_shared::{Document, EnrichError, Patch, Result};

use crate::context::{ComponentHandler, Context};
use crate::merge::merge_all;
use crate::normalize::{HandlerResult, normalize};

/// Field holding a node's component reference.
pub const REF_KEY: &str = "_ref";

/// Nesting limit for content trees.
pub const MAX_WALK_DEPTH: usize = 256;

/// Extract the component type from a reference such as
/// `a.com/components/article/instances/1`.
pub fn component_type(reference: &str) -> Option<&str> {
    static COMPONENT_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"/components/([^/@.]+)").expect("valid regex")
    });

    COMPONENT_RE
        .captures(reference)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// A node claimed by a handler.
struct Matched<'a> {
    reference: &'a str,
    node: &'a Value,
    handler: &'a Arc<dyn ComponentHandler>,
}

/// Collect handler matches in document order.
fn find_matches<'a>(root: &'a Value, ctx: &'a Context) -> Result<Vec<Matched<'a>>> {
    let mut matches = Vec::new();
    let mut stack: Vec<(&Value, usize)> = vec![(root, 0)];

    while let Some((value, depth)) = stack.pop() {
        if depth > MAX_WALK_DEPTH {
            return Err(EnrichError::validation(format!(
                "content tree nested deeper than {MAX_WALK_DEPTH} levels"
            )));
        }

        let children: Vec<&Value> = match value {
            Value::Object(map) => {
                let claimed = map
                    .get(REF_KEY)
                    .and_then(Value::as_str)
                    .and_then(|reference| {
                        let handler = component_type(reference).and_then(|t| ctx.handler(t))?;
                        Some(Matched {
                            reference,
                            node: value,
                            handler,
                        })
                    });

                if let Some(matched) = claimed {
                    matches.push(matched);
                    continue;
                }
                map.values().collect()
            }
            Value::Array(items) => items.iter().collect(),
            _ => continue,
        };

        // Reversed so the stack pops children in document order.
        for child in children.into_iter().rev() {
            if child.is_object() || child.is_array() {
                stack.push((child, depth + 1));
            }
        }
    }

    Ok(matches)
}

/// Run registered component handlers over the document's page JSON.
///
/// Fetch failures and handler failures propagate unchanged.
#[instrument(skip_all, fields(uri = %doc.uri))]
pub async fn apply_handlers(doc: &Document, ctx: &Context) -> Result<Patch> {
    let url = address::page_json_url(&ctx.prefix, &doc.uri);
    let page = ctx.fetcher().fetch_json(&url).await?;

    let matches = find_matches(&page, ctx)?;
    debug!(matched = matches.len(), "component handlers matched");

    let pending = matches
        .iter()
        .map(|m| m.handler.handle(m.reference, m.node, ctx))
        .collect::<Result<Vec<HandlerResult>>>()?;

    let values = try_join_all(pending.into_iter().map(normalize)).await?;
    Ok(merge_all(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeFetcher, context_with};
    use docenrich_shared::SiteDescriptor;
    use serde_json::json;

    const PREFIX: &str = "http://a.com";
    const PAGE_JSON: &str = "http://a.com/pages/b.json";

    fn doc() -> Document {
        Document::new("a.com/pages/b")
    }

    fn simple_page() -> Value {
        json!({
            "content": [{
                "_ref": "a.com/components/cmpt1/instances/1",
                "test": "bar"
            }]
        })
    }

    fn foo_from_test(_: &str, node: &Value, _: &Context) -> Result<HandlerResult> {
        Ok(HandlerResult::value(json!({"foo": node["test"]})))
    }

    #[test]
    fn component_type_parsing() {
        assert_eq!(
            component_type("a.com/components/cmpt1/instances/1"),
            Some("cmpt1")
        );
        assert_eq!(component_type("a.com/components/cmpt1"), Some("cmpt1"));
        assert_eq!(
            component_type("a.com/components/cmpt1/instances/1@published"),
            Some("cmpt1")
        );
        assert_eq!(component_type("a.com/components/cmpt1.json"), Some("cmpt1"));
        assert_eq!(component_type("a.com/pages/1"), None);
    }

    #[tokio::test]
    async fn applies_matching_handler() {
        let (builder, fetcher) = context_with(FakeFetcher::new().json(PAGE_JSON, simple_page()), PREFIX);
        let ctx = builder.handler("cmpt1", foo_from_test).build();

        let patch = apply_handlers(&doc(), &ctx).await.unwrap();
        assert_eq!(patch.get("foo"), Some(&json!("bar")));
        assert_eq!(fetcher.requests(), vec![PAGE_JSON]);
    }

    #[tokio::test]
    async fn exposes_site_to_handlers() {
        let (builder, _) = context_with(FakeFetcher::new().json(PAGE_JSON, simple_page()), PREFIX);
        let ctx = builder
            .site(SiteDescriptor {
                slug: "test".into(),
                name: "testSite".into(),
                host: "a.com".into(),
            })
            .handler("cmpt1", |_, _, ctx| {
                let name = ctx.site.as_ref().map(|s| s.name.clone());
                Ok(HandlerResult::value(json!({"foo": name})))
            })
            .build();

        let patch = apply_handlers(&doc(), &ctx).await.unwrap();
        assert_eq!(patch.get("foo"), Some(&json!("testSite")));
    }

    #[tokio::test]
    async fn exposes_context_to_handlers() {
        let (builder, _) = context_with(FakeFetcher::new().json(PAGE_JSON, simple_page()), PREFIX);
        let ctx = builder
            .handler("cmpt1", |_, _, ctx| {
                Ok(HandlerResult::value(json!({"foo": ctx.prefix})))
            })
            .build();

        let patch = apply_handlers(&doc(), &ctx).await.unwrap();
        assert_eq!(patch.get("foo"), Some(&json!(PREFIX)));
    }

    #[tokio::test]
    async fn passes_reference_to_handlers() {
        let (builder, _) = context_with(FakeFetcher::new().json(PAGE_JSON, simple_page()), PREFIX);
        let ctx = builder
            .handler("cmpt1", |reference, _, _| {
                Ok(HandlerResult::value(json!({"ref": reference})))
            })
            .build();

        let patch = apply_handlers(&doc(), &ctx).await.unwrap();
        assert_eq!(
            patch.get("ref"),
            Some(&json!("a.com/components/cmpt1/instances/1"))
        );
    }

    #[tokio::test]
    async fn detects_deep_components() {
        let page = json!({
            "content": [{
                "_ref": "a.com/components/cmpt2/instances/1",
                "someMoreContent": [{
                    "_ref": "a.com/components/cmpt1/instances/1",
                    "test": "bar"
                }]
            }]
        });
        let (builder, _) = context_with(FakeFetcher::new().json(PAGE_JSON, page), PREFIX);
        let ctx = builder.handler("cmpt1", foo_from_test).build();

        let patch = apply_handlers(&doc(), &ctx).await.unwrap();
        assert_eq!(patch.get("foo"), Some(&json!("bar")));
    }

    #[tokio::test]
    async fn matched_node_suppresses_its_subtree_but_not_siblings() {
        let page = json!({
            "content": [
                {
                    "_ref": "a.com/components/outer/instances/1",
                    "inner": [{"_ref": "a.com/components/inner/instances/1"}]
                },
                {
                    "_ref": "a.com/components/wrapper/instances/1",
                    "inner": [{"_ref": "a.com/components/inner/instances/2"}]
                }
            ]
        });
        let (builder, _) = context_with(FakeFetcher::new().json(PAGE_JSON, page), PREFIX);
        let ctx = builder
            .handler("outer", |_, _, _| Ok(HandlerResult::value(json!({"outer": true}))))
            .handler("inner", |reference, _, _| {
                Ok(HandlerResult::value(json!({"inner": reference})))
            })
            .build();

        let patch = apply_handlers(&doc(), &ctx).await.unwrap();
        assert_eq!(patch.get("outer"), Some(&json!(true)));
        // Only the sibling's inner node ran; the one under `outer` was skipped.
        assert_eq!(
            patch.get("inner"),
            Some(&json!("a.com/components/inner/instances/2"))
        );
    }

    #[tokio::test]
    async fn merges_in_document_order() {
        let page = json!({
            "head": [{"_ref": "a.com/components/tag/instances/1", "v": 1}],
            "content": [
                {"_ref": "a.com/components/tag/instances/2", "v": 2},
                {"_ref": "a.com/components/other/instances/1"}
            ]
        });
        let (builder, _) = context_with(FakeFetcher::new().json(PAGE_JSON, page), PREFIX);
        let ctx = builder
            .handler("tag", |_, node, _| {
                let patch = Patch::new()
                    .with("last", node["v"].clone())
                    .with(format!("tag{}", node["v"]), true);
                Ok(HandlerResult::from(patch))
            })
            .handler("other", |_, _, _| Ok(HandlerResult::value(json!({"other": 1}))))
            .build();

        let patch = apply_handlers(&doc(), &ctx).await.unwrap();
        let keys: Vec<&String> = patch.keys().collect();
        assert_eq!(keys, vec!["last", "tag1", "tag2", "other"]);
        assert_eq!(patch.get("last"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn recognizes_deferred_handlers() {
        let (builder, _) = context_with(FakeFetcher::new().json(PAGE_JSON, simple_page()), PREFIX);
        let ctx = builder
            .handler("cmpt1", |_, node, _| {
                let test = node["test"].clone();
                Ok(HandlerResult::deferred(async move { Ok(json!({"foo": test})) }))
            })
            .build();

        let patch = apply_handlers(&doc(), &ctx).await.unwrap();
        assert_eq!(patch.get("foo"), Some(&json!("bar")));
    }

    #[tokio::test]
    async fn recognizes_sequence_handlers() {
        let (builder, _) = context_with(FakeFetcher::new().json(PAGE_JSON, simple_page()), PREFIX);
        let ctx = builder
            .handler("cmpt1", |_, node, _| {
                Ok(HandlerResult::sequence_of(vec![json!({"foo": node["test"]})]))
            })
            .build();

        let patch = apply_handlers(&doc(), &ctx).await.unwrap();
        assert_eq!(patch.get("foo"), Some(&json!("bar")));
    }

    #[tokio::test]
    async fn recognizes_falsy_handlers() {
        let (builder, _) = context_with(FakeFetcher::new().json(PAGE_JSON, simple_page()), PREFIX);
        let ctx = builder
            .handler("cmpt1", |_, _, _| Ok(HandlerResult::empty()))
            .build();

        let patch = apply_handlers(&doc(), &ctx).await.unwrap();
        assert!(patch.is_empty());
    }

    #[tokio::test]
    async fn no_handlers_yields_empty_patch() {
        let (builder, _) = context_with(FakeFetcher::new().json(PAGE_JSON, simple_page()), PREFIX);
        let patch = apply_handlers(&doc(), &builder.build()).await.unwrap();
        assert!(patch.is_empty());
    }

    #[tokio::test]
    async fn handler_error_propagates() {
        let (builder, _) = context_with(FakeFetcher::new().json(PAGE_JSON, simple_page()), PREFIX);
        let ctx = builder
            .handler("cmpt1", |_, _, _| Err(EnrichError::handler("cmpt1 exploded")))
            .build();

        let err = apply_handlers(&doc(), &ctx).await.unwrap_err();
        assert!(matches!(err, EnrichError::Handler { .. }));
    }

    #[tokio::test]
    async fn deferred_rejection_propagates() {
        let (builder, _) = context_with(FakeFetcher::new().json(PAGE_JSON, simple_page()), PREFIX);
        let ctx = builder
            .handler("cmpt1", |_, _, _| {
                Ok(HandlerResult::deferred(async {
                    Err(EnrichError::handler("rejected"))
                }))
            })
            .build();

        let err = apply_handlers(&doc(), &ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "handler error: rejected");
    }

    #[tokio::test]
    async fn page_fetch_failure_propagates_even_when_not_found() {
        let (builder, _) = context_with(FakeFetcher::new().not_found(PAGE_JSON), PREFIX);
        let ctx = builder.handler("cmpt1", foo_from_test).build();

        let err = apply_handlers(&doc(), &ctx).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn runaway_nesting_is_rejected() {
        let mut tree = json!({"_ref": "a.com/components/leaf/instances/1"});
        for _ in 0..(MAX_WALK_DEPTH + 5) {
            tree = json!([tree]);
        }
        let (builder, _) = context_with(FakeFetcher::new(), PREFIX);
        let ctx = builder
            .handler("leaf", |_, _, _| Ok(HandlerResult::empty()))
            .build();

        let err = find_matches(&tree, &ctx).err().unwrap();
        assert!(matches!(err, EnrichError::Validation { .. }));
    }
}
