//! Site registry: resolves a site key to its descriptor.

use std::collections::HashMap;

use docenrich_shared::{AppConfig, EnrichError, Result, SiteDescriptor};

/// Sites known to this run, keyed by lookup key.
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    sites: HashMap<String, SiteDescriptor>,
}

impl SiteRegistry {
    /// Build the registry from the `[[sites]]` config table.
    pub fn from_config(config: &AppConfig) -> Self {
        let sites = config
            .sites
            .iter()
            .map(|entry| (entry.key.clone(), SiteDescriptor::from(entry)))
            .collect();
        Self { sites }
    }

    /// Look up a site by key.
    pub fn resolve_site(&self, key: &str) -> Result<SiteDescriptor> {
        self.sites
            .get(key)
            .cloned()
            .ok_or_else(|| EnrichError::config(format!("unknown site '{key}'")))
    }

    /// Find the site whose host matches the host part of `uri`.
    pub fn site_for_uri(&self, uri: &str) -> Option<&SiteDescriptor> {
        let host = crate::address::uri_host(uri);
        self.sites.values().find(|site| site.host == host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docenrich_shared::SiteEntry;

    fn config() -> AppConfig {
        AppConfig {
            sites: vec![SiteEntry {
                key: "foo".into(),
                slug: "foo-slug".into(),
                name: "Foo".into(),
                host: "foo.com".into(),
            }],
            ..AppConfig::default()
        }
    }

    #[test]
    fn resolves_known_site() {
        let registry = SiteRegistry::from_config(&config());
        let site = registry.resolve_site("foo").unwrap();
        assert_eq!(site.slug, "foo-slug");
        assert_eq!(site.name, "Foo");
    }

    #[test]
    fn unknown_site_is_config_error() {
        let registry = SiteRegistry::from_config(&config());
        let err = registry.resolve_site("bar").unwrap_err();
        assert!(matches!(err, EnrichError::Config { .. }));
    }

    #[test]
    fn finds_site_by_uri_host() {
        let registry = SiteRegistry::from_config(&config());
        assert_eq!(
            registry.site_for_uri("foo.com/pages/1").map(|s| s.slug.as_str()),
            Some("foo-slug")
        );
        assert!(registry.site_for_uri("other.com/pages/1").is_none());
    }
}
