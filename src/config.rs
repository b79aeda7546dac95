//! Client configuration, optionally populated from environment variables.

/// Default page size for paginated queries.
pub const DEFAULT_PER_PAGE: u32 = 25;

/// Runtime configuration for a [`PotionClient`](crate::client::PotionClient).
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `POTION_PREFIX` | `""` | API-wide path prefix, e.g. `/api` |
/// | `POTION_PER_PAGE` | `25` | Page size used when a query paginates without one |
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Prepended to every request URI and stripped from every decoded one.
    pub prefix: String,

    pub default_per_page: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            default_per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl ClientConfig {
    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            prefix: lookup("POTION_PREFIX")
                .map(|p| p.trim_end_matches('/').to_string())
                .unwrap_or(defaults.prefix),
            default_per_page: lookup("POTION_PER_PAGE")
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.default_per_page),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_default_per_page(mut self, per_page: u32) -> Self {
        self.default_per_page = per_page.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.default_per_page, 25);
    }

    #[test]
    fn test_lookup_values() {
        let env = HashMap::from([
            ("POTION_PREFIX", "/api/"),
            ("POTION_PER_PAGE", "50"),
        ]);
        let config = ClientConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.prefix, "/api");
        assert_eq!(config.default_per_page, 50);
    }

    #[test]
    fn test_bad_per_page_falls_back() {
        let config = ClientConfig::from_lookup(|k| {
            (k == "POTION_PER_PAGE").then(|| "lots".to_string())
        });
        assert_eq!(config.default_per_page, DEFAULT_PER_PAGE);
    }

    #[test]
    fn test_builders() {
        let config = ClientConfig::default()
            .with_prefix("/v1/")
            .with_default_per_page(0);
        assert_eq!(config.prefix, "/v1");
        assert_eq!(config.default_per_page, 1);
    }
}
