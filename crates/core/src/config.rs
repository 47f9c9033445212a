use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `MARKETPLACE__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub recommendations: RecommendationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret mixed into bearer token signatures.
    #[serde(default = "default_token_secret")]
    pub token_secret: String,
    /// User ids allowed on `/admin` routes.
    #[serde(default = "default_admin_users")]
    pub admin_users: Vec<String>,
}

/// Which ranking serves users without personalization signal.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Views descending, newest first on ties.
    #[default]
    MostViewed,
    /// Interaction count over the trailing window, padded with `MostViewed`.
    Trending,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    /// Most recent interactions read per aggregation.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_top_categories")]
    pub top_categories: usize,
    #[serde(default = "default_top_locations")]
    pub top_locations: usize,
    /// Fractional spread around the mean interacted price.
    #[serde(default = "default_price_spread")]
    pub price_spread: f64,
    #[serde(default)]
    pub fallback_policy: FallbackPolicy,
    #[serde(default = "default_trending_window_days")]
    pub trending_window_days: i64,
    /// 0 disables the popular-listings cache.
    #[serde(default = "default_popular_cache_ttl_secs")]
    pub popular_cache_ttl_secs: u64,
    /// Number of popular listings computed and cached per refresh.
    #[serde(default = "default_popular_cache_size")]
    pub popular_cache_size: usize,
}

// Default functions
fn default_node_id() -> String {
    "node-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_token_secret() -> String {
    "marketplace-dev-secret".to_string()
}
fn default_admin_users() -> Vec<String> {
    vec!["admin".to_string()]
}
fn default_limit() -> usize {
    10
}
fn default_max_limit() -> usize {
    100
}
fn default_history_limit() -> usize {
    100
}
fn default_top_categories() -> usize {
    3
}
fn default_top_locations() -> usize {
    2
}
fn default_price_spread() -> f64 {
    0.3
}
fn default_trending_window_days() -> i64 {
    7
}
fn default_popular_cache_ttl_secs() -> u64 {
    30
}
fn default_popular_cache_size() -> usize {
    100
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: default_token_secret(),
            admin_users: default_admin_users(),
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            history_limit: default_history_limit(),
            top_categories: default_top_categories(),
            top_locations: default_top_locations(),
            price_spread: default_price_spread(),
            fallback_policy: FallbackPolicy::default(),
            trending_window_days: default_trending_window_days(),
            popular_cache_ttl_secs: default_popular_cache_ttl_secs(),
            popular_cache_size: default_popular_cache_size(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            auth: AuthConfig::default(),
            recommendations: RecommendationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("MARKETPLACE")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("auth.admin_users"),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.recommendations.default_limit, 10);
        assert_eq!(config.recommendations.history_limit, 100);
        assert_eq!(config.recommendations.top_categories, 3);
        assert_eq!(config.recommendations.top_locations, 2);
        assert_eq!(config.recommendations.fallback_policy, FallbackPolicy::MostViewed);
        assert_eq!(config.api.http_port, 8080);
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let json = serde_json::json!({
            "node_id": "node-07",
            "recommendations": { "fallback_policy": "trending", "default_limit": 5 }
        });
        let config: AppConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.node_id, "node-07");
        assert_eq!(config.recommendations.fallback_policy, FallbackPolicy::Trending);
        assert_eq!(config.recommendations.default_limit, 5);
        assert_eq!(config.recommendations.max_limit, 100);
        assert_eq!(config.auth.admin_users, vec!["admin".to_string()]);
    }
}
