//! Recommendation engine — personalized ranking with a popularity fallback.
//!
//! Flow: aggregate the user's recent interactions, score active and
//! available listings inside the preferred price window, return the top N.
//! Users without signal, or whose candidate set comes back empty, get the
//! fallback ranker's list instead.

use crate::catalog::{ListingProvider, ListingQuery};
use crate::fallback::FallbackRanker;
use crate::interactions::{InteractionLog, InteractionStore};
use crate::preferences::PreferenceAggregator;
use crate::scorer::{ScoreBreakdown, Scorer};
use chrono::{DateTime, Utc};
use market_core::config::RecommendationConfig;
use market_core::types::{Interaction, InteractionType, Listing};
use market_core::MarketResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStrategy {
    Personalized,
    Popular,
}

impl RecommendationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationStrategy::Personalized => "personalized",
            RecommendationStrategy::Popular => "popular",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecommendationItem {
    pub listing: Listing,
    pub score: f64,
    /// Present for personalized results only.
    pub breakdown: Option<ScoreBreakdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecommendationResponse {
    pub request_id: Uuid,
    pub user_id: String,
    pub strategy: RecommendationStrategy,
    pub items: Vec<RecommendationItem>,
    pub generated_at: DateTime<Utc>,
}

impl RecommendationResponse {
    pub fn listings(self) -> Vec<Listing> {
        self.items.into_iter().map(|item| item.listing).collect()
    }
}

pub struct RecommendationEngine {
    catalog: Arc<dyn ListingProvider>,
    interactions: InteractionStore,
    aggregator: PreferenceAggregator,
    scorer: Scorer,
    fallback: FallbackRanker,
    default_limit: usize,
    max_limit: usize,
}

impl RecommendationEngine {
    pub fn new(
        catalog: Arc<dyn ListingProvider>,
        log: Arc<dyn InteractionLog>,
        config: &RecommendationConfig,
    ) -> Self {
        Self {
            interactions: InteractionStore::new(log.clone(), catalog.clone()),
            aggregator: PreferenceAggregator::new(log.clone(), catalog.clone(), config),
            scorer: Scorer::new(),
            fallback: FallbackRanker::new(catalog.clone(), log, config),
            catalog,
            default_limit: config.default_limit,
            max_limit: config.max_limit.max(1),
        }
    }

    /// Replace the fallback ranker, e.g. with a cached one.
    pub fn with_fallback(mut self, fallback: FallbackRanker) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn record_interaction(
        &self,
        user_id: &str,
        listing_id: Uuid,
        interaction_type: InteractionType,
        metadata: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> MarketResult<Interaction> {
        self.interactions
            .record(user_id, listing_id, interaction_type, metadata)
    }

    pub fn interactions(&self) -> &InteractionStore {
        &self.interactions
    }

    pub fn recommend(&self, user_id: &str, limit: Option<usize>) -> MarketResult<RecommendationResponse> {
        self.recommend_at(user_id, limit, Utc::now())
    }

    /// `recommend` against a fixed clock.
    pub fn recommend_at(
        &self,
        user_id: &str,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> MarketResult<RecommendationResponse> {
        let limit = limit.unwrap_or(self.default_limit).clamp(1, self.max_limit);

        let items = match self.aggregator.aggregate(user_id)? {
            Some(signal) => {
                let candidates = self.catalog.query(&ListingQuery {
                    price_range: signal.price_range,
                    ..ListingQuery::recommendable()
                })?;
                self.scorer
                    .rank(&signal, candidates, limit, now)
                    .into_iter()
                    .map(|scored| RecommendationItem {
                        listing: scored.listing,
                        score: scored.score,
                        breakdown: Some(scored.breakdown),
                    })
                    .collect()
            }
            None => Vec::new(),
        };

        let (strategy, items) = if items.is_empty() {
            (RecommendationStrategy::Popular, self.popular_items(limit)?)
        } else {
            (RecommendationStrategy::Personalized, items)
        };

        metrics::counter!("recommendations.requests", "strategy" => strategy.as_str())
            .increment(1);
        debug!(
            user_id = user_id,
            strategy = strategy.as_str(),
            items = items.len(),
            "Recommendations generated"
        );

        Ok(RecommendationResponse {
            request_id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            strategy,
            items,
            generated_at: now,
        })
    }

    fn popular_items(&self, limit: usize) -> MarketResult<Vec<RecommendationItem>> {
        Ok(self
            .fallback
            .popular(limit)?
            .into_iter()
            .enumerate()
            .map(|(i, listing)| RecommendationItem {
                listing,
                score: 1.0 / (i as f64 + 1.0),
                breakdown: None,
            })
            .collect())
    }
}

/// Wire up an engine over in-memory stores, for development and tests.
pub fn in_memory_engine(
    config: &RecommendationConfig,
) -> (
    RecommendationEngine,
    Arc<crate::catalog::InMemoryCatalog>,
    Arc<crate::interactions::InMemoryInteractionLog>,
) {
    let catalog = Arc::new(crate::catalog::InMemoryCatalog::new());
    let log = Arc::new(crate::interactions::InMemoryInteractionLog::new());
    let engine = RecommendationEngine::new(catalog.clone(), log.clone(), config);
    info!(policy = ?config.fallback_policy, "Recommendation engine initialized (in-memory)");
    (engine, catalog, log)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use chrono::Duration;

    fn add(
        catalog: &InMemoryCatalog,
        category: &str,
        location: &str,
        price: f64,
        views: u64,
        age_days: i64,
    ) -> Uuid {
        let listing = Listing {
            id: Uuid::new_v4(),
            category_id: category.into(),
            location: location.into(),
            price,
            is_active: true,
            is_available: true,
            created_at: Utc::now() - Duration::days(age_days),
            views,
        };
        let id = listing.id;
        catalog.upsert(listing);
        id
    }

    #[test]
    fn test_no_signal_returns_fallback_top_n() {
        let (engine, catalog, _) = in_memory_engine(&RecommendationConfig::default());
        let mut expected = Vec::new();
        for views in (1..=8u64).rev() {
            expected.push(add(&catalog, "x", "Lisbon", 10.0, views * 10, 1));
        }
        let hidden = add(&catalog, "x", "Lisbon", 10.0, 10_000, 1);
        catalog.set_status(&hidden, true, false).unwrap();

        let resp = engine.recommend("fresh-user", Some(5)).unwrap();
        assert_eq!(resp.strategy, RecommendationStrategy::Popular);
        let ids: Vec<Uuid> = resp.items.iter().map(|i| i.listing.id).collect();
        assert_eq!(ids, expected[..5].to_vec());
        assert!(resp.items.iter().all(|i| i.breakdown.is_none()));
    }

    #[test]
    fn test_personalized_ranking() {
        let (engine, catalog, _) = in_memory_engine(&RecommendationConfig::default());
        let seen = add(&catalog, "apartments", "Lisbon, Portugal", 100.0, 0, 60);
        let same_city_flat = add(&catalog, "apartments", "Lisbon", 110.0, 0, 2);
        let other_city_flat = add(&catalog, "apartments", "Madrid", 95.0, 0, 2);
        let bike = add(&catalog, "bikes", "Lisbon", 100.0, 500, 0);

        engine
            .record_interaction("u", seen, InteractionType::Favorite, None)
            .unwrap();

        let resp = engine.recommend("u", Some(4)).unwrap();
        assert_eq!(resp.strategy, RecommendationStrategy::Personalized);
        let ids: Vec<Uuid> = resp.items.iter().map(|i| i.listing.id).collect();
        // Old listings lose only the recency share, so the seen flat stays ahead
        // of a fresh flat elsewhere.
        assert_eq!(ids, vec![same_city_flat, seen, other_city_flat, bike]);
        for pair in resp.items.windows(2) {
            assert!(pair[0].score > pair[1].score);
        }
    }

    #[test]
    fn test_price_window_filters_candidates() {
        let (engine, catalog, _) = in_memory_engine(&RecommendationConfig::default());
        let seen = add(&catalog, "apartments", "Lisbon", 100.0, 0, 1);
        let luxury = add(&catalog, "apartments", "Lisbon", 1000.0, 0, 1);
        engine
            .record_interaction("u", seen, InteractionType::View, None)
            .unwrap();

        let resp = engine.recommend("u", None).unwrap();
        assert!(resp.items.iter().all(|i| i.listing.id != luxury));
    }

    #[test]
    fn test_empty_candidates_fall_back() {
        let (engine, catalog, _) = in_memory_engine(&RecommendationConfig::default());
        let seen = add(&catalog, "apartments", "Lisbon", 100.0, 0, 1);
        let popular = add(&catalog, "tools", "Oslo", 5.0, 50, 1);
        engine
            .record_interaction("u", seen, InteractionType::View, None)
            .unwrap();
        // The only in-window listing goes offline.
        catalog.set_status(&seen, false, true).unwrap();

        let resp = engine.recommend("u", None).unwrap();
        assert_eq!(resp.strategy, RecommendationStrategy::Popular);
        assert_eq!(resp.items[0].listing.id, popular);
    }

    #[test]
    fn test_inactive_never_recommended() {
        let (engine, catalog, _) = in_memory_engine(&RecommendationConfig::default());
        let seen = add(&catalog, "apartments", "Lisbon", 100.0, 0, 1);
        let perfect = add(&catalog, "apartments", "Lisbon", 100.0, 0, 0);
        for _ in 0..20 {
            engine
                .record_interaction("u", perfect, InteractionType::Contact, None)
                .unwrap();
        }
        engine
            .record_interaction("u", seen, InteractionType::View, None)
            .unwrap();
        catalog.set_status(&perfect, false, false).unwrap();

        let resp = engine.recommend("u", Some(10)).unwrap();
        assert!(resp.items.iter().all(|i| i.listing.id != perfect));
    }

    #[test]
    fn test_limit_is_clamped() {
        let config = RecommendationConfig {
            max_limit: 3,
            ..Default::default()
        };
        let (engine, catalog, _) = in_memory_engine(&config);
        for i in 0..6 {
            add(&catalog, "x", "Lisbon", 10.0, i, 1);
        }
        assert_eq!(engine.recommend("u", Some(50)).unwrap().items.len(), 3);
        assert_eq!(engine.recommend("u", Some(0)).unwrap().items.len(), 1);
    }

    #[test]
    fn test_empty_catalog_is_not_an_error() {
        let (engine, _, _) = in_memory_engine(&RecommendationConfig::default());
        let resp = engine.recommend("u", None).unwrap();
        assert!(resp.items.is_empty());
        assert_eq!(resp.strategy, RecommendationStrategy::Popular);
    }
}
