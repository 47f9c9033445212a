//! Fallback ranker — globally popular listings for users without
//! personalization signal.

use crate::catalog::{ListingProvider, ListingQuery};
use crate::interactions::InteractionLog;
use chrono::{Duration, Utc};
use market_cache::LocalCache;
use market_core::config::{FallbackPolicy, RecommendationConfig};
use market_core::types::Listing;
use market_core::MarketResult;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Ranked listing ids per policy. Records are re-read on every hit so status
/// changes apply immediately.
pub type PopularCache = LocalCache<FallbackPolicy, Arc<Vec<Uuid>>>;

pub struct FallbackRanker {
    catalog: Arc<dyn ListingProvider>,
    log: Arc<dyn InteractionLog>,
    policy: FallbackPolicy,
    trending_window: Duration,
    cache: Option<Arc<PopularCache>>,
    cache_size: usize,
}

impl FallbackRanker {
    pub fn new(
        catalog: Arc<dyn ListingProvider>,
        log: Arc<dyn InteractionLog>,
        config: &RecommendationConfig,
    ) -> Self {
        Self {
            catalog,
            log,
            policy: config.fallback_policy,
            trending_window: Duration::days(config.trending_window_days),
            cache: None,
            cache_size: config.popular_cache_size,
        }
    }

    /// Serve popular lists from `cache`, recomputing `cache_size` entries on miss.
    pub fn with_cache(mut self, cache: Arc<PopularCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Up to `limit` recommendable listings ordered by the configured policy.
    pub fn popular(&self, limit: usize) -> MarketResult<Vec<Listing>> {
        let Some(cache) = self.cache.as_ref().filter(|_| limit <= self.cache_size) else {
            return self.compute(limit);
        };

        if let Some(ranked) = cache.get(&self.policy) {
            let live = self.load_ranked(&ranked, limit)?;
            if live.len() >= limit.min(ranked.len()) {
                return Ok(live);
            }
            debug!(policy = ?self.policy, "Cached popular listings went stale, recomputing");
            cache.invalidate(&self.policy);
        }

        let listings = self.compute(self.cache_size)?;
        cache.put(
            self.policy,
            Arc::new(listings.iter().map(|l| l.id).collect()),
        );
        Ok(listings.into_iter().take(limit).collect())
    }

    /// Current recommendable records for cached ids, in cached order.
    fn load_ranked(&self, ranked: &[Uuid], limit: usize) -> MarketResult<Vec<Listing>> {
        let mut current: HashMap<Uuid, Listing> = self
            .catalog
            .query(&ListingQuery {
                ids: Some(ranked.iter().take(limit).copied().collect()),
                ..ListingQuery::recommendable()
            })?
            .into_iter()
            .map(|l| (l.id, l))
            .collect();
        Ok(ranked
            .iter()
            .take(limit)
            .filter_map(|id| current.remove(id))
            .collect())
    }

    fn compute(&self, limit: usize) -> MarketResult<Vec<Listing>> {
        match self.policy {
            FallbackPolicy::MostViewed => self.most_viewed(limit, &HashSet::new()),
            FallbackPolicy::Trending => self.trending(limit),
        }
    }

    /// Views descending, then newest, then id.
    fn most_viewed(&self, limit: usize, exclude: &HashSet<Uuid>) -> MarketResult<Vec<Listing>> {
        let mut listings: Vec<Listing> = self
            .catalog
            .query(&ListingQuery::recommendable())?
            .into_iter()
            .filter(|l| !exclude.contains(&l.id))
            .collect();
        listings.sort_by(by_views);
        listings.truncate(limit);
        Ok(listings)
    }

    /// Interaction count over the trailing window; short lists are padded
    /// with most-viewed listings.
    fn trending(&self, limit: usize) -> MarketResult<Vec<Listing>> {
        let since = Utc::now() - self.trending_window;
        let counts: HashMap<Uuid, u64> = self.log.count_since(since)?;
        if counts.is_empty() {
            debug!("No interactions in trending window, using most viewed");
            return self.most_viewed(limit, &HashSet::new());
        }

        let ids: Vec<Uuid> = counts.keys().copied().collect();
        let mut ranked: Vec<Listing> = self.catalog.query(&ListingQuery {
            ids: Some(ids),
            ..ListingQuery::recommendable()
        })?;
        ranked.sort_by(|a, b| {
            let ca = counts.get(&a.id).copied().unwrap_or(0);
            let cb = counts.get(&b.id).copied().unwrap_or(0);
            cb.cmp(&ca).then_with(|| by_views(a, b))
        });
        ranked.truncate(limit);

        if ranked.len() < limit {
            let seen: HashSet<Uuid> = ranked.iter().map(|l| l.id).collect();
            let padding = self.most_viewed(limit - ranked.len(), &seen)?;
            ranked.extend(padding);
        }
        Ok(ranked)
    }
}

fn by_views(a: &Listing, b: &Listing) -> Ordering {
    b.views
        .cmp(&a.views)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::interactions::{InMemoryInteractionLog, InteractionStore};
    use market_core::types::InteractionType;

    fn add(catalog: &InMemoryCatalog, views: u64, age_days: i64, live: bool) -> Uuid {
        let listing = Listing {
            id: Uuid::new_v4(),
            category_id: "x".into(),
            location: "Lisbon".into(),
            price: 10.0,
            is_active: live,
            is_available: true,
            created_at: Utc::now() - Duration::days(age_days),
            views,
        };
        let id = listing.id;
        catalog.upsert(listing);
        id
    }

    fn ranker(policy: FallbackPolicy) -> (FallbackRanker, Arc<InMemoryCatalog>, InteractionStore) {
        let catalog = Arc::new(InMemoryCatalog::new());
        let log = Arc::new(InMemoryInteractionLog::new());
        let config = RecommendationConfig {
            fallback_policy: policy,
            ..Default::default()
        };
        let store = InteractionStore::new(log.clone(), catalog.clone());
        (FallbackRanker::new(catalog.clone(), log, &config), catalog, store)
    }

    #[test]
    fn test_most_viewed_order_and_filter() {
        let (ranker, catalog, _) = ranker(FallbackPolicy::MostViewed);
        let top = add(&catalog, 100, 5, true);
        let tie_new = add(&catalog, 50, 1, true);
        let tie_old = add(&catalog, 50, 9, true);
        add(&catalog, 1000, 1, false);

        let popular = ranker.popular(10).unwrap();
        let ids: Vec<Uuid> = popular.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![top, tie_new, tie_old]);
        assert_eq!(ranker.popular(2).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_catalog() {
        let (ranker, _, _) = ranker(FallbackPolicy::Trending);
        assert!(ranker.popular(5).unwrap().is_empty());
    }

    #[test]
    fn test_trending_counts_window_and_pads() {
        let (ranker, catalog, store) = ranker(FallbackPolicy::Trending);
        let hot = add(&catalog, 0, 20, true);
        let warm = add(&catalog, 5, 20, true);
        let stale = add(&catalog, 1, 20, true);
        let viewed = add(&catalog, 900, 20, true);

        for user in ["u1", "u2", "u3"] {
            store.record(user, hot, InteractionType::View, None).unwrap();
        }
        store.record("u1", warm, InteractionType::View, None).unwrap();
        for user in ["u1", "u2", "u3", "u4"] {
            store
                .record_at(user, stale, InteractionType::View, None, Utc::now() - Duration::days(8))
                .unwrap();
        }

        let ids: Vec<Uuid> = ranker.popular(3).unwrap().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![hot, warm, viewed]);
    }

    #[test]
    fn test_trending_without_window_activity_uses_most_viewed() {
        let (ranker, catalog, _) = ranker(FallbackPolicy::Trending);
        let a = add(&catalog, 3, 1, true);
        let b = add(&catalog, 7, 1, true);
        let ids: Vec<Uuid> = ranker.popular(5).unwrap().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[test]
    fn test_cached_popular_serves_prefix() {
        let (ranker, catalog, _) = ranker(FallbackPolicy::MostViewed);
        let cache = Arc::new(PopularCache::new("popular", std::time::Duration::from_secs(60), 4));
        let ranker = ranker.with_cache(cache.clone());
        let first = add(&catalog, 10, 1, true);
        add(&catalog, 5, 1, true);

        assert_eq!(ranker.popular(1).unwrap()[0].id, first);
        assert_eq!(cache.len(), 1);

        // Cached until expiry: a new, more viewed listing is not visible yet.
        add(&catalog, 999, 1, true);
        assert_eq!(ranker.popular(1).unwrap()[0].id, first);
        cache.clear();
        assert_ne!(ranker.popular(1).unwrap()[0].id, first);
    }

    #[test]
    fn test_cached_popular_drops_deactivated_listings() {
        let (ranker, catalog, _) = ranker(FallbackPolicy::MostViewed);
        let cache = Arc::new(PopularCache::new("popular", std::time::Duration::from_secs(60), 4));
        let ranker = ranker.with_cache(cache.clone());
        let top = add(&catalog, 30, 1, true);
        let second = add(&catalog, 20, 1, true);
        let third = add(&catalog, 10, 1, true);

        let ids: Vec<Uuid> = ranker.popular(5).unwrap().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![top, second, third]);

        catalog.set_status(&top, false, false).unwrap();
        let served = ranker.popular(5).unwrap();
        let ids: Vec<Uuid> = served.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![second, third]);
        assert!(served.iter().all(Listing::is_recommendable));

        catalog.set_status(&second, true, false).unwrap();
        let ids: Vec<Uuid> = ranker.popular(1).unwrap().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![third]);
    }

    #[test]
    fn test_cached_popular_reflects_current_records() {
        let (ranker, catalog, store) = ranker(FallbackPolicy::MostViewed);
        let cache = Arc::new(PopularCache::new("popular", std::time::Duration::from_secs(60), 4));
        let ranker = ranker.with_cache(cache);
        let id = add(&catalog, 3, 1, true);

        assert_eq!(ranker.popular(1).unwrap()[0].views, 3);
        store.record("u1", id, InteractionType::View, None).unwrap();
        assert_eq!(ranker.popular(1).unwrap()[0].views, 4);
    }
}
