//! Interaction store — append-only log of user actions against listings.

use crate::catalog::ListingProvider;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use market_core::types::{Interaction, InteractionType};
use market_core::{MarketError, MarketResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Persistence seam for interaction records.
pub trait InteractionLog: Send + Sync {
    fn append(&self, interaction: Interaction) -> MarketResult<()>;

    /// Up to `limit` interactions for the user, newest first.
    fn query_recent(&self, user_id: &str, limit: usize) -> MarketResult<Vec<Interaction>>;

    /// Interaction counts per listing at or after `since`.
    fn count_since(&self, since: DateTime<Utc>) -> MarketResult<HashMap<Uuid, u64>>;
}

/// In-memory log. Per-user histories are kept in arrival order.
pub struct InMemoryInteractionLog {
    by_user: DashMap<String, Vec<Interaction>>,
    // (created_at, listing_id) for windowed counts across all users.
    timeline: RwLock<Vec<(DateTime<Utc>, Uuid)>>,
}

impl InMemoryInteractionLog {
    pub fn new() -> Self {
        Self {
            by_user: DashMap::new(),
            timeline: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.timeline.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.read().is_empty()
    }
}

impl Default for InMemoryInteractionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionLog for InMemoryInteractionLog {
    fn append(&self, interaction: Interaction) -> MarketResult<()> {
        self.timeline
            .write()
            .push((interaction.created_at, interaction.listing_id));
        self.by_user
            .entry(interaction.user_id.clone())
            .or_default()
            .push(interaction);
        Ok(())
    }

    fn query_recent(&self, user_id: &str, limit: usize) -> MarketResult<Vec<Interaction>> {
        let Some(history) = self.by_user.get(user_id) else {
            return Ok(Vec::new());
        };
        let mut recent: Vec<Interaction> = history.value().clone();
        // Stable sort keeps arrival order for equal timestamps; reverse makes it newest first.
        recent.sort_by_key(|i| i.created_at);
        recent.reverse();
        recent.truncate(limit);
        Ok(recent)
    }

    fn count_since(&self, since: DateTime<Utc>) -> MarketResult<HashMap<Uuid, u64>> {
        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        for (at, listing_id) in self.timeline.read().iter() {
            if *at >= since {
                *counts.entry(*listing_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

/// Records interactions after validating the referenced listing exists.
pub struct InteractionStore {
    log: Arc<dyn InteractionLog>,
    catalog: Arc<dyn ListingProvider>,
}

impl InteractionStore {
    pub fn new(log: Arc<dyn InteractionLog>, catalog: Arc<dyn ListingProvider>) -> Self {
        Self { log, catalog }
    }

    pub fn log(&self) -> &Arc<dyn InteractionLog> {
        &self.log
    }

    pub fn record(
        &self,
        user_id: &str,
        listing_id: Uuid,
        interaction_type: InteractionType,
        metadata: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> MarketResult<Interaction> {
        self.record_at(user_id, listing_id, interaction_type, metadata, Utc::now())
    }

    /// `record` with an explicit timestamp, used for imports and tests.
    pub fn record_at(
        &self,
        user_id: &str,
        listing_id: Uuid,
        interaction_type: InteractionType,
        metadata: Option<serde_json::Map<String, serde_json::Value>>,
        created_at: DateTime<Utc>,
    ) -> MarketResult<Interaction> {
        if user_id.trim().is_empty() {
            return Err(MarketError::Validation("user_id must not be empty".into()));
        }
        if self.catalog.get(&listing_id)?.is_none() {
            return Err(MarketError::not_found("listing", listing_id));
        }

        let interaction = Interaction {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            listing_id,
            interaction_type,
            weight: interaction_type.weight(),
            metadata: metadata.unwrap_or_default(),
            created_at,
        };
        self.log.append(interaction.clone())?;
        if interaction_type == InteractionType::View {
            self.catalog.record_view(&listing_id)?;
        }

        metrics::counter!("interactions.recorded", "type" => interaction_type.as_str())
            .increment(1);
        debug!(
            user_id = user_id,
            listing_id = %listing_id,
            interaction_type = interaction_type.as_str(),
            "Interaction recorded"
        );
        Ok(interaction)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use market_core::types::Listing;

    fn setup() -> (InteractionStore, Arc<InMemoryInteractionLog>, Uuid) {
        let catalog = Arc::new(InMemoryCatalog::new());
        let listing = Listing {
            id: Uuid::new_v4(),
            category_id: "cars".into(),
            location: "Porto".into(),
            price: 40.0,
            is_active: true,
            is_available: true,
            created_at: Utc::now(),
            views: 0,
        };
        let id = listing.id;
        catalog.upsert(listing);
        let log = Arc::new(InMemoryInteractionLog::new());
        (InteractionStore::new(log.clone(), catalog), log, id)
    }

    #[test]
    fn test_record_assigns_weight() {
        let (store, _, listing_id) = setup();
        let i = store
            .record("user-1", listing_id, InteractionType::Contact, None)
            .unwrap();
        assert_eq!(i.weight, 5.0);
        assert!(i.metadata.is_empty());
    }

    #[test]
    fn test_record_keeps_metadata() {
        let (store, log, listing_id) = setup();
        let mut meta = serde_json::Map::new();
        meta.insert("query".into(), serde_json::json!("sea view"));
        store
            .record("user-1", listing_id, InteractionType::Search, Some(meta))
            .unwrap();
        let recent = log.query_recent("user-1", 10).unwrap();
        assert_eq!(recent[0].metadata["query"], "sea view");
    }

    #[test]
    fn test_record_rejects_unknown_listing_and_blank_user() {
        let (store, log, listing_id) = setup();
        assert!(matches!(
            store.record("user-1", Uuid::new_v4(), InteractionType::View, None),
            Err(MarketError::NotFound(_))
        ));
        assert!(matches!(
            store.record("  ", listing_id, InteractionType::View, None),
            Err(MarketError::Validation(_))
        ));
        assert!(log.is_empty());
    }

    #[test]
    fn test_query_recent_newest_first_and_capped() {
        let (store, log, listing_id) = setup();
        let base = Utc::now() - chrono::Duration::hours(10);
        for h in 0..5 {
            store
                .record_at(
                    "user-1",
                    listing_id,
                    InteractionType::View,
                    None,
                    base + chrono::Duration::hours(h),
                )
                .unwrap();
        }
        let recent = log.query_recent("user-1", 3).unwrap();
        assert_eq!(recent.len(), 3);
        assert!(recent[0].created_at > recent[1].created_at);
        assert!(recent[1].created_at > recent[2].created_at);
        assert!(log.query_recent("user-2", 3).unwrap().is_empty());
    }

    #[test]
    fn test_views_bump_listing_counter() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let listing = Listing {
            id: Uuid::new_v4(),
            category_id: "cars".into(),
            location: "Porto".into(),
            price: 40.0,
            is_active: true,
            is_available: true,
            created_at: Utc::now(),
            views: 7,
        };
        let id = listing.id;
        catalog.upsert(listing);
        let store = InteractionStore::new(Arc::new(InMemoryInteractionLog::new()), catalog.clone());

        store.record("u1", id, InteractionType::View, None).unwrap();
        store.record("u2", id, InteractionType::View, None).unwrap();
        store.record("u1", id, InteractionType::Favorite, None).unwrap();
        assert_eq!(catalog.get(&id).unwrap().unwrap().views, 9);
    }

    #[test]
    fn test_count_since() {
        let (store, log, listing_id) = setup();
        let now = Utc::now();
        store
            .record_at("u1", listing_id, InteractionType::View, None, now - chrono::Duration::days(10))
            .unwrap();
        store
            .record_at("u2", listing_id, InteractionType::View, None, now - chrono::Duration::days(1))
            .unwrap();
        store
            .record_at("u3", listing_id, InteractionType::Favorite, None, now)
            .unwrap();
        let counts = log.count_since(now - chrono::Duration::days(7)).unwrap();
        assert_eq!(counts.get(&listing_id), Some(&2));
    }
}
