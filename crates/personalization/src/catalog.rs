//! Listing catalog — read-only query surface the scoring engine consumes,
//! plus an in-memory implementation for development and tests.

use chrono::Utc;
use dashmap::DashMap;
use market_core::types::Listing;
use market_core::{MarketError, MarketResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

/// Inclusive price window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListingQuery {
    /// Restrict to these ids. `None` means the whole catalog.
    pub ids: Option<Vec<Uuid>>,
    /// Only active and available listings.
    pub recommendable_only: bool,
    pub price_range: Option<PriceRange>,
}

impl ListingQuery {
    pub fn recommendable() -> Self {
        Self {
            recommendable_only: true,
            ..Default::default()
        }
    }

    pub fn by_ids(ids: Vec<Uuid>) -> Self {
        Self {
            ids: Some(ids),
            ..Default::default()
        }
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        if self.recommendable_only && !listing.is_recommendable() {
            return false;
        }
        if let Some(range) = &self.price_range {
            if !range.contains(listing.price) {
                return false;
            }
        }
        true
    }
}

/// Listing access for ranking. The only write is the view counter.
pub trait ListingProvider: Send + Sync {
    /// Listings matching the query, ordered by id.
    fn query(&self, query: &ListingQuery) -> MarketResult<Vec<Listing>>;

    fn get(&self, id: &Uuid) -> MarketResult<Option<Listing>>;

    /// Bump the view counter used by the most-viewed fallback.
    fn record_view(&self, id: &Uuid) -> MarketResult<u64>;
}

/// DashMap-backed catalog. Production swaps this for the relational listing table.
pub struct InMemoryCatalog {
    listings: DashMap<Uuid, Listing>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            listings: DashMap::new(),
        }
    }

    pub fn upsert(&self, listing: Listing) {
        debug!(listing_id = %listing.id, category = %listing.category_id, "Listing upserted");
        self.listings.insert(listing.id, listing);
    }

    pub fn set_status(&self, id: &Uuid, is_active: bool, is_available: bool) -> MarketResult<()> {
        let mut entry = self
            .listings
            .get_mut(id)
            .ok_or_else(|| MarketError::not_found("listing", id))?;
        entry.is_active = is_active;
        entry.is_available = is_available;
        Ok(())
    }

    pub fn remove(&self, id: &Uuid) -> Option<Listing> {
        self.listings.remove(id).map(|(_, listing)| listing)
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// A small demo catalog for local development.
    pub fn seed_demo_data(&self) {
        let now = Utc::now();
        let demo = [
            ("apartments", "Lisbon, Portugal", 120.0, 3, 340),
            ("apartments", "Porto, Portugal", 85.0, 12, 120),
            ("cars", "Lisbon, Portugal", 45.0, 1, 75),
            ("bikes", "Madrid, Spain", 15.0, 40, 510),
            ("apartments", "Madrid, Spain", 140.0, 6, 220),
            ("tools", "Porto, Portugal", 10.0, 2, 18),
        ];
        for (category, location, price, age_days, views) in demo {
            self.upsert(Listing {
                id: Uuid::new_v4(),
                category_id: category.to_string(),
                location: location.to_string(),
                price,
                is_active: true,
                is_available: true,
                created_at: now - chrono::Duration::days(age_days),
                views,
            });
        }
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingProvider for InMemoryCatalog {
    fn query(&self, query: &ListingQuery) -> MarketResult<Vec<Listing>> {
        let mut listings: Vec<Listing> = match &query.ids {
            Some(ids) => {
                let unique: HashSet<&Uuid> = ids.iter().collect();
                unique
                    .into_iter()
                    .filter_map(|id| self.listings.get(id).map(|l| l.value().clone()))
                    .filter(|l| query.matches(l))
                    .collect()
            }
            None => self
                .listings
                .iter()
                .filter(|entry| query.matches(entry.value()))
                .map(|entry| entry.value().clone())
                .collect(),
        };
        listings.sort_by_key(|l| l.id);
        Ok(listings)
    }

    fn get(&self, id: &Uuid) -> MarketResult<Option<Listing>> {
        Ok(self.listings.get(id).map(|l| l.value().clone()))
    }

    fn record_view(&self, id: &Uuid) -> MarketResult<u64> {
        let mut entry = self
            .listings
            .get_mut(id)
            .ok_or_else(|| MarketError::not_found("listing", id))?;
        entry.views = entry.views.saturating_add(1);
        Ok(entry.views)
    }
}
