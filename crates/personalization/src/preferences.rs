//! Preference aggregation — reduces a user's recent interactions into
//! category, location and price affinities.
//!
//! Affinities are attributed to each listing's *current* category and
//! location, so recategorising a listing shifts historical signal with it.

use crate::catalog::{ListingProvider, ListingQuery, PriceRange};
use crate::interactions::InteractionLog;
use market_core::config::RecommendationConfig;
use market_core::types::Listing;
use market_core::MarketResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct LocationAffinity {
    /// Lower-cased first token of a listing location.
    pub token: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct PreferenceSignal {
    /// Retained top categories only.
    pub categories: HashMap<String, f64>,
    /// Retained top locations, heaviest first. Matching is first-wins in this order.
    pub locations: Vec<LocationAffinity>,
    pub price_range: Option<PriceRange>,
    /// Interactions that resolved to a known listing.
    pub interaction_count: usize,
}

impl PreferenceSignal {
    pub fn category_weight(&self, category_id: &str) -> f64 {
        self.categories.get(category_id).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.locations.is_empty() && self.price_range.is_none()
    }
}

pub struct PreferenceAggregator {
    log: Arc<dyn InteractionLog>,
    catalog: Arc<dyn ListingProvider>,
    history_limit: usize,
    top_categories: usize,
    top_locations: usize,
    price_spread: f64,
}

impl PreferenceAggregator {
    pub fn new(
        log: Arc<dyn InteractionLog>,
        catalog: Arc<dyn ListingProvider>,
        config: &RecommendationConfig,
    ) -> Self {
        Self {
            log,
            catalog,
            history_limit: config.history_limit,
            top_categories: config.top_categories,
            top_locations: config.top_locations,
            price_spread: config.price_spread,
        }
    }

    /// `None` when the user has no usable history.
    pub fn aggregate(&self, user_id: &str) -> MarketResult<Option<PreferenceSignal>> {
        let interactions = self.log.query_recent(user_id, self.history_limit)?;
        if interactions.is_empty() {
            return Ok(None);
        }

        let ids: Vec<Uuid> = interactions.iter().map(|i| i.listing_id).collect();
        let listings: HashMap<Uuid, Listing> = self
            .catalog
            .query(&ListingQuery::by_ids(ids))?
            .into_iter()
            .map(|l| (l.id, l))
            .collect();

        let mut categories: HashMap<String, f64> = HashMap::new();
        let mut locations: HashMap<String, f64> = HashMap::new();
        let mut price_sum = 0.0;
        let mut priced = 0usize;
        let mut resolved = 0usize;

        for interaction in &interactions {
            // Listings deleted since the interaction contribute nothing.
            let Some(listing) = listings.get(&interaction.listing_id) else {
                continue;
            };
            resolved += 1;
            *categories.entry(listing.category_id.clone()).or_insert(0.0) += interaction.weight;

            let token = listing.location_token();
            if !token.is_empty() {
                *locations.entry(token).or_insert(0.0) += interaction.weight;
            }
            if listing.price > 0.0 {
                price_sum += listing.price;
                priced += 1;
            }
        }

        let price_range = (priced > 0).then(|| {
            let mean = price_sum / priced as f64;
            PriceRange {
                min: mean * (1.0 - self.price_spread),
                max: mean * (1.0 + self.price_spread),
            }
        });

        let signal = PreferenceSignal {
            categories: top_n(categories, self.top_categories).into_iter().collect(),
            locations: top_n(locations, self.top_locations)
                .into_iter()
                .map(|(token, weight)| LocationAffinity { token, weight })
                .collect(),
            price_range,
            interaction_count: resolved,
        };

        if signal.is_empty() {
            return Ok(None);
        }

        debug!(
            user_id = user_id,
            interactions = interactions.len(),
            resolved,
            categories = signal.categories.len(),
            locations = signal.locations.len(),
            "Preferences aggregated"
        );
        Ok(Some(signal))
    }
}

/// Heaviest `n` entries, ties broken by key ascending.
fn top_n(weights: HashMap<String, f64>, n: usize) -> Vec<(String, f64)> {
    let mut entries: Vec<(String, f64)> = weights.into_iter().collect();
    entries.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    entries.truncate(n);
    entries
}
