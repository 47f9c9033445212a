//! Listing scorer — weighted sum of category, location and recency signals.
//!
//! Scores are relative ranking values, not normalised to [0, 1].

use crate::preferences::PreferenceSignal;
use chrono::{DateTime, Utc};
use market_core::types::Listing;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

pub const CATEGORY_FACTOR: f64 = 0.4;
pub const LOCATION_FACTOR: f64 = 0.3;
pub const RECENCY_FACTOR: f64 = 0.3;
/// Age in days at which the recency contribution reaches zero.
pub const RECENCY_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default, ToSchema)]
pub struct ScoreBreakdown {
    pub category: f64,
    pub location: f64,
    pub recency: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.category + self.location + self.recency
    }
}

#[derive(Debug, Clone)]
pub struct ScoredListing {
    pub listing: Listing,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer;

impl Scorer {
    pub fn new() -> Self {
        Self
    }

    pub fn breakdown(
        &self,
        signal: &PreferenceSignal,
        listing: &Listing,
        now: DateTime<Utc>,
    ) -> ScoreBreakdown {
        ScoreBreakdown {
            category: signal.category_weight(&listing.category_id) * CATEGORY_FACTOR,
            location: location_weight(signal, &listing.location) * LOCATION_FACTOR,
            recency: recency(listing.created_at, now) * RECENCY_FACTOR,
        }
    }

    /// Scores for every recommendable candidate; others are left out entirely.
    pub fn score(
        &self,
        signal: &PreferenceSignal,
        candidates: &[Listing],
        now: DateTime<Utc>,
    ) -> HashMap<Uuid, f64> {
        candidates
            .iter()
            .filter(|l| l.is_recommendable())
            .map(|l| (l.id, self.breakdown(signal, l, now).total()))
            .collect()
    }

    /// Top `limit` recommendable candidates, score descending, id ascending on ties.
    pub fn rank(
        &self,
        signal: &PreferenceSignal,
        candidates: Vec<Listing>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<ScoredListing> {
        let mut scored: Vec<ScoredListing> = candidates
            .into_iter()
            .filter(Listing::is_recommendable)
            .map(|listing| {
                let breakdown = self.breakdown(signal, &listing, now);
                ScoredListing {
                    score: breakdown.total(),
                    breakdown,
                    listing,
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.listing.id.cmp(&b.listing.id))
        });
        scored.truncate(limit);
        scored
    }
}

/// Weight of the first retained location token contained in, or containing,
/// the listing location.
fn location_weight(signal: &PreferenceSignal, location: &str) -> f64 {
    let location = location.trim().to_lowercase();
    if location.is_empty() {
        return 0.0;
    }
    signal
        .locations
        .iter()
        .find(|affinity| location.contains(&affinity.token) || affinity.token.contains(&location))
        .map(|affinity| affinity.weight)
        .unwrap_or(0.0)
}

/// Linear decay from 1 (created today) to 0 at `RECENCY_WINDOW_DAYS`.
fn recency(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days = (now - created_at).num_days().max(0);
    ((RECENCY_WINDOW_DAYS - days) as f64 / RECENCY_WINDOW_DAYS as f64).max(0.0)
}
