//! Personalization engine — interaction tracking, preference aggregation,
//! listing scoring and popularity fallback.

#![warn(clippy::unwrap_used)]

pub mod catalog;
pub mod fallback;
pub mod interactions;
pub mod preferences;
pub mod recommendations;
pub mod scorer;

pub use catalog::{InMemoryCatalog, ListingProvider, ListingQuery, PriceRange};
pub use fallback::{FallbackRanker, PopularCache};
pub use interactions::{InMemoryInteractionLog, InteractionLog, InteractionStore};
pub use preferences::{PreferenceAggregator, PreferenceSignal};
pub use recommendations::{RecommendationEngine, RecommendationResponse, RecommendationStrategy};
pub use scorer::Scorer;
