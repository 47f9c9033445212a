use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::MarketError;

// ─── Catalog ────────────────────────────────────────────────────────────

/// A rentable/sellable listing. Owned by the catalog; read-only to scoring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Listing {
    pub id: Uuid,
    pub category_id: String,
    /// Free text, e.g. "Lisbon, Portugal".
    pub location: String,
    pub price: f64,
    pub is_active: bool,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub views: u64,
}

impl Listing {
    /// Only active, available listings are ever recommended.
    pub fn is_recommendable(&self) -> bool {
        self.is_active && self.is_available
    }

    /// First comma-delimited token of the location, trimmed and lower-cased.
    pub fn location_token(&self) -> String {
        self.location
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase()
    }
}

// ─── Interactions ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    View,
    Favorite,
    Share,
    Contact,
    Search,
    Booking,
}

impl InteractionType {
    /// Signal weight of a single interaction. Types without an explicit
    /// entry weigh the same as a view.
    pub fn weight(&self) -> f64 {
        match self {
            InteractionType::View => 1.0,
            InteractionType::Favorite => 3.0,
            InteractionType::Contact => 5.0,
            InteractionType::Search => 2.0,
            InteractionType::Share | InteractionType::Booking => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::View => "view",
            InteractionType::Favorite => "favorite",
            InteractionType::Share => "share",
            InteractionType::Contact => "contact",
            InteractionType::Search => "search",
            InteractionType::Booking => "booking",
        }
    }
}

/// Append-only record of a user action against a listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Interaction {
    pub id: Uuid,
    pub user_id: String,
    pub listing_id: Uuid,
    pub interaction_type: InteractionType,
    pub weight: f64,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

// ─── Experimentation ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
pub enum Variant {
    A,
    B,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::A => f.write_str("A"),
            Variant::B => f.write_str("B"),
        }
    }
}

impl FromStr for Variant {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" | "a" => Ok(Variant::A),
            "B" | "b" => Ok(Variant::B),
            other => Err(MarketError::Validation(format!("unknown variant '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Views,
    Clicks,
    Conversions,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Views => "views",
            Metric::Clicks => "clicks",
            Metric::Conversions => "conversions",
        }
    }
}

impl FromStr for Metric {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "views" => Ok(Metric::Views),
            "clicks" => Ok(Metric::Clicks),
            "conversions" => Ok(Metric::Conversions),
            other => Err(MarketError::Validation(format!("unknown metric '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, ToSchema)]
pub struct VariantMetrics {
    pub views: u64,
    pub clicks: u64,
    pub conversions: u64,
}

impl VariantMetrics {
    pub fn get(&self, metric: Metric) -> u64 {
        match metric {
            Metric::Views => self.views,
            Metric::Clicks => self.clicks,
            Metric::Conversions => self.conversions,
        }
    }

    pub fn increment(&mut self, metric: Metric) {
        let counter = match metric {
            Metric::Views => &mut self.views,
            Metric::Clicks => &mut self.clicks,
            Metric::Conversions => &mut self.conversions,
        };
        *counter = counter.saturating_add(1);
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, ToSchema)]
pub struct ExperimentMetrics {
    #[serde(rename = "A")]
    pub a: VariantMetrics,
    #[serde(rename = "B")]
    pub b: VariantMetrics,
}

impl ExperimentMetrics {
    pub fn variant(&self, variant: Variant) -> &VariantMetrics {
        match variant {
            Variant::A => &self.a,
            Variant::B => &self.b,
        }
    }

    pub fn variant_mut(&mut self, variant: Variant) -> &mut VariantMetrics {
        match variant {
            Variant::A => &mut self.a,
            Variant::B => &mut self.b,
        }
    }
}

/// Two-arm A/B experiment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Experiment {
    pub id: Uuid,
    pub name: String,
    /// Configuration served to users bucketed into A.
    #[schema(value_type = Object)]
    pub variant_a: serde_json::Value,
    #[schema(value_type = Object)]
    pub variant_b: serde_json::Value,
    /// Percentage of users assigned to A, in [0, 100].
    pub traffic_split: u8,
    pub is_active: bool,
    pub metrics: ExperimentMetrics,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Experiment {
    pub fn variant_config(&self, variant: Variant) -> &serde_json::Value {
        match variant {
            Variant::A => &self.variant_a,
            Variant::B => &self.variant_b,
        }
    }
}
