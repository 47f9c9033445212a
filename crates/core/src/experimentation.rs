//! A/B bucketing and experiment reporting.
//!
//! Assignment must stay bit-compatible with existing clients, so the hash
//! reproduces 32-bit signed wraparound arithmetic over UTF-16 code units.

use crate::types::{Experiment, Variant, VariantMetrics};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// `hash = (hash << 5) - hash + unit` over UTF-16 code units, folded to i32.
pub fn user_hash(user_id: &str) -> i32 {
    user_id.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}

/// Stable bucket in [0, 100) for a user.
pub fn bucket_for(user_id: &str) -> u32 {
    // unsigned_abs keeps i32::MIN at 2^31 instead of overflowing.
    user_hash(user_id).unsigned_abs() % 100
}

/// `A` when the user's bucket falls below the traffic split, otherwise `B`.
pub fn assign_variant(user_id: &str, traffic_split: u8) -> Variant {
    if bucket_for(user_id) < u32::from(traffic_split) {
        Variant::A
    } else {
        Variant::B
    }
}

/// `numerator / denominator * 100` with two decimals; "0.00" on a zero denominator.
pub fn format_rate(numerator: u64, denominator: u64) -> String {
    if denominator == 0 {
        return "0.00".to_string();
    }
    format!("{:.2}", numerator as f64 / denominator as f64 * 100.0)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct VariantReport {
    pub views: u64,
    pub clicks: u64,
    pub conversions: u64,
    /// clicks / views, percent.
    pub ctr: String,
    /// conversions / clicks, percent.
    pub conversion_rate: String,
}

impl From<&VariantMetrics> for VariantReport {
    fn from(m: &VariantMetrics) -> Self {
        Self {
            views: m.views,
            clicks: m.clicks,
            conversions: m.conversions,
            ctr: format_rate(m.clicks, m.views),
            conversion_rate: format_rate(m.conversions, m.clicks),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct VariantReports {
    #[serde(rename = "A")]
    pub a: VariantReport,
    #[serde(rename = "B")]
    pub b: VariantReport,
}

/// Results document served by the admin reporting endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ExperimentReport {
    pub experiment_id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub traffic_split: u8,
    pub variants: VariantReports,
}

impl From<&Experiment> for ExperimentReport {
    fn from(experiment: &Experiment) -> Self {
        Self {
            experiment_id: experiment.id,
            name: experiment.name.clone(),
            is_active: experiment.is_active,
            traffic_split: experiment.traffic_split,
            variants: VariantReports {
                a: VariantReport::from(&experiment.metrics.a),
                b: VariantReport::from(&experiment.metrics.b),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExperimentMetrics;
    use chrono::Utc;

    const SAMPLE_IDS: [&str; 6] = ["user-42", "user-1", "user-7", "alice", "bob@example.com", "a"];

    #[test]
    fn test_golden_hashes() {
        assert_eq!(user_hash(""), 0);
        assert_eq!(user_hash("a"), 97);
        assert_eq!(user_hash("alice"), 92_903_040);
        assert_eq!(user_hash("user-42"), -147_182_656);
        assert_eq!(user_hash("user-1"), -836_031_825);
    }

    #[test]
    fn test_golden_buckets() {
        assert_eq!(bucket_for("user-42"), 56);
        assert_eq!(bucket_for("user-1"), 25);
        assert_eq!(bucket_for("user-7"), 19);
        assert_eq!(bucket_for("alice"), 40);
        assert_eq!(bucket_for("bob@example.com"), 42);
        assert_eq!(bucket_for("550e8400-e29b-41d4-a716-446655440000"), 5);
        // Non-ASCII hashes by UTF-16 code unit.
        assert_eq!(bucket_for("héllo"), 34);
    }

    #[test]
    fn test_golden_assignments_at_half_split() {
        assert_eq!(assign_variant("user-42", 50), Variant::B);
        assert_eq!(assign_variant("user-1", 50), Variant::A);
        assert_eq!(assign_variant("alice", 50), Variant::A);
    }

    #[test]
    fn test_assignment_is_deterministic() {
        for id in SAMPLE_IDS {
            let first = assign_variant(id, 37);
            for _ in 0..10 {
                assert_eq!(assign_variant(id, 37), first);
            }
        }
    }

    #[test]
    fn test_split_boundaries() {
        for id in SAMPLE_IDS {
            assert_eq!(assign_variant(id, 0), Variant::B);
            assert_eq!(assign_variant(id, 100), Variant::A);
        }
    }

    #[test]
    fn test_split_monotonicity() {
        for id in SAMPLE_IDS {
            let mut seen_a = false;
            for split in 0..=100u8 {
                let variant = assign_variant(id, split);
                if seen_a {
                    assert_eq!(variant, Variant::A, "{id} moved A->B at split {split}");
                }
                seen_a |= variant == Variant::A;
            }
        }
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(0, 0), "0.00");
        assert_eq!(format_rate(25, 200), "12.50");
        assert_eq!(format_rate(1, 3), "33.33");
        assert_eq!(format_rate(5, 0), "0.00");
    }

    #[test]
    fn test_experiment_report() {
        let mut metrics = ExperimentMetrics::default();
        metrics.a = VariantMetrics { views: 200, clicks: 25, conversions: 5 };
        let experiment = Experiment {
            id: Uuid::new_v4(),
            name: "hero-banner".into(),
            variant_a: serde_json::json!({"layout": "grid"}),
            variant_b: serde_json::json!({"layout": "list"}),
            traffic_split: 50,
            is_active: true,
            metrics,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let report = ExperimentReport::from(&experiment);
        assert_eq!(report.variants.a.ctr, "12.50");
        assert_eq!(report.variants.a.conversion_rate, "20.00");
        assert_eq!(report.variants.b.ctr, "0.00");
        assert_eq!(report.variants.b.conversion_rate, "0.00");
    }
}
