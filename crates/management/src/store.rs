//! Experiment persistence.
//!
//! Counters change only through `increment_metric`, which applies the
//! read-modify-write under the record's lock so concurrent tracking never
//! loses an update. `save` never overwrites the counters of an existing record.

use chrono::Utc;
use dashmap::DashMap;
use market_core::types::{Experiment, Metric, Variant, VariantMetrics};
use market_core::{MarketError, MarketResult};
use tracing::info;
use uuid::Uuid;

pub trait ExperimentStore: Send + Sync {
    /// Active experiments ordered by `created_at` ascending, then id.
    fn find_active(&self) -> MarketResult<Vec<Experiment>>;

    fn find_by_id(&self, id: &Uuid) -> MarketResult<Option<Experiment>>;

    /// All experiments, newest first.
    fn list(&self) -> MarketResult<Vec<Experiment>>;

    /// Insert or update definition fields (name, variants, split, active flag).
    fn save(&self, experiment: Experiment) -> MarketResult<Experiment>;

    /// Atomically add one to `metrics[variant][metric]` of an active experiment.
    /// Returns the variant's counters after the increment.
    fn increment_metric(
        &self,
        id: &Uuid,
        variant: Variant,
        metric: Metric,
    ) -> MarketResult<VariantMetrics>;
}

/// In-memory experiment store backed by DashMap.
///
/// Production: replace with a relational table and an `UPDATE ... SET
/// metrics = jsonb_set(...)` increment expression.
pub struct InMemoryExperimentStore {
    experiments: DashMap<Uuid, Experiment>,
}

impl InMemoryExperimentStore {
    pub fn new() -> Self {
        info!("Experiment store initialized (in-memory, development mode)");
        Self {
            experiments: DashMap::new(),
        }
    }
}

impl Default for InMemoryExperimentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ExperimentStore for InMemoryExperimentStore {
    fn find_active(&self) -> MarketResult<Vec<Experiment>> {
        let mut active: Vec<Experiment> = self
            .experiments
            .iter()
            .filter(|r| r.value().is_active)
            .map(|r| r.value().clone())
            .collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(active)
    }

    fn find_by_id(&self, id: &Uuid) -> MarketResult<Option<Experiment>> {
        Ok(self.experiments.get(id).map(|r| r.value().clone()))
    }

    fn list(&self) -> MarketResult<Vec<Experiment>> {
        let mut all: Vec<Experiment> = self.experiments.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    fn save(&self, experiment: Experiment) -> MarketResult<Experiment> {
        let saved = match self.experiments.get_mut(&experiment.id) {
            Some(mut entry) => {
                let stored = entry.value_mut();
                stored.name = experiment.name;
                stored.variant_a = experiment.variant_a;
                stored.variant_b = experiment.variant_b;
                stored.traffic_split = experiment.traffic_split;
                stored.is_active = experiment.is_active;
                stored.updated_at = Utc::now();
                stored.clone()
            }
            None => {
                self.experiments.insert(experiment.id, experiment.clone());
                experiment
            }
        };
        Ok(saved)
    }

    fn increment_metric(
        &self,
        id: &Uuid,
        variant: Variant,
        metric: Metric,
    ) -> MarketResult<VariantMetrics> {
        // get_mut holds the shard write lock for the whole read-modify-write.
        let mut entry = self
            .experiments
            .get_mut(id)
            .ok_or_else(|| MarketError::not_found("experiment", id))?;
        if !entry.is_active {
            return Err(MarketError::NotFound(format!("active experiment {id}")));
        }
        let counters = entry.metrics.variant_mut(variant);
        counters.increment(metric);
        Ok(*counters)
    }
}
