//! A/B testing service — experiment lifecycle, user bucketing and
//! metric tracking on top of an `ExperimentStore`.

use crate::models::{Assignment, CreateTestRequest};
use crate::store::ExperimentStore;
use chrono::Utc;
use market_core::experimentation::{assign_variant, ExperimentReport};
use market_core::types::{Experiment, ExperimentMetrics, Metric, Variant, VariantMetrics};
use market_core::{MarketError, MarketResult};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub struct AbTestingService {
    store: Arc<dyn ExperimentStore>,
}

impl AbTestingService {
    pub fn new(store: Arc<dyn ExperimentStore>) -> Self {
        Self { store }
    }

    pub fn create_test(&self, req: CreateTestRequest) -> MarketResult<Experiment> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(MarketError::Validation("name must not be empty".into()));
        }
        if req.traffic_split > 100 {
            return Err(MarketError::Validation(format!(
                "traffic_split must be within 0..=100, got {}",
                req.traffic_split
            )));
        }

        let now = Utc::now();
        let experiment = self.store.save(Experiment {
            id: Uuid::new_v4(),
            name: name.to_string(),
            variant_a: req.variant_a,
            variant_b: req.variant_b,
            traffic_split: req.traffic_split,
            is_active: req.is_active,
            metrics: ExperimentMetrics::default(),
            created_at: now,
            updated_at: now,
        })?;
        info!(
            experiment_id = %experiment.id,
            name = %experiment.name,
            traffic_split = experiment.traffic_split,
            "A/B test created"
        );
        Ok(experiment)
    }

    pub fn list_tests(&self) -> MarketResult<Vec<Experiment>> {
        self.store.list()
    }

    pub fn get_test(&self, id: &Uuid) -> MarketResult<Experiment> {
        self.store
            .find_by_id(id)?
            .ok_or_else(|| MarketError::not_found("experiment", id))
    }

    pub fn set_active(&self, id: &Uuid, is_active: bool) -> MarketResult<Experiment> {
        let mut experiment = self.get_test(id)?;
        experiment.is_active = is_active;
        let saved = self.store.save(experiment)?;
        info!(experiment_id = %id, is_active, "A/B test status changed");
        Ok(saved)
    }

    /// The experiment users are bucketed into: the earliest-created active one.
    pub fn active_test(&self) -> MarketResult<Option<Experiment>> {
        Ok(self.store.find_active()?.into_iter().next())
    }

    pub fn bucket_for(&self, user_id: &str, experiment: &Experiment) -> Variant {
        assign_variant(user_id, experiment.traffic_split)
    }

    /// Variant and configuration for a user, if any experiment is running.
    pub fn assignment(&self, user_id: &str) -> MarketResult<Option<Assignment>> {
        let Some(experiment) = self.active_test()? else {
            return Ok(None);
        };
        let variant = self.bucket_for(user_id, &experiment);
        debug!(user_id, experiment_id = %experiment.id, %variant, "User bucketed");
        Ok(Some(Assignment {
            experiment_id: experiment.id,
            name: experiment.name.clone(),
            variant,
            config: experiment.variant_config(variant).clone(),
        }))
    }

    pub fn track(&self, id: &Uuid, variant: Variant, metric: Metric) -> MarketResult<VariantMetrics> {
        let counters = self.store.increment_metric(id, variant, metric)?;
        metrics::counter!(
            "ab_testing.tracked",
            "variant" => variant.to_string(),
            "metric" => metric.as_str()
        )
        .increment(1);
        Ok(counters)
    }

    pub fn results(&self, id: &Uuid) -> MarketResult<ExperimentReport> {
        Ok(ExperimentReport::from(&self.get_test(id)?))
    }
}
