//! Inference service
//!
//! Holds the fitted model (encoding tables, forest and the sorted prediction
//! population) and answers single-scenario requests with a yield estimate and
//! its percentile within the historical population.

use cropsim_core::{EncodingTables, Forest, Scenario};
use cropsim_trainer::{train_from_dataset, Dataset, FitMetrics, ModelConfig, TrainerError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::InferenceError;

/// Estimate for one scenario
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Yield in tons per hectare
    pub prediction: f64,
    /// Share of the population at or below `prediction`, in [0, 100]
    pub percentile: f64,
}

/// Wire form of an inference answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InferenceResponse {
    Prediction { prediction: f64, percentile: f64 },
    Error { error: String },
}

impl From<Result<PredictionResult, InferenceError>> for InferenceResponse {
    fn from(result: Result<PredictionResult, InferenceError>) -> Self {
        match result {
            Ok(r) => InferenceResponse::Prediction {
                prediction: r.prediction,
                percentile: r.percentile,
            },
            Err(e) => InferenceResponse::Error {
                error: e.to_string(),
            },
        }
    }
}

/// Everything produced by a successful fit; read-only afterwards
#[derive(Debug)]
pub struct FittedModel {
    pub tables: EncodingTables,
    pub forest: Forest,
    pub metrics: FitMetrics,
    /// Predictions over every encoded dataset row, ascending
    population: Vec<f64>,
}

impl FittedModel {
    pub fn population(&self) -> &[f64] {
        &self.population
    }

    /// Percent of the population with a prediction at or below `value`
    pub fn percentile_of(&self, value: f64) -> f64 {
        percentile_rank(&self.population, value)
    }

    pub fn predict(&self, scenario: &Scenario) -> Result<PredictionResult, InferenceError> {
        let row = self.tables.encode_scenario(scenario)?;
        let prediction = self
            .forest
            .predict(&row)
            .map_err(|e| InferenceError::Generic(e.to_string()))?;

        Ok(PredictionResult {
            prediction,
            percentile: self.percentile_of(prediction),
        })
    }
}

/// Share of an ascending population at or below `value`, in [0, 100]
///
/// Ties count toward the rank.
pub fn percentile_rank(sorted: &[f64], value: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let at_or_below = sorted.partition_point(|p| *p <= value);
    at_or_below as f64 / sorted.len() as f64 * 100.0
}

#[derive(Debug, Clone)]
enum ServiceState {
    Untrained,
    Ready(Arc<FittedModel>),
}

/// Fit-once, infer-many yield service
#[derive(Debug, Clone)]
pub struct InferenceService {
    config: ModelConfig,
    state: ServiceState,
}

impl InferenceService {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            state: ServiceState::Untrained,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ServiceState::Ready(_))
    }

    /// Shared handle to the fitted model, if any
    pub fn snapshot(&self) -> Option<Arc<FittedModel>> {
        match &self.state {
            ServiceState::Ready(model) => Some(Arc::clone(model)),
            ServiceState::Untrained => None,
        }
    }

    /// Learn encodings, fit the forest and cache the prediction population
    ///
    /// A failed fit leaves the service in its previous state.
    pub fn fit(&mut self, dataset: &Dataset) -> Result<FitMetrics, TrainerError> {
        let run = train_from_dataset(dataset, &self.config)?;
        let metrics = run.metrics;

        let mut population = run.model.predict_batch(&run.features)?;
        population.sort_by(f64::total_cmp);
        debug!("Cached {} population predictions", population.len());

        let forest = run.model.into_forest().ok_or(TrainerError::NotFitted)?;
        info!(
            "Service ready: {} trees, hash {}",
            forest.len(),
            forest.hash_hex()?
        );

        self.state = ServiceState::Ready(Arc::new(FittedModel {
            tables: run.tables,
            forest,
            metrics,
            population,
        }));
        Ok(metrics)
    }

    pub fn infer(&self, scenario: &Scenario) -> Result<PredictionResult, InferenceError> {
        match &self.state {
            ServiceState::Ready(model) => model.predict(scenario),
            ServiceState::Untrained => Err(InferenceError::ModelNotReady),
        }
    }

    /// Parse a JSON request keyed by dataset column names and answer it
    pub fn infer_value(&self, request: serde_json::Value) -> InferenceResponse {
        let result = serde_json::from_value::<Scenario>(request)
            .map_err(InferenceError::from)
            .and_then(|scenario| self.infer(&scenario));
        result.into()
    }

    pub fn metrics(&self) -> Option<FitMetrics> {
        self.snapshot().map(|m| m.metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cropsim_core::Record;
    use cropsim_trainer::ForestConfig;
    use serde_json::json;

    fn scenario(region: &str, crop: &str, rainfall: f64, fertilizer: bool) -> Scenario {
        Scenario {
            region: region.to_string(),
            soil_type: "Loam".to_string(),
            crop: crop.to_string(),
            weather_condition: "Sunny".to_string(),
            rainfall_mm: rainfall,
            temperature_celsius: 25.0,
            days_to_harvest: 120.0,
            fertilizer_used: fertilizer,
            irrigation_used: true,
        }
    }

    fn dataset() -> Dataset {
        let records = (0..80)
            .map(|i| {
                let crop = if i % 2 == 0 { "Wheat" } else { "Rice" };
                let region = if i % 3 == 0 { "North" } else { "South" };
                let rainfall = 200.0 + (i % 10) as f64 * 60.0;
                let fertilizer = i % 4 < 2;
                let target = 2.0 + rainfall / 300.0 + if fertilizer { 1.0 } else { 0.0 };
                Record::new(scenario(region, crop, rainfall, fertilizer), target)
            })
            .collect();
        Dataset::from_records(records).unwrap()
    }

    fn config() -> ModelConfig {
        ModelConfig {
            forest: ForestConfig {
                n_estimators: 5,
                max_depth: 5,
                ..ForestConfig::default()
            },
            ..ModelConfig::default()
        }
    }

    fn fitted() -> InferenceService {
        let mut service = InferenceService::new(config());
        service.fit(&dataset()).unwrap();
        service
    }

    #[test]
    fn test_not_ready_before_fit() {
        let service = InferenceService::new(config());
        assert!(!service.is_ready());
        assert_eq!(
            service.infer(&scenario("North", "Wheat", 300.0, true)),
            Err(InferenceError::ModelNotReady)
        );
        assert!(service.snapshot().is_none());
    }

    #[test]
    fn test_infer_known_scenario() {
        let service = fitted();
        assert!(service.is_ready());

        let result = service.infer(&scenario("North", "Wheat", 500.0, true)).unwrap();
        assert!(result.prediction.is_finite());
        assert!((0.0..=100.0).contains(&result.percentile));
    }

    #[test]
    fn test_unknown_category() {
        let service = fitted();
        let err = service
            .infer(&scenario("Atlantis", "Wheat", 500.0, true))
            .unwrap_err();
        assert!(matches!(err, InferenceError::UnknownCategory { .. }));
    }

    #[test]
    fn test_percentile_of_population() {
        let service = fitted();
        let model = service.snapshot().unwrap();
        let population = model.population();

        assert_eq!(population.len(), 80);
        assert!(population.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(model.percentile_of(population[population.len() - 1]), 100.0);
        assert_eq!(model.percentile_of(population[0] - 1.0), 0.0);
    }

    #[test]
    fn test_percentile_rank_counts_ties() {
        let population = [1.0, 2.0, 2.0, 2.0, 3.0];

        assert_eq!(percentile_rank(&population, 0.5), 0.0);
        assert_eq!(percentile_rank(&population, 1.0), 20.0);
        assert_eq!(percentile_rank(&population, 1.5), 20.0);
        assert_eq!(percentile_rank(&population, 2.0), 80.0);
        assert_eq!(percentile_rank(&population, 3.0), 100.0);
        assert_eq!(percentile_rank(&[], 3.0), 0.0);
    }

    #[test]
    fn test_population_ties_share_a_percentile() {
        let service = fitted();
        let model = service.snapshot().unwrap();
        let population = model.population();

        // Rows with identical inputs give identical predictions
        let tied = population
            .windows(2)
            .position(|w| w[0] == w[1])
            .map(|i| population[i])
            .unwrap();
        let count_at_or_below = population.iter().filter(|p| **p <= tied).count();
        assert_eq!(
            model.percentile_of(tied),
            count_at_or_below as f64 / population.len() as f64 * 100.0
        );
    }

    #[test]
    fn test_failed_fit_keeps_state() {
        let mut service = InferenceService::new(ModelConfig {
            test_fraction: 0.0,
            ..config()
        });
        assert!(service.fit(&dataset()).is_err());
        assert!(!service.is_ready());
    }

    #[test]
    fn test_infer_value_responses() {
        let service = fitted();

        let ok = service.infer_value(json!({
            "Region": "North",
            "Soil_Type": "Loam",
            "Crop": "Rice",
            "Weather_Condition": "Sunny",
            "Rainfall_mm": 400.0,
            "Temperature_Celsius": 25.0,
            "Days_to_Harvest": 120,
            "Fertilizer_Used": false,
            "Irrigation_Used": true
        }));
        assert!(matches!(ok, InferenceResponse::Prediction { .. }));

        let malformed = service.infer_value(json!({ "Region": "North" }));
        match malformed {
            InferenceResponse::Error { error } => assert!(error.starts_with("malformed request")),
            other => panic!("unexpected response: {other:?}"),
        }

        let unknown = serde_json::to_value(service.infer_value(json!({
            "Region": "North",
            "Soil_Type": "Loam",
            "Crop": "Quinoa",
            "Weather_Condition": "Sunny",
            "Rainfall_mm": 400.0,
            "Temperature_Celsius": 25.0,
            "Days_to_Harvest": 120,
            "Fertilizer_Used": false,
            "Irrigation_Used": true
        })))
        .unwrap();
        assert!(unknown["error"].as_str().unwrap().contains("Quinoa"));
    }
}
