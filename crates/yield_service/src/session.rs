//! Simulation session: load once, fit once, simulate many scenarios

use cropsim_core::{Attribute, EconomicAnalyzer, Scenario};
use cropsim_trainer::{Dataset, DatasetSummary, FitMetrics};
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::errors::ServiceError;
use crate::report::{CropComparison, SimulationReport, StatusBand};
use crate::service::InferenceService;

/// A loaded dataset with a fitted service and economic analyzer
pub struct Session {
    dataset: Dataset,
    summary: DatasetSummary,
    service: InferenceService,
    analyzer: EconomicAnalyzer,
    metrics: FitMetrics,
}

impl Session {
    /// Load the configured dataset and fit the service on it
    pub fn start(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let dataset = Dataset::load(&config.dataset)?;
        Self::with_dataset(config, dataset)
    }

    /// Fit on an already loaded dataset
    pub fn with_dataset(config: &ServiceConfig, dataset: Dataset) -> Result<Self, ServiceError> {
        for warning in config.validate() {
            warn!("Config: {}", warning);
        }

        let mut service = InferenceService::new(config.model.clone());
        let metrics = service.fit(&dataset)?;
        info!(
            "Session ready: {} records, MAE={:.4}, R²={:.4}",
            dataset.len(),
            metrics.mean_absolute_error,
            metrics.r_squared
        );

        Ok(Self {
            summary: dataset.summary(),
            dataset,
            service,
            analyzer: config.economics.analyzer(),
            metrics,
        })
    }

    pub fn service(&self) -> &InferenceService {
        &self.service
    }

    pub fn metrics(&self) -> FitMetrics {
        self.metrics
    }

    /// Column ranges and vocabularies, computed once at start
    pub fn summary(&self) -> &DatasetSummary {
        &self.summary
    }

    /// Starting scenario: first seen category values, truncated column means
    /// and both practices enabled
    pub fn default_scenario(&self) -> Scenario {
        let summary = &self.summary;
        let first = |attribute: Attribute| {
            summary
                .vocabularies
                .get(attribute.column())
                .and_then(|values| values.first())
                .cloned()
                .unwrap_or_default()
        };

        Scenario {
            region: first(Attribute::Region),
            soil_type: first(Attribute::SoilType),
            crop: first(Attribute::Crop),
            weather_condition: first(Attribute::WeatherCondition),
            rainfall_mm: summary.rainfall_mm.mean.trunc(),
            temperature_celsius: summary.temperature_celsius.mean.trunc(),
            days_to_harvest: summary.days_to_harvest.mean.trunc(),
            fertilizer_used: true,
            irrigation_used: true,
        }
    }

    /// Numeric inputs that fall outside the observed dataset range
    pub fn out_of_range(&self, scenario: &Scenario) -> Vec<String> {
        let summary = &self.summary;
        [
            ("Rainfall_mm", scenario.rainfall_mm, summary.rainfall_mm),
            (
                "Temperature_Celsius",
                scenario.temperature_celsius,
                summary.temperature_celsius,
            ),
            ("Days_to_Harvest", scenario.days_to_harvest, summary.days_to_harvest),
        ]
        .into_iter()
        .filter(|(_, value, stats)| !stats.contains(*value))
        .map(|(column, value, stats)| {
            format!(
                "{} {} is outside the observed range [{}, {}]",
                column, value, stats.min, stats.max
            )
        })
        .collect()
    }

    /// Predict, rank and price one scenario
    pub fn simulate(&self, scenario: Scenario) -> Result<SimulationReport, ServiceError> {
        for warning in self.out_of_range(&scenario) {
            warn!("{}", warning);
        }
        let result = self.service.infer(&scenario)?;

        let economics = self.analyzer.analyze(
            &scenario.crop,
            result.prediction,
            scenario.fertilizer_used,
            scenario.irrigation_used,
        )?;

        let crop_comparison = self
            .dataset
            .crop_mean_yield(&scenario.crop)
            .map(|mean_yield| CropComparison {
                mean_yield,
                difference: result.prediction - mean_yield,
            });

        Ok(SimulationReport {
            scenario,
            prediction: result.prediction,
            percentile: result.percentile,
            status: StatusBand::from_percentile(result.percentile),
            crop_comparison,
            economics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::InferenceError;
    use cropsim_core::{EconomicsError, Record, UnknownCropPolicy};
    use cropsim_trainer::ForestConfig;

    fn scenario(crop: &str, rainfall: f64) -> Scenario {
        Scenario {
            region: "North".to_string(),
            soil_type: "Loam".to_string(),
            crop: crop.to_string(),
            weather_condition: "Sunny".to_string(),
            rainfall_mm: rainfall,
            temperature_celsius: 25.0,
            days_to_harvest: 120.0,
            fertilizer_used: true,
            irrigation_used: true,
        }
    }

    fn dataset() -> Dataset {
        let crops = ["Wheat", "Rice", "Sorghum"];
        let records = (0..60)
            .map(|i| {
                let rainfall = 300.0 + (i % 6) as f64 * 100.0;
                Record::new(scenario(crops[i % 3], rainfall), 2.0 + rainfall / 200.0)
            })
            .collect();
        Dataset::from_records(records).unwrap()
    }

    fn config() -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.model.forest = ForestConfig {
            n_estimators: 4,
            max_depth: 4,
            ..ForestConfig::default()
        };
        config
    }

    #[test]
    fn test_simulate_report() {
        let session = Session::with_dataset(&config(), dataset()).unwrap();
        let report = session.simulate(scenario("Wheat", 500.0)).unwrap();

        assert_eq!(report.status, StatusBand::from_percentile(report.percentile));
        assert_eq!(report.economics.priced_as, "Wheat");
        assert_eq!(report.economics.total_cost, 3300.0);

        let cmp = report.crop_comparison.unwrap();
        assert_eq!(cmp.mean_yield, 4.25);
        assert_eq!(cmp.difference, report.prediction - 4.25);
    }

    #[test]
    fn test_unpriced_crop_follows_policy() {
        let session = Session::with_dataset(&config(), dataset()).unwrap();
        assert!(matches!(
            session.simulate(scenario("Sorghum", 500.0)),
            Err(ServiceError::Economics(EconomicsError::UnknownCrop(_)))
        ));

        let mut fallback = config();
        fallback.economics.unknown_crop = UnknownCropPolicy::Fallback;
        let session = Session::with_dataset(&fallback, dataset()).unwrap();
        let report = session.simulate(scenario("Sorghum", 500.0)).unwrap();
        assert_eq!(report.economics.priced_as, "Corn");
    }

    #[test]
    fn test_unknown_category_is_inference_error() {
        let session = Session::with_dataset(&config(), dataset()).unwrap();
        assert!(matches!(
            session.simulate(scenario("Quinoa", 500.0)),
            Err(ServiceError::Inference(InferenceError::UnknownCategory { .. }))
        ));
    }

    #[test]
    fn test_default_scenario() {
        let session = Session::with_dataset(&config(), dataset()).unwrap();
        let scenario = session.default_scenario();

        assert_eq!(scenario.region, "North");
        assert_eq!(scenario.crop, "Wheat");
        assert_eq!(scenario.rainfall_mm, 550.0);
        assert!(scenario.fertilizer_used && scenario.irrigation_used);
        assert!(session.out_of_range(&scenario).is_empty());
        assert!(session.simulate(scenario).is_ok());
    }

    #[test]
    fn test_summary_matches_dataset() {
        let session = Session::with_dataset(&config(), dataset()).unwrap();
        let summary = session.summary();

        assert_eq!(summary, &dataset().summary());
        assert_eq!(summary.records, 60);
        assert_eq!(summary.rainfall_mm.min, 300.0);
        assert_eq!(summary.rainfall_mm.max, 800.0);
        assert_eq!(
            summary.vocabularies[Attribute::Crop.column()],
            vec!["Wheat", "Rice", "Sorghum"]
        );
    }

    #[test]
    fn test_out_of_range_inputs() {
        let session = Session::with_dataset(&config(), dataset()).unwrap();
        let warnings = session.out_of_range(&scenario("Wheat", 5000.0));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("Rainfall_mm 5000"));
    }

    #[test]
    fn test_missing_dataset_is_fatal() {
        let mut config = config();
        config.dataset.path = "no/such/file.csv".into();
        assert!(matches!(
            Session::start(&config),
            Err(ServiceError::Dataset(_))
        ));
    }
}
