//! Records, scenarios and the encoded feature layout
//!
//! Column names follow the historical dataset headers so a scenario can be
//! read from the same JSON keys the dataset uses.

use serde::{Deserialize, Serialize};

use crate::encoder::Attribute;

/// Number of model inputs per row
pub const FEATURE_COUNT: usize = 9;

/// Model input columns in encoded-row order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Region",
    "Soil_Type",
    "Crop",
    "Weather_Condition",
    "Rainfall_mm",
    "Temperature_Celsius",
    "Days_to_Harvest",
    "Fertilizer_Used",
    "Irrigation_Used",
];

/// Regression target column
pub const TARGET_COLUMN: &str = "Yield_tons_per_hectare";

/// One encoded model input row, laid out as [`FEATURE_NAMES`]
pub type FeatureRow = Vec<f64>;

/// A single candidate set of raw agronomic inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Soil_Type")]
    pub soil_type: String,
    #[serde(rename = "Crop")]
    pub crop: String,
    #[serde(rename = "Weather_Condition")]
    pub weather_condition: String,
    #[serde(rename = "Rainfall_mm")]
    pub rainfall_mm: f64,
    #[serde(rename = "Temperature_Celsius")]
    pub temperature_celsius: f64,
    #[serde(rename = "Days_to_Harvest")]
    pub days_to_harvest: f64,
    #[serde(rename = "Fertilizer_Used")]
    pub fertilizer_used: bool,
    #[serde(rename = "Irrigation_Used")]
    pub irrigation_used: bool,
}

impl Scenario {
    /// Raw value of a categorical attribute
    pub fn categorical(&self, attribute: Attribute) -> &str {
        match attribute {
            Attribute::Region => &self.region,
            Attribute::SoilType => &self.soil_type,
            Attribute::Crop => &self.crop,
            Attribute::WeatherCondition => &self.weather_condition,
        }
    }

    /// Numeric and boolean inputs in feature-row order (booleans as 0/1)
    pub fn pass_through(&self) -> [(&'static str, f64); 5] {
        [
            (FEATURE_NAMES[4], self.rainfall_mm),
            (FEATURE_NAMES[5], self.temperature_celsius),
            (FEATURE_NAMES[6], self.days_to_harvest),
            (FEATURE_NAMES[7], bool_code(self.fertilizer_used)),
            (FEATURE_NAMES[8], bool_code(self.irrigation_used)),
        ]
    }
}

/// One historical observation: a scenario plus its measured yield
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    #[serde(flatten)]
    pub scenario: Scenario,
    #[serde(rename = "Yield_tons_per_hectare")]
    pub yield_tons_per_hectare: f64,
}

impl Record {
    pub fn new(scenario: Scenario, yield_tons_per_hectare: f64) -> Self {
        Self {
            scenario,
            yield_tons_per_hectare,
        }
    }
}

fn bool_code(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}
