//! Categorical feature encoding
//!
//! Each categorical attribute gets a table mapping its observed values to
//! integer codes. Tables are built once from the training records and are
//! then frozen: encoding a value that was never observed is an error rather
//! than a fresh code, so a fitted forest never sees a code it was not
//! trained on.
//!
//! Codes are assigned in lexicographic order of the distinct values, which
//! makes the tables independent of record order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::errors::EncodingError;
use crate::features::{FeatureRow, Record, Scenario, FEATURE_COUNT};

/// Categorical input attributes, in feature-row order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Region,
    SoilType,
    Crop,
    WeatherCondition,
}

impl Attribute {
    pub const ALL: [Attribute; 4] = [
        Attribute::Region,
        Attribute::SoilType,
        Attribute::Crop,
        Attribute::WeatherCondition,
    ];

    /// Dataset column holding this attribute
    pub fn column(self) -> &'static str {
        match self {
            Attribute::Region => "Region",
            Attribute::SoilType => "Soil_Type",
            Attribute::Crop => "Crop",
            Attribute::WeatherCondition => "Weather_Condition",
        }
    }

    /// Position of this attribute in an encoded feature row
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Value-to-code mapping for one attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingTable {
    attribute: Attribute,
    codes: BTreeMap<String, u32>,
    classes: Vec<String>,
}

impl EncodingTable {
    /// Build a table from the distinct values of an attribute
    pub fn fit<'a, I>(attribute: Attribute, values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let distinct: BTreeSet<&str> = values.into_iter().collect();
        let classes: Vec<String> = distinct.into_iter().map(str::to_owned).collect();
        let codes = classes
            .iter()
            .enumerate()
            .map(|(code, value)| (value.clone(), code as u32))
            .collect();

        Self {
            attribute,
            codes,
            classes,
        }
    }

    pub fn attribute(&self) -> Attribute {
        self.attribute
    }

    pub fn encode(&self, value: &str) -> Result<u32, EncodingError> {
        self.codes
            .get(value)
            .copied()
            .ok_or_else(|| EncodingError::UnknownCategory {
                attribute: self.attribute,
                value: value.to_owned(),
            })
    }

    pub fn decode(&self, code: u32) -> Result<&str, EncodingError> {
        self.classes
            .get(code as usize)
            .map(String::as_str)
            .ok_or(EncodingError::UnknownCode {
                attribute: self.attribute,
                code,
            })
    }

    pub fn contains(&self, value: &str) -> bool {
        self.codes.contains_key(value)
    }

    /// Known values in code order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// One encoding table per categorical attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingTables {
    tables: Vec<EncodingTable>,
}

impl EncodingTables {
    pub fn table(&self, attribute: Attribute) -> &EncodingTable {
        &self.tables[attribute.index()]
    }

    pub fn encode(&self, attribute: Attribute, value: &str) -> Result<u32, EncodingError> {
        self.table(attribute).encode(value)
    }

    /// Encode a raw scenario into a feature row
    pub fn encode_scenario(&self, scenario: &Scenario) -> Result<FeatureRow, EncodingError> {
        let mut row = Vec::with_capacity(FEATURE_COUNT);

        for attribute in Attribute::ALL {
            let code = self.encode(attribute, scenario.categorical(attribute))?;
            row.push(code as f64);
        }

        for (column, value) in scenario.pass_through() {
            if !value.is_finite() {
                return Err(EncodingError::NonFiniteValue { column, value });
            }
            row.push(value);
        }

        Ok(row)
    }

    /// Encode every record, preserving order
    pub fn encode_records(&self, records: &[Record]) -> Result<Vec<FeatureRow>, EncodingError> {
        records
            .iter()
            .map(|record| self.encode_scenario(&record.scenario))
            .collect()
    }
}

/// Learns encoding tables from training records
pub struct FeatureEncoder;

impl FeatureEncoder {
    pub fn fit(records: &[Record]) -> EncodingTables {
        let tables = Attribute::ALL
            .iter()
            .map(|&attribute| {
                let table = EncodingTable::fit(
                    attribute,
                    records.iter().map(|r| r.scenario.categorical(attribute)),
                );
                tracing::debug!("Encoded {}: {} classes", attribute, table.len());
                table
            })
            .collect();

        EncodingTables { tables }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(region: &str, soil: &str, crop: &str, weather: &str) -> Record {
        Record::new(
            Scenario {
                region: region.into(),
                soil_type: soil.into(),
                crop: crop.into(),
                weather_condition: weather.into(),
                rainfall_mm: 500.0,
                temperature_celsius: 22.5,
                days_to_harvest: 110.0,
                fertilizer_used: true,
                irrigation_used: false,
            },
            4.2,
        )
    }

    fn sample_records() -> Vec<Record> {
        vec![
            record("West", "Sandy", "Rice", "Rainy"),
            record("North", "Clay", "Wheat", "Sunny"),
            record("East", "Loam", "Cotton", "Cloudy"),
            record("North", "Sandy", "Rice", "Sunny"),
        ]
    }

    #[test]
    fn codes_follow_sorted_order() {
        let tables = FeatureEncoder::fit(&sample_records());
        let region = tables.table(Attribute::Region);

        assert_eq!(region.classes(), &["East", "North", "West"]);
        assert_eq!(region.encode("East").unwrap(), 0);
        assert_eq!(region.encode("North").unwrap(), 1);
        assert_eq!(region.encode("West").unwrap(), 2);
    }

    #[test]
    fn tables_ignore_record_order() {
        let mut reversed = sample_records();
        reversed.reverse();

        assert_eq!(
            FeatureEncoder::fit(&sample_records()),
            FeatureEncoder::fit(&reversed)
        );
    }

    #[test]
    fn unknown_value_is_rejected() {
        let tables = FeatureEncoder::fit(&sample_records());
        let err = tables.encode(Attribute::Crop, "Barley").unwrap_err();

        assert_eq!(
            err,
            EncodingError::UnknownCategory {
                attribute: Attribute::Crop,
                value: "Barley".into(),
            }
        );
        assert!(err.to_string().contains("Crop"));
    }

    #[test]
    fn encoding_is_stable_across_calls() {
        let tables = FeatureEncoder::fit(&sample_records());
        let first = tables.encode(Attribute::SoilType, "Sandy").unwrap();
        for _ in 0..10 {
            assert_eq!(tables.encode(Attribute::SoilType, "Sandy").unwrap(), first);
        }
        assert_eq!(tables.table(Attribute::SoilType).decode(first).unwrap(), "Sandy");
    }

    #[test]
    fn encode_scenario_layout() {
        let records = sample_records();
        let tables = FeatureEncoder::fit(&records);
        let row = tables.encode_scenario(&records[1].scenario).unwrap();

        // North, Clay, Wheat, Sunny
        assert_eq!(row, vec![1.0, 0.0, 2.0, 2.0, 500.0, 22.5, 110.0, 1.0, 0.0]);
    }

    #[test]
    fn encode_scenario_rejects_nan() {
        let records = sample_records();
        let tables = FeatureEncoder::fit(&records);
        let mut scenario = records[0].scenario.clone();
        scenario.rainfall_mm = f64::NAN;

        assert!(matches!(
            tables.encode_scenario(&scenario),
            Err(EncodingError::NonFiniteValue { column: "Rainfall_mm", .. })
        ));
    }

    #[test]
    fn decode_out_of_range() {
        let tables = FeatureEncoder::fit(&sample_records());
        assert!(tables
            .table(Attribute::WeatherCondition)
            .decode(99)
            .is_err());
    }
}
