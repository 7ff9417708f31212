//! CSV dataset loading and population statistics
//!
//! Reads the historical crop dataset (one row per field observation),
//! optionally samples it down to a fixed size with a seeded RNG, and drops
//! rows with a missing field (empty, short or an NA marker). The header must
//! name all ten columns; extra columns are ignored.

use cropsim_core::{Attribute, Record, Scenario, TARGET_COLUMN};
use rand::seq::index;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::deterministic::seeded_rng;
use crate::errors::DatasetError;

/// Columns that must be present in the header
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "Region",
    "Soil_Type",
    "Crop",
    "Rainfall_mm",
    "Temperature_Celsius",
    "Fertilizer_Used",
    "Irrigation_Used",
    "Weather_Condition",
    "Days_to_Harvest",
    TARGET_COLUMN,
];

/// Dataset location and sampling
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub path: PathBuf,
    /// Sample down to this many rows when the file is larger
    pub max_records: Option<usize>,
    pub sample_seed: u64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("crop_yield.csv"),
            max_records: Some(40_000),
            sample_seed: 42,
        }
    }
}

/// Min/max/mean of one numeric column
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl ColumnStats {
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }

        (count > 0).then(|| Self {
            min,
            max,
            mean: sum / count as f64,
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Population statistics used for input bounds and report context
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub records: usize,
    pub rainfall_mm: ColumnStats,
    pub temperature_celsius: ColumnStats,
    pub days_to_harvest: ColumnStats,
    pub yield_tons_per_hectare: ColumnStats,
    /// Distinct values per categorical column, in first-appearance order
    pub vocabularies: BTreeMap<String, Vec<String>>,
}

/// Historical records, immutable once loaded
#[derive(Clone, Debug)]
pub struct Dataset {
    records: Vec<Record>,
    dropped_rows: usize,
}

impl Dataset {
    /// Load the dataset named by `config.path`
    pub fn load(config: &DatasetConfig) -> Result<Self, DatasetError> {
        info!("Loading dataset from: {}", config.path.display());
        let file = File::open(&config.path).map_err(|source| DatasetError::Open {
            path: config.path.display().to_string(),
            source,
        })?;
        Self::from_reader(file, config)
    }

    /// Load from a CSV file, using `config` only for sampling
    pub fn from_csv<P: AsRef<Path>>(path: P, config: &DatasetConfig) -> Result<Self, DatasetError> {
        Self::load(&DatasetConfig {
            path: path.as_ref().to_path_buf(),
            ..config.clone()
        })
    }

    /// Parse CSV from any reader
    pub fn from_reader<R: Read>(reader: R, config: &DatasetConfig) -> Result<Self, DatasetError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let mut columns = [0usize; REQUIRED_COLUMNS.len()];
        for (slot, name) in columns.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h == name)
                .ok_or(DatasetError::MissingColumn(name))?;
        }

        let mut rows = Vec::new();
        for row in rdr.records() {
            rows.push(row?);
        }
        let total_rows = rows.len();

        if let Some(max) = config.max_records {
            if rows.len() > max {
                let mut rng = seeded_rng(config.sample_seed);
                let picked = index::sample(&mut rng, rows.len(), max).into_vec();
                let mut slots: Vec<Option<csv::StringRecord>> = rows.into_iter().map(Some).collect();
                rows = picked.into_iter().filter_map(|i| slots[i].take()).collect();
                info!(
                    "Sampled {} of {} rows (seed {})",
                    max, total_rows, config.sample_seed
                );
            }
        }

        let mut records = Vec::with_capacity(rows.len());
        let mut dropped_rows = 0;
        for row in &rows {
            match parse_row(row, &columns)? {
                Some(record) => records.push(record),
                None => dropped_rows += 1,
            }
        }

        if records.is_empty() {
            return Err(DatasetError::Empty);
        }
        if dropped_rows > 0 {
            debug!("Dropped {} rows with missing fields", dropped_rows);
        }
        info!("Dataset: {} complete records", records.len());

        Ok(Self {
            records,
            dropped_rows,
        })
    }

    /// Wrap already-parsed records
    pub fn from_records(records: Vec<Record>) -> Result<Self, DatasetError> {
        if records.is_empty() {
            return Err(DatasetError::Empty);
        }
        Ok(Self {
            records,
            dropped_rows: 0,
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows discarded for having an empty field
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    pub fn targets(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.yield_tons_per_hectare).collect()
    }

    /// Distinct values of an attribute in first-appearance order
    pub fn vocabulary(&self, attribute: Attribute) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .map(|r| r.scenario.categorical(attribute))
            .filter(|v| seen.insert(*v))
            .collect()
    }

    /// Mean observed yield of one crop
    pub fn crop_mean_yield(&self, crop: &str) -> Option<f64> {
        ColumnStats::from_values(
            self.records
                .iter()
                .filter(|r| r.scenario.crop == crop)
                .map(|r| r.yield_tons_per_hectare),
        )
        .map(|s| s.mean)
    }

    pub fn summary(&self) -> DatasetSummary {
        let stats = |f: fn(&Record) -> f64| {
            ColumnStats::from_values(self.records.iter().map(f)).unwrap_or(ColumnStats {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
            })
        };

        let vocabularies = Attribute::ALL
            .iter()
            .map(|&a| {
                let values = self.vocabulary(a).into_iter().map(str::to_owned).collect();
                (a.column().to_string(), values)
            })
            .collect();

        DatasetSummary {
            records: self.records.len(),
            rainfall_mm: stats(|r| r.scenario.rainfall_mm),
            temperature_celsius: stats(|r| r.scenario.temperature_celsius),
            days_to_harvest: stats(|r| r.scenario.days_to_harvest),
            yield_tons_per_hectare: stats(|r| r.yield_tons_per_hectare),
            vocabularies,
        }
    }
}

/// Parse one row; `Ok(None)` when any field is empty
fn parse_row(row: &csv::StringRecord, columns: &[usize]) -> Result<Option<Record>, DatasetError> {
    let mut fields = [""; REQUIRED_COLUMNS.len()];
    for (slot, &col) in fields.iter_mut().zip(columns) {
        match row.get(col) {
            Some(value) if !is_missing(value) => *slot = value,
            _ => return Ok(None),
        }
    }

    let line = row.position().map_or(0, |p| p.line());
    let number = |i: usize| -> Result<f64, DatasetError> {
        fields[i]
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| DatasetError::InvalidValue {
                line,
                column: REQUIRED_COLUMNS[i],
                value: fields[i].to_string(),
            })
    };
    let flag = |i: usize| -> Result<bool, DatasetError> {
        parse_bool(fields[i]).ok_or_else(|| DatasetError::InvalidValue {
            line,
            column: REQUIRED_COLUMNS[i],
            value: fields[i].to_string(),
        })
    };

    let scenario = Scenario {
        region: fields[0].to_string(),
        soil_type: fields[1].to_string(),
        crop: fields[2].to_string(),
        rainfall_mm: number(3)?,
        temperature_celsius: number(4)?,
        fertilizer_used: flag(5)?,
        irrigation_used: flag(6)?,
        weather_condition: fields[7].to_string(),
        days_to_harvest: number(8)?,
    };

    Ok(Some(Record::new(scenario, number(9)?)))
}

/// Tokens read as a missing value, matching common CSV exports
const MISSING_MARKERS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_missing(value: &str) -> bool {
    MISSING_MARKERS.contains(&value)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "True" | "true" | "TRUE" | "1" => Some(true),
        "False" | "false" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}
