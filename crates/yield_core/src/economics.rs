//! Per-hectare economics for a crop scenario
//!
//! Costs and prices come from a static table keyed by crop name. Revenue is
//! the predicted yield times the crop's price per ton; fertilizer and
//! irrigation costs only apply when the practice is used.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::EconomicsError;

/// Crop whose table is used when fallback is enabled
pub const DEFAULT_CROP: &str = "Corn";

/// Cost and price entry for one crop (currency per hectare / per ton)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropEconomics {
    pub base_cost: f64,
    pub fertilizer_cost: f64,
    pub irrigation_cost: f64,
    pub price_per_ton: f64,
}

impl CropEconomics {
    pub const fn new(
        base_cost: f64,
        fertilizer_cost: f64,
        irrigation_cost: f64,
        price_per_ton: f64,
    ) -> Self {
        Self {
            base_cost,
            fertilizer_cost,
            irrigation_cost,
            price_per_ton,
        }
    }
}

/// What to do with a crop that has no table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCropPolicy {
    /// Return `EconomicsError::UnknownCrop`
    #[default]
    Reject,
    /// Price the crop with the default crop's entry
    Fallback,
}

/// Return-on-investment verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoiBand {
    Excellent,
    Good,
    Moderate,
    Loss,
}

impl RoiBand {
    pub fn from_roi(roi_percent: f64) -> Self {
        if roi_percent > 30.0 {
            RoiBand::Excellent
        } else if roi_percent > 15.0 {
            RoiBand::Good
        } else if roi_percent > 0.0 {
            RoiBand::Moderate
        } else {
            RoiBand::Loss
        }
    }
}

impl fmt::Display for RoiBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RoiBand::Excellent => "excellent return",
            RoiBand::Good => "good return",
            RoiBand::Moderate => "moderate return",
            RoiBand::Loss => "estimated loss",
        };
        f.write_str(label)
    }
}

/// Profit margin verdict (only defined when profitable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginBand {
    Excellent,
    Good,
    Tight,
}

impl MarginBand {
    pub fn from_margin(margin_percent: f64) -> Self {
        if margin_percent > 25.0 {
            MarginBand::Excellent
        } else if margin_percent > 15.0 {
            MarginBand::Good
        } else {
            MarginBand::Tight
        }
    }
}

impl fmt::Display for MarginBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MarginBand::Excellent => "excellent margin",
            MarginBand::Good => "good margin",
            MarginBand::Tight => "tight margin",
        };
        f.write_str(label)
    }
}

/// Economic viability of one scenario, per hectare
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicReport {
    /// Crop as requested
    pub crop: String,
    /// Table entry actually used (differs from `crop` after a fallback)
    pub priced_as: String,
    pub yield_tons_per_hectare: f64,
    pub price_per_ton: f64,
    pub base_cost: f64,
    /// Zero when fertilizer is not used
    pub fertilizer_cost: f64,
    /// Zero when irrigation is not used
    pub irrigation_cost: f64,
    pub total_cost: f64,
    pub revenue: f64,
    pub profit: f64,
    pub roi_percent: f64,
    /// Only present when profit is positive
    pub margin_percent: Option<f64>,
    pub roi_band: RoiBand,
    pub margin_band: Option<MarginBand>,
}

/// Lookup-and-arithmetic analyzer over the crop table
#[derive(Debug, Clone)]
pub struct EconomicAnalyzer {
    table: BTreeMap<String, CropEconomics>,
    policy: UnknownCropPolicy,
    default_crop: String,
}

impl Default for EconomicAnalyzer {
    fn default() -> Self {
        Self::new(UnknownCropPolicy::default())
    }
}

impl EconomicAnalyzer {
    /// Analyzer over the standard crop table
    pub fn new(policy: UnknownCropPolicy) -> Self {
        let corn = CropEconomics::new(2800.0, 900.0, 500.0, 600.0);
        let soybeans = CropEconomics::new(2600.0, 500.0, 450.0, 1500.0);

        let table = [
            ("Rice", CropEconomics::new(2500.0, 800.0, 600.0, 1200.0)),
            ("Wheat", CropEconomics::new(2200.0, 700.0, 400.0, 800.0)),
            ("Corn", corn),
            ("Maize", corn),
            ("Barley", CropEconomics::new(2000.0, 600.0, 300.0, 700.0)),
            ("Soybeans", soybeans),
            ("Soybean", soybeans),
            ("Cotton", CropEconomics::new(3500.0, 1200.0, 800.0, 3200.0)),
        ]
        .into_iter()
        .map(|(crop, entry)| (crop.to_string(), entry))
        .collect();

        Self {
            table,
            policy,
            default_crop: DEFAULT_CROP.to_string(),
        }
    }

    /// Use a different crop's entry for fallback pricing
    pub fn with_default_crop(mut self, crop: impl Into<String>) -> Self {
        self.default_crop = crop.into();
        self
    }

    pub fn policy(&self) -> UnknownCropPolicy {
        self.policy
    }

    pub fn known_crops(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    /// Resolve the table entry for a crop, applying the unknown-crop policy
    pub fn lookup(&self, crop: &str) -> Result<(&str, &CropEconomics), EconomicsError> {
        if let Some((name, entry)) = self.table.get_key_value(crop) {
            return Ok((name.as_str(), entry));
        }

        match self.policy {
            UnknownCropPolicy::Reject => Err(EconomicsError::UnknownCrop(crop.to_string())),
            UnknownCropPolicy::Fallback => {
                tracing::warn!(
                    "No cost table for crop {:?}; pricing as {}",
                    crop,
                    self.default_crop
                );
                self.table
                    .get_key_value(&self.default_crop)
                    .map(|(name, entry)| (name.as_str(), entry))
                    .ok_or_else(|| EconomicsError::UnknownCrop(crop.to_string()))
            }
        }
    }

    /// Build the economic report for one scenario
    pub fn analyze(
        &self,
        crop: &str,
        yield_tons_per_hectare: f64,
        fertilizer_used: bool,
        irrigation_used: bool,
    ) -> Result<EconomicReport, EconomicsError> {
        let (priced_as, entry) = self.lookup(crop)?;

        let fertilizer_cost = if fertilizer_used {
            entry.fertilizer_cost
        } else {
            0.0
        };
        let irrigation_cost = if irrigation_used {
            entry.irrigation_cost
        } else {
            0.0
        };
        let total_cost = entry.base_cost + fertilizer_cost + irrigation_cost;

        let revenue = yield_tons_per_hectare * entry.price_per_ton;
        let profit = revenue - total_cost;
        let roi_percent = if total_cost > 0.0 {
            profit / total_cost * 100.0
        } else {
            0.0
        };
        let margin_percent = (profit > 0.0).then(|| profit / revenue * 100.0);

        Ok(EconomicReport {
            crop: crop.to_string(),
            priced_as: priced_as.to_string(),
            yield_tons_per_hectare,
            price_per_ton: entry.price_per_ton,
            base_cost: entry.base_cost,
            fertilizer_cost,
            irrigation_cost,
            total_cost,
            revenue,
            profit,
            roi_percent,
            margin_percent,
            roi_band: RoiBand::from_roi(roi_percent),
            margin_band: margin_percent.map(MarginBand::from_margin),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn cotton_with_both_practices() {
        let report = EconomicAnalyzer::default()
            .analyze("Cotton", 3.0, true, true)
            .unwrap();

        assert_eq!(report.total_cost, 5500.0);
        assert_eq!(report.revenue, 9600.0);
        assert_eq!(report.profit, 4100.0);
        assert!((report.roi_percent - 74.545).abs() < 0.01);
        assert_eq!(report.roi_band, RoiBand::Excellent);

        let margin = report.margin_percent.unwrap();
        assert!((margin - 42.708).abs() < 0.01);
        assert_eq!(report.margin_band, Some(MarginBand::Excellent));
    }

    #[test]
    fn practices_off_only_base_cost() {
        let report = EconomicAnalyzer::default()
            .analyze("Wheat", 2.0, false, false)
            .unwrap();

        assert_eq!(report.fertilizer_cost, 0.0);
        assert_eq!(report.irrigation_cost, 0.0);
        assert_eq!(report.total_cost, 2200.0);
        assert_eq!(report.revenue, 1600.0);
        assert_eq!(report.profit, -600.0);
        assert_eq!(report.margin_percent, None);
        assert_eq!(report.margin_band, None);
        assert_eq!(report.roi_band, RoiBand::Loss);
    }

    #[test]
    fn aliases_share_entries() {
        let analyzer = EconomicAnalyzer::default();
        let corn = analyzer.analyze("Corn", 5.0, true, false).unwrap();
        let maize = analyzer.analyze("Maize", 5.0, true, false).unwrap();
        assert_eq!(corn.total_cost, maize.total_cost);
        assert_eq!(corn.revenue, maize.revenue);
    }

    #[test]
    fn unknown_crop_rejected_by_default() {
        let err = EconomicAnalyzer::default()
            .analyze("Sorghum", 3.0, true, true)
            .unwrap_err();
        assert_eq!(err, EconomicsError::UnknownCrop("Sorghum".into()));
    }

    #[test]
    fn unknown_crop_fallback_prices_as_default() {
        let report = EconomicAnalyzer::new(UnknownCropPolicy::Fallback)
            .analyze("Sorghum", 3.0, true, true)
            .unwrap();

        assert_eq!(report.crop, "Sorghum");
        assert_eq!(report.priced_as, "Corn");
        assert_eq!(report.total_cost, 4200.0);
        assert_eq!(report.price_per_ton, 600.0);
    }

    #[test]
    fn roi_bands() {
        assert_eq!(RoiBand::from_roi(30.5), RoiBand::Excellent);
        assert_eq!(RoiBand::from_roi(30.0), RoiBand::Good);
        assert_eq!(RoiBand::from_roi(10.0), RoiBand::Moderate);
        assert_eq!(RoiBand::from_roi(0.0), RoiBand::Loss);
        assert_eq!(MarginBand::from_margin(20.0), MarginBand::Good);
        assert_eq!(MarginBand::from_margin(15.0), MarginBand::Tight);
    }

    proptest! {
        #[test]
        fn report_arithmetic_is_consistent(
            yield_tons in 0.0f64..15.0,
            fertilizer in any::<bool>(),
            irrigation in any::<bool>(),
            crop_idx in 0usize..8,
        ) {
            let analyzer = EconomicAnalyzer::default();
            let crop = analyzer.known_crops().nth(crop_idx).unwrap().to_string();
            let report = analyzer.analyze(&crop, yield_tons, fertilizer, irrigation).unwrap();

            prop_assert!((report.profit - (report.revenue - report.total_cost)).abs() < 1e-9);
            prop_assert!(report.total_cost >= report.base_cost);
            prop_assert_eq!(report.margin_percent.is_some(), report.profit > 0.0);
            prop_assert_eq!(report.roi_percent > 0.0, report.profit > 0.0);
            if let Some(margin) = report.margin_percent {
                prop_assert!(margin > 0.0 && margin <= 100.0);
            }
        }
    }
}
