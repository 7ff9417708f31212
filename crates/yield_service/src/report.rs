//! Simulation report and its text rendering

use cropsim_core::{EconomicReport, Scenario};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a prediction sits within the historical population
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusBand {
    Low,
    Moderate,
    Good,
    Excellent,
}

impl StatusBand {
    pub fn from_percentile(percentile: f64) -> Self {
        if percentile < 25.0 {
            StatusBand::Low
        } else if percentile < 50.0 {
            StatusBand::Moderate
        } else if percentile < 75.0 {
            StatusBand::Good
        } else {
            StatusBand::Excellent
        }
    }
}

impl fmt::Display for StatusBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatusBand::Low => "Low",
            StatusBand::Moderate => "Moderate",
            StatusBand::Good => "Good",
            StatusBand::Excellent => "Excellent",
        };
        f.write_str(label)
    }
}

/// Comparison with the crop's observed average
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropComparison {
    pub mean_yield: f64,
    /// Prediction minus the mean
    pub difference: f64,
}

/// Everything shown to the user for one simulated scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub scenario: Scenario,
    pub prediction: f64,
    pub percentile: f64,
    pub status: StatusBand,
    /// Absent when the crop has no historical rows
    pub crop_comparison: Option<CropComparison>,
    pub economics: EconomicReport,
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.scenario;
        writeln!(f, "Scenario")?;
        writeln!(f, "  Region:       {}", s.region)?;
        writeln!(f, "  Soil:         {}", s.soil_type)?;
        writeln!(f, "  Crop:         {}", s.crop)?;
        writeln!(f, "  Weather:      {}", s.weather_condition)?;
        writeln!(f, "  Rainfall:     {:.0} mm", s.rainfall_mm)?;
        writeln!(f, "  Temperature:  {:.1} °C", s.temperature_celsius)?;
        writeln!(f, "  Harvest in:   {:.0} days", s.days_to_harvest)?;
        writeln!(f, "  Fertilizer:   {}", yes_no(s.fertilizer_used))?;
        writeln!(f, "  Irrigation:   {}", yes_no(s.irrigation_used))?;
        writeln!(f)?;

        writeln!(f, "Prediction")?;
        writeln!(f, "  Yield:        {:.2} t/ha", self.prediction)?;
        writeln!(
            f,
            "  Percentile:   {:.1} ({})",
            self.percentile, self.status
        )?;
        if let Some(cmp) = &self.crop_comparison {
            writeln!(
                f,
                "  {} average:  {:.2} t/ha ({:+.2})",
                s.crop, cmp.mean_yield, cmp.difference
            )?;
        }
        writeln!(f)?;

        let e = &self.economics;
        writeln!(f, "Economics (per hectare)")?;
        if e.priced_as != e.crop {
            writeln!(f, "  Priced as:    {}", e.priced_as)?;
        }
        writeln!(f, "  Price:        {:.2} per ton", e.price_per_ton)?;
        writeln!(f, "  Base cost:    {:.2}", e.base_cost)?;
        writeln!(f, "  Fertilizer:   {:.2}", e.fertilizer_cost)?;
        writeln!(f, "  Irrigation:   {:.2}", e.irrigation_cost)?;
        writeln!(f, "  Total cost:   {:.2}", e.total_cost)?;
        writeln!(f, "  Revenue:      {:.2}", e.revenue)?;
        writeln!(f, "  Profit:       {:.2}", e.profit)?;
        writeln!(f, "  ROI:          {:.1}% ({})", e.roi_percent, e.roi_band)?;
        if let (Some(margin), Some(band)) = (e.margin_percent, e.margin_band) {
            writeln!(f, "  Margin:       {:.1}% ({})", margin, band)?;
        }
        Ok(())
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
