//! Spray-foam job estimation.
//!
//! Everything here is pure: no I/O, no clock. The API layer exposes it at
//! `POST /api/estimate`.

mod calculator;

pub use calculator::{area_estimate, calculate};

use serde::{Deserialize, Serialize};

/// Gallons in one two-part set.
pub const GALLONS_PER_SET: f64 = 55.0;

pub const ROYALTY_RATE: f64 = 0.06;
pub const BRAND_FUND_RATE: f64 = 0.01;
pub const SALES_COMMISSION_RATE: f64 = 0.03;

const PITCH_MULTIPLIERS: [(&str, f64); 12] = [
    ("1/12", 1.003),
    ("2/12", 1.014),
    ("3/12", 1.031),
    ("4/12", 1.054),
    ("5/12", 1.083),
    ("6/12", 1.118),
    ("7/12", 1.158),
    ("8/12", 1.202),
    ("9/12", 1.25),
    ("10/12", 1.302),
    ("11/12", 1.357),
    ("12/12", 1.414),
];

/// Surface correction for a roof pitch such as `"6/12"`. Unknown pitches
/// are treated as flat.
pub fn pitch_multiplier(pitch: &str) -> f64 {
    PITCH_MULTIPLIERS
        .iter()
        .find(|(p, _)| *p == pitch.trim())
        .map(|(_, m)| *m)
        .unwrap_or(1.0)
}

/// Area types are free text on the form; anything that is not a roof
/// deck or gable end is priced as a general area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum AreaType {
    #[default]
    #[serde(rename = "General Area")]
    General,
    #[serde(rename = "Roof Deck")]
    RoofDeck,
    #[serde(rename = "Gable Ends")]
    GableEnds,
}

impl From<String> for AreaType {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Roof Deck" => AreaType::RoofDeck,
            "Gable Ends" => AreaType::GableEnds,
            _ => AreaType::General,
        }
    }
}

/// Only `"Open"` selects open-cell foam; every other value is closed-cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum FoamType {
    #[default]
    Open,
    Closed,
}

impl From<String> for FoamType {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Open" => FoamType::Open,
            _ => FoamType::Closed,
        }
    }
}

impl FoamType {
    /// Expanded coverage of one set, in board-feet.
    pub fn board_feet_per_set(self) -> f64 {
        match self {
            FoamType::Open => 12_000.0,
            FoamType::Closed => 4_000.0,
        }
    }

    /// Typical application thickness in inches.
    pub fn default_thickness(self) -> f64 {
        match self {
            FoamType::Open => 6.0,
            FoamType::Closed => 2.0,
        }
    }

    /// Typical price of one set, in dollars.
    pub fn default_set_price(self) -> f64 {
        match self {
            FoamType::Open => 1870.0,
            FoamType::Closed => 2470.0,
        }
    }
}

/// One sprayed surface on the job.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateArea {
    #[serde(default)]
    pub area_type: AreaType,
    #[serde(default = "default_pitch")]
    pub roof_pitch: String,
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub foam_type: FoamType,
    /// Inches; defaults per foam type.
    pub foam_thickness: Option<f64>,
    /// Dollars per set; defaults per foam type.
    pub material_price: Option<f64>,
}

fn default_pitch() -> String {
    "1/12".into()
}

impl Default for EstimateArea {
    fn default() -> Self {
        Self {
            area_type: AreaType::General,
            roof_pitch: default_pitch(),
            length: 0.0,
            width: 0.0,
            foam_type: FoamType::Open,
            foam_thickness: None,
            material_price: None,
        }
    }
}

impl EstimateArea {
    pub fn thickness(&self) -> f64 {
        self.foam_thickness
            .unwrap_or_else(|| self.foam_type.default_thickness())
    }

    pub fn set_price(&self) -> f64 {
        self.material_price
            .unwrap_or_else(|| self.foam_type.default_set_price())
    }

    /// Surface to spray after pitch or gable correction.
    pub fn covered_area(&self) -> f64 {
        let raw = self.length * self.width;
        match self.area_type {
            AreaType::RoofDeck => raw * pitch_multiplier(&self.roof_pitch),
            AreaType::GableEnds => raw / 2.0,
            AreaType::General => raw,
        }
    }
}

/// Everything entered on the estimate form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EstimateInputs {
    pub areas: Vec<EstimateArea>,
    pub manual_rate: f64,
    pub manual_hours: f64,
    pub waste_cost: f64,
    pub equipment_cost: f64,
    pub travel_distance: f64,
    pub fuel_cost_per_mile: f64,
    /// Percent.
    pub material_markup: f64,
    /// Percent.
    pub labor_markup: f64,
    pub complexity: f64,
    /// Percent.
    pub discount: f64,
    pub actuals: Option<Actuals>,
}

impl Default for EstimateInputs {
    fn default() -> Self {
        Self {
            areas: Vec::new(),
            manual_rate: 0.0,
            manual_hours: 0.0,
            waste_cost: 0.0,
            equipment_cost: 0.0,
            travel_distance: 0.0,
            fuel_cost_per_mile: 0.68,
            material_markup: 50.0,
            labor_markup: 30.0,
            complexity: 1.0,
            discount: 0.0,
            actuals: None,
        }
    }
}

/// Post-job figures for comparing against the estimate.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Actuals {
    pub actual_gallons: f64,
    pub actual_manual_hours: f64,
    /// Falls back to the estimated rate when zero.
    pub actual_manual_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaEstimate {
    pub area_type: AreaType,
    pub foam_type: FoamType,
    pub area: f64,
    pub gallons: f64,
    pub material_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    pub areas: Vec<AreaEstimate>,
    pub total_area: f64,
    pub total_gallons: f64,
    pub total_material_cost: f64,
    pub base_labor_cost: f64,
    pub marked_up_material: f64,
    pub marked_up_labor: f64,
    pub fuel_cost: f64,
    pub total_base_cost: f64,
    pub total_before_discount: f64,
    pub revenue: f64,
    pub royalty: f64,
    pub brand_fund: f64,
    pub sales_commission: f64,
    pub total_fees: f64,
    pub profit: f64,
    /// Percent of revenue; `None` when revenue is zero.
    pub profit_margin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actuals: Option<ActualsComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActualsComparison {
    pub actual_gallons: f64,
    pub actual_material_cost: f64,
    pub actual_labor_cost: f64,
    pub material_variance: f64,
    pub labor_variance: f64,
}
