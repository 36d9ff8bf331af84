use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{normalize_token, Entity, ParseValueError};

/// Growing cycle of a plot. Transitions are deliberately not enforced
/// by the data layer; `hemp audit` reports inconsistencies instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotStage {
    Planned,
    Sown,
    Growing,
    Harvested,
    Closed,
}

impl PlotStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PlotStage::Planned => "planned",
            PlotStage::Sown => "sown",
            PlotStage::Growing => "growing",
            PlotStage::Harvested => "harvested",
            PlotStage::Closed => "closed",
        }
    }

    /// Sown and growing plots are the ones that should be backed by a
    /// seed batch reference.
    pub fn is_active(self) -> bool {
        matches!(self, PlotStage::Sown | PlotStage::Growing)
    }
}

impl fmt::Display for PlotStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlotStage {
    type Err = ParseValueError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let stage = match normalize_token(value).as_str() {
            "planned" => PlotStage::Planned,
            "sown" | "seeded" => PlotStage::Sown,
            "growing" | "vegetative" => PlotStage::Growing,
            "harvested" => PlotStage::Harvested,
            "closed" => PlotStage::Closed,
            _ => {
                return Err(ParseValueError::new(
                    "plot stage",
                    value,
                    "planned, sown, growing, harvested, closed",
                ));
            }
        };
        Ok(stage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    Irrigation,
    Fertilization,
    Pest,
    Scouting,
    Weather,
    Other,
}

impl LogCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            LogCategory::Irrigation => "irrigation",
            LogCategory::Fertilization => "fertilization",
            LogCategory::Pest => "pest",
            LogCategory::Scouting => "scouting",
            LogCategory::Weather => "weather",
            LogCategory::Other => "other",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogCategory {
    type Err = ParseValueError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let category = match normalize_token(value).as_str() {
            "irrigation" => LogCategory::Irrigation,
            "fertilization" | "fertigation" => LogCategory::Fertilization,
            "pest" | "pests" | "disease" => LogCategory::Pest,
            "scouting" => LogCategory::Scouting,
            "weather" => LogCategory::Weather,
            "other" => LogCategory::Other,
            _ => {
                return Err(ParseValueError::new(
                    "log category",
                    value,
                    "irrigation, fertilization, pest, scouting, weather, other",
                ));
            }
        };
        Ok(category)
    }
}

/// A named land unit that plots are placed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub area_ha: Option<f64>,
    #[serde(default)]
    pub soil_type: Option<String>,
}

impl Entity for Location {
    const TABLE: &'static str = "locations";
    const ID_PREFIX: &'static str = "loc";

    fn id(&self) -> &str {
        &self.id
    }
}

/// A cultivated land unit tracked through its growing cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plot {
    pub id: String,
    pub code: String,
    pub project_id: String,
    pub location_id: String,
    pub variety_id: String,
    #[serde(default)]
    pub area_m2: Option<f64>,
    pub stage: PlotStage,
    #[serde(default)]
    pub seed_batch_id: Option<String>,
    #[serde(default)]
    pub sown_on: Option<String>,
    #[serde(default)]
    pub harvested_on: Option<String>,
    pub updated_at: String,
}

impl Entity for Plot {
    const TABLE: &'static str = "plots";
    const ID_PREFIX: &'static str = "plt";

    fn id(&self) -> &str {
        &self.id
    }
}

/// A dated measurement entry for a plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub id: String,
    pub plot_id: String,
    pub recorded_on: String,
    #[serde(default)]
    pub stage: Option<PlotStage>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub yield_kg: Option<f64>,
    #[serde(default)]
    pub moisture_pct: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Entity for TrialRecord {
    const TABLE: &'static str = "trial_records";
    const ID_PREFIX: &'static str = "trl";

    fn id(&self) -> &str {
        &self.id
    }
}

/// A free-form operational note, optionally tied to one plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldLog {
    pub id: String,
    #[serde(default)]
    pub plot_id: Option<String>,
    pub logged_on: String,
    pub category: LogCategory,
    pub summary: String,
    #[serde(default)]
    pub details: Option<String>,
}

impl Entity for FieldLog {
    const TABLE: &'static str = "field_logs";
    const ID_PREFIX: &'static str = "log";

    fn id(&self) -> &str {
        &self.id
    }
}
