use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{normalize_token, Entity, ParseValueError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarietyPurpose {
    Fiber,
    Grain,
    Cbd,
    Dual,
}

impl VarietyPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            VarietyPurpose::Fiber => "fiber",
            VarietyPurpose::Grain => "grain",
            VarietyPurpose::Cbd => "cbd",
            VarietyPurpose::Dual => "dual",
        }
    }
}

impl fmt::Display for VarietyPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VarietyPurpose {
    type Err = ParseValueError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let purpose = match normalize_token(value).as_str() {
            "fiber" | "fibre" => VarietyPurpose::Fiber,
            "grain" | "seed" => VarietyPurpose::Grain,
            "cbd" => VarietyPurpose::Cbd,
            "dual" | "dual_purpose" => VarietyPurpose::Dual,
            _ => {
                return Err(ParseValueError::new(
                    "variety purpose",
                    value,
                    "fiber, grain, cbd, dual",
                ));
            }
        };
        Ok(purpose)
    }
}

/// A cultivar in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variety {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub breeder: Option<String>,
    pub purpose: VarietyPurpose,
    #[serde(default)]
    pub cycle_days: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Entity for Variety {
    const TABLE: &'static str = "varieties";
    const ID_PREFIX: &'static str = "var";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Direction of a seed movement relative to the batch balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Received,
    Sown,
    Transfer,
    Adjustment,
    Disposal,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::Received => "received",
            MovementKind::Sown => "sown",
            MovementKind::Transfer => "transfer",
            MovementKind::Adjustment => "adjustment",
            MovementKind::Disposal => "disposal",
        }
    }

    /// Signed contribution of a movement of `quantity_kg` to the batch
    /// balance. Adjustments carry their own sign.
    pub fn signed(self, quantity_kg: f64) -> f64 {
        match self {
            MovementKind::Received => quantity_kg.abs(),
            MovementKind::Sown | MovementKind::Transfer | MovementKind::Disposal => {
                -quantity_kg.abs()
            }
            MovementKind::Adjustment => quantity_kg,
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = ParseValueError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let kind = match normalize_token(value).as_str() {
            "received" | "in" => MovementKind::Received,
            "sown" | "sowing" => MovementKind::Sown,
            "transfer" | "out" => MovementKind::Transfer,
            "adjustment" | "adjust" => MovementKind::Adjustment,
            "disposal" | "disposed" => MovementKind::Disposal,
            _ => {
                return Err(ParseValueError::new(
                    "movement kind",
                    value,
                    "received, sown, transfer, adjustment, disposal",
                ));
            }
        };
        Ok(kind)
    }
}

/// Seed inventory unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedBatch {
    pub id: String,
    pub lot_code: String,
    pub variety_id: String,
    #[serde(default)]
    pub origin: Option<String>,
    pub quantity_kg: f64,
    pub received_on: String,
    #[serde(default)]
    pub germination_pct: Option<f64>,
}

impl Entity for SeedBatch {
    const TABLE: &'static str = "seed_batches";
    const ID_PREFIX: &'static str = "bat";

    fn id(&self) -> &str {
        &self.id
    }
}

/// One inventory transaction against a seed batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedMovement {
    pub id: String,
    pub batch_id: String,
    pub kind: MovementKind,
    pub quantity_kg: f64,
    pub occurred_on: String,
    #[serde(default)]
    pub plot_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Entity for SeedMovement {
    const TABLE: &'static str = "seed_movements";
    const ID_PREFIX: &'static str = "mov";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Balance of a batch after applying its movements to the initial
/// received quantity.
pub fn batch_balance(batch: &SeedBatch, movements: &[SeedMovement]) -> f64 {
    let moved: f64 = movements
        .iter()
        .filter(|movement| movement.batch_id == batch.id)
        .map(|movement| movement.kind.signed(movement.quantity_kg))
        .sum();
    batch.quantity_kg + moved
}
