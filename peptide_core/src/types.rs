//! Core domain types for the peptide toolkit.
//!
//! This module defines:
//! - Calculator inputs (dose units, syringe types, requests)
//! - The immutable calculator result
//! - Protocol, reconstitution and injection-log records
//! - Purchase order records and the builder's list items

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Calculator Inputs
// ============================================================================

/// Unit a dose is entered in
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DoseUnit {
    #[default]
    Mcg,
    Mg,
}

impl DoseUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoseUnit::Mcg => "mcg",
            DoseUnit::Mg => "mg",
        }
    }

    /// Convert an amount in this unit to milligrams
    pub fn to_mg(&self, amount: f64) -> f64 {
        match self {
            DoseUnit::Mcg => amount / 1000.0,
            DoseUnit::Mg => amount,
        }
    }
}

impl fmt::Display for DoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoseUnit {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mcg" | "ug" | "µg" => Ok(DoseUnit::Mcg),
            "mg" => Ok(DoseUnit::Mg),
            other => Err(crate::Error::Other(format!("Unknown dose unit: {}", other))),
        }
    }
}

/// Syringe graduation scheme
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum SyringeType {
    #[default]
    #[serde(rename = "U-100")]
    U100,
    #[serde(rename = "U-50")]
    U50,
    #[serde(rename = "U-40")]
    U40,
}

impl SyringeType {
    /// Graduation marks per millilitre
    pub fn units_per_ml(&self) -> f64 {
        match self {
            SyringeType::U100 => 100.0,
            SyringeType::U50 => 50.0,
            SyringeType::U40 => 40.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SyringeType::U100 => "U-100",
            SyringeType::U50 => "U-50",
            SyringeType::U40 => "U-40",
        }
    }
}

impl fmt::Display for SyringeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SyringeType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != ' ')
            .collect::<String>()
            .to_uppercase();

        match normalized.as_str() {
            "U100" => Ok(SyringeType::U100),
            "U50" => Ok(SyringeType::U50),
            "U40" => Ok(SyringeType::U40),
            _ => Err(crate::Error::Other(format!("Unknown syringe type: {}", s))),
        }
    }
}

/// A single dose as entered by the user
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Dose {
    pub amount: f64,
    pub unit: DoseUnit,
}

impl Dose {
    pub fn mcg(amount: f64) -> Self {
        Self {
            amount,
            unit: DoseUnit::Mcg,
        }
    }

    pub fn mg(amount: f64) -> Self {
        Self {
            amount,
            unit: DoseUnit::Mg,
        }
    }

    /// The dose normalized to milligrams
    pub fn in_mg(&self) -> f64 {
        self.unit.to_mg(self.amount)
    }
}

/// One supported dosing cadence
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrequencyOption {
    pub doses_per_week: f64,
    pub label: &'static str,
}

/// Everything the dose engine needs, passed by value on every change
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct DosageRequest {
    pub vial_strength_mg: f64,
    pub dose: Dose,
    pub syringe_type: SyringeType,
    pub doses_per_week: Option<f64>,
    pub diluent_override_ml: Option<f64>,
}

/// Unparsed calculator form fields
///
/// Empty optional fields mean "not provided".
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawDosageInput {
    pub vial_mg: String,
    pub dose: String,
    pub dose_unit: String,
    pub syringe: String,
    pub doses_per_week: String,
    pub diluent_ml: String,
}

// ============================================================================
// Calculator Result
// ============================================================================

/// Reconstitution and draw instructions for one vial/dose combination
///
/// Always fully populated; the engine returns `None` instead of a partial
/// result.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DosageResult {
    pub diluent_used_ml: f64,
    pub was_overridden: bool,
    pub concentration_mg_per_ml: f64,
    pub draw_volume_ml: f64,
    pub syringe_unit_mark: f64,
    pub total_doses_per_vial: f64,
    pub supply_label: Option<String>,
    pub frequency_label: Option<String>,
    pub reconstitution_text: String,
    pub draw_text: String,
    pub summary_text: String,
}

// ============================================================================
// Protocol Records
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolStatus {
    #[default]
    Active,
    Completed,
    Paused,
}

/// A named dosing plan
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Protocol {
    pub id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: ProtocolStatus,
    pub notes: String,
    /// "local" until accounts exist
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One peptide within a protocol
///
/// Concentration and syringe units are derived on demand, never stored.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProtocolItem {
    pub id: Uuid,
    pub protocol_id: Uuid,
    pub peptide_name: String,
    pub vial_size_mg: f64,
    pub bw_amount_ml: f64,
    pub dose_mg: f64,
    pub dose_unit: DoseUnit,
    pub frequency_doses_per_week: f64,
    pub syringe_type: SyringeType,
    pub num_vials: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A vial being mixed with bacteriostatic water
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReconstitutionEvent {
    pub id: Uuid,
    pub protocol_item_id: Uuid,
    pub reconstituted_at: DateTime<Utc>,
    pub batch_notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InjectionSite {
    Abdomen,
    Thigh,
    Arm,
    Flank,
}

/// A scheduled (and possibly administered) injection
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub id: Uuid,
    pub protocol_id: Uuid,
    pub protocol_item_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    /// None until the dose is taken
    pub administered_at: Option<DateTime<Utc>>,
    /// Only set when it differs from the protocol dose
    pub dose_actual_mg: Option<f64>,
    pub site: Option<InjectionSite>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Purchase Orders
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum VendorType {
    #[default]
    PeptideProvider,
    Amazon,
    Pharmacy,
    Other,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderItemType {
    Peptide,
    Supply,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SupplyRecurrence {
    OneTime,
    #[default]
    Recurring,
}

impl SupplyRecurrence {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplyRecurrence::OneTime => "one-time",
            SupplyRecurrence::Recurring => "recurring",
        }
    }
}

/// A saved purchase order header
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub protocol_id: Option<Uuid>,
    #[serde(default)]
    pub vendor_name: String,
    pub created_at: DateTime<Utc>,
}

/// One line of a saved purchase order
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct OrderLineItem {
    pub id: Uuid,
    pub order_id: Uuid,
    #[serde(rename = "type")]
    pub item_type: OrderItemType,
    pub name: String,
    pub quantity: u32,
    /// "vials", "boxes", "units"
    pub unit: String,
    pub vendor: VendorType,
    pub url: Option<String>,
    pub notes: String,
    pub recurrence: SupplyRecurrence,
}

/// A peptide line in the order builder
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PeptideItem {
    pub id: Uuid,
    pub name: String,
    pub vial_size: String,
    pub quantity: u32,
}

/// A supply line in the order builder
///
/// Only checked supplies make it onto the printed order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SupplyItem {
    pub id: String,
    pub name: String,
    pub detail: String,
    pub quantity: u32,
    pub checked: bool,
    pub recurrence: SupplyRecurrence,
    pub url: Option<String>,
}

/// Partial update for a supply line
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SupplyPatch {
    pub checked: Option<bool>,
    pub quantity: Option<u32>,
    pub recurrence: Option<SupplyRecurrence>,
    pub detail: Option<String>,
}
