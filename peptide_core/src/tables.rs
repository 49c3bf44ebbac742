//! Static reference tables consumed by the dose engine and order builder.
//!
//! Everything here is immutable configuration data. The engine reads these
//! tables and nothing else.

use crate::types::*;
use once_cell::sync::Lazy;

/// Supported syringe graduation schemes, in display order
pub const SYRINGE_TYPES: [SyringeType; 3] = [SyringeType::U100, SyringeType::U50, SyringeType::U40];

/// Supported dosing cadences, in display order
pub const FREQUENCIES: &[FrequencyOption] = &[
    FrequencyOption {
        doses_per_week: 7.0,
        label: "Daily",
    },
    FrequencyOption {
        doses_per_week: 5.0,
        label: "5x per week",
    },
    FrequencyOption {
        doses_per_week: 3.5,
        label: "Every other day",
    },
    FrequencyOption {
        doses_per_week: 3.0,
        label: "3x per week",
    },
    FrequencyOption {
        doses_per_week: 2.0,
        label: "2x per week",
    },
    FrequencyOption {
        doses_per_week: 1.0,
        label: "Once weekly",
    },
];

/// Common bacteriostatic water fill volumes (mL), ascending
pub const DILUENT_CANDIDATES_ML: [f64; 8] = [0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 4.0, 5.0];

/// Diluent used when no candidate lands the draw inside the syringe's graduated range
pub const DEFAULT_DILUENT_ML: f64 = 2.0;

/// Draws below this many units are too fine to measure
pub const MIN_FEASIBLE_UNITS: f64 = 2.0;

/// Draws above this many units exceed a standard syringe barrel
pub const MAX_FEASIBLE_UNITS: f64 = 100.0;

/// Candidates are scored by distance to the nearest multiple of this
pub const UNIT_SNAP_STEP: f64 = 5.0;

/// Days a reconstituted vial stays usable
pub const RECONSTITUTED_SHELF_LIFE_DAYS: i64 = 28;

/// Label that asks the order builder for a free-text vial size
pub const CUSTOM_VIAL_SIZE: &str = "Custom…";

/// Vial size presets offered by the order builder
pub const VIAL_SIZES: &[&str] = &[
    "1 mg",
    "5 mg",
    "6 mg",
    "10 mg",
    "20 mg",
    "100 mg",
    "500 mg",
    "600 mg",
    "10 iu",
    "250 mcg (50 caps)",
    "5 mg (50 caps)",
    "25 mg (50 caps)",
    "100 mg (50 caps)",
    CUSTOM_VIAL_SIZE,
];

static DEFAULT_SUPPLIES: Lazy<Vec<SupplyItem>> = Lazy::new(|| {
    vec![
        SupplyItem {
            id: "recon-syringes".into(),
            name: "Reconstitution syringes".into(),
            detail: "U-30, for drawing BW into vials".into(),
            quantity: 1,
            checked: false,
            recurrence: SupplyRecurrence::Recurring,
            url: Some("https://a.co/d/01UIBqLo".into()),
        },
        SupplyItem {
            id: "inject-syringes".into(),
            name: "Injection syringes".into(),
            detail: "31G 5/16\" U-100, 50ct".into(),
            quantity: 1,
            checked: false,
            recurrence: SupplyRecurrence::Recurring,
            url: Some("https://a.co/d/06hcgI2P".into()),
        },
        SupplyItem {
            id: "bac-water".into(),
            name: "Bacteriostatic water".into(),
            detail: "30ml vial — pharmacy or compounding".into(),
            quantity: 1,
            checked: false,
            recurrence: SupplyRecurrence::Recurring,
            url: None,
        },
    ]
});

/// The supply checklist every new order starts from (all unchecked)
pub fn default_supplies() -> &'static [SupplyItem] {
    &DEFAULT_SUPPLIES
}

/// Look up the display label for an exact doses-per-week count
pub fn frequency_label(doses_per_week: f64) -> Option<&'static str> {
    FREQUENCIES
        .iter()
        .find(|f| f.doses_per_week == doses_per_week)
        .map(|f| f.label)
}

/// Check the tables for internal consistency
///
/// Returns a list of problems, or an empty Vec if the tables are usable.
pub fn validate() -> Vec<String> {
    let mut errors = Vec::new();

    if DILUENT_CANDIDATES_ML.is_empty() {
        errors.push("Diluent candidate list is empty".to_string());
    }
    for pair in DILUENT_CANDIDATES_ML.windows(2) {
        if pair[0] >= pair[1] {
            errors.push(format!(
                "Diluent candidates not strictly ascending at {} -> {}",
                pair[0], pair[1]
            ));
        }
    }
    if DILUENT_CANDIDATES_ML.iter().any(|v| !v.is_finite() || *v <= 0.0) {
        errors.push("Diluent candidates must be positive and finite".to_string());
    }

    if !DEFAULT_DILUENT_ML.is_finite() || DEFAULT_DILUENT_ML <= 0.0 {
        errors.push(format!(
            "Fallback diluent must be positive, got {}",
            DEFAULT_DILUENT_ML
        ));
    }

    for syringe in SYRINGE_TYPES {
        if syringe.units_per_ml() <= 0.0 {
            errors.push(format!("Syringe {} has no graduations", syringe));
        }
    }

    if MIN_FEASIBLE_UNITS >= MAX_FEASIBLE_UNITS {
        errors.push("Feasible unit range is empty".to_string());
    }

    for (i, freq) in FREQUENCIES.iter().enumerate() {
        if freq.label.trim().is_empty() {
            errors.push(format!("Frequency {} has empty label", freq.doses_per_week));
        }
        if freq.doses_per_week <= 0.0 {
            errors.push(format!(
                "Frequency '{}' has non-positive count {}",
                freq.label, freq.doses_per_week
            ));
        }
        if FREQUENCIES[..i]
            .iter()
            .any(|earlier| earlier.doses_per_week == freq.doses_per_week)
        {
            errors.push(format!(
                "Duplicate frequency count {} ('{}')",
                freq.doses_per_week, freq.label
            ));
        }
    }

    for supply in default_supplies() {
        if supply.id.is_empty() || supply.name.is_empty() {
            errors.push("Default supply has empty id or name".to_string());
        }
    }

    errors
}
