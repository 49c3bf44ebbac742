//! Dose engine: reconstitution and draw arithmetic.
//!
//! Given a vial's labeled mass, a dose, a syringe graduation scheme and
//! optionally a dosing frequency and an already-chosen diluent volume, the
//! engine either rejects the input or derives:
//! - the diluent volume (recommended from a fixed candidate list unless given)
//! - concentration, draw volume and the syringe unit mark
//! - how long the vial lasts at the given frequency
//! - human-readable reconstitution and draw instructions
//!
//! The engine is pure. Invalid input is `None`, never an error or a panic.

use crate::tables::{
    frequency_label, DEFAULT_DILUENT_ML, DILUENT_CANDIDATES_ML, MAX_FEASIBLE_UNITS,
    MIN_FEASIBLE_UNITS, UNIT_SNAP_STEP,
};
use crate::{Dose, DosageRequest, DosageResult, DoseUnit, RawDosageInput, SyringeType};

/// A diluent volume that keeps the draw within the syringe's graduated range
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiluentCandidate {
    pub diluent_ml: f64,
    pub syringe_units: f64,
    /// Distance from the nearest easy-to-read mark; lower is better
    pub score: f64,
}

/// Compute reconstitution and draw instructions
///
/// Returns `None` when the vial strength or dose is missing, non-positive or
/// non-finite, when the dose exceeds the vial, or when a diluent override is
/// given but is not a positive volume.
pub fn compute_dosage(
    vial_strength_mg: f64,
    dose: Dose,
    syringe_type: SyringeType,
    doses_per_week: Option<f64>,
    diluent_override_ml: Option<f64>,
) -> Option<DosageResult> {
    let dose_mg = dose.in_mg();

    if !is_positive(vial_strength_mg) || !is_positive(dose_mg) {
        tracing::debug!(
            vial_strength_mg,
            dose_mg,
            "Rejecting dosage input: vial and dose must be positive"
        );
        return None;
    }
    if dose_mg > vial_strength_mg {
        tracing::debug!(
            vial_strength_mg,
            dose_mg,
            "Rejecting dosage input: dose exceeds vial strength"
        );
        return None;
    }

    let (diluent_used_ml, was_overridden) = match diluent_override_ml {
        Some(ml) if is_positive(ml) => (ml, true),
        Some(ml) => {
            tracing::debug!(ml, "Rejecting dosage input: diluent override must be positive");
            return None;
        }
        None => (
            recommend_diluent(vial_strength_mg, dose_mg, syringe_type),
            false,
        ),
    };

    let concentration_mg_per_ml = vial_strength_mg / diluent_used_ml;
    let draw_volume_ml = dose_mg / concentration_mg_per_ml;
    let syringe_unit_mark = draw_volume_ml * syringe_type.units_per_ml();
    let total_doses_per_vial = vial_strength_mg / dose_mg;

    let (frequency_label, supply_label) = match doses_per_week.filter(|n| is_positive(*n)) {
        Some(per_week) => match frequency_label(per_week) {
            Some(label) => {
                let total_days = total_doses_per_vial / per_week * 7.0;
                (
                    Some(label.to_string()),
                    Some(supply_duration_label(total_days)),
                )
            }
            None => {
                tracing::debug!(per_week, "No frequency entry for doses per week");
                (None, None)
            }
        },
        None => (None, None),
    };

    let reconstitution_text = if was_overridden {
        format!(
            "Your vial was reconstituted with {}ml of bacteriostatic water.",
            diluent_used_ml
        )
    } else {
        format!(
            "Add {}ml of bacteriostatic water to the vial to dissolve the peptide. \
             Do this once when you first open the vial.",
            diluent_used_ml
        )
    };
    let draw_text = format!(
        "Draw to the {} unit mark on your {} syringe each time you dose.",
        format_unit_mark(syringe_unit_mark),
        syringe_type
    );
    let summary_text = format!("{} {}", reconstitution_text, draw_text);

    Some(DosageResult {
        diluent_used_ml,
        was_overridden,
        concentration_mg_per_ml,
        draw_volume_ml,
        syringe_unit_mark,
        total_doses_per_vial,
        supply_label,
        frequency_label,
        reconstitution_text,
        draw_text,
        summary_text,
    })
}

/// Every candidate diluent volume whose draw lands inside the feasible unit range
///
/// Candidates are returned in ascending volume order.
pub fn diluent_candidates(
    vial_strength_mg: f64,
    dose_mg: f64,
    syringe_type: SyringeType,
) -> Vec<DiluentCandidate> {
    DILUENT_CANDIDATES_ML
        .iter()
        .filter_map(|&diluent_ml| {
            let concentration = vial_strength_mg / diluent_ml;
            let syringe_units = dose_mg / concentration * syringe_type.units_per_ml();
            if !(MIN_FEASIBLE_UNITS..=MAX_FEASIBLE_UNITS).contains(&syringe_units) {
                return None;
            }
            Some(DiluentCandidate {
                diluent_ml,
                syringe_units,
                score: candidate_score(syringe_units),
            })
        })
        .collect()
}

/// Pick the diluent volume whose draw sits closest to a multiple of five units
///
/// Ties go to the smallest volume. Falls back to [`DEFAULT_DILUENT_ML`] when
/// no candidate is feasible.
pub fn recommend_diluent(vial_strength_mg: f64, dose_mg: f64, syringe_type: SyringeType) -> f64 {
    let mut best: Option<DiluentCandidate> = None;
    for candidate in diluent_candidates(vial_strength_mg, dose_mg, syringe_type) {
        if best.map_or(true, |b| candidate.score < b.score) {
            best = Some(candidate);
        }
    }

    match best {
        Some(choice) => {
            tracing::debug!(
                diluent_ml = choice.diluent_ml,
                syringe_units = choice.syringe_units,
                score = choice.score,
                "Recommended diluent volume"
            );
            choice.diluent_ml
        }
        None => {
            tracing::debug!(
                vial_strength_mg,
                dose_mg,
                "No feasible diluent candidate, using default {}ml",
                DEFAULT_DILUENT_ML
            );
            DEFAULT_DILUENT_ML
        }
    }
}

/// Distance from `units` to the nearest multiple of five
pub fn candidate_score(units: f64) -> f64 {
    (units - (units / UNIT_SNAP_STEP).round() * UNIT_SNAP_STEP).abs()
}

/// Render a unit mark: whole numbers without decimals, otherwise one decimal
pub fn format_unit_mark(units: f64) -> String {
    if units.fract() == 0.0 {
        format!("{:.0}", units)
    } else {
        format!("{:.1}", round_to_tenth(units))
    }
}

/// Bucket a supply duration into days, weeks or months
pub fn supply_duration_label(total_days: f64) -> String {
    if total_days < 14.0 {
        format!("{} days", total_days.round())
    } else if total_days < 60.0 {
        format!("{} weeks", (total_days / 7.0).round())
    } else {
        format!("~{:.1} months", round_to_tenth(total_days / 30.0))
    }
}

// Halves round away from zero, so 0.25 renders as 0.3 rather than 0.2.
fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl DosageRequest {
    pub fn compute(&self) -> Option<DosageResult> {
        compute_dosage(
            self.vial_strength_mg,
            self.dose,
            self.syringe_type,
            self.doses_per_week,
            self.diluent_override_ml,
        )
    }
}

impl RawDosageInput {
    /// Parse the form fields into a request
    ///
    /// Missing or unparsable vial/dose text, or an unknown unit or syringe
    /// tag, yields `None`. Blank unit and syringe fields take their
    /// defaults (mcg, U-100). Blank or unparsable optional fields are
    /// treated as not provided.
    pub fn parse(&self) -> Option<DosageRequest> {
        let vial_strength_mg = parse_number(&self.vial_mg)?;
        let amount = parse_number(&self.dose)?;

        let unit = if self.dose_unit.trim().is_empty() {
            DoseUnit::default()
        } else {
            self.dose_unit.parse().ok()?
        };
        let syringe_type = if self.syringe.trim().is_empty() {
            SyringeType::default()
        } else {
            self.syringe.parse().ok()?
        };

        Some(DosageRequest {
            vial_strength_mg,
            dose: Dose { amount, unit },
            syringe_type,
            doses_per_week: parse_number(&self.doses_per_week),
            diluent_override_ml: parse_number(&self.diluent_ml),
        })
    }

    pub fn compute(&self) -> Option<DosageResult> {
        self.parse()?.compute()
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn compute(vial: f64, dose: Dose, syringe: SyringeType) -> Option<DosageResult> {
        compute_dosage(vial, dose, syringe, None, None)
    }

    #[test]
    fn test_rejects_dose_above_vial() {
        assert!(compute(10.0, Dose::mg(15.0), SyringeType::U100).is_none());
    }

    #[test]
    fn test_rejects_non_positive_inputs() {
        assert!(compute(0.0, Dose::mg(1.0), SyringeType::U100).is_none());
        assert!(compute(-5.0, Dose::mg(1.0), SyringeType::U100).is_none());
        assert!(compute(10.0, Dose::mcg(0.0), SyringeType::U100).is_none());
        assert!(compute(10.0, Dose::mg(-1.0), SyringeType::U100).is_none());
        assert!(compute(f64::NAN, Dose::mg(1.0), SyringeType::U100).is_none());
        assert!(compute(10.0, Dose::mg(f64::NAN), SyringeType::U100).is_none());
        assert!(compute(f64::INFINITY, Dose::mg(1.0), SyringeType::U100).is_none());
    }

    #[test]
    fn test_rejects_non_positive_override() {
        let zero = compute_dosage(10.0, Dose::mcg(250.0), SyringeType::U100, None, Some(0.0));
        let negative = compute_dosage(10.0, Dose::mcg(250.0), SyringeType::U100, None, Some(-2.0));
        assert!(zero.is_none());
        assert!(negative.is_none());
    }

    #[test]
    fn test_dose_equal_to_vial_is_allowed() {
        let result = compute(5.0, Dose::mg(5.0), SyringeType::U100).unwrap();
        assert_relative_eq!(result.total_doses_per_vial, 1.0);
    }

    #[test]
    fn test_mcg_and_mg_are_equivalent() {
        let in_mcg = compute_dosage(10.0, Dose::mcg(1000.0), SyringeType::U50, Some(7.0), None);
        let in_mg = compute_dosage(10.0, Dose::mg(1.0), SyringeType::U50, Some(7.0), None);
        assert_eq!(in_mcg, in_mg);
        assert!(in_mcg.is_some());
    }

    #[test]
    fn test_override_takes_precedence() {
        let result =
            compute_dosage(10.0, Dose::mcg(250.0), SyringeType::U100, None, Some(3.0)).unwrap();
        assert_eq!(result.diluent_used_ml, 3.0);
        assert!(result.was_overridden);
        assert_eq!(
            result.reconstitution_text,
            "Your vial was reconstituted with 3ml of bacteriostatic water."
        );
    }

    #[test]
    fn test_scenario_ten_mg_vial_quarter_mg_dose() {
        let overridden =
            compute_dosage(10.0, Dose::mcg(250.0), SyringeType::U100, None, Some(2.0)).unwrap();
        assert_relative_eq!(overridden.concentration_mg_per_ml, 5.0);
        assert_relative_eq!(overridden.draw_volume_ml, 0.05);
        assert_relative_eq!(overridden.syringe_unit_mark, 5.0);

        let recommended = compute(10.0, Dose::mcg(250.0), SyringeType::U100).unwrap();
        assert_eq!(recommended.diluent_used_ml, 2.0);
        assert!(!recommended.was_overridden);
        assert_relative_eq!(recommended.syringe_unit_mark, 5.0);
        assert_eq!(
            recommended.draw_text,
            "Draw to the 5 unit mark on your U-100 syringe each time you dose."
        );
        assert_eq!(
            recommended.reconstitution_text,
            "Add 2ml of bacteriostatic water to the vial to dissolve the peptide. \
             Do this once when you first open the vial."
        );
        assert_eq!(
            recommended.summary_text,
            format!("{} {}", recommended.reconstitution_text, recommended.draw_text)
        );
    }

    #[test]
    fn test_search_picks_lowest_score_first_on_ties() {
        let vial = 5.0;
        let dose_mg = 0.5;
        let result = compute(vial, Dose::mcg(500.0), SyringeType::U100).unwrap();

        let mut expected: Option<(f64, f64)> = None;
        for bw in [0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 4.0, 5.0] {
            let units = dose_mg / (vial / bw) * 100.0;
            if !(2.0..=100.0).contains(&units) {
                continue;
            }
            let score = (units - (units / 5.0).round() * 5.0).abs();
            if expected.map_or(true, |(_, best)| score < best) {
                expected = Some((bw, score));
            }
        }

        let (expected_bw, _) = expected.unwrap();
        assert_eq!(result.diluent_used_ml, expected_bw);
        assert!((2.0..=100.0).contains(&result.syringe_unit_mark));
    }

    #[test]
    fn test_search_prefers_clean_marks() {
        // 0.3mg from a 10mg vial: 1.5ml gives 4.5 units, 2.5ml gives 7.5,
        // 5ml gives exactly 15.
        let chosen = recommend_diluent(10.0, 0.3, SyringeType::U100);
        assert_eq!(chosen, 5.0);
    }

    #[test]
    fn test_falls_back_to_default_diluent() {
        crate::logging::init_test();
        // 1mcg from a 1000mg vial is far below two units at any volume
        assert!(diluent_candidates(1000.0, 0.001, SyringeType::U100).is_empty());
        let result = compute(1000.0, Dose::mcg(1.0), SyringeType::U100).unwrap();
        assert_eq!(result.diluent_used_ml, DEFAULT_DILUENT_ML);
        assert!(!result.was_overridden);
    }

    #[test]
    fn test_candidates_exclude_out_of_range_draws() {
        let candidates = diluent_candidates(10.0, 0.25, SyringeType::U100);
        // 0.5ml gives 1.25 units, below the minimum
        assert!(candidates.iter().all(|c| c.diluent_ml != 0.5));
        assert!(candidates
            .iter()
            .all(|c| c.syringe_units >= 2.0 && c.syringe_units <= 100.0));
        assert!(candidates.windows(2).all(|w| w[0].diluent_ml < w[1].diluent_ml));
    }

    #[test]
    fn test_unit_mark_above_capacity_passes_through() {
        let result =
            compute_dosage(1.0, Dose::mg(1.0), SyringeType::U100, None, Some(5.0)).unwrap();
        assert_relative_eq!(result.syringe_unit_mark, 500.0);
        assert!(result.draw_text.contains("500 unit mark"));
    }

    #[test]
    fn test_supply_duration_buckets() {
        assert_eq!(supply_duration_label(10.0), "10 days");
        assert_eq!(supply_duration_label(13.6), "14 days");
        assert_eq!(supply_duration_label(30.0), "4 weeks");
        assert_eq!(supply_duration_label(200.0), "~6.7 months");
        assert_eq!(supply_duration_label(60.0), "~2.0 months");
    }

    #[test]
    fn test_supply_label_from_engine() {
        let days = compute_dosage(10.0, Dose::mg(1.0), SyringeType::U100, Some(7.0), None).unwrap();
        assert_eq!(days.supply_label.as_deref(), Some("10 days"));
        assert_eq!(days.frequency_label.as_deref(), Some("Daily"));

        let weeks = compute_dosage(30.0, Dose::mg(1.0), SyringeType::U100, Some(7.0), None).unwrap();
        assert_eq!(weeks.supply_label.as_deref(), Some("4 weeks"));

        let months =
            compute_dosage(200.0, Dose::mg(1.0), SyringeType::U100, Some(7.0), None).unwrap();
        assert_eq!(months.supply_label.as_deref(), Some("~6.7 months"));
    }

    #[test]
    fn test_unknown_frequency_has_no_labels() {
        let result = compute_dosage(10.0, Dose::mg(1.0), SyringeType::U100, Some(4.0), None).unwrap();
        assert_eq!(result.frequency_label, None);
        assert_eq!(result.supply_label, None);
    }

    #[test]
    fn test_no_frequency_has_no_labels() {
        let result = compute(10.0, Dose::mg(1.0), SyringeType::U100).unwrap();
        assert_eq!(result.frequency_label, None);
        assert_eq!(result.supply_label, None);
    }

    #[test]
    fn test_format_unit_mark() {
        assert_eq!(format_unit_mark(5.0), "5");
        assert_eq!(format_unit_mark(5.3), "5.3");
        assert_eq!(format_unit_mark(12.25), "12.3");
        assert_eq!(format_unit_mark(0.0), "0");
    }

    #[test]
    fn test_fractional_mark_in_draw_text() {
        // 0.53mg at 5mg/ml is 0.106ml, 10.6 units on a U-100
        let result =
            compute_dosage(10.0, Dose::mg(0.53), SyringeType::U100, None, Some(2.0)).unwrap();
        assert!(result.draw_text.contains("10.6 unit mark"));
    }

    #[test]
    fn test_syringe_scale_changes_mark_not_volume() {
        let u100 = compute_dosage(10.0, Dose::mg(0.5), SyringeType::U100, None, Some(2.0)).unwrap();
        let u40 = compute_dosage(10.0, Dose::mg(0.5), SyringeType::U40, None, Some(2.0)).unwrap();
        assert_relative_eq!(u100.draw_volume_ml, u40.draw_volume_ml);
        assert_relative_eq!(u100.syringe_unit_mark, 10.0);
        assert_relative_eq!(u40.syringe_unit_mark, 4.0);
        assert!(u40.draw_text.contains("U-40 syringe"));
    }

    #[test]
    fn test_raw_input_parses_and_computes() {
        let raw = RawDosageInput {
            vial_mg: " 10 ".into(),
            dose: "250".into(),
            dose_unit: "mcg".into(),
            syringe: "U-100".into(),
            doses_per_week: "7".into(),
            diluent_ml: String::new(),
        };
        let result = raw.compute().unwrap();
        assert_eq!(result.diluent_used_ml, 2.0);
        assert_eq!(result.frequency_label.as_deref(), Some("Daily"));
    }

    #[test]
    fn test_raw_input_missing_fields() {
        let raw = RawDosageInput {
            vial_mg: "10".into(),
            ..Default::default()
        };
        assert!(raw.parse().is_none());

        let bad_syringe = RawDosageInput {
            vial_mg: "10".into(),
            dose: "250".into(),
            syringe: "U-30".into(),
            ..Default::default()
        };
        assert!(bad_syringe.parse().is_none());
    }

    #[test]
    fn test_raw_input_defaults_unit_and_syringe() {
        let raw = RawDosageInput {
            vial_mg: "10".into(),
            dose: "250".into(),
            ..Default::default()
        };
        let request = raw.parse().unwrap();
        assert_eq!(request.dose, Dose::mcg(250.0));
        assert_eq!(request.syringe_type, SyringeType::U100);
        assert_eq!(request.doses_per_week, None);
        assert_eq!(request.diluent_override_ml, None);
    }

    proptest! {
        #[test]
        fn prop_identical_inputs_identical_output(
            vial in 0.1f64..500.0,
            dose in 0.001f64..500.0,
            per_week in prop::sample::select(vec![1.0, 2.0, 3.0, 3.5, 5.0, 7.0]),
        ) {
            let first = compute_dosage(vial, Dose::mg(dose), SyringeType::U100, Some(per_week), None);
            let second = compute_dosage(vial, Dose::mg(dose), SyringeType::U100, Some(per_week), None);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_larger_dose_draws_more(
            vial in 1.0f64..100.0,
            diluent in 0.5f64..5.0,
            low in 0.01f64..0.45,
            high in 0.55f64..1.0,
        ) {
            let small = compute_dosage(vial, Dose::mg(vial * low), SyringeType::U100, None, Some(diluent)).unwrap();
            let large = compute_dosage(vial, Dose::mg(vial * high), SyringeType::U100, None, Some(diluent)).unwrap();
            prop_assert!(large.draw_volume_ml > small.draw_volume_ml);
            prop_assert!(large.syringe_unit_mark > small.syringe_unit_mark);
            prop_assert!(large.total_doses_per_vial < small.total_doses_per_vial);
        }

        #[test]
        fn prop_recommended_diluent_is_positive(
            vial in 0.1f64..1000.0,
            fraction in 0.0001f64..1.0,
        ) {
            let result = compute_dosage(vial, Dose::mg(vial * fraction), SyringeType::U50, None, None).unwrap();
            prop_assert!(result.diluent_used_ml > 0.0 && result.diluent_used_ml.is_finite());
            prop_assert!(result.syringe_unit_mark >= 0.0);
        }
    }
}
