//! Protocol, reconstitution and injection-log records.
//!
//! Only inputs are stored on these records. Concentration, syringe units and
//! vial expiry are derived when asked for.

use crate::tables::RECONSTITUTED_SHELF_LIFE_DAYS;
use crate::{
    compute_dosage, Dose, DosageResult, InjectionSite, LogEntry, Protocol, ProtocolItem,
    ProtocolStatus, ReconstitutionEvent,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

/// Owner id for records created without an account
pub const LOCAL_USER_ID: &str = "local";

impl Protocol {
    pub fn new(name: impl Into<String>, start_date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            start_date,
            end_date: None,
            status: ProtocolStatus::Active,
            notes: String::new(),
            user_id: LOCAL_USER_ID.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the protocol to a new status, closing it out when completed
    pub fn set_status(&mut self, status: ProtocolStatus, now: DateTime<Utc>) {
        self.status = status;
        if status == ProtocolStatus::Completed && self.end_date.is_none() {
            self.end_date = Some(now.date_naive());
        }
        self.updated_at = now;
    }
}

impl ProtocolItem {
    /// Dosage instructions for this item
    ///
    /// The stored water volume is authoritative, so the engine never
    /// recommends a different one here.
    pub fn dosage(&self) -> Option<DosageResult> {
        compute_dosage(
            self.vial_size_mg,
            Dose::mg(self.dose_mg),
            self.syringe_type,
            Some(self.frequency_doses_per_week),
            Some(self.bw_amount_ml),
        )
    }

    /// Doses across every vial in the plan
    pub fn total_doses(&self) -> f64 {
        if self.dose_mg <= 0.0 {
            return 0.0;
        }
        self.vial_size_mg / self.dose_mg * f64::from(self.num_vials)
    }
}

impl ReconstitutionEvent {
    pub fn new(protocol_item_id: Uuid, reconstituted_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            protocol_item_id,
            reconstituted_at,
            batch_notes: String::new(),
            created_at: now,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.reconstituted_at + Duration::days(RECONSTITUTED_SHELF_LIFE_DAYS)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

impl LogEntry {
    pub fn scheduled(item: &ProtocolItem, scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            protocol_id: item.protocol_id,
            protocol_item_id: item.id,
            scheduled_at,
            administered_at: None,
            dose_actual_mg: None,
            site: None,
            notes: String::new(),
            created_at: now,
        }
    }

    /// Record the injection as taken
    ///
    /// `dose_actual_mg` is only for doses that differ from the protocol.
    pub fn mark_administered(
        &mut self,
        at: DateTime<Utc>,
        site: Option<InjectionSite>,
        dose_actual_mg: Option<f64>,
    ) {
        self.administered_at = Some(at);
        self.site = site;
        self.dose_actual_mg = dose_actual_mg;
    }

    pub fn is_administered(&self) -> bool {
        self.administered_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DoseUnit, SyringeType};
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn test_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn create_test_item(protocol_id: Uuid) -> ProtocolItem {
        ProtocolItem {
            id: Uuid::new_v4(),
            protocol_id,
            peptide_name: "BPC-157".into(),
            vial_size_mg: 10.0,
            bw_amount_ml: 2.0,
            dose_mg: 0.25,
            dose_unit: DoseUnit::Mcg,
            frequency_doses_per_week: 7.0,
            syringe_type: SyringeType::U100,
            num_vials: 2,
            created_at: test_now(),
            updated_at: test_now(),
        }
    }

    #[test]
    fn test_new_protocol_is_local_and_active() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let protocol = Protocol::new("Recovery", start, test_now());
        assert_eq!(protocol.user_id, "local");
        assert_eq!(protocol.status, ProtocolStatus::Active);
        assert_eq!(protocol.end_date, None);
    }

    #[test]
    fn test_completing_sets_end_date() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let mut protocol = Protocol::new("Recovery", start, test_now());
        let later = test_now() + Duration::days(40);
        protocol.set_status(ProtocolStatus::Completed, later);
        assert_eq!(protocol.end_date, Some(later.date_naive()));
        assert_eq!(protocol.updated_at, later);

        protocol.set_status(ProtocolStatus::Paused, later + Duration::days(1));
        assert_eq!(protocol.end_date, Some(later.date_naive()));
    }

    #[test]
    fn test_item_dosage_uses_stored_water() {
        let item = create_test_item(Uuid::new_v4());
        let dosage = item.dosage().unwrap();
        assert!(dosage.was_overridden);
        assert_eq!(dosage.diluent_used_ml, 2.0);
        assert_relative_eq!(dosage.syringe_unit_mark, 5.0);
        assert_eq!(dosage.frequency_label.as_deref(), Some("Daily"));
        assert_eq!(dosage.supply_label.as_deref(), Some("6 weeks"));
    }

    #[test]
    fn test_item_total_doses() {
        let item = create_test_item(Uuid::new_v4());
        assert_relative_eq!(item.total_doses(), 80.0);
    }

    #[test]
    fn test_reconstitution_expiry() {
        let mixed_at = test_now();
        let event = ReconstitutionEvent::new(Uuid::new_v4(), mixed_at, mixed_at);
        assert_eq!(event.expires_at(), mixed_at + Duration::days(28));
        assert!(!event.is_expired(mixed_at + Duration::days(27)));
        assert!(event.is_expired(mixed_at + Duration::days(28)));
    }

    #[test]
    fn test_log_entry_administration() {
        let item = create_test_item(Uuid::new_v4());
        let mut entry = LogEntry::scheduled(&item, test_now(), test_now());
        assert!(!entry.is_administered());
        assert_eq!(entry.protocol_item_id, item.id);

        entry.mark_administered(test_now(), Some(InjectionSite::Abdomen), None);
        assert!(entry.is_administered());
        assert_eq!(entry.site, Some(InjectionSite::Abdomen));
        assert_eq!(entry.dose_actual_mg, None);
    }
}
