//! Purchase order builder.
//!
//! Keeps a peptide list and a supply checklist, renders them as a printable
//! order, exports CSV and turns the draft into saved order records.

use crate::tables::{default_supplies, CUSTOM_VIAL_SIZE};
use crate::{
    Error, Order, OrderItemType, OrderLineItem, PeptideItem, Result, SupplyItem, SupplyPatch,
    SupplyRecurrence, VendorType,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

/// Draft order: peptides to buy plus a checklist of supplies
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct OrderBuilder {
    #[serde(default)]
    pub vendor_name: String,
    #[serde(default)]
    pub peptides: Vec<PeptideItem>,
    #[serde(default = "seed_supplies")]
    pub supplies: Vec<SupplyItem>,
}

impl Default for OrderBuilder {
    fn default() -> Self {
        Self {
            vendor_name: String::new(),
            peptides: Vec::new(),
            supplies: seed_supplies(),
        }
    }
}

fn seed_supplies() -> Vec<SupplyItem> {
    default_supplies().to_vec()
}

/// A row in the CSV export
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    kind: &'static str,
    name: &'a str,
    detail: &'a str,
    quantity: u32,
    recurrence: &'static str,
    url: Option<&'a str>,
}

impl OrderBuilder {
    pub fn with_vendor(vendor_name: impl Into<String>) -> Self {
        Self {
            vendor_name: vendor_name.into(),
            ..Self::default()
        }
    }

    /// Add a peptide line and return its id
    pub fn add_peptide(&mut self, name: &str, vial_size: &str, quantity: u32) -> Result<Uuid> {
        let name = name.trim();
        let vial_size = vial_size.trim();
        if name.is_empty() {
            return Err(Error::Order("Peptide name is required".into()));
        }
        if vial_size.is_empty() || vial_size == CUSTOM_VIAL_SIZE {
            return Err(Error::Order("Vial size is required".into()));
        }
        if quantity == 0 {
            return Err(Error::Order("Quantity must be at least 1".into()));
        }

        let id = Uuid::new_v4();
        self.peptides.push(PeptideItem {
            id,
            name: name.to_string(),
            vial_size: vial_size.to_string(),
            quantity,
        });
        tracing::debug!("Added peptide {} ({} x{})", name, vial_size, quantity);
        Ok(id)
    }

    pub fn remove_peptide(&mut self, id: Uuid) -> bool {
        let before = self.peptides.len();
        self.peptides.retain(|p| p.id != id);
        self.peptides.len() != before
    }

    /// Add a free-text supply line, unchecked, and return its id
    pub fn add_custom_supply(&mut self, name: &str) -> Result<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(Error::Order("Supply name is required".into()));
        }

        let id = Uuid::new_v4().to_string();
        self.supplies.push(SupplyItem {
            id: id.clone(),
            name: trimmed.to_string(),
            detail: String::new(),
            quantity: 1,
            checked: false,
            recurrence: SupplyRecurrence::Recurring,
            url: None,
        });
        Ok(id)
    }

    pub fn remove_supply(&mut self, id: &str) -> bool {
        let before = self.supplies.len();
        self.supplies.retain(|s| s.id != id);
        self.supplies.len() != before
    }

    pub fn update_supply(&mut self, id: &str, patch: SupplyPatch) -> Result<()> {
        if patch.quantity == Some(0) {
            return Err(Error::Order("Quantity must be at least 1".into()));
        }
        let supply = self
            .supplies
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::Order(format!("No supply with id {}", id)))?;

        if let Some(checked) = patch.checked {
            supply.checked = checked;
        }
        if let Some(quantity) = patch.quantity {
            supply.quantity = quantity;
        }
        if let Some(recurrence) = patch.recurrence {
            supply.recurrence = recurrence;
        }
        if let Some(detail) = patch.detail {
            supply.detail = detail;
        }
        Ok(())
    }

    pub fn checked_supplies(&self) -> impl Iterator<Item = &SupplyItem> {
        self.supplies.iter().filter(|s| s.checked)
    }

    /// Whether there is anything worth printing
    pub fn has_any_output(&self) -> bool {
        !self.peptides.is_empty() || self.checked_supplies().next().is_some()
    }

    /// Render the printable order
    pub fn render_checklist(&self, printed_at: DateTime<Utc>) -> String {
        let mut out = String::new();
        let vendor = if self.vendor_name.trim().is_empty() {
            "(no vendor)"
        } else {
            self.vendor_name.trim()
        };

        let _ = writeln!(out, "PURCHASE ORDER");
        let _ = writeln!(out, "Vendor:  {}", vendor);
        let _ = writeln!(out, "Printed: {}", printed_at.format("%Y-%m-%d %H:%M UTC"));
        let _ = writeln!(out);

        let _ = writeln!(out, "Peptides");
        if self.peptides.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for peptide in &self.peptides {
            let _ = writeln!(
                out,
                "  [ ] {} — {} x{}",
                peptide.name, peptide.vial_size, peptide.quantity
            );
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "Supplies");
        let mut any_supply = false;
        for supply in self.checked_supplies() {
            any_supply = true;
            let detail = if supply.detail.is_empty() {
                String::new()
            } else {
                format!(" ({})", supply.detail)
            };
            let _ = writeln!(
                out,
                "  [ ] {}{} x{} — {}",
                supply.name,
                detail,
                supply.quantity,
                supply.recurrence.as_str()
            );
            if let Some(ref url) = supply.url {
                let _ = writeln!(out, "      {}", url);
            }
        }
        if !any_supply {
            let _ = writeln!(out, "  (none)");
        }

        out
    }

    /// Write peptides and checked supplies as CSV, returning the row count
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        let mut rows = 0;

        for peptide in &self.peptides {
            csv_writer.serialize(CsvRow {
                kind: "peptide",
                name: &peptide.name,
                detail: &peptide.vial_size,
                quantity: peptide.quantity,
                recurrence: SupplyRecurrence::OneTime.as_str(),
                url: None,
            })?;
            rows += 1;
        }
        for supply in self.checked_supplies() {
            csv_writer.serialize(CsvRow {
                kind: "supply",
                name: &supply.name,
                detail: &supply.detail,
                quantity: supply.quantity,
                recurrence: supply.recurrence.as_str(),
                url: supply.url.as_deref(),
            })?;
            rows += 1;
        }

        csv_writer.flush()?;
        Ok(rows)
    }

    /// Turn the draft into a saved order with one line per peptide and checked supply
    pub fn finalize(
        &self,
        protocol_id: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> Result<(Order, Vec<OrderLineItem>)> {
        if !self.has_any_output() {
            return Err(Error::Order("Order is empty".into()));
        }

        let order = Order {
            id: Uuid::new_v4(),
            protocol_id,
            vendor_name: self.vendor_name.trim().to_string(),
            created_at,
        };

        let peptide_lines = self.peptides.iter().map(|p| OrderLineItem {
            id: Uuid::new_v4(),
            order_id: order.id,
            item_type: OrderItemType::Peptide,
            name: p.name.clone(),
            quantity: p.quantity,
            unit: "vials".into(),
            vendor: VendorType::PeptideProvider,
            url: None,
            notes: p.vial_size.clone(),
            recurrence: SupplyRecurrence::OneTime,
        });
        let supply_lines = self.checked_supplies().map(|s| OrderLineItem {
            id: Uuid::new_v4(),
            order_id: order.id,
            item_type: OrderItemType::Supply,
            name: s.name.clone(),
            quantity: s.quantity,
            unit: "units".into(),
            vendor: VendorType::Other,
            url: s.url.clone(),
            notes: s.detail.clone(),
            recurrence: s.recurrence,
        });

        let lines: Vec<_> = peptide_lines.chain(supply_lines).collect();
        tracing::info!("Finalized order {} with {} lines", order.id, lines.len());
        Ok((order, lines))
    }
}
