//! Local record store with file locking.
//!
//! The whole store is one JSON blob saved under a fixed key. There is no
//! migration or integrity logic: missing fields take their defaults and a
//! corrupt blob is replaced by an empty store.

use crate::order::OrderBuilder;
use crate::{
    Error, LogEntry, Order, OrderLineItem, Protocol, ProtocolItem, ReconstitutionEvent, Result,
};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Key the blob is stored under
pub const STORAGE_KEY: &str = "biohack_tools_v1";

/// Every persisted record collection
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LocalStore {
    pub protocols: Vec<Protocol>,
    pub protocol_items: Vec<ProtocolItem>,
    pub reconstitution_events: Vec<ReconstitutionEvent>,
    pub log_entries: Vec<LogEntry>,
    pub orders: Vec<Order>,
    pub order_line_items: Vec<OrderLineItem>,
    /// The order currently being built, if any
    pub purchase_draft: Option<OrderBuilder>,
}

impl LocalStore {
    /// Path of the store blob inside a data directory
    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(format!("{}.json", STORAGE_KEY))
    }

    /// Load the store from a file with shared locking
    ///
    /// Returns an empty store if the file doesn't exist.
    /// If the file is corrupted, logs a warning and returns an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No store file found, using empty store");
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open store {:?}: {}. Using defaults.", path, e);
                return Ok(Self::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock store {:?}: {}. Using defaults.", path, e);
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!("Failed to read store {:?}: {}. Using defaults.", path, e);
            return Ok(Self::default());
        }

        file.unlock()?;

        match serde_json::from_str::<LocalStore>(&contents) {
            Ok(store) => {
                tracing::debug!("Loaded store from {:?}", path);
                Ok(store)
            }
            Err(e) => {
                tracing::warn!("Failed to parse store {:?}: {}. Using defaults.", path, e);
                Ok(Self::default())
            }
        }
    }

    /// Save the store atomically
    ///
    /// Writes to a locked temp file in the same directory, syncs it, then
    /// renames it over the original.
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Other(format!("Store path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved store to {:?}", path);
        Ok(())
    }

    /// Load the store, modify it, and save it back
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut LocalStore) -> Result<()>,
    {
        let mut store = Self::load(path)?;
        f(&mut store)?;
        store.save(path)?;
        Ok(store)
    }

    /// Delete the stored blob; a missing file is not an error
    pub fn clear(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::info!("Cleared store {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// The purchase draft, created with default supplies on first use
    pub fn draft_mut(&mut self) -> &mut OrderBuilder {
        self.purchase_draft.get_or_insert_with(OrderBuilder::default)
    }

    /// Move the purchase draft into saved orders
    pub fn finalize_draft(
        &mut self,
        protocol_id: Option<uuid::Uuid>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Order> {
        let draft = self
            .purchase_draft
            .as_ref()
            .ok_or_else(|| Error::Order("No order in progress".into()))?;
        let (order, lines) = draft.finalize(protocol_id, now)?;

        self.orders.push(order.clone());
        self.order_line_items.extend(lines);
        self.purchase_draft = None;
        Ok(order)
    }

    /// Line items belonging to one saved order
    pub fn lines_for(&self, order_id: uuid::Uuid) -> impl Iterator<Item = &OrderLineItem> {
        self.order_line_items
            .iter()
            .filter(move |l| l.order_id == order_id)
    }
}
