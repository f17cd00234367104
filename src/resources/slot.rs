//! Load-state tracking for every named resource of a diorama.
//!
//! Each resource gets exactly one [`AssetSlot`]. Slots are registered up front,
//! flipped from `Pending` to `Loaded`/`Failed` once, and never removed while the
//! session lives. The registry answers the barrier question ("has everything
//! been attempted?") that gates the startup ramp.

use log::warn;

use crate::{error::LoadError, resources::{AssetId, AssetKind}};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Pending,
    Loaded,
    Failed,
}

#[derive(Debug)]
pub struct AssetSlot<T> {
    pub id: AssetId,
    pub kind: AssetKind,
    pub status: SlotStatus,
    pub handle: Option<T>,
    pub error: Option<LoadError>,
}

impl<T> AssetSlot<T> {
    pub fn new(id: AssetId, kind: AssetKind) -> Self {
        Self {
            id,
            kind,
            status: SlotStatus::Pending,
            handle: None,
            error: None,
        }
    }

    pub fn is_attempted(&self) -> bool {
        self.status != SlotStatus::Pending
    }

    /// Loaded and error free.
    pub fn is_usable(&self) -> bool {
        self.status == SlotStatus::Loaded && self.error.is_none()
    }
}

/// Ordered collection of slots. Insertion order is kept so that
/// [`AssetRegistry::errors`] is deterministic.
#[derive(Debug)]
pub struct AssetRegistry<T> {
    slots: Vec<AssetSlot<T>>,
}

impl<T> Default for AssetRegistry<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> AssetRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pending slot. Registering an id twice keeps the first slot.
    pub fn register_slot(&mut self, id: impl Into<AssetId>, kind: AssetKind) {
        let id = id.into();
        if self.get(&id).is_some() {
            warn!("Asset slot {} is already registered", id);
            return;
        }
        self.slots.push(AssetSlot::new(id, kind));
    }

    /// Returns `true` if the slot changed. Reports for unknown or already
    /// attempted slots are ignored.
    pub fn report_success(&mut self, id: &AssetId, handle: T) -> bool {
        match self.pending_mut(id) {
            Some(slot) => {
                slot.status = SlotStatus::Loaded;
                slot.handle = Some(handle);
                true
            }
            None => false,
        }
    }

    pub fn report_failure(&mut self, id: &AssetId, error: LoadError) -> bool {
        match self.pending_mut(id) {
            Some(slot) => {
                slot.status = SlotStatus::Failed;
                slot.error = Some(error);
                true
            }
            None => false,
        }
    }

    pub fn is_fully_attempted(&self) -> bool {
        self.slots.iter().all(AssetSlot::is_attempted)
    }

    pub fn errors(&self) -> Vec<(AssetId, LoadError)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.error.clone().map(|err| (slot.id.clone(), err)))
            .collect()
    }

    pub fn get(&self, id: &AssetId) -> Option<&AssetSlot<T>> {
        self.slots.iter().find(|slot| &slot.id == id)
    }

    pub fn get_mut(&mut self, id: &AssetId) -> Option<&mut AssetSlot<T>> {
        self.slots.iter_mut().find(|slot| &slot.id == id)
    }

    /// The handle of a usable slot.
    pub fn handle(&self, id: &AssetId) -> Option<&T> {
        self.get(id)
            .filter(|slot| slot.is_usable())
            .and_then(|slot| slot.handle.as_ref())
    }

    pub fn status(&self, id: &AssetId) -> Option<SlotStatus> {
        self.get(id).map(|slot| slot.status)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetSlot<T>> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drops every loaded handle. Status and errors stay observable.
    pub fn dispose(&mut self) {
        self.slots.iter_mut().for_each(|slot| {
            slot.handle = None;
        });
    }

    fn pending_mut(&mut self, id: &AssetId) -> Option<&mut AssetSlot<T>> {
        match self.get_mut(id) {
            None => {
                warn!("Load report for unregistered asset {}", id);
                None
            }
            Some(slot) if slot.is_attempted() => {
                warn!(
                    "Asset {} was already attempted ({:?}), ignoring second report",
                    id, slot.status
                );
                None
            }
            Some(slot) => Some(slot),
        }
    }
}
