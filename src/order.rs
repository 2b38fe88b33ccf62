//! File ordering and selection.
//!
//! [`FileOrder`] tracks which uploaded files go into the merged document and
//! in what sequence. It is a plain owned value: the caller keeps it in its
//! own session state and passes it by reference into every edit, so there is
//! no ambient global and the store can be tested without any UI.
//!
//! ## Reconciliation
//!
//! [`FileOrder::reconcile`] compares the *set* of tracked names with the set
//! of currently uploaded names. When they differ in any way, the whole list
//! is reset to upload order with every file included. Removing a file from
//! the upload set therefore prunes it automatically, but adding one discards
//! any manual reordering done so far.

use crate::error::OrderError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// One file in the ordering list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEntry {
    /// File identifier (its upload name).
    pub name: String,
    /// Whether the file is merged into the output.
    pub included: bool,
}

/// The user-controlled merge order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOrder {
    entries: Vec<OrderEntry>,
}

impl FileOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store already reconciled with `names`.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut order = Self::new();
        order.reconcile(names);
        order
    }

    /// Bring the list in line with the uploaded file names.
    ///
    /// Returns `true` when the list was reset. Duplicate names keep their
    /// first position.
    pub fn reconcile<S: AsRef<str>>(&mut self, current: &[S]) -> bool {
        let wanted: HashSet<&str> = current.iter().map(AsRef::as_ref).collect();
        let tracked: HashSet<&str> = self.entries.iter().map(|e| e.name.as_str()).collect();
        if wanted == tracked {
            return false;
        }

        let mut seen = HashSet::with_capacity(current.len());
        self.entries = current
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| seen.insert(*name))
            .map(|name| OrderEntry {
                name: name.to_string(),
                included: true,
            })
            .collect();
        debug!("Order list reset to {} files", self.entries.len());
        true
    }

    /// Swap the entry at `index` with the one above it.
    ///
    /// Returns `Ok(false)` without changes when `index` is already first.
    pub fn move_up(&mut self, index: usize) -> Result<bool, OrderError> {
        self.check(index)?;
        if index == 0 {
            return Ok(false);
        }
        self.entries.swap(index, index - 1);
        Ok(true)
    }

    /// Swap the entry at `index` with the one below it.
    ///
    /// Returns `Ok(false)` without changes when `index` is already last.
    pub fn move_down(&mut self, index: usize) -> Result<bool, OrderError> {
        self.check(index)?;
        if index + 1 == self.entries.len() {
            return Ok(false);
        }
        self.entries.swap(index, index + 1);
        Ok(true)
    }

    pub fn set_included(&mut self, index: usize, included: bool) -> Result<(), OrderError> {
        self.check(index)?;
        self.entries[index].included = included;
        Ok(())
    }

    /// Flip the inclusion flag; returns the new value.
    pub fn toggle(&mut self, index: usize) -> Result<bool, OrderError> {
        self.check(index)?;
        let entry = &mut self.entries[index];
        entry.included = !entry.included;
        Ok(entry.included)
    }

    /// Names of the included files, in list order.
    pub fn effective_order(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.included)
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Current index of `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    /// Like [`position`](Self::position) but as an error for callers that
    /// address entries by name.
    pub fn require(&self, name: &str) -> Result<usize, OrderError> {
        self.position(name).ok_or_else(|| OrderError::UnknownFile {
            name: name.to_string(),
        })
    }

    pub fn entries(&self) -> &[OrderEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn included_count(&self) -> usize {
        self.entries.iter().filter(|e| e.included).count()
    }

    fn check(&self, index: usize) -> Result<(), OrderError> {
        if index >= self.entries.len() {
            return Err(OrderError::IndexOutOfBounds {
                index,
                len: self.entries.len(),
            });
        }
        Ok(())
    }
}
