//! Storage layout compatibility between two implementations of a proxy.
//!
//! A new implementation may only append variables. Every variable of the
//! current implementation must stay at the same slot and offset, with the
//! same name and type.
use core::fmt;

use alloy_primitives::U256;
use devnet::{StorageEntry, StorageLayout};
use serde::{Deserialize, Serialize};

/// A way in which a new layout breaks the current one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LayoutIssue {
    /// A variable is gone.
    Deleted {
        /// Name of the variable.
        label: String,
        /// Slot it occupied.
        slot: U256,
        /// Offset it occupied.
        offset: u8,
    },
    /// A variable now lives at a different position.
    Moved {
        /// Name of the variable.
        label: String,
        /// Slot it used to occupy.
        from_slot: U256,
        /// Slot it occupies now.
        to_slot: U256,
    },
    /// Another variable took the position of an existing one.
    Replaced {
        /// Name of the variable that used to be there.
        label: String,
        /// Name of the variable that is there now.
        replacement: String,
        /// Slot both occupy.
        slot: U256,
    },
    /// A variable changed type.
    Retyped {
        /// Name of the variable.
        label: String,
        /// Type it used to have.
        from_type: String,
        /// Type it has now.
        to_type: String,
    },
}

impl fmt::Display for LayoutIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutIssue::Deleted { label, slot, offset } => write!(
                f,
                "`{label}` (slot {slot:#x}, offset {offset}) was deleted"
            ),
            LayoutIssue::Moved { label, from_slot, to_slot } => write!(
                f,
                "`{label}` moved from slot {from_slot:#x} to slot {to_slot:#x}"
            ),
            LayoutIssue::Replaced { label, replacement, slot } => write!(
                f,
                "`{label}` at slot {slot:#x} was replaced by `{replacement}`"
            ),
            LayoutIssue::Retyped { label, from_type, to_type } => write!(
                f,
                "`{label}` changed type from `{from_type}` to `{to_type}`"
            ),
        }
    }
}

/// Lists how `new` breaks `current`. An empty list means `new` is an
/// append-only extension of `current`.
#[must_use]
pub fn compare(
    current: &StorageLayout,
    new: &StorageLayout,
) -> Vec<LayoutIssue> {
    current
        .storage
        .iter()
        .filter_map(|entry| compare_entry(entry, new))
        .collect()
}

fn compare_entry(
    entry: &StorageEntry,
    new: &StorageLayout,
) -> Option<LayoutIssue> {
    let intruder = new
        .storage
        .iter()
        .find(|other| other.label != entry.label && other.overlaps(entry));
    if let Some(intruder) = intruder {
        return Some(LayoutIssue::Replaced {
            label: entry.label.clone(),
            replacement: intruder.label.clone(),
            slot: entry.slot,
        });
    }

    let Some(successor) = new.entry_at(entry.slot, entry.offset) else {
        return Some(match find_label(new, &entry.label) {
            Some(moved) => LayoutIssue::Moved {
                label: entry.label.clone(),
                from_slot: entry.slot,
                to_slot: moved.slot,
            },
            None => LayoutIssue::Deleted {
                label: entry.label.clone(),
                slot: entry.slot,
                offset: entry.offset,
            },
        });
    };

    if successor.ty != entry.ty {
        Some(LayoutIssue::Retyped {
            label: entry.label.clone(),
            from_type: entry.ty.clone(),
            to_type: successor.ty.clone(),
        })
    } else {
        None
    }
}

fn find_label<'l>(
    layout: &'l StorageLayout,
    label: &str,
) -> Option<&'l StorageEntry> {
    layout.storage.iter().find(|entry| entry.label == label)
}
