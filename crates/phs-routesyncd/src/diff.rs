//! Diff engine: compares current and desired route sets into an ordered
//! changeset.
//!
//! Pure and deterministic; a total function of its two inputs. Equal inputs
//! produce an empty changeset, which is the idempotence guarantee the rest
//! of the daemon depends on.

use phs_types::{RouteEntry, RouteSet};

/// Replacement of a route whose gateway is unchanged but whose other fields
/// differ. Applied as a remove of `old` followed by an add of `new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteReplace {
    /// The entry currently in the table.
    pub old: RouteEntry,
    /// The entry that should replace it.
    pub new: RouteEntry,
}

/// The changes needed to converge a current route set to a desired one.
///
/// The three sequences are disjoint by gateway key and each is sorted by
/// the lexicographic string form of the gateway, so application side
/// effects are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    /// Entries present in desired but not current.
    pub to_add: Vec<RouteEntry>,
    /// Entries present in current but not desired.
    pub to_remove: Vec<RouteEntry>,
    /// Entries present in both whose fields differ.
    pub to_replace: Vec<RouteReplace>,
}

impl Changeset {
    /// Returns true if no changes are needed.
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty() && self.to_replace.is_empty()
    }

    /// Returns the total number of route operations this changeset will
    /// issue (a replace counts as two).
    pub fn op_count(&self) -> usize {
        self.to_add.len() + self.to_remove.len() + 2 * self.to_replace.len()
    }

    /// Route entries to remove, in application order: plain removals and
    /// the old halves of replacements, sorted by gateway.
    pub fn removals(&self) -> Vec<RouteEntry> {
        let mut entries: Vec<RouteEntry> = self
            .to_remove
            .iter()
            .copied()
            .chain(self.to_replace.iter().map(|r| r.old))
            .collect();
        sort_by_gateway(&mut entries);
        entries
    }

    /// Route entries to add, in application order: plain additions and the
    /// new halves of replacements, sorted by gateway. Applied only after
    /// every removal, so removals free resources before additions reuse
    /// them.
    pub fn additions(&self) -> Vec<RouteEntry> {
        let mut entries: Vec<RouteEntry> = self
            .to_add
            .iter()
            .copied()
            .chain(self.to_replace.iter().map(|r| r.new))
            .collect();
        sort_by_gateway(&mut entries);
        entries
    }
}

fn sort_by_gateway(entries: &mut [RouteEntry]) {
    entries.sort_by_key(|e| e.gateway.to_string());
}

/// Computes the changeset that converges `current` to `desired`.
pub fn diff(current: &RouteSet, desired: &RouteSet) -> Changeset {
    let mut changes = Changeset::default();

    for entry in desired.iter() {
        match current.get(&entry.gateway) {
            None => changes.to_add.push(*entry),
            Some(existing) if existing != entry => changes.to_replace.push(RouteReplace {
                old: *existing,
                new: *entry,
            }),
            Some(_) => {}
        }
    }

    for entry in current.iter() {
        if !desired.contains(&entry.gateway) {
            changes.to_remove.push(*entry);
        }
    }

    sort_by_gateway(&mut changes.to_add);
    sort_by_gateway(&mut changes.to_remove);
    changes.to_replace.sort_by_key(|r| r.new.gateway.to_string());

    changes
}
