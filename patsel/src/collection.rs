//! The evolving projection collection.
use std::fmt;

use rustc_hash::FxHashMap;

use patsel_task::Var;

use crate::projection::Projection;

/// An indexed sequence of projection slots with stable indices.
///
/// Slots vacated by a merge are tombstoned rather than removed, so indices
/// stay valid for outstanding flaws and for the variable map. The slot
/// vector only ever grows.
///
/// The live slots hold pairwise disjoint patterns. Every variable covered by
/// a live pattern maps to its unique slot, and `collection_size` tracks the
/// summed sizes of the live pattern databases.
#[derive(Default)]
pub struct ProjectionCollection {
    slots: Vec<Option<Projection>>,
    variable_to_projection: FxHashMap<Var, usize>,
    collection_size: u64,
}

impl ProjectionCollection {
    /// Number of slots, including tombstones.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// The projection in the given slot, if the slot is live.
    pub fn get(&self, index: usize) -> Option<&Projection> {
        self.slots[index].as_ref()
    }

    /// Mutable access to the projection in the given slot.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Projection> {
        self.slots[index].as_mut()
    }

    /// Iterator over the live slots in ascending index order.
    pub fn live(&self) -> impl Iterator<Item = (usize, &Projection)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|projection| (index, projection)))
    }

    /// The slot of the projection covering the given variable, if any.
    pub fn projection_of_var(&self, var: Var) -> Option<usize> {
        self.variable_to_projection.get(&var).copied()
    }

    /// Summed sizes of the live pattern databases.
    pub fn collection_size(&self) -> u64 {
        self.collection_size
    }

    /// Appends a projection and returns its slot index.
    pub fn push(&mut self, projection: Projection) -> usize {
        let index = self.slots.len();
        self.collection_size += projection.pdb().size();
        for &var in projection.pattern().vars() {
            self.variable_to_projection.insert(var, index);
        }
        self.slots.push(Some(projection));
        index
    }

    /// Replaces the slot's projection with a refined one.
    ///
    /// All variables of the new pattern are remapped to this slot, which
    /// also covers the variables taken over from a merged-away slot.
    pub fn replace(&mut self, index: usize, projection: Projection) {
        if let Some(old) = self.slots[index].take() {
            self.collection_size -= old.pdb().size();
        }
        self.collection_size += projection.pdb().size();
        for &var in projection.pattern().vars() {
            self.variable_to_projection.insert(var, index);
        }
        self.slots[index] = Some(projection);
    }

    /// Vacates a slot, leaving a tombstone.
    ///
    /// The caller is responsible for remapping the variables of the removed
    /// pattern; merging does so by replacing the surviving slot.
    pub fn tombstone(&mut self, index: usize) {
        if let Some(removed) = self.slots[index].take() {
            self.collection_size -= removed.pdb().size();
        }
    }

    /// Check the internal bookkeeping, for tests and debug assertions.
    pub fn is_consistent(&self) -> bool {
        let mut size = 0;
        let mut covered = FxHashMap::default();
        for (index, projection) in self.live() {
            size += projection.pdb().size();
            for &var in projection.pattern().vars() {
                // Patterns of live slots may not overlap.
                if covered.insert(var, index).is_some() {
                    return false;
                }
            }
        }
        size == self.collection_size && covered == self.variable_to_projection
    }
}

/// Lists the live patterns, preserving slot order.
impl fmt::Display for ProjectionCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        let mut first = true;
        for (_, projection) in self.live() {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{}", projection.pattern())?;
        }
        write!(f, "]")
    }
}
