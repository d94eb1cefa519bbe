use alloc::collections::BTreeSet;
use serde::{Deserialize, Serialize};

use crate::Coord2;

/// Logical statement "exactly `count` of these cells are mines".
///
/// Shrinks in place as cells are resolved: a cell proven to be a mine leaves
/// the set and takes one unit of `count` with it, a cell proven safe leaves
/// the set with `count` untouched. An empty constraint carries no information
/// and is dropped by its owner.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Constraint {
    cells: BTreeSet<Coord2>,
    count: u8,
}

impl Constraint {
    pub fn new(cells: BTreeSet<Coord2>, count: u8) -> Self {
        debug_assert!(
            usize::from(count) <= cells.len(),
            "mine count exceeds constrained cells"
        );
        Self { cells, count }
    }

    pub fn cells(&self) -> &BTreeSet<Coord2> {
        &self.cells
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All cells iff every one of them must be a mine.
    pub fn known_mines(&self) -> Option<&BTreeSet<Coord2>> {
        if usize::from(self.count) == self.cells.len() {
            Some(&self.cells)
        } else {
            None
        }
    }

    /// All cells iff none of them can be a mine.
    pub fn known_safes(&self) -> Option<&BTreeSet<Coord2>> {
        if self.count == 0 {
            Some(&self.cells)
        } else {
            None
        }
    }

    /// Caller contract: `cell` has been proven to be a mine.
    pub fn resolve_as_mine(&mut self, cell: Coord2) {
        if self.cells.remove(&cell) {
            debug_assert!(self.count > 0, "resolved a mine out of a zero-count constraint");
            self.count -= 1;
        }
    }

    /// Caller contract: `cell` has been proven safe.
    pub fn resolve_as_safe(&mut self, cell: Coord2) {
        self.cells.remove(&cell);
    }

    pub fn is_strict_subset_of(&self, other: &Constraint) -> bool {
        self.cells.len() < other.cells.len() && self.cells.is_subset(&other.cells)
    }

    /// Subset-difference inference: given `smaller` strictly contained in
    /// `self`, the cells outside `smaller` hold the remaining mines.
    pub fn difference(&self, smaller: &Constraint) -> Constraint {
        debug_assert!(smaller.is_strict_subset_of(self));
        debug_assert!(smaller.count <= self.count, "subset holds more mines than superset");

        let cells = self.cells.difference(&smaller.cells).copied().collect();
        Constraint::new(cells, self.count - smaller.count)
    }
}
