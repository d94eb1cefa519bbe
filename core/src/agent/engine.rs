use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use rand::prelude::*;

use super::Constraint;
use crate::{Coord2, NeighborIter};

/// Knowledge base deducing safe and mined cells from revealed counts.
///
/// Knowledge only grows: `safe_cells`, `mine_cells` and `moves_made` never
/// shrink, active constraints only lose cells or get replaced by smaller
/// derived ones. That makes every propagation pass strictly reduce the
/// remaining unknowns and guarantees termination.
#[derive(Debug)]
pub struct InferenceEngine {
    size: Coord2,
    moves_made: BTreeSet<Coord2>,
    safe_cells: BTreeSet<Coord2>,
    mine_cells: BTreeSet<Coord2>,
    constraints: Vec<Constraint>,
    /// Every constraint ever admitted, kept for deduplication. Re-deriving a
    /// previously seen constraint is skipped, which is what lets the
    /// subset-difference rewrite reach a fixed point instead of oscillating
    /// between a constraint and its complement.
    derived: BTreeSet<Constraint>,
    rng: SmallRng,
}

impl InferenceEngine {
    pub fn new(size: Coord2, seed: u64) -> Self {
        Self {
            size,
            moves_made: BTreeSet::new(),
            safe_cells: BTreeSet::new(),
            mine_cells: BTreeSet::new(),
            constraints: Vec::new(),
            derived: BTreeSet::new(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn size(&self) -> Coord2 {
        self.size
    }

    pub fn moves_made(&self) -> &BTreeSet<Coord2> {
        &self.moves_made
    }

    pub fn safe_cells(&self) -> &BTreeSet<Coord2> {
        &self.safe_cells
    }

    pub fn mine_cells(&self) -> &BTreeSet<Coord2> {
        &self.mine_cells
    }

    /// Ingests the board's report that `cell` is safe and has `count` mines
    /// among its in-bounds neighbors, then propagates every consequence.
    ///
    /// Caller contract: `cell` has not been observed before and `count` is
    /// the true adjacent mine count.
    pub fn observe(&mut self, cell: Coord2, count: u8) {
        debug_assert!(!self.moves_made.contains(&cell), "cell observed twice");

        self.moves_made.insert(cell);
        self.mark_safe(cell);

        let mut cells = BTreeSet::new();
        let mut count = count;
        for neighbor in NeighborIter::within(cell, self.size) {
            if self.safe_cells.contains(&neighbor) {
                continue;
            }
            if self.mine_cells.contains(&neighbor) {
                debug_assert!(count > 0, "count inconsistent with known mines");
                count -= 1;
                continue;
            }
            cells.insert(neighbor);
        }

        self.admit(Constraint::new(cells, count));
        self.propagate();
    }

    /// Any cell proven safe that has not been revealed yet.
    pub fn next_safe_move(&self) -> Option<Coord2> {
        self.safe_cells
            .difference(&self.moves_made)
            .next()
            .copied()
    }

    /// Uniform fallback over all cells not yet revealed and not proven to be
    /// mines. Used only when no safe move is known.
    pub fn next_random_move(&mut self) -> Option<Coord2> {
        let (rows, cols) = self.size;
        let mut candidates = Vec::new();

        for row in 0..rows {
            for col in 0..cols {
                let cell = (row, col);
                if !self.mine_cells.contains(&cell) && !self.moves_made.contains(&cell) {
                    candidates.push(cell);
                }
            }
        }

        if candidates.is_empty() {
            None
        } else {
            Some(candidates[self.rng.random_range(0..candidates.len())])
        }
    }

    fn mark_safe(&mut self, cell: Coord2) -> bool {
        debug_assert!(!self.mine_cells.contains(&cell), "cell proven both safe and mine");

        if !self.safe_cells.insert(cell) {
            return false;
        }
        for constraint in &mut self.constraints {
            constraint.resolve_as_safe(cell);
        }
        true
    }

    fn mark_mine(&mut self, cell: Coord2) -> bool {
        debug_assert!(!self.safe_cells.contains(&cell), "cell proven both safe and mine");

        if !self.mine_cells.insert(cell) {
            return false;
        }
        for constraint in &mut self.constraints {
            constraint.resolve_as_mine(cell);
        }
        true
    }

    /// Appends a constraint unless it is empty or has been admitted before.
    fn admit(&mut self, constraint: Constraint) {
        if constraint.is_empty() {
            return;
        }
        if !self.derived.insert(constraint.clone()) {
            return;
        }
        self.constraints.push(constraint);
    }

    /// Runs certainty extraction, cleanup, and subset-difference inference
    /// until a full pass changes nothing.
    fn propagate(&mut self) {
        let mut passes = 0usize;
        loop {
            passes += 1;
            let mut changed = self.extract_certainties();
            changed |= self.sweep_spent();
            changed |= self.infer_differences();
            if !changed {
                break;
            }
        }
        log::debug!(
            "knowledge stable after {passes} passes: {} safe, {} mines, {} active constraints",
            self.safe_cells.len(),
            self.mine_cells.len(),
            self.constraints.len()
        );
    }

    /// Marks every cell some constraint fully determines. Marking resolves
    /// the cell out of all constraints, so this is idempotent.
    fn extract_certainties(&mut self) -> bool {
        let mut safes = Vec::new();
        let mut mines = Vec::new();

        for constraint in &self.constraints {
            if let Some(cells) = constraint.known_safes() {
                safes.extend(cells.iter().copied());
            } else if let Some(cells) = constraint.known_mines() {
                mines.extend(cells.iter().copied());
            }
        }

        let mut changed = false;
        for cell in safes {
            changed |= self.mark_safe(cell);
        }
        for cell in mines {
            changed |= self.mark_mine(cell);
        }
        changed
    }

    /// Drops constraints that are empty or duplicates of an earlier one.
    fn sweep_spent(&mut self) -> bool {
        let before = self.constraints.len();
        let mut kept: BTreeSet<Constraint> = BTreeSet::new();
        self.constraints
            .retain(|constraint| !constraint.is_empty() && kept.insert(constraint.clone()));
        self.constraints.len() != before
    }

    /// For every strict-subset pair `(A, B)` derives `A − B`, replacing `B`
    /// with the derived constraint. Pairs whose difference was already
    /// admitted at some point are skipped.
    fn infer_differences(&mut self) -> bool {
        let snapshot = self.constraints.clone();
        let mut changed = false;

        for larger in &snapshot {
            for smaller in &snapshot {
                if larger == smaller || !smaller.is_strict_subset_of(larger) {
                    continue;
                }

                let difference = larger.difference(smaller);
                if self.derived.contains(&difference) {
                    continue;
                }

                if let Some(pos) = self.constraints.iter().position(|c| c == smaller) {
                    self.constraints.remove(pos);
                }
                self.admit(difference);
                changed = true;
            }
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraint(cells: &[Coord2], count: u8) -> Constraint {
        Constraint::new(cells.iter().copied().collect(), count)
    }

    fn cell_set(cells: &[Coord2]) -> BTreeSet<Coord2> {
        cells.iter().copied().collect()
    }

    #[test]
    fn observing_zero_marks_all_neighbors_safe() {
        let mut agent = InferenceEngine::new((2, 2), 0);

        agent.observe((0, 0), 0);

        assert!(agent.safe_cells().contains(&(0, 1)));
        assert!(agent.safe_cells().contains(&(1, 0)));
        assert!(agent.safe_cells().contains(&(1, 1)));
        assert!(agent.mine_cells().is_empty());
    }

    #[test]
    fn observing_a_full_count_marks_all_neighbors_as_mines() {
        let mut agent = InferenceEngine::new((2, 2), 0);

        agent.observe((0, 0), 3);

        assert_eq!(agent.mine_cells(), &cell_set(&[(0, 1), (1, 0), (1, 1)]));
    }

    #[test]
    fn corner_observation_constrains_exactly_three_cells() {
        let mut agent = InferenceEngine::new((8, 8), 0);

        agent.observe((0, 0), 1);

        assert_eq!(agent.constraints.len(), 1);
        assert_eq!(
            agent.constraints[0],
            constraint(&[(0, 1), (1, 0), (1, 1)], 1)
        );
    }

    #[test]
    fn subset_difference_derives_the_remainder() {
        let mut agent = InferenceEngine::new((8, 8), 0);

        agent.admit(constraint(&[(0, 0), (0, 1), (0, 2)], 1));
        agent.admit(constraint(&[(0, 0), (0, 1)], 1));
        agent.propagate();

        assert!(agent.safe_cells().contains(&(0, 2)));
        assert!(agent.mine_cells().is_empty());
    }

    #[test]
    fn chained_inference_reaches_a_distant_fact() {
        let mut agent = InferenceEngine::new((8, 8), 0);

        // {a,b}=1 and {a,b,c,d}=2 leave {c,d}=1; adding {c,d,e}=1 proves e safe.
        agent.admit(constraint(&[(0, 0), (0, 1)], 1));
        agent.admit(constraint(&[(0, 0), (0, 1), (1, 0), (1, 1)], 2));
        agent.admit(constraint(&[(1, 0), (1, 1), (2, 0)], 1));
        agent.propagate();

        assert!(agent.safe_cells().contains(&(2, 0)));
    }

    #[test]
    fn known_mine_discounts_later_observations() {
        let mut agent = InferenceEngine::new((1, 4), 0);

        agent.observe((0, 0), 1);
        assert_eq!(agent.mine_cells(), &cell_set(&[(0, 1)]));

        // (0,1) is already known to be a mine, so the new observation
        // reduces to {(0,3)}=0 and proves the last cell safe.
        agent.observe((0, 2), 1);

        assert!(agent.safe_cells().contains(&(0, 3)));
        assert!(agent.constraints.is_empty());
    }

    #[test]
    fn propagation_keeps_safe_and_mine_sets_disjoint() {
        let mut agent = InferenceEngine::new((3, 3), 0);

        agent.observe((1, 1), 8);
        for constraint in &agent.constraints {
            assert!(!constraint.is_empty());
            assert!(usize::from(constraint.count()) <= constraint.cells().len());
        }

        assert!(agent.safe_cells().is_disjoint(agent.mine_cells()));
    }

    #[test]
    fn difference_rewrite_terminates_without_new_facts() {
        let mut agent = InferenceEngine::new((8, 8), 0);

        // A = {w,x,y,z}=2 with B = {w,x}=1 derives {y,z}=1, whose complement
        // is B itself; the admission history stops the rewrite from cycling.
        agent.admit(constraint(&[(0, 0), (0, 1), (0, 2), (0, 3)], 2));
        agent.admit(constraint(&[(0, 0), (0, 1)], 1));
        agent.propagate();

        assert!(agent.safe_cells().is_empty());
        assert!(agent.mine_cells().is_empty());
        assert_eq!(agent.constraints.len(), 2);
    }

    #[test]
    fn no_safe_move_before_any_observation() {
        let mut agent = InferenceEngine::new((8, 8), 0);

        assert_eq!(agent.next_safe_move(), None);

        let (row, col) = agent.next_random_move().unwrap();
        assert!(row < 8 && col < 8);
    }

    #[test]
    fn safe_moves_skip_cells_already_revealed() {
        let mut agent = InferenceEngine::new((2, 2), 0);

        agent.observe((0, 0), 0);
        assert!(agent.next_safe_move().is_some());

        agent.observe((0, 1), 0);
        agent.observe((1, 0), 0);
        agent.observe((1, 1), 0);

        assert_eq!(agent.next_safe_move(), None);
    }

    #[test]
    fn random_fallback_avoids_known_mines() {
        let mut agent = InferenceEngine::new((2, 2), 0);

        agent.observe((0, 0), 3);

        for _ in 0..16 {
            assert_eq!(agent.next_random_move(), None);
        }
    }

    #[test]
    fn knowledge_only_grows_across_observations() {
        let mut agent = InferenceEngine::new((3, 3), 0);

        agent.observe((0, 0), 1);
        let safes_before = agent.safe_cells().clone();
        let moves_before = agent.moves_made().clone();

        agent.observe((2, 2), 1);

        assert!(agent.safe_cells().is_superset(&safes_before));
        assert!(agent.moves_made().is_superset(&moves_before));
    }
}
