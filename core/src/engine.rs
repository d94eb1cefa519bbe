use core::num::Saturating;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// Player-visible state of a single board cell.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EngineCell {
    Hidden,
    Revealed(u8),
    Flagged,
}

impl EngineCell {
    pub const fn is_unrevealed(self) -> bool {
        matches!(self, Self::Hidden | Self::Flagged)
    }
}

impl Default for EngineCell {
    fn default() -> Self {
        Self::Hidden
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EngineState {
    Ready,
    Active,
    Won,
    Lost,
}

impl EngineState {
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::Ready
    }
}

/// Gameplay engine tracking the player-visible board on top of a [`MineLayout`].
///
/// Reveals are single-cell: there is no flood fill, the driver reveals one
/// cell per move and observes the reported count for exactly that cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayEngine {
    mine_layout: MineLayout,
    board: Array2<EngineCell>,
    revealed_count: Saturating<CellCount>,
    flagged_count: Saturating<CellCount>,
    state: EngineState,
    triggered_mine: Option<Coord2>,
}

impl PlayEngine {
    pub fn new(mine_layout: MineLayout) -> Self {
        let size = mine_layout.size();
        Self {
            mine_layout,
            board: Array2::default(size.to_nd_index()),
            revealed_count: Saturating(0),
            flagged_count: Saturating(0),
            state: Default::default(),
            triggered_mine: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    pub fn size(&self) -> Coord2 {
        self.mine_layout.size()
    }

    pub fn total_mines(&self) -> CellCount {
        self.mine_layout.mine_count()
    }

    pub fn mines_left(&self) -> isize {
        (self.mine_layout.mine_count() as isize) - (self.flagged_count.0 as isize)
    }

    pub fn cell_at(&self, coords: Coord2) -> EngineCell {
        self.board[coords.to_nd_index()]
    }

    pub fn triggered_mine(&self) -> Option<Coord2> {
        self.triggered_mine
    }

    pub fn has_mine_at(&self, coords: Coord2) -> bool {
        self.mine_layout.contains_mine(coords)
    }

    pub fn toggle_flag(&mut self, coords: Coord2) -> Result<MarkOutcome> {
        use EngineCell::*;
        use MarkOutcome::*;

        let coords = self.mine_layout.validate_coords(coords)?;
        self.check_not_finished()?;

        Ok(match self.board[coords.to_nd_index()] {
            Hidden => {
                self.board[coords.to_nd_index()] = Flagged;
                self.flagged_count += 1;
                Changed
            }
            Flagged => {
                self.board[coords.to_nd_index()] = Hidden;
                self.flagged_count -= 1;
                Changed
            }
            Revealed(_) => NoChange,
        })
    }

    /// Reveals exactly one hidden cell and reports what the board knows about
    /// it. Flagged and already-revealed cells are left untouched.
    pub fn reveal(&mut self, coords: Coord2) -> Result<RevealOutcome> {
        let coords = self.mine_layout.validate_coords(coords)?;
        self.check_not_finished()?;

        if !matches!(self.board[coords.to_nd_index()], EngineCell::Hidden) {
            return Ok(RevealOutcome::NoChange);
        }

        if self.mine_layout.contains_mine(coords) {
            self.triggered_mine = Some(coords);
            self.end_game(false);
            return Ok(RevealOutcome::HitMine);
        }

        let adjacent_mines = self.mine_layout.adjacent_mine_count(coords);
        self.board[coords.to_nd_index()] = EngineCell::Revealed(adjacent_mines);
        self.revealed_count += 1;

        if self.revealed_count == Saturating(self.mine_layout.safe_cell_count()) {
            self.end_game(true);
            Ok(RevealOutcome::Won)
        } else {
            self.mark_started();
            Ok(RevealOutcome::Revealed(adjacent_mines))
        }
    }

    fn mark_started(&mut self) {
        if matches!(self.state, EngineState::Ready) {
            self.state = EngineState::Active;
        }
    }

    fn end_game(&mut self, won: bool) {
        if self.state.is_finished() {
            return;
        }

        self.state = if won {
            EngineState::Won
        } else {
            EngineState::Lost
        };
        if won {
            self.triggered_mine = None;
        }
    }

    fn check_not_finished(&self) -> Result<()> {
        if self.state.is_finished() {
            Err(GameError::AlreadyEnded)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(size: Coord2, mines: &[Coord2]) -> MineLayout {
        MineLayout::from_mine_coords(size, mines).unwrap()
    }

    #[test]
    fn reveal_hits_mine_and_sets_triggered_cell() {
        let mut engine = PlayEngine::new(layout((2, 2), &[(0, 0)]));

        let outcome = engine.reveal((0, 0)).unwrap();

        assert_eq!(outcome, RevealOutcome::HitMine);
        assert_eq!(engine.state(), EngineState::Lost);
        assert_eq!(engine.triggered_mine(), Some((0, 0)));
    }

    #[test]
    fn reveal_reports_adjacent_mine_count() {
        let mut engine = PlayEngine::new(layout((3, 3), &[(0, 0), (2, 2)]));

        let outcome = engine.reveal((1, 1)).unwrap();

        assert_eq!(outcome, RevealOutcome::Revealed(2));
        assert_eq!(engine.cell_at((1, 1)), EngineCell::Revealed(2));
        assert_eq!(engine.state(), EngineState::Active);
    }

    #[test]
    fn reveal_does_not_flood_fill_zero_regions() {
        let mut engine = PlayEngine::new(layout((3, 3), &[(2, 2)]));

        let outcome = engine.reveal((0, 0)).unwrap();

        assert_eq!(outcome, RevealOutcome::Revealed(0));
        assert_eq!(engine.cell_at((0, 1)), EngineCell::Hidden);
        assert_eq!(engine.cell_at((1, 1)), EngineCell::Hidden);
    }

    #[test]
    fn revealing_the_last_safe_cell_wins() {
        let mut engine = PlayEngine::new(layout((2, 1), &[(0, 0)]));

        assert_eq!(engine.reveal((1, 0)).unwrap(), RevealOutcome::Won);
        assert_eq!(engine.state(), EngineState::Won);
        assert!(engine.is_finished());
    }

    #[test]
    fn flagged_cells_are_not_revealed() {
        let mut engine = PlayEngine::new(layout((2, 2), &[(0, 0)]));

        engine.reveal((1, 1)).unwrap();
        assert_eq!(engine.toggle_flag((0, 0)).unwrap(), MarkOutcome::Changed);
        assert_eq!(engine.reveal((0, 0)).unwrap(), RevealOutcome::NoChange);
        assert_eq!(engine.mines_left(), 0);
    }

    #[test]
    fn no_moves_accepted_after_the_game_ends() {
        let mut engine = PlayEngine::new(layout((2, 2), &[(0, 0)]));

        engine.reveal((0, 0)).unwrap();

        assert_eq!(engine.reveal((1, 1)), Err(GameError::AlreadyEnded));
        assert_eq!(engine.toggle_flag((0, 1)), Err(GameError::AlreadyEnded));
    }
}
