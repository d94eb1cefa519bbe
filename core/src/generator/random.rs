use ndarray::Array2;

use super::*;

/// Places mines uniformly at random, optionally keeping the starting cell
/// mine-free when the board has room for that.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomLayoutGenerator {
    seed: u64,
    start: Coord2,
    start_policy: StartPolicy,
}

impl RandomLayoutGenerator {
    pub fn new(seed: u64, start: Coord2, start_policy: StartPolicy) -> Self {
        Self {
            seed,
            start,
            start_policy,
        }
    }
}

impl MineLayoutGenerator for RandomLayoutGenerator {
    fn generate(self, config: GameConfig) -> MineLayout {
        use rand::prelude::*;

        let total_cells = config.total_cells();
        let (rows, cols) = config.size;

        // optimize for full boards
        if config.mines >= total_cells {
            if config.mines > total_cells {
                log::warn!(
                    "Board already full, generated anyway, requested {} but only fits {}",
                    config.mines,
                    total_cells
                );
            }
            return MineLayout::from_mine_mask(Array2::from_elem(config.size.to_nd_index(), true));
        }

        let start_policy = match self.start_policy {
            StartPolicy::SafeStart if config.mines + 1 > total_cells => {
                log::warn!("Cannot keep start cell safe, falling back to random placement");
                StartPolicy::Anywhere
            }
            policy => policy,
        };

        let mut mine_mask: Array2<bool> = Array2::default(config.size.to_nd_index());
        let mut mines_placed: CellCount = 0;
        let mut rng = SmallRng::seed_from_u64(self.seed);

        while mines_placed < config.mines {
            let coords = (rng.random_range(0..rows), rng.random_range(0..cols));
            if matches!(start_policy, StartPolicy::SafeStart) && coords == self.start {
                continue;
            }
            if !mine_mask[coords.to_nd_index()] {
                mine_mask[coords.to_nd_index()] = true;
                mines_placed += 1;
            }
        }

        MineLayout::from_mine_mask(mine_mask)
    }
}
