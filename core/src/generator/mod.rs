use crate::*;
pub use random::*;

mod random;

pub trait MineLayoutGenerator {
    fn generate(self, config: GameConfig) -> MineLayout;
}

/// Policy for the cell the driver intends to reveal first.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum StartPolicy {
    Anywhere,
    SafeStart,
}
