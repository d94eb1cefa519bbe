pub use constraint::*;
pub use engine::*;

mod constraint;
mod engine;
