//! Agent systems (FixedUpdate)

pub mod fsm;
pub mod movement;
pub mod reactions;

// Re-export all systems
pub use fsm::*;
pub use movement::*;
pub use reactions::*;
