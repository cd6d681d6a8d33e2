pub mod chain;
pub mod nodes;
pub mod precedence;
pub mod visit;

pub use chain::{CallChain, ChainSegment};
pub use precedence::{ChildSlot, Precedence, required_precedence};
