//! The execution-path tree: arena, node/colour model, expansion, and
//! symbolic dyeing (§3, §4.4–§4.6, C4–C6).

pub mod arena;
pub mod dye;
pub mod expand;
pub mod node;

pub use arena::{NodeIndex, Tree, DEFAULT_RHO};
pub use dye::dye;
pub use expand::expand;
pub use node::{Colour, ColourKind, NodeData};
