pub mod address;
pub mod context;
pub mod driver;
pub mod error;
pub mod logging;
pub mod mcts;
pub mod mutate;
pub mod oracle;
#[cfg(feature = "signals")]
pub mod signals;
pub mod symbolic;
pub mod trace;
pub mod tree;
