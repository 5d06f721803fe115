//! Error classification for the fuzzer core (spec §7).

use crate::address::Address;

/// Failures the core can encounter. `Invariant` is the only fatal
/// variant; every other kind is caught at the MCTS-iteration boundary
/// (§4.7) and turned into a skipped iteration plus a `log::warn!`.
#[derive(Debug, Clone)]
pub enum FuzzError {
    /// The target binary could not be spawned.
    Spawn(String),
    /// The traced stderr stream was not a multiple of 8 bytes.
    TraceLength(usize),
    /// The symbolic engine failed to step a state.
    SymbolicStep(String),
    /// The solver's constraint iterator failed outright (distinct from
    /// ordinary exhaustion, which is not an error).
    SolverFailure(String),
    /// A core invariant (§3) was violated. Fatal.
    Invariant(String),
    /// A newly-observed path's first address disagreed with an
    /// already-fixed root address (§4.5 step 2).
    RootMismatch { expected: Address, found: Address },
}

impl std::fmt::Display for FuzzError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn(msg) => write!(f, "failed to spawn target binary: {msg}"),
            Self::TraceLength(n) => {
                write!(f, "traced stderr length {n} is not a multiple of 8")
            }
            Self::SymbolicStep(msg) => write!(f, "symbolic engine step failed: {msg}"),
            Self::SolverFailure(msg) => write!(f, "solver iterator failed: {msg}"),
            Self::Invariant(msg) => write!(f, "invariant violation: {msg}"),
            Self::RootMismatch { expected, found } => write!(
                f,
                "path began at {found} but root address is already {expected}"
            ),
        }
    }
}

impl std::error::Error for FuzzError {}
