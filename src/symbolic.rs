//! The symbolic-execution backend contract (§4.2, C2).
//!
//! The concrete engine is explicitly out of scope for this crate (spec
//! §1): this module only fixes the boundary a real backend (e.g. a
//! binary-analysis framework) would implement, the way
//! `crates/mccfr/src/solver/solver.rs::Solver` bundles a game's types
//! behind associated types rather than owning the game logic itself.

use crate::address::Address;

/// A symbolic engine able to produce an entry state, step a state to
/// its immediate successors, and sample constraint-satisfying inputs.
///
/// `State` must be `Clone`: §3 invariant I3 requires a Red node's
/// Simulation child to start as a shallow copy of the matched state.
pub trait SymbolicEngine {
    /// An opaque symbolic machine state.
    type State: Clone;
    /// A restartable, possibly-infinite source of solver-produced byte
    /// strings already encoded the way the solver wants (big-endian,
    /// §4.3) — encoding bitwidths is the engine's concern, not ours.
    type Samples: Iterator<Item = Vec<u8>>;

    /// Produce an initial state whose stdin is a symbolic byte stream.
    fn entry_state(&mut self) -> Self::State;

    /// The basic-block address a state is currently positioned at.
    fn address_of(&self, state: &Self::State) -> Address;

    /// Whether `state`'s path constraint set is non-empty. Drives the
    /// quick-sample vs. random-sample decision in §4.3.
    fn has_constraints(&self, state: &Self::State) -> bool;

    /// Immediate symbolic successors of `state` (zero, one, or more).
    fn step(&mut self, state: &Self::State) -> Result<Vec<Self::State>, crate::error::FuzzError>;

    /// Walk straight-line code: repeatedly `step` while exactly one
    /// successor exists, returning the final (possibly empty, possibly
    /// branching) successor set. A single successor that turns out to be
    /// a dead end (its own `step` is empty) is itself the final visible
    /// point and is returned rather than discarded.
    fn chain(&mut self, state: &Self::State) -> Result<Vec<Self::State>, crate::error::FuzzError> {
        let mut succs = self.step(state)?;
        while succs.len() == 1 {
            let next = self.step(&succs[0])?;
            if next.is_empty() {
                break;
            }
            succs = next;
        }
        Ok(succs)
    }

    /// A fresh constraint-satisfying byte-string iterator over `state`'s
    /// symbolic stdin. Called once per node, lazily, on first quick-sample.
    fn quick_sample(&mut self, state: &Self::State) -> Self::Samples;
}
