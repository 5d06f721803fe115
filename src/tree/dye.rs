//! Dyeing / Symbolic Alignment (§4.6, C6): lazily aligns a newly
//! expanded White node with the symbolic engine's successor states,
//! colouring it Red or Black and attaching Phantom siblings.

use crate::error::FuzzError;
use crate::symbolic::SymbolicEngine;
use crate::tree::arena::{NodeIndex, Tree};

/// Walks straight-line concrete code from `start`, matching each node
/// against `last_red`'s Simulation chain until a match dyes a node Red
/// or a diverging/leaf Black node ends the walk. Returns whether
/// alignment succeeded (`start`'s eventual resting node was dyed Red).
pub fn dye<Eng: SymbolicEngine>(
    tree: &mut Tree<Eng>,
    engine: &mut Eng,
    mut start: NodeIndex,
    last_red: NodeIndex,
) -> Result<bool, FuzzError> {
    loop {
        let sim = tree
            .get(last_red)
            .simulation
            .ok_or_else(|| FuzzError::Invariant("Red node missing its Simulation child".into()))?;
        let sim_state = tree
            .get(sim)
            .colour
            .state()
            .cloned()
            .ok_or_else(|| FuzzError::Invariant("Simulation child missing symbolic state".into()))?;

        let mut succs = match engine.chain(&sim_state) {
            Ok(s) => s,
            Err(e) => {
                // A symbolic-engine failure is fatal only for the current
                // MCTS iteration (spec §7, §4.2): mark the node that was
                // being aligned exhausted and let the caller abandon this
                // iteration rather than the whole run.
                tree.mark_exhausted(start);
                return Err(e);
            }
        };
        let start_addr = tree.get(start).addr;
        let is_phantom = tree.get(start).phantom;

        let matched_idx = if is_phantom {
            None
        } else {
            succs
                .iter()
                .position(|s| Some(engine.address_of(s)) == start_addr)
        };

        if let Some(i) = matched_idx {
            let matched_state = succs.remove(i);
            tree.dye_red(start, matched_state);
            for s in succs {
                let addr = engine.address_of(&s);
                tree.attach_phantom(last_red, addr, s);
            }
            return Ok(true);
        }

        tree.dye_black(start);

        let only_child = {
            let data = tree.get(start);
            if !data.is_diverging() && data.children.len() == 1 {
                data.children.values().copied().next()
            } else {
                None
            }
        };
        match only_child {
            Some(next) => start = next,
            None => return Ok(false),
        }
    }
}
