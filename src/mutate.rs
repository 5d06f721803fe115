//! Mutator (§4.3, C3): produces candidate inputs from a selected node,
//! preferring constraint-directed solver samples over random bytes.

use crate::symbolic::SymbolicEngine;
use crate::tree::{NodeIndex, Tree};
use rand::Rng;

/// Draws up to `num_samples` candidate inputs for `node`.
///
/// Quick-samples the node's solver iterator when it carries a
/// symbolic state with a non-empty constraint set and is not yet
/// exhausted; otherwise falls back to `num_samples` independent
/// uniformly random byte strings of length `seed_len`. Never blocks on
/// the solver beyond one `next` call per sample.
pub fn mutate<Eng: SymbolicEngine>(
    tree: &mut Tree<Eng>,
    engine: &mut Eng,
    node: NodeIndex,
    seed_len: usize,
    num_samples: usize,
    rng: &mut impl Rng,
) -> Vec<Vec<u8>> {
    let state = tree.get(node).colour.state().cloned();
    if let Some(state) = state {
        let exhausted = tree.get(node).exhausted;
        if engine.has_constraints(&state) && !exhausted {
            return quick_sample(tree, engine, node, &state, num_samples);
        }
    }
    random_sample(seed_len, num_samples, rng)
}

fn quick_sample<Eng: SymbolicEngine>(
    tree: &mut Tree<Eng>,
    engine: &mut Eng,
    node: NodeIndex,
    state: &Eng::State,
    num_samples: usize,
) -> Vec<Vec<u8>> {
    if tree.get(node).samples.is_none() {
        let iter = engine.quick_sample(state);
        tree.get_mut(node).samples = Some(iter);
    }
    let mut out = Vec::with_capacity(num_samples);
    for _ in 0..num_samples {
        let next = tree
            .get_mut(node)
            .samples
            .as_mut()
            .expect("samples iterator set above")
            .next();
        match next {
            Some(sample) => out.push(sample),
            None => {
                tree.mark_exhausted(node);
                break;
            }
        }
    }
    out
}

fn random_sample(seed_len: usize, num_samples: usize, rng: &mut impl Rng) -> Vec<Vec<u8>> {
    (0..num_samples)
        .map(|_| (0..seed_len).map(|_| rng.random::<u8>()).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::symbolic::test_support::{ToyEngine, ToyState};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::{HashMap, HashSet};

    fn engine() -> ToyEngine {
        ToyEngine {
            table: HashMap::new(),
            entry: Address(0),
            constrained: HashSet::new(),
        }
    }

    #[test]
    fn unconstrained_node_falls_back_to_random_sample() {
        let mut tree: Tree<ToyEngine> = Tree::new();
        let mut eng = engine();
        let root = tree.root();
        tree.dye_red(
            root,
            ToyState {
                addr: Address(0),
                branches: vec![],
                constrained: false,
            },
        );
        let mut rng = SmallRng::seed_from_u64(1);
        let out = mutate(&mut tree, &mut eng, root, 4, 3, &mut rng);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|s| s.len() == 4));
    }

    #[test]
    fn constrained_node_draws_from_quick_sample_until_exhausted() {
        let mut tree: Tree<ToyEngine> = Tree::new();
        let mut eng = engine();
        let root = tree.root();
        tree.dye_red(
            root,
            ToyState {
                addr: Address(0),
                branches: vec![(Address(1), b'A'), (Address(2), b'B')],
                constrained: true,
            },
        );
        let mut rng = SmallRng::seed_from_u64(1);
        let out = mutate(&mut tree, &mut eng, root, 1, 5, &mut rng);
        assert_eq!(out, vec![vec![b'A'], vec![b'B']]);
        assert!(tree.get(root).exhausted);
    }
}
