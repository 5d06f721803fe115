//! MCTS Controller (§4.7, C7): one selection → simulation → expansion
//! → propagation iteration over the execution-path tree.

use crate::address::Path;
use crate::context::Context;
use crate::error::FuzzError;
use crate::mutate::mutate;
use crate::symbolic::SymbolicEngine;
use crate::trace::{TraceOutcome, TraceRunner};
use crate::tree::node::ColourKind;
use crate::tree::{dye, expand, NodeIndex, Tree};
use rand::Rng;
use std::time::Instant;

/// Traces every mutant and collects the results before Expansion runs,
/// so switching between the sequential and `parallel-trace` paths below
/// changes no observable behaviour (§9: "a correctness-preserving
/// optimisation (not required)").
#[cfg(not(feature = "parallel-trace"))]
fn trace_all(runner: &TraceRunner, samples: &[Vec<u8>]) -> Vec<Result<TraceOutcome, FuzzError>> {
    samples.iter().map(|input| runner.trace(input)).collect()
}

/// Same contract as the sequential version, but each mutant's subprocess
/// spawn/wait/parse runs on a `rayon` worker thread (§5, §9, §11): the
/// Trace Runner's blocking I/O is the one stage of an iteration that is
/// trivially parallel across the `NUM_SAMPLES` mutants.
#[cfg(feature = "parallel-trace")]
fn trace_all(runner: &TraceRunner, samples: &[Vec<u8>]) -> Vec<Result<TraceOutcome, FuzzError>> {
    use rayon::prelude::*;
    samples.par_iter().map(|input| runner.trace(input)).collect()
}

/// Runs one MCTS iteration to completion. Leaves `ctx.found_bug` set
/// if any traced mutant tripped the bug-found sentinel.
pub fn run_iteration<Eng: SymbolicEngine>(
    tree: &mut Tree<Eng>,
    engine: &mut Eng,
    runner: &TraceRunner,
    ctx: &mut Context,
    seed_len: usize,
    rng: &mut impl Rng,
) -> Result<(), FuzzError> {
    if tree.get(tree.root()).fully_explored {
        return Ok(());
    }

    let selection_started = Instant::now();
    let selected = select(tree, engine, ctx, rng);
    ctx.stats.selection_time += selection_started.elapsed();
    let mut selection = match selected {
        Ok(selection) => selection,
        // An invariant violation is fatal to the whole run (§7); any other
        // failure (a symbolic-engine step or iterator call going wrong
        // during dyeing, §4.2) only abandons this one iteration.
        Err(e @ FuzzError::Invariant(_)) => return Err(e),
        Err(e) => {
            log::warn!("skipping iteration: symbolic engine failed during dyeing: {e}");
            ctx.stats.iterations_skipped += 1;
            return Ok(());
        }
    };
    let leaf = *selection.last().expect("selection is never empty on return");

    let leaf_was_phantom = tree.get(leaf).phantom;
    let will_quick_sample = match tree.get(leaf).colour.state() {
        Some(state) => engine.has_constraints(state) && !tree.get(leaf).exhausted,
        None => false,
    };
    let mutate_started = Instant::now();
    let samples = mutate(tree, engine, leaf, seed_len, ctx.tunables.num_samples, rng);
    ctx.stats.mutate_time += mutate_started.elapsed();
    if will_quick_sample {
        ctx.stats.quick_samples_drawn += samples.len() as u64;
    } else {
        ctx.stats.random_samples_drawn += samples.len() as u64;
    }
    if leaf_was_phantom {
        tree.detach(leaf);
        selection.pop();
    }

    let trace_started = Instant::now();
    let traced_all = trace_all(runner, &samples);
    ctx.stats.trace_time += trace_started.elapsed();
    ctx.stats.binary_executions += samples.len() as u64;

    let mut results: Vec<(Path, bool)> = Vec::with_capacity(samples.len());
    for traced in traced_all {
        match traced {
            Ok(outcome) => {
                let expansion_started = Instant::now();
                let was_new = expand(tree, &mut ctx.discovered, &outcome.path)?;
                ctx.stats.expansion_time += expansion_started.elapsed();
                if outcome.bug_found {
                    ctx.found_bug = true;
                }
                results.push((outcome.path, was_new));
            }
            Err(e) => {
                log::warn!("skipping mutant: {e}");
                ctx.stats.iterations_skipped += 1;
            }
        }
    }

    propagate(tree, ctx, &selection, leaf_was_phantom, &results);

    // The shortfall compensation is tied to sampler starvation (§4.7: "the
    // sampler was exhausted mid-iteration"), not to trace failures — a
    // mutant that fails to trace is already accounted for by
    // `iterations_skipped` above and must not also inflate `visited`.
    if samples.len() < ctx.tunables.num_samples {
        let shortfall = (ctx.tunables.num_samples - samples.len()) as u64;
        for &n in &selection {
            tree.get_mut(n).visited += shortfall;
        }
    }

    Ok(())
}

/// Descends from root choosing the best child at each step, dyeing
/// White nodes lazily. Restarts from root whenever descent bottoms
/// out at a Black leaf, first climbing back to mark fully-explored
/// subtrees (§4.7 Selection).
fn select<Eng: SymbolicEngine>(
    tree: &mut Tree<Eng>,
    engine: &mut Eng,
    ctx: &mut Context,
    rng: &mut impl Rng,
) -> Result<Vec<NodeIndex>, FuzzError> {
    loop {
        let root = tree.root();
        let mut nodes = vec![root];
        let mut last_red = match tree.get(root).colour.kind() {
            ColourKind::Red => Some(root),
            _ => None,
        };
        let mut current = root;

        loop {
            if tree.get(current).colour.kind() == ColourKind::White {
                let anchor = last_red.ok_or_else(|| {
                    FuzzError::Invariant("reached a White node with no Red ancestor".into())
                })?;
                let symbolic_started = Instant::now();
                let aligned = dye::dye(tree, engine, current, anchor);
                ctx.stats.symbolic_time += symbolic_started.elapsed();
                ctx.stats.symbolic_steps += 1;
                aligned?;
            }
            if tree.get(current).colour.kind() == ColourKind::Red {
                last_red = Some(current);
            }
            if tree.get(current).is_leaf() {
                break;
            }
            match tree.best_child(current, ctx.ttl_sel, ctx.tunables.rho, rng) {
                Some(next) => {
                    nodes.push(next);
                    current = next;
                }
                None => break,
            }
        }

        if tree.get(current).colour.state().is_none() {
            climb_and_mark_fully_explored(tree, &nodes);
            if tree.get(root).fully_explored {
                return Ok(vec![root]);
            }
            continue;
        }
        return Ok(nodes);
    }
}

/// Climbs from the leaf back to the deepest ancestor with a Simulation
/// child, marking every subtree whose concrete children are all
/// fully-explored as itself fully-explored (§4.7).
fn climb_and_mark_fully_explored<Eng: SymbolicEngine>(tree: &mut Tree<Eng>, nodes: &[NodeIndex]) {
    for &n in nodes.iter().rev() {
        let had_simulation = tree.get(n).simulation.is_some();
        if tree.all_concrete_children_fully_explored(n) {
            tree.mark_fully_explored(n);
        }
        if had_simulation {
            break;
        }
    }
}

/// Nodes along `path` as already materialised by `expand` (§4.5),
/// walked fresh from root since `path` may diverge from the recorded
/// selection list (e.g. a phantom's mutants rarely retrace exactly).
fn path_nodes<Eng: SymbolicEngine>(tree: &Tree<Eng>, path: &Path) -> Vec<NodeIndex> {
    let mut nodes = Vec::with_capacity(path.len());
    let mut current = tree.root();
    nodes.push(current);
    for &addr in path.tail() {
        match tree.get(current).children.get(&addr) {
            Some(&next) => {
                nodes.push(next);
                current = next;
            }
            None => break,
        }
    }
    nodes
}

/// Two-pass statistics update (§4.7 Propagation). `pub(crate)` so the
/// Driver's bootstrap can reuse it for the seed's one-result iteration
/// (§4.8 step 3).
pub(crate) fn propagate<Eng: SymbolicEngine>(
    tree: &mut Tree<Eng>,
    ctx: &mut Context,
    selection: &[NodeIndex],
    leaf_was_phantom: bool,
    results: &[(Path, bool)],
) {
    let mut first = true;
    for (path, was_new) in results {
        let mut preserved_len = 0usize;
        for (i, &n) in selection.iter().enumerate() {
            if i < path.len() && tree.get(n).addr == Some(path[i]) {
                preserved_len += 1;
            } else {
                break;
            }
        }
        for (i, &n) in selection.iter().enumerate() {
            let data = tree.get_mut(n);
            if i < preserved_len {
                data.sel_win += 1;
            }
            data.sel_try += 1;
            ctx.ttl_sel += 1;
        }

        let concrete = path_nodes(tree, path);
        for &n in &concrete {
            let data = tree.get_mut(n);
            data.sim_win += *was_new as u64;
            data.sim_try += 1;
        }
        if let Some(&leaf) = selection.last() {
            let leaf_preserved = preserved_len == selection.len();
            let data = tree.get_mut(leaf);
            data.sim_win += *was_new as u64;
            data.sim_try += leaf_preserved as u64;
        }
        if leaf_was_phantom && first {
            for &n in &concrete {
                tree.get_mut(n).fully_explored = false;
            }
        }

        for &n in &concrete {
            let data = tree.get_mut(n);
            data.visited += 1;
            data.distinct += *was_new as u64;
        }
        first = false;
    }
}
