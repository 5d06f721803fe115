//! Driver (§4.8, C8): bootstraps the tree from a seed input and runs
//! the MCTS loop until a termination tunable or the bug-found flag
//! trips.

use crate::context::Context;
use crate::error::FuzzError;
use crate::mcts;
use crate::symbolic::SymbolicEngine;
use crate::trace::TraceRunner;
use crate::tree::{expand, Colour, Tree};
use rand::Rng;

pub struct Driver<Eng: SymbolicEngine> {
    pub tree: Tree<Eng>,
    pub engine: Eng,
    pub runner: TraceRunner,
}

impl<Eng: SymbolicEngine> Driver<Eng> {
    pub fn new(engine: Eng, runner: TraceRunner) -> Self {
        Self {
            tree: Tree::new(),
            engine,
            runner,
        }
    }

    /// Dyes root Red with the engine's entry state, runs `seed` once,
    /// and verifies the root's Simulation state catches up to the
    /// observed root address with no divergence before it (§4.8
    /// steps 1-4). `seed` is the already newline-joined combined seed
    /// byte string the CLI assembles from its `<seed>...` arguments.
    pub fn bootstrap(&mut self, seed: &[u8], ctx: &mut Context) -> Result<(), FuzzError> {
        let root = self.tree.root();
        let entry = self.engine.entry_state();
        self.tree.dye_red(root, entry);
        let sim = self
            .tree
            .get(root)
            .simulation
            .expect("dye_red just created the Simulation child");

        let trace_started = std::time::Instant::now();
        let traced = self.runner.trace(seed);
        ctx.stats.trace_time += trace_started.elapsed();
        ctx.stats.binary_executions += 1;
        let outcome = traced?;
        if outcome.path.is_empty() {
            return Err(FuzzError::TraceLength(0));
        }
        let was_new = expand::expand(&mut self.tree, &mut ctx.discovered, &outcome.path)?;
        if outcome.bug_found {
            ctx.found_bug = true;
        }
        mcts::propagate(&mut self.tree, ctx, &[root], false, &[(outcome.path.clone(), was_new)]);

        let root_addr = self
            .tree
            .get(root)
            .addr
            .expect("expand set the root address from the seed path");

        loop {
            let sim_addr = {
                let state = self
                    .tree
                    .get(sim)
                    .colour
                    .state()
                    .expect("Gold node always carries symbolic state");
                self.engine.address_of(state)
            };
            if sim_addr == root_addr {
                break;
            }
            let state = self
                .tree
                .get(sim)
                .colour
                .state()
                .expect("Gold node always carries symbolic state")
                .clone();
            let symbolic_started = std::time::Instant::now();
            let stepped = self.engine.step(&state);
            ctx.stats.symbolic_time += symbolic_started.elapsed();
            ctx.stats.symbolic_steps += 1;
            let mut succs = stepped?;
            if succs.len() != 1 {
                return Err(FuzzError::Invariant(format!(
                    "symbolic engine diverged before root: {} successor(s), expected 1",
                    succs.len()
                )));
            }
            self.tree.get_mut(sim).colour = Colour::Gold(succs.remove(0));
        }
        Ok(())
    }

    pub fn step(
        &mut self,
        ctx: &mut Context,
        seed_len: usize,
        rng: &mut impl Rng,
    ) -> Result<(), FuzzError> {
        mcts::run_iteration(&mut self.tree, &mut self.engine, &self.runner, ctx, seed_len, rng)
    }

    /// Runs iterations until a tunable or the bug-found flag stops the
    /// loop, or `should_continue` returns false (the binary wires this
    /// to the optional ctrl-c listener under the `signals` feature).
    pub fn run(
        &mut self,
        ctx: &mut Context,
        seed_len: usize,
        rng: &mut impl Rng,
        mut should_continue: impl FnMut() -> bool,
    ) -> Result<(), FuzzError> {
        ctx.stats.start();
        while !ctx.should_stop() && should_continue() {
            self.step(ctx, seed_len, rng)?;
            ctx.cur_round += 1;
            ctx.stats.rounds_run += 1;
        }
        Ok(())
    }
}
