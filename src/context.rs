//! Explicit run state (§9 Design Notes): the source's global counters,
//! discovered-paths set, and found-bug flag are re-architected here as
//! a record threaded through the MCTS controller, the way
//! `crates/mccfr/src/solver/solver.rs` threads a `Profile` rather than
//! reaching for statics.

use crate::address::Path;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Tunables from §6, overridable from the CLI.
#[derive(Debug, Clone)]
pub struct Tunables {
    /// Mutants produced per MCTS iteration.
    pub num_samples: usize,
    /// Stop once this many distinct paths are discovered.
    pub max_paths: Option<usize>,
    /// Stop after this many completed iterations.
    pub max_rounds: Option<u64>,
    /// UCT exploration weight ρ.
    pub rho: f64,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            num_samples: 5,
            max_paths: None,
            max_rounds: None,
            rho: crate::tree::DEFAULT_RHO,
        }
    }
}

/// Run-duration counters, supplementing spec.md with the `@timer` /
/// `TIME_LOG` and execution-count bookkeeping the original tracked per
/// stage (SPEC_FULL §15). Charting is out of scope (spec.md §1); this
/// struct only accumulates the numbers, logged as a summary line when
/// the Driver terminates.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub rounds_run: u64,
    pub iterations_skipped: u64,
    pub quick_samples_drawn: u64,
    pub random_samples_drawn: u64,
    /// Concrete `TraceRunner::trace` invocations (the original's
    /// `BINARY_EXECUTION_COUNT`).
    pub binary_executions: u64,
    /// Calls into the symbolic engine's `step`/`chain` (the original's
    /// `SYMBOLIC_EXECUTION_COUNT`), counted once per `dye` call plus
    /// the Driver's root catch-up steps.
    pub symbolic_steps: u64,
    pub trace_time: Duration,
    pub symbolic_time: Duration,
    pub selection_time: Duration,
    pub mutate_time: Duration,
    pub expansion_time: Duration,
    started_at: Option<Instant>,
}

impl Stats {
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO)
    }
}

/// All run state mutated by the MCTS controller: tunables, the
/// discovered-path set, the global selection counter `TTL_SEL`, the
/// bug-found flag, and round bookkeeping.
pub struct Context {
    pub tunables: Tunables,
    pub discovered: HashSet<Path>,
    pub ttl_sel: u64,
    pub cur_round: u64,
    pub found_bug: bool,
    pub stats: Stats,
}

impl Context {
    pub fn new(tunables: Tunables) -> Self {
        Self {
            tunables,
            discovered: HashSet::new(),
            ttl_sel: 0,
            cur_round: 0,
            found_bug: false,
            stats: Stats::default(),
        }
    }

    /// Termination condition for the Driver's main loop (§4.8 step 5).
    pub fn should_stop(&self) -> bool {
        if self.found_bug {
            return true;
        }
        if let Some(max_paths) = self.tunables.max_paths {
            if self.discovered.len() >= max_paths {
                return true;
            }
        }
        if let Some(max_rounds) = self.tunables.max_rounds {
            if self.cur_round >= max_rounds {
                return true;
            }
        }
        false
    }
}
