//! `briar` — hybrid concolic/MCTS fuzzer core CLI (§4.8, §6, §12).
//!
//! Drives a [`Driver`] against a target binary using a user-supplied
//! branch-table oracle (`briar::oracle::TableEngine`) in place of a
//! real symbolic backend, which spec.md §1 scopes out of this crate.
//! Depend on `briar` as a library and call `Driver::<YourEngine>::new`
//! directly to fuzz with a real binary-analysis backend instead.

use briar::address::Address;
use briar::context::{Context, Tunables};
use briar::driver::Driver;
use briar::oracle::TableEngine;
use briar::trace::{TraceRunner, BUG_FOUND_STATUS};
use clap::Parser;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::path::PathBuf;

/// Hybrid coverage-guided / concolic / MCTS fuzzer core.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Target binary, instrumented to emit a packed little-endian
    /// basic-block address trace on stderr (spec.md §6).
    binary: PathBuf,

    /// One or more seed inputs, joined by newlines into a single byte
    /// string (spec.md §6's CLI contract).
    #[arg(required = true)]
    seeds: Vec<String>,

    /// Branch-table oracle file standing in for a real symbolic
    /// backend (see `briar::oracle`). Omit to fuzz in pure
    /// coverage-guided random-mutation mode.
    #[arg(long)]
    branch_table: Option<PathBuf>,

    /// Address the oracle starts from; must equal the seed trace's
    /// first address or bootstrap fails with an invariant error
    /// (spec.md §4.8 step 4). Decimal or `0x`-prefixed hex.
    #[arg(long, default_value = "0")]
    entry: String,

    /// Mutants produced per MCTS iteration (§6 NUM_SAMPLES).
    #[arg(long, default_value_t = 5)]
    num_samples: usize,

    /// Stop once this many distinct paths are discovered (§6 MAX_PATHS).
    #[arg(long)]
    max_paths: Option<usize>,

    /// Stop after this many completed iterations (§6 MAX_ROUNDS).
    #[arg(long)]
    max_rounds: Option<u64>,

    /// UCT exploration weight (§6 RHO).
    #[arg(long, default_value_t = briar::tree::DEFAULT_RHO)]
    rho: f64,

    /// Seeds the mutator's RNG, for reproducible runs.
    #[arg(long, default_value_t = 0)]
    rng_seed: u64,
}

fn main() -> anyhow::Result<()> {
    briar::logging::init();
    let args = Args::parse();

    let entry = parse_addr(&args.entry)?;
    let engine = match &args.branch_table {
        Some(path) => TableEngine::load(path)?,
        None => TableEngine::empty(entry),
    };

    let seed = args.seeds.join("\n").into_bytes();
    let runner = TraceRunner::new(&args.binary);
    let mut driver = Driver::new(engine, runner);
    let mut ctx = Context::new(Tunables {
        num_samples: args.num_samples,
        max_paths: args.max_paths,
        max_rounds: args.max_rounds,
        rho: args.rho,
    });
    let mut rng = SmallRng::seed_from_u64(args.rng_seed);

    driver.bootstrap(&seed, &mut ctx)?;

    #[cfg(feature = "signals")]
    let interrupted = briar::signals::spawn_interrupt_listener();
    #[cfg(feature = "signals")]
    let should_continue = move || !interrupted.load(std::sync::atomic::Ordering::Relaxed);
    #[cfg(not(feature = "signals"))]
    let should_continue = || true;

    driver.run(&mut ctx, seed.len(), &mut rng, should_continue)?;

    log::info!(
        "stopped after {} round(s) in {:.2?}: {} distinct path(s), {} binary execution(s) \
         ({} quick-sample, {} random-sample mutant(s)), {} symbolic step(s), {} iteration(s) \
         skipped, bug_found={}",
        ctx.cur_round,
        ctx.stats.elapsed(),
        ctx.discovered.len(),
        ctx.stats.binary_executions,
        ctx.stats.quick_samples_drawn,
        ctx.stats.random_samples_drawn,
        ctx.stats.symbolic_steps,
        ctx.stats.iterations_skipped,
        ctx.found_bug,
    );
    log::debug!(
        "stage time — trace {:.2?}, symbolic {:.2?}, selection {:.2?}, mutate {:.2?}, expansion {:.2?}",
        ctx.stats.trace_time,
        ctx.stats.symbolic_time,
        ctx.stats.selection_time,
        ctx.stats.mutate_time,
        ctx.stats.expansion_time,
    );
    if ctx.found_bug {
        log::warn!(
            "bug-found sentinel (exit {BUG_FOUND_STATUS}) observed during this run"
        );
    }
    Ok(())
}

fn parse_addr(word: &str) -> anyhow::Result<Address> {
    let value = match word.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16)?,
        None => word.parse::<u64>()?,
    };
    Ok(Address(value))
}
