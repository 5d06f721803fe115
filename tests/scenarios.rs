//! End-to-end scenarios from spec.md §8, driving real [`Driver`]/
//! [`Tree`]/[`Context`] instances against toy shell-script binaries and
//! the table-driven [`TableEngine`] oracle, the way `src/driver.rs`'s
//! and `src/trace.rs`'s own `#[cfg(test)]` modules already exercise
//! single pieces — this file wires the whole pipeline together.

use briar::address::{Address, Path};
use briar::context::{Context, Tunables};
use briar::driver::Driver;
use briar::oracle::TableEngine;
use briar::symbolic::SymbolicEngine;
use briar::trace::TraceRunner;
use briar::tree::node::ColourKind;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::io::Write as _;
use std::path::{Path as FsPath, PathBuf};

/// Writes an executable shell script with `body` as its contents.
fn script(dir: &FsPath, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    write!(f, "{body}").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    path
}

/// Renders `addrs` as the `\xHH` escapes a `printf` invocation needs to
/// emit them as a packed little-endian 8-byte stream (spec.md §6).
fn packed_literal(addrs: &[u64]) -> String {
    let mut out = String::new();
    for addr in addrs {
        for byte in addr.to_le_bytes() {
            out.push_str(&format!("\\x{byte:02x}"));
        }
    }
    out
}

fn branch_table(dir: &FsPath, text: &str) -> PathBuf {
    let path = dir.join("table.txt");
    std::fs::write(&path, text).unwrap();
    path
}

fn path_of(addrs: &[u64]) -> Path {
    Path::from(addrs.iter().map(|a| Address(*a)).collect::<Vec<_>>())
}

/// Scenario 1: an identity binary with no branches emits one address
/// regardless of input. One round over a seed discovers exactly one
/// path and the root acquires no concrete children (spec.md §8.1).
#[test]
fn identity_binary_discovers_single_path_in_one_round() {
    let dir = tempfile::tempdir().unwrap();
    let bin = script(
        dir.path(),
        "identity.sh",
        &format!(
            "#!/bin/sh\ncat >/dev/null\nprintf '{}' 1>&2\nexit 0\n",
            packed_literal(&[0x10])
        ),
    );
    let engine = TableEngine::empty(Address(0x10));
    let mut driver = Driver::new(engine, TraceRunner::new(&bin));
    let mut ctx = Context::new(Tunables {
        max_rounds: Some(1),
        ..Tunables::default()
    });
    let mut rng = SmallRng::seed_from_u64(1);

    driver.bootstrap(b"A", &mut ctx).unwrap();
    driver.run(&mut ctx, 1, &mut rng, || true).unwrap();

    assert_eq!(ctx.discovered.len(), 1);
    assert_eq!(ctx.cur_round, 1);
    let root = driver.tree.root();
    assert!(driver.tree.get(root).children.is_empty());
}

/// Scenario 2: a single-if binary branches on `b0 == 'X'`. Starting
/// from a non-'X' seed, quick-sampling the root's own symbolic branch
/// must surface the 'X' path within a bounded number of rounds,
/// discovering both distinct paths (spec.md §8.2).
#[test]
fn single_if_quick_sample_discovers_both_branches() {
    let dir = tempfile::tempdir().unwrap();
    let bin = script(
        dir.path(),
        "single_if.sh",
        &format!(
            "#!/bin/bash\ninput=$(cat)\nb0=${{input:0:1}}\nif [ \"$b0\" = \"X\" ]; then\n  printf '{}' 1>&2\nelse\n  printf '{}' 1>&2\nfi\nexit 0\n",
            packed_literal(&[1, 2]),
            packed_literal(&[1, 3]),
        ),
    );
    let table = branch_table(
        dir.path(),
        "entry 1\nbranch 1 2 X\nbranch 1 3 Y\nconstrained 1\n",
    );
    let engine = TableEngine::load(&table).unwrap();
    let mut driver = Driver::new(engine, TraceRunner::new(&bin));
    let mut ctx = Context::new(Tunables {
        num_samples: 1,
        max_paths: Some(2),
        max_rounds: Some(6),
        ..Tunables::default()
    });
    let mut rng = SmallRng::seed_from_u64(11);

    driver.bootstrap(b"Y", &mut ctx).unwrap();
    driver.run(&mut ctx, 1, &mut rng, || true).unwrap();

    assert_eq!(ctx.discovered.len(), 2);
    assert!(ctx.discovered.contains(&path_of(&[1, 2])));
    assert!(ctx.discovered.contains(&path_of(&[1, 3])));
    assert!(ctx.cur_round <= 6);
}

/// Scenario 3: a two-byte cascade (`b0=='X' && b1=='Y'`) exits 100.
/// Built directly at the node the cascade's second branch quick-samples
/// from — the constructed byte string already encodes both bytes
/// together — so one MCTS iteration must set `found_bug` (spec.md §8.3).
#[test]
fn two_byte_cascade_finds_the_bug() {
    let dir = tempfile::tempdir().unwrap();
    let bin = script(
        dir.path(),
        "cascade.sh",
        &format!(
            "#!/bin/bash\ninput=$(cat)\nb0=${{input:0:1}}\nb1=${{input:1:1}}\nif [ \"$b0\" = \"X\" ] && [ \"$b1\" = \"Y\" ]; then\n  printf '{}' 1>&2\n  exit 100\nelif [ \"$b0\" = \"X\" ]; then\n  printf '{}' 1>&2\n  exit 0\nelse\n  printf '{}' 1>&2\n  exit 0\nfi\n",
            packed_literal(&[1, 2, 3]),
            packed_literal(&[1, 2, 5]),
            packed_literal(&[1, 4]),
        ),
    );
    let table = branch_table(
        dir.path(),
        "entry 1\nbranch 1 2 X\nbranch 2 3 Y\nbranch 2 5 W\nconstrained 1\nconstrained 2\n",
    );
    let mut engine = TableEngine::load(&table).unwrap();

    let mut tree = briar::tree::Tree::new();
    let root = tree.root();
    tree.get_mut(root).addr = Some(Address(1));
    let entry = engine.entry_state();
    tree.dye_red(root, entry.clone());
    // Only one untried candidate (child2's Simulation) should ever look
    // infinite; flatten the sibling Simulation's score so selection is
    // deterministic.
    let root_sim = tree.get(root).simulation.unwrap();
    tree.get_mut(root_sim).sel_try = 1;

    let (child2, _) = tree.child_or_insert(root, Address(2));
    let mut succs = engine.step(&entry).unwrap();
    let child2_state = succs.remove(0);
    tree.dye_red(child2, child2_state);

    let mut ctx = Context::new(Tunables {
        num_samples: 1,
        ..Tunables::default()
    });
    let mut rng = SmallRng::seed_from_u64(3);
    let runner = TraceRunner::new(&bin);

    briar::mcts::run_iteration(&mut tree, &mut engine, &runner, &mut ctx, 2, &mut rng).unwrap();

    assert!(ctx.found_bug);
    assert!(ctx.discovered.contains(&path_of(&[1, 2, 3])));
}

/// Scenario 4: the symbolic engine reports two successors where a
/// single concrete child has been seen, so dyeing attaches a Phantom
/// sibling. Selecting that Phantom and tracing a binary that always
/// lands on its address promotes it to a first-class (non-phantom)
/// White node via detach-then-re-expand (spec.md §8.4).
#[test]
fn diverging_engine_promotes_phantom_on_selection() {
    let dir = tempfile::tempdir().unwrap();
    // Always reports the phantom's address (1, 3) regardless of input.
    let bin = script(
        dir.path(),
        "always_phantom.sh",
        &format!(
            "#!/bin/sh\ncat >/dev/null\nprintf '{}' 1>&2\nexit 0\n",
            packed_literal(&[1, 3])
        ),
    );
    let table = branch_table(dir.path(), "entry 1\nbranch 1 2 X\nbranch 1 3 Y\n");
    let mut engine = TableEngine::load(&table).unwrap();

    let mut tree = briar::tree::Tree::new();
    let root = tree.root();
    tree.get_mut(root).addr = Some(Address(1));
    tree.dye_red(root, engine.entry_state());
    let root_sim = tree.get(root).simulation.unwrap();
    // Give root_sim a tried-once finite score so only the phantom below
    // is an untried (infinite-scoring) candidate.
    tree.get_mut(root_sim).sel_try = 1;

    let (child2, _) = tree.child_or_insert(root, Address(2));
    let ok = briar::tree::dye(&mut tree, &mut engine, child2, root).unwrap();
    assert!(ok);
    let phantom = *tree.get(root).children.get(&Address(3)).expect("phantom sibling attached");
    assert_eq!(tree.get(phantom).colour.kind(), ColourKind::Phantom);
    assert!(tree.get(phantom).phantom);
    // child2's own Simulation would otherwise tie the phantom for
    // "untried"; flatten it too.
    tree.get_mut(child2).sel_try = 1;
    if let Some(child2_sim) = tree.get(child2).simulation {
        tree.get_mut(child2_sim).sel_try = 1;
    }

    let mut ctx = Context::new(Tunables::default());
    let mut rng = SmallRng::seed_from_u64(5);
    let runner = TraceRunner::new(&bin);

    briar::mcts::run_iteration(&mut tree, &mut engine, &runner, &mut ctx, 1, &mut rng).unwrap();

    let promoted = *tree
        .get(root)
        .children
        .get(&Address(3))
        .expect("address 3 is a concrete child after promotion");
    assert_ne!(promoted, phantom, "the phantom was detached, not reused");
    assert!(!tree.get(promoted).phantom);
    assert_eq!(tree.get(promoted).colour.kind(), ColourKind::White);
    assert!(ctx.discovered.contains(&path_of(&[1, 3])));
}

/// Scenario 5: a node whose constraint set admits exactly three
/// solutions, sampled with `NUM_SAMPLES=5`, returns three mutants, sets
/// `exhausted`, and compensates `visited` on the selection-list nodes
/// by the two-mutant shortfall (spec.md §8.5).
#[test]
fn exhaustion_compensates_visited_on_shortfall() {
    let dir = tempfile::tempdir().unwrap();
    // Ignores its input and always reports the same single address, so
    // none of the three mutants discover a new path — only the
    // exhaustion/visited bookkeeping is under test here.
    let bin = script(
        dir.path(),
        "mono.sh",
        &format!(
            "#!/bin/sh\ncat >/dev/null\nprintf '{}' 1>&2\nexit 0\n",
            packed_literal(&[0])
        ),
    );
    let table = branch_table(
        dir.path(),
        "entry 0\nbranch 0 1 A\nbranch 0 2 B\nbranch 0 3 C\nconstrained 0\n",
    );
    let engine = TableEngine::load(&table).unwrap();
    let mut driver = Driver::new(engine, TraceRunner::new(&bin));
    let mut ctx = Context::new(Tunables {
        num_samples: 5,
        ..Tunables::default()
    });
    let mut rng = SmallRng::seed_from_u64(9);

    driver.bootstrap(b"Z", &mut ctx).unwrap();
    driver.step(&mut ctx, 1, &mut rng).unwrap();

    assert_eq!(ctx.stats.quick_samples_drawn, 3);
    let root = driver.tree.root();
    let root_sim = driver.tree.get(root).simulation.expect("root still owns its Simulation child");
    assert!(driver.tree.get(root_sim).exhausted);
    assert!(
        driver.tree.get(root).exhausted,
        "exhaustion mirrors onto the Red parent (§3 I6)"
    );
    assert_eq!(driver.tree.get(root).visited, 5);
    assert_eq!(driver.tree.get(root_sim).visited, 2);
}

/// Scenario 6: bootstrapping with the same seed a second invented trace
/// re-observes changes nothing — `distinct` stays equal to the
/// discovered-path count (spec.md §8.6, invariant P1).
#[test]
fn seed_idempotence_keeps_distinct_in_sync_with_discovered() {
    let dir = tempfile::tempdir().unwrap();
    let bin = script(
        dir.path(),
        "identity.sh",
        &format!(
            "#!/bin/sh\ncat >/dev/null\nprintf '{}' 1>&2\nexit 0\n",
            packed_literal(&[7])
        ),
    );
    let engine = TableEngine::empty(Address(7));
    let mut driver = Driver::new(engine, TraceRunner::new(&bin));
    let mut ctx = Context::new(Tunables::default());
    let mut rng = SmallRng::seed_from_u64(2);

    driver.bootstrap(b"AA", &mut ctx).unwrap();
    assert_eq!(ctx.discovered.len(), 1);
    let root = driver.tree.root();
    assert_eq!(driver.tree.get(root).distinct, 1);

    // The binary ignores its input entirely, so every further round
    // retraces the identical single-address path.
    for _ in 0..3 {
        driver.step(&mut ctx, 2, &mut rng).unwrap();
    }

    assert_eq!(ctx.discovered.len(), 1);
    assert_eq!(driver.tree.get(root).distinct, 1);
}
