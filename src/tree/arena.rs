//! The execution-path tree arena (§3, §4.4, C4).
//!
//! Grounded on `crates/mccfr/src/state/tree.rs` and `state/node.rs`'s
//! arena-of-nodes-by-stable-index pattern, generalised from a
//! growth-only `DiGraph` to a `StableDiGraph` because this tree must
//! remove nodes (released Simulation children, detached phantoms)
//! without invalidating the indices of their siblings (§4.7, I5).

use crate::address::Address;
use crate::symbolic::SymbolicEngine;
use crate::tree::node::{Colour, ColourKind, NodeData};
use petgraph::stable_graph::StableDiGraph;
use rand::Rng;

pub type NodeIndex = petgraph::stable_graph::NodeIndex<u32>;

/// The exploration-weight constant ρ = √2 (§4.4), overridable via the
/// `RHO` tunable.
pub const DEFAULT_RHO: f64 = std::f64::consts::SQRT_2;

pub struct Tree<Eng: SymbolicEngine> {
    graph: StableDiGraph<NodeData<Eng>, Address>,
    root: NodeIndex,
}

impl<Eng: SymbolicEngine> Tree<Eng> {
    /// Creates the root as a stateless White node (§4.8 step 1).
    pub fn new() -> Self {
        let mut graph = StableDiGraph::new();
        let root = graph.add_node(NodeData::white(None, None));
        Self { graph, root }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn get(&self, idx: NodeIndex) -> &NodeData<Eng> {
        self.graph
            .node_weight(idx)
            .expect("NodeIndex must refer to a live node")
    }

    pub fn get_mut(&mut self, idx: NodeIndex) -> &mut NodeData<Eng> {
        self.graph
            .node_weight_mut(idx)
            .expect("NodeIndex must refer to a live node")
    }

    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.get(idx).parent
    }

    /// Inserts a White child at `addr` under `parent` if one doesn't
    /// already exist. Returns `(child, was_new)`.
    pub fn child_or_insert(&mut self, parent: NodeIndex, addr: Address) -> (NodeIndex, bool) {
        if let Some(existing) = self.get(parent).children.get(&addr) {
            return (*existing, false);
        }
        let child = self.graph.add_node(NodeData::white(Some(addr), Some(parent)));
        self.graph.add_edge(parent, child, addr);
        self.get_mut(parent).children.insert(addr, child);
        (child, true)
    }

    /// Colours `idx` Red with `state`, creating its Gold Simulation
    /// child sharing the same address and a clone of the state (§3 I3,
    /// §4.6).
    pub fn dye_red(&mut self, idx: NodeIndex, state: Eng::State) {
        let addr = self.get(idx).addr;
        let sim_state = state.clone();
        self.get_mut(idx).colour = Colour::Red(state);
        let sim = self.graph.add_node(NodeData {
            colour: Colour::Gold(sim_state),
            ..NodeData::white(addr, Some(idx))
        });
        self.get_mut(idx).simulation = Some(sim);
    }

    pub fn dye_black(&mut self, idx: NodeIndex) {
        self.get_mut(idx).colour = Colour::Black;
    }

    /// Attaches a Phantom child for a speculative symbolic successor
    /// (§4.6). No-op if a child already occupies that address.
    pub fn attach_phantom(&mut self, parent: NodeIndex, addr: Address, state: Eng::State) {
        if self.get(parent).children.contains_key(&addr) {
            return;
        }
        let mut data = NodeData::white(Some(addr), Some(parent));
        data.colour = Colour::Phantom(state);
        data.phantom = true;
        let child = self.graph.add_node(data);
        self.graph.add_edge(parent, child, addr);
        self.get_mut(parent).children.insert(addr, child);
    }

    /// Detaches a node from its parent's bookkeeping and removes it
    /// from the arena (phantom detachment during selection, §4.7).
    pub fn detach(&mut self, idx: NodeIndex) {
        if let Some(parent) = self.get(idx).parent {
            if let Some(addr) = self.get(idx).addr {
                self.get_mut(parent).children.remove(&addr);
            }
            if self.get(parent).simulation == Some(idx) {
                self.get_mut(parent).simulation = None;
            }
        }
        self.graph.remove_node(idx);
    }

    /// Releases a fully-explored node's Simulation child (§3 I5).
    pub fn release_simulation(&mut self, idx: NodeIndex) {
        if let Some(sim) = self.get(idx).simulation.take() {
            self.graph.remove_node(sim);
        }
    }

    /// UCT score for a node in the selection comparison set (§4.4). A
    /// Red node delegates its score to its Simulation child.
    pub fn uct(&self, idx: NodeIndex, ttl_sel: u64, rho: f64) -> f64 {
        let idx = self.scoring_target(idx);
        let node = self.get(idx);
        if node.fully_explored {
            return 0.0;
        }
        if node.sel_try == 0 {
            return f64::INFINITY;
        }
        let exploit = node.sim_win as f64 / (node.sim_try as f64 + 1.0);
        let explore = ((ttl_sel as f64 + 1.0).ln() / node.sel_try as f64).sqrt();
        exploit + rho * explore
    }

    /// Red nodes with a Simulation child score via that child (§4.4).
    fn scoring_target(&self, idx: NodeIndex) -> NodeIndex {
        match self.get(idx).colour.kind() {
            ColourKind::Red => self.get(idx).simulation.unwrap_or(idx),
            _ => idx,
        }
    }

    /// The comparison set at `node`: every concrete child plus the
    /// Simulation child when present (§4.4's "Red's children include
    /// G" rule, generalised since Simulation now lives outside the
    /// `children` map).
    pub fn selection_candidates(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let data = self.get(node);
        let mut candidates: Vec<NodeIndex> = data.children.values().copied().collect();
        if let Some(sim) = data.simulation {
            candidates.push(sim);
        }
        candidates
    }

    /// Picks the maximum-UCT child of `node`, breaking ties uniformly
    /// at random (§4.4). Returns `None` if `node` has no children.
    pub fn best_child(
        &self,
        node: NodeIndex,
        ttl_sel: u64,
        rho: f64,
        rng: &mut impl Rng,
    ) -> Option<NodeIndex> {
        let candidates = self.selection_candidates(node);
        if candidates.is_empty() {
            return None;
        }
        let mut best_score = f64::NEG_INFINITY;
        let mut best: Vec<NodeIndex> = Vec::new();
        for &c in &candidates {
            let score = self.uct(c, ttl_sel, rho);
            if score > best_score {
                best_score = score;
                best = vec![c];
            } else if score == best_score {
                best.push(c);
            }
        }
        Some(best[rng.random_range(0..best.len())])
    }

    /// Marks `idx` fully explored and releases its Simulation child
    /// (§3 I5).
    pub fn mark_fully_explored(&mut self, idx: NodeIndex) {
        self.get_mut(idx).fully_explored = true;
        self.release_simulation(idx);
    }

    /// True iff every non-Simulation, non-Phantom child of `idx` is
    /// fully explored (the bottom-up climb condition in §4.7).
    pub fn all_concrete_children_fully_explored(&self, idx: NodeIndex) -> bool {
        self.get(idx)
            .children
            .values()
            .all(|&c| !self.get(c).phantom && self.get(c).fully_explored)
    }

    /// Mirrors `exhausted` onto an R-node's G-child and its R-parent
    /// (§3 I6).
    pub fn mark_exhausted(&mut self, idx: NodeIndex) {
        self.get_mut(idx).exhausted = true;
        match self.get(idx).colour.kind() {
            ColourKind::Red => {
                if let Some(sim) = self.get(idx).simulation {
                    self.get_mut(sim).exhausted = true;
                }
            }
            ColourKind::Gold => {
                if let Some(parent) = self.get(idx).parent {
                    self.get_mut(parent).exhausted = true;
                }
            }
            _ => {}
        }
    }

    /// Number of live nodes in the arena (diagnostic only).
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }
}

impl<Eng: SymbolicEngine> Default for Tree<Eng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Eng: SymbolicEngine> std::fmt::Display for Tree<Eng> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.show(f, self.root, "")
    }
}

impl<Eng: SymbolicEngine> Tree<Eng> {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, x: NodeIndex, prefix: &str) -> std::fmt::Result {
        if x == self.root {
            writeln!(f, "ROOT {:?}", self.get(x))?;
        }
        let mut children: Vec<NodeIndex> = self.get(x).children.values().copied().collect();
        children.extend(self.get(x).simulation);
        let n = children.len();
        for (i, child) in children.into_iter().enumerate() {
            let last = i == n - 1;
            let stem = if last { "\\--" } else { "|--" };
            let gap = if last { "    " } else { "|   " };
            writeln!(f, "{prefix}{stem} {:?}", self.get(child))?;
            self.show(f, child, &format!("{prefix}{gap}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::test_support::ToyEngine;

    fn tree() -> Tree<ToyEngine> {
        Tree::new()
    }

    #[test]
    fn fresh_root_is_white_stateless_leaf() {
        let t = tree();
        assert_eq!(t.get(t.root()).colour.kind(), ColourKind::White);
        assert!(t.get(t.root()).is_leaf());
    }

    #[test]
    fn child_or_insert_is_idempotent() {
        let mut t = tree();
        let (a, new1) = t.child_or_insert(t.root(), Address(1));
        let (b, new2) = t.child_or_insert(t.root(), Address(1));
        assert!(new1);
        assert!(!new2);
        assert_eq!(a, b);
        assert_eq!(t.get(t.root()).children.len(), 1);
    }

    #[test]
    fn dye_red_creates_gold_simulation_child() {
        let mut t = tree();
        let root = t.root();
        t.get_mut(root).addr = Some(Address(0));
        t.dye_red(
            root,
            crate::symbolic::test_support::ToyState {
                addr: Address(0),
                branches: vec![],
                constrained: false,
            },
        );
        assert_eq!(t.get(root).colour.kind(), ColourKind::Red);
        let sim = t.get(root).simulation.expect("simulation child");
        assert_eq!(t.get(sim).colour.kind(), ColourKind::Gold);
        assert_eq!(t.get(sim).addr, Some(Address(0)));
    }

    #[test]
    fn mark_fully_explored_releases_simulation() {
        let mut t = tree();
        let root = t.root();
        t.get_mut(root).addr = Some(Address(0));
        t.dye_red(
            root,
            crate::symbolic::test_support::ToyState {
                addr: Address(0),
                branches: vec![],
                constrained: false,
            },
        );
        t.mark_fully_explored(root);
        assert!(t.get(root).fully_explored);
        assert!(t.get(root).simulation.is_none());
    }

    #[test]
    fn uct_unvisited_is_infinite_and_fully_explored_is_zero() {
        let mut t = tree();
        let (child, _) = t.child_or_insert(t.root(), Address(1));
        assert_eq!(t.uct(child, 0, DEFAULT_RHO), f64::INFINITY);
        t.get_mut(child).sel_try = 1;
        t.mark_fully_explored(child);
        assert_eq!(t.uct(child, 10, DEFAULT_RHO), 0.0);
    }
}
