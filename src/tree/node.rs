//! Node payload and colour (§3, §4.4, C4).

use crate::address::Address;
use crate::symbolic::SymbolicEngine;
use crate::tree::arena::NodeIndex;
use std::collections::HashMap;

/// Tag-only view of a node's colour, used wherever the spec compares
/// colours structurally (§9 open question: "the specification uses
/// structural equality", not the source's `is`-based identity check).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColourKind {
    White,
    Red,
    Black,
    Gold,
    Phantom,
}

/// A node's colour, modelled as a sum type with per-variant symbolic
/// state payload (spec §9 REDESIGN FLAG): illegal combinations like "a
/// Black node carrying a symbolic state" are unrepresentable, instead
/// of a `colour` enum plus a nullable `state` field.
pub enum Colour<State> {
    /// In the concrete trace, symbolic alignment not yet attempted.
    White,
    /// In the concrete trace, confirmed to diverge from the symbolic
    /// engine: no symbolic state, no Simulation child.
    Black,
    /// In the concrete trace, confirmed symbolic state. Owns a Gold
    /// Simulation child (tracked separately, see [`NodeData::simulation`]).
    Red(State),
    /// Simulation sentinel: not in the concrete trace, holds the state
    /// mutations are drawn from.
    Gold(State),
    /// Speculative sibling the symbolic engine believes reachable but
    /// concrete execution has not yet produced.
    Phantom(State),
}

impl<State> Colour<State> {
    pub fn kind(&self) -> ColourKind {
        match self {
            Colour::White => ColourKind::White,
            Colour::Black => ColourKind::Black,
            Colour::Red(_) => ColourKind::Red,
            Colour::Gold(_) => ColourKind::Gold,
            Colour::Phantom(_) => ColourKind::Phantom,
        }
    }

    pub fn state(&self) -> Option<&State> {
        match self {
            Colour::Red(s) | Colour::Gold(s) | Colour::Phantom(s) => Some(s),
            Colour::White | Colour::Black => None,
        }
    }
}

/// A vertex of the execution-path tree (§3).
pub struct NodeData<Eng: SymbolicEngine> {
    /// Unset only for the root before the first seed trace is observed.
    pub addr: Option<Address>,
    pub parent: Option<NodeIndex>,
    /// Concrete children, keyed by address. Never includes the
    /// Simulation sentinel (see [`Self::simulation`]) — the "Simulation"
    /// reserved key the source used is replaced by this dedicated field
    /// per spec §9's REDESIGN FLAGS.
    pub children: HashMap<Address, NodeIndex>,
    pub simulation: Option<NodeIndex>,
    pub colour: Colour<Eng::State>,
    pub phantom: bool,
    pub exhausted: bool,
    pub fully_explored: bool,
    pub sel_try: u64,
    pub sel_win: u64,
    pub sim_try: u64,
    pub sim_win: u64,
    pub visited: u64,
    pub distinct: u64,
    /// Lazy, possibly-infinite solver-sample iterator. `None` until the
    /// first quick-sample call; cleared when the node is destroyed.
    pub samples: Option<Eng::Samples>,
}

impl<Eng: SymbolicEngine> NodeData<Eng> {
    pub fn white(addr: Option<Address>, parent: Option<NodeIndex>) -> Self {
        Self {
            addr,
            parent,
            children: HashMap::new(),
            simulation: None,
            colour: Colour::White,
            phantom: false,
            exhausted: false,
            fully_explored: false,
            sel_try: 0,
            sel_win: 0,
            sim_try: 0,
            sim_win: 0,
            visited: 0,
            distinct: 0,
            samples: None,
        }
    }

    pub fn is_diverging(&self) -> bool {
        self.children.len() > 1
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty() && self.simulation.is_none()
    }
}

impl<Eng: SymbolicEngine> std::fmt::Debug for NodeData<Eng> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeData")
            .field("addr", &self.addr)
            .field("colour", &self.colour.kind())
            .field("phantom", &self.phantom)
            .field("exhausted", &self.exhausted)
            .field("fully_explored", &self.fully_explored)
            .field("sel_try", &self.sel_try)
            .field("sel_win", &self.sel_win)
            .field("sim_try", &self.sim_try)
            .field("sim_win", &self.sim_win)
            .field("visited", &self.visited)
            .field("distinct", &self.distinct)
            .finish()
    }
}
