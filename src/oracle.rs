//! A table-driven reference [`SymbolicEngine`] (§4.2 contract), used by
//! the `briar` binary when no real binary-analysis backend is linked
//! in.
//!
//! Constructing a genuine symbolic executor — ELF parsing,
//! disassembly, instruction-level semantics — is explicitly out of
//! scope for this crate (spec.md §1): it is "assumed to provide"
//! `entry_state`/`step`/a solver iterator, not implemented here. This
//! module offers the simplest honest stand-in: an oracle loaded from a
//! small text table naming, for each address the binary can reach, its
//! successor addresses and the stdin byte that drives execution to
//! each one. Swap this module for a real backend to fuzz arbitrary
//! unannotated binaries; `TableEngine` only knows what its table says.

use crate::address::Address;
use crate::error::FuzzError;
use crate::symbolic::SymbolicEngine;
use std::collections::{HashMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableState {
    addr: Address,
    /// Stdin bytes already fixed by the path taken to reach `addr`, so
    /// `quick_sample` can hand back a complete replayable input rather
    /// than just the one byte this state's own branch adds.
    prefix: Vec<u8>,
    branches: Vec<(Address, u8)>,
    constrained: bool,
}

/// Table-driven [`SymbolicEngine`]. Lines are `entry <addr>`,
/// `branch <from> <to> <byte>`, or `constrained <addr>`; `#` starts a
/// trailing comment. Addresses are decimal or `0x`-prefixed hex; a
/// branch byte is either a single ASCII character or `0x`-prefixed
/// hex.
pub struct TableEngine {
    entry: Address,
    table: HashMap<Address, Vec<(Address, u8)>>,
    constrained: HashSet<Address>,
}

pub struct TableSamples(std::vec::IntoIter<Vec<u8>>);

impl Iterator for TableSamples {
    type Item = Vec<u8>;
    fn next(&mut self) -> Option<Vec<u8>> {
        self.0.next()
    }
}

impl TableEngine {
    /// An oracle with no table entries at all: every address has zero
    /// successors and no constraints, so the mutator always falls back
    /// to random-sample (§4.3) and the tree stays Black below the
    /// root — pure coverage-guided random fuzzing with no concolic
    /// assistance.
    pub fn empty(entry: Address) -> Self {
        Self {
            entry,
            table: HashMap::new(),
            constrained: HashSet::new(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FuzzError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| FuzzError::Spawn(format!("branch table {}: {e}", path.display())))?;
        Self::parse(&text)
    }

    fn parse(text: &str) -> Result<Self, FuzzError> {
        let mut entry = Address(0);
        let mut table: HashMap<Address, Vec<(Address, u8)>> = HashMap::new();
        let mut constrained = HashSet::new();

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let words: Vec<&str> = line.split_whitespace().collect();
            match words.as_slice() {
                ["entry", addr] => entry = parse_addr(addr, lineno)?,
                ["branch", from, to, byte] => {
                    let from = parse_addr(from, lineno)?;
                    let to = parse_addr(to, lineno)?;
                    let byte = parse_byte(byte, lineno)?;
                    table.entry(from).or_default().push((to, byte));
                }
                ["constrained", addr] => {
                    constrained.insert(parse_addr(addr, lineno)?);
                }
                _ => {
                    return Err(FuzzError::Invariant(format!(
                        "branch table line {}: unrecognised `{line}`",
                        lineno + 1
                    )))
                }
            }
        }
        Ok(Self {
            entry,
            table,
            constrained,
        })
    }

    fn state_at(&self, addr: Address, prefix: Vec<u8>) -> TableState {
        TableState {
            addr,
            prefix,
            branches: self.table.get(&addr).cloned().unwrap_or_default(),
            constrained: self.constrained.contains(&addr),
        }
    }
}

fn parse_addr(word: &str, lineno: usize) -> Result<Address, FuzzError> {
    let value = match word.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => word.parse::<u64>(),
    }
    .map_err(|_| {
        FuzzError::Invariant(format!("branch table line {}: bad address `{word}`", lineno + 1))
    })?;
    Ok(Address(value))
}

fn parse_byte(word: &str, lineno: usize) -> Result<u8, FuzzError> {
    if let Some(hex) = word.strip_prefix("0x") {
        return u8::from_str_radix(hex, 16).map_err(|_| {
            FuzzError::Invariant(format!("branch table line {}: bad byte `{word}`", lineno + 1))
        });
    }
    let bytes = word.as_bytes();
    if bytes.len() == 1 {
        return Ok(bytes[0]);
    }
    Err(FuzzError::Invariant(format!(
        "branch table line {}: bad byte `{word}`",
        lineno + 1
    )))
}

impl SymbolicEngine for TableEngine {
    type State = TableState;
    type Samples = TableSamples;

    fn entry_state(&mut self) -> TableState {
        self.state_at(self.entry, Vec::new())
    }

    fn address_of(&self, state: &TableState) -> Address {
        state.addr
    }

    fn has_constraints(&self, state: &TableState) -> bool {
        state.constrained
    }

    fn step(&mut self, state: &TableState) -> Result<Vec<TableState>, FuzzError> {
        Ok(state
            .branches
            .iter()
            .map(|(addr, byte)| {
                let mut prefix = state.prefix.clone();
                prefix.push(*byte);
                self.state_at(*addr, prefix)
            })
            .collect())
    }

    /// Replays `state`'s prefix with each live branch byte appended, so
    /// a trace fed this sample retraces the same path that reached
    /// `state` before taking the new branch.
    fn quick_sample(&mut self, state: &TableState) -> TableSamples {
        let samples: Vec<Vec<u8>> = state
            .branches
            .iter()
            .map(|(_, byte)| {
                let mut input = state.prefix.clone();
                input.push(*byte);
                input
            })
            .collect();
        TableSamples(samples.into_iter())
    }
}
