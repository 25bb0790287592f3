use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::common::CoreId;

#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub enum LineState {
    #[default]
    Invalid,
    Shared,
    Exclusive,
    Modified,
}

impl LineState {
    /// Modified or Exclusive: this core is the only holder of the line.
    pub fn is_owner(&self) -> bool {
        matches!(self, LineState::Modified | LineState::Exclusive)
    }
}

impl fmt::Display for LineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            LineState::Invalid => 'I',
            LineState::Shared => 'S',
            LineState::Exclusive => 'E',
            LineState::Modified => 'M',
        };
        write!(f, "{}", c)
    }
}

/// Per-core MESI records.
///
/// A record for (core, addr) is created the first time the core looks the
/// address up and is never removed. The invalidation and sharing fan-outs go
/// over every core holding a record, whether or not that core still has the
/// line cached.
pub struct StateTable<A> {
    records: HashMap<CoreId, HashMap<A, LineState>>,
}

impl<A: Eq + Hash + Clone> StateTable<A> {
    pub fn new() -> Self {
        StateTable { records: HashMap::new() }
    }

    pub fn register(&mut self, core: CoreId) {
        self.records.entry(core).or_default();
    }

    pub fn is_registered(&self, core: CoreId) -> bool {
        self.records.contains_key(&core)
    }

    /// State of the line, creating an Invalid record if the core never saw it.
    /// Returns `None` for unregistered cores.
    pub fn lookup(&mut self, core: CoreId, addr: &A) -> Option<LineState> {
        let lines = self.records.get_mut(&core)?;
        Some(*lines.entry(addr.clone()).or_default())
    }

    /// Read-only view; does not create a record.
    pub fn peek(&self, core: CoreId, addr: &A) -> Option<LineState> {
        self.records.get(&core)?.get(addr).copied()
    }

    pub fn set(&mut self, core: CoreId, addr: &A, state: LineState) {
        if let Some(lines) = self.records.get_mut(&core) {
            lines.insert(addr.clone(), state);
        }
    }

    /// Cores (other than `except`) with any record for `addr`, in id order.
    pub fn holders(&self, addr: &A, except: Option<CoreId>) -> Vec<CoreId> {
        let mut cores = self.records
            .iter()
            .filter(|(&c, lines)| Some(c) != except && lines.contains_key(addr))
            .map(|(&c, _)| c)
            .collect::<Vec<_>>();
        cores.sort();
        cores
    }
}

impl<A: Eq + Hash + Clone> Default for StateTable<A> {
    fn default() -> Self {
        Self::new()
    }
}
