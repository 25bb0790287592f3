use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, SimError};

/// Payload stored in memory and in the caches.
pub type Value = u32;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct CoreId(pub u32);

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Access {
    Read,
    Write,
}

impl FromStr for Access {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "read" | "r" => Ok(Access::Read),
            "write" | "w" => Ok(Access::Write),
            _ => Err(SimError::UnknownAccess(s.into())),
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Read => f.write_str("read"),
            Access::Write => f.write_str("write"),
        }
    }
}

/// Memory discipline the engine runs under, fixed at construction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Protocol {
    /// MESI states are tracked per (core, address); writes invalidate other copies.
    Mesi,
    /// Every core fills and writes its cache independently. Reads may be stale.
    None,
}

impl FromStr for Protocol {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mesi" | "coherent" => Ok(Protocol::Mesi),
            "none" => Ok(Protocol::None),
            _ => Err(SimError::UnknownProtocol(s.into())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Mesi => f.write_str("MESI"),
            Protocol::None => f.write_str("none"),
        }
    }
}

// system specs

#[derive(Clone, Debug)]
pub struct SimSpec {
    pub num_cores: u32,
    pub ops_per_core: u32,
    pub addresses: Vec<char>,
    pub pause: Duration,        // between two accesses of one core
    pub baseline: Value,        // value of memory never written
    pub values: RangeInclusive<Value>,
    pub seed: Option<u64>,
}

impl Default for SimSpec {
    fn default() -> Self {
        SimSpec {
            num_cores: 4,
            ops_per_core: 100,
            addresses: vec!['A', 'B', 'C', 'D'],
            pause: Duration::from_millis(1),
            baseline: 0,
            values: 1..=100,
            seed: None,
        }
    }
}

impl SimSpec {
    pub fn validate(&self) -> Result<()> {
        if self.num_cores == 0 {
            return Err(SimError::Config("at least one core is required".into()));
        }
        if self.addresses.is_empty() {
            return Err(SimError::Config("address set is empty".into()));
        }
        if self.values.is_empty() {
            return Err(SimError::Config(format!(
                "value range {}..={} is empty",
                self.values.start(),
                self.values.end()
            )));
        }
        Ok(())
    }

    pub fn total_ops(&self) -> u64 {
        self.num_cores as u64 * self.ops_per_core as u64
    }
}
