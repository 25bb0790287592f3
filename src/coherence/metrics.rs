use std::fmt;

/// Counters owned by the engine. Only ever incremented.
#[derive(Default, Debug)]
pub struct Metrics {
    accesses: u64,
    misses: u64,
    coherence_messages: u64,
}

impl Metrics {
    pub fn access(&mut self) {
        self.accesses += 1;
    }
    pub fn miss(&mut self) {
        self.misses += 1;
    }
    pub fn messages(&mut self, n: u64) {
        self.coherence_messages += n;
    }
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            accesses: self.accesses,
            misses: self.misses,
            coherence_messages: self.coherence_messages,
        }
    }
}

#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub struct MetricsSnapshot {
    pub accesses: u64,
    pub misses: u64,
    pub coherence_messages: u64,
}

impl MetricsSnapshot {
    /// Misses per access in percent, 0 before the first access.
    pub fn miss_rate(&self) -> f64 {
        if self.accesses == 0 {
            return 0.0;
        }
        self.misses as f64 / self.accesses as f64 * 100.0
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "memory accesses:    {}", self.accesses)?;
        writeln!(f, "cache misses:       {} ({:.1}%)", self.misses, self.miss_rate())?;
        write!(f, "coherence messages: {}", self.coherence_messages)
    }
}
