use std::fmt::Debug;
use std::hash::Hash;

use log::{debug, trace};
use parking_lot::Mutex;

use super::memory::{CoreCaches, SharedMemory};
use super::metrics::{Metrics, MetricsSnapshot};
use super::state::{LineState, StateTable};
use super::values::{RandomValues, ValueSource};
use crate::common::{Access, CoreId, Protocol, SimSpec, Value};
use crate::error::{Result, SimError};

/// Coherence engine shared by all simulated cores.
///
/// Every call goes through one lock, which plays the role of a globally
/// ordered bus: an access is looked up, resolved, counted and answered before
/// the next one (from any core) starts. Nothing in here is touched outside
/// that lock.
pub struct Engine<A> {
    protocol: Protocol,
    inner: Mutex<Inner<A>>,
}

struct Inner<A> {
    memory: SharedMemory<A>,
    caches: CoreCaches<A>,
    states: StateTable<A>,
    metrics: Metrics,
    values: Box<dyn ValueSource>,
}

impl<A> Engine<A>
where
    A: Eq + Hash + Clone + Debug + Send,
{
    /// Baseline 0, random write payloads in 1..=100.
    pub fn new(protocol: Protocol) -> Self {
        Self::with_values(protocol, 0, Box::new(RandomValues::default()))
    }

    pub fn with_values(protocol: Protocol, baseline: Value, values: Box<dyn ValueSource>) -> Self {
        Engine {
            protocol,
            inner: Mutex::new(Inner {
                memory: SharedMemory::new(baseline),
                caches: CoreCaches::new(),
                states: StateTable::new(),
                metrics: Metrics::default(),
                values,
            }),
        }
    }

    pub fn from_spec(spec: &SimSpec, protocol: Protocol) -> Result<Self> {
        spec.validate()?;
        let values = RandomValues::new(spec.values.clone(), spec.seed);
        Ok(Self::with_values(protocol, spec.baseline, Box::new(values)))
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Must be called once per core before its first access.
    pub fn register_core(&self, core: CoreId) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.caches.register(core) {
            return Err(SimError::DuplicateCore(core));
        }
        if self.protocol == Protocol::Mesi {
            inner.states.register(core);
        }
        debug!("registered core {} ({})", core, self.protocol);
        Ok(())
    }

    /// Performs one memory access and returns the value the core observes:
    /// the cached value for a read, the freshly written value for a write.
    pub fn access(&self, core: CoreId, addr: &A, kind: Access) -> Result<Value> {
        let mut inner = self.inner.lock();
        if !inner.caches.is_registered(core) {
            return Err(SimError::UnregisteredCore(core));
        }
        inner.metrics.access();
        let value = match self.protocol {
            Protocol::Mesi => inner.access_mesi(core, addr, kind),
            Protocol::None => inner.access_uncoordinated(core, addr, kind),
        };
        Ok(value)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.lock().metrics.snapshot()
    }

    /// MESI state of a line, `None` if the core never looked the address up
    /// (or the engine does not track states).
    pub fn line_state(&self, core: CoreId, addr: &A) -> Option<LineState> {
        self.inner.lock().states.peek(core, addr)
    }

    pub fn cached_value(&self, core: CoreId, addr: &A) -> Option<Value> {
        self.inner.lock().caches.get(core, addr)
    }

    pub fn memory_value(&self, addr: &A) -> Option<Value> {
        self.inner.lock().memory.get(addr)
    }
}

impl<A> Inner<A>
where
    A: Eq + Hash + Clone + Debug,
{
    fn access_mesi(&mut self, core: CoreId, addr: &A, kind: Access) -> Value {
        let state = self.states.lookup(core, addr).unwrap_or_default();
        let cached = match state {
            LineState::Invalid => None,
            _ => self.caches.get(core, addr),
        };

        let observed = match cached {
            Some(v) => {
                trace!("{} {} {:?}: hit ({})", core, kind, addr, state);
                v
            }
            None => {
                trace!("{} {} {:?}: miss ({})", core, kind, addr, state);
                self.metrics.miss();
                let snooped = self.caches.held_elsewhere(core, addr);
                let current = self.memory.fetch(addr);
                match kind {
                    Access::Read if snooped => {
                        // every core with a record joins the sharers, the requester included
                        for c in self.states.holders(addr, None) {
                            self.transition(c, addr, LineState::Shared);
                        }
                        self.transition(core, addr, LineState::Shared);
                        self.metrics.messages(2);   // BusRd + snoop response
                    }
                    Access::Read => {
                        self.transition(core, addr, LineState::Exclusive);
                        self.metrics.messages(1);   // fetch from memory
                    }
                    Access::Write => {
                        self.invalidate_others(core, addr);
                        self.transition(core, addr, LineState::Modified);
                        self.metrics.messages(2);   // BusRdX + acknowledgement
                    }
                }
                self.caches.fill(core, addr, current);
                current
            }
        };

        match kind {
            Access::Read => observed,
            Access::Write => {
                if state == LineState::Shared {
                    // upgrade
                    self.transition(core, addr, LineState::Modified);
                    self.invalidate_others(core, addr);
                    self.metrics.messages(1);
                }
                self.write_through(core, addr)
            }
        }
    }

    fn access_uncoordinated(&mut self, core: CoreId, addr: &A, kind: Access) -> Value {
        let observed = match self.caches.get(core, addr) {
            Some(v) => v,
            None => {
                trace!("{} {} {:?}: miss", core, kind, addr);
                self.metrics.miss();
                let current = self.memory.fetch(addr);
                self.caches.fill(core, addr, current);
                current
            }
        };
        match kind {
            Access::Read => observed,
            Access::Write => self.write_through(core, addr),
        }
    }

    fn write_through(&mut self, core: CoreId, addr: &A) -> Value {
        let value = self.values.next_value();
        self.caches.fill(core, addr, value);
        self.memory.store(addr, value);
        value
    }

    fn invalidate_others(&mut self, core: CoreId, addr: &A) {
        for c in self.states.holders(addr, Some(core)) {
            self.transition(c, addr, LineState::Invalid);
            self.caches.drop_line(c, addr);
        }
    }

    fn transition(&mut self, core: CoreId, addr: &A, to: LineState) {
        let from = self.states.peek(core, addr).unwrap_or_default();
        if from != to {
            debug!("{} {:?}: {} -> {}", core, addr, from, to);
        }
        self.states.set(core, addr, to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coherence::values::SequenceValues;

    const P0: CoreId = CoreId(0);
    const P1: CoreId = CoreId(1);
    const P2: CoreId = CoreId(2);

    fn engine(protocol: Protocol, cores: u32, values: Vec<Value>) -> Engine<char> {
        let e = Engine::with_values(protocol, 0, Box::new(SequenceValues::new(values)));
        for i in 0..cores {
            e.register_core(CoreId(i)).unwrap();
        }
        e
    }

    fn snapshot(accesses: u64, misses: u64, coherence_messages: u64) -> MetricsSnapshot {
        MetricsSnapshot { accesses, misses, coherence_messages }
    }

    #[test]
    fn write_then_read_then_upgrade() {
        let e = engine(Protocol::Mesi, 2, vec![11, 22]);

        assert_eq!(e.access(P0, &'X', Access::Write), Ok(11));
        assert_eq!(e.line_state(P0, &'X'), Some(LineState::Modified));
        assert_eq!(e.metrics(), snapshot(1, 1, 2));

        assert_eq!(e.access(P1, &'X', Access::Read), Ok(11));
        assert_eq!(e.line_state(P1, &'X'), Some(LineState::Shared));
        assert_eq!(e.line_state(P0, &'X'), Some(LineState::Shared));
        assert_eq!(e.metrics(), snapshot(2, 2, 4));

        assert_eq!(e.access(P1, &'X', Access::Write), Ok(22));
        assert_eq!(e.line_state(P1, &'X'), Some(LineState::Modified));
        assert_eq!(e.line_state(P0, &'X'), Some(LineState::Invalid));
        assert_eq!(e.cached_value(P0, &'X'), None);
        assert_eq!(e.memory_value(&'X'), Some(22));
        assert_eq!(e.metrics(), snapshot(3, 2, 5));
    }

    #[test]
    fn first_read_is_exclusive_then_silent_write() {
        let e = engine(Protocol::Mesi, 2, vec![5]);
        assert_eq!(e.access(P0, &'X', Access::Read), Ok(0));
        assert_eq!(e.line_state(P0, &'X'), Some(LineState::Exclusive));
        assert_eq!(e.metrics(), snapshot(1, 1, 1));

        // sole owner: no message, but memory still receives the write
        assert_eq!(e.access(P0, &'X', Access::Write), Ok(5));
        assert_eq!(e.line_state(P0, &'X'), Some(LineState::Exclusive));
        assert_eq!(e.memory_value(&'X'), Some(5));
        assert_eq!(e.metrics(), snapshot(2, 1, 1));

        assert_eq!(e.access(P0, &'X', Access::Read), Ok(5));
        assert_eq!(e.metrics(), snapshot(3, 1, 1));
    }

    #[test]
    fn invalidated_reader_fetches_new_value() {
        let e = engine(Protocol::Mesi, 2, vec![9]);
        e.access(P1, &'X', Access::Read).unwrap();
        e.access(P0, &'X', Access::Write).unwrap();
        assert_eq!(e.line_state(P1, &'X'), Some(LineState::Invalid));

        let before = e.metrics();
        assert_eq!(e.access(P1, &'X', Access::Read), Ok(9));
        assert_eq!(e.metrics().misses, before.misses + 1);
        assert_eq!(e.line_state(P1, &'X'), Some(LineState::Shared));
    }

    #[test]
    fn sharing_fan_out_reaches_record_only_cores() {
        let e = engine(Protocol::Mesi, 3, vec![1, 2]);
        e.access(P2, &'X', Access::Read).unwrap();     // P2: E
        e.access(P0, &'X', Access::Write).unwrap();    // P0: M, P2: I (line dropped)
        e.access(P1, &'X', Access::Read).unwrap();     // snoop hits P0

        // P2 only has a stale record, yet it is marked Shared without a cached copy
        assert_eq!(e.line_state(P2, &'X'), Some(LineState::Shared));
        assert_eq!(e.cached_value(P2, &'X'), None);
        assert_eq!(e.line_state(P0, &'X'), Some(LineState::Shared));
        assert_eq!(e.line_state(P1, &'X'), Some(LineState::Shared));

        // still a miss for P2, and it observes the current value
        let before = e.metrics();
        assert_eq!(e.access(P2, &'X', Access::Read), Ok(1));
        assert_eq!(e.metrics(), snapshot(before.accesses + 1, before.misses + 1, before.coherence_messages + 2));
    }

    #[test]
    fn write_miss_on_shared_record_also_upgrades() {
        let e = engine(Protocol::Mesi, 3, vec![1, 2]);
        e.access(P2, &'X', Access::Read).unwrap();
        e.access(P0, &'X', Access::Write).unwrap();
        e.access(P1, &'X', Access::Read).unwrap();
        // P2 is Shared without a copy: miss (+2) and the Shared upgrade (+1)
        let before = e.metrics();
        assert_eq!(e.access(P2, &'X', Access::Write), Ok(2));
        assert_eq!(e.metrics().coherence_messages, before.coherence_messages + 3);
        assert_eq!(e.line_state(P2, &'X'), Some(LineState::Modified));
        assert_eq!(e.line_state(P0, &'X'), Some(LineState::Invalid));
        assert_eq!(e.line_state(P1, &'X'), Some(LineState::Invalid));
    }

    #[test]
    fn uncoordinated_reads_baseline_then_hits() {
        let e = engine(Protocol::None, 1, vec![1]);
        assert_eq!(e.access(P0, &'Y', Access::Read), Ok(0));
        assert_eq!(e.metrics(), snapshot(1, 1, 0));
        assert_eq!(e.access(P0, &'Y', Access::Read), Ok(0));
        assert_eq!(e.metrics(), snapshot(2, 1, 0));
        assert_eq!(e.line_state(P0, &'Y'), None);
    }

    #[test]
    fn uncoordinated_reader_stays_stale() {
        let e = engine(Protocol::None, 2, vec![50]);
        assert_eq!(e.access(P1, &'X', Access::Read), Ok(0));
        assert_eq!(e.access(P0, &'X', Access::Write), Ok(50));
        assert_eq!(e.access(P1, &'X', Access::Read), Ok(0));
        assert_eq!(e.memory_value(&'X'), Some(50));
        assert_eq!(e.metrics(), snapshot(3, 2, 0));
    }

    #[test]
    fn coherent_reader_sees_write() {
        let e = engine(Protocol::Mesi, 2, vec![50]);
        e.access(P1, &'X', Access::Read).unwrap();
        e.access(P0, &'X', Access::Write).unwrap();
        assert_eq!(e.access(P1, &'X', Access::Read), Ok(50));
    }

    #[test]
    fn unregistered_core_is_rejected() {
        let e = engine(Protocol::Mesi, 1, vec![1]);
        assert_eq!(e.access(P1, &'X', Access::Read), Err(SimError::UnregisteredCore(P1)));
        assert_eq!(e.metrics(), MetricsSnapshot::default());
        assert_eq!(e.register_core(P0), Err(SimError::DuplicateCore(P0)));
    }
}
