use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::common::Value;

/// Where written values come from. Writes never carry caller data; the
/// payload only stands in for "something new".
pub trait ValueSource: Send {
    fn next_value(&mut self) -> Value;
}

pub struct RandomValues {
    rng: StdRng,
    range: RangeInclusive<Value>,
}

impl RandomValues {
    pub fn new(range: RangeInclusive<Value>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        RandomValues { rng, range }
    }
}

impl Default for RandomValues {
    fn default() -> Self {
        Self::new(1..=100, None)
    }
}

impl ValueSource for RandomValues {
    fn next_value(&mut self) -> Value {
        self.rng.gen_range(self.range.clone())
    }
}

/// Replays a fixed list of values, wrapping around at the end.
pub struct SequenceValues {
    values: Vec<Value>,
    next: usize,
}

impl SequenceValues {
    pub fn new(values: Vec<Value>) -> Self {
        assert!(!values.is_empty(), "value sequence must not be empty");
        SequenceValues { values, next: 0 }
    }
}

impl ValueSource for SequenceValues {
    fn next_value(&mut self) -> Value {
        let v = self.values[self.next];
        self.next = (self.next + 1) % self.values.len();
        v
    }
}
