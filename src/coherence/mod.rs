mod engine;
mod memory;
mod metrics;
mod state;
mod values;

pub use engine::Engine;
pub use memory::{CoreCaches, SharedMemory};
pub use metrics::{Metrics, MetricsSnapshot};
pub use state::{LineState, StateTable};
pub use values::{RandomValues, SequenceValues, ValueSource};
