/*
    A MESI cache coherence simulator.

    Cores share one memory through private caches. The engine either keeps
    the caches coherent with MESI or lets them drift apart, and counts the
    misses and coherence messages either way.
 */

pub mod coherence;
pub mod common;
pub mod error;
pub mod simulator;

pub use coherence::{Engine, LineState, MetricsSnapshot};
pub use common::{Access, CoreId, Protocol, SimSpec, Value};
pub use error::{Result, SimError};
