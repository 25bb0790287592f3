use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::coherence::{Engine, MetricsSnapshot};
use crate::common::{Access, CoreId, Protocol, SimSpec};
use crate::error::{Result, SimError};

/// Outcome of one simulated run.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub protocol: Protocol,
    pub elapsed: Duration,
    pub metrics: MetricsSnapshot,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "protocol:           {}", self.protocol)?;
        writeln!(f, "execution time:     {:.4}s", self.elapsed.as_secs_f64())?;
        write!(f, "{}", self.metrics)
    }
}

/// Runs `spec.num_cores` threads against one engine, each issuing
/// `spec.ops_per_core` random accesses with `spec.pause` in between.
pub fn simulate(spec: &SimSpec, protocol: Protocol) -> Result<RunReport> {
    let engine = Engine::from_spec(spec, protocol)?;
    info!(
        "running {} cores x {} ops, protocol {}",
        spec.num_cores, spec.ops_per_core, protocol
    );

    let t0 = Instant::now();
    thread::scope(|s| {
        let handles = (0..spec.num_cores)
            .map(|i| {
                let core = CoreId(i);
                let engine = &engine;
                (core, s.spawn(move || run_core(engine, spec, core)))
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .try_for_each(|(core, h)| h.join().map_err(|_| SimError::WorkerPanicked(core))?)
    })?;
    let elapsed = t0.elapsed();

    let metrics = engine.metrics();
    info!("{} run finished in {:?}: {:?}", protocol, elapsed, metrics);
    Ok(RunReport { protocol, elapsed, metrics })
}

fn run_core(engine: &Engine<char>, spec: &SimSpec, core: CoreId) -> Result<()> {
    let mut rng = match spec.seed {
        // one independent stream per core
        Some(seed) => StdRng::seed_from_u64(seed ^ (u64::from(core.0) + 1).wrapping_mul(0x9e37_79b9_7f4a_7c15)),
        None => StdRng::from_entropy(),
    };
    engine.register_core(core)?;
    for _ in 0..spec.ops_per_core {
        let addr = spec
            .addresses
            .choose(&mut rng)
            .ok_or_else(|| SimError::Config("address set is empty".into()))?;
        let kind = if rng.gen_bool(0.5) { Access::Read } else { Access::Write };
        engine.access(core, addr, kind)?;
        if !spec.pause.is_zero() {
            thread::sleep(spec.pause);
        }
    }
    debug!("core {} done", core);
    Ok(())
}

/// The same workload without coherence and with MESI.
#[derive(Clone, Debug)]
pub struct Comparison {
    pub none: RunReport,
    pub mesi: RunReport,
}

impl Comparison {
    /// Seconds the uncoordinated run took longer than the MESI run.
    pub fn time_diff(&self) -> f64 {
        self.none.elapsed.as_secs_f64() - self.mesi.elapsed.as_secs_f64()
    }

    /// Misses of the uncoordinated run minus misses of the MESI run.
    pub fn miss_diff(&self) -> i64 {
        self.none.metrics.misses as i64 - self.mesi.metrics.misses as i64
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dt = self.time_diff();
        let dm = self.miss_diff();
        writeln!(
            f,
            "execution time difference: {:.4}s ({})",
            dt,
            if dt > 0.0 { "MESI faster" } else { "no protocol faster" }
        )?;
        writeln!(
            f,
            "cache miss difference:     {} ({})",
            dm,
            if dm > 0 { "more misses without protocol" } else { "more misses with MESI" }
        )?;
        writeln!(f, "coherence messages (MESI): {}", self.mesi.metrics.coherence_messages)?;
        write!(f, "coherence messages (none): {}", self.none.metrics.coherence_messages)
    }
}

/// Runs the workload without a protocol, then with MESI.
pub fn compare_protocols(spec: &SimSpec) -> Result<Comparison> {
    let none = simulate(spec, Protocol::None)?;
    let mesi = simulate(spec, Protocol::Mesi)?;
    Ok(Comparison { none, mesi })
}
