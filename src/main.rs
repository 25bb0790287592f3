use std::env;
use std::process;
use std::str::FromStr;
use std::time::Duration;

use coherence_sim::simulator::{compare_protocols, simulate};
use coherence_sim::{Protocol, Result, SimError, SimSpec};
use env_logger::Env;
use log::error;

const USAGE: &str = "usage: coherence-sim [compare|mesi|none] [cores] [ops_per_core] [pause_ms] [seed]";

enum Mode {
    Compare,
    Single(Protocol),
}

fn parse_arg<T: FromStr>(args: &[String], i: usize, name: &str) -> Result<Option<T>> {
    match args.get(i) {
        None => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| SimError::Config(format!("{} must be a number, got `{}`\n{}", name, s, USAGE))),
    }
}

fn parse_args(args: &[String]) -> Result<(Mode, SimSpec)> {
    let mode = match args.get(1).map(String::as_str) {
        None | Some("compare") => Mode::Compare,
        Some(p) => Mode::Single(p.parse()?),
    };
    let mut spec = SimSpec::default();
    if let Some(n) = parse_arg(args, 2, "cores")? {
        spec.num_cores = n;
    }
    if let Some(n) = parse_arg(args, 3, "ops_per_core")? {
        spec.ops_per_core = n;
    }
    if let Some(ms) = parse_arg(args, 4, "pause_ms")? {
        spec.pause = Duration::from_millis(ms);
    }
    spec.seed = parse_arg(args, 5, "seed")?;
    spec.validate()?;
    Ok((mode, spec))
}

fn run(args: &[String]) -> Result<()> {
    let (mode, spec) = parse_args(args)?;
    match mode {
        Mode::Compare => {
            println!("=== cache coherence protocol comparison ===");
            let cmp = compare_protocols(&spec)?;
            println!("\n{}\n\n{}", cmp.none, cmp.mesi);
            println!("\n=== results ===\n{}", cmp);
        }
        Mode::Single(protocol) => {
            let report = simulate(&spec, protocol)?;
            println!("{}", report);
        }
    }
    Ok(())
}

fn main() {
    // logging
    let env = Env::default()
        .filter_or("COHERENCE_LOG", "info")
        .write_style_or("COHERENCE_LOG_STYLE", "auto");
    env_logger::init_from_env(env);

    let args: Vec<String> = env::args().collect();
    if let Err(e) = run(&args) {
        error!("{}", e);
        process::exit(1);
    }
}
