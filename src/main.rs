use anyhow::Context;
use log::info;
use rand::{rngs::OsRng, Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use structopt::StructOpt;

mod board;
mod driver;
mod opts;
mod solver;
mod util;

use driver::Printer;
use opts::{Opts, Strategy};
use solver::{InferenceSolver, RandomSolver, Solver};

type BaseRng = Xoshiro256PlusPlus;

fn main() -> anyhow::Result<()> {
    env_logger::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = Opts::from_args().validate().context("invalid configuration")?;
    let seed = config.seed.unwrap_or_else(|| OsRng.next_u64());
    info!("seed {}", seed);

    let mut rng = BaseRng::seed_from_u64(seed);
    let solver_rng = BaseRng::seed_from_u64(rng.gen());
    let mut solver: Box<dyn Solver> = match config.strategy {
        Strategy::Inference => Box::new(InferenceSolver::new(solver_rng).with_frontier_cap(config.frontier_cap)),
        Strategy::Random => Box::new(RandomSolver::new(solver_rng)),
    };

    let printer = Printer::new(config.quiet);
    let stats = driver::play_games(&config, solver.as_mut(), &mut rng, &printer)
        .with_context(|| format!("running games with seed {}", seed))?;
    println!("\n{}\n", stats);
    Ok(())
}
