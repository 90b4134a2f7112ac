//! RMM Simulator
//!
//! Drives an in-memory engine through one pool's life: create, margin
//! deposit, allocate, alternating swaps, supply, borrow, repay and remove.
//! The invariant is printed after every step and the committed events are
//! dumped as JSON at the end.
//!
//! ```text
//! rmm-sim --swaps 10
//! RMM__ENGINE__GAMMA_BPS=9970 rmm-sim --config config/rmm.toml --json-logs
//! ```

mod wallet;

use anyhow::{Context, Result};
use clap::Parser;
use rmm_engine::{Account, EngineParams, InMemoryToken, ManualClock, PoolEngine, RecordingSink};
use rmm_types::{Address, PoolId};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wallet::Wallet;

const WAD: u128 = 1_000_000_000_000_000_000;
const START: u64 = 1_700_000_000;
const TERM: u64 = 31_536_000;
const STRIKE: u128 = 1_000 * WAD;
const SIGMA: u32 = 10_000;
const FUNDING: u128 = 1_000_000 * WAD;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "rmm-sim")]
#[command(about = "Scripted replication AMM simulation")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,

    /// Number of alternating swaps
    #[arg(long, default_value_t = 6)]
    swaps: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = rmm_config::load_config(args.config.as_deref())
        .context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid log filter")?;
    if args.json_logs || config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let params = EngineParams::try_from(&config.engine)?;
    info!(?params, swaps = args.swaps, "starting simulation");

    let risky = Arc::new(InMemoryToken::new("RISKY"));
    let stable = Arc::new(InMemoryToken::new("STABLE"));
    let clock = Arc::new(ManualClock::new(START));
    let events = Arc::new(RecordingSink::new());
    let engine = PoolEngine::new(
        Address::from_label("rmm-engine"),
        risky.clone(),
        stable.clone(),
        clock.clone(),
    )
    .with_params(params)
    .with_event_sink(events.clone());

    let lp = Wallet::funded("liquidity-provider", &risky, &stable, FUNDING);
    let trader = Wallet::funded("trader", &risky, &stable, FUNDING);
    let borrower = Wallet::funded("borrower", &risky, &stable, FUNDING);

    let created = engine.create(&lp, STRIKE, SIGMA, START + TERM, WAD / 2, WAD, &[])?;
    let pool_id = created.pool_id;
    report(&engine, &pool_id, "create")?;

    engine.deposit(&trader, trader.address(), 10 * WAD, 10_000 * WAD, &[])?;
    engine.allocate(&lp, pool_id, lp.address(), 9 * WAD, false, &[])?;
    report(&engine, &pool_id, "allocate")?;

    for round in 0..args.swaps {
        clock.advance(3_600);
        let outcome = if round % 2 == 0 {
            engine.swap(&trader, pool_id, true, WAD / 20, true, &[])?
        } else {
            engine.swap(&trader, pool_id, false, 25 * WAD, true, &[])?
        };
        info!(round, delta_in = outcome.delta_in, delta_out = outcome.delta_out, "swap");
        report(&engine, &pool_id, "swap")?;
    }

    engine.supply(lp.address(), pool_id, 2 * WAD)?;
    let borrowed = engine.borrow(&borrower, pool_id, WAD, 0, false, &[])?;
    info!(settlement = ?borrowed.settlement, "borrowed");
    report(&engine, &pool_id, "borrow")?;

    let repaid = engine.repay(&borrower, pool_id, borrower.address(), WAD, 0, false, &[])?;
    info!(settlement = ?repaid.settlement, "repaid");
    report(&engine, &pool_id, "repay")?;

    engine.claim(lp.address(), pool_id, 2 * WAD)?;
    let removed = engine.remove(lp.address(), pool_id, 9 * WAD)?;
    engine.withdraw(
        lp.address(),
        lp.address(),
        removed.delta_risky,
        removed.delta_stable,
    )?;
    report(&engine, &pool_id, "remove")?;

    let reserve = engine.reserve(&pool_id)?;
    println!(
        "final reserves: {} risky, {} stable, {} liquidity",
        reserve.reserve_risky, reserve.reserve_stable, reserve.liquidity
    );
    println!("{}", serde_json::to_string_pretty(&events.events())?);
    Ok(())
}

fn report(engine: &PoolEngine, pool_id: &PoolId, step: &str) -> Result<()> {
    let invariant = engine.invariant_of(pool_id)?;
    let calibration = engine.calibration(pool_id)?;
    println!("{step:<10} tau={:>9}s  k={invariant}", calibration.tau());
    Ok(())
}
