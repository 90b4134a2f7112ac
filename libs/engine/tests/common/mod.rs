//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use anyhow::ensure;
use rmm_engine::{
    Account, BorrowCallback, CreateCallback, CreateOutcome, DepositCallback, InMemoryToken,
    LiquidityCallback, ManualClock, PoolEngine, RecordingSink, SwapCallback, Token,
};
use rmm_types::{Address, PoolId};
use std::sync::Arc;

pub const WAD: u128 = 1_000_000_000_000_000_000;
pub const START: u64 = 1_700_000_000;
pub const STRIKE: u128 = 1_000 * WAD;
pub const SIGMA: u32 = 10_000;
pub const TERM: u64 = 31_536_000;
pub const MATURITY: u64 = START + TERM;
pub const DELTA: u128 = WAD / 2;
pub const LIQUIDITY: u128 = WAD;
pub const FUNDING: u128 = 1_000_000 * WAD;

pub struct Fixture {
    pub engine: Arc<PoolEngine>,
    pub risky: Arc<InMemoryToken>,
    pub stable: Arc<InMemoryToken>,
    pub clock: Arc<ManualClock>,
    pub events: Arc<RecordingSink>,
}

impl Fixture {
    pub fn new() -> Self {
        let risky = Arc::new(InMemoryToken::new("RISKY"));
        let stable = Arc::new(InMemoryToken::new("STABLE"));
        let clock = Arc::new(ManualClock::new(START));
        let events = Arc::new(RecordingSink::new());
        let engine = PoolEngine::new(
            Address::from_label("engine"),
            risky.clone(),
            stable.clone(),
            clock.clone(),
        )
        .with_event_sink(events.clone());

        Self {
            engine: Arc::new(engine),
            risky,
            stable,
            clock,
            events,
        }
    }

    /// Trader holding `FUNDING` of both tokens
    pub fn trader(&self, label: &str) -> Trader {
        let address = Address::from_label(label);
        assert!(self.risky.mint(address, FUNDING));
        assert!(self.stable.mint(address, FUNDING));
        Trader {
            address,
            risky: self.risky.clone(),
            stable: self.stable.clone(),
            shortfall: 0,
        }
    }

    /// Pool with strike 1000, σ = 1, one year to maturity, delta 0.5
    pub fn create_pool(&self, creator: &Trader) -> CreateOutcome {
        self.engine
            .create(creator, STRIKE, SIGMA, MATURITY, DELTA, LIQUIDITY, &[])
            .unwrap()
    }

    pub fn pool_id(&self) -> PoolId {
        PoolId::derive(self.engine.address(), MATURITY, SIGMA, STRIKE)
    }

    pub fn engine_balances(&self) -> (u128, u128) {
        self.balances(self.engine.address())
    }

    pub fn balances(&self, holder: Address) -> (u128, u128) {
        (self.risky.balance_of(holder), self.stable.balance_of(holder))
    }
}

/// Callback implementation that pays what it is asked, minus `shortfall`
pub struct Trader {
    pub address: Address,
    risky: Arc<InMemoryToken>,
    stable: Arc<InMemoryToken>,
    pub shortfall: u128,
}

impl Trader {
    pub fn underpaying(mut self, shortfall: u128) -> Self {
        self.shortfall = shortfall;
        self
    }

    /// Another handle on the same account that pays `shortfall` less
    pub fn short_by(&self, shortfall: u128) -> Trader {
        Trader {
            address: self.address,
            risky: self.risky.clone(),
            stable: self.stable.clone(),
            shortfall,
        }
    }

    fn pay(&self, engine: &PoolEngine, risky: u128, stable: u128) -> anyhow::Result<()> {
        let to = engine.address();
        let risky = risky.saturating_sub(self.shortfall);
        let stable = stable.saturating_sub(self.shortfall);
        ensure!(
            self.risky.transfer(self.address, to, risky),
            "risky transfer of {risky} failed"
        );
        ensure!(
            self.stable.transfer(self.address, to, stable),
            "stable transfer of {stable} failed"
        );
        Ok(())
    }
}

impl Account for Trader {
    fn address(&self) -> Address {
        self.address
    }
}

impl CreateCallback for Trader {
    fn create_callback(
        &self,
        engine: &PoolEngine,
        delta_risky: u128,
        delta_stable: u128,
        _data: &[u8],
    ) -> anyhow::Result<()> {
        self.pay(engine, delta_risky, delta_stable)
    }
}

impl DepositCallback for Trader {
    fn deposit_callback(
        &self,
        engine: &PoolEngine,
        delta_risky: u128,
        delta_stable: u128,
        _data: &[u8],
    ) -> anyhow::Result<()> {
        self.pay(engine, delta_risky, delta_stable)
    }
}

impl LiquidityCallback for Trader {
    fn allocate_callback(
        &self,
        engine: &PoolEngine,
        delta_risky: u128,
        delta_stable: u128,
        _data: &[u8],
    ) -> anyhow::Result<()> {
        self.pay(engine, delta_risky, delta_stable)
    }
}

impl SwapCallback for Trader {
    fn swap_callback(
        &self,
        engine: &PoolEngine,
        delta_risky: u128,
        delta_stable: u128,
        _data: &[u8],
    ) -> anyhow::Result<()> {
        self.pay(engine, delta_risky, delta_stable)
    }
}

impl BorrowCallback for Trader {
    fn borrow_callback(
        &self,
        engine: &PoolEngine,
        risky_deficit: u128,
        stable_deficit: u128,
        _data: &[u8],
    ) -> anyhow::Result<()> {
        self.pay(engine, risky_deficit, stable_deficit)
    }

    fn repay_callback(
        &self,
        engine: &PoolEngine,
        risky_deficit: u128,
        stable_deficit: u128,
        _data: &[u8],
    ) -> anyhow::Result<()> {
        self.pay(engine, risky_deficit, stable_deficit)
    }
}
