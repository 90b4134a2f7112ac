//! Simulated account that settles engine callbacks from its own balances

use anyhow::ensure;
use rmm_engine::{
    Account, BorrowCallback, CreateCallback, DepositCallback, InMemoryToken, LiquidityCallback,
    PoolEngine, SwapCallback, Token,
};
use rmm_types::Address;
use std::sync::Arc;

pub struct Wallet {
    address: Address,
    risky: Arc<InMemoryToken>,
    stable: Arc<InMemoryToken>,
}

impl Wallet {
    /// Wallet for `label` holding `amount` of both tokens
    pub fn funded(
        label: &str,
        risky: &Arc<InMemoryToken>,
        stable: &Arc<InMemoryToken>,
        amount: u128,
    ) -> Self {
        let address = Address::from_label(label);
        risky.mint(address, amount);
        stable.mint(address, amount);
        Self {
            address,
            risky: Arc::clone(risky),
            stable: Arc::clone(stable),
        }
    }

    fn settle(&self, engine: &PoolEngine, risky: u128, stable: u128) -> anyhow::Result<()> {
        let to = engine.address();
        ensure!(
            self.risky.transfer(self.address, to, risky),
            "{} cannot pay {risky} risky",
            self.address
        );
        ensure!(
            self.stable.transfer(self.address, to, stable),
            "{} cannot pay {stable} stable",
            self.address
        );
        Ok(())
    }
}

impl Account for Wallet {
    fn address(&self) -> Address {
        self.address
    }
}

impl CreateCallback for Wallet {
    fn create_callback(
        &self,
        engine: &PoolEngine,
        risky: u128,
        stable: u128,
        _data: &[u8],
    ) -> anyhow::Result<()> {
        self.settle(engine, risky, stable)
    }
}

impl DepositCallback for Wallet {
    fn deposit_callback(
        &self,
        engine: &PoolEngine,
        risky: u128,
        stable: u128,
        _data: &[u8],
    ) -> anyhow::Result<()> {
        self.settle(engine, risky, stable)
    }
}

impl LiquidityCallback for Wallet {
    fn allocate_callback(
        &self,
        engine: &PoolEngine,
        risky: u128,
        stable: u128,
        _data: &[u8],
    ) -> anyhow::Result<()> {
        self.settle(engine, risky, stable)
    }
}

impl SwapCallback for Wallet {
    fn swap_callback(
        &self,
        engine: &PoolEngine,
        risky: u128,
        stable: u128,
        _data: &[u8],
    ) -> anyhow::Result<()> {
        self.settle(engine, risky, stable)
    }
}

impl BorrowCallback for Wallet {
    fn borrow_callback(
        &self,
        engine: &PoolEngine,
        risky: u128,
        stable: u128,
        _data: &[u8],
    ) -> anyhow::Result<()> {
        self.settle(engine, risky, stable)
    }

    fn repay_callback(
        &self,
        engine: &PoolEngine,
        risky: u128,
        stable: u128,
        _data: &[u8],
    ) -> anyhow::Result<()> {
        self.settle(engine, risky, stable)
    }
}
