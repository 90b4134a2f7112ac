//! Notifications of committed operations
//!
//! Events are buffered inside a transaction and handed to the sink only after
//! commit, so an aborted operation never publishes anything.

use crate::ledger::Reserve;
use parking_lot::Mutex;
use rmm_types::{Address, FixedPoint64x64, PoolId};
use serde::Serialize;
use tracing::info;

/// Pool reserves and invariant as left by the operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolState {
    pub reserve_risky: u128,
    pub reserve_stable: u128,
    pub liquidity: u128,
    pub invariant: FixedPoint64x64,
}

impl PoolState {
    pub fn new(reserve: &Reserve, invariant: FixedPoint64x64) -> Self {
        Self {
            reserve_risky: reserve.reserve_risky,
            reserve_stable: reserve.reserve_stable,
            liquidity: reserve.liquidity,
            invariant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EngineEvent {
    Created {
        caller: Address,
        pool_id: PoolId,
        strike: u128,
        sigma: u32,
        maturity: u64,
        delta_risky: u128,
        delta_stable: u128,
    },
    Deposited {
        caller: Address,
        recipient: Address,
        delta_risky: u128,
        delta_stable: u128,
    },
    Withdrawn {
        caller: Address,
        recipient: Address,
        delta_risky: u128,
        delta_stable: u128,
    },
    Allocated {
        caller: Address,
        recipient: Address,
        pool_id: PoolId,
        delta_risky: u128,
        delta_stable: u128,
        delta_liquidity: u128,
        from_margin: bool,
        state: PoolState,
    },
    Removed {
        caller: Address,
        pool_id: PoolId,
        delta_risky: u128,
        delta_stable: u128,
        delta_liquidity: u128,
        state: PoolState,
    },
    Swapped {
        caller: Address,
        pool_id: PoolId,
        risky_for_stable: bool,
        delta_in: u128,
        delta_out: u128,
        state: PoolState,
    },
    Supplied {
        caller: Address,
        pool_id: PoolId,
        delta_liquidity: u128,
    },
    Claimed {
        caller: Address,
        pool_id: PoolId,
        delta_liquidity: u128,
    },
    Borrowed {
        caller: Address,
        pool_id: PoolId,
        delta_liquidity: u128,
        risky_collateral: u128,
        stable_collateral: u128,
        state: PoolState,
    },
    Repaid {
        caller: Address,
        owner: Address,
        pool_id: PoolId,
        delta_liquidity: u128,
        risky_collateral: u128,
        stable_collateral: u128,
        state: PoolState,
    },
}

impl EngineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Deposited { .. } => "deposited",
            Self::Withdrawn { .. } => "withdrawn",
            Self::Allocated { .. } => "allocated",
            Self::Removed { .. } => "removed",
            Self::Swapped { .. } => "swapped",
            Self::Supplied { .. } => "supplied",
            Self::Claimed { .. } => "claimed",
            Self::Borrowed { .. } => "borrowed",
            Self::Repaid { .. } => "repaid",
        }
    }
}

pub trait EventSink: Send + Sync {
    fn publish(&self, event: &EngineEvent);
}

/// Logs every event at `info`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: &EngineEvent) {
        info!(event = event.name(), details = ?event, "engine event");
    }
}

/// Keeps events in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().clone()
    }

    /// Drain recorded events
    pub fn take(&self) -> Vec<EngineEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: &EngineEvent) {
        self.events.lock().push(event.clone());
    }
}
