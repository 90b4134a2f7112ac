//! Token collaborator
//!
//! The engine only ever asks a token for balances and outgoing transfers.
//! The checkpoint hooks stand in for the host ledger's transaction
//! atomicity: every transfer after a checkpoint is undone by `rollback`.
//!
//! [`InMemoryToken`] gives an open checkpoint to the thread that opened it.
//! Mints, transfers and checkpoints from any other thread wait until that
//! thread has committed or rolled back, so a rollback only ever undoes the
//! owner's own writes and outside transfers cannot land mid-transaction.

use parking_lot::{Condvar, Mutex, MutexGuard};
use rmm_types::Address;
use std::collections::HashMap;
use std::thread::{self, ThreadId};

/// Opaque marker returned by [`Token::checkpoint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(pub usize);

pub trait Token: Send + Sync {
    fn symbol(&self) -> &str;

    fn balance_of(&self, holder: Address) -> u128;

    /// Move `amount` from `from` to `to`; `false` if `from` cannot cover it
    fn transfer(&self, from: Address, to: Address, amount: u128) -> bool;

    fn checkpoint(&self) -> Checkpoint;

    /// Keep every transfer since `checkpoint`
    fn commit(&self, checkpoint: Checkpoint);

    /// Undo every transfer since `checkpoint`
    fn rollback(&self, checkpoint: Checkpoint);
}

#[derive(Debug, Default)]
struct TokenState {
    balances: HashMap<Address, u128>,
    /// Prior balances, recorded while a checkpoint is open
    journal: Vec<(Address, u128)>,
    open_checkpoints: usize,
    /// Thread holding the open checkpoints
    owner: Option<ThreadId>,
}

impl TokenState {
    fn balance(&self, holder: &Address) -> u128 {
        self.balances.get(holder).copied().unwrap_or_default()
    }

    fn write(&mut self, holder: Address, balance: u128) {
        if self.open_checkpoints > 0 {
            let prior = self.balance(&holder);
            self.journal.push((holder, prior));
        }
        self.balances.insert(holder, balance);
    }

    /// `true` once the outermost checkpoint has closed
    fn close_checkpoint(&mut self) -> bool {
        self.open_checkpoints = self.open_checkpoints.saturating_sub(1);
        if self.open_checkpoints == 0 {
            self.journal.clear();
            self.owner = None;
            return true;
        }
        false
    }
}

/// Token ledger kept in memory
#[derive(Debug)]
pub struct InMemoryToken {
    symbol: String,
    state: Mutex<TokenState>,
    released: Condvar,
}

impl InMemoryToken {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            state: Mutex::new(TokenState::default()),
            released: Condvar::new(),
        }
    }

    /// Create `amount` new tokens for `to`; returns `false` on supply overflow
    pub fn mint(&self, to: Address, amount: u128) -> bool {
        let mut state = self.lock_for_write();
        match state.balance(&to).checked_add(amount) {
            Some(balance) => {
                state.write(to, balance);
                true
            }
            None => false,
        }
    }

    /// State lock, once no other thread holds an open checkpoint
    fn lock_for_write(&self) -> MutexGuard<'_, TokenState> {
        let current = thread::current().id();
        let mut state = self.state.lock();
        while matches!(state.owner, Some(owner) if owner != current) {
            self.released.wait(&mut state);
        }
        state
    }

    fn close_checkpoint(&self, mut state: MutexGuard<'_, TokenState>) {
        if state.close_checkpoint() {
            drop(state);
            self.released.notify_all();
        }
    }
}

impl Token for InMemoryToken {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn balance_of(&self, holder: Address) -> u128 {
        self.state.lock().balance(&holder)
    }

    fn transfer(&self, from: Address, to: Address, amount: u128) -> bool {
        let mut state = self.lock_for_write();
        let from_balance = state.balance(&from);
        if from_balance < amount {
            return false;
        }
        if from == to || amount == 0 {
            return true;
        }
        let to_balance = match state.balance(&to).checked_add(amount) {
            Some(balance) => balance,
            None => return false,
        };
        state.write(from, from_balance - amount);
        state.write(to, to_balance);
        true
    }

    fn checkpoint(&self) -> Checkpoint {
        let mut state = self.lock_for_write();
        state.owner = Some(thread::current().id());
        state.open_checkpoints += 1;
        Checkpoint(state.journal.len())
    }

    fn commit(&self, _checkpoint: Checkpoint) {
        let state = self.lock_for_write();
        self.close_checkpoint(state);
    }

    fn rollback(&self, checkpoint: Checkpoint) {
        let mut state = self.lock_for_write();
        while state.journal.len() > checkpoint.0 {
            if let Some((holder, prior)) = state.journal.pop() {
                state.balances.insert(holder, prior);
            }
        }
        self.close_checkpoint(state);
    }
}
