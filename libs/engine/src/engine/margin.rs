use super::PoolEngine;
use crate::callbacks::DepositCallback;
use crate::errors::EngineError;
use crate::events::EngineEvent;
use rmm_types::Address;
use tracing::debug;

impl PoolEngine {
    /// Fund `recipient`'s margin through `deposit_callback`
    pub fn deposit(
        &self,
        caller: &dyn DepositCallback,
        recipient: Address,
        delta_risky: u128,
        delta_stable: u128,
        data: &[u8],
    ) -> Result<(), EngineError> {
        self.execute("deposit", |tx| {
            if delta_risky == 0 && delta_stable == 0 {
                return Err(EngineError::ZeroDeltas);
            }

            tx.request(delta_risky, delta_stable, |engine| {
                caller.deposit_callback(engine, delta_risky, delta_stable, data)
            })?;
            tx.credit_margin(recipient, delta_risky, delta_stable)?;
            debug!(%recipient, delta_risky, delta_stable, "margin credited");

            tx.emit(EngineEvent::Deposited {
                caller: caller.address(),
                recipient,
                delta_risky,
                delta_stable,
            });
            Ok(())
        })
    }

    /// Debit `caller`'s margin and transfer the tokens to `recipient`
    pub fn withdraw(
        &self,
        caller: Address,
        recipient: Address,
        delta_risky: u128,
        delta_stable: u128,
    ) -> Result<(), EngineError> {
        self.execute("withdraw", |tx| {
            if delta_risky == 0 && delta_stable == 0 {
                return Err(EngineError::ZeroDeltas);
            }

            tx.debit_margin(caller, delta_risky, delta_stable)?;
            tx.pay(recipient, delta_risky, delta_stable)?;
            debug!(%caller, %recipient, delta_risky, delta_stable, "margin withdrawn");

            tx.emit(EngineEvent::Withdrawn {
                caller,
                recipient,
                delta_risky,
                delta_stable,
            });
            Ok(())
        })
    }
}
