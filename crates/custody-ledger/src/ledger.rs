use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tracing::{debug, info};

use custody_events::{EventBus, LedgerEvent};
use custody_types::{AccountId, Amount, WithdrawalId};

use crate::clock::Call;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::policy::{Action, Roles, TimeLock};
use crate::registry::WithdrawalRegistry;
use crate::sink::ValueSink;
use crate::withdrawal::{Transition, Withdrawal};

/// Point-in-time view of the ledger, read under a single lock acquisition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub owner: AccountId,
    pub user: AccountId,
    pub balance: Amount,
    pub withdrawal_count: u64,
    pub pending_count: u64,
    pub pending_total: Amount,
    pub confirmation_delay: Duration,
}

struct LedgerState {
    balance: Amount,
    registry: WithdrawalRegistry,
    terminated: bool,
}

impl LedgerState {
    fn ensure_live(&self) -> Result<(), LedgerError> {
        if self.terminated {
            Err(LedgerError::Terminated)
        } else {
            Ok(())
        }
    }
}

/// Time-locked custody ledger.
///
/// Holds value for a `user` under the supervision of an `owner`. Funds leave
/// only through a withdrawal that the user requests, waits out the
/// confirmation delay on, and then confirms; either role may cancel it in
/// the meantime. The owner may terminate the ledger, sweeping the balance
/// back to itself.
///
/// All mutable state sits behind one `RwLock`. Every mutating operation
/// holds the write lock from its first check to its event publication, so
/// operations are serialized and never observed half-applied. Reads share
/// the read lock.
pub struct CustodyLedger<S: ValueSink> {
    roles: Roles,
    time_lock: TimeLock,
    sink: S,
    bus: EventBus,
    state: RwLock<LedgerState>,
}

impl<S: ValueSink> CustodyLedger<S> {
    /// Create a ledger. The caller of `creation` becomes the owner.
    pub fn new(
        creation: &Call,
        user: AccountId,
        config: LedgerConfig,
        sink: S,
    ) -> Result<Self, LedgerError> {
        config.validate()?;
        let bus = EventBus::new(config.bus_config())?;
        let roles = Roles::new(creation.caller.clone(), user);

        info!(
            owner = %roles.owner,
            user = %roles.user,
            delay_secs = config.confirmation_delay_secs,
            "custody ledger created"
        );

        Ok(Self {
            roles,
            time_lock: TimeLock::new(config.confirmation_delay()),
            sink,
            bus,
            state: RwLock::new(LedgerState {
                balance: 0,
                registry: WithdrawalRegistry::new(),
                terminated: false,
            }),
        })
    }

    // -----------------------------------------------------------------------
    // Mutating operations
    // -----------------------------------------------------------------------

    /// Accept `amount` from the caller. Open to anyone. Returns the new
    /// balance.
    pub fn deposit(&self, call: &Call, amount: Amount) -> Result<Amount, LedgerError> {
        self.apply_deposit(call, amount)
            .inspect_err(|err| rejected("deposit", call, err))
    }

    /// Record a withdrawal of `amount` to `to`. User only.
    ///
    /// The balance is not consulted: requests may exceed current holdings,
    /// coverage is checked at confirmation.
    pub fn request(
        &self,
        call: &Call,
        to: AccountId,
        amount: Amount,
    ) -> Result<WithdrawalId, LedgerError> {
        self.apply_request(call, to, amount)
            .inspect_err(|err| rejected("request", call, err))
    }

    /// Pay out a pending withdrawal once its time lock has elapsed. User only.
    pub fn confirm(&self, call: &Call, id: WithdrawalId) -> Result<Withdrawal, LedgerError> {
        self.apply_confirm(call, id)
            .inspect_err(|err| rejected("confirm", call, err))
    }

    /// Abort a pending withdrawal. Owner or user, at any time.
    pub fn cancel(&self, call: &Call, id: WithdrawalId) -> Result<Withdrawal, LedgerError> {
        self.apply_cancel(call, id)
            .inspect_err(|err| rejected("cancel", call, err))
    }

    /// Return the whole balance to the owner and shut the ledger down for
    /// good. Owner only. Returns the amount swept.
    pub fn terminate(&self, call: &Call) -> Result<Amount, LedgerError> {
        self.apply_terminate(call)
            .inspect_err(|err| rejected("terminate", call, err))
    }

    // -----------------------------------------------------------------------
    // Read operations
    // -----------------------------------------------------------------------

    pub fn owner(&self) -> Result<AccountId, LedgerError> {
        self.read_live()?;
        Ok(self.roles.owner.clone())
    }

    pub fn user(&self) -> Result<AccountId, LedgerError> {
        self.read_live()?;
        Ok(self.roles.user.clone())
    }

    pub fn balance(&self) -> Result<Amount, LedgerError> {
        Ok(self.read_live()?.balance)
    }

    pub fn withdrawal_count(&self) -> Result<u64, LedgerError> {
        Ok(self.read_live()?.registry.len())
    }

    pub fn get(&self, id: WithdrawalId) -> Result<Withdrawal, LedgerError> {
        self.read_live()?.registry.get(id).cloned()
    }

    /// Number of withdrawals still awaiting confirmation or cancellation.
    pub fn pending_count(&self) -> Result<u64, LedgerError> {
        Ok(self.read_live()?.registry.pending_count())
    }

    /// Sum of all pending amounts. May exceed the balance.
    pub fn pending_total(&self) -> Result<Amount, LedgerError> {
        Ok(self.read_live()?.registry.pending_total())
    }

    /// Pending withdrawals in id order.
    pub fn pending(&self) -> Result<Vec<Withdrawal>, LedgerError> {
        Ok(self.read_live()?.registry.pending().cloned().collect())
    }

    pub fn snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        let state = self.read_live()?;
        Ok(LedgerSnapshot {
            owner: self.roles.owner.clone(),
            user: self.roles.user.clone(),
            balance: state.balance,
            withdrawal_count: state.registry.len(),
            pending_count: state.registry.pending_count(),
            pending_total: state.registry.pending_total(),
            confirmation_delay: self.time_lock.delay(),
        })
    }

    pub fn confirmation_delay(&self) -> Duration {
        self.time_lock.delay()
    }

    /// Whether `terminate` has run. Unlike the other reads this keeps
    /// answering afterwards.
    pub fn is_terminated(&self) -> Result<bool, LedgerError> {
        Ok(self.read_state()?.terminated)
    }

    /// The event bus, for subscriptions and audit history. Stays readable
    /// after termination.
    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    /// The value transport payouts go through.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn apply_deposit(&self, call: &Call, amount: Amount) -> Result<Amount, LedgerError> {
        let mut state = self.write_state()?;
        state.ensure_live()?;
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let balance = state
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow {
                balance: state.balance,
                amount,
            })?;

        state.balance = balance;
        self.bus.publish(
            call.now,
            LedgerEvent::Deposit {
                from: call.caller.clone(),
                amount,
            },
        );

        info!(from = %call.caller, amount, balance, "deposit accepted");
        Ok(balance)
    }

    fn apply_request(
        &self,
        call: &Call,
        to: AccountId,
        amount: Amount,
    ) -> Result<WithdrawalId, LedgerError> {
        let mut state = self.write_state()?;
        state.ensure_live()?;
        self.roles.authorize(&call.caller, Action::Request)?;
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let id = state.registry.append(to.clone(), amount, call.now);
        self.bus.publish(
            call.now,
            LedgerEvent::WithdrawalRequest {
                id,
                to: to.clone(),
                amount,
            },
        );

        info!(
            %id,
            %to,
            amount,
            unlocks_at = %self.time_lock.unlocks_at(call.now),
            "withdrawal requested"
        );
        Ok(id)
    }

    fn apply_confirm(&self, call: &Call, id: WithdrawalId) -> Result<Withdrawal, LedgerError> {
        let mut state = self.write_state()?;
        state.ensure_live()?;
        self.roles.authorize(&call.caller, Action::Confirm)?;

        let withdrawal = state.registry.get(id)?;
        withdrawal.ensure_pending()?;
        self.time_lock.check(id, withdrawal.created_at, call.now)?;
        let (to, amount) = (withdrawal.to.clone(), withdrawal.amount);
        let balance = state
            .balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                requested: amount,
                available: state.balance,
            })?;

        // Nothing is committed until the payout lands.
        self.sink
            .transfer(&to, amount)
            .map_err(|e| LedgerError::TransferFailed {
                to: to.clone(),
                amount,
                reason: e.to_string(),
            })?;

        let withdrawal = state.registry.get_mut(id)?;
        withdrawal.transition(Transition::Confirm)?;
        let confirmed = withdrawal.clone();
        state.balance = balance;

        self.bus.publish(
            call.now,
            LedgerEvent::WithdrawalConfirm {
                id,
                to: to.clone(),
                amount,
            },
        );

        info!(%id, %to, amount, balance, "withdrawal confirmed");
        Ok(confirmed)
    }

    fn apply_cancel(&self, call: &Call, id: WithdrawalId) -> Result<Withdrawal, LedgerError> {
        let mut state = self.write_state()?;
        state.ensure_live()?;
        self.roles.authorize(&call.caller, Action::Cancel)?;

        let withdrawal = state.registry.get_mut(id)?;
        withdrawal.transition(Transition::Cancel)?;
        let cancelled = withdrawal.clone();

        self.bus.publish(
            call.now,
            LedgerEvent::WithdrawalCancel {
                id,
                to: cancelled.to.clone(),
                amount: cancelled.amount,
            },
        );

        info!(%id, by = %call.caller, amount = cancelled.amount, "withdrawal cancelled");
        Ok(cancelled)
    }

    fn apply_terminate(&self, call: &Call) -> Result<Amount, LedgerError> {
        let mut state = self.write_state()?;
        state.ensure_live()?;
        self.roles.authorize(&call.caller, Action::Terminate)?;

        let swept = state.balance;
        let owner = &self.roles.owner;
        if swept > 0 {
            self.sink
                .transfer(owner, swept)
                .map_err(|e| LedgerError::TransferFailed {
                    to: owner.clone(),
                    amount: swept,
                    reason: e.to_string(),
                })?;
        }

        state.balance = 0;
        state.terminated = true;
        let abandoned = state.registry.pending_count();

        self.bus.publish(
            call.now,
            LedgerEvent::Terminated {
                owner: owner.clone(),
                amount: swept,
            },
        );

        info!(%owner, swept, abandoned, "custody ledger terminated");
        Ok(swept)
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, LedgerState>, LedgerError> {
        self.state
            .read()
            .map_err(|_| LedgerError::LockPoisoned("read"))
    }

    fn read_live(&self) -> Result<RwLockReadGuard<'_, LedgerState>, LedgerError> {
        let state = self.read_state()?;
        state.ensure_live()?;
        Ok(state)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, LedgerState>, LedgerError> {
        self.state
            .write()
            .map_err(|_| LedgerError::LockPoisoned("write"))
    }
}

fn rejected(op: &'static str, call: &Call, err: &LedgerError) {
    debug!(op, caller = %call.caller, now = %call.now, %err, "call rejected");
}
