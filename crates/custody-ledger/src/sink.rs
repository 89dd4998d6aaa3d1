use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use custody_types::{AccountId, Amount};

/// Why a payout could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("destination {0} refuses incoming funds")]
    Refused(AccountId),

    #[error("value transport unavailable: {0}")]
    Unavailable(String),
}

/// Outbound value transport supplied by the host.
///
/// The ledger calls `transfer` while it holds its write lock, after every
/// precondition has passed and before it commits. An `Err` makes the ledger
/// abandon the operation with no state change. Implementations must not call
/// back into the ledger.
pub trait ValueSink: Send + Sync {
    fn transfer(&self, to: &AccountId, amount: Amount) -> Result<(), TransferError>;
}

impl<T: ValueSink + ?Sized> ValueSink for Arc<T> {
    fn transfer(&self, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        (**self).transfer(to, amount)
    }
}

/// In-process accounts that record every payout.
///
/// Useful for tests, simulations and embedding. Accounts can be marked as
/// refusing funds to exercise the rollback path of confirmation and
/// termination.
#[derive(Default)]
pub struct InMemoryAccounts {
    inner: RwLock<AccountsState>,
}

#[derive(Default)]
struct AccountsState {
    credited: HashMap<AccountId, Amount>,
    refusing: HashSet<AccountId>,
}

impl InMemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total received by `account` so far.
    pub fn credited(&self, account: &AccountId) -> Amount {
        self.read().credited.get(account).copied().unwrap_or(0)
    }

    /// Sum of all payouts delivered.
    pub fn total_paid_out(&self) -> Amount {
        self.read()
            .credited
            .values()
            .fold(0, |sum: Amount, v| sum.saturating_add(*v))
    }

    /// Make `account` reject all further transfers.
    pub fn refuse(&self, account: AccountId) {
        self.write().refusing.insert(account);
    }

    /// Undo a previous [`Self::refuse`].
    pub fn accept(&self, account: &AccountId) {
        self.write().refusing.remove(account);
    }

    // A panic while the lock is held cannot leave the maps half-updated, so
    // a poisoned guard is taken over rather than reported.
    fn read(&self) -> RwLockReadGuard<'_, AccountsState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AccountsState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ValueSink for InMemoryAccounts {
    fn transfer(&self, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        let mut state = self.write();

        if state.refusing.contains(to) {
            return Err(TransferError::Refused(to.clone()));
        }

        let balance = state.credited.entry(to.clone()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::Unavailable(format!("credit overflow for {to}")))?;
        Ok(())
    }
}
