use custody_events::EventError;
use custody_types::{AccountId, Amount, WithdrawalId};

use crate::policy::Action;
use crate::withdrawal::WithdrawalStatus;

/// Errors produced by ledger operations.
///
/// Every variant is a rejection: the ledger is left exactly as it was before
/// the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("{caller} is not permitted to {action}")]
    Unauthorized { caller: AccountId, action: Action },

    #[error("withdrawal {0} not found")]
    NotFound(WithdrawalId),

    #[error("withdrawal {id} is {status}, expected Pending")]
    InvalidState {
        id: WithdrawalId,
        status: WithdrawalStatus,
    },

    #[error("withdrawal {id} is time-locked for another {remaining_secs}s")]
    TimeLockNotElapsed { id: WithdrawalId, remaining_secs: u64 },

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Amount, available: Amount },

    #[error("ledger has been terminated")]
    Terminated,

    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("deposit of {amount} would overflow balance {balance}")]
    BalanceOverflow { balance: Amount, amount: Amount },

    #[error("transfer of {amount} to {to} failed: {reason}")]
    TransferFailed {
        to: AccountId,
        amount: Amount,
        reason: String,
    },

    #[error("ledger {0} lock poisoned")]
    LockPoisoned(&'static str),

    #[error("configuration error: {0}")]
    Config(String),

    /// The event bus could not be built from the configuration. Only
    /// construction reports this; publication cannot fail.
    #[error("event error: {0}")]
    Events(#[from] EventError),
}
