use std::fmt;

use serde::{Deserialize, Serialize};

use custody_types::{AccountId, Amount, Timestamp, WithdrawalId};

use crate::error::LedgerError;

/// Lifecycle state of a withdrawal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    Pending,
    Confirmed,
    Cancelled,
}

/// A state change requested on a withdrawal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Confirm,
    Cancel,
}

impl WithdrawalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// The state reached by applying `transition`, or `None` if illegal.
    ///
    /// Only `Pending` has outgoing edges; terminal states are final.
    pub fn apply(self, transition: Transition) -> Option<Self> {
        match (self, transition) {
            (Self::Pending, Transition::Confirm) => Some(Self::Confirmed),
            (Self::Pending, Transition::Cancel) => Some(Self::Cancelled),
            (Self::Confirmed | Self::Cancelled, _) => None,
        }
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Cancelled => "Cancelled",
        };
        write!(f, "{s}")
    }
}

/// One withdrawal record. Everything but `status` is immutable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: WithdrawalId,
    pub to: AccountId,
    pub amount: Amount,
    pub created_at: Timestamp,
    status: WithdrawalStatus,
}

impl Withdrawal {
    pub(crate) fn new(id: WithdrawalId, to: AccountId, amount: Amount, created_at: Timestamp) -> Self {
        Self {
            id,
            to,
            amount,
            created_at,
            status: WithdrawalStatus::Pending,
        }
    }

    pub fn status(&self) -> WithdrawalStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == WithdrawalStatus::Pending
    }

    pub(crate) fn ensure_pending(&self) -> Result<(), LedgerError> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(LedgerError::InvalidState {
                id: self.id,
                status: self.status,
            })
        }
    }

    /// Apply `transition`, rejecting it if the current state forbids it.
    pub(crate) fn transition(&mut self, transition: Transition) -> Result<(), LedgerError> {
        let next = self
            .status
            .apply(transition)
            .ok_or(LedgerError::InvalidState {
                id: self.id,
                status: self.status,
            })?;
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Withdrawal {
        Withdrawal::new(
            WithdrawalId(0),
            AccountId::named("beta"),
            1,
            Timestamp::from_secs(10),
        )
    }

    #[test]
    fn new_withdrawals_are_pending() {
        let w = pending();
        assert_eq!(w.status(), WithdrawalStatus::Pending);
        assert!(!w.status().is_terminal());
        w.ensure_pending().unwrap();
    }

    #[test]
    fn pending_moves_to_either_terminal_state() {
        let mut confirmed = pending();
        confirmed.transition(Transition::Confirm).unwrap();
        assert_eq!(confirmed.status(), WithdrawalStatus::Confirmed);

        let mut cancelled = pending();
        cancelled.transition(Transition::Cancel).unwrap();
        assert_eq!(cancelled.status(), WithdrawalStatus::Cancelled);
    }

    #[test]
    fn terminal_states_reject_every_transition() {
        for first in [Transition::Confirm, Transition::Cancel] {
            for second in [Transition::Confirm, Transition::Cancel] {
                let mut w = pending();
                w.transition(first).unwrap();
                let before = w.status();
                let err = w.transition(second).unwrap_err();
                assert_eq!(
                    err,
                    LedgerError::InvalidState {
                        id: WithdrawalId(0),
                        status: before
                    }
                );
                assert_eq!(w.status(), before);
                assert!(w.ensure_pending().is_err());
            }
        }
    }

    #[test]
    fn serde_json_roundtrip_keeps_status() {
        let mut w = pending();
        w.transition(Transition::Cancel).unwrap();
        let json = serde_json::to_string(&w).unwrap();
        let parsed: Withdrawal = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, w);
        assert_eq!(parsed.status(), WithdrawalStatus::Cancelled);
    }
}
