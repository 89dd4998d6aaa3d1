use custody_types::{AccountId, Amount, Timestamp, WithdrawalId};

use crate::error::LedgerError;
use crate::withdrawal::Withdrawal;

/// Append-only withdrawal history, indexed by [`WithdrawalId`].
///
/// Records are never removed or reordered, so `withdrawals[i].id == i` for
/// every `i`.
#[derive(Clone, Debug, Default)]
pub struct WithdrawalRegistry {
    withdrawals: Vec<Withdrawal>,
}

impl WithdrawalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new Pending withdrawal and return its id.
    pub fn append(&mut self, to: AccountId, amount: Amount, created_at: Timestamp) -> WithdrawalId {
        let id = WithdrawalId(self.withdrawals.len() as u64);
        self.withdrawals
            .push(Withdrawal::new(id, to, amount, created_at));
        id
    }

    pub fn get(&self, id: WithdrawalId) -> Result<&Withdrawal, LedgerError> {
        usize::try_from(id.index())
            .ok()
            .and_then(|index| self.withdrawals.get(index))
            .ok_or(LedgerError::NotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: WithdrawalId) -> Result<&mut Withdrawal, LedgerError> {
        usize::try_from(id.index())
            .ok()
            .and_then(|index| self.withdrawals.get_mut(index))
            .ok_or(LedgerError::NotFound(id))
    }

    pub fn len(&self) -> u64 {
        self.withdrawals.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.withdrawals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Withdrawal> {
        self.withdrawals.iter()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Withdrawal> {
        self.withdrawals.iter().filter(|w| w.is_pending())
    }

    pub fn pending_count(&self) -> u64 {
        self.pending().count() as u64
    }

    /// Sum of all Pending amounts. May exceed the ledger balance.
    pub fn pending_total(&self) -> Amount {
        self.pending()
            .fold(0, |sum: Amount, w| sum.saturating_add(w.amount))
    }
}
