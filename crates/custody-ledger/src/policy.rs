use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use custody_types::{AccountId, Timestamp, WithdrawalId};

use crate::error::LedgerError;

// ---------------------------------------------------------------------------
// Roles and actions
// ---------------------------------------------------------------------------

/// A privileged role on the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Administrative party. Supervises, cancels, terminates.
    Owner,
    /// Beneficiary-controller. Requests and confirms withdrawals.
    User,
}

/// A restricted ledger operation. Deposits are open to anyone and are not
/// listed here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Request,
    Confirm,
    Cancel,
    Terminate,
}

impl Action {
    /// Roles allowed to perform this action. Holding any one suffices.
    pub fn permitted_roles(&self) -> &'static [Role] {
        match self {
            Self::Request | Self::Confirm => &[Role::User],
            Self::Cancel => &[Role::Owner, Role::User],
            Self::Terminate => &[Role::Owner],
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Request => "request a withdrawal",
            Self::Confirm => "confirm a withdrawal",
            Self::Cancel => "cancel a withdrawal",
            Self::Terminate => "terminate the ledger",
        };
        write!(f, "{s}")
    }
}

/// The two identities fixed at ledger creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    pub owner: AccountId,
    pub user: AccountId,
}

impl Roles {
    pub fn new(owner: AccountId, user: AccountId) -> Self {
        Self { owner, user }
    }

    pub fn holds(&self, who: &AccountId, role: Role) -> bool {
        match role {
            Role::Owner => *who == self.owner,
            Role::User => *who == self.user,
        }
    }

    /// Reject `caller` unless it holds a role permitted for `action`.
    pub fn authorize(&self, caller: &AccountId, action: Action) -> Result<(), LedgerError> {
        if action
            .permitted_roles()
            .iter()
            .any(|role| self.holds(caller, *role))
        {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized {
                caller: caller.clone(),
                action,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Time lock
// ---------------------------------------------------------------------------

/// Mandatory cooling-off period between a request and its confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeLock {
    delay: Duration,
}

impl TimeLock {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Earliest time a withdrawal created at `created_at` may be confirmed.
    pub fn unlocks_at(&self, created_at: Timestamp) -> Timestamp {
        created_at.saturating_add(self.delay)
    }

    /// Pass once at least `delay` has elapsed since `created_at`.
    pub fn check(
        &self,
        id: WithdrawalId,
        created_at: Timestamp,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        let elapsed = now.elapsed_since(created_at);
        if elapsed >= self.delay {
            Ok(())
        } else {
            Err(LedgerError::TimeLockNotElapsed {
                id,
                remaining_secs: (self.delay - elapsed).as_secs(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> Roles {
        Roles::new(AccountId::named("owner"), AccountId::named("user"))
    }

    #[test]
    fn request_and_confirm_are_user_only() {
        let roles = roles();
        for action in [Action::Request, Action::Confirm] {
            roles.authorize(&roles.user, action).unwrap();
            assert!(roles.authorize(&roles.owner, action).is_err());
            assert!(roles
                .authorize(&AccountId::named("alpha"), action)
                .is_err());
        }
    }

    #[test]
    fn cancel_accepts_either_role() {
        let roles = roles();
        roles.authorize(&roles.owner, Action::Cancel).unwrap();
        roles.authorize(&roles.user, Action::Cancel).unwrap();
        assert!(roles
            .authorize(&AccountId::named("alpha"), Action::Cancel)
            .is_err());
    }

    #[test]
    fn terminate_is_owner_only() {
        let roles = roles();
        roles.authorize(&roles.owner, Action::Terminate).unwrap();
        assert_eq!(
            roles.authorize(&roles.user, Action::Terminate),
            Err(LedgerError::Unauthorized {
                caller: roles.user.clone(),
                action: Action::Terminate,
            })
        );
    }

    #[test]
    fn same_identity_may_hold_both_roles() {
        let both = AccountId::named("solo");
        let roles = Roles::new(both.clone(), both.clone());
        for action in [
            Action::Request,
            Action::Confirm,
            Action::Cancel,
            Action::Terminate,
        ] {
            roles.authorize(&both, action).unwrap();
        }
    }

    #[test]
    fn time_lock_boundary_is_inclusive() {
        let lock = TimeLock::new(Duration::from_secs(60));
        let created = Timestamp::from_secs(1_000);
        let id = WithdrawalId(0);

        assert_eq!(
            lock.check(id, created, Timestamp::from_secs(1_059)),
            Err(LedgerError::TimeLockNotElapsed {
                id,
                remaining_secs: 1
            })
        );
        lock.check(id, created, Timestamp::from_secs(1_060)).unwrap();
        assert_eq!(lock.unlocks_at(created), Timestamp::from_secs(1_060));
    }

    #[test]
    fn time_lock_rejects_clock_behind_creation() {
        let lock = TimeLock::new(Duration::from_secs(60));
        let err = lock
            .check(WithdrawalId(2), Timestamp::from_secs(500), Timestamp::from_secs(10))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::TimeLockNotElapsed {
                id: WithdrawalId(2),
                remaining_secs: 60
            }
        );
    }

    #[test]
    fn action_display_is_readable() {
        assert_eq!(Action::Terminate.to_string(), "terminate the ledger");
    }
}
