//! Time-locked custody ledger.
//!
//! The ledger holds deposited value on behalf of a beneficiary (the *user*)
//! under the supervision of an administrative *owner*, and releases funds
//! only through a slow, auditable withdrawal workflow:
//!
//! 1. anyone may [`deposit`](CustodyLedger::deposit);
//! 2. the user [`request`](CustodyLedger::request)s a withdrawal;
//! 3. after the configured cooling-off period the user
//!    [`confirm`](CustodyLedger::confirm)s it and the funds move;
//! 4. until then, owner or user may [`cancel`](CustodyLedger::cancel) it;
//! 5. the owner may [`terminate`](CustodyLedger::terminate) the ledger,
//!    sweeping the balance back to itself.
//!
//! Callers identify themselves and supply the current time through a
//! [`Call`]; outbound payouts go through a host-provided [`ValueSink`].
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use custody_ledger::{Call, CustodyLedger, InMemoryAccounts, LedgerConfig};
//! use custody_types::{AccountId, Timestamp};
//!
//! let owner = AccountId::named("owner");
//! let user = AccountId::named("user");
//! let payee = AccountId::named("payee");
//! let t0 = Timestamp::from_secs(1_000);
//!
//! let ledger = CustodyLedger::new(
//!     &Call::new(owner, t0),
//!     user.clone(),
//!     LedgerConfig::with_delay(Duration::from_secs(60)),
//!     InMemoryAccounts::new(),
//! )
//! .unwrap();
//!
//! ledger.deposit(&Call::new(AccountId::named("alpha"), t0), 10).unwrap();
//! let id = ledger.request(&Call::new(user.clone(), t0), payee.clone(), 4).unwrap();
//!
//! let later = t0.saturating_add(Duration::from_secs(60));
//! ledger.confirm(&Call::new(user, later), id).unwrap();
//! assert_eq!(ledger.balance().unwrap(), 6);
//! assert_eq!(ledger.sink().credited(&payee), 4);
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod policy;
pub mod registry;
pub mod sink;
pub mod withdrawal;

pub use clock::{Call, Clock, ManualClock, SystemClock};
pub use config::LedgerConfig;
pub use error::LedgerError;
pub use ledger::{CustodyLedger, LedgerSnapshot};
pub use policy::{Action, Role, Roles, TimeLock};
pub use registry::WithdrawalRegistry;
pub use sink::{InMemoryAccounts, TransferError, ValueSink};
pub use withdrawal::{Transition, Withdrawal, WithdrawalStatus};
