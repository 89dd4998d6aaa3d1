//! Foundation types for the custody ledger.
//!
//! Every other custody crate depends on `custody-types`.
//!
//! # Key Types
//!
//! - [`AccountId`] — Identity of a party (owner, user, depositor, payee)
//! - [`WithdrawalId`] — Dense, zero-based position in the withdrawal registry
//! - [`Timestamp`] — Logical time, in whole seconds, supplied by the host
//! - [`Amount`] — Value in the smallest indivisible unit

pub mod error;
pub mod identity;
pub mod temporal;
pub mod withdrawal;

pub use error::TypeError;
pub use identity::{AccountId, IdentityMaterial};
pub use temporal::Timestamp;
pub use withdrawal::WithdrawalId;

/// Value held or moved by the ledger, in the smallest unit.
pub type Amount = u128;
