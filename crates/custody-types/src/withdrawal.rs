use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Stable identifier of a withdrawal: its position in the registry.
///
/// Ids are dense and zero-based. They are assigned in creation order and are
/// never reused, so an id doubles as an index into the withdrawal history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WithdrawalId(pub u64);

impl WithdrawalId {
    /// The raw sequence position.
    pub fn index(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WithdrawalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wd#{}", self.0)
    }
}

impl FromStr for WithdrawalId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("wd#").unwrap_or(s);
        digits
            .parse::<u64>()
            .map(Self)
            .map_err(|_| TypeError::InvalidWithdrawalId(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse() {
        let id = WithdrawalId(7);
        assert_eq!(id.to_string(), "wd#7");
        assert_eq!("wd#7".parse::<WithdrawalId>().unwrap(), id);
        assert_eq!("7".parse::<WithdrawalId>().unwrap(), id);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(
            "wd#x".parse::<WithdrawalId>(),
            Err(TypeError::InvalidWithdrawalId("wd#x".into()))
        );
    }

    #[test]
    fn ordering_follows_index() {
        assert!(WithdrawalId(0) < WithdrawalId(1));
    }
}
