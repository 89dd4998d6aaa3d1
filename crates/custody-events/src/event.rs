use serde::{Deserialize, Serialize};

use custody_types::{AccountId, Amount, Timestamp, WithdrawalId};

/// Content-addressed identifier of a published event.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    /// BLAKE3 hash of the event record.
    pub hash: [u8; 32],
}

impl EventId {
    /// Create an `EventId` from a raw hash.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self { hash }
    }

    /// Short hex representation (first 8 hex chars).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.hash[..4])
    }

    /// Full hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "evt:{}", self.short_hex())
    }
}

/// Classification of ledger events, used for filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Deposit,
    WithdrawalRequest,
    WithdrawalConfirm,
    WithdrawalCancel,
    Terminated,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Deposit => "Deposit",
            Self::WithdrawalRequest => "WithdrawalRequest",
            Self::WithdrawalConfirm => "WithdrawalConfirm",
            Self::WithdrawalCancel => "WithdrawalCancel",
            Self::Terminated => "Terminated",
        };
        write!(f, "{s}")
    }
}

/// A notification emitted by exactly one successful ledger operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// Value was deposited by `from`.
    Deposit { from: AccountId, amount: Amount },
    /// The user asked for `amount` to be paid to `to`.
    WithdrawalRequest {
        id: WithdrawalId,
        to: AccountId,
        amount: Amount,
    },
    /// A pending withdrawal was paid out.
    WithdrawalConfirm {
        id: WithdrawalId,
        to: AccountId,
        amount: Amount,
    },
    /// A pending withdrawal was aborted; funds stay in custody.
    WithdrawalCancel {
        id: WithdrawalId,
        to: AccountId,
        amount: Amount,
    },
    /// The ledger was shut down and `amount` returned to `owner`.
    Terminated { owner: AccountId, amount: Amount },
}

impl LedgerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Deposit { .. } => EventKind::Deposit,
            Self::WithdrawalRequest { .. } => EventKind::WithdrawalRequest,
            Self::WithdrawalConfirm { .. } => EventKind::WithdrawalConfirm,
            Self::WithdrawalCancel { .. } => EventKind::WithdrawalCancel,
            Self::Terminated { .. } => EventKind::Terminated,
        }
    }

    /// The withdrawal this event concerns, if any.
    pub fn withdrawal_id(&self) -> Option<WithdrawalId> {
        match self {
            Self::WithdrawalRequest { id, .. }
            | Self::WithdrawalConfirm { id, .. }
            | Self::WithdrawalCancel { id, .. } => Some(*id),
            Self::Deposit { .. } | Self::Terminated { .. } => None,
        }
    }

    /// Amount of value the event reports.
    pub fn amount(&self) -> Amount {
        match self {
            Self::Deposit { amount, .. }
            | Self::WithdrawalRequest { amount, .. }
            | Self::WithdrawalConfirm { amount, .. }
            | Self::WithdrawalCancel { amount, .. }
            | Self::Terminated { amount, .. } => *amount,
        }
    }
}

/// A published event, as seen by subscribers and stored in history.
///
/// The integrity hash covers the sequence number, the timestamp of the
/// triggering call, and the bincode encoding of the event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    /// Position in the bus's publication order, starting at 1.
    pub seq: u64,
    /// Logical time of the call that produced the event.
    pub timestamp: Timestamp,
    pub event: LedgerEvent,
    pub integrity_hash: [u8; 32],
}

impl EventRecord {
    /// Build a record, computing its integrity hash and id.
    pub fn new(seq: u64, timestamp: Timestamp, event: LedgerEvent) -> Self {
        let integrity_hash = Self::compute_integrity(seq, &timestamp, &event);
        Self {
            id: EventId::from_hash(integrity_hash),
            seq,
            timestamp,
            event,
            integrity_hash,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }

    /// Verify the integrity hash matches the record's content.
    pub fn verify_integrity(&self) -> bool {
        Self::compute_integrity(self.seq, &self.timestamp, &self.event) == self.integrity_hash
    }

    fn compute_integrity(seq: u64, timestamp: &Timestamp, event: &LedgerEvent) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"custody-event-v1:");
        hasher.update(&seq.to_le_bytes());
        hasher.update(&timestamp.as_secs().to_le_bytes());
        if let Ok(event_bytes) = bincode::serialize(event) {
            hasher.update(&event_bytes);
        }
        *hasher.finalize().as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: u64) -> LedgerEvent {
        LedgerEvent::WithdrawalRequest {
            id: WithdrawalId(id),
            to: AccountId::named("beta"),
            amount: 1,
        }
    }

    #[test]
    fn record_integrity_verifies() {
        let record = EventRecord::new(1, Timestamp::from_secs(10), request(0));
        assert!(record.verify_integrity());
    }

    #[test]
    fn tampering_breaks_integrity() {
        let mut record = EventRecord::new(1, Timestamp::from_secs(10), request(0));
        record.event = LedgerEvent::WithdrawalRequest {
            id: WithdrawalId(0),
            to: AccountId::named("mallory"),
            amount: 1_000,
        };
        assert!(!record.verify_integrity());
    }

    #[test]
    fn seq_is_part_of_the_hash() {
        let a = EventRecord::new(1, Timestamp::from_secs(10), request(0));
        let b = EventRecord::new(2, Timestamp::from_secs(10), request(0));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn kind_and_withdrawal_id_accessors() {
        let deposit = LedgerEvent::Deposit {
            from: AccountId::named("alpha"),
            amount: 10,
        };
        assert_eq!(deposit.kind(), EventKind::Deposit);
        assert_eq!(deposit.withdrawal_id(), None);
        assert_eq!(deposit.amount(), 10);

        assert_eq!(request(3).kind(), EventKind::WithdrawalRequest);
        assert_eq!(request(3).withdrawal_id(), Some(WithdrawalId(3)));
    }

    #[test]
    fn event_id_display() {
        let id = EventId::from_hash([0xab; 32]);
        assert_eq!(format!("{id}"), "evt:abababab");
    }

    #[test]
    fn bincode_roundtrip_keeps_integrity() {
        let record = EventRecord::new(
            4,
            Timestamp::from_secs(99),
            LedgerEvent::Terminated {
                owner: AccountId::named("owner"),
                amount: 9,
            },
        );
        let bytes = bincode::serialize(&record).unwrap();
        let decoded: EventRecord = bincode::deserialize(&bytes).unwrap();
        assert_eq!(record, decoded);
        assert!(decoded.verify_integrity());
    }

    #[test]
    fn json_shape_names_the_variant() {
        let json = serde_json::to_value(request(0)).unwrap();
        assert!(json.get("WithdrawalRequest").is_some());
    }
}
