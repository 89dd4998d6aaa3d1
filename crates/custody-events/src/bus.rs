use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::broadcast;
use tracing::debug;

use custody_types::{Timestamp, WithdrawalId};

use crate::error::{EventError, Result};
use crate::event::{EventKind, EventRecord, LedgerEvent};

/// Filter for subscribing to a subset of ledger events.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    /// If set, only events of these kinds are delivered.
    pub kinds: Option<Vec<EventKind>>,
    /// If set, only events about this withdrawal are delivered.
    pub withdrawal: Option<WithdrawalId>,
    /// If set, only events with a sequence number above this are delivered.
    pub after_seq: Option<u64>,
}

impl EventFilter {
    /// Match only the given kinds.
    pub fn kinds(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            kinds: Some(kinds.into_iter().collect()),
            ..Default::default()
        }
    }

    /// Match only the lifecycle of one withdrawal.
    pub fn withdrawal(id: WithdrawalId) -> Self {
        Self {
            withdrawal: Some(id),
            ..Default::default()
        }
    }

    /// Returns `true` if the given record matches this filter.
    pub fn matches(&self, record: &EventRecord) -> bool {
        if let Some(ref kinds) = self.kinds {
            if !kinds.contains(&record.kind()) {
                return false;
            }
        }
        if let Some(id) = self.withdrawal {
            if record.event.withdrawal_id() != Some(id) {
                return false;
            }
        }
        if let Some(after) = self.after_seq {
            if record.seq <= after {
                return false;
            }
        }
        true
    }
}

/// A broadcast channel receiver for ledger events.
pub type EventStream = broadcast::Receiver<EventRecord>;

struct Subscriber {
    filter: EventFilter,
    sender: broadcast::Sender<EventRecord>,
}

/// Fan-out router that delivers records to matching subscribers.
struct EventRouter {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl EventRouter {
    fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    fn subscribe(&self, filter: EventFilter, capacity: usize) -> EventStream {
        let (tx, rx) = broadcast::channel(capacity);
        write_recovering(&self.subscribers).push(Subscriber { filter, sender: tx });
        rx
    }

    /// Route a record to all matching subscribers.
    /// Subscribers whose receivers were all dropped are pruned.
    fn route(&self, record: &EventRecord) {
        write_recovering(&self.subscribers).retain(|sub| {
            if sub.filter.matches(record) {
                sub.sender.send(record.clone()).is_ok()
            } else {
                sub.sender.receiver_count() > 0
            }
        });
    }

    fn subscriber_count(&self) -> usize {
        read_recovering(&self.subscribers).len()
    }
}

/// Configuration for the [`EventBus`].
#[derive(Clone, Debug)]
pub struct BusConfig {
    /// Capacity of per-subscriber broadcast channels.
    pub channel_capacity: usize,
    /// Maximum number of records kept in history. Oldest are dropped first.
    pub history_limit: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            history_limit: 10_000,
        }
    }
}

struct Journal {
    next_seq: u64,
    records: VecDeque<EventRecord>,
}

/// In-process event bus for one ledger.
///
/// Publication assigns gap-free sequence numbers starting at 1, appends to a
/// bounded history, then routes to subscribers. Publishing never fails: a
/// slow or vanished subscriber is skipped, and a lock poisoned by a panicking
/// thread is taken over, since every critical section leaves the journal and
/// the subscriber list valid.
pub struct EventBus {
    journal: RwLock<Journal>,
    router: EventRouter,
    config: BusConfig,
}

impl EventBus {
    pub fn new(config: BusConfig) -> Result<Self> {
        if config.channel_capacity == 0 {
            return Err(EventError::Config(
                "channel capacity must be greater than zero".into(),
            ));
        }
        Ok(Self {
            journal: RwLock::new(Journal {
                next_seq: 1,
                records: VecDeque::new(),
            }),
            router: EventRouter::new(),
            config,
        })
    }

    /// Publish one event produced by a call made at `timestamp`.
    pub fn publish(&self, timestamp: Timestamp, event: LedgerEvent) -> EventRecord {
        let record = {
            let mut journal = write_recovering(&self.journal);
            let record = EventRecord::new(journal.next_seq, timestamp, event);
            journal.next_seq += 1;
            if self.config.history_limit > 0 {
                if journal.records.len() == self.config.history_limit {
                    journal.records.pop_front();
                }
                journal.records.push_back(record.clone());
            }
            record
        };

        self.router.route(&record);

        debug!(id = %record.id, seq = record.seq, kind = %record.kind(), "event published");
        record
    }

    /// Subscribe to future events matching the given filter.
    pub fn subscribe(&self, filter: EventFilter) -> EventStream {
        self.router.subscribe(filter, self.config.channel_capacity)
    }

    /// All retained records, oldest first.
    pub fn history(&self) -> Vec<EventRecord> {
        self.history_matching(&EventFilter::default())
    }

    /// Retained records matching `filter`, oldest first.
    pub fn history_matching(&self, filter: &EventFilter) -> Vec<EventRecord> {
        read_recovering(&self.journal)
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    /// Sequence number of the most recent record, or 0 before the first.
    pub fn last_seq(&self) -> u64 {
        read_recovering(&self.journal).next_seq - 1
    }

    /// Current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.router.subscriber_count()
    }
}

fn read_recovering<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_recovering<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_types::AccountId;

    fn deposit(amount: u128) -> LedgerEvent {
        LedgerEvent::Deposit {
            from: AccountId::named("alpha"),
            amount,
        }
    }

    fn cancel(id: u64) -> LedgerEvent {
        LedgerEvent::WithdrawalCancel {
            id: WithdrawalId(id),
            to: AccountId::named("beta"),
            amount: 1,
        }
    }

    fn bus() -> EventBus {
        EventBus::new(BusConfig::default()).unwrap()
    }

    #[test]
    fn publish_assigns_dense_sequence() {
        let bus = bus();
        assert_eq!(bus.last_seq(), 0);

        let a = bus.publish(Timestamp::from_secs(1), deposit(1));
        let b = bus.publish(Timestamp::from_secs(1), deposit(2));

        assert_eq!(a.seq, 1);
        assert_eq!(b.seq, 2);
        assert_eq!(bus.last_seq(), 2);
        assert_eq!(bus.history(), vec![a, b]);
    }

    #[test]
    fn history_is_bounded() {
        let bus = EventBus::new(BusConfig {
            history_limit: 2,
            ..Default::default()
        })
        .unwrap();

        for i in 0..5 {
            bus.publish(Timestamp::from_secs(i), deposit(i as u128 + 1));
        }

        let history = bus.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].seq, 4);
        assert_eq!(history[1].seq, 5);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = EventBus::new(BusConfig {
            channel_capacity: 0,
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, EventError::Config(_)));
    }

    #[test]
    fn subscriber_receives_matching_events() {
        let bus = bus();
        let mut stream = bus.subscribe(EventFilter::kinds([EventKind::WithdrawalCancel]));
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(Timestamp::from_secs(1), deposit(5));
        bus.publish(Timestamp::from_secs(2), cancel(0));

        let received = stream.try_recv().unwrap();
        assert_eq!(received.kind(), EventKind::WithdrawalCancel);
        assert!(stream.try_recv().is_err());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let bus = bus();
        let stream = bus.subscribe(EventFilter::default());
        drop(stream);

        bus.publish(Timestamp::from_secs(1), deposit(1));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn filter_matches_correctly() {
        let record = EventRecord::new(3, Timestamp::from_secs(7), cancel(2));

        assert!(EventFilter::default().matches(&record));
        assert!(EventFilter::withdrawal(WithdrawalId(2)).matches(&record));
        assert!(!EventFilter::withdrawal(WithdrawalId(1)).matches(&record));
        assert!(!EventFilter::kinds([EventKind::Deposit]).matches(&record));

        let after = |seq| EventFilter {
            after_seq: Some(seq),
            ..Default::default()
        };
        assert!(after(2).matches(&record));
        assert!(!after(3).matches(&record));
    }

    #[test]
    fn history_matching_applies_filter() {
        let bus = bus();
        bus.publish(Timestamp::from_secs(1), deposit(1));
        bus.publish(Timestamp::from_secs(2), cancel(4));
        bus.publish(Timestamp::from_secs(3), cancel(5));

        let only_four = bus.history_matching(&EventFilter::withdrawal(WithdrawalId(4)));
        assert_eq!(only_four.len(), 1);
        assert_eq!(only_four[0].seq, 2);
    }

    #[tokio::test]
    async fn async_subscriber_sees_events_in_order() {
        let bus = bus();
        let mut stream = bus.subscribe(EventFilter::default());

        for i in 1..=3u128 {
            bus.publish(Timestamp::from_secs(i as u64), deposit(i));
        }

        for expected in 1..=3u64 {
            let record = stream.recv().await.unwrap();
            assert_eq!(record.seq, expected);
        }
    }

    #[test]
    fn concurrent_publish_keeps_sequence_gap_free() {
        use std::sync::Arc;
        use std::thread;

        let bus = Arc::new(bus());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let bus = Arc::clone(&bus);
            handles.push(thread::spawn(move || {
                for _ in 0..25 {
                    bus.publish(Timestamp::from_secs(1), deposit(1));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let seqs: Vec<u64> = bus.history().iter().map(|r| r.seq).collect();
        assert_eq!(seqs, (1..=100).collect::<Vec<_>>());
    }

    #[test]
    fn publish_survives_poisoned_locks() {
        use std::sync::Arc;
        use std::thread;

        let bus = Arc::new(bus());
        let mut stream = bus.subscribe(EventFilter::default());
        bus.publish(Timestamp::from_secs(1), deposit(1));

        let poisoner = Arc::clone(&bus);
        let panicked = thread::spawn(move || {
            let _journal = poisoner.journal.write().unwrap();
            let _subscribers = poisoner.router.subscribers.write().unwrap();
            panic!("panic while holding bus locks");
        })
        .join()
        .is_err();
        assert!(panicked);
        assert!(bus.journal.is_poisoned());
        assert!(bus.router.subscribers.is_poisoned());

        let record = bus.publish(Timestamp::from_secs(2), deposit(2));
        assert_eq!(record.seq, 2);
        assert_eq!(bus.last_seq(), 2);
        assert_eq!(bus.history().len(), 2);
        assert_eq!(stream.try_recv().unwrap().seq, 1);
        assert_eq!(stream.try_recv().unwrap().seq, 2);
    }
}
