//! Append-only event log
//!
//! Records are numbered from 1 and never rewritten. Live consumers
//! subscribe through a broadcast channel; late consumers page with
//! `since`.

use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

use crate::models::types::{EventRecord, LedgerEvent};
use crate::utils::constants::EVENT_CHANNEL_CAPACITY;

pub struct EventLog {
    records: RwLock<Vec<EventRecord>>,
    sender: broadcast::Sender<EventRecord>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            records: RwLock::new(Vec::new()),
            sender,
        }
    }

    /// Append an event and return its sequence number
    pub fn emit(&self, event: LedgerEvent) -> u64 {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let record = EventRecord {
            seq: records.len() as u64 + 1,
            timestamp: chrono::Utc::now().timestamp(),
            event,
        };
        let seq = record.seq;
        debug!(seq, event = record.event.name(), "Event emitted");
        records.push(record.clone());
        drop(records);

        // No receivers is fine; the log itself is authoritative.
        let _ = self.sender.send(record);
        seq
    }

    /// Records with `seq > after`
    pub fn since(&self, after: u64) -> Vec<EventRecord> {
        self.page(after, usize::MAX)
    }

    /// At most `limit` records with `seq > after`
    pub fn page(&self, after: u64, limit: usize) -> Vec<EventRecord> {
        let records = self
            .records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let start = usize::try_from(after).unwrap_or(usize::MAX).min(records.len());
        records[start..].iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .map(|r| r.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_numbers() {
        let log = EventLog::new();
        assert!(log.is_empty());
        assert_eq!(log.emit(LedgerEvent::ModuleDeactivated { id: 1 }), 1);
        assert_eq!(log.emit(LedgerEvent::ModuleDeactivated { id: 2 }), 2);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_since() {
        let log = EventLog::new();
        for id in 1..=3 {
            log.emit(LedgerEvent::ModuleDeactivated { id });
        }
        let tail: Vec<_> = log.since(1).into_iter().map(|r| r.seq).collect();
        assert_eq!(tail, vec![2, 3]);
        assert_eq!(log.since(0).len(), 3);
        assert!(log.since(99).is_empty());
    }

    #[test]
    fn test_page_limits_tail() {
        let log = EventLog::new();
        for id in 1..=5 {
            log.emit(LedgerEvent::ModuleDeactivated { id });
        }
        let page: Vec<_> = log.page(1, 2).into_iter().map(|r| r.seq).collect();
        assert_eq!(page, vec![2, 3]);
        assert_eq!(log.page(4, 10).len(), 1);
        assert!(log.page(0, 0).is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_receive_new_records() {
        let log = EventLog::new();
        log.emit(LedgerEvent::ModuleDeactivated { id: 1 });

        let mut rx = log.subscribe();
        log.emit(LedgerEvent::ModuleDeactivated { id: 2 });

        let record = rx.recv().await.unwrap();
        assert_eq!(record.seq, 2);
        assert_eq!(record.event, LedgerEvent::ModuleDeactivated { id: 2 });
    }
}
