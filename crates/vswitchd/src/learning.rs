//! MAC learning table.
//!
//! Maps source MAC addresses to the port they were last seen on. Learning
//! is an unconditional upsert: a host that moves simply migrates to the new
//! port. Entries never age out unless a TTL is configured.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;
use vswitch_types::{MacAddress, PortId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LearnedEntry {
    port: PortId,
    last_seen: Instant,
}

/// MAC address to port mapping.
#[derive(Debug, Clone, Default)]
pub struct LearningTable {
    entries: HashMap<MacAddress, LearnedEntry>,
    ttl: Option<Duration>,
}

impl LearningTable {
    /// Creates an empty table without aging.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table whose entries expire `ttl` after they were
    /// last learned. A zero `ttl` disables aging.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl: Some(ttl).filter(|ttl| !ttl.is_zero()),
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Records that `mac` was seen on `port`.
    pub fn learn(&mut self, mac: MacAddress, port: PortId) {
        self.learn_at(mac, port, Instant::now());
    }

    /// Records that `mac` was seen on `port` at `now`.
    pub fn learn_at(&mut self, mac: MacAddress, port: PortId, now: Instant) {
        let previous = self.entries.insert(
            mac,
            LearnedEntry {
                port,
                last_seen: now,
            },
        );
        match previous {
            Some(entry) if entry.port != port => {
                debug!(%mac, from = %entry.port, to = %port, "MAC moved");
            }
            None => debug!(%mac, %port, "MAC learned"),
            _ => {}
        }
    }

    /// Returns the port `mac` was last seen on.
    pub fn lookup(&self, mac: &MacAddress) -> Option<PortId> {
        self.lookup_at(mac, Instant::now())
    }

    /// Returns the port `mac` was last seen on, treating entries older than
    /// the TTL at `now` as unknown.
    pub fn lookup_at(&self, mac: &MacAddress, now: Instant) -> Option<PortId> {
        let entry = self.entries.get(mac)?;
        if self.is_stale(entry, now) {
            return None;
        }
        Some(entry.port)
    }

    /// Removes entries older than the TTL at `now` and returns how many were
    /// removed. Does nothing when aging is disabled.
    pub fn expire(&mut self, now: Instant) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.last_seen) < ttl);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "Expired MAC entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the table sorted by MAC, for diagnostics.
    pub fn entries(&self) -> Vec<(MacAddress, PortId)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(mac, entry)| (*mac, entry.port))
            .collect();
        entries.sort();
        entries
    }

    fn is_stale(&self, entry: &LearnedEntry, now: Instant) -> bool {
        self.ttl
            .is_some_and(|ttl| now.saturating_duration_since(entry.last_seen) >= ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mac(last: u8) -> MacAddress {
        MacAddress::new([0x02, 0, 0, 0, 0, last])
    }

    #[test]
    fn test_new_table_is_empty() {
        let table = LearningTable::new();
        assert!(table.is_empty());
        assert_eq!(table.lookup(&mac(1)), None);
        assert_eq!(table.ttl(), None);
    }

    #[test]
    fn test_learn_is_idempotent() {
        let mut table = LearningTable::new();
        for _ in 0..3 {
            table.learn(mac(1), PortId::new(2));
        }
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(&mac(1)), Some(PortId::new(2)));
    }

    #[test]
    fn test_last_writer_wins() {
        let mut table = LearningTable::new();
        table.learn(mac(1), PortId::new(2));
        table.learn(mac(1), PortId::new(5));

        assert_eq!(table.lookup(&mac(1)), Some(PortId::new(5)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_no_aging_without_ttl() {
        let mut table = LearningTable::new();
        let start = Instant::now();
        table.learn_at(mac(1), PortId::new(0), start);

        let later = start + Duration::from_secs(86_400);
        assert_eq!(table.lookup_at(&mac(1), later), Some(PortId::new(0)));
        assert_eq!(table.expire(later), 0);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_ttl_hides_and_expires_stale_entries() {
        let mut table = LearningTable::with_ttl(Duration::from_secs(300));
        let start = Instant::now();
        table.learn_at(mac(1), PortId::new(0), start);
        table.learn_at(mac(2), PortId::new(1), start + Duration::from_secs(200));

        let now = start + Duration::from_secs(301);
        assert_eq!(table.lookup_at(&mac(1), now), None);
        assert_eq!(table.lookup_at(&mac(2), now), Some(PortId::new(1)));

        assert_eq!(table.expire(now), 1);
        assert_eq!(table.entries(), vec![(mac(2), PortId::new(1))]);
    }

    #[test]
    fn test_relearn_refreshes_ttl() {
        let mut table = LearningTable::with_ttl(Duration::from_secs(10));
        let start = Instant::now();
        table.learn_at(mac(1), PortId::new(0), start);
        table.learn_at(mac(1), PortId::new(0), start + Duration::from_secs(8));

        let now = start + Duration::from_secs(12);
        assert_eq!(table.lookup_at(&mac(1), now), Some(PortId::new(0)));
    }

    #[test]
    fn test_zero_ttl_disables_aging() {
        let mut table = LearningTable::with_ttl(Duration::ZERO);
        assert_eq!(table.ttl(), None);

        let start = Instant::now();
        table.learn_at(mac(1), PortId::new(0), start);
        assert_eq!(table.lookup_at(&mac(1), start), Some(PortId::new(0)));
        assert_eq!(table.expire(start + Duration::from_secs(60)), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ages_on_runtime_clock() {
        let mut table = LearningTable::with_ttl(Duration::from_secs(30));
        table.learn(mac(1), PortId::new(0));

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(table.lookup(&mac(1)), Some(PortId::new(0)));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(table.lookup(&mac(1)), None);
        assert_eq!(table.expire(Instant::now()), 1);
    }
}
