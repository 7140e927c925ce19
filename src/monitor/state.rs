//! Previous snapshots and change detection.
//!
//! Each source keeps exactly the last successful fetch, keyed by identity
//! (digits-only phone for balances, code for containers). An identity seen
//! for the first time only seeds the map; it never produces an event.

use std::collections::HashMap;

use crate::sheets::{BalanceRecord, ContainerRecord};

/// Which sheet a change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Balance,
    Container,
}

/// Sign of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl Direction {
    /// Emoji shown next to the change.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Up => "📈",
            Self::Down => "📉",
            Self::Flat => "🔄",
        }
    }
}

/// A value that differs from the previous snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// Identity key the change was detected under.
    pub key: String,
    pub name: String,
    pub code: String,
    pub old_amount: f64,
    pub new_amount: f64,
}

impl ChangeEvent {
    #[must_use]
    pub fn direction(&self) -> Direction {
        match to_cents(self.new_amount).cmp(&to_cents(self.old_amount)) {
            std::cmp::Ordering::Greater => Direction::Up,
            std::cmp::Ordering::Less => Direction::Down,
            std::cmp::Ordering::Equal => Direction::Flat,
        }
    }
}

/// Amount in whole cents, the precision changes are detected at.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Last observed snapshot of both sources.
#[derive(Debug, Default)]
pub struct SnapshotState {
    balances: HashMap<String, BalanceRecord>,
    containers: HashMap<String, ContainerRecord>,
}

impl SnapshotState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the balance snapshot and returns the changes against the
    /// previous one. An empty fetch leaves the snapshot untouched.
    ///
    /// Records without a usable phone key are ignored. When several rows
    /// share a key the last one wins.
    pub fn apply_balances(&mut self, records: Vec<BalanceRecord>) -> Vec<ChangeEvent> {
        let current: HashMap<String, BalanceRecord> = records
            .into_iter()
            .filter(BalanceRecord::has_key)
            .map(|r| (r.key(), r))
            .collect();

        if current.is_empty() {
            return Vec::new();
        }

        let mut events: Vec<_> = current
            .iter()
            .filter_map(|(key, record)| {
                let previous = self.balances.get(key)?;
                (to_cents(previous.amount) != to_cents(record.amount)).then(|| ChangeEvent {
                    kind: ChangeKind::Balance,
                    key: key.clone(),
                    name: record.name.clone(),
                    code: record.code.clone(),
                    old_amount: previous.amount,
                    new_amount: record.amount,
                })
            })
            .collect();
        events.sort_by(|a, b| a.key.cmp(&b.key));

        self.balances = current;
        events
    }

    /// Container counterpart of [`Self::apply_balances`], keyed by code.
    pub fn apply_containers(&mut self, records: Vec<ContainerRecord>) -> Vec<ChangeEvent> {
        // Containers at or below the threshold are already filtered out, so
        // they leave the map and come back later without an event.
        let current: HashMap<String, ContainerRecord> =
            records.into_iter().map(|r| (r.code.clone(), r)).collect();

        if current.is_empty() {
            return Vec::new();
        }

        let mut events: Vec<_> = current
            .iter()
            .filter_map(|(code, record)| {
                let previous = self.containers.get(code)?;
                (to_cents(previous.amount) != to_cents(record.amount)).then(|| ChangeEvent {
                    kind: ChangeKind::Container,
                    key: code.clone(),
                    name: record.name.clone(),
                    code: code.clone(),
                    old_amount: previous.amount,
                    new_amount: record.amount,
                })
            })
            .collect();
        events.sort_by(|a, b| a.key.cmp(&b.key));

        self.containers = current;
        events
    }

    /// Number of tracked identities per source.
    #[must_use]
    pub fn tracked(&self) -> (usize, usize) {
        (self.balances.len(), self.containers.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(phone: &str, amount: f64) -> BalanceRecord {
        BalanceRecord {
            phone: phone.to_owned(),
            name: "Ali".to_owned(),
            list_name: "12".to_owned(),
            code: "1111".to_owned(),
            amount,
        }
    }

    fn container(code: &str, amount: f64) -> ContainerRecord {
        ContainerRecord {
            code: code.to_owned(),
            name: "Vali".to_owned(),
            amount,
        }
    }

    #[test]
    fn test_cold_start_is_silent() {
        let mut state = SnapshotState::new();
        assert!(state.apply_balances(vec![balance("901234567", 100.0)]).is_empty());
        assert!(state.apply_containers(vec![container("2222", 50.0)]).is_empty());
        assert_eq!(state.tracked(), (1, 1));
    }

    #[test]
    fn test_unchanged_snapshot_is_silent() {
        let mut state = SnapshotState::new();
        state.apply_balances(vec![balance("901234567", 100.0)]);
        assert!(state.apply_balances(vec![balance("901234567", 100.0)]).is_empty());
    }

    #[test]
    fn test_increase_emits_one_event() {
        let mut state = SnapshotState::new();
        state.apply_balances(vec![balance("901234567", 100.0), balance("902222222", 7.0)]);

        let events =
            state.apply_balances(vec![balance("901234567", 105.0), balance("902222222", 7.0)]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].key, "901234567");
        assert!((events[0].new_amount - events[0].old_amount - 5.0).abs() < 1e-9);
        assert_eq!(events[0].direction(), Direction::Up);
    }

    #[test]
    fn test_sub_cent_noise_is_ignored() {
        let mut state = SnapshotState::new();
        state.apply_balances(vec![balance("901234567", 0.1 + 0.2)]);
        assert!(state.apply_balances(vec![balance("901234567", 0.3)]).is_empty());
    }

    #[test]
    fn test_empty_fetch_keeps_previous_snapshot() {
        let mut state = SnapshotState::new();
        state.apply_containers(vec![container("2222", 50.0)]);
        assert!(state.apply_containers(Vec::new()).is_empty());

        let events = state.apply_containers(vec![container("2222", 20.0)]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].direction(), Direction::Down);
    }

    #[test]
    fn test_disappeared_identity_is_dropped() {
        let mut state = SnapshotState::new();
        state.apply_balances(vec![balance("901234567", 100.0), balance("902222222", 7.0)]);
        state.apply_balances(vec![balance("902222222", 7.0)]);

        // Reappearing counts as a new identity again
        assert!(state.apply_balances(vec![balance("901234567", 300.0)]).is_empty());
    }

    #[test]
    fn test_hidden_container_reappears_silently() {
        let mut state = SnapshotState::new();
        state.apply_containers(vec![container("2222", 50.0), container("3333", 40.0)]);

        // 2222 dropped to the threshold and was filtered out of the fetch
        assert!(state.apply_containers(vec![container("3333", 40.0)]).is_empty());
        assert_eq!(state.tracked().1, 1);

        let events =
            state.apply_containers(vec![container("2222", 80.0), container("3333", 40.0)]);
        assert!(events.is_empty());
        assert_eq!(state.tracked().1, 2);
    }

    #[test]
    fn test_short_phones_are_not_tracked() {
        let mut state = SnapshotState::new();
        state.apply_balances(vec![balance("12345", 1.0), balance("901234567", 1.0)]);
        assert_eq!(state.tracked().0, 1);
    }
}
