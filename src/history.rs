// File: src/history.rs
use crate::clock::format_local;
use crate::core::debounce::Debouncer;
use crate::core::types::{capitalize, Category};
use crate::persistence::{Store, HISTORY_KEY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

pub const HISTORY_LIMIT: usize = 20;
/// Quiet period after the last input change before a conversion is logged.
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(1500);

/// Records written before category metadata existed carry no `v` field.
const LEGACY_VERSION: u32 = 1;
const SCHEMA_VERSION: u32 = 2;

fn legacy_version() -> u32 {
    LEGACY_VERSION
}

/// On-disk shape of one history record.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    #[serde(rename = "v", default = "legacy_version")]
    version: u32,
    #[serde(rename = "valIn")]
    val_in: f64,
    #[serde(rename = "unitIn")]
    unit_in: String,
    #[serde(rename = "valOut")]
    val_out: f64,
    #[serde(rename = "unitOut")]
    unit_out: String,
    date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(rename = "categoryLabel", default, skip_serializing_if = "Option::is_none")]
    category_label: Option<String>,
}

/// One logged conversion, with every optional field already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub input_value: f64,
    pub input_unit: String,
    pub output_value: f64,
    pub output_unit: String,
    pub timestamp: String,
    /// Raw category key; absent on legacy records.
    pub category: Option<String>,
    /// Empty when neither a label nor a category was stored.
    pub category_label: String,
}

impl From<StoredEntry> for HistoryEntry {
    fn from(stored: StoredEntry) -> Self {
        let category_label = match (&stored.category_label, &stored.category) {
            (Some(label), _) if !label.is_empty() => label.clone(),
            (_, Some(key)) => capitalize(key),
            _ => String::new(),
        };
        if stored.version > SCHEMA_VERSION {
            log::debug!("History record has newer schema v{}", stored.version);
        }
        HistoryEntry {
            input_value: stored.val_in,
            input_unit: stored.unit_in,
            output_value: stored.val_out,
            output_unit: stored.unit_out,
            timestamp: stored.date,
            category: stored.category,
            category_label,
        }
    }
}

impl From<&HistoryEntry> for StoredEntry {
    fn from(entry: &HistoryEntry) -> Self {
        StoredEntry {
            version: SCHEMA_VERSION,
            val_in: entry.input_value,
            unit_in: entry.input_unit.clone(),
            val_out: entry.output_value,
            unit_out: entry.output_unit.clone(),
            date: entry.timestamp.clone(),
            category: entry.category.clone(),
            category_label: (!entry.category_label.is_empty()).then(|| entry.category_label.clone()),
        }
    }
}

/// A conversion waiting out the debounce window. Unit fields hold display
/// labels.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingConversion {
    pub input_value: f64,
    pub input_unit: String,
    pub output_value: f64,
    pub output_unit: String,
    pub category: Category,
}

/// Bounded, most-recent-first log of conversions. Writes go through a
/// debouncer so a burst of input changes produces a single entry.
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    limit: usize,
    debouncer: Debouncer<PendingConversion>,
    store: Store,
}

impl HistoryLog {
    /// Rehydrates from the store. A missing or corrupt document yields an
    /// empty log; a malformed record only drops that record.
    pub fn load(store: Store) -> Self {
        let records: Vec<serde_json::Value> = match store.get(HISTORY_KEY) {
            Ok(records) => records.unwrap_or_default(),
            Err(e) => {
                log::warn!("Discarding unreadable conversion history: {}", e);
                Vec::new()
            }
        };
        let entries = records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<StoredEntry>(record) {
                Ok(stored) => Some(HistoryEntry::from(stored)),
                Err(e) => {
                    log::warn!("Skipping malformed history record: {}", e);
                    None
                }
            })
            .take(HISTORY_LIMIT)
            .collect();
        Self {
            entries,
            limit: HISTORY_LIMIT,
            debouncer: Debouncer::new(DEBOUNCE_DELAY),
            store,
        }
    }

    /// Schedules `pending` to be logged once input has been quiet for the
    /// debounce delay. Replaces any conversion already waiting.
    pub fn record(&mut self, pending: PendingConversion, now_ms: i64) {
        self.debouncer.schedule(pending, now_ms);
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Flushes the pending conversion if its quiet period is over. Returns
    /// true when an entry was appended.
    pub fn poll(&mut self, now: DateTime<Utc>) -> bool {
        let Some(pending) = self.debouncer.poll(now.timestamp_millis()) else {
            return false;
        };
        let entry = HistoryEntry {
            input_value: pending.input_value,
            input_unit: pending.input_unit,
            output_value: pending.output_value,
            output_unit: pending.output_unit,
            timestamp: format_local(now),
            category: Some(pending.category.key().to_string()),
            category_label: pending.category.label(),
        };
        log::debug!(
            "Logging conversion {} {} = {} {}",
            entry.input_value,
            entry.input_unit,
            entry.output_value,
            entry.output_unit
        );
        self.entries.push_front(entry);
        self.entries.truncate(self.limit);
        self.persist();
        true
    }

    /// Empties the log, drops any pending write and removes the stored copy.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.debouncer.cancel();
        if let Err(e) = self.store.remove(HISTORY_KEY) {
            log::warn!("Could not remove stored history: {}", e);
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn get_all(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) {
        let stored: Vec<StoredEntry> = self.entries.iter().map(StoredEntry::from).collect();
        if let Err(e) = self.store.set(HISTORY_KEY, &stored) {
            log::warn!("Could not save conversion history: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use chrono::TimeZone;

    fn pending(n: usize) -> PendingConversion {
        PendingConversion {
            input_value: n as f64,
            input_unit: "Meters".to_string(),
            output_value: n as f64 * 100.0,
            output_unit: "Centimeters".to_string(),
            category: Category::Length,
        }
    }

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_only_last_call_in_burst_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = HistoryLog::load(Store::open(dir.path()).unwrap());
        let clock = clock();

        for n in 1..=5 {
            log.record(pending(n), clock.now_millis());
            assert!(log.is_pending());
            clock.advance(Duration::from_millis(400));
            assert!(!log.poll(clock.now()));
        }
        clock.advance(Duration::from_millis(1100));
        assert!(log.poll(clock.now()));
        assert!(!log.poll(clock.now()));

        assert_eq!(log.len(), 1);
        assert_eq!(log.get_all()[0].input_value, 5.0);
        assert_eq!(log.get_all()[0].category_label, "Length");
    }

    #[test]
    fn test_cap_keeps_twenty_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let mut log = HistoryLog::load(store.clone());
        let clock = clock();

        for n in 1..=25 {
            log.record(pending(n), clock.now_millis());
            clock.advance(DEBOUNCE_DELAY);
            assert!(log.poll(clock.now()));
        }

        let values: Vec<f64> = log.entries().map(|e| e.input_value).collect();
        let expected: Vec<f64> = (6..=25).rev().map(|n| n as f64).collect();
        assert_eq!(values, expected);

        let reloaded = HistoryLog::load(store);
        assert_eq!(reloaded.get_all(), log.get_all());
    }

    #[test]
    fn test_clear_removes_entries_pending_and_stored_copy() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = HistoryLog::load(Store::open(dir.path()).unwrap());
        let clock = clock();

        log.record(pending(1), clock.now_millis());
        clock.advance(DEBOUNCE_DELAY);
        log.poll(clock.now());
        log.record(pending(2), clock.now_millis());

        log.clear();
        assert!(!log.is_pending());
        clock.advance(DEBOUNCE_DELAY);
        assert!(!log.poll(clock.now()));
        assert!(log.is_empty());
        assert!(!dir.path().join("conversionHistory.json").exists());
    }

    #[test]
    fn test_legacy_records_get_derived_labels() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("conversionHistory.json"),
            r#"[
                {"valIn":1,"unitIn":"Hours","valOut":60,"unitOut":"Minutes","date":"1/2/2024","category":"time"},
                {"valIn":2,"unitIn":"Meters","valOut":200,"unitOut":"Centimeters","date":"1/1/2024"},
                {"v":2,"valIn":3,"unitIn":"Grams","valOut":0.003,"unitOut":"Kilograms","date":"1/3/2024","category":"weight","categoryLabel":"Mass"}
            ]"#,
        )
        .unwrap();

        let log = HistoryLog::load(Store::open(dir.path()).unwrap());
        let labels: Vec<&str> = log.entries().map(|e| e.category_label.as_str()).collect();
        assert_eq!(labels, vec!["Time", "", "Mass"]);
        assert_eq!(log.get_all()[1].category, None);
    }

    #[test]
    fn test_malformed_record_is_skipped_not_whole_log() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("conversionHistory.json"),
            r#"[
                {"v":2,"valIn":1,"unitIn":"Kilograms","valOut":null,"unitOut":"Milligrams","date":"1/3/2024","category":"weight"},
                {"v":2,"valIn":2,"unitIn":"Meters","valOut":200,"unitOut":"Centimeters","date":"1/2/2024","category":"length"},
                "garbage",
                {"v":2,"valIn":3,"unitIn":"Hours","valOut":180,"unitOut":"Minutes","date":"1/1/2024","category":"time"}
            ]"#,
        )
        .unwrap();

        let log = HistoryLog::load(Store::open(dir.path()).unwrap());
        let values: Vec<f64> = log.entries().map(|e| e.input_value).collect();
        assert_eq!(values, vec![2.0, 3.0]);
    }

    #[test]
    fn test_corrupt_history_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("conversionHistory.json"), "[{").unwrap();
        let log = HistoryLog::load(Store::open(dir.path()).unwrap());
        assert!(log.is_empty());
    }
}
