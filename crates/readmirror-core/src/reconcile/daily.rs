//! Daily-activity diffing.

use std::collections::HashMap;

use crate::models::{DailyActivityEntry, DailyRead};

/// One per-day write against the daily-activity database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyWrite {
    /// Existing entry to update, or `None` to create one.
    pub entry_id: Option<String>,
    pub timestamp: i64,
    pub duration: i64,
}

/// Writes needed to bring the linked entries in line with `daily`.
///
/// Entries are keyed by day timestamp. Days whose stored duration already
/// matches produce nothing; repeated days in `daily` keep the last value.
pub fn plan_daily_writes(existing: &[DailyActivityEntry], daily: &[DailyRead]) -> Vec<DailyWrite> {
    let by_day: HashMap<i64, &DailyActivityEntry> =
        existing.iter().map(|e| (e.timestamp, e)).collect();

    let mut latest: Vec<DailyRead> = Vec::with_capacity(daily.len());
    for read in daily {
        match latest.iter_mut().find(|r| r.read_date == read.read_date) {
            Some(slot) => *slot = *read,
            None => latest.push(*read),
        }
    }
    latest.sort_by_key(|r| r.read_date);

    latest
        .into_iter()
        .filter_map(|read| match by_day.get(&read.read_date) {
            Some(entry) if entry.duration == Some(read.read_time) => None,
            Some(entry) => Some(DailyWrite {
                entry_id: Some(entry.entry_id.clone()),
                timestamp: read.read_date,
                duration: read.read_time,
            }),
            None => Some(DailyWrite {
                entry_id: None,
                timestamp: read.read_date,
                duration: read.read_time,
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(day: i64, time: i64) -> DailyRead {
        DailyRead {
            read_date: day,
            read_time: time,
        }
    }

    fn entry(id: &str, day: i64, duration: Option<i64>) -> DailyActivityEntry {
        DailyActivityEntry {
            entry_id: id.into(),
            timestamp: day,
            duration,
        }
    }

    #[test]
    fn test_only_missing_or_changed_days_are_written() {
        let existing = vec![entry("e1", 100, Some(30)), entry("e2", 200, Some(45))];
        let daily = vec![read(300, 10), read(100, 30), read(200, 50)];

        let writes = plan_daily_writes(&existing, &daily);

        assert_eq!(
            writes,
            vec![
                DailyWrite {
                    entry_id: Some("e2".into()),
                    timestamp: 200,
                    duration: 50,
                },
                DailyWrite {
                    entry_id: None,
                    timestamp: 300,
                    duration: 10,
                },
            ]
        );
    }

    #[test]
    fn test_second_pass_writes_nothing() {
        let daily = vec![read(100, 30), read(200, 50)];
        let existing = vec![entry("e1", 100, Some(30)), entry("e2", 200, Some(50))];
        assert!(plan_daily_writes(&existing, &daily).is_empty());
    }

    #[test]
    fn test_duplicate_days_keep_last_value() {
        let writes = plan_daily_writes(&[], &[read(100, 5), read(100, 8)]);
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].duration, 8);
    }

    #[test]
    fn test_entry_without_duration_is_updated() {
        let writes = plan_daily_writes(&[entry("e1", 100, None)], &[read(100, 5)]);
        assert_eq!(writes[0].entry_id.as_deref(), Some("e1"));
    }
}
