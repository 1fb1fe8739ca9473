use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::time::{local_day_start, next_day_start};

pub const GOAL_KEY: &str = "goal";
pub const DEFAULT_GOAL_ML: u32 = 2000;

/// One logged drink event. Immutable once created; the only way an entry
/// leaves the log is the "remove last entry of today" operation.
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct EntryRow {
    pub id: i64,
    pub amount: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub ts: DateTime<Utc>,
}

/// The whole database image persisted as one blob: the append-only entries
/// log, the settings table and the autoincrement cursor for entry ids.
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseImage {
    pub entries: Vec<EntryRow>,
    pub settings: BTreeMap<String, String>,
    pub next_entry_id: i64,
}

impl DatabaseImage {
    /// Fresh schema: an empty log plus the settings singleton holding the
    /// default goal.
    pub fn fresh() -> Self {
        let mut settings = BTreeMap::new();
        settings.insert(GOAL_KEY.to_string(), DEFAULT_GOAL_ML.to_string());
        Self {
            entries: vec![],
            settings,
            next_entry_id: 1,
        }
    }

    pub fn goal(&self) -> u32 {
        self.settings
            .get(GOAL_KEY)
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_GOAL_ML)
    }

    pub fn set_goal(&mut self, ml: u32) {
        self.settings.insert(GOAL_KEY.to_string(), ml.to_string());
    }

    /// Appends to the log under the next autoincrement id. Ids increase
    /// monotonically and are never reused, even after removals.
    pub fn append_entry(&mut self, amount: f64, ts: DateTime<Utc>) -> i64 {
        let id = self.next_entry_id;
        self.next_entry_id += 1;
        self.entries.push(EntryRow { id, amount, ts });
        id
    }

    /// Entries within the given local day, ascending by timestamp. Entries
    /// sharing a timestamp keep their append order.
    pub fn day_entries(&self, day: NaiveDate) -> Vec<EntryRow> {
        let (start, end) = (local_day_start(day), next_day_start(day));
        let mut entries: Vec<EntryRow> = self
            .entries
            .iter()
            .filter(|e| e.ts >= start && e.ts < end)
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.ts, e.id));
        entries
    }

    /// Deletes the latest entry of the given local day, if any. Ties on the
    /// timestamp go to the latest append.
    pub fn remove_last_entry(&mut self, day: NaiveDate) -> Option<EntryRow> {
        let (start, end) = (local_day_start(day), next_day_start(day));
        let last = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.ts >= start && e.ts < end)
            .max_by_key(|(_, e)| (e.ts, e.id))
            .map(|(index, _)| index)?;
        Some(self.entries.remove(last))
    }
}
