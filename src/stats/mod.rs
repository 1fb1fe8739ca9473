//! Aggregation over the entries log. Everything here is derived by
//! re-scanning the log at query time; day boundaries always come from the
//! current system timezone, not the timezone at entry creation.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};

use crate::store::{blob::BlobStorage, intake::IntakeStore};

/// A reminder is due when the remaining deficit exceeds this share of the
/// goal.
const DEFICIT_RATIO: f64 = 0.3;
/// Minutes without a drink before a reminder may fire.
const QUIET_MINUTES: i64 = 45;

const WEEK_DAYS: u32 = 7;
const MONTH_DAYS: u32 = 30;

/// One value and display label per day, oldest first, today last.
#[derive(Debug, PartialEq)]
pub struct RangeSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

pub fn sum_for_day<B: BlobStorage>(store: &IntakeStore<B>, day: NaiveDate) -> f64 {
    store.day_entries(day).iter().map(|e| e.amount).sum()
}

/// A day with zero entries is never a goal hit, even with a zero sum
/// against a malformed goal.
pub fn goal_met<B: BlobStorage>(store: &IntakeStore<B>, day: NaiveDate) -> bool {
    let sum = sum_for_day(store, day);
    sum >= f64::from(store.goal()) && sum > 0.0
}

/// Consecutive local days, walking backward from today, with the goal met.
/// Today itself being unmet means a streak of 0 regardless of prior
/// history; today is never skipped.
pub fn current_streak<B: BlobStorage>(store: &IntakeStore<B>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut day = today;
    while goal_met(store, day) {
        streak += 1;
        let Some(previous) = day.pred_opt() else {
            break;
        };
        day = previous;
    }
    streak
}

/// Distinct calendar days whose total meets the goal as it is set right
/// now, not the goal that was active historically.
pub fn goals_hit_total<B: BlobStorage>(store: &IntakeStore<B>) -> u32 {
    let goal = f64::from(store.goal());
    let mut totals = BTreeMap::<NaiveDate, f64>::new();
    for entry in store.entries() {
        *totals
            .entry(entry.ts.with_timezone(&Local).date_naive())
            .or_default() += entry.amount;
    }
    totals.values().filter(|total| **total >= goal).count() as u32
}

/// Aggregates the last `days` local calendar days, today included. Weekly
/// series get weekday abbreviations as labels, anything else the day of
/// month.
pub fn range_series<B: BlobStorage>(
    store: &IntakeStore<B>,
    today: NaiveDate,
    days: u32,
) -> RangeSeries {
    let label_format = if days == WEEK_DAYS { "%a" } else { "%d" };
    let mut labels = Vec::with_capacity(days as usize);
    let mut values = Vec::with_capacity(days as usize);
    for offset in (0..i64::from(days)).rev() {
        let day = today - Duration::days(offset);
        labels.push(day.format(label_format).to_string());
        values.push(sum_for_day(store, day));
    }
    RangeSeries { labels, values }
}

pub fn weekly_series<B: BlobStorage>(store: &IntakeStore<B>, today: NaiveDate) -> RangeSeries {
    range_series(store, today, WEEK_DAYS)
}

pub fn monthly_series<B: BlobStorage>(store: &IntakeStore<B>, today: NaiveDate) -> RangeSeries {
    range_series(store, today, MONTH_DAYS)
}

/// Share of today's goal already drunk, rounded and clamped to 100.
pub fn progress_percent<B: BlobStorage>(store: &IntakeStore<B>, today: NaiveDate) -> u8 {
    let goal = f64::from(store.goal().max(1));
    let ratio = sum_for_day(store, today) / goal;
    (ratio * 100.0).round().min(100.0) as u8
}

/// Whether a reminder should fire right now: the deficit exceeds 30% of the
/// goal and the most recent drink of the day is at least 45 minutes old. No
/// drink counts as infinitely old.
pub fn should_remind<B: BlobStorage>(store: &IntakeStore<B>, now: DateTime<Utc>) -> bool {
    let today = now.with_timezone(&Local).date_naive();
    let goal = f64::from(store.goal());
    let deficit = goal - sum_for_day(store, today);
    if deficit <= goal * DEFICIT_RATIO {
        return false;
    }
    let minutes_since_last = store
        .day_entries(today)
        .last()
        .map(|e| (now - e.ts).num_minutes())
        .unwrap_or(i64::MAX);
    minutes_since_last >= QUIET_MINUTES
}

/// Text of one reminder, with the remaining amount clamped at zero.
pub fn reminder_message<B: BlobStorage>(store: &IntakeStore<B>, today: NaiveDate) -> String {
    let remaining = (f64::from(store.goal()) - sum_for_day(store, today)).max(0.0);
    format!("Time to hydrate! {remaining:.0} ml to go toward today's goal")
}
