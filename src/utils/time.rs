use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};

/// This is the standard way of converting a date to a string in aqualog.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Earliest valid instant of the given local calendar day. When a DST jump
/// skips local midnight the first minute that exists is used instead.
pub fn local_day_start(date: NaiveDate) -> DateTime<Utc> {
    let mut candidate = date.and_time(NaiveTime::MIN);
    loop {
        match Local.from_local_datetime(&candidate) {
            LocalResult::Single(v) => return v.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
            LocalResult::None => candidate += Duration::minutes(1),
        }
    }
}

/// Start of the next local day. Queries treat a day as the half-open window
/// [local_day_start(d), next_day_start(d)).
pub fn next_day_start(date: NaiveDate) -> DateTime<Utc> {
    local_day_start(date + Duration::days(1))
}

/// Timestamps are stored with millisecond precision, so they get truncated
/// on the way in to keep the in-memory image equal to its serialized form.
pub fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts.timestamp_millis())
        .single()
        .unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{day_key, local_day_start, next_day_start, truncate_to_millis};

    #[test]
    fn day_key_format() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(day_key(date), "2024-01-05");
    }

    #[test]
    fn day_window_covers_one_day() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let start = local_day_start(date);
        let end = next_day_start(date);
        assert!(start < end);
        // Days are 23 to 25 hours long depending on DST transitions.
        let length = end - start;
        assert!(length.num_hours() >= 23 && length.num_hours() <= 25);
    }

    #[test]
    fn truncation_drops_sub_millisecond_precision() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 15, 12, 30, 5).unwrap()
            + chrono::Duration::nanoseconds(1_234_567);
        let truncated = truncate_to_millis(ts);
        assert_eq!(truncated.timestamp_millis(), ts.timestamp_millis());
        assert_eq!(
            truncated.timestamp_subsec_nanos() % 1_000_000,
            0,
            "sub-millisecond precision should be gone"
        );
    }
}
