use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{error, info, warn};

use crate::utils::time::truncate_to_millis;

use super::{
    blob::BlobStorage,
    entities::{DatabaseImage, EntryRow, DEFAULT_GOAL_ML},
    legacy,
};

/// Fixed blob key holding the serialized database image.
pub const DATABASE_KEY: &str = "aqualog-db";

/// The persisted store. Owns the deserialized database image; every mutation
/// rewrites the whole serialized image into the backing blob before
/// returning. That makes writes O(database size), which stays acceptable for
/// one household's drink log.
///
/// An engine-level failure during [IntakeStore::open] leaves the store
/// uninitialized: reads degrade to defaults and mutators become warned
/// no-ops, so a corrupt blob is never clobbered by a later write.
pub struct IntakeStore<B: BlobStorage> {
    blobs: B,
    image: Option<DatabaseImage>,
}

impl<B: BlobStorage> IntakeStore<B> {
    /// Opens the store. Loads the prior image when the database blob exists,
    /// otherwise creates a fresh schema and runs the one-shot legacy import.
    pub async fn open(blobs: B) -> Self {
        let image = match Self::load_or_create(&blobs).await {
            Ok(v) => Some(v),
            Err(e) => {
                error!("Failed to initialize the intake store {e:?}");
                None
            }
        };
        Self { blobs, image }
    }

    async fn load_or_create(blobs: &B) -> Result<DatabaseImage> {
        if let Some(raw) = blobs.read(DATABASE_KEY).await? {
            let image =
                serde_json::from_str(&raw).context("Stored database image is corrupted")?;
            return Ok(image);
        }

        let mut image = DatabaseImage::fresh();
        legacy::import_flat_records(blobs, &mut image).await;
        let raw = serde_json::to_string(&image)?;
        blobs.write(DATABASE_KEY, &raw).await?;
        info!("Created a new database image");
        Ok(image)
    }

    pub fn initialized(&self) -> bool {
        self.image.is_some()
    }

    pub fn goal(&self) -> u32 {
        self.image
            .as_ref()
            .map(|v| v.goal())
            .unwrap_or(DEFAULT_GOAL_ML)
    }

    /// The whole log, in append order.
    pub fn entries(&self) -> &[EntryRow] {
        self.image
            .as_ref()
            .map(|v| v.entries.as_slice())
            .unwrap_or(&[])
    }

    /// Entries of the given local day, ascending by timestamp.
    pub fn day_entries(&self, day: NaiveDate) -> Vec<EntryRow> {
        self.image
            .as_ref()
            .map(|v| v.day_entries(day))
            .unwrap_or_default()
    }

    /// Overwrites the goal singleton. A zero value is rejected at the CLI
    /// boundary already, so it only gets a warning here.
    pub async fn set_goal(&mut self, ml: u32) -> Result<()> {
        if ml == 0 {
            warn!("Ignoring a zero goal");
            return Ok(());
        }
        let Some(image) = self.image.as_mut() else {
            warn!("Ignoring set_goal, the store is not initialized");
            return Ok(());
        };
        image.set_goal(ml);
        self.persist().await
    }

    /// Appends one drink to the log. Non-finite and non-positive amounts are
    /// dropped without touching the store.
    pub async fn add_entry(&mut self, amount: f64, ts: DateTime<Utc>) -> Result<()> {
        if !amount.is_finite() || amount <= 0.0 {
            warn!("Ignoring an entry with invalid amount {amount}");
            return Ok(());
        }
        let Some(image) = self.image.as_mut() else {
            warn!("Ignoring add_entry, the store is not initialized");
            return Ok(());
        };
        image.append_entry(amount, truncate_to_millis(ts));
        self.persist().await
    }

    /// Deletes the latest entry of the given local day and reports what was
    /// removed. A day without entries is a no-op and skips persistence.
    pub async fn remove_last_entry(&mut self, today: NaiveDate) -> Result<Option<EntryRow>> {
        let Some(image) = self.image.as_mut() else {
            warn!("Ignoring remove_last_entry, the store is not initialized");
            return Ok(None);
        };
        match image.remove_last_entry(today) {
            Some(removed) => {
                self.persist().await?;
                Ok(Some(removed))
            }
            None => Ok(None),
        }
    }

    async fn persist(&self) -> Result<()> {
        let Some(image) = self.image.as_ref() else {
            return Ok(());
        };
        let raw = serde_json::to_string(image)?;
        self.blobs.write(DATABASE_KEY, &raw).await
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{DateTime, Duration, NaiveDate, Utc};

    use crate::{
        store::{
            blob::memory::MemoryBlobStorage,
            entities::{DEFAULT_GOAL_ML, GOAL_KEY},
        },
        utils::time::local_day_start,
    };

    use super::{IntakeStore, DATABASE_KEY};

    const TEST_DAY: NaiveDate = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();

    fn at_hour(hour: i64) -> DateTime<Utc> {
        local_day_start(TEST_DAY) + Duration::hours(hour)
    }

    #[tokio::test]
    async fn test_goal_roundtrip() -> Result<()> {
        let blobs = MemoryBlobStorage::default();
        let mut store = IntakeStore::open(&blobs).await;

        for goal in [1, 1500, 2500, 4000] {
            store.set_goal(goal).await?;
            assert_eq!(store.goal(), goal);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_add_then_query_then_remove() -> Result<()> {
        let blobs = MemoryBlobStorage::default();
        let mut store = IntakeStore::open(&blobs).await;

        store.add_entry(500.0, at_hour(9)).await?;
        store.add_entry(600.0, at_hour(12)).await?;
        store.add_entry(1000.0, at_hour(18)).await?;

        let entries = store.day_entries(TEST_DAY);
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries.iter().filter(|e| e.amount == 500.0).count(),
            1,
            "each entry appears exactly once"
        );

        let removed = store.remove_last_entry(TEST_DAY).await?.unwrap();
        assert_eq!(removed.amount, 1000.0);
        assert_eq!(store.day_entries(TEST_DAY).len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_on_empty_day_is_noop() -> Result<()> {
        let blobs = MemoryBlobStorage::default();
        let mut store = IntakeStore::open(&blobs).await;
        store.add_entry(500.0, at_hour(9)).await?;
        let persisted = blobs.raw_value(DATABASE_KEY);

        let other_day = TEST_DAY + Duration::days(3);
        assert_eq!(store.remove_last_entry(other_day).await?, None);
        assert_eq!(store.entries().len(), 1);
        assert_eq!(
            blobs.raw_value(DATABASE_KEY),
            persisted,
            "a no-op removal should not rewrite the blob"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_amounts_are_dropped() -> Result<()> {
        let blobs = MemoryBlobStorage::default();
        let mut store = IntakeStore::open(&blobs).await;

        store.add_entry(0.0, at_hour(9)).await?;
        store.add_entry(-250.0, at_hour(10)).await?;
        store.add_entry(f64::NAN, at_hour(11)).await?;

        assert!(store.entries().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_reopen_preserves_everything() -> Result<()> {
        let blobs = MemoryBlobStorage::default();
        {
            let mut store = IntakeStore::open(&blobs).await;
            store.set_goal(2500).await?;
            store.add_entry(300.0, at_hour(8)).await?;
            store.add_entry(450.0, at_hour(13)).await?;
        }
        let persisted = blobs.raw_value(DATABASE_KEY).unwrap();

        let reopened = IntakeStore::open(&blobs).await;
        assert_eq!(reopened.goal(), 2500);
        let entries = reopened.day_entries(TEST_DAY);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].amount, 300.0);
        assert_eq!(
            blobs.raw_value(DATABASE_KEY).unwrap(),
            persisted,
            "reopening must not rewrite the blob"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_blob_degrades_to_defaults() -> Result<()> {
        let blobs =
            MemoryBlobStorage::with_values([(DATABASE_KEY, "definitely not a database")]);
        let mut store = IntakeStore::open(&blobs).await;

        assert!(!store.initialized());
        assert_eq!(store.goal(), DEFAULT_GOAL_ML);
        assert!(store.day_entries(TEST_DAY).is_empty());

        store.set_goal(1500).await?;
        store.add_entry(500.0, at_hour(9)).await?;
        assert_eq!(store.remove_last_entry(TEST_DAY).await?, None);

        assert_eq!(
            blobs.raw_value(DATABASE_KEY).unwrap(),
            "definitely not a database",
            "an uninitialized store must never overwrite the blob"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_legacy_import_on_fresh_store() -> Result<()> {
        let blobs = MemoryBlobStorage::with_values([
            (GOAL_KEY, "2500"),
            ("day-2024-01-01", r#"[{"amount":300,"ts":1704106800000}]"#),
        ]);

        let store = IntakeStore::open(&blobs).await;
        assert_eq!(store.goal(), 2500);
        assert_eq!(store.entries().len(), 1);
        assert_eq!(store.entries()[0].amount, 300.0);
        assert_eq!(store.entries()[0].ts.timestamp_millis(), 1704106800000);
        Ok(())
    }

    #[tokio::test]
    async fn test_legacy_import_is_one_shot() -> Result<()> {
        let blobs = MemoryBlobStorage::with_values([(
            "day-2024-01-01",
            r#"[{"amount":300,"ts":1704106800000}]"#,
        )]);

        {
            let store = IntakeStore::open(&blobs).await;
            assert_eq!(store.entries().len(), 1);
        }
        // The legacy key stays in place, but the second open finds the
        // database blob and never imports again.
        let reopened = IntakeStore::open(&blobs).await;
        assert_eq!(reopened.entries().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_legacy_import_skips_malformed_days() -> Result<()> {
        let blobs = MemoryBlobStorage::with_values([
            ("day-2024-01-01", r#"[{"amount":300,"ts":1704106800000}]"#),
            ("day-2024-01-02", "not json at all"),
            ("day-2024-01-03", r#"[{"amount":400,"ts":1704279600000}]"#),
            ("unrelated", "ignored"),
        ]);

        let store = IntakeStore::open(&blobs).await;
        let mut amounts: Vec<f64> = store.entries().iter().map(|e| e.amount).collect();
        amounts.sort_by(f64::total_cmp);
        assert_eq!(amounts, vec![300.0, 400.0]);
        Ok(())
    }

    #[tokio::test]
    async fn test_legacy_import_drops_invalid_records() -> Result<()> {
        let blobs = MemoryBlobStorage::with_values([
            (GOAL_KEY, "plenty"),
            (
                "day-2024-01-01",
                r#"[{"amount":-5,"ts":1704106800000},{"amount":250,"ts":1704110400000}]"#,
            ),
        ]);

        let store = IntakeStore::open(&blobs).await;
        assert_eq!(store.goal(), DEFAULT_GOAL_ML, "unparsable legacy goal is skipped");
        assert_eq!(store.entries().len(), 1);
        assert_eq!(store.entries()[0].amount, 250.0);
        Ok(())
    }
}
