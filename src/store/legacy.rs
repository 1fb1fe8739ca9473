use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use super::{
    blob::BlobStorage,
    entities::{DatabaseImage, GOAL_KEY},
};

/// Prefix of the per-day keys of the flat legacy storage format.
const LEGACY_DAY_PREFIX: &str = "day-";

#[derive(Deserialize)]
struct LegacyEntry {
    amount: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    ts: DateTime<Utc>,
}

/// Best-effort import of the flat legacy format: a `goal` key plus
/// `day-YYYY-MM-DD` keys, each holding a JSON array of entries. Runs only
/// while a fresh image is being created, which keeps it one-shot: once the
/// database blob exists no later open imports again. A record that fails to
/// parse is skipped with a warning, never fatal. Legacy keys are left in
/// place.
pub(super) async fn import_flat_records<B: BlobStorage>(blobs: &B, image: &mut DatabaseImage) {
    if let Err(e) = import_inner(blobs, image).await {
        warn!("Skipping the legacy import {e:?}");
    }
}

async fn import_inner<B: BlobStorage>(
    blobs: &B,
    image: &mut DatabaseImage,
) -> anyhow::Result<()> {
    if let Some(goal) = blobs.read(GOAL_KEY).await? {
        match goal.trim().parse::<u32>() {
            Ok(v) if v > 0 => image.set_goal(v),
            _ => warn!("Legacy goal value {goal:?} is not a positive integer"),
        }
    }

    let mut day_keys: Vec<String> = blobs
        .keys()
        .await?
        .into_iter()
        .filter(|key| key.starts_with(LEGACY_DAY_PREFIX))
        .collect();
    day_keys.sort();

    let mut imported = 0usize;
    for key in day_keys {
        let Some(raw) = blobs.read(&key).await? else {
            continue;
        };
        let entries: Vec<LegacyEntry> = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                warn!("Couldn't migrate the legacy key {key}: {e}");
                continue;
            }
        };
        for entry in entries {
            if entry.amount.is_finite() && entry.amount > 0.0 {
                image.append_entry(entry.amount, entry.ts);
                imported += 1;
            } else {
                warn!("Dropping a legacy record with invalid amount {}", entry.amount);
            }
        }
    }

    if imported > 0 {
        info!("Imported {imported} legacy entries");
    }
    Ok(())
}
