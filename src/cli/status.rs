use anyhow::Result;
use chrono::Local;

use crate::{
    stats,
    store::{blob::BlobStorage, intake::IntakeStore},
};

/// Command to process `status`: today's total against the goal plus the
/// streak and goals-hit counters.
pub fn process_status_command<B: BlobStorage>(store: &IntakeStore<B>) -> Result<()> {
    let today = Local::now().date_naive();

    println!(
        "Today\t\t{:.0} / {} ml ({}%)",
        stats::sum_for_day(store, today),
        store.goal(),
        stats::progress_percent(store, today)
    );
    println!("Streak\t\t{} days", stats::current_streak(store, today));
    println!("Goals hit\t{}", stats::goals_hit_total(store));
    Ok(())
}
