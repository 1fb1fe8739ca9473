use std::time::Duration;

use anyhow::Result;
use chrono::{Local, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::{
    reminder::{shutdown::detect_shutdown, ReminderModule},
    stats,
    store::{blob::BlobStorage, intake::IntakeStore},
    utils::clock::DefaultClock,
};

/// Command to process `remind`. Runs the reminder loop in the foreground,
/// printing a message whenever a tick decides one is due, until ctrl-c.
pub async fn process_remind_command<B: BlobStorage>(
    store: &IntakeStore<B>,
    interval_minutes: u32,
) -> Result<()> {
    let (sender, mut receiver) = mpsc::channel::<String>(4);
    let shutdown_token = CancellationToken::new();

    let module = ReminderModule::new(
        sender,
        Duration::from_secs(u64::from(interval_minutes) * 60),
        shutdown_token.clone(),
        Box::new(DefaultClock),
        || {
            let now = Utc::now();
            stats::should_remind(store, now)
                .then(|| stats::reminder_message(store, now.with_timezone(&Local).date_naive()))
        },
    );

    println!("Reminders every {interval_minutes} minutes. Press ctrl-c to stop.");

    let (_, run_result, _) = tokio::join!(
        detect_shutdown(shutdown_token),
        module.run(),
        async {
            while let Some(message) = receiver.recv().await {
                println!("{message}");
            }
        },
    );

    if let Err(e) = &run_result {
        error!("Reminder module got an error {e:?}");
    }
    run_result
}
