pub mod shutdown;

use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::utils::clock::Clock;

/// A single repeating timer. Every interval it invokes the caller-supplied
/// builder: a `Some` result is forwarded to the channel, `None` suppresses
/// the tick. Purely advisory, a missed tick has no correctness consequence.
pub struct ReminderModule<F> {
    next: mpsc::Sender<String>,
    interval: Duration,
    shutdown: CancellationToken,
    time_provider: Box<dyn Clock>,
    builder: F,
}

impl<F: FnMut() -> Option<String>> ReminderModule<F> {
    pub fn new(
        next: mpsc::Sender<String>,
        interval: Duration,
        shutdown: CancellationToken,
        time_provider: Box<dyn Clock>,
        builder: F,
    ) -> Self {
        Self {
            next,
            interval,
            shutdown,
            time_provider,
            builder,
        }
    }

    /// Executes the reminder event loop. The first tick fires one whole
    /// interval after startup, and the cadence stays fixed relative to it.
    pub async fn run(mut self) -> Result<()> {
        let mut tick_point = self.time_provider.instant();
        loop {
            tick_point += self.interval;

            tokio::select! {
                // Cancelation stops the event loop. Dropping the sender in
                // turn ends whatever consumes the messages.
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.time_provider.sleep_until(tick_point) => ()
            }

            match (self.builder)() {
                Some(message) => {
                    debug!("Sending reminder {message:?}");
                    self.next
                        .send(message)
                        .await
                        .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
                }
                None => debug!("Reminder tick suppressed"),
            }
        }
    }
}
