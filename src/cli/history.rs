use std::fmt::Display;

use anyhow::Result;
use chrono::Local;
use clap::ValueEnum;

use crate::{
    stats,
    store::{blob::BlobStorage, intake::IntakeStore},
};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum HistoryRange {
    Week,
    Month,
}

impl Display for HistoryRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryRange::Week => write!(f, "week"),
            HistoryRange::Month => write!(f, "month"),
        }
    }
}

const BAR_WIDTH: usize = 40;

/// Command to process `history`: one row per day, oldest first, with a bar
/// proportional to the largest day of the range.
pub fn process_history_command<B: BlobStorage>(
    store: &IntakeStore<B>,
    range: HistoryRange,
) -> Result<()> {
    let today = Local::now().date_naive();
    let series = match range {
        HistoryRange::Week => stats::weekly_series(store, today),
        HistoryRange::Month => stats::monthly_series(store, today),
    };

    let max = series.values.iter().cloned().fold(0.0f64, f64::max);
    for (label, value) in series.labels.iter().zip(&series.values) {
        let bar = if max > 0.0 {
            ((value / max) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        println!("{label}\t{value:>6.0} ml\t{}", "#".repeat(bar));
    }
    Ok(())
}
