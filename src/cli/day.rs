use std::fmt::Display;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};

use crate::{
    stats,
    store::{blob::BlobStorage, intake::IntakeStore},
    utils::time::day_key,
};

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct DayCommand {
    #[arg(
        long,
        help = "Day to display. Examples are \"yesterday\", \"2 days ago\", \"15/03/2025\". Defaults to today"
    )]
    date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
}

/// Command to process `day`. Lists every entry of one local calendar day
/// along with the day total.
pub fn process_day_command<B: BlobStorage>(
    store: &IntakeStore<B>,
    DayCommand { date, date_style }: DayCommand,
) -> Result<()> {
    let day = parse_day(date, date_style)?;

    let entries = store.day_entries(day);
    if entries.is_empty() {
        println!("No entries on {}", day_key(day));
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{}\t{:.0} ml",
            entry.ts.with_timezone(&Local).format("%H:%M"),
            entry.amount
        );
    }
    println!();
    println!(
        "Total\t{:.0} / {} ml",
        stats::sum_for_day(store, day),
        store.goal()
    );
    Ok(())
}

fn parse_day(date: Option<String>, date_style: DateStyle) -> Result<NaiveDate> {
    let now = Local::now();
    match date.map(|s| parse_date_string(&s, now, date_style.into())) {
        Some(Ok(v)) => Ok(v.date_naive()),
        Some(Err(e)) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate the date {e}"),
            )
            .into()),
        None => Ok(now.date_naive()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Local};

    use super::{parse_day, DateStyle};

    #[test]
    fn test_default_day_is_today() {
        let day = parse_day(None, DateStyle::Uk).unwrap();
        assert_eq!(day, Local::now().date_naive());
    }

    #[test]
    fn test_relative_dates() {
        let day = parse_day(Some("yesterday".to_string()), DateStyle::Uk).unwrap();
        assert_eq!(day, Local::now().date_naive() - Duration::days(1));
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        assert!(parse_day(Some("not a date".to_string()), DateStyle::Uk).is_err());
    }
}
