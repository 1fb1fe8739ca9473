pub mod day;
pub mod history;
pub mod remind;
pub mod status;

use std::{fmt::Display, path::PathBuf};

use anyhow::Result;
use chrono::{Local, Utc};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;

use crate::{
    stats,
    store::{blob::FileBlobStorage, intake::IntakeStore},
    utils::{dir::create_application_default_path, logging::enable_logging},
};

use day::DayCommand;
use history::HistoryRange;

#[derive(Parser, Debug)]
#[command(name = "Aqualog", version)]
#[command(about = "Command line water intake tracker", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Log a drink")]
    Log {
        #[arg(value_parser = clap::value_parser!(u32).range(1..), help = "Amount drunk in milliliters")]
        amount_ml: u32,
    },
    #[command(about = "Remove today's most recent entry")]
    Undo,
    #[command(about = "Show today's progress, the current streak and total goals hit")]
    Status,
    #[command(about = "List the entries of one day")]
    Day {
        #[command(flatten)]
        command: DayCommand,
    },
    #[command(about = "Show day totals for the last week or month")]
    History {
        #[arg(long, default_value_t = HistoryRange::Week, help = "Range to display")]
        range: HistoryRange,
    },
    #[command(subcommand, about = "Read or change the daily goal")]
    Goal(GoalCommands),
    #[command(about = "Print periodic hydration reminders until interrupted")]
    Remind {
        #[arg(
            long,
            default_value_t = 60,
            value_parser = clap::value_parser!(u32).range(1..),
            help = "Minutes between reminder checks"
        )]
        interval: u32,
    },
}

#[derive(Subcommand, Debug)]
enum GoalCommands {
    #[command(about = "Print the current daily goal")]
    Get,
    #[command(about = "Overwrite the daily goal")]
    Set {
        #[arg(help = "Goal value, interpreted through --unit")]
        value: f64,
        #[arg(long, default_value_t = GoalUnit::Ml, help = "Unit of the goal value")]
        unit: GoalUnit,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GoalUnit {
    Ml,
    L,
}

impl Display for GoalUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GoalUnit::Ml => write!(f, "ml"),
            GoalUnit::L => write!(f, "l"),
        }
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let application_path = match &args.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            dir.clone()
        }
        None => create_application_default_path()?,
    };

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(&application_path, logging_level, args.log)?;

    let blobs = FileBlobStorage::new(application_path.join("store"))?;
    let mut store = IntakeStore::open(blobs).await;
    if !store.initialized() {
        eprintln!("Warning: couldn't open the database, working from defaults");
    }

    match args.commands {
        Commands::Log { amount_ml } => {
            store.add_entry(f64::from(amount_ml), Utc::now()).await?;
            let today = Local::now().date_naive();
            println!(
                "Logged {amount_ml} ml. Today {:.0} / {} ml ({}%)",
                stats::sum_for_day(&store, today),
                store.goal(),
                stats::progress_percent(&store, today)
            );
            Ok(())
        }
        Commands::Undo => {
            match store.remove_last_entry(Local::now().date_naive()).await? {
                Some(removed) => println!(
                    "Removed {:.0} ml logged at {}",
                    removed.amount,
                    removed.ts.with_timezone(&Local).format("%H:%M")
                ),
                None => println!("Nothing logged today"),
            }
            Ok(())
        }
        Commands::Status => status::process_status_command(&store),
        Commands::Day { command } => day::process_day_command(&store, command),
        Commands::History { range } => history::process_history_command(&store, range),
        Commands::Goal(GoalCommands::Get) => {
            println!("{} ml", store.goal());
            Ok(())
        }
        Commands::Goal(GoalCommands::Set { value, unit }) => {
            let ml = parse_goal_ml(value, unit)?;
            store.set_goal(ml).await?;
            println!("Goal set to {ml} ml");
            Ok(())
        }
        Commands::Remind { interval } => remind::process_remind_command(&store, interval).await,
    }
}

/// The goal is stored in whole milliliters; liters get converted by
/// rounding.
fn parse_goal_ml(value: f64, unit: GoalUnit) -> Result<u32> {
    let ml = match unit {
        GoalUnit::Ml => value.round(),
        GoalUnit::L => (value * 1000.0).round(),
    };
    if !ml.is_finite() || ml < 1.0 || ml > f64::from(u32::MAX) {
        return Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Can't use {value} {unit} as a goal"),
            )
            .into());
    }
    Ok(ml as u32)
}

#[cfg(test)]
mod tests {
    use super::{parse_goal_ml, GoalUnit};

    #[test]
    fn test_goal_unit_conversion() {
        assert_eq!(parse_goal_ml(2000.0, GoalUnit::Ml).unwrap(), 2000);
        assert_eq!(parse_goal_ml(2.5, GoalUnit::L).unwrap(), 2500);
        assert_eq!(parse_goal_ml(1.9996, GoalUnit::L).unwrap(), 2000);
    }

    #[test]
    fn test_goal_rejects_non_positive_values() {
        assert!(parse_goal_ml(0.0, GoalUnit::Ml).is_err());
        assert!(parse_goal_ml(-2.0, GoalUnit::L).is_err());
        assert!(parse_goal_ml(f64::NAN, GoalUnit::Ml).is_err());
        assert!(parse_goal_ml(0.0004, GoalUnit::L).is_err());
    }
}
