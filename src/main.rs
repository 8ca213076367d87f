use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::time::Duration;

use sleeprs::config::AppConfig;
use sleeprs::display;
use sleeprs::error::SleepRsError;
use sleeprs::export::{self, json::export_json, ExportFormat};
use sleeprs::logging::init_logging;
use sleeprs::metrics::{format_duration, tracker_stats};
use sleeprs::models::{HistoryFilter, SleepRecord, UpsertOutcome};
use sleeprs::reminder::BedtimeReminder;
use sleeprs::store::{JsonFileStore, RecordStore};
use sleeprs::SleepAdvisor;

/// SleepRS - Sleep Tracking CLI
///
/// Log nightly sleep, review weekly metrics and get advice for tonight.
/// Advice comes from an optional text-generation service and falls back to
/// built-in rules whenever the service is unavailable.
#[derive(Parser)]
#[command(name = "sleeprs")]
#[command(author = "SleepRS Contributors")]
#[command(version)]
#[command(about = "Sleep tracking and advice CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a night of sleep
    Log {
        /// Night the record is filed under (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<String>,

        /// Time you went to bed (HH:MM)
        #[arg(short, long)]
        bedtime: String,

        /// Time you woke up (HH:MM)
        #[arg(short, long)]
        wakeup: String,

        /// Sleep quality from 1 (poor) to 5 (excellent)
        #[arg(short, long, default_value = "3")]
        quality: u8,

        /// Free-text notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Replace an existing record for the same date
        #[arg(short, long)]
        replace: bool,
    },

    /// Show logged nights
    History {
        /// Time filter (week, month, all)
        #[arg(short, long, default_value = "week")]
        filter: HistoryFilter,

        /// Maximum number of nights to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show summary statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Analyse the last 7 days and get advice for tonight
    Analyze {
        /// Use only the built-in advice
        #[arg(long)]
        offline: bool,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export sleep history
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (csv, json); inferred from the extension if omitted
        #[arg(short = 'f', long)]
        format: Option<String>,

        /// Time filter (week, month, all)
        #[arg(long, default_value = "all")]
        filter: HistoryFilter,
    },

    /// Configure application settings
    Config {
        /// List all configuration options
        #[arg(short, long)]
        list: bool,

        /// Set a configuration value (key=value)
        #[arg(short, long)]
        set: Option<String>,

        /// Get a configuration value
        #[arg(short, long)]
        get: Option<String>,
    },

    /// Watch the clock and print the bedtime reminder when it is due
    Remind {
        /// Check once and exit
        #[arg(long)]
        once: bool,
    },

    /// Delete all sleep records
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_config_path);
    let mut config = AppConfig::load_or_default(&config_path)?;

    init_logging(&config.logging.clone().with_verbosity(cli.verbose))?;

    let mut store = JsonFileStore::new(config.storage.records_path.clone());
    tracing::debug!(store = %store.location(), config = %config_path.display(), "Starting");

    match cli.command {
        Commands::Log {
            date,
            bedtime,
            wakeup,
            quality,
            notes,
            replace,
        } => {
            let date = date.unwrap_or_else(|| today().format("%Y-%m-%d").to_string());
            let record = SleepRecord::parse(&date, &bedtime, &wakeup, quality, notes)
                .map_err(|e| user_facing(&e))?;
            let summary = format!(
                "{}: {} ({} - {})",
                record.date,
                format_duration(record.duration_hours),
                record.bedtime.format("%H:%M"),
                record.wakeup_time.format("%H:%M")
            );

            match store.add_record(record, replace) {
                Ok(UpsertOutcome::Inserted) => {
                    println!("{} {}", "✓ Sleep logged".green(), summary);
                }
                Ok(UpsertOutcome::Replaced { .. }) => {
                    println!("{} {}", "✓ Sleep record replaced".green(), summary);
                }
                Err(err) => return Err(user_facing(&SleepRsError::from(err))),
            }
        }

        Commands::History { filter, limit } => {
            let records = store.load()?;
            let filtered = records.filter(filter, today());
            let shown: Vec<_> = filtered.into_iter().take(limit.unwrap_or(usize::MAX)).collect();
            println!("{}", display::render_history(&shown));
        }

        Commands::Stats { json } => {
            let records = store.load()?;
            let stats = tracker_stats(records.as_slice(), &config.settings, today());
            if json {
                export_json(&stats, std::io::stdout().lock())?;
            } else {
                println!("{}", display::render_stats(&stats));
            }
        }

        Commands::Analyze { offline, json } => {
            let records = store.list_records()?;
            let advisor = if offline {
                SleepAdvisor::offline()
            } else {
                SleepAdvisor::from_config(&config.advisor)
            };

            if !json {
                let message = if advisor.has_provider() {
                    "Analyzing your sleep (asking the advice service)..."
                } else {
                    "Analyzing your sleep..."
                };
                println!("{}", message.cyan().bold());
            }

            let report = advisor.perform_analysis(&records, now()).await;

            if json {
                export_json(&report, std::io::stdout().lock())?;
            } else {
                println!("{}", display::render_report(&report));
            }
        }

        Commands::Export {
            output,
            format,
            filter,
        } => {
            let format = match format {
                Some(name) => ExportFormat::from_str(&name)?,
                None => ExportFormat::from_path(&output).unwrap_or(ExportFormat::Csv),
            };

            let records = store.load()?;
            let selected = records.filter(filter, today());
            let written = export::export_records(&selected, format, &output)
                .with_context(|| format!("Failed to export to {}", output.display()))?;

            println!(
                "{} {} nights to {}",
                "✓ Exported".yellow(),
                written,
                output.display()
            );
        }

        Commands::Config { list, set, get } => {
            if let Some(key_value) = set {
                let (key, value) = key_value
                    .split_once('=')
                    .ok_or_else(|| anyhow!("Expected key=value, got '{}'", key_value))?;
                config.set_value(key.trim(), value)?;
                config.save_to_file(&config_path)?;
                let stored = config.get_value(key.trim())?;
                println!("{} {} = {}", "✓ Set".green(), key.trim(), stored);
            } else if let Some(key) = get {
                println!("{}", config.get_value(&key)?);
            } else if list {
                let location = config_path.display().to_string();
                println!("{} {}", "Configuration".bold(), location.dimmed());
                for (key, value) in config.list_values() {
                    println!("  {:<32} {}", key, value);
                }
            } else {
                bail!("Specify one of --list, --get KEY or --set KEY=VALUE");
            }
        }

        Commands::Remind { once } => {
            let reminder = BedtimeReminder::from_settings(&config.settings);
            if !reminder.is_enabled() {
                println!(
                    "Notifications are disabled. Enable them with \
                     `sleeprs config --set settings.enable_notifications=true`."
                );
                return Ok(());
            }

            let goal = config.settings.sleep_goal_hours;
            if once {
                if reminder.is_due(now()) {
                    println!("{}", reminder.message(goal).magenta().bold());
                } else {
                    println!("Next reminder at {}", reminder.time().format("%H:%M"));
                }
                return Ok(());
            }

            println!(
                "Waiting for bedtime reminder at {} (Ctrl+C to stop)",
                reminder.time().format("%H:%M")
            );
            watch_reminder(reminder, goal).await;
        }

        Commands::Clear { yes } => {
            if !yes {
                bail!("This deletes every sleep record. Re-run with --yes to confirm.");
            }
            let removed = store.clear()?;
            println!("{} {} records removed", "✓ Cleared".red(), removed);
        }
    }

    Ok(())
}

/// Poll the reminder once a minute until Ctrl+C, firing at most once a day
async fn watch_reminder(reminder: BedtimeReminder, goal: f64) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    let mut last_fired: Option<NaiveDate> = None;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let current = now();
                if reminder.is_due(current) && last_fired != Some(current.date()) {
                    last_fired = Some(current.date());
                    println!("{}", reminder.message(goal).magenta().bold());
                    tracing::info!(at = %current, "Bedtime reminder fired");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("Reminder watch stopped");
                break;
            }
        }
    }
}

/// Log a library error at its severity and turn it into the message shown to the user
fn user_facing(err: &SleepRsError) -> anyhow::Error {
    let level = err.severity().to_tracing_level();
    let retryable = err.is_retryable();
    if level == tracing::Level::ERROR {
        tracing::error!(error = %err, retryable, "Command failed");
    } else if level == tracing::Level::WARN {
        tracing::warn!(error = %err, retryable, "Command rejected");
    } else {
        tracing::info!(error = %err, retryable, "Command rejected");
    }

    if retryable {
        anyhow!("{} Try again in a moment.", err.user_message())
    } else {
        anyhow!(err.user_message())
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn today() -> NaiveDate {
    now().date()
}
