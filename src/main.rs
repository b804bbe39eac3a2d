//! # MediRem: daily medicine and expense reminders
//!
//! Usage:
//!   medirem add medicine --name Aspirin --dose 100mg --at 08:00
//!   medirem add expense --at 21:00       # daily "did you log your expenses?" nudge
//!   medirem list                         # all reminders
//!   medirem next                         # next fire time per active reminder
//!   medirem disable 3                    # pause reminder 3
//!   medirem run                          # reminder daemon (start at login)

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use medirem_core::traits::{Haptics, RecordStore};
use medirem_core::{MediremConfig, ReminderKind, ReminderRecord, TimeOfDay, Weekdays};
use medirem_scheduler::{
    AlarmScheduler, NoHaptics, NotifyRouter, Reconciler, ReminderDispatcher, ReminderService,
    SqliteAlarmClock, SqliteRecordStore, SystemClock, TerminalBell, next_fire, next_fire_on,
};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "medirem",
    version,
    about = "💊 MediRem — daily medicine and expense reminders"
)]
struct Cli {
    /// Config file (default: ~/.medirem/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a reminder
    Add {
        #[command(subcommand)]
        kind: AddKind,
    },
    /// List all reminders
    List,
    /// Show when each active reminder fires next
    Next,
    /// Change an existing reminder
    Edit {
        id: i64,
        /// New time, HH:MM (24h)
        #[arg(long)]
        at: Option<TimeOfDay>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        dose: Option<String>,
        #[arg(long)]
        frequency: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Weekdays, 1 = Monday .. 7 = Sunday: "1,2,3,4,5"
        #[arg(long)]
        days: Option<Weekdays>,
    },
    /// Resume a paused reminder
    Enable { id: i64 },
    /// Pause a reminder without deleting it
    Disable { id: i64 },
    /// Delete a reminder
    Remove { id: i64 },
    /// Run the reminder daemon: arm every active reminder and deliver them
    Run,
}

#[derive(Subcommand)]
enum AddKind {
    /// A medicine dose
    Medicine {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        dose: String,
        #[arg(long, default_value = "Daily")]
        frequency: String,
        #[arg(long, default_value = "")]
        notes: String,
        /// Time, HH:MM (24h)
        #[arg(long, default_value = "08:00")]
        at: TimeOfDay,
        /// Weekdays, 1 = Monday .. 7 = Sunday
        #[arg(long, default_value = "1,2,3,4,5,6,7")]
        days: Weekdays,
        /// Store without arming
        #[arg(long)]
        inactive: bool,
    },
    /// The daily expense-logging nudge
    Expense {
        #[arg(long, default_value = "21:00")]
        at: TimeOfDay,
        #[arg(long, default_value = "")]
        note: String,
    },
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

fn db_path(config: &MediremConfig) -> PathBuf {
    Path::new(&expand_path(&config.data_dir)).join(&config.db_file)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "medirem=debug,medirem_scheduler=debug"
    } else {
        "medirem=info,medirem_scheduler=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => MediremConfig::load_from(path)?,
        None => MediremConfig::load()?,
    };
    let db = db_path(&config);
    let store = Arc::new(
        SqliteRecordStore::open(&db).with_context(|| format!("opening {}", db.display()))?,
    );
    // CLI and daemon share one alarm table, so a cancel here disarms the
    // daemon's pending wake before the command returns.
    let alarms = Arc::new(
        SqliteAlarmClock::open(&db).with_context(|| format!("opening {}", db.display()))?,
    );

    run_command(cli.command, &config, store, alarms).await
}

async fn run_command(
    command: Command,
    config: &MediremConfig,
    store: Arc<SqliteRecordStore>,
    alarms: Arc<SqliteAlarmClock>,
) -> Result<()> {
    if let Command::Run = command {
        return run_daemon(config, store, alarms).await;
    }

    let scheduler = Arc::new(AlarmScheduler::from_config(
        alarms,
        Arc::new(SystemClock),
        &config.scheduler,
    ));
    let service = ReminderService::new(store, scheduler);

    match command {
        Command::Add { kind } => {
            let record = match kind {
                AddKind::Medicine { name, dose, frequency, notes, at, days, inactive } => {
                    let mut record = ReminderRecord::new(
                        ReminderKind::Medicine { name, dose, frequency, notes },
                        at,
                    );
                    record.weekdays = days;
                    record.active = !inactive;
                    record
                }
                AddKind::Expense { at, note } => {
                    ReminderRecord::new(ReminderKind::ExpenseNudge { note }, at)
                }
            };
            let created = service.create(&record).await?;
            println!("✅ Reminder {} added: {}", created.id, describe(&created));
        }
        Command::List => {
            let records = service.list().await?;
            if records.is_empty() {
                println!("No reminders yet. Add one with `medirem add medicine --name ... --at HH:MM`.");
            }
            for record in records {
                println!(
                    "{:>4}  {}  {:<13}  {:<8}  {}",
                    record.id,
                    record.time,
                    record.weekdays.to_string(),
                    if record.active { "active" } else { "paused" },
                    describe(&record)
                );
            }
        }
        Command::Next => {
            let now = Local::now();
            for record in service.store().list_active().await? {
                let next = if config.scheduler.honor_weekdays {
                    next_fire_on(record.time, record.weekdays, &now)
                } else {
                    Some(next_fire(record.time, &now))
                };
                match next {
                    Some(at) => println!(
                        "{:>4}  {}  {}",
                        record.id,
                        at.format("%a %Y-%m-%d %H:%M"),
                        describe(&record)
                    ),
                    None => println!("{:>4}  never  {}", record.id, describe(&record)),
                }
            }
        }
        Command::Edit { id, at, name, dose, frequency, notes, days } => {
            let mut record = service.get(id).await?;
            if let Some(at) = at {
                record.time = at;
            }
            if let Some(days) = days {
                record.weekdays = days;
            }
            match &mut record.kind {
                ReminderKind::Medicine { name: n, dose: d, frequency: f, notes: o } => {
                    if let Some(name) = name {
                        *n = name;
                    }
                    if let Some(dose) = dose {
                        *d = dose;
                    }
                    if let Some(frequency) = frequency {
                        *f = frequency;
                    }
                    if let Some(notes) = notes {
                        *o = notes;
                    }
                }
                ReminderKind::ExpenseNudge { note } => {
                    if let Some(notes) = notes {
                        *note = notes;
                    }
                }
            }
            let updated = service.update(&record).await?;
            println!("✅ Reminder {} updated: {} at {}", updated.id, describe(&updated), updated.time);
        }
        Command::Enable { id } => {
            let record = service.set_active(id, true).await?;
            println!("▶️  Reminder {} resumed: {}", id, describe(&record));
        }
        Command::Disable { id } => {
            let record = service.set_active(id, false).await?;
            println!("⏸️  Reminder {} paused: {}", id, describe(&record));
        }
        Command::Remove { id } => {
            if service.delete(id).await? {
                println!("🗑️  Reminder {} removed", id);
            } else {
                println!("⚠️  Reminder {} not found", id);
            }
        }
        Command::Run => {}
    }
    Ok(())
}

async fn run_daemon(
    config: &MediremConfig,
    store: Arc<SqliteRecordStore>,
    alarms: Arc<SqliteAlarmClock>,
) -> Result<()> {
    let (wake_tx, mut wakes) = mpsc::unbounded_channel();
    let poll = Duration::from_millis(config.scheduler.alarm_poll_ms.max(50));
    let delivery_task = {
        let alarms = alarms.clone();
        tokio::spawn(async move { alarms.run(wake_tx, poll).await })
    };
    let scheduler = Arc::new(AlarmScheduler::from_config(
        alarms,
        Arc::new(SystemClock),
        &config.scheduler,
    ));
    let haptics: Arc<dyn Haptics> = if config.haptics.enabled {
        Arc::new(TerminalBell)
    } else {
        Arc::new(NoHaptics)
    };
    let notifier = Arc::new(NotifyRouter::from_config(&config.notify));
    let dispatcher = Arc::new(ReminderDispatcher::new(
        store.clone(),
        scheduler.clone(),
        notifier,
        haptics,
        config.notify.clone(),
    ));

    let interval = Duration::from_secs(config.scheduler.reconcile_interval_secs.max(1));
    tracing::info!("💊 MediRem daemon started (reconcile every {}s)", interval.as_secs());
    let reconciler = Reconciler::new(store, scheduler);
    let reconcile_task = tokio::spawn(async move { reconciler.run(interval).await });

    loop {
        tokio::select! {
            Some(signal) = wakes.recv() => {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    dispatcher.on_wake(signal).await;
                });
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("👋 Shutting down");
                break;
            }
        }
    }

    reconcile_task.abort();
    delivery_task.abort();
    Ok(())
}

fn describe(record: &ReminderRecord) -> String {
    match &record.kind {
        ReminderKind::Medicine { name, dose, .. } if dose.is_empty() => format!("💊 {name}"),
        ReminderKind::Medicine { name, dose, .. } => format!("💊 {name} ({dose})"),
        ReminderKind::ExpenseNudge { note } if note.is_empty() => "💰 Log expenses".to_string(),
        ReminderKind::ExpenseNudge { note } => format!("💰 {note}"),
    }
}
