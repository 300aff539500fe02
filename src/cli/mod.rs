pub mod history;
pub mod process;

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use ansi_term::Colour;
use anyhow::{Context, Result};
use chrono::{Local, NaiveTime, Timelike, Weekday};
use clap::{CommandFactory, Parser, Subcommand};
use history::{process_history_command, HistoryCommand};
use process::{kill_previous_daemons, restart_daemon};
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::start_daemon,
    notify::desktop::{DesktopPlatform, NotifyRustSink},
    reminders::{config, scheduler::ReminderScheduler, ReminderSettings, INTERVAL_OPTIONS},
    settings::{file::FileSettings, SETTINGS_FILE_NAME},
    store::PgSessionStore,
    timer::{SessionTimerController, TimerState},
    utils::{
        clock::{Clock, DefaultClock},
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX, DAEMON_PREFIX},
        time::{format_clock, format_elapsed},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Worktick", version, long_about = None)]
#[command(about = "Personal work timer with session history and reminders", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Print logs to stdout")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Postgres connection string. Overrides DATABASE_URL from the environment or .env"
    )]
    database_url: Option<String>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Start a work session")]
    Start,
    #[command(about = "Stop the running work session")]
    Stop,
    #[command(about = "Show the running session and today's total")]
    Status,
    #[command(about = "Show today's total work time")]
    Today,
    #[command(about = "Show completed work per day")]
    History {
        #[command(flatten)]
        command: HistoryCommand,
    },
    #[command(about = "Configure the weekly start-work reminder")]
    Remind {
        #[command(subcommand)]
        command: RemindCommands,
    },
    #[command(about = "Configure the in-session reminders")]
    Interval {
        #[command(subcommand)]
        command: IntervalCommands,
    },
    #[command(about = "Start the daemon in the background, replacing any previous instance")]
    Up {},
    #[command(about = "Stop the currently running daemon")]
    Down {},
    #[command(
        about = "Run the daemon directly in current console. Used for creating a daemon internally and for debugging"
    )]
    Serve {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum RemindCommands {
    #[command(about = "Show the weekly reminder configuration")]
    Show,
    #[command(about = "Turn the weekly reminder on")]
    On,
    #[command(about = "Turn the weekly reminder off")]
    Off,
    #[command(about = "Set the reminder time")]
    At {
        #[arg(help = "Time of day as HH:MM, for example 09:00")]
        time: String,
    },
    #[command(about = "Set the reminder days")]
    Days {
        #[arg(
            required = true,
            value_parser = parse_weekday,
            help = "Days of the week, for example: mon tue wed thu fri"
        )]
        days: Vec<Weekday>,
    },
    #[command(about = "Send a test notification a couple of seconds from now")]
    Test,
}

#[derive(Subcommand, Debug)]
enum IntervalCommands {
    #[command(about = "Show the in-session reminder configuration")]
    Show,
    #[command(about = "Turn in-session reminders on")]
    On,
    #[command(about = "Turn in-session reminders off")]
    Off,
    #[command(about = "Set how often a reminder fires during a session")]
    Every {
        #[arg(help = "Minutes between reminders. Run with an invalid value to see the options")]
        minutes: u32,
    },
}

pub async fn run_cli() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };

    let dir = match &args.commands {
        Commands::Serve { dir: Some(dir) } => dir.clone(),
        _ => create_application_default_path()?,
    };
    let prefix = match &args.commands {
        Commands::Serve { .. } => DAEMON_PREFIX,
        _ => CLI_PREFIX,
    };
    enable_logging(prefix, &dir, logging_level, args.log)?;

    match args.commands {
        Commands::Serve { .. } => {
            start_daemon(dir, &resolve_database_url(args.database_url)?).await
        }
        Commands::Up {} => restart_daemon(args.database_url.as_deref()),
        Commands::Down {} => {
            let process_name = env::current_exe().context("Can't find own executable")?;
            match kill_previous_daemons(&process_name) {
                0 => println!("No daemon was running"),
                n => println!("Stopped {n} daemon process(es)"),
            }
            Ok(())
        }
        Commands::Start => run_start(args.database_url).await,
        Commands::Stop => run_stop(args.database_url).await,
        Commands::Status => run_status(args.database_url).await,
        Commands::Today => run_today(args.database_url).await,
        Commands::History { command } => {
            let store = connect_store(args.database_url).await?;
            process_history_command(command, &store).await
        }
        Commands::Remind { command } => run_remind(dir, command).await,
        Commands::Interval { command } => run_interval(dir, command).await,
    }
}

fn resolve_database_url(arg: Option<String>) -> Result<String> {
    match arg {
        Some(url) => Ok(url),
        None => env::var("DATABASE_URL").context(
            "DATABASE_URL is not set. Put it in the environment or a .env file, or pass --database-url",
        ),
    }
}

async fn connect_store(database_url: Option<String>) -> Result<PgSessionStore> {
    let store = PgSessionStore::connect(&resolve_database_url(database_url)?).await?;
    store.ensure_schema().await?;
    Ok(store)
}

/// One-shot commands rebuild their view of the world from the store before acting, so they
/// cooperate with the daemon and with other machines writing to the same table.
async fn connect_controller(database_url: Option<String>) -> Result<SessionTimerController> {
    let store = connect_store(database_url).await?;
    let mut controller = SessionTimerController::new(Arc::new(store), Arc::new(DefaultClock));
    controller.reconcile().await?;
    Ok(controller)
}

async fn run_start(database_url: Option<String>) -> Result<()> {
    let mut controller = connect_controller(database_url).await?;
    if let TimerState::Running { session, elapsed } = controller.state() {
        println!(
            "Already working for {}, since {}",
            format_elapsed(*elapsed),
            session
                .start_time
                .with_timezone(&Local)
                .format("%H:%M:%S")
        );
        return Ok(());
    }
    let session = controller.start().await?;
    println!(
        "{} at {}",
        Colour::Green.bold().paint("Started working"),
        session
            .start_time
            .with_timezone(&Local)
            .format("%H:%M:%S")
    );
    Ok(())
}

async fn run_stop(database_url: Option<String>) -> Result<()> {
    let mut controller = connect_controller(database_url).await?;
    if !controller.state().is_running() {
        println!("No session is running");
        return Ok(());
    }
    let completed = controller.stop().await?;
    println!(
        "{} after {}. Today: {}",
        Colour::Green.bold().paint("Stopped"),
        format_elapsed(completed.duration),
        format_elapsed(controller.today_total())
    );
    Ok(())
}

async fn run_status(database_url: Option<String>) -> Result<()> {
    let controller = connect_controller(database_url).await?;
    match controller.state() {
        TimerState::Running { session, elapsed } => {
            println!(
                "{} {}",
                Colour::Green.bold().paint("Working"),
                format_clock(*elapsed)
            );
            println!(
                "Started at {}",
                session
                    .start_time
                    .with_timezone(&Local)
                    .format("%H:%M:%S")
            );
        }
        TimerState::Idle => println!("{}", Colour::Yellow.paint("Not working")),
    }
    println!("Today: {}", format_elapsed(controller.today_including_current()));
    Ok(())
}

async fn run_today(database_url: Option<String>) -> Result<()> {
    let controller = connect_controller(database_url).await?;
    println!("Today: {}", format_elapsed(controller.today_including_current()));
    Ok(())
}

async fn run_remind(dir: PathBuf, command: RemindCommands) -> Result<()> {
    let settings = FileSettings::new(dir.join(SETTINGS_FILE_NAME));
    match command {
        RemindCommands::Show => {
            print_reminder(&config::load_reminder(&settings).await?);
        }
        RemindCommands::On => {
            let mut reminder = config::load_reminder(&settings).await?;
            reminder.enabled = true;
            config::save_reminder(&settings, &reminder).await?;
            print_reminder(&reminder);
        }
        RemindCommands::Off => {
            let mut reminder = config::load_reminder(&settings).await?;
            reminder.enabled = false;
            config::save_reminder(&settings, &reminder).await?;
            print_reminder(&reminder);
        }
        RemindCommands::At { time } => {
            let (hour, minute) = parse_time_of_day(&time)?;
            let mut reminder = config::load_reminder(&settings).await?;
            reminder.hour = hour;
            reminder.minute = minute;
            config::save_reminder(&settings, &reminder).await?;
            print_reminder(&reminder);
        }
        RemindCommands::Days { days } => {
            let mut reminder = config::load_reminder(&settings).await?;
            reminder.days = days;
            reminder.normalize();
            config::save_reminder(&settings, &reminder).await?;
            print_reminder(&reminder);
        }
        RemindCommands::Test => send_test_notification().await?,
    }
    Ok(())
}

async fn run_interval(dir: PathBuf, command: IntervalCommands) -> Result<()> {
    let settings = FileSettings::new(dir.join(SETTINGS_FILE_NAME));
    let mut interval = config::load_interval(&settings).await?;
    match command {
        IntervalCommands::Show => {}
        IntervalCommands::On => {
            interval.enabled = true;
            config::save_interval(&settings, &interval).await?;
        }
        IntervalCommands::Off => {
            interval.enabled = false;
            config::save_interval(&settings, &interval).await?;
        }
        IntervalCommands::Every { minutes } => {
            if !crate::reminders::is_valid_interval(minutes) {
                let options = INTERVAL_OPTIONS
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(Args::command()
                    .error(
                        clap::error::ErrorKind::ValueValidation,
                        format!("{minutes} is not a supported interval. Options are: {options}"),
                    )
                    .into());
            }
            interval.interval_minutes = minutes;
            config::save_interval(&settings, &interval).await?;
        }
    }
    let state = if interval.enabled {
        Colour::Green.paint("on")
    } else {
        Colour::Yellow.paint("off")
    };
    println!(
        "In-session reminders: {state}, every {}",
        format_elapsed(i64::from(interval.interval_minutes) * 60)
    );
    Ok(())
}

fn print_reminder(settings: &ReminderSettings) {
    let state = if settings.enabled {
        Colour::Green.paint("on")
    } else {
        Colour::Yellow.paint("off")
    };
    let days = if settings.days.is_empty() {
        "no days selected".to_string()
    } else {
        settings
            .days
            .iter()
            .map(|day| day.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    };
    println!(
        "Weekly reminder: {state} at {:02}:{:02} on {days}",
        settings.hour, settings.minute
    );
}

fn parse_weekday(value: &str) -> Result<Weekday, String> {
    value
        .parse()
        .map_err(|_| format!("{value:?} is not a day of the week. Use names like mon, tue, sun"))
}

fn parse_time_of_day(value: &str) -> Result<(u32, u32)> {
    match NaiveTime::parse_from_str(value, "%H:%M") {
        Ok(time) => Ok((time.hour(), time.minute())),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate time {value:?}: {e}"),
            )
            .into()),
    }
}

/// Delivers a test notification through the same path the daemon uses, waiting just long
/// enough for the two-second trigger to fire.
async fn send_test_notification() -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let shutdown = CancellationToken::new();
    let (platform, delivery) =
        DesktopPlatform::with_delivery(clock, NotifyRustSink, shutdown.clone());
    let scheduler = ReminderScheduler::new(Arc::new(platform));

    let delivery_task = tokio::spawn(delivery.run());
    scheduler.send_test().await?;
    tokio::time::sleep(Duration::from_secs(3)).await;
    shutdown.cancel();
    delivery_task.await??;

    println!("Test notification sent");
    Ok(())
}
