use std::fmt::Display;

use ansi_term::Style;
use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use now::DateTimeNow;

use super::Args;
use crate::{
    store::SessionStore,
    utils::time::{date_string, format_elapsed},
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl DateStyle {
    fn dialect(self) -> chrono_english::Dialect {
        match self {
            DateStyle::Uk => chrono_english::Dialect::Uk,
            DateStyle::Us => chrono_english::Dialect::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DateStyle::Uk => "uk",
            DateStyle::Us => "us",
        })
    }
}

#[derive(Debug, Parser)]
pub struct HistoryCommand {
    #[arg(
        long = "start",
        short,
        help = "First day of the report. Accepts \"yesterday\", \"3 days ago\", \"15/03/2025\" and similar. Defaults to the beginning of this week"
    )]
    start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = "Last day of the report. Accepts the same forms as --start. Defaults to today"
    )]
    end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Order of day and month in numeric dates. Uk is day/month/year, Us is month/day/year")]
    date_style: DateStyle,
}

/// Prints completed work per day over a date range, one line per day with a bold total at the
/// end. Days without completed sessions are simply absent.
pub async fn process_history_command(
    HistoryCommand {
        start_date,
        end_date,
        date_style,
    }: HistoryCommand,
    store: &dyn SessionStore,
) -> Result<()> {
    let (start, end) = parse_range(start_date, end_date, date_style, Local::now())?;

    let summaries = store.day_summaries(start, end).await?;
    if summaries.is_empty() {
        println!(
            "No completed sessions between {} and {}",
            date_string(start),
            date_string(end)
        );
        return Ok(());
    }

    let total: i64 = summaries.iter().map(|summary| summary.duration).sum();
    for summary in &summaries {
        println!(
            "{}\t{}",
            date_string(summary.date),
            format_elapsed(summary.duration)
        );
    }
    println!();
    println!(
        "{}\t{}",
        Style::new().bold().paint("total"),
        format_elapsed(total)
    );
    Ok(())
}

fn parse_range(
    start_date: Option<String>,
    end_date: Option<String>,
    date_style: DateStyle,
    now: DateTime<Local>,
) -> Result<(NaiveDate, NaiveDate)> {
    let start = match start_date {
        Some(text) => parse_bound(&text, date_style, now, "start")?,
        None => now.beginning_of_week().date_naive(),
    };
    let end = match end_date {
        Some(text) => parse_bound(&text, date_style, now, "end")?,
        None => now.date_naive(),
    };
    if end < start {
        return Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!(
                    "End date {} is before start date {}",
                    date_string(end),
                    date_string(start)
                ),
            )
            .into());
    }
    Ok((start, end))
}

fn parse_bound(
    text: &str,
    date_style: DateStyle,
    now: DateTime<Local>,
    which: &str,
) -> Result<NaiveDate> {
    match parse_date_string(text, now, date_style.dialect()) {
        Ok(parsed) => Ok(parsed.date_naive()),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate {which} date {e}"),
            )
            .into()),
    }
}
