//! CLI argument surface (§4.9, presentation layer)
//!
//! `period`/`schedule` manage the definition library, `usage` reports
//! billed running time for a schedule over a date range, and `tick` drives
//! one orchestrator pass against a small built-in demo fleet so the engine
//! is exercisable without real cloud credentials.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "instance-scheduler")]
#[command(version)]
#[command(about = "Fleet-wide start/stop scheduling engine for cloud VMs, databases, and auto-scaling groups", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, help = "Verbose logging")]
    pub verbose: bool,

    #[arg(long, value_name = "FILE", default_value = "scheduler.db", global = true, help = "SQLite definition/registry store")]
    pub db: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(subcommand, about = "Manage the period library")]
    Period(PeriodCommands),

    #[command(subcommand, about = "Manage the schedule library")]
    Schedule(ScheduleCommands),

    #[command(about = "Report billed running time for a schedule over a date range")]
    Usage {
        #[arg(long, help = "Schedule name")]
        name: String,

        #[arg(long, value_name = "YYYY-MM-DD")]
        from: String,

        #[arg(long, value_name = "YYYY-MM-DD")]
        to: String,

        #[arg(long, value_enum, default_value = "json")]
        format: ReportFormat,

        #[arg(short, long, value_name = "FILE", help = "Write to a file instead of stdout")]
        output: Option<PathBuf>,
    },

    #[command(about = "Run one orchestrator tick against the built-in demo fleet")]
    Tick {
        #[arg(long, default_value = "111111111111")]
        account: String,

        #[arg(long, default_value = "us-east-1")]
        region: String,

        #[arg(long, default_value = "business-hours", help = "Schedule name to bind the demo resources to")]
        schedule: String,

        #[arg(long, default_value_t = 0, help = "Tick counter passed to the decision procedure and registry pruning")]
        current_tick: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum PeriodCommands {
    #[command(about = "Define a new time period")]
    Add {
        #[arg(long)]
        name: String,

        #[arg(long, value_name = "HH:MM", help = "Daily start time (local)")]
        begin: Option<String>,

        #[arg(long, value_name = "HH:MM", help = "Daily end time (local)")]
        end: Option<String>,

        #[arg(long, value_name = "0,1,2", help = "Weekdays, Monday = 0")]
        weekdays: Option<String>,

        #[arg(long, value_name = "1,15", help = "Days of the month, 1-31")]
        monthdays: Option<String>,

        #[arg(long, value_name = "1,6,12", help = "Months, 1-12")]
        months: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long, help = "Overwrite an existing period with the same name")]
        overwrite: bool,
    },

    #[command(about = "List all periods")]
    List,

    #[command(about = "Remove a period")]
    Remove {
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ScheduleCommands {
    #[command(about = "Define a new schedule")]
    Add {
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "UTC", help = "IANA time zone")]
        timezone: String,

        #[arg(long = "period", value_name = "NAME[:INSTANCE_TYPE]", help = "Repeat to reference multiple periods")]
        periods: Vec<String>,

        #[arg(long)]
        enforced: bool,

        #[arg(long)]
        retain_running: bool,

        #[arg(long)]
        hibernate: bool,

        #[arg(long, help = "Leave newly-discovered resources running instead of stopping them on first sight")]
        no_stop_new_instances: bool,

        #[arg(long)]
        use_maintenance_window: bool,

        #[arg(long, value_enum, help = "Force the schedule to always resolve to this state")]
        override_status: Option<CliScheduleState>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long, help = "Overwrite an existing schedule with the same name")]
        overwrite: bool,
    },

    #[command(about = "List all schedules")]
    List,

    #[command(about = "Remove a schedule")]
    Remove {
        #[arg(long)]
        name: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliScheduleState {
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReportFormat {
    Json,
    Csv,
}
