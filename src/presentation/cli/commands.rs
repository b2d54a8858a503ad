//! Command execution
//!
//! One `execute` per subcommand group, each opening the SQLite-backed
//! stores at the configured path and delegating to the domain/application
//! layers. Kept thin: argument parsing and output rendering only, no
//! scheduling logic lives here.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveTime;

use crate::application::ports::{resolve_timezone, Clock, SystemClock};
use crate::application::services::usage_accounting;
use crate::application::use_cases::run_orchestrator_tick;
use crate::domain::entities::{Period, PeriodRef, Schedule};
use crate::domain::repositories::{DefinitionStore, ResourceRegistry};
use crate::domain::value_objects::ScheduleState;
use crate::infrastructure::clients::DemoCloud;
use crate::infrastructure::config::OrchestratorConfig;
use crate::infrastructure::output::{CsvGenerator, JsonGenerator};
use crate::infrastructure::repositories::{InMemoryResourceRegistry, SqliteDefinitionStore};

use super::{CliScheduleState, PeriodCommands, ReportFormat, ScheduleCommands};

fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").with_context(|| format!("'{s}' is not an HH:MM time"))
}

fn parse_set(s: &str) -> Result<BTreeSet<u32>> {
    s.split(',')
        .map(|p| p.trim().parse::<u32>().with_context(|| format!("'{p}' is not a number")))
        .collect()
}

fn parse_period_ref(s: &str) -> PeriodRef {
    match s.split_once(':') {
        Some((name, target_type)) => PeriodRef::with_target_type(name, target_type),
        None => PeriodRef::new(s),
    }
}

pub struct PeriodCommand;

impl PeriodCommand {
    pub async fn execute(db: &Path, command: PeriodCommands) -> Result<()> {
        let store = SqliteDefinitionStore::open(db)?;
        match command {
            PeriodCommands::Add {
                name,
                begin,
                end,
                weekdays,
                monthdays,
                months,
                description,
                overwrite,
            } => {
                let mut builder = Period::builder(name.as_str());
                if let Some(b) = begin {
                    builder = builder.begin_time(parse_time(&b)?);
                }
                if let Some(e) = end {
                    builder = builder.end_time(parse_time(&e)?);
                }
                if let Some(w) = weekdays {
                    builder = builder.weekdays(parse_set(&w)?);
                }
                if let Some(m) = monthdays {
                    builder = builder.monthdays(parse_set(&m)?);
                }
                if let Some(m) = months {
                    builder = builder.months(parse_set(&m)?);
                }
                if let Some(d) = description {
                    builder = builder.description(d);
                }
                let period = builder.build()?;
                store.put_period(period, overwrite).await?;
                println!("period '{name}' saved");
            }
            PeriodCommands::List => {
                let periods = store.list_periods().await?;
                for (name, period) in periods {
                    println!(
                        "{name}: begin={:?} end={:?} weekdays={:?} monthdays={:?} months={:?}",
                        period.begin_time, period.end_time, period.weekdays, period.monthdays, period.months
                    );
                }
            }
            PeriodCommands::Remove { name } => {
                store.delete_period(&name).await?;
                println!("period '{name}' removed");
            }
        }
        Ok(())
    }
}

pub struct ScheduleCommand;

impl ScheduleCommand {
    pub async fn execute(db: &Path, command: ScheduleCommands) -> Result<()> {
        let store = SqliteDefinitionStore::open(db)?;
        match command {
            ScheduleCommands::Add {
                name,
                timezone,
                periods,
                enforced,
                retain_running,
                hibernate,
                no_stop_new_instances,
                use_maintenance_window,
                override_status,
                description,
                overwrite,
            } => {
                let tz = resolve_timezone(&timezone)?;
                let mut builder = Schedule::builder(name.as_str(), tz)
                    .enforced(enforced)
                    .retain_running(retain_running)
                    .hibernate(hibernate)
                    .stop_new_instances(!no_stop_new_instances)
                    .use_maintenance_window(use_maintenance_window);
                for period in periods {
                    builder = builder.period_ref(parse_period_ref(&period));
                }
                if let Some(state) = override_status {
                    builder = builder.override_status(match state {
                        CliScheduleState::Running => ScheduleState::Running,
                        CliScheduleState::Stopped => ScheduleState::Stopped,
                    });
                }
                if let Some(d) = description {
                    builder = builder.description(d);
                }
                let schedule = builder.build()?;
                store.put_schedule(schedule, overwrite).await?;
                println!("schedule '{name}' saved");
            }
            ScheduleCommands::List => {
                let schedules = store.list_schedules().await?;
                for (name, schedule) in schedules {
                    println!(
                        "{name}: tz={} periods={} enforced={} retain_running={}",
                        schedule.timezone,
                        schedule.period_refs.len(),
                        schedule.enforced,
                        schedule.retain_running
                    );
                }
            }
            ScheduleCommands::Remove { name } => {
                store.delete_schedule(&name).await?;
                println!("schedule '{name}' removed");
            }
        }
        Ok(())
    }
}

pub struct UsageCommand;

impl UsageCommand {
    pub async fn execute(db: &Path, name: &str, from: &str, to: &str, format: ReportFormat, output: Option<PathBuf>) -> Result<()> {
        let store = SqliteDefinitionStore::open(db)?;
        let schedule = store
            .get_schedule(name)
            .await?
            .with_context(|| format!("no such schedule '{name}'"))?;
        let periods = store.list_periods().await?;

        let d0 = chrono::NaiveDate::parse_from_str(from, "%Y-%m-%d").context("--from is not YYYY-MM-DD")?;
        let d1 = chrono::NaiveDate::parse_from_str(to, "%Y-%m-%d").context("--to is not YYYY-MM-DD")?;
        if d0 > d1 {
            bail!("--from must not be after --to");
        }

        let report = usage_accounting::compute(&schedule, &periods, d0, d1);

        let rendered = match format {
            ReportFormat::Json => JsonGenerator::new().generate_string(&report)?,
            ReportFormat::Csv => CsvGenerator::new().generate_string(&report)?,
        };

        match output {
            Some(path) => std::fs::write(&path, rendered).with_context(|| format!("failed to write {}", path.display()))?,
            None => println!("{rendered}"),
        }
        Ok(())
    }
}

pub struct TickCommand;

impl TickCommand {
    pub async fn execute(db: &Path, account: &str, region: &str, schedule_name: &str, current_tick: u64) -> Result<()> {
        let definition_store: Arc<dyn DefinitionStore> = Arc::new(SqliteDefinitionStore::open(db)?);
        if definition_store.get_schedule(schedule_name).await?.is_none() {
            bail!("schedule '{schedule_name}' does not exist; create it with `schedule add` first");
        }

        let demo = DemoCloud::new();
        let mut tags = std::collections::BTreeMap::new();
        tags.insert("Schedule".to_string(), schedule_name.to_string());
        demo.seed_ec2("i-demo-web-1", account, region, "t3.medium", true, tags.clone());
        demo.seed_ec2("i-demo-web-2", account, region, "t3.medium", false, tags.clone());
        demo.seed_rds_instance(
            format!("arn:aws:rds:{region}:{account}:db:demo-orders"),
            account,
            region,
            "db.t3.medium",
            true,
            tags,
        );

        let registry: Arc<dyn ResourceRegistry> = Arc::new(InMemoryResourceRegistry::new());
        let identity_broker = Arc::new(demo.broker());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let config = OrchestratorConfig::default()
            .with_enabled_services(vec!["ec2".to_string(), "rds".to_string()])
            .with_accounts(vec![account.to_string()])
            .with_regions(vec![region.to_string()]);

        let summary = run_orchestrator_tick::run(definition_store, registry, identity_broker, clock, config, current_tick).await;
        println!("{}", JsonGenerator::new().generate_string(&summary)?);
        Ok(())
    }
}
