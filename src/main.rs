use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use instance_scheduler::presentation::cli::commands::{PeriodCommand, ScheduleCommand, TickCommand, UsageCommand};
use instance_scheduler::presentation::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("instance_scheduler=debug,info")
    } else {
        EnvFilter::new("instance_scheduler=info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Period(command) => PeriodCommand::execute(&cli.db, command).await?,
        Commands::Schedule(command) => ScheduleCommand::execute(&cli.db, command).await?,
        Commands::Usage { name, from, to, format, output } => {
            UsageCommand::execute(&cli.db, &name, &from, &to, format, output).await?
        }
        Commands::Tick { account, region, schedule, current_tick } => {
            TickCommand::execute(&cli.db, &account, &region, &schedule, current_tick).await?
        }
    }

    Ok(())
}
