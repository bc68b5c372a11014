use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use uuid::Uuid;

use signage::console::{render, ConsoleRenderer};
use signage::{
    load_snapshot, CalendarDate, Clock, DisplaySession, FixedClock,
    MonthlyView, RestRosterSource, RosterSource, SignageConfig,
    StaticRosterSource, SystemClock, View,
};

#[derive(Parser, Debug)]
#[command(name = "signage")]
#[command(about = "Rotating birthday display for TV signage", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a display session until interrupted
    Display {
        #[command(flatten)]
        args: MountArgs,

        /// Re-fetch the roster and re-sample the date every N seconds
        #[arg(long)]
        reload_every: Option<u64>,
    },

    /// Print today's and this month's honorees once
    Preview(MountArgs),
}

#[derive(Args, Debug)]
struct MountArgs {
    /// Organization whose roster is displayed
    #[arg(long)]
    org: Option<Uuid>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pretend today is MM-DD
    #[arg(long)]
    date: Option<CalendarDate>,

    /// Read the roster from a JSON file instead of the backend
    #[arg(long)]
    roster: Option<PathBuf>,
}

struct Mount {
    organization: Uuid,
    config: SignageConfig,
    source: Box<dyn RosterSource>,
    clock: Box<dyn Clock>,
}

fn mount(args: &MountArgs) -> Result<Mount> {
    let config = SignageConfig::load(args.config.as_deref())
        .context("Could not load configuration")?;

    let (source, organization) = match &args.roster {
        Some(path) => {
            let source = StaticRosterSource::from_file(path)?;
            (
                Box::new(source) as Box<dyn RosterSource>,
                args.org.unwrap_or_else(Uuid::nil),
            )
        }
        None => {
            let organization = args.org.ok_or_else(|| {
                anyhow!("--org is required when reading from the backend")
            })?;
            let source = RestRosterSource::from_config(&config)?;
            (Box::new(source) as Box<dyn RosterSource>, organization)
        }
    };

    let clock: Box<dyn Clock> = match args.date {
        Some(date) => Box::new(FixedClock(date)),
        None => Box::new(SystemClock::new(config.clock)),
    };

    Ok(Mount {
        organization,
        config,
        source,
        clock,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Display { args, reload_every } => {
            display(mount(&args)?, reload_every).await
        }
        Command::Preview(args) => preview(mount(&args)?).await,
    }
}

async fn display(mount: Mount, reload_every: Option<u64>) -> Result<()> {
    let snapshot =
        load_snapshot(mount.source.as_ref(), &mount.organization).await;
    let session = DisplaySession::start(
        &snapshot,
        mount.clock.today(),
        mount.config.dwell,
    )?;

    let renderer = Arc::new(ConsoleRenderer::new("console", std::io::stdout()));
    renderer.show(&session.view());
    session.subscribe(renderer);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping display");
        }
        result = refresh(&session, &mount, reload_every) => {
            result?;
        }
    }

    session.cancel();
    Ok(())
}

/// Keeps the session current across roster edits and day changes.
async fn refresh(
    session: &DisplaySession,
    mount: &Mount,
    reload_every: Option<u64>,
) -> Result<()> {
    let secs = match reload_every {
        Some(secs) if secs > 0 => secs,
        _ => return std::future::pending().await,
    };

    let mut ticks = tokio::time::interval(Duration::from_secs(secs));
    // the first tick completes immediately
    ticks.tick().await;
    loop {
        ticks.tick().await;
        match mount.source.fetch_roster(&mount.organization).await {
            Ok(snapshot) => {
                session.refresh(&snapshot, mount.clock.today())?;
            }
            Err(e) => warn!("Keeping current roster, reload failed: {}", e),
        }
    }
}

async fn preview(mount: Mount) -> Result<()> {
    let snapshot =
        load_snapshot(mount.source.as_ref(), &mount.organization).await;
    let today = mount.clock.today();

    let todays = snapshot.todays_honorees(today);
    let names: Vec<&str> = todays.iter().map(|e| e.name.as_str()).collect();
    println!("Today is {}", today);
    if names.is_empty() {
        println!("Nobody celebrates today");
    } else {
        println!("Celebrating today: {}", names.join(", "));
    }
    println!();

    let monthly = snapshot.monthly_honorees(today.month);
    print!("{}", render(&View::Monthly(MonthlyView::new(today.month, monthly))));
    Ok(())
}
