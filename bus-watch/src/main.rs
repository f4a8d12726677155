use std::env;
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::EnvFilter;

use bus_watch::domain::{IdName, Line, Stop};
use bus_watch::notify::LogNotificationSink;
use bus_watch::store::{MemoryStopStore, StopStore};
use bus_watch::timeo::{TimeoClient, TimeoConfig};
use bus_watch::watch::{StopWatcher, TickScheduler, WatchConfig};

/// Tick gate for the watch loop: the engine flips it off once nothing is
/// watched anymore, which ends the loop.
#[derive(Default)]
struct FlagScheduler {
    enabled: AtomicBool,
}

impl TickScheduler for FlagScheduler {
    fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = TimeoConfig::new();
    if let Ok(network) = env::var("TIMEO_NETWORK") {
        match network.parse() {
            Ok(code) => config = config.with_network_code(code),
            Err(_) => {
                eprintln!("TIMEO_NETWORK must be a network code like 147");
                return ExitCode::FAILURE;
            }
        }
    }

    let client = match TimeoClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let args: Vec<String> = env::args().skip(1).collect();
    let result = match args.iter().map(String::as_str).collect::<Vec<_>>()[..] {
        ["lines"] => list_lines(&client).await,
        ["stops", line, direction] => list_stops(&client, line, direction).await,
        ["schedule", line, direction, stop_name] => {
            show_schedule(&client, line, direction, stop_name).await
        }
        ["watch", line, direction, stop_name] => {
            watch_stop(&client, line, direction, stop_name).await
        }
        ["alert"] => show_alert(&client).await,
        _ => {
            usage();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn usage() {
    println!("bus-watch: realtime bus schedules from the console");
    println!();
    println!("Usage:");
    println!("  bus-watch lines                              List every line variant");
    println!("  bus-watch stops <line> <direction>           List the stops of a line");
    println!("  bus-watch schedule <line> <direction> <stop> Next buses at a stop");
    println!("  bus-watch watch <line> <direction> <stop>    Notify when the bus nears");
    println!("  bus-watch alert                              Current network-wide alert");
    println!();
    println!("Set TIMEO_NETWORK to target another network (default 147, Caen).");
}

async fn list_lines(client: &TimeoClient) -> Result<(), Box<dyn Error>> {
    let lines = client.get_lines().await?;

    for line in &lines {
        println!(
            "{:>4} {}  ({} → {})",
            line.details.id, line.color, line.details.name, line.direction.name
        );
    }
    println!("{} line variants", lines.len());

    Ok(())
}

async fn list_stops(
    client: &TimeoClient,
    line_id: &str,
    direction_id: &str,
) -> Result<(), Box<dyn Error>> {
    let stops = client.get_stops(&line_ref(line_id, direction_id)).await?;

    for stop in &stops {
        println!("{:>6} {}  [ref {}]", stop.id, stop.name, stop.reference);
    }
    println!("{} stops", stops.len());

    Ok(())
}

async fn show_schedule(
    client: &TimeoClient,
    line_id: &str,
    direction_id: &str,
    stop_name: &str,
) -> Result<(), Box<dyn Error>> {
    let stop = resolve_stop(client, line_id, direction_id, stop_name).await?;
    let schedule = client.get_single_schedule(&stop).await?;

    println!("{}", schedule.stop);

    if let Some(title) = &schedule.message_title {
        println!("⚠ {title}");
        if let Some(body) = &schedule.message_body {
            println!("  {body}");
        }
        return Ok(());
    }

    if schedule.entries.is_empty() {
        println!("No upcoming buses.");
    }
    for entry in &schedule.entries {
        println!(
            "  {}  {}",
            entry.schedule_time.format("%H:%M"),
            entry.direction
        );
    }

    Ok(())
}

async fn show_alert(client: &TimeoClient) -> Result<(), Box<dyn Error>> {
    match client.global_traffic_alert().await {
        Some(alert) => println!("⚠ {} ({})", alert.label, alert.url),
        None => println!("No network-wide alert right now."),
    }
    Ok(())
}

async fn watch_stop(
    client: &TimeoClient,
    line_id: &str,
    direction_id: &str,
    stop_name: &str,
) -> Result<(), Box<dyn Error>> {
    let stop = resolve_stop(client, line_id, direction_id, stop_name).await?;
    println!("Watching {stop}. Ctrl-C to give up.");

    let store = Arc::new(MemoryStopStore::new());
    store.add_stop(&stop)?;

    let scheduler = Arc::new(FlagScheduler::default());
    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel();

    let config = WatchConfig::default();
    let period = config.check_interval;

    let watcher = StopWatcher::new(
        client.clone(),
        store.clone() as Arc<dyn StopStore>,
        Arc::new(LogNotificationSink),
        scheduler.clone() as Arc<dyn TickScheduler>,
        config,
    )
    .with_events(events_tx);

    watcher.watch(&stop)?;

    let mut interval = tokio::time::interval(period);
    while scheduler.enabled.load(Ordering::SeqCst) {
        interval.tick().await;
        watcher.check_now().await?;

        while let Ok(event) = events_rx.try_recv() {
            if !event.watched {
                println!("Done watching {}.", event.stop);
            }
        }
    }

    Ok(())
}

/// Build the line variant the listing endpoints key on.
fn line_ref(line_id: &str, direction_id: &str) -> Line {
    Line::new(
        IdName::new(line_id, format!("Ligne {line_id}")),
        IdName::new(direction_id, ""),
        "#000000",
    )
}

/// Find a stop of a line by (case-insensitive) name.
async fn resolve_stop(
    client: &TimeoClient,
    line_id: &str,
    direction_id: &str,
    stop_name: &str,
) -> Result<Stop, Box<dyn Error>> {
    let stops = client.get_stops(&line_ref(line_id, direction_id)).await?;
    let wanted = stop_name.to_lowercase();

    stops
        .into_iter()
        .find(|s| s.name.to_lowercase() == wanted)
        .ok_or_else(|| format!("no stop named {stop_name:?} on line {line_id}").into())
}
