//! travelporto - a terminal client for Porto's STCP bus network.
//!
//! Look up stops and routes, print a stop's arrival board, or watch it
//! refresh with realtime predictions.

use std::io;

use anyhow::{Context, Result};
use chrono::Local;
use tokio::sync::mpsc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use travelporto_core::auth::ApiKeyStore;
use travelporto_core::models::{merge_arrivals, ArrivalKind, DisplayArrival, Stop};
use travelporto_core::utils::{format_eta, truncate_string};
use travelporto_core::{Config, SavedStops, StopBoard, TransitData};

/// Width of the headsign column on arrival boards
const HEADSIGN_WIDTH: usize = 28;

/// Updates buffered between the refresh loop and the printer
const UPDATE_CHANNEL_CAPACITY: usize = 8;

const USAGE: &str = "\
Usage: travelporto <command> [args]

Commands:
  stops [query]            List stops, or search them by name or id
  routes                   List routes
  route <id> [direction]   Show the stops of a route
  arrivals <stop>          Show a stop's arrival board
  watch <stop>             Show a stop's board and keep it refreshed
  index [stop]             Build the stop -> routes index
  save <stop>              Save a stop
  unsave <stop>            Remove a saved stop
  saved                    List saved stops
  set-key                  Store the API key in the OS keychain

Environment:
  TRAVELPORTO_API_BASE_URL, TRAVELPORTO_API_KEY, RUST_LOG";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr through a non-blocking writer; the returned guard must
/// be held until exit so buffered lines are flushed.
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("help");
    let arg = |i: usize| args.get(i).map(String::as_str);

    info!(command, "travelporto starting");

    match command {
        "set-key" => set_key(),
        "saved" => list_saved(),
        "unsave" => unsave(required(arg(1), "stop id")?),
        "help" | "-h" | "--help" => {
            println!("{}", USAGE);
            Ok(())
        }
        _ => {
            let config = Config::load()?;
            let data = TransitData::from_config(&config)?;
            match command {
                "stops" => list_stops(&data, arg(1)).await,
                "routes" => list_routes(&data).await,
                "route" => show_route(&data, required(arg(1), "route id")?, arg(2)).await,
                "arrivals" => show_arrivals(&data, required(arg(1), "stop id")?).await,
                "watch" => watch(&data, required(arg(1), "stop id")?).await,
                "index" => show_index(&data, arg(1)).await,
                "save" => save(&data, required(arg(1), "stop id")?).await,
                other => {
                    eprintln!("Unknown command: {}\n\n{}", other, USAGE);
                    std::process::exit(2);
                }
            }
        }
    }
}

fn required<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str> {
    value.ok_or_else(|| anyhow::anyhow!("Missing {}\n\n{}", what, USAGE))
}

fn print_stop(stop: &Stop) {
    let (latitude, longitude) = stop.position();
    println!(
        "{:<10} {:<40} {:<6} {:>9.5} {:>9.5}",
        stop.id,
        truncate_string(&stop.name, 40),
        stop.zone_id,
        latitude,
        longitude
    );
}

async fn list_stops(data: &TransitData, query: Option<&str>) -> Result<()> {
    let stops = match query {
        Some(query) => data.search_stops(query).await?,
        None => data.get_stops().await?.to_vec(),
    };
    if stops.is_empty() {
        eprintln!("No stops found");
    }
    for stop in &stops {
        print_stop(stop);
    }
    Ok(())
}

async fn list_routes(data: &TransitData) -> Result<()> {
    let routes = data.get_routes().await?;
    for route in routes.iter() {
        let headsigns: Vec<&str> = route.directions.iter().map(|d| d.headsign.as_str()).collect();
        println!(
            "{:<6} {:<40} {} on {}  {}",
            route.short_name,
            truncate_string(&route.long_name, 40),
            route.hex_text_color(),
            route.hex_color(),
            headsigns.join(" / ")
        );
    }
    Ok(())
}

async fn show_route(data: &TransitData, route_id: &str, direction: Option<&str>) -> Result<()> {
    let direction: Option<u32> = direction
        .map(|d| d.parse().with_context(|| format!("Invalid direction id: {}", d)))
        .transpose()?;

    let routes = data.get_routes().await?;
    let route = routes
        .iter()
        .find(|r| r.id == route_id || r.short_name == route_id)
        .ok_or_else(|| anyhow::anyhow!("Unknown route: {}", route_id))?;

    println!("{} - {}", route.short_name, route.long_name);
    for dir in route
        .directions
        .iter()
        .filter(|d| direction.map_or(true, |id| id == d.direction_id))
    {
        println!("\n→ {}", dir.headsign);
        let listing = data
            .get_route_direction_stops(&route.id, dir.direction_id, &dir.headsign)
            .await?;
        if let Some(stops) = listing.direction(dir.direction_id, &dir.headsign) {
            for item in stops.sorted_stops() {
                println!("  {:>3}  {:<10} {}", item.sequence, item.stop.id, item.stop.name);
            }
        }
    }
    Ok(())
}

fn print_arrivals(stop_id: &str, arrivals: &[DisplayArrival]) {
    let now = Local::now().time();
    println!("Arrivals at {} ({})", stop_id, now.format("%H:%M:%S"));
    if arrivals.is_empty() {
        println!("  No upcoming arrivals");
    }
    for arrival in arrivals {
        let live = match arrival.kind {
            ArrivalKind::Realtime => "●",
            ArrivalKind::Scheduled => " ",
        };
        println!(
            "  {} {:<6} {:<width$} {}  {:>7}",
            live,
            arrival.route_id,
            truncate_string(&arrival.headsign, HEADSIGN_WIDTH),
            arrival.display_time(),
            format_eta(arrival.minutes_until(now)),
            width = HEADSIGN_WIDTH,
        );
    }
}

fn print_board(board: &StopBoard) {
    print_arrivals(&board.stop_id, &board.arrivals);
    if let Some(e) = &board.realtime_error {
        eprintln!("  (realtime unavailable: {})", e);
    }
}

async fn show_arrivals(data: &TransitData, stop_id: &str) -> Result<()> {
    let board = data.get_stop_arrivals(stop_id).await?;
    print_board(&board);
    Ok(())
}

async fn watch(data: &TransitData, stop_id: &str) -> Result<()> {
    let board = data.get_stop_arrivals(stop_id).await?;
    print_board(&board);

    let (tx, mut rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
    let watch = data.watch_realtime_arrivals(stop_id, tx);
    let interest = watch.interest();
    eprintln!(
        "Refreshing {} every {}s, Ctrl+C to stop",
        watch.stop_id(),
        data.settings().refresh_interval.as_secs()
    );

    loop {
        tokio::select! {
            update = rx.recv() => {
                let Some(update) = update else { break };
                interest.apply(update, |update| {
                    println!();
                    print_arrivals(&update.stop_id, &merge_arrivals(&board.scheduled, &update.arrivals));
                });
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    watch.stop();
    Ok(())
}

async fn show_index(data: &TransitData, stop_id: Option<&str>) -> Result<()> {
    eprintln!("Building route index...");
    let index = data.wait_route_stop_index().await;
    match stop_id {
        Some(stop_id) => match index.routes_for_stop(stop_id) {
            Some(routes) => {
                let routes: Vec<&str> = routes.iter().map(String::as_str).collect();
                println!("{}: {}", stop_id, routes.join(", "));
            }
            None => println!("{}: no routes", stop_id),
        },
        None => println!("{}", serde_json::to_string_pretty(&*index)?),
    }
    Ok(())
}

fn saved_stops() -> Result<SavedStops> {
    Ok(SavedStops::load(Config::saved_stops_path()?))
}

async fn save(data: &TransitData, stop_id: &str) -> Result<()> {
    let stops = data.get_stops().await?;
    let stop = stops
        .iter()
        .find(|s| s.id == stop_id)
        .ok_or_else(|| anyhow::anyhow!("Unknown stop: {}", stop_id))?;

    let mut saved = saved_stops()?;
    if saved.add(stop.clone()) {
        saved.save()?;
        println!("Saved {}", stop.display_name());
    } else {
        println!("{} is already saved", stop.display_name());
    }
    Ok(())
}

fn unsave(stop_id: &str) -> Result<()> {
    let mut saved = saved_stops()?;
    if saved.remove(stop_id) {
        saved.save()?;
        println!("Removed {}", stop_id);
    } else {
        println!("{} was not saved", stop_id);
    }
    Ok(())
}

fn list_saved() -> Result<()> {
    let saved = saved_stops()?;
    if saved.list().is_empty() {
        println!("No saved stops");
    }
    for stop in saved.list() {
        print_stop(stop);
    }
    Ok(())
}

fn set_key() -> Result<()> {
    let key = rpassword::prompt_password("API key: ")?;
    ApiKeyStore::store(&key)?;
    println!("API key stored in the OS keychain");
    Ok(())
}
