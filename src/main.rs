use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use table_booking::booking::{self, BookingError};
use table_booking::config;
use table_booking::db;
use table_booking::model::Restaurant;

#[derive(Debug, Parser)]
#[command(author, version, about = "Restaurant table availability and booking")]
struct Cli {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print an example config file
    InitConfig,
    /// Register a restaurant with its opening hours (UTC)
    AddRestaurant {
        #[arg(long)]
        name: String,
        #[arg(long)]
        opening: u32,
        #[arg(long)]
        closing: u32,
    },
    /// Add a table to a restaurant
    AddTable {
        #[arg(long)]
        restaurant: i64,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        capacity: u32,
    },
    /// List restaurants and their tables
    Restaurants,
    /// Show the first table free for a request
    Check(RequestArgs),
    /// Book the first table free for a request
    Book(RequestArgs),
    /// Expected diners on a day
    Diners(DayArgs),
    /// Bookings starting on a day
    Bookings(DayArgs),
}

#[derive(Debug, clap::Args)]
struct RequestArgs {
    #[arg(long)]
    restaurant: i64,
    /// Requested start, RFC 3339 (e.g. 2015-02-14T20:00:00Z)
    #[arg(long)]
    at: DateTime<Utc>,
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    people: u32,
    /// Slot length in minutes; defaults to booking.default_slot_minutes
    #[arg(long)]
    slot: Option<i64>,
}

#[derive(Debug, clap::Args)]
struct DayArgs {
    #[arg(long)]
    restaurant: i64,
    /// Day as YYYY-MM-DD
    #[arg(long)]
    day: NaiveDate,
}

async fn find_restaurant(pool: &db::Pool, id: i64) -> Result<Restaurant> {
    db::get_restaurant(pool, id)
        .await?
        .ok_or_else(|| anyhow!("restaurant {} not found", id))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    if let Command::InitConfig = cli.command {
        print!("{}", config::example());
        return Ok(());
    }

    let cfg = config::load(Some(&cli.config))?;
    cfg.ensure_dirs()?;
    let default_slot = cfg.booking.default_slot_minutes;

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;

    match cli.command {
        Command::InitConfig => {}
        Command::AddRestaurant {
            name,
            opening,
            closing,
        } => {
            let r = db::create_restaurant(&pool, &name, opening, closing).await?;
            info!(id = r.id, "restaurant created");
            println!("{}", serde_json::to_string(&r)?);
        }
        Command::AddTable {
            restaurant,
            capacity,
        } => {
            let t = db::create_table(&pool, restaurant, capacity).await?;
            info!(id = t.id, restaurant, "table created");
            println!("{}", serde_json::to_string(&t)?);
        }
        Command::Restaurants => {
            for entry in db::list_restaurants(&pool).await? {
                let r = &entry.restaurant;
                println!(
                    "#{} {} {:02}:00-{:02}:00 tables={} seats={}",
                    r.id,
                    r.name,
                    r.opening_hour,
                    r.closing_hour,
                    entry.tables.len(),
                    entry.total_seats()
                );
                for t in &entry.tables {
                    println!("  table #{} capacity={}", t.id, t.capacity);
                }
            }
        }
        Command::Check(req) => {
            let r = find_restaurant(&pool, req.restaurant).await?;
            let slot = req.slot.unwrap_or(default_slot);
            match booking::get_first_table_available(&pool, &r, req.at, req.people, Some(slot))
                .await?
            {
                Some(t) => println!("{}", serde_json::to_string(&t)?),
                None => println!("no table available"),
            }
        }
        Command::Book(req) => {
            let r = find_restaurant(&pool, req.restaurant).await?;
            let slot = req.slot.unwrap_or(default_slot);
            match booking::book_restaurant_table(&pool, &r, req.at, req.people, Some(slot)).await {
                Ok(confirmation) => println!("{}", serde_json::to_string_pretty(&confirmation)?),
                Err(BookingError::Unavailable) => {
                    warn!(restaurant = r.id, at = %req.at, people = req.people, "booking refused");
                    return Err(anyhow!("no table available"));
                }
                Err(BookingError::Store(err)) => return Err(err),
            }
        }
        Command::Diners(day) => {
            let r = find_restaurant(&pool, day.restaurant).await?;
            let diners = booking::get_expected_diners(&pool, &r, day.day).await?;
            println!("{diners}");
        }
        Command::Bookings(day) => {
            let r = find_restaurant(&pool, day.restaurant).await?;
            for b in booking::list_day_bookings(&pool, &r, day.day).await? {
                println!(
                    "#{} table={} people={} {} - {}",
                    b.id,
                    b.table_id,
                    b.people,
                    b.start_at.format("%H:%M"),
                    b.end_at.format("%H:%M")
                );
            }
        }
    }

    Ok(())
}
