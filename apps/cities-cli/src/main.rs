//! cities-cli: drive the Record and Session stores from a terminal.
//!
//! ```bash
//! cities-cli list
//! cities-cli add --name Lisbon --country Portugal --emoji 🇵🇹 --lat 38.72 --lng -9.14
//! cities-cli remove 73930385 --selected 73930385   # refused: city is selected
//! cities-cli login --email test@example.com --password qwerty
//! ```
//!
//! Exits with status 1 when the Record Store ends in an error state.

use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use cities_client::{
    HttpCollection, RecordState, RecordStore, SessionStore, StaticCredentials, BASE_URL,
};
use clap::{Parser, Subcommand};
use domain::{City, NewCity, Position, RecordId};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cities-cli")]
#[command(about = "WorldWise cities: list, add and remove visited cities", long_about = None)]
struct Cli {
    /// Root URL of the collection endpoint
    #[arg(long, default_value = BASE_URL)]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every stored city
    List,
    /// Print one city
    Show { id: String },
    /// Store a new city
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        country: String,
        #[arg(long, default_value = "")]
        emoji: String,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Visit date as RFC 3339 (default: now)
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete a city
    Remove {
        id: String,
        /// Select this city first; removing the selected city is refused
        #[arg(long)]
        selected: Option<String>,
    },
    /// Sign in with the demo account
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Login { email, password } = &cli.command {
        let session = SessionStore::<StaticCredentials>::default();
        session.login(email, password).await;
        let state = session.snapshot();
        match state.user {
            Some(user) => println!("signed in as {} <{}>", user.name, user.email),
            None => println!("not signed in"),
        }
        return Ok(ExitCode::SUCCESS);
    }

    let remote = HttpCollection::new(&cli.base_url)
        .with_context(|| format!("invalid --base-url '{}'", cli.base_url))?;
    let store = RecordStore::load(remote).await;

    match cli.command {
        Commands::List => {
            let state = store.snapshot();
            for city in &state.cities {
                println!("{}", city_line(city));
            }
        }
        Commands::Show { id } => {
            store.get_one(&RecordId::parse(&id)?).await;
            if let Some(city) = store.snapshot().current_city {
                println!("{}", city_details(&city));
            }
        }
        Commands::Add {
            name,
            country,
            emoji,
            notes,
            lat,
            lng,
            date,
        } => {
            let date = visit_date(date.as_deref())?;
            store
                .create(NewCity {
                    city_name: name,
                    country,
                    emoji,
                    date,
                    notes,
                    position: Position { lat, lng },
                })
                .await;
            let state = store.snapshot();
            if let (true, Some(city)) = (state.error.is_empty(), state.cities.last()) {
                println!("added {}", city_line(city));
            }
        }
        Commands::Remove { id, selected } => {
            if let Some(selected) = selected {
                store.get_one(&RecordId::parse(&selected)?).await;
            }
            let id = RecordId::parse(&id)?;
            let message = removal_message(&store.snapshot(), &id);
            store.remove(&id).await;
            if store.snapshot().error.is_empty() {
                println!("{message}");
            }
        }
        Commands::Login { .. } => {}
    }

    let state = store.snapshot();
    if failed(&state) {
        eprintln!("{}", state.error);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn failed(state: &RecordState) -> bool {
    !state.error.is_empty()
}

/// What `remove` will do to `id` given the state before the call.
fn removal_message(before: &RecordState, id: &RecordId) -> String {
    if before.is_selected(id) {
        format!("kept {id}: it is the selected city")
    } else {
        format!("removed {id}")
    }
}

/// Validate a user-supplied visit date, or stamp the current time.
fn visit_date(input: Option<&str>) -> Result<String> {
    match input {
        Some(s) => {
            DateTime::parse_from_rfc3339(s)
                .with_context(|| format!("--date '{s}' is not an RFC 3339 timestamp"))?;
            Ok(s.to_string())
        }
        None => Ok(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    }
}

/// Long human date, e.g. `Sunday, October 31, 2027`. Unparseable input is
/// shown as stored.
fn format_date(date: &str) -> String {
    DateTime::parse_from_rfc3339(date)
        .map(|d| d.format("%A, %B %-d, %Y").to_string())
        .unwrap_or_else(|_| date.to_string())
}

fn city_line(city: &City) -> String {
    let flag = if city.emoji.is_empty() { "  " } else { &city.emoji };
    format!(
        "{flag} {} ({}) {} [{}]",
        city.city_name,
        city.country,
        format_date(&city.date),
        city.id
    )
}

fn city_details(city: &City) -> String {
    let mut out = format!(
        "{} {}\ncountry: {}\nvisited: {}\nposition: {}, {}",
        city.emoji,
        city.city_name,
        city.country,
        format_date(&city.date),
        city.position.lat,
        city.position.lng
    );
    if !city.notes.is_empty() {
        out.push_str(&format!("\nnotes: {}", city.notes));
    }
    out
}
