mod app;
mod auth;
mod config;
mod deck;
mod inventory;
mod store;
mod theme;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::{App, Popup};
use config::AppConfig;
use deck::{CardGrid, GameSession};
use inventory::{Filter, ItemType, Location, Tracker};
use store::LocalStore;

#[derive(Parser, Debug)]
#[command(name = "pantry")]
#[command(version)]
#[command(about = "A terminal home inventory tracker with a word/icon memory game")]
struct Args {
    /// Print the grouped inventory as JSON
    #[arg(short, long)]
    list: bool,

    /// Type filter for --list: all, "Pantry Item" or Supply
    #[arg(short, long, default_value = "all", value_parser = parse_filter)]
    filter: Filter,

    /// Print a freshly shuffled deck as JSON
    #[arg(long)]
    deal: bool,

    /// Add an item with this name
    #[arg(short, long)]
    add: Option<String>,

    /// Remove the item with this id (works for malformed items too)
    #[arg(long, value_name = "ID")]
    remove: Option<String>,

    /// Quantity for --add
    #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
    quantity: i64,

    /// Location for --add (defaults to the configured one)
    #[arg(long, value_parser = parse_location)]
    location: Option<Location>,

    /// Item type for --add (defaults to the configured one)
    #[arg(long = "item-type", value_parser = parse_item_type)]
    item_type: Option<ItemType>,
}

fn parse_filter(s: &str) -> Result<Filter, String> {
    Filter::parse(s).ok_or_else(|| format!("unknown filter '{}'", s))
}

fn parse_location(s: &str) -> Result<Location, String> {
    Location::parse(s).ok_or_else(|| {
        let known: Vec<&str> = Location::ALL.iter().map(|l| l.as_str()).collect();
        format!("unknown location '{}' (expected one of: {})", s, known.join(", "))
    })
}

fn parse_item_type(s: &str) -> Result<ItemType, String> {
    ItemType::parse(s).ok_or_else(|| format!("unknown item type '{}'", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let tui = !(args.list || args.deal || args.add.is_some() || args.remove.is_some());

    let config = AppConfig::load()?;
    init_logging(tui, &config);

    ui::set_theme(theme::Theme::load(&config.theme));

    // Handle CLI-only commands
    if args.deal {
        return print_deal(&config);
    }

    if let Some(name) = args.add.as_deref() {
        let location = args.location.unwrap_or(config.default_location);
        let item_type = args.item_type.unwrap_or(config.default_item_type);
        return add_item(&config, name, args.quantity, location, item_type).await;
    }

    if let Some(id) = args.remove.as_deref() {
        return remove_item(&config, id).await;
    }

    if args.list {
        return print_list(&config, args.filter).await;
    }

    // Run TUI
    run_tui(&config).await
}

/// The TUI owns the terminal, so its logs go to a file
fn init_logging(tui: bool, config: &AppConfig) {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();

    let log_file = if tui {
        config
            .data_dir()
            .ok()
            .and_then(|dir| {
                std::fs::create_dir_all(&dir).ok()?;
                std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(dir.join("pantry.log"))
                    .ok()
            })
    } else {
        None
    };

    match log_file {
        Some(file) => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .with(env_filter)
            .init(),
        None => tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .with(env_filter)
            .init(),
    }
}

async fn open_tracker(config: &AppConfig) -> Result<Tracker<LocalStore>> {
    let auth = auth::sign_in(config.auth_token.as_deref());
    let data_dir = config.data_dir()?;
    let store = LocalStore::open(&data_dir)
        .with_context(|| format!("Could not open item store in {}", data_dir.display()))?;
    Ok(Tracker::new(store, config.collection_path(), auth.user_id))
}

async fn print_list(config: &AppConfig, filter: Filter) -> Result<()> {
    let mut tracker = open_tracker(config).await?;
    tracker.watch().await?;
    tracker.set_filter(filter);

    let output = serde_json::json!({
        "collection": config.collection_path().as_str(),
        "filter": filter.label(),
        "count": tracker.view().items().count(),
        "groups": tracker.view().groups,
        "skipped": tracker.skipped(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if !tracker.skipped().is_empty() {
        tracing::warn!(
            "{} malformed item(s) left out; remove them with --remove <ID>",
            tracker.skipped().len()
        );
    }

    tracker.close();
    Ok(())
}

fn print_deal(config: &AppConfig) -> Result<()> {
    let mut session = GameSession::new(config.pairs(), StdRng::from_entropy());
    let mut grid = CardGrid::new();
    session.initialize_game(&mut grid);

    println!("{}", serde_json::to_string_pretty(grid.cards())?);
    Ok(())
}

async fn add_item(
    config: &AppConfig,
    name: &str,
    quantity: i64,
    location: Location,
    item_type: ItemType,
) -> Result<()> {
    let tracker = open_tracker(config).await?;

    match tracker.add_item(name, quantity, location, item_type).await {
        Some(id) => {
            println!("{}", id);
            if config.notifications {
                let body = format!("Added {} x{} to {}", name.trim(), quantity, location);
                if let Err(e) = notify("pantry", &body) {
                    tracing::warn!("Notification failed: {}", e);
                }
            }
            Ok(())
        }
        None => anyhow::bail!("Item was not added (name must be non-empty and quantity positive)"),
    }
}

async fn remove_item(config: &AppConfig, id: &str) -> Result<()> {
    let tracker = open_tracker(config).await?;
    if !tracker.remove_item(id).await {
        anyhow::bail!("Could not remove {} (see log)", id);
    }
    println!("{}", id);
    Ok(())
}

async fn run_tui(config: &AppConfig) -> Result<()> {
    // Create app state before touching the terminal so errors print cleanly
    let mut app = App::new(config).await?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    app.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') if app.popup == Popup::None => return Ok(()),
                        KeyCode::Char('c') if key.modifiers.contains(event::KeyModifiers::CONTROL) => {
                            return Ok(())
                        }
                        _ => {
                            // Handle key and catch any errors to prevent crashes
                            if let Err(e) = app.handle_key(key).await {
                                tracing::error!("Key handling failed: {}", e);
                            }
                        }
                    }
                }
            }
        }

        // Pick up store snapshots
        app.tick().await;
    }
}

fn notify(summary: &str, body: &str) -> Result<()> {
    notify_rust::Notification::new()
        .summary(summary)
        .body(body)
        .icon("package")
        .show()?;
    Ok(())
}
