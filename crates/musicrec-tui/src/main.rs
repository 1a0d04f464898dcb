//! musicrec - a terminal dashboard for the musicrec recommendation service.
//!
//! Sign in with the music provider, browse personalized recommendations
//! and teach the model with likes and skips, all from the keyboard.

mod app;
mod ui;

use std::io;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use musicrec_core::{Config, Services};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log level when RUST_LOG is unset
const DEFAULT_LOG_FILTER: &str = "warn";

/// Rolling log file name, inside `<cache_dir>/musicrec/logs`
const LOG_FILE_NAME: &str = "musicrec.log";

const USAGE: &str = "\
Usage: musicrec [OPTION]

Without options, starts the terminal dashboard.

Options:
  --health    Check that the backend is reachable
  --status    Show the signed-in user and their stats
  --logout    End the saved session
  --help      Show this message";

/// Initialize the tracing subscriber for logging.
///
/// The terminal belongs to the TUI, so logs go to a daily rolling file.
/// The returned guard flushes the writer on drop and must outlive the app.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let log_dir = match config.cache_dir() {
        Ok(dir) => dir.join("logs"),
        Err(_) => return None,
    };
    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    Some(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: {:#}. Using defaults.", e);
        Config::default()
    });
    let _log_guard = init_tracing(&config);

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        None => run_tui(config).await,
        Some("--health") => check_health(&config).await,
        Some("--status") => show_status(&config).await,
        Some("--logout") => logout(&config).await,
        Some("--help") | Some("-h") => {
            println!("{}", USAGE);
            Ok(())
        }
        Some(other) => bail!("Unknown option '{}'\n\n{}", other, USAGE),
    }
}

async fn run_tui(config: Config) -> Result<()> {
    info!("musicrec starting");
    let services = Services::connect(&config).context("Failed to start services")?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(services, config.callback_wait());
    app.start();

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("musicrec shutting down");
    Ok(())
}

/// `--health`: print the backend health document.
async fn check_health(config: &Config) -> Result<()> {
    let services = Services::connect(config)?;
    match services.api.health_check().await {
        Some(health) => {
            println!("{}", serde_json::to_string_pretty(&health)?);
            Ok(())
        }
        None => bail!("Backend unreachable at {}", services.api.base_url()),
    }
}

/// `--status`: who is signed in, plus their stats and backend health.
async fn show_status(config: &Config) -> Result<()> {
    let services = Services::connect(config)?;
    println!("Backend: {}", services.api.base_url());

    let Some(user) = services.session.current_user() else {
        println!("Not signed in. Run musicrec to log in.");
        return Ok(());
    };
    println!("Signed in as {} ({})", user.greeting_name(), user.user_id);
    if let Some(ref email) = user.email {
        println!("Email: {}", email);
    }

    let (stats, health) =
        futures::future::join(services.api.fetch_stats(), services.api.health_check()).await;
    println!("Backend health: {}", if health.is_some() { "ok" } else { "unreachable" });
    match stats {
        Ok(stats) => {
            println!("Total songs:    {}", stats.total_songs);
            println!("Liked songs:    {}", stats.total_liked);
            println!("Total feedback: {}", stats.total_feedback);
            println!("Feedback liked: {}", stats.feedback_liked);
        }
        Err(e) if e.is_unauthorized() => {
            println!("Session expired. Run musicrec to log in again.");
        }
        Err(e) => {
            warn!(error = %e, "Failed to load stats");
            println!("Stats unavailable: {}", e);
        }
    }
    Ok(())
}

/// `--logout`: end the saved session.
async fn logout(config: &Config) -> Result<()> {
    let services = Services::connect(config)?;
    if !services.session.is_authenticated() {
        println!("No active session.");
        return Ok(());
    }
    services.session.logout().await;
    println!("Logged out.");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key) {
                    return Ok(());
                }
            }
        }

        // Pick up core events and finished background tasks
        app.check_background_tasks();

        // Check if we should quit
        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_filter_is_warn() {
        assert_eq!(EnvFilter::new(DEFAULT_LOG_FILTER).to_string(), "warn");
    }
}
