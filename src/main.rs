use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::KeyEventKind;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

mod app;
mod config;
mod db;
mod error;
mod feed;
mod import;
mod models;
mod sync;
mod tui;
mod web;

use app::App;
use config::Config;
use db::Repository;
use error::{AppError, Result};
use import::{find_book, BibleImporter, CANON};
use tui::{draw, handle_key_event};
use web::WebServer;

const USAGE: &str = "usage: renungan [sync | serve | import-bible <translation> [BOOK]]";

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str);

    // The TUI owns the terminal, so keep it quiet; headless modes log progress
    let level = if command.is_none() {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load()?;

    match command {
        None => run_console(&config).await,
        Some("sync") => {
            let mut app = App::new(&config).await?;
            let summary = app.sync_blocking().await?;
            println!("{}", summary.message);
            for error in &summary.errors {
                eprintln!("  {}", error);
            }
            Ok(())
        }
        Some("serve") => {
            let repository = Arc::new(Repository::new(&config.db_path).await?);
            WebServer::new(&config, repository)?.serve().await
        }
        Some("import-bible") => {
            let translation = args
                .get(2)
                .ok_or_else(|| AppError::Config(USAGE.to_string()))?;
            let books = match args.get(3) {
                Some(code) => {
                    let book = find_book(code)
                        .ok_or_else(|| AppError::Import(format!("unknown book code {:?}", code)))?;
                    std::slice::from_ref(book)
                }
                None => CANON,
            };

            let repository = Repository::new(&config.db_path).await?;
            let importer = BibleImporter::from_config(&repository, &config)?;
            let tally = importer.import(translation, books).await;
            println!(
                "Imported {} chapters ({} verses), {} skipped, {} failed",
                tally.imported_units, tally.verses, tally.skipped, tally.failed
            );
            println!(
                "{} verses stored for {}",
                repository.count_bible_verses(translation).await?,
                translation
            );
            Ok(())
        }
        Some(_) => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

async fn run_console(config: &Config) -> Result<()> {
    let mut app = App::new(config).await?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

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

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| draw(frame, app))?;

        // A sync requested on the previous turn runs now that its status is on screen
        app.run_pending_sync().await?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(action) = handle_key_event(key, app.show_help) {
                        let should_quit = app.handle_action(action).await?;
                        if should_quit {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
