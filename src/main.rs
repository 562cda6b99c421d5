//! postscroll: page through a blog feed from the terminal, one "load more"
//! at a time.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌───────────┐ FetchRequest ┌───────────┐ effects ┌──────────┐ draw() ┌────────┐
//! │ worker.rs │ ◄─────────── │  app.rs   │ ──────► │ layout.rs│ ─────► │ ui.rs  │
//! │ (thread)  │ ───────────► │ (loader + │         │  (grid)  │        │(render)│
//! └───────────┘  WorkerMsg   │  filter)  │         └──────────┘        └────────┘
//!       │                    └───────────┘
//!       ▼                          ▲ handle_key_event()
//! ┌───────────┐              ┌───────────┐
//! │fetcher.rs │              │ input.rs  │
//! │ source/   │              └───────────┘
//! └───────────┘
//! ```
//!
//! * **`source/`**: the `Transport` trait, the HTTP transport, and the page
//!   parser that turns markup into `PostItem`s.
//! * **`fetcher`** / **`retry`**: cursor, page counter, bounded retries.
//! * **`worker`**: runs the fetcher on a background thread, on request.
//! * **`loader`**: the load-more state machine.
//! * **`filter`** / **`store`**: the active post type and its persistence.
//! * **`layout`**: the grid of appended posts and its filter predicate.
//! * **`announce`**: the live region for state-change messages.
//! * **`app`**: owns all state and applies loader effects.
//! * **`ui`** / **`input`**: rendering and key handling.
//! * **`main`**: parses flags, loads config, sets up logging and the
//!   terminal, and runs the event loop.

mod announce;
mod app;
mod config;
mod fetcher;
mod filter;
mod input;
mod layout;
mod loader;
mod retry;
mod source;
mod store;
mod ui;
mod worker;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use app::{App, AppOptions};
use config::{Config, LoadOptions, LogConfig};
use fetcher::PageFetcher;
use source::HttpTransport;
use store::{FileStore, KeyValueStore, MemoryStore};

// ---------------------------------------------------------------------------
// RAII terminal guard: restores the terminal even on panic
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
///
/// Constructing this struct enters raw mode + alternate screen.  When the
/// value is dropped (normally or during stack unwinding) it restores the
/// terminal.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Install a panic hook that restores the terminal before printing the
/// panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct CliArgs {
    config_file: Option<PathBuf>,
    start_url: Option<String>,
}

enum CliAction {
    Run(CliArgs),
    Exit,
}

fn handle_cli_flags(args: impl IntoIterator<Item = String>) -> Result<CliAction> {
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("postscroll {}", env!("CARGO_PKG_VERSION"));
                return Ok(CliAction::Exit);
            }
            "--help" | "-h" => {
                print_help();
                return Ok(CliAction::Exit);
            }
            "--config" | "-c" => {
                let path = args.next().context("--config needs a path")?;
                parsed.config_file = Some(PathBuf::from(path));
            }
            other if other.starts_with('-') => anyhow::bail!("unknown flag {other}"),
            url => parsed.start_url = Some(url.to_string()),
        }
    }

    Ok(CliAction::Run(parsed))
}

fn print_help() {
    let config_path = config::default_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(none)".into());
    println!(
        "postscroll: page through a blog feed from the terminal.\n\n\
         Usage: postscroll [OPTIONS] [START_URL]\n\n  \
         --config, -c <PATH>  Read configuration from PATH (default {config_path})\n  \
         --version, -V        Show version and exit\n  \
         --help,    -h        Show this help message\n\n\
         Set POSTSCROLL_LOG to override the log filter."
    );
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Log to a file; stdout belongs to the TUI.
fn init_logging(cfg: &LogConfig) -> Result<()> {
    let Some(path) = cfg.file.as_ref() else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("log: create directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("log: open {}", path.display()))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("POSTSCROLL_LOG").unwrap_or_else(|_| cfg.level.as_str().into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("log: install subscriber")?;
    Ok(())
}

fn open_store(cfg: &Config) -> Box<dyn KeyValueStore> {
    let Some(path) = cfg.storage.state_file.as_ref() else {
        warn!("no state file location, filter choice will not persist");
        return Box::new(MemoryStore::default());
    };
    match FileStore::open(path) {
        Ok(store) => {
            info!(path = %store.path().display(), "using state file");
            Box::new(store)
        }
        Err(err) => {
            warn!(error = %format!("{err:#}"), "state file unusable, filter choice will not persist");
            Box::new(MemoryStore::default())
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = match handle_cli_flags(std::env::args().skip(1))? {
        CliAction::Run(cli) => cli,
        CliAction::Exit => return Ok(()),
    };

    // -- configuration -------------------------------------------------------
    let mut cfg = config::load(LoadOptions {
        config_file: cli.config_file,
        env_prefix: None,
    })?;
    if let Some(url) = cli.start_url {
        cfg.feed.start_url = url;
    }
    init_logging(&cfg.log)?;

    let start = cfg.feed.start_url()?;
    let dev_mode = cfg.feed.dev_mode_for(&start);
    info!(url = %start, dev_mode, "starting postscroll");

    // -- fetching ------------------------------------------------------------
    let label = start.host_str().unwrap_or("feed").to_string();
    let transport = HttpTransport::new(label, dev_mode).context("http: build client")?;
    let fetcher = PageFetcher::new(transport, start, cfg.feed.retry_policy())
        .with_cache_busting(dev_mode);
    let worker = worker::spawn(fetcher);

    // -- terminal setup (Drop restores on exit or panic) ---------------------
    install_panic_hook();
    let mut guard = TerminalGuard::new()?;

    let options = AppOptions {
        dev_mode,
        retry_delay: cfg.feed.base_delay,
    };
    let mut app = App::new(open_store(&cfg), worker.requests.clone(), options, Instant::now());

    // The first page stands in for the server-rendered opening screen.
    app.load_more(Instant::now());

    // -- main event loop -----------------------------------------------------
    // Runs at ~10 fps (100 ms tick).  Each iteration:
    //   1. Apply any results from the fetch worker.
    //   2. Expire announcements, fire due retries.
    //   3. Render the UI.
    //   4. Poll for keyboard input (non-blocking, up to tick_rate).
    let tick_rate = Duration::from_millis(100);

    loop {
        while let Ok(msg) = worker.results.try_recv() {
            app.handle_worker_msg(msg, Instant::now());
        }

        app.tick(Instant::now());

        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                input::handle_key_event(&mut app, key, Instant::now());
            }
        }

        if app.quit {
            break;
        }
    }

    info!(
        posts = app.grid.items().len(),
        pages = app.loader().cached_pages(),
        feed_exhausted = app.loader().is_feed_exhausted(),
        "exiting"
    );
    // `guard` is dropped here, restoring the terminal.
    Ok(())
}
