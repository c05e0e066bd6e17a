//! Interactive TUI mode.
//!
//! Three pieces run side by side:
//!
//! 1. the snapshot engine's background refresh loop,
//! 2. a keyboard task that polls crossterm and forwards key presses,
//! 3. the main event loop, which redraws every tick and applies keys to [`App`].
//!
//! A shared `CancellationToken` stops the keyboard task; the engine is
//! stopped explicitly on the way out.

mod app;
mod layout;
mod theme;
mod ui;

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use portman_core::{Config, ReadOptions, SystemEngine};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use app::{Action, App};
use theme::Theme;

/// Events delivered to the main loop.
#[derive(Debug)]
enum Event {
    Key(KeyEvent),
    Resize(u16, u16),
}

/// Settings for one interactive session.
pub struct TuiOptions {
    pub scope: ReadOptions,
    pub poll_interval: Duration,
    pub hide_borders: bool,
}

type Term = Terminal<CrosstermBackend<Stdout>>;

fn setup_terminal() -> Result<Term> {
    enable_raw_mode().context("Failed to enable raw mode")?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;

    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

/// Restore the terminal. Called on every exit path, including errors.
fn cleanup_terminal(terminal: &mut Term) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Poll crossterm on the blocking pool and forward key presses.
fn spawn_keyboard_task(
    event_tx: mpsc::UnboundedSender<Event>,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while !cancel_token.is_cancelled() {
            let polled = tokio::task::spawn_blocking(|| {
                if event::poll(Duration::from_millis(50)).unwrap_or(false) {
                    event::read().ok()
                } else {
                    None
                }
            })
            .await;

            let event = match polled {
                // Ignore key release/repeat reports from terminals that send them.
                Ok(Some(CrosstermEvent::Key(key))) if key.kind == KeyEventKind::Press => {
                    Event::Key(key)
                }
                Ok(Some(CrosstermEvent::Resize(width, height))) => Event::Resize(width, height),
                Ok(_) => continue,
                Err(e) => {
                    error!(error = %e, "Keyboard polling task panicked");
                    break;
                }
            };

            if event_tx.send(event).is_err() {
                debug!("Event channel closed, keyboard task exiting");
                break;
            }
        }
    })
}

async fn run_event_loop(
    terminal: &mut Term,
    app: &mut App,
    engine: &SystemEngine,
    theme: &Theme,
    event_rx: &mut mpsc::UnboundedReceiver<Event>,
    tick_rate: Duration,
) -> Result<()> {
    loop {
        app.sync(engine.snapshot());
        app.set_stats(engine.stats());
        app.tick(Instant::now());
        terminal.draw(|frame| ui::draw(frame, app, theme))?;

        let event = match tokio::time::timeout(tick_rate, event_rx.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => {
                debug!("Event channel closed");
                break;
            }
            // Tick: redraw with whatever the engine has published.
            Err(_) => continue,
        };

        match event {
            Event::Key(key) => match app.handle_key(key) {
                Action::None => {}
                Action::Quit => {
                    info!("User requested quit");
                    break;
                }
                Action::Refresh => {
                    let result = engine.refresh().await;
                    app.finish_refresh(result);
                }
                Action::Kill(target) => {
                    info!(pid = target.pid, name = %target.name, "Killing process");
                    let result = engine.kill(target.pid).await;
                    if let Err(ref e) = result {
                        error!(pid = target.pid, error = %e, "Kill failed");
                    }
                    app.finish_kill(&target, result);
                    // Show the socket disappearing without waiting for the next poll.
                    if let Err(e) = engine.refresh().await {
                        debug!(error = %e, "Refresh after kill failed");
                    }
                }
            },
            Event::Resize(width, height) => {
                debug!(width, height, "Terminal resized");
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Run the interactive view until the user quits.
pub async fn run(config: &Config, options: TuiOptions) -> Result<()> {
    let engine = Arc::new(SystemEngine::system().with_kill_timeout(config.kill_timeout()));
    engine.start(options.poll_interval).await;
    if let Some(e) = engine.last_error() {
        info!(error = %e, "Starting with an empty view");
    }

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let cancel_token = CancellationToken::new();

    let mut terminal = match setup_terminal() {
        Ok(t) => t,
        Err(e) => {
            engine.stop();
            error!(error = %e, "Failed to initialize terminal");
            return Err(e);
        }
    };

    let mut app = App::new(options.scope, config.status_duration());
    let theme = Theme::new(options.hide_borders);
    let keyboard_handle = spawn_keyboard_task(event_tx, cancel_token.clone());

    let result = run_event_loop(
        &mut terminal,
        &mut app,
        &engine,
        &theme,
        &mut event_rx,
        config.tick_interval(),
    )
    .await;

    cancel_token.cancel();
    engine.stop();
    let _ = tokio::time::timeout(Duration::from_millis(100), keyboard_handle).await;

    if let Err(e) = cleanup_terminal(&mut terminal) {
        error!(error = %e, "Failed to cleanup terminal");
    }

    info!("Portman TUI stopped");
    result
}
