//! Main event loop for the TUI.
//!
//! Multiplexes terminal input, background task events, a periodic tick and
//! Unix signals, and drives the shell lifecycle: pause on focus loss and
//! before exit, destroy on exit.

use crate::app::{App, AppEvent};
use anyhow::Result;
use crossterm::{
    cursor::MoveTo,
    event::{DisableFocusChange, EnableFocusChange, Event, EventStream, KeyEventKind},
    execute,
    style::Print,
    terminal::{
        disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use futures::{Stream, StreamExt};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::future::Future;
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

use super::events::handle_app_event;
use super::input::handle_input;
use super::render::render;

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Result of handling a key press event.
pub enum Action {
    /// Continue the event loop and process more events.
    Continue,
    /// Exit the application and restore the terminal.
    Quit,
    /// Step aside while read aloud keeps playing; any key returns.
    Background,
}

/// Runs the TUI application event loop.
///
/// Uses `tokio::select!` to multiplex:
/// - **Signals**: SIGTERM/SIGINT end the loop like a quit
/// - **Terminal input**: keys, focus changes and resizes
/// - **Background tasks**: maintenance results via the `AppEvent` channel
/// - **Periodic tick**: 250ms timer for status expiry and the dialog countdown
///
/// Installs a panic hook that restores the terminal before unwinding.
pub async fn run(app: &mut App, mut event_rx: mpsc::Receiver<AppEvent>) -> Result<()> {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableFocusChange, LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;
    let mut event_stream = EventStream::new();
    let mut tick_interval = tokio::time::interval(Duration::from_millis(250));
    let mut signals = Signals::install()?;

    loop {
        if app.needs_redraw {
            terminal.draw(|f| render(f, app))?;
            app.needs_redraw = false;
        }

        // Drain pending task results before more input
        while let Ok(event) = event_rx.try_recv() {
            app.needs_redraw = true;
            handle_app_event(app, event).await;
        }

        tokio::select! {
            biased;

            name = signals.recv() => {
                tracing::info!(signal = name, "Received signal, shutting down gracefully");
                break;
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind != KeyEventKind::Release => {
                        app.needs_redraw = true;
                        match handle_input(app, key.code, key.modifiers).await {
                            Ok(Action::Quit) => break,
                            Ok(Action::Continue) => {}
                            Ok(Action::Background) => {
                                app.shell.on_pause();
                                match suspend(&mut terminal, &mut event_stream, &mut signals).await? {
                                    Resume::KeyPressed => app.needs_redraw = true,
                                    Resume::Shutdown(name) => {
                                        tracing::info!(signal = name, "Received signal in background, shutting down");
                                        break;
                                    }
                                    Resume::InputClosed => break,
                                }
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Input handling failed");
                                app.set_status(format!("Error: {e:#}"));
                            }
                        }
                    }
                    Some(Ok(Event::FocusLost)) => {
                        tracing::debug!("Terminal focus lost");
                        app.shell.on_pause();
                    }
                    Some(Ok(Event::Resize(_, _))) => app.needs_redraw = true,
                    Some(Err(e)) => tracing::warn!(error = %e, "Terminal event error"),
                    None => break,
                    _ => {}
                }
            }

            Some(event) = event_rx.recv() => {
                app.needs_redraw = true;
                handle_app_event(app, event).await;
            }

            _ = tick_interval.tick() => {
                if app.tick(Instant::now()) {
                    app.needs_redraw = true;
                }
            }
        }
    }

    app.shell.on_pause();
    app.shell.on_destroy();
    restore_terminal(terminal)?;
    Ok(())
}

/// SIGTERM and SIGINT, or nothing off Unix.
struct Signals {
    #[cfg(unix)]
    term: Signal,
    #[cfg(unix)]
    int: Signal,
}

impl Signals {
    fn install() -> Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            term: signal(SignalKind::terminate())?,
            #[cfg(unix)]
            int: signal(SignalKind::interrupt())?,
        })
    }

    /// Resolves with the name of the next termination signal.
    async fn recv(&mut self) -> &'static str {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.term.recv() => "SIGTERM",
                _ = self.int.recv() => "SIGINT",
            }
        }
        #[cfg(not(unix))]
        {
            std::future::pending().await
        }
    }
}

/// How a background suspension ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resume {
    KeyPressed,
    Shutdown(&'static str),
    InputClosed,
}

/// Wait for a key press, giving way to `shutdown` if it resolves first.
async fn wait_for_return<S, F>(events: &mut S, shutdown: F) -> Resume
where
    S: Stream<Item = io::Result<Event>> + Unpin,
    F: Future<Output = &'static str>,
{
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            biased;

            name = &mut shutdown => return Resume::Shutdown(name),

            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    return Resume::KeyPressed;
                }
                Some(_) => {}
                None => return Resume::InputClosed,
            },
        }
    }
}

/// Leave the alternate screen until the next key press or a termination
/// signal. The alternate screen is only restored on a key press.
async fn suspend(
    terminal: &mut Tui,
    events: &mut EventStream,
    signals: &mut Signals,
) -> Result<Resume> {
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        Clear(ClearType::All),
        MoveTo(0, 0),
        Print("quire is running in the background. Press any key to return.")
    )?;
    tracing::info!("Moved to background");

    let resume = wait_for_return(events, signals.recv()).await;
    if resume == Resume::KeyPressed {
        execute!(terminal.backend_mut(), EnterAlternateScreen)?;
        terminal.clear()?;
        tracing::info!("Returned from background");
    }
    Ok(resume)
}

/// Set up the terminal for TUI rendering.
fn setup_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal to normal state.
fn restore_terminal(mut terminal: Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use futures::stream;

    fn key(kind: KeyEventKind) -> io::Result<Event> {
        Ok(Event::Key(KeyEvent::new_with_kind(
            KeyCode::Char('x'),
            KeyModifiers::NONE,
            kind,
        )))
    }

    #[tokio::test]
    async fn test_signal_ends_background_wait() {
        let mut events = stream::pending::<io::Result<Event>>();
        let resume = wait_for_return(&mut events, async { "SIGTERM" }).await;
        assert_eq!(resume, Resume::Shutdown("SIGTERM"));
    }

    #[tokio::test]
    async fn test_key_press_returns_from_background() {
        let mut events = stream::iter(vec![
            Ok(Event::FocusLost),
            key(KeyEventKind::Release),
            key(KeyEventKind::Press),
        ]);
        let resume = wait_for_return(&mut events, std::future::pending()).await;
        assert_eq!(resume, Resume::KeyPressed);
    }

    #[tokio::test]
    async fn test_closed_input_ends_background_wait() {
        let mut events = stream::iter(vec![key(KeyEventKind::Release)]);
        let resume = wait_for_return(&mut events, std::future::pending()).await;
        assert_eq!(resume, Resume::InputClosed);
    }
}
