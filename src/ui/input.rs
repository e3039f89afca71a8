//! Input handling for the TUI.
//!
//! Keys go to whatever is on top: the text dialog, then the help overlay,
//! then the shell (navigation entries, paging, back key) and finally the
//! current page.

use crate::app::App;
use crate::keybindings::{Action as KbAction, Context as KbContext};
use crate::pages::{PageCommand, PageContext};
use crate::shell::{BackOutcome, TabSelection};
use crate::util::unix_now;
use anyhow::{Context as _, Result};
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::time::Instant;

use super::dialog::dialog_line_count;
use super::Action;

/// Main input dispatch function.
pub(super) async fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
) -> Result<Action> {
    if app.dialog.is_some() {
        handle_dialog_input(app, code, modifiers);
        return Ok(Action::Continue);
    }

    if app.show_help {
        return Ok(handle_help_input(app, code));
    }

    let context = KbContext::for_tab(app.shell.current_tab());
    let Some(action) = app.keybindings.action_for_key(code, modifiers, context) else {
        return Ok(Action::Continue);
    };
    let now = Instant::now();

    match action {
        KbAction::Quit => return Ok(Action::Quit),
        KbAction::Back => return Ok(handle_back(app, now)),
        KbAction::NextPage => {
            app.shell.next_page();
        }
        KbAction::PrevPage => {
            app.shell.prev_page();
        }
        KbAction::ShowHelp => {
            app.show_help = true;
            app.help_scroll_offset = 0;
        }
        KbAction::GotoBookshelf
        | KbAction::GotoDiscovery
        | KbAction::GotoRss
        | KbAction::GotoSettings => {
            if let Some(tab) = action.tab() {
                if app.shell.select_tab(tab, now) == TabSelection::Ignored {
                    app.set_status(format!("{} is hidden in settings", tab.label()));
                }
            }
        }
        _ => {
            let ctx = PageContext {
                library: &app.library,
                prefs: &app.prefs,
                styles: &app.theme,
                now: unix_now(),
            };
            let command = app.shell.current_page().handle_action(action, &ctx);
            if let Some(command) = command {
                run_page_command(app, command).await?;
            }
        }
    }
    Ok(Action::Continue)
}

fn handle_back(app: &mut App, now: Instant) -> Action {
    match app.shell.on_back(now) {
        BackOutcome::JumpedToBookshelf => Action::Continue,
        BackOutcome::ExitHint => {
            app.set_status("Press back again to exit");
            Action::Continue
        }
        BackOutcome::Finish => Action::Quit,
        BackOutcome::Background => Action::Background,
    }
}

/// Dialog keys. Dismissal is refused while an update-log countdown runs.
fn handle_dialog_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    let action = app
        .keybindings
        .action_for_key(code, modifiers, KbContext::Dialog);

    match action {
        Some(KbAction::DismissDialog) => {
            let now = Instant::now();
            if !app.dismiss_dialog(now) {
                let left = app
                    .dialog
                    .as_ref()
                    .and_then(|d| d.remaining(now))
                    .map_or(0, |d| d.as_secs() + 1);
                app.set_status(format!("Closes in {left}s"));
            }
        }
        Some(KbAction::ScrollDown) => {
            if let Some(dialog) = app.dialog.as_mut() {
                let max = dialog_line_count(dialog.text()).saturating_sub(1);
                dialog.scroll_down(max);
            }
        }
        Some(KbAction::ScrollUp) => {
            if let Some(dialog) = app.dialog.as_mut() {
                dialog.scroll_up();
            }
        }
        _ => {}
    }
}

/// Handle input while the help overlay is visible.
///
/// Captures all keys: j/k/Up/Down scroll, Esc/q/? dismiss.
fn handle_help_input(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
            app.show_help = false;
            app.help_scroll_offset = 0;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_sub(1);
        }
        _ => {}
    }
    Action::Continue
}

/// Carry out what a page asked for.
pub(super) async fn run_page_command(app: &mut App, command: PageCommand) -> Result<()> {
    match command {
        PageCommand::SetPreference { key, value, notify } => {
            app.set_preference(key, &value, notify)
                .await
                .with_context(|| format!("Failed to save {key}"))?;
        }
        PageCommand::OpenBook { id, name } => {
            app.db
                .clear_book_update(id)
                .await
                .context("Failed to update book")?;
            app.reload_library().await?;
            tracing::info!(book_id = id, "Book opened");
            app.set_status(format!("Opened {name}"));
        }
        PageCommand::RefreshBooks => {
            if app.refreshing {
                app.set_status("Refresh already running");
            } else {
                app.refreshing = true;
                app.maintenance.refresh_all_tocs();
                app.set_status("Checking books for updates...");
            }
        }
        PageCommand::Status(message) => app.set_status(message),
    }
    Ok(())
}
