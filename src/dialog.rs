//! Modal markdown text dialog (help document, update log).

use std::time::Duration;
use tokio::time::Instant;

/// A markdown document shown over the pages.
///
/// With a countdown the dialog cannot be dismissed until it runs out, and
/// closes by itself when it does.
#[derive(Debug, Clone)]
pub struct TextDialog {
    source: &'static str,
    text: &'static str,
    countdown: Option<Duration>,
    opened: Instant,
    scroll: usize,
}

impl TextDialog {
    pub fn new(source: &'static str, text: &'static str, countdown: Option<Duration>) -> Self {
        Self {
            source,
            text,
            countdown,
            opened: Instant::now(),
            scroll: 0,
        }
    }

    /// Asset path the text came from.
    pub fn source(&self) -> &'static str {
        self.source
    }

    pub fn text(&self) -> &'static str {
        self.text
    }

    pub fn countdown(&self) -> Option<Duration> {
        self.countdown
    }

    /// Time left on the countdown, `None` once it ran out or without one.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let countdown = self.countdown?;
        let elapsed = now.saturating_duration_since(self.opened);
        countdown.checked_sub(elapsed).filter(|d| !d.is_zero())
    }

    pub fn can_dismiss(&self, now: Instant) -> bool {
        self.remaining(now).is_none()
    }

    /// True once a countdown dialog has run out.
    pub fn should_auto_close(&self, now: Instant) -> bool {
        self.countdown.is_some() && self.remaining(now).is_none()
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn scroll_down(&mut self, max: usize) {
        self.scroll = (self.scroll + 1).min(max);
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_countdown_blocks_dismiss_then_auto_closes() {
        let dialog = TextDialog::new("updateLog.md", "# Log", Some(Duration::from_secs(5)));
        let start = Instant::now();

        assert!(!dialog.can_dismiss(start));
        assert_eq!(
            dialog.remaining(start + Duration::from_secs(2)),
            Some(Duration::from_secs(3))
        );
        assert!(!dialog.should_auto_close(start + Duration::from_millis(4999)));
        assert!(dialog.should_auto_close(start + Duration::from_secs(5)));
        assert!(dialog.can_dismiss(start + Duration::from_secs(5)));
    }

    #[test]
    fn test_plain_dialog_dismissable_and_stays() {
        let dialog = TextDialog::new("help/appHelp.md", "# Help", None);
        let now = Instant::now();
        assert!(dialog.can_dismiss(now));
        assert!(!dialog.should_auto_close(now + Duration::from_secs(60)));
    }

    #[test]
    fn test_scroll_clamps() {
        let mut dialog = TextDialog::new("help/appHelp.md", "", None);
        dialog.scroll_up();
        assert_eq!(dialog.scroll(), 0);
        dialog.scroll_down(1);
        dialog.scroll_down(1);
        assert_eq!(dialog.scroll(), 1);
    }
}
