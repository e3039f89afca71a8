//! Double-press detection for reselection shortcuts and exit confirmation.

use std::time::Duration;
use tokio::time::Instant;

/// Detects a second press arriving within a fixed window of the first.
///
/// A press outside the window is recorded and reported as a first press.
/// A press inside the window is reported as confirmed. A window built with
/// [`TapWindow::new`] then clears the record, so every confirmation needs a
/// fresh pair of presses. One built with [`TapWindow::sticky`] keeps it, and
/// later presses confirm until the window runs out.
#[derive(Debug, Clone)]
pub struct TapWindow {
    window: Duration,
    last: Option<Instant>,
    consume: bool,
}

impl TapWindow {
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            last: None,
            consume: true,
        }
    }

    /// Confirmations leave the recorded press in place.
    pub const fn sticky(window: Duration) -> Self {
        Self {
            window,
            last: None,
            consume: false,
        }
    }

    /// Register a press at `now`. Returns true when it confirms a previous press.
    pub fn tap(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) <= self.window => {
                if self.consume {
                    self.last = None;
                }
                true
            }
            _ => {
                self.last = Some(now);
                false
            }
        }
    }

    /// Forget any recorded press.
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(300);

    #[test]
    fn test_first_tap_only_records() {
        let mut w = TapWindow::new(WINDOW);
        assert!(!w.tap(Instant::now()));
    }

    #[test]
    fn test_second_tap_inside_window_confirms() {
        let mut w = TapWindow::new(WINDOW);
        let t0 = Instant::now();
        assert!(!w.tap(t0));
        assert!(w.tap(t0 + Duration::from_millis(120)));
    }

    #[test]
    fn test_boundary_counts_as_inside() {
        let mut w = TapWindow::new(WINDOW);
        let t0 = Instant::now();
        w.tap(t0);
        assert!(w.tap(t0 + WINDOW));
    }

    #[test]
    fn test_second_tap_outside_window_rerecords() {
        let mut w = TapWindow::new(WINDOW);
        let t0 = Instant::now();
        w.tap(t0);
        assert!(!w.tap(t0 + Duration::from_millis(301)));
        // The late tap became the new first press
        assert!(w.tap(t0 + Duration::from_millis(400)));
    }

    #[test]
    fn test_confirmation_consumes_the_pair() {
        let mut w = TapWindow::new(WINDOW);
        let t0 = Instant::now();
        w.tap(t0);
        assert!(w.tap(t0 + Duration::from_millis(100)));
        assert!(!w.tap(t0 + Duration::from_millis(150)));
    }

    #[test]
    fn test_sticky_keeps_first_press() {
        let mut w = TapWindow::sticky(WINDOW);
        let t0 = Instant::now();
        assert!(!w.tap(t0));
        assert!(w.tap(t0 + Duration::from_millis(100)));
        assert!(w.tap(t0 + Duration::from_millis(250)));
        // Measured from the recorded press, not the last confirmation
        assert!(!w.tap(t0 + Duration::from_millis(350)));
        assert!(w.tap(t0 + Duration::from_millis(400)));
    }

    #[test]
    fn test_reset_forgets_press() {
        let mut w = TapWindow::new(WINDOW);
        let t0 = Instant::now();
        w.tap(t0);
        w.reset();
        assert!(!w.tap(t0 + Duration::from_millis(10)));
    }
}
