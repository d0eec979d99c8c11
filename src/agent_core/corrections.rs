//! The "awaiting corrections" window.
//!
//! After the bot delivers a mandatory reply it keeps listening for a short
//! while, so a follow-up like "no, I meant tomorrow" is answered without the
//! user having to address the bot again.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowState {
    Closed,
    Until(Instant),
    /// The duration overflows `Instant`; the window never closes.
    Indefinite,
}

#[derive(Debug)]
pub struct CorrectionsWindow {
    duration: Duration,
    state: Mutex<WindowState>,
}

impl CorrectionsWindow {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            state: Mutex::new(WindowState::Closed),
        }
    }

    /// Open (or extend) the window from now.
    pub fn open(&self) {
        self.open_at(Instant::now());
    }

    pub fn is_open(&self) -> bool {
        self.is_open_at(Instant::now())
    }

    fn open_at(&self, now: Instant) {
        let next = match now.checked_add(self.duration) {
            Some(until) => WindowState::Until(until),
            None => WindowState::Indefinite,
        };
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    fn is_open_at(&self, now: Instant) -> bool {
        match *self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            WindowState::Closed => false,
            WindowState::Until(until) => now < until,
            WindowState::Indefinite => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_until_opened() {
        let window = CorrectionsWindow::new(Duration::from_secs(60));
        assert!(!window.is_open());
        window.open();
        assert!(window.is_open());
    }

    #[test]
    fn test_expires_after_duration() {
        let window = CorrectionsWindow::new(Duration::from_secs(60));
        let t0 = Instant::now();
        window.open_at(t0);
        assert!(window.is_open_at(t0 + Duration::from_secs(59)));
        assert!(!window.is_open_at(t0 + Duration::from_secs(60)));
    }

    #[test]
    fn test_reopen_extends() {
        let window = CorrectionsWindow::new(Duration::from_secs(60));
        let t0 = Instant::now();
        window.open_at(t0);
        window.open_at(t0 + Duration::from_secs(50));
        assert!(window.is_open_at(t0 + Duration::from_secs(100)));
    }

    #[test]
    fn test_huge_duration_stays_open() {
        let window = CorrectionsWindow::new(Duration::from_secs(u64::MAX));
        window.open();
        assert!(window.is_open());
        assert!(window.is_open_at(Instant::now() + Duration::from_secs(86_400 * 365)));
    }

    #[test]
    fn test_zero_duration_never_open() {
        let window = CorrectionsWindow::new(Duration::ZERO);
        window.open();
        assert!(!window.is_open());
    }
}
