use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::clock::Clock;
use crate::config::OfferTerms;
use crate::session::{OfferSession, Visibility};

const COARSE_STEP: i64 = 1_000;
const PAGE_STEP: i64 = 5_000;

/// Terminal front end state: the offer session plus the clock it reads.
pub struct App<C: Clock> {
    clock: C,
    pub session: OfferSession,
}

impl<C: Clock> App<C> {
    pub fn new(terms: OfferTerms, clock: C) -> Self {
        let session = OfferSession::start(terms, clock.now());
        Self { clock, session }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Periodic refresh. Returns the newly displayed remaining seconds when a
    /// refresh is scheduled.
    pub fn on_tick(&mut self) -> Option<u64> {
        let now = self.clock.now();
        self.session.tick(now)
    }

    pub fn on_focus(&mut self, gained: bool) {
        let next = if gained {
            Visibility::Active
        } else {
            Visibility::Background
        };
        let now = self.clock.now();
        self.session.set_visibility(next, now);
    }

    /// Returns true when the user asked to quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let coarse = key.modifiers.contains(KeyModifiers::SHIFT);
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Left | KeyCode::Char('h') => {
                let step = if coarse { COARSE_STEP } else { self.step() };
                self.session.nudge_amount(-step);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                let step = if coarse { COARSE_STEP } else { self.step() };
                self.session.nudge_amount(step);
            }
            KeyCode::Char('H') => self.session.nudge_amount(-COARSE_STEP),
            KeyCode::Char('L') => self.session.nudge_amount(COARSE_STEP),
            KeyCode::PageDown => self.session.nudge_amount(-PAGE_STEP),
            KeyCode::PageUp => self.session.nudge_amount(PAGE_STEP),
            KeyCode::Home => {
                let min = self.session.terms().min_amount();
                self.session.set_selected_amount(min as f64);
            }
            KeyCode::End => {
                let max = self.session.terms().max_amount();
                self.session.set_selected_amount(max as f64);
            }
            KeyCode::Tab | KeyCode::Down | KeyCode::Char('j') => {
                self.session.select_adjacent_tenure(1)
            }
            KeyCode::BackTab | KeyCode::Up | KeyCode::Char('k') => {
                self.session.select_adjacent_tenure(-1)
            }
            KeyCode::Char(c @ '1'..='9') => {
                let column = c as usize - '1' as usize;
                if let Some(&months) = self.session.terms().tenure_options().get(column) {
                    self.session.set_selected_tenure(months);
                }
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                let now = self.clock.now();
                self.session.restart(now);
            }
            _ => {}
        }
        false
    }

    fn step(&self) -> i64 {
        i64::try_from(self.session.terms().amount_step()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::session::RefreshState;
    use chrono::Duration;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app(clock: &ManualClock) -> App<&ManualClock> {
        App::new(OfferTerms::default(), clock)
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_760_000_000, 0).unwrap()
    }

    #[test]
    fn test_amount_keys() {
        let clock = ManualClock::new(t0());
        let mut app = app(&clock);

        app.handle_key(key(KeyCode::Right));
        assert_eq!(app.session.selected_amount(), 20_001);
        app.handle_key(KeyEvent::new(KeyCode::Left, KeyModifiers::SHIFT));
        assert_eq!(app.session.selected_amount(), 19_001);
        app.handle_key(key(KeyCode::Char('L')));
        assert_eq!(app.session.selected_amount(), 20_001);
        app.handle_key(key(KeyCode::PageUp));
        assert_eq!(app.session.selected_amount(), 25_001);
        app.handle_key(key(KeyCode::End));
        assert_eq!(app.session.selected_amount(), 50_000);
        app.handle_key(key(KeyCode::PageUp));
        assert_eq!(app.session.selected_amount(), 50_000);
        app.handle_key(key(KeyCode::Home));
        assert_eq!(app.session.selected_amount(), 10_000);
        app.handle_key(key(KeyCode::Char('h')));
        assert_eq!(app.session.selected_amount(), 10_000);
    }

    #[test]
    fn test_tenure_keys() {
        let clock = ManualClock::new(t0());
        let mut app = app(&clock);

        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.session.selected_tenure(), 6);
        app.handle_key(key(KeyCode::Char('3')));
        assert_eq!(app.session.selected_tenure(), 9);
        app.handle_key(key(KeyCode::Char('7')));
        assert_eq!(app.session.selected_tenure(), 9);
        app.handle_key(key(KeyCode::BackTab));
        assert_eq!(app.session.selected_tenure(), 6);
    }

    #[test]
    fn test_quit_keys() {
        let clock = ManualClock::new(t0());
        let mut app = app(&clock);
        assert!(!app.handle_key(key(KeyCode::Char('x'))));
        assert!(app.handle_key(key(KeyCode::Char('q'))));
        assert!(app.handle_key(key(KeyCode::Esc)));
        assert!(app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn test_focus_loss_pauses_and_resyncs() {
        let clock = ManualClock::new(t0());
        let mut app = app(&clock);

        clock.advance(Duration::seconds(5));
        assert_eq!(app.on_tick(), Some(3595));

        app.on_focus(false);
        clock.advance(Duration::minutes(20));
        assert_eq!(app.on_tick(), None);
        assert_eq!(app.session.displayed_seconds(), 3595);

        app.on_focus(true);
        assert_eq!(app.session.displayed_seconds(), 3600 - 5 - 1200);
        assert_eq!(app.session.refresh_state(), RefreshState::Active);
    }

    #[test]
    fn test_restart_key_opens_new_window() {
        let clock = ManualClock::new(t0());
        let mut app = app(&clock);
        app.handle_key(key(KeyCode::End));

        clock.advance(Duration::hours(2));
        assert_eq!(app.on_tick(), Some(0));
        assert_eq!(app.session.refresh_state(), RefreshState::Expired);

        app.handle_key(key(KeyCode::Char('r')));
        assert_eq!(app.session.selected_amount(), 20_000);
        assert_eq!(app.session.expiry(), clock.now() + Duration::hours(1));
        assert_eq!(app.on_tick(), Some(3600));
    }

    #[test]
    fn test_closed_session_stops_ticking() {
        let clock = ManualClock::new(t0());
        let mut app = app(&clock);
        app.session.close();
        clock.advance(Duration::seconds(1));
        assert_eq!(app.on_tick(), None);
        assert_eq!(app.session.next_refresh(), None);
    }
}
