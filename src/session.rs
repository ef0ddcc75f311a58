//! Offer session state.
//!
//! An [`OfferSession`] owns the user's current selection and the countdown
//! for one offer window. The countdown is anchored to an absolute expiry
//! instant; every read recomputes the remaining time from that instant and
//! the caller-supplied "now", so nothing drifts while the host is not
//! delivering ticks.
//!
//! The periodic display refresh is modelled as a small state machine:
//!
//! ```text
//!   Active --(inactive/background)--> Suspended
//!   Suspended --(active, resync)----> Active      (if time remains)
//!   Active|Suspended --(remaining == 0)--> Expired (terminal until restart)
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::OfferTerms;
use crate::pricing;

/// Lifecycle state reported by the host for the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Active,
    Inactive,
    Background,
}

impl Visibility {
    pub fn is_suspended(self) -> bool {
        matches!(self, Visibility::Inactive | Visibility::Background)
    }
}

/// State of the periodic countdown refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Active,
    Suspended,
    Expired,
}

/// One column of the tenure table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OfferRow {
    pub months: u32,
    pub installment: u64,
    pub total_repayment: u64,
}

/// Everything the host renders, as plain values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferSnapshot {
    pub selected_amount: u64,
    pub selected_tenure: u32,
    pub min_amount: u64,
    pub max_amount: u64,
    pub annual_rate_percent: f64,
    pub rows: Vec<OfferRow>,
    pub remaining_seconds: u64,
    pub countdown: String,
    pub expired: bool,
    pub expires_at: DateTime<Utc>,
}

/// Cancellable repeating refresh. At most one is ever running.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct RefreshTimer {
    running: bool,
}

impl RefreshTimer {
    /// Returns false if the timer was already running.
    fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        true
    }

    fn stop(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }
}

#[derive(Debug, Clone)]
pub struct OfferSession {
    terms: OfferTerms,
    selected_amount: u64,
    selected_tenure: u32,
    expiry: DateTime<Utc>,
    displayed_seconds: u64,
    visibility: Visibility,
    refresh: RefreshTimer,
    expired: bool,
}

impl OfferSession {
    /// Opens a fresh offer window ending `offer_window` after `now`.
    pub fn start(terms: OfferTerms, now: DateTime<Utc>) -> Self {
        let mut session = Self {
            selected_amount: terms.default_amount(),
            selected_tenure: terms.default_tenure(),
            expiry: now,
            displayed_seconds: 0,
            visibility: Visibility::Active,
            refresh: RefreshTimer::default(),
            expired: false,
            terms,
        };
        session.restart(now);
        session
    }

    /// Discards the current window and selection and begins a new offer.
    pub fn restart(&mut self, now: DateTime<Utc>) {
        self.selected_amount = self.terms.default_amount();
        self.selected_tenure = self.terms.default_tenure();
        self.expiry = now
            .checked_add_signed(self.terms.offer_window())
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.expired = false;
        self.displayed_seconds = self.remaining_seconds(now);
        self.refresh.stop();
        if !self.visibility.is_suspended() {
            self.refresh.start();
        }
        tracing::info!(
            expires_at = %self.expiry,
            amount = self.selected_amount,
            tenure = self.selected_tenure,
            "offer session started"
        );
    }

    pub fn terms(&self) -> &OfferTerms {
        &self.terms
    }

    pub fn selected_amount(&self) -> u64 {
        self.selected_amount
    }

    pub fn selected_tenure(&self) -> u32 {
        self.selected_tenure
    }

    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Clamps `value` into the offer bounds and snaps it to the amount step.
    pub fn set_selected_amount(&mut self, value: f64) {
        let min = self.terms.min_amount();
        let max = self.terms.max_amount();
        let step = self.terms.amount_step();

        let value = if value.is_nan() {
            min as f64
        } else {
            value.clamp(min as f64, max as f64)
        };
        let steps = ((value - min as f64) / step as f64).round() as u64;
        let snapped = min.saturating_add(steps.saturating_mul(step)).min(max);
        // max is always selectable even when the step does not divide the range
        self.selected_amount = if (max as f64 - value) < (value - snapped as f64).abs() {
            max
        } else {
            snapped
        };
    }

    /// Moves the amount by `delta` currency units, as a keyboard slider would.
    pub fn nudge_amount(&mut self, delta: i64) {
        let target = self.selected_amount as i128 + i128::from(delta);
        self.set_selected_amount(target as f64);
    }

    /// Selects `months` if it is one of the offered tenures. Anything else
    /// leaves the selection as it was.
    pub fn set_selected_tenure(&mut self, months: u32) -> bool {
        if !self.terms.tenure_options().contains(&months) {
            tracing::debug!(months, "ignoring tenure outside the offer");
            return false;
        }
        self.selected_tenure = months;
        true
    }

    /// Moves the selection `offset` columns through the tenure table,
    /// stopping at either end.
    pub fn select_adjacent_tenure(&mut self, offset: isize) {
        let options = self.terms.tenure_options();
        let current = options
            .iter()
            .position(|&m| m == self.selected_tenure)
            .unwrap_or(0);
        let last = options.len() - 1;
        let next = current.saturating_add_signed(offset).min(last);
        self.selected_tenure = options[next];
    }

    /// Installment and total for every tenure, in offer order, at the
    /// current amount.
    pub fn derived_rows(&self) -> Vec<OfferRow> {
        self.terms
            .tenure_options()
            .iter()
            .map(|&months| self.row_for(months))
            .collect()
    }

    pub fn selected_row(&self) -> OfferRow {
        self.row_for(self.selected_tenure)
    }

    fn row_for(&self, months: u32) -> OfferRow {
        let installment =
            pricing::compute_installment(self.selected_amount, months, self.terms.periodic_rate());
        OfferRow {
            months,
            installment,
            total_repayment: pricing::compute_total(installment, months),
        }
    }

    /// Position of the amount between the bounds, in `[0, 1]`.
    pub fn fill_ratio(&self) -> f64 {
        let span = self.terms.max_amount() - self.terms.min_amount();
        if span == 0 {
            return 1.0;
        }
        (self.selected_amount - self.terms.min_amount()) as f64 / span as f64
    }

    /// Whole seconds left in the window, rounded up, never negative.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        let left = self.expiry - now;
        if left <= Duration::zero() {
            return 0;
        }
        let whole = left.num_seconds();
        let partial = left > Duration::seconds(whole);
        (whole + i64::from(partial)) as u64
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expired || self.remaining_seconds(now) == 0
    }

    /// Last value pushed to the display by a tick or a resync.
    pub fn displayed_seconds(&self) -> u64 {
        self.displayed_seconds
    }

    pub fn refresh_state(&self) -> RefreshState {
        if self.expired {
            RefreshState::Expired
        } else if self.refresh.running {
            RefreshState::Active
        } else {
            RefreshState::Suspended
        }
    }

    /// How long the host should wait before the next [`tick`](Self::tick),
    /// or `None` when no refresh is scheduled.
    pub fn next_refresh(&self) -> Option<std::time::Duration> {
        self.refresh.running.then(|| self.terms.refresh_interval())
    }

    /// Periodic refresh callback. Does nothing unless the refresh is running.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<u64> {
        if !self.refresh.running {
            return None;
        }
        self.sync(now);
        Some(self.displayed_seconds)
    }

    /// Applies a host lifecycle transition.
    pub fn on_visibility_change(&mut self, previous: Visibility, next: Visibility, now: DateTime<Utc>) {
        if previous.is_suspended() && next == Visibility::Active {
            self.sync(now);
            if !self.expired && self.refresh.start() {
                tracing::debug!(remaining = self.displayed_seconds, "countdown resumed");
            }
        }
        if next.is_suspended() && self.refresh.stop() {
            tracing::debug!(?next, "countdown suspended");
        }
        self.visibility = next;
    }

    /// Same as [`on_visibility_change`](Self::on_visibility_change) with the
    /// previous state taken from the session.
    pub fn set_visibility(&mut self, next: Visibility, now: DateTime<Utc>) {
        self.on_visibility_change(self.visibility, next, now);
    }

    /// Cancels any scheduled refresh. The session can still be read.
    pub fn close(&mut self) {
        if self.refresh.stop() {
            tracing::debug!("offer session closed");
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> OfferSnapshot {
        let remaining = self.remaining_seconds(now);
        OfferSnapshot {
            selected_amount: self.selected_amount,
            selected_tenure: self.selected_tenure,
            min_amount: self.terms.min_amount(),
            max_amount: self.terms.max_amount(),
            annual_rate_percent: self.terms.annual_rate_percent(),
            rows: self.derived_rows(),
            remaining_seconds: remaining,
            countdown: format_countdown(remaining),
            expired: self.expired || remaining == 0,
            expires_at: self.expiry,
        }
    }

    fn sync(&mut self, now: DateTime<Utc>) {
        self.displayed_seconds = self.remaining_seconds(now);
        if self.displayed_seconds == 0 && !self.expired {
            self.expired = true;
            self.refresh.stop();
            tracing::info!(expired_at = %self.expiry, "offer expired");
        }
    }
}

/// `H:MM:SS`, hours unpadded.
pub fn format_countdown(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{}:{:02}:{:02}", hours, minutes, secs)
}
