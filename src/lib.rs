//! Pre-approved loan offer: amount and tenure selection, installment
//! pricing, and a wall-clock anchored offer countdown.

pub mod app;
pub mod clock;
pub mod config;
pub mod pricing;
pub mod session;
pub mod ui;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{OfferTerms, RawTerms, TermsError};
pub use session::{OfferRow, OfferSession, OfferSnapshot, RefreshState, Visibility};
