//! Offer parameters.
//!
//! The terms are fixed for the lifetime of a session. They default to the
//! pre-approved offer the screen was built for and can be overridden from a
//! TOML file at startup; either way they are validated once, and the
//! periodic rate is derived once, when `OfferTerms` is constructed.

use std::path::Path;

use chrono::Duration;
use serde::Deserialize;
use thiserror::Error;

use crate::pricing;

pub const DEFAULT_MIN_AMOUNT: u64 = 10_000;
pub const DEFAULT_MAX_AMOUNT: u64 = 50_000;
pub const DEFAULT_AMOUNT: u64 = 20_000;
pub const DEFAULT_TENURES: [u32; 3] = [3, 6, 9];
pub const DEFAULT_ANNUAL_RATE: f64 = 29.95;
pub const DEFAULT_OFFER_WINDOW_SECS: i64 = 3600;
pub const DEFAULT_REFRESH_MS: u64 = 500;
/// Longest accepted offer window: one year.
pub const MAX_OFFER_WINDOW_SECS: i64 = 365 * 24 * 3600;

#[derive(Debug, Error, PartialEq)]
pub enum TermsError {
    #[error("minimum amount {min} exceeds maximum amount {max}")]
    InvertedBounds { min: u64, max: u64 },
    #[error("default amount {amount} is outside [{min}, {max}]")]
    DefaultOutOfBounds { amount: u64, min: u64, max: u64 },
    #[error("at least one tenure option is required")]
    NoTenures,
    #[error("tenure options must be ascending, distinct and non-zero: {0:?}")]
    BadTenures(Vec<u32>),
    #[error("annual rate must be a finite, non-negative percentage, got {0}")]
    BadRate(f64),
    #[error("amount step must be at least 1")]
    ZeroStep,
    #[error("offer window must be positive, got {0}s")]
    BadWindow(i64),
    #[error("refresh interval must be positive")]
    ZeroRefresh,
    #[error("failed to read terms file: {0}")]
    Io(String),
    #[error("failed to parse terms file: {0}")]
    Parse(String),
}

/// On-disk shape of the terms. Every field is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawTerms {
    pub min_amount: u64,
    pub max_amount: u64,
    pub default_amount: u64,
    pub tenure_options: Vec<u32>,
    pub annual_rate_percent: f64,
    pub amount_step: u64,
    pub offer_window_secs: i64,
    pub refresh_interval_ms: u64,
}

impl Default for RawTerms {
    fn default() -> Self {
        Self {
            min_amount: DEFAULT_MIN_AMOUNT,
            max_amount: DEFAULT_MAX_AMOUNT,
            default_amount: DEFAULT_AMOUNT,
            tenure_options: DEFAULT_TENURES.to_vec(),
            annual_rate_percent: DEFAULT_ANNUAL_RATE,
            amount_step: 1,
            offer_window_secs: DEFAULT_OFFER_WINDOW_SECS,
            refresh_interval_ms: DEFAULT_REFRESH_MS,
        }
    }
}

/// Validated loan offer parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferTerms {
    min_amount: u64,
    max_amount: u64,
    default_amount: u64,
    tenure_options: Vec<u32>,
    annual_rate_percent: f64,
    periodic_rate: f64,
    amount_step: u64,
    offer_window: Duration,
    refresh_interval: std::time::Duration,
}

impl Default for OfferTerms {
    fn default() -> Self {
        Self {
            min_amount: DEFAULT_MIN_AMOUNT,
            max_amount: DEFAULT_MAX_AMOUNT,
            default_amount: DEFAULT_AMOUNT,
            tenure_options: DEFAULT_TENURES.to_vec(),
            annual_rate_percent: DEFAULT_ANNUAL_RATE,
            periodic_rate: pricing::monthly_rate(DEFAULT_ANNUAL_RATE),
            amount_step: 1,
            offer_window: Duration::seconds(DEFAULT_OFFER_WINDOW_SECS),
            refresh_interval: std::time::Duration::from_millis(DEFAULT_REFRESH_MS),
        }
    }
}

impl OfferTerms {
    pub fn from_raw(raw: RawTerms) -> Result<Self, TermsError> {
        if raw.min_amount > raw.max_amount {
            return Err(TermsError::InvertedBounds {
                min: raw.min_amount,
                max: raw.max_amount,
            });
        }
        if raw.default_amount < raw.min_amount || raw.default_amount > raw.max_amount {
            return Err(TermsError::DefaultOutOfBounds {
                amount: raw.default_amount,
                min: raw.min_amount,
                max: raw.max_amount,
            });
        }
        if raw.tenure_options.is_empty() {
            return Err(TermsError::NoTenures);
        }
        let ascending = raw.tenure_options.windows(2).all(|w| w[0] < w[1]);
        if !ascending || raw.tenure_options[0] == 0 {
            return Err(TermsError::BadTenures(raw.tenure_options));
        }
        if !raw.annual_rate_percent.is_finite() || raw.annual_rate_percent < 0.0 {
            return Err(TermsError::BadRate(raw.annual_rate_percent));
        }
        if raw.amount_step == 0 {
            return Err(TermsError::ZeroStep);
        }
        let offer_window = Some(raw.offer_window_secs)
            .filter(|secs| (1..=MAX_OFFER_WINDOW_SECS).contains(secs))
            .and_then(Duration::try_seconds)
            .ok_or(TermsError::BadWindow(raw.offer_window_secs))?;
        if raw.refresh_interval_ms == 0 {
            return Err(TermsError::ZeroRefresh);
        }

        Ok(Self {
            min_amount: raw.min_amount,
            max_amount: raw.max_amount,
            default_amount: raw.default_amount,
            periodic_rate: pricing::monthly_rate(raw.annual_rate_percent),
            annual_rate_percent: raw.annual_rate_percent,
            tenure_options: raw.tenure_options,
            amount_step: raw.amount_step,
            offer_window,
            refresh_interval: std::time::Duration::from_millis(raw.refresh_interval_ms),
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, TermsError> {
        let raw: RawTerms = toml::from_str(text).map_err(|e| TermsError::Parse(e.to_string()))?;
        Self::from_raw(raw)
    }

    pub fn load(path: &Path) -> Result<Self, TermsError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| TermsError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn min_amount(&self) -> u64 {
        self.min_amount
    }

    pub fn max_amount(&self) -> u64 {
        self.max_amount
    }

    pub fn default_amount(&self) -> u64 {
        self.default_amount
    }

    /// Ascending, never empty.
    pub fn tenure_options(&self) -> &[u32] {
        &self.tenure_options
    }

    pub fn default_tenure(&self) -> u32 {
        self.tenure_options[0]
    }

    pub fn annual_rate_percent(&self) -> f64 {
        self.annual_rate_percent
    }

    pub fn periodic_rate(&self) -> f64 {
        self.periodic_rate
    }

    pub fn amount_step(&self) -> u64 {
        self.amount_step
    }

    pub fn offer_window(&self) -> Duration {
        self.offer_window
    }

    pub fn refresh_interval(&self) -> std::time::Duration {
        self.refresh_interval
    }
}
