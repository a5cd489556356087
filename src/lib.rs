//! Promotional Content Admission Control
//!
//! Session-scoped gatekeeping for banner, native and interstitial
//! promotional content:
//! - Pure per-channel admission policies returning a `Decision`
//! - Exponential backoff and failure caps per channel
//! - Session frequency caps and scope deduplication
//! - Foreground/background awareness for banners
//! - Edge-triggered upsell signal
//! - Load latency diagnostics

pub mod admission;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-exports for convenience
pub use admission::{AdmissionEngine, Channel, Decision, Reason, ScopeKey};
pub use config::AdmissionConfig;
pub use error::{AdmissionError, ConfigError};
