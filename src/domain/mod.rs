//! Domain layer for trendpull.
//!
//! Contains the canonical types shared across all modules:
//! - `Period`: a calendar month, first-of-month normalized
//! - `CaptureTime`: when a batch was pulled
//! - `TrendTable` / `Batch` / `Dataset`: fetched, stamped, and persisted rows

pub mod dataset;
pub mod period;

pub use dataset::{Batch, Dataset, ObservationRow, PullRecord, TrendTable};
pub use period::{CAPTURE_TIME_FORMAT, CaptureTime, Period, TimeParseError};
