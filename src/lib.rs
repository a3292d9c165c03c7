#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
#![allow(
    clippy::cast_possible_truncation, // Row and column indices stay within sheet limits
    clippy::cast_precision_loss,      // Spreadsheet serials and widths are small
    clippy::missing_errors_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. StoreError in store module
    clippy::must_use_candidate
)]

pub mod app;
pub mod domain;
pub mod fetcher;
pub mod merger;
pub mod presenter;
pub mod store;

// Re-export main types for easy access
pub use app::{App, Config};
pub use merger::{MergeOutcome, merge};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
