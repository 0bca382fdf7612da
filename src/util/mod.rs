//! Utility functions and helpers
//!
//! ## Modules
//!
//! - [`retry`] - Retry logic for resilient API calls
//! - [`util`] - Phase timing helpers and small string utilities

pub mod retry;
pub mod util;
