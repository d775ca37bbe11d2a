//! Hotel Import Common Library
//!
//! Shared error handling and logging setup for the hotel import workspace.
//!
//! - **Error Handling**: [`ImportError`] and the [`Result`] alias
//! - **Logging**: tracing subscriber setup driven by `LOG_*` variables
//!
//! # Example
//!
//! ```no_run
//! use hotel_common::{ImportError, Result};
//!
//! fn check_source(path: &str) -> Result<()> {
//!     if !std::path::Path::new(path).exists() {
//!         return Err(ImportError::SourceNotFound(path.to_string()));
//!     }
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;

pub use error::{ImportError, Result};
