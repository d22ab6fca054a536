//! Error handling module for tabhook.
//!
//! Completion itself never surfaces errors to the shell: an unresolvable
//! request simply produces no candidates. The types here cover the layers
//! around the engine:
//! - Configuration loading and validation
//! - Completion tree construction from TOML/JSON documents
//! - File I/O performed by the command-line interface
//!
//! # Example
//!
//! ```rust,no_run
//! use tabhook::error::{Result, TabhookError};
//!
//! fn load() -> Result<()> {
//!     let text = std::fs::read_to_string("tree.toml")?;
//!     let _table: toml::Table = toml::from_str(&text)?;
//!     Ok(())
//! }
//! ```

pub mod kinds;

// Re-export commonly used types
pub use kinds::{ConfigError, Result, TabhookError, TreeError};
