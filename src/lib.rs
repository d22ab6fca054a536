//! tabhook Library
//!
//! Dynamic tab-completion for command-line programs. A program built with
//! this library answers the completion requests of bash, zsh and fish, and
//! prints the shell hook that wires it into the shell.
//!
//! # Modules
//!
//! - `cli`: Command-line interface of the `tabhook` binary
//! - `completion`: Completion engine (request parsing, dispatch, trees, replies)
//! - `config`: Configuration management
//! - `error`: Error types and handling
//! - `shell`: Shell hook generation
//!
//! # Example
//!
//! ```no_run
//! use tabhook::completion::{Completion, CompletionEvent, CompletionRequest, Outcome};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut completion =
//!         Completion::from_template("deploy <target>", CompletionRequest::from_env());
//!     completion.on("target", |event: &CompletionEvent| {
//!         event.reply.reply(vec!["staging", "production"]);
//!     });
//!
//!     if completion.init().await == Outcome::Completed {
//!         return;
//!     }
//!     println!("deploying...");
//! }
//! ```

pub mod cli;
pub mod completion;
pub mod config;
pub mod error;
pub mod shell;

// Re-export commonly used types
pub use completion::{
    Completion, CompletionEvent, CompletionRequest, CompletionTree, Outcome, ReplySink,
};
pub use config::Config;
pub use error::{Result, TabhookError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
///
/// # Returns
/// * `&str` - Version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
