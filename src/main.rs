//! tabhook - dynamic shell completion
//!
//! The binary is invoked in three ways:
//!
//! ```bash
//! # Print the hook for bash/zsh or fish
//! tabhook --completion >> ~/.bashrc
//! tabhook --completion-fish >> ~/.config/fish/config.fish
//!
//! # Called by the installed hook while the user presses TAB
//! tabhook --compbash --compgen 2 config "tabhook config "
//!
//! # Regular use
//! tabhook tree --depth
//! ```

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tabhook::cli::{self, CliInterface};
use tabhook::completion::{Completion, CompletionRequest, EngineOptions, Mode, Outcome};
use tabhook::config::{Config, LoggingConfig};
use tabhook::error::Result;
use tracing::level_filters::LevelFilter;
use tracing::{Level, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding `tracing` filter directives
const LOG_ENV: &str = "TABHOOK_LOG";

/// Application entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse the invocation
/// 2. Regular invocations go to the clap interface
/// 3. Completion and install invocations are answered by the engine
async fn run() -> Result<()> {
    let request = CompletionRequest::from_env();

    if request.mode == Mode::Run {
        return run_cli();
    }

    // The shell is waiting on stdout: a broken config must not break completion
    let (config, load_error) = Config::load_or_default(None);
    initialize_logging(&config.logging, config.logging.level.to_tracing_level());
    if let Some(e) = load_error {
        warn!(error = %e, "unusable configuration, using defaults");
    }

    let mut completion = Completion::new(&config.completion.program, request)
        .with_options(EngineOptions::from_config(&config));

    match cli::completion::completion_tree(&config) {
        Ok(tree) => {
            completion.tree(tree);
        }
        Err(e) => warn!(error = %e, "invalid completion tree, no candidates will be offered"),
    }

    match completion.init().await {
        Outcome::Completed => std::process::exit(0),
        Outcome::Main => Ok(()),
    }
}

/// Run the regular command-line interface
fn run_cli() -> Result<()> {
    let cli = CliInterface::new()?;
    initialize_logging(
        &cli.config().logging,
        cli.config().logging.level.to_tracing_level(),
    );

    if !cli.handle_subcommand()? {
        println!(
            "Nothing to do. Install the hook with `tabhook --completion` or see `tabhook --help`."
        );
    }
    Ok(())
}

/// Subscriber type shared by every logging destination
type BoxedSubscriber = Box<dyn tracing::Subscriber + Send + Sync>;

/// Initialize logging
///
/// Logs go to stderr, or to `logging.file_path` when set; stdout carries
/// the completion protocol. `TABHOOK_LOG` overrides the configured level.
///
/// # Arguments
/// * `logging` - Logging configuration
/// * `level` - Default maximum level
fn initialize_logging(logging: &LoggingConfig, level: Level) {
    let (subscriber, open_error) = build_subscriber(logging, level);
    subscriber.init();

    if let Some((path, e)) = open_error {
        warn!(path = %path.display(), error = %e, "cannot open log file, logging to stderr");
    }
}

/// Build the log subscriber
///
/// # Returns
/// * `(BoxedSubscriber, Option<(PathBuf, io::Error)>)` - The subscriber, and
///   the log file that could not be opened if stderr was substituted
fn build_subscriber(
    logging: &LoggingConfig,
    level: Level,
) -> (BoxedSubscriber, Option<(PathBuf, io::Error)>) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    let (writer, to_file, open_error) = match &logging.file_path {
        Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => (BoxMakeWriter::new(Mutex::new(file)), true, None),
            Err(e) => (BoxMakeWriter::new(io::stderr), false, Some((path.clone(), e))),
        },
        None => (BoxMakeWriter::new(io::stderr), false, None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(writer)
        .with_ansi(!to_file);

    let subscriber: BoxedSubscriber = if logging.timestamps {
        Box::new(builder.finish())
    } else {
        Box::new(builder.without_time().finish())
    };
    (subscriber, open_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tabhook-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_log_file_without_timestamps() {
        let dir = log_dir("log");
        let path = dir.join("tabhook.log");
        let logging = LoggingConfig {
            file_path: Some(path.clone()),
            timestamps: false,
            ..LoggingConfig::default()
        };

        let (subscriber, open_error) = build_subscriber(&logging, Level::WARN);
        assert!(open_error.is_none());
        tracing::subscriber::with_default(subscriber, || warn!("reply dropped"));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.trim_start().starts_with("WARN"));
        assert!(contents.contains("reply dropped"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unopenable_log_file_falls_back_to_stderr() {
        let dir = log_dir("nolog");
        let logging = LoggingConfig {
            file_path: Some(dir.join("missing").join("tabhook.log")),
            timestamps: false,
            ..LoggingConfig::default()
        };

        let (_subscriber, open_error) = build_subscriber(&logging, Level::WARN);
        let (path, _) = open_error.unwrap();
        assert!(path.ends_with("missing/tabhook.log"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
