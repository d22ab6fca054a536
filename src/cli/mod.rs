//! Command-line interface for tabhook
//!
//! This module handles the regular (non-completion) invocations of the binary:
//! - Command-line argument parsing using clap
//! - Configuration loading and validation
//! - Subcommands for inspecting the configuration and the completion tree
//! - Removing installed hooks from shell rc files
//!
//! Completion and install invocations never reach clap; their argument
//! layout is fixed by the shell hook and parsed by
//! [`crate::completion::CompletionRequest`].

pub mod completion;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::completion::ProgramIdentity;
use crate::config::{Config, LogLevel};
use crate::error::Result;
use crate::shell;

/// tabhook - dynamic shell completion for command-line programs
#[derive(Parser, Debug)]
#[command(
    name = "tabhook",
    version,
    about = "Dynamic tab-completion for bash, zsh and fish",
    long_about = "Answers shell completion requests from a completion tree.

Install the hook with `tabhook --completion >> ~/.bashrc` (bash/zsh) or
`tabhook --completion-fish >> ~/.config/fish/config.fish` (fish)."
)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Verbose mode (debug logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv", global = true)]
    pub very_verbose: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands for tabhook
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version,

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,
    },

    /// Show the completion tree
    Tree {
        /// Also print the tree depth
        #[arg(long)]
        depth: bool,
    },

    /// Remove installed completion hooks from a shell rc file
    Strip {
        /// Shell rc file to clean up
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Rewrite the file instead of printing the result
        #[arg(long)]
        in_place: bool,
    },
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Create a new CLI interface
    ///
    /// # Returns
    /// * `Result<Self>` - New CLI interface or error
    pub fn new() -> Result<Self> {
        let args = CliArgs::parse();
        let config = Self::load_config(&args)?;

        Ok(Self { args, config })
    }

    /// Load configuration from file and merge with arguments
    ///
    /// # Arguments
    /// * `args` - Command-line arguments
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load_from_file(args.config_file.as_deref())?;

        if let Err(e) = config.validate() {
            eprintln!("Warning: Configuration validation failed: {}", e);
            eprintln!("Using default configuration instead.");
            config = Config::default();
        }

        Self::apply_logging_args(&mut config, args);

        Ok(config)
    }

    /// Apply logging-related CLI arguments to configuration
    fn apply_logging_args(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else {
            config.logging.level
        };
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Handle subcommands
    ///
    /// # Returns
    /// * `Result<bool>` - True if a subcommand was handled, false if none was given
    pub fn handle_subcommand(&self) -> Result<bool> {
        match &self.args.command {
            Some(Commands::Version) => {
                self.show_version();
                Ok(true)
            }
            Some(Commands::Config { show, validate }) => {
                self.handle_config_command(*show, *validate)?;
                Ok(true)
            }
            Some(Commands::Tree { depth }) => {
                self.show_tree(*depth)?;
                Ok(true)
            }
            Some(Commands::Strip { file, in_place }) => {
                self.strip_hooks(file, *in_place)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Show version information
    fn show_version(&self) {
        println!("tabhook version {}", env!("CARGO_PKG_VERSION"));
    }

    /// Handle config subcommand
    ///
    /// # Arguments
    /// * `show` - Whether to show configuration
    /// * `validate` - Whether to validate configuration
    fn handle_config_command(&self, show: bool, validate: bool) -> Result<()> {
        if validate {
            self.validate_config_file()?;
        }

        if show || !validate {
            self.show_config()?;
        }

        Ok(())
    }

    /// Validate configuration file
    fn validate_config_file(&self) -> Result<()> {
        let path = self.get_config_path();
        println!("Validating configuration file: {}", path.display());

        if !path.exists() {
            println!("Configuration file does not exist, defaults apply");
            return Ok(());
        }

        match Config::from_file(&path) {
            Ok(config) => match config.validate().and_then(|_| completion::completion_tree(&config)) {
                Ok(_) => println!("Configuration is valid"),
                Err(e) => println!("Configuration validation failed: {}", e),
            },
            Err(e) => println!("Failed to load configuration: {}", e),
        }

        Ok(())
    }

    /// Show effective configuration
    fn show_config(&self) -> Result<()> {
        println!("# Configuration file: {}", self.get_config_path().display());
        println!("{}", self.config.to_toml()?);
        Ok(())
    }

    /// Print the completion tree outline
    fn show_tree(&self, with_depth: bool) -> Result<()> {
        let tree = completion::completion_tree(&self.config)?;
        print!("{}", tree);
        if with_depth {
            println!("depth: {}", tree.depth());
        }
        Ok(())
    }

    /// Remove this program's hook blocks from a shell rc file
    ///
    /// # Arguments
    /// * `file` - Shell rc file
    /// * `in_place` - Rewrite the file instead of printing the result
    fn strip_hooks(&self, file: &Path, in_place: bool) -> Result<()> {
        let identity = ProgramIdentity::parse(&self.config.completion.program);
        let text = std::fs::read_to_string(file)?;
        let (stripped, removed) = shell::strip_blocks(&text, &identity);

        if in_place {
            if removed > 0 {
                std::fs::write(file, stripped)?;
            }
            eprintln!("Removed {} completion block(s) from {}", removed, file.display());
        } else {
            print!("{}", stripped);
        }

        Ok(())
    }

    /// Get configuration file path (from args, environment or default)
    fn get_config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .or_else(|| std::env::var_os(crate::config::CONFIG_ENV).map(PathBuf::from))
            .unwrap_or_else(Config::default_config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_args_parsing() {
        let args = CliArgs::try_parse_from(vec!["tabhook"]).unwrap();
        assert!(args.command.is_none());
        assert!(args.config_file.is_none());
    }

    #[test]
    fn test_cli_args_with_flags() {
        let args = CliArgs::try_parse_from(vec!["tabhook", "-v", "tree", "--depth"]).unwrap();
        assert!(args.verbose);
        assert!(matches!(args.command, Some(Commands::Tree { depth: true })));
    }

    #[test]
    fn test_cli_args_strip() {
        let args =
            CliArgs::try_parse_from(vec!["tabhook", "strip", "/tmp/rc", "--in-place"]).unwrap();
        match args.command {
            Some(Commands::Strip { file, in_place }) => {
                assert_eq!(file, PathBuf::from("/tmp/rc"));
                assert!(in_place);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let args =
            CliArgs::try_parse_from(vec!["tabhook", "config", "--show", "-c", "/tmp/t.toml"])
                .unwrap();
        assert_eq!(args.config_file, Some(PathBuf::from("/tmp/t.toml")));
    }

    #[test]
    fn test_logging_args_override_config() {
        let args = CliArgs::try_parse_from(vec!["tabhook", "--vv"]).unwrap();
        let mut config = Config::default();
        CliInterface::apply_logging_args(&mut config, &args);
        assert_eq!(config.logging.level, LogLevel::Trace);

        let args = CliArgs::try_parse_from(vec!["tabhook"]).unwrap();
        let mut config = Config::default();
        CliInterface::apply_logging_args(&mut config, &args);
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_strip_hooks_in_place() {
        let dir = std::env::temp_dir().join(format!("tabhook-strip-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let rc = dir.join("bashrc");

        let identity = ProgramIdentity::parse("tabhook");
        let hook = shell::bash_zsh_script(&identity, false, Path::new("/tmp"));
        std::fs::write(&rc, format!("export A=1\n{hook}\n")).unwrap();

        let args = CliArgs::try_parse_from(vec!["tabhook"]).unwrap();
        let cli = CliInterface {
            args,
            config: Config::default(),
        };
        cli.strip_hooks(&rc, true).unwrap();

        assert_eq!(std::fs::read_to_string(&rc).unwrap(), "export A=1\n");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
