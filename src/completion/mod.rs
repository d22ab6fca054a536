//! Completion engine
//!
//! This module answers the shell's completion requests for a program:
//! - `request`: parse the shell invocation into a [`CompletionRequest`]
//! - `identity`: program name and aliases the hook is installed for
//! - `dispatcher`: event registry the handlers subscribe to
//! - `tree`: nested completion specifications resolved level by level
//! - `reply`: emission of immediate and deferred replies
//! - `template`: shorthand constructors
//!
//! # Example
//!
//! ```no_run
//! use tabhook::completion::{Completion, CompletionRequest, CompletionTree, Outcome};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut completion = Completion::new("git|g", CompletionRequest::from_env());
//!     completion.tree(
//!         CompletionTree::new()
//!             .subtree("clone", CompletionTree::new().leaf("origin", ["--depth"]))
//!             .leaf("status", ["--short"]),
//!     );
//!
//!     if completion.init().await == Outcome::Completed {
//!         std::process::exit(0);
//!     }
//!     // regular program body
//! }
//! ```

pub mod dispatcher;
pub mod identity;
pub mod reply;
pub mod request;
pub mod template;
pub mod tree;

#[cfg(test)]
mod tests;

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Config;
use crate::shell;

pub use dispatcher::Dispatcher;
pub use identity::ProgramIdentity;
pub use reply::{Answer, Reply, ReplySink, Settlement};
pub use request::{CompletionRequest, Mode};
pub use template::Callback;
pub use tree::{CompletionTree, TreeNode};

/// Event published first on every completion request
pub const COMPLETE_EVENT: &str = "complete";

/// Payload handed to every subscriber of one completion request
pub struct CompletionEvent {
    /// Last word on the line, if any
    pub before: Option<String>,

    /// 1-based index of the word being completed
    pub fragment: Option<i64>,

    /// Name of the positional fragment being completed, if one is declared
    pub fragment_name: Option<String>,

    /// Command line typed so far
    pub line: String,

    /// Where to send the answer
    pub reply: ReplySink,
}

/// Engine tuning
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Upper bound on waiting for deferred replies
    pub reply_timeout: Option<Duration>,

    /// Drop deferred replies when no handler was registered with `on_async`
    pub legacy_async_gate: bool,

    /// Directory used for debug aliases (current directory when unset)
    pub alias_dir: Option<PathBuf>,
}

impl EngineOptions {
    /// Derive options from the loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            reply_timeout: config.reply_timeout(),
            legacy_async_gate: config.completion.legacy_async_gate,
            alias_dir: None,
        }
    }
}

/// Result of [`Completion::init`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The invocation was a completion or install request and has been
    /// answered; the process should exit with status 0
    Completed,
    /// The invocation was a regular run; the main program was started
    Main,
}

/// Completion engine for one program invocation
pub struct Completion {
    identity: ProgramIdentity,
    fragments: Vec<String>,
    request: CompletionRequest,
    dispatcher: Dispatcher<CompletionEvent>,
    sink: ReplySink,
    options: EngineOptions,
    main_program: Option<Box<dyn FnOnce()>>,
}

impl Completion {
    /// Create an engine for `program`
    ///
    /// # Arguments
    /// * `program` - Program names, optionally with `|`-separated aliases
    /// * `request` - Parsed invocation
    ///
    /// # Returns
    /// * `Self` - Engine writing to standard output
    pub fn new(program: &str, request: CompletionRequest) -> Self {
        Self {
            identity: ProgramIdentity::parse(program),
            fragments: Vec::new(),
            request,
            dispatcher: Dispatcher::new(),
            sink: ReplySink::stdout(),
            options: EngineOptions::default(),
            main_program: None,
        }
    }

    /// Send replies and hook scripts to `output` instead of standard output
    pub fn with_output(mut self, output: impl Write + 'static) -> Self {
        self.sink = ReplySink::new(output);
        self
    }

    /// Replace the engine options
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Declare the positional fragment names, first word first
    pub fn set_fragments<I, S>(&mut self, fragments: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fragments = fragments.into_iter().map(Into::into).collect();
        self
    }

    /// Program identity
    pub fn identity(&self) -> &ProgramIdentity {
        &self.identity
    }

    /// Parsed invocation
    pub fn request(&self) -> &CompletionRequest {
        &self.request
    }

    /// Declared fragment names
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Subscribe to an event (`complete`, a fragment name, or `$N`)
    pub fn on<F>(&mut self, event: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&CompletionEvent) + 'static,
    {
        self.dispatcher.subscribe(event, handler);
        self
    }

    /// Subscribe a handler that answers with a deferred reply
    pub fn on_async<F>(&mut self, event: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&CompletionEvent) + 'static,
    {
        self.dispatcher.subscribe_async(event, handler);
        self
    }

    /// Subscribe to the `$index` event of a 1-based word position
    pub fn on_fragment<F>(&mut self, index: usize, handler: F) -> &mut Self
    where
        F: Fn(&CompletionEvent) + 'static,
    {
        self.on(format!("${index}"), handler)
    }

    /// Answer positional requests from a completion tree
    pub fn tree(&mut self, tree: CompletionTree) -> &mut Self {
        let depth = tree::attach(tree, &mut self.dispatcher);
        debug!(depth, "completion tree attached");
        self
    }

    /// Register the program body run for regular (non-completion) invocations
    pub fn next<F>(&mut self, main: F) -> &mut Self
    where
        F: FnOnce() + 'static,
    {
        self.main_program = Some(Box::new(main));
        self
    }

    /// Hook script for bash and zsh
    pub fn completion_script(&self) -> String {
        shell::bash_zsh_script(&self.identity, self.request.debug, &self.alias_dir())
    }

    /// Hook script for fish
    pub fn completion_script_fish(&self) -> String {
        shell::fish_script(&self.identity, self.request.debug, &self.alias_dir())
    }

    fn alias_dir(&self) -> PathBuf {
        self.options
            .alias_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Print the hook script if the invocation asks for one
    ///
    /// # Returns
    /// * `bool` - True if a script was printed and the invocation is answered
    pub fn check_install(&self) -> bool {
        let script = match self.request.mode {
            Mode::Install => self.completion_script(),
            Mode::InstallFish => self.completion_script_fish(),
            Mode::Generate | Mode::Run => return false,
        };

        if let Err(e) = self.sink.print(&script) {
            warn!(error = %e, "failed to write completion script");
        }
        true
    }

    /// Dispatch the completion request and wait for its reply
    ///
    /// Publishes `complete`, then the positional fragment name, then `$N`.
    /// Afterwards outstanding deferred replies are awaited, bounded by the
    /// configured timeout.
    ///
    /// # Returns
    /// * `Settlement` - Whether and how a reply was produced
    pub async fn generate(&self) -> Settlement {
        let fragment_name = self
            .request
            .fragment
            .and_then(|index| index.checked_sub(1))
            .and_then(|index| usize::try_from(index).ok())
            .and_then(|index| self.fragments.get(index))
            .cloned();

        let event = CompletionEvent {
            before: self.request.last_word.clone(),
            fragment: self.request.fragment,
            fragment_name,
            line: self.request.line.clone(),
            reply: self.sink.clone(),
        };
        debug!(
            fragment = ?event.fragment,
            name = ?event.fragment_name,
            line = %event.line,
            "generating completions"
        );

        self.dispatcher.publish(COMPLETE_EVENT, &event);
        if let Some(name) = &event.fragment_name {
            self.dispatcher.publish(name, &event);
        }
        if let Some(index) = event.fragment {
            self.dispatcher.publish(&format!("${index}"), &event);
        }

        if self.options.legacy_async_gate && self.dispatcher.async_subscriptions() == 0 {
            let dropped = self.sink.discard_pending();
            if dropped > 0 {
                warn!(
                    dropped,
                    "deferred replies discarded: no handler was registered with on_async"
                );
            }
            return if self.sink.is_emitted() {
                Settlement::Emitted
            } else if dropped > 0 {
                Settlement::Dropped
            } else {
                Settlement::Idle
            };
        }

        self.sink.settle(self.options.reply_timeout).await
    }

    /// Run the invocation
    ///
    /// Install requests print the hook, completion requests are dispatched,
    /// and anything else runs the body registered with [`Completion::next`].
    ///
    /// # Returns
    /// * `Outcome` - Whether the caller should exit or carry on
    pub async fn init(&mut self) -> Outcome {
        if self.check_install() {
            return Outcome::Completed;
        }

        match self.request.mode {
            Mode::Generate => {
                let settlement = self.generate().await;
                debug!(?settlement, "completion request answered");
                Outcome::Completed
            }
            Mode::Install | Mode::InstallFish | Mode::Run => {
                if let Some(main) = self.main_program.take() {
                    main();
                }
                Outcome::Main
            }
        }
    }
}
