//! Reply sink
//!
//! Handlers answer a completion request by handing a [`Reply`] (or a future
//! resolving to one) to the [`ReplySink`] carried in every event. The first
//! reply to be emitted is the answer of the invocation: it is written one
//! candidate per line and the process is expected to exit afterwards, so
//! anything replied later is discarded.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::Duration;

use futures::StreamExt;
use futures::future::{FutureExt, LocalBoxFuture};
use futures::stream::FuturesUnordered;
use tracing::{debug, warn};

/// Candidates produced by a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Ordered candidate words, one output line each
    Candidates(Vec<String>),
    /// Nothing usable was produced; emits no output at all
    Missing,
}

impl Reply {
    /// Build a reply from anything yielding words
    pub fn words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Reply::Candidates(words.into_iter().map(Into::into).collect())
    }

    /// Render the reply as it is written to the shell
    ///
    /// Embedded line breaks would split one candidate into several, so they
    /// are replaced with spaces.
    ///
    /// # Returns
    /// * `Option<String>` - Newline-terminated text, `None` for [`Reply::Missing`]
    pub fn render(&self) -> Option<String> {
        match self {
            Reply::Candidates(words) => {
                let mut text = words
                    .iter()
                    .map(|word| word.replace(['\n', '\r'], " "))
                    .collect::<Vec<_>>()
                    .join("\n");
                text.push('\n');
                Some(text)
            }
            Reply::Missing => None,
        }
    }
}

impl From<Vec<String>> for Reply {
    fn from(words: Vec<String>) -> Self {
        Reply::Candidates(words)
    }
}

impl From<Vec<&str>> for Reply {
    fn from(words: Vec<&str>) -> Self {
        Reply::words(words)
    }
}

impl From<Option<Vec<String>>> for Reply {
    fn from(words: Option<Vec<String>>) -> Self {
        words.map_or(Reply::Missing, Reply::Candidates)
    }
}

/// A reply that is either available now or will be later
pub enum Answer {
    /// Immediate reply
    Ready(Reply),
    /// Reply produced by a future
    Deferred(LocalBoxFuture<'static, Reply>),
}

impl Answer {
    /// Wrap a future as a deferred answer
    pub fn deferred<F, R>(future: F) -> Self
    where
        F: Future<Output = R> + 'static,
        R: Into<Reply> + 'static,
    {
        Answer::Deferred(future.map(Into::into).boxed_local())
    }
}

impl fmt::Debug for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Ready(reply) => f.debug_tuple("Ready").field(reply).finish(),
            Answer::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<Reply> for Answer {
    fn from(reply: Reply) -> Self {
        Answer::Ready(reply)
    }
}

impl From<Vec<String>> for Answer {
    fn from(words: Vec<String>) -> Self {
        Answer::Ready(words.into())
    }
}

impl From<Vec<&str>> for Answer {
    fn from(words: Vec<&str>) -> Self {
        Answer::Ready(words.into())
    }
}

impl From<Option<Vec<String>>> for Answer {
    fn from(words: Option<Vec<String>>) -> Self {
        Answer::Ready(words.into())
    }
}

/// How waiting for deferred replies ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// A reply was emitted
    Emitted,
    /// No reply was emitted and nothing is outstanding
    Idle,
    /// Deferred replies were still outstanding when the timeout elapsed
    TimedOut,
    /// Deferred replies were discarded without being awaited
    Dropped,
}

struct SinkState {
    output: Box<dyn Write>,
    emitted: bool,
    outstanding: usize,
    pending: Vec<LocalBoxFuture<'static, Reply>>,
}

/// Shared handle through which handlers reply
///
/// Cloning the sink yields another handle to the same output.
#[derive(Clone)]
pub struct ReplySink {
    state: Rc<RefCell<SinkState>>,
}

impl ReplySink {
    /// Create a sink writing to `output`
    pub fn new(output: impl Write + 'static) -> Self {
        Self {
            state: Rc::new(RefCell::new(SinkState {
                output: Box::new(output),
                emitted: false,
                outstanding: 0,
                pending: Vec::new(),
            })),
        }
    }

    /// Create a sink writing to standard output
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Hand over a handler's answer
    ///
    /// Immediate replies are emitted right away. Deferred replies are queued
    /// until [`ReplySink::settle`] drives them.
    pub fn reply(&self, answer: impl Into<Answer>) {
        match answer.into() {
            Answer::Ready(reply) => self.emit(reply),
            Answer::Deferred(future) => {
                let mut state = self.state.borrow_mut();
                state.outstanding += 1;
                state.pending.push(future);
            }
        }
    }

    /// Whether a reply has already been emitted
    pub fn is_emitted(&self) -> bool {
        self.state.borrow().emitted
    }

    /// Number of deferred replies that have not resolved yet
    pub fn outstanding(&self) -> usize {
        self.state.borrow().outstanding
    }

    /// Write free-form text followed by a newline (used for hook scripts)
    pub fn print(&self, text: &str) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        writeln!(state.output, "{text}")?;
        state.output.flush()
    }

    /// Wait for outstanding deferred replies
    ///
    /// Resolves as soon as one reply has been emitted, once nothing is left
    /// to wait for, or when `timeout` elapses.
    ///
    /// # Arguments
    /// * `timeout` - Upper bound for the wait, `None` to wait indefinitely
    ///
    /// # Returns
    /// * `Settlement` - How the wait ended
    pub async fn settle(&self, timeout: Option<Duration>) -> Settlement {
        if self.is_emitted() {
            return Settlement::Emitted;
        }

        match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.drive()).await {
                Ok(settlement) => settlement,
                Err(_) => {
                    warn!(
                        outstanding = self.outstanding(),
                        timeout = ?limit,
                        "timed out waiting for deferred completion replies"
                    );
                    Settlement::TimedOut
                }
            },
            None => self.drive().await,
        }
    }

    /// Discard queued deferred replies without awaiting them
    ///
    /// # Returns
    /// * `usize` - Number of replies discarded
    pub fn discard_pending(&self) -> usize {
        let mut state = self.state.borrow_mut();
        let discarded = state.pending.len();
        state.pending.clear();
        state.outstanding -= discarded;
        discarded
    }

    async fn drive(&self) -> Settlement {
        let mut inflight = FuturesUnordered::new();
        loop {
            if self.is_emitted() {
                return Settlement::Emitted;
            }

            inflight.extend(self.take_pending());
            match inflight.next().await {
                Some(reply) => {
                    self.state.borrow_mut().outstanding -= 1;
                    self.emit(reply);
                }
                None => return Settlement::Idle,
            }
        }
    }

    fn take_pending(&self) -> Vec<LocalBoxFuture<'static, Reply>> {
        std::mem::take(&mut self.state.borrow_mut().pending)
    }

    fn emit(&self, reply: Reply) {
        let mut state = self.state.borrow_mut();
        if state.emitted {
            debug!(?reply, "reply arrived after the invocation was answered; dropped");
            return;
        }
        state.emitted = true;

        let Some(text) = reply.render() else {
            debug!("reply is not a candidate list; nothing emitted");
            return;
        };

        let output = &mut state.output;
        if let Err(e) = output.write_all(text.as_bytes()).and_then(|_| output.flush()) {
            warn!(error = %e, "failed to write completion reply");
        }
    }
}

/// In-memory writer shared between a sink and a test
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

#[cfg(test)]
impl SharedBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

#[cfg(test)]
impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
