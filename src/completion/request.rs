//! Invocation parser
//!
//! Turns the raw argument vector the shell hands to the program into a
//! [`CompletionRequest`]. The vector excludes the program path itself
//! (`std::env::args().skip(1)`).

use std::ffi::OsStr;

use clap_complete::Shell;

/// Install hook for bash/zsh
pub const INSTALL_FLAG: &str = "--completion";
/// Install hook for fish
pub const INSTALL_FISH_FLAG: &str = "--completion-fish";
/// Generation marker, followed by `<fragment> <previous word> <line...>`
pub const COMPGEN_FLAG: &str = "--compgen";
/// Debug aliases in the generated hook
pub const DEBUG_FLAG: &str = "--debug";
/// Marks a zsh invocation; zsh counts the program name as word 1
pub const ZSH_FLAG: &str = "--compzsh";
/// Marks a bash invocation
pub const BASH_FLAG: &str = "--compbash";
/// Marks a fish invocation
pub const FISH_FLAG: &str = "--compfish";

/// What the invocation asks the engine to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Print the bash/zsh hook
    Install,
    /// Print the fish hook
    InstallFish,
    /// Produce candidates for the word being completed
    Generate,
    /// Not a completion invocation; run the program normally
    Run,
}

/// A parsed completion invocation
///
/// Built once from the argument vector and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Requested mode
    pub mode: Mode,

    /// 1-based index of the word being completed, `None` when missing or not numeric
    pub fragment: Option<i64>,

    /// Command line typed so far
    pub line: String,

    /// Last whitespace-separated word of `line`
    pub last_word: Option<String>,

    /// Shell that issued the request, when it announced itself
    pub shell: Option<Shell>,

    /// Whether `--debug` was given
    pub debug: bool,
}

impl CompletionRequest {
    /// Parse a request from the program arguments
    ///
    /// # Arguments
    /// * `args` - Program arguments, without the program path
    ///
    /// # Returns
    /// * `Self` - The parsed request; parsing never fails
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
        let position = |flag: &str| args.iter().position(|arg| arg == flag);

        let compgen = position(COMPGEN_FLAG);
        let shell = if position(ZSH_FLAG).is_some() {
            Some(Shell::Zsh)
        } else if position(FISH_FLAG).is_some() {
            Some(Shell::Fish)
        } else if position(BASH_FLAG).is_some() {
            Some(Shell::Bash)
        } else {
            None
        };

        let mode = if position(INSTALL_FLAG).is_some() {
            Mode::Install
        } else if position(INSTALL_FISH_FLAG).is_some() {
            Mode::InstallFish
        } else if compgen.is_some() {
            Mode::Generate
        } else {
            Mode::Run
        };

        let zsh_offset = i64::from(shell == Some(Shell::Zsh));
        let fragment = compgen
            .and_then(|index| args.get(index + 1))
            .and_then(|raw| parse_leading_int(raw))
            .map(|index| index - zsh_offset);

        let line = compgen
            .and_then(|index| args.get(index + 3..))
            .map(|rest| rest.join(" "))
            .unwrap_or_default();
        let last_word = line.split_whitespace().last().map(str::to_string);

        Self {
            mode,
            fragment,
            line,
            last_word,
            shell,
            debug: position(DEBUG_FLAG).is_some(),
        }
    }

    /// Parse a request from the current process arguments
    pub fn from_env() -> Self {
        Self::from_os_args(std::env::args_os().skip(1))
    }

    /// Parse a request from raw OS arguments
    ///
    /// The shell passes the typed line verbatim, which need not be valid
    /// UTF-8. Invalid sequences are replaced with U+FFFD.
    pub fn from_os_args<I>(args: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<OsStr>,
    {
        Self::from_args(
            args.into_iter()
                .map(|arg| arg.as_ref().to_string_lossy().into_owned()),
        )
    }

    /// Whether the line ends in whitespace, i.e. the last word is complete
    pub fn ends_with_space(&self) -> bool {
        ends_with_whitespace(&self.line)
    }
}

pub(crate) fn ends_with_whitespace(line: &str) -> bool {
    line.chars().last().is_some_and(char::is_whitespace)
}

/// Parse the integer prefix of a string
///
/// Accepts leading whitespace and an optional sign, then reads digits until
/// the first non-digit. `"3"`, `" 3"` and `"3rd"` all give 3; `""` and `"x"` give `None`.
fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits: &str = &rest[..rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len())];
    let value: i64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}
