//! Shell hook generation
//!
//! Pure templating from a [`ProgramIdentity`] to the script a user appends to
//! their shell rc file. Every alias gets its own block fenced by begin/end
//! marker lines, which [`strip_blocks`] uses to remove an installed hook.

use std::path::Path;

use tracing::warn;

use crate::completion::ProgramIdentity;

/// Generator name written into the begin markers
const GENERATOR: &str = "tabhook";

/// Opening marker line of an alias block
pub fn begin_marker(alias: &str) -> String {
    format!("### {alias} completion - begin. generated by {GENERATOR} ###")
}

/// Closing marker line of an alias block
pub fn end_marker(alias: &str) -> String {
    format!("### {alias} completion - end ###")
}

/// Hook for bash and zsh
///
/// The same block works in both shells: zsh takes the `compdef` branch,
/// bash the `complete` branch.
///
/// # Arguments
/// * `identity` - Program to install the hook for
/// * `debug` - Append alias helpers pointing at `alias_dir/<primary>`
/// * `alias_dir` - Directory holding the binary under development
///
/// # Returns
/// * `String` - Script text without a trailing newline
pub fn bash_zsh_script(identity: &ProgramIdentity, debug: bool, alias_dir: &Path) -> String {
    let program = &identity.primary;
    let mut blocks: Vec<String> = identity
        .aliases
        .iter()
        .map(|alias| {
            let function = format!("_{alias}_completion");
            format!(
                r#"{begin}
if type compdef &>/dev/null; then
  {function}() {{
    compadd -- `{program} --compzsh --compgen "${{CURRENT}}" "${{words[CURRENT-1]}}" "${{BUFFER}}"`
  }}
  compdef {function} {alias}
elif type complete &>/dev/null; then
  {function}() {{
    local cur prev nb_colon
    _get_comp_words_by_ref -n : cur prev
    nb_colon=$(grep -o ":" <<< "$COMP_LINE" | wc -l)

    COMPREPLY=( $(compgen -W '$({program} --compbash --compgen "$((COMP_CWORD - (nb_colon * 2)))" "$prev" "${{COMP_LINE}}")' -- "$cur") )

    __ltrim_colon_completions "$cur"
  }}
  complete -F {function} {alias}
fi
{end}"#,
                begin = begin_marker(alias),
                end = end_marker(alias),
            )
        })
        .collect();

    if debug {
        blocks.push(debug_aliases(identity, alias_dir));
    }
    blocks.join("\n")
}

/// Hook for fish
pub fn fish_script(identity: &ProgramIdentity, debug: bool, alias_dir: &Path) -> String {
    let program = &identity.primary;
    let mut blocks: Vec<String> = identity
        .aliases
        .iter()
        .map(|alias| {
            let function = format!("_{alias}_completion");
            format!(
                "{begin}
function {function}
  {program} --compfish --compgen (count (commandline -poc)) (commandline -pt) (commandline -pb)
end
complete -f -c {alias} -a '({function})'
{end}",
                begin = begin_marker(alias),
                end = end_marker(alias),
            )
        })
        .collect();

    if debug {
        blocks.push(debug_aliases(identity, alias_dir));
    }
    blocks.join("\n")
}

/// Shell functions that alias every program name to a local build and back
pub fn debug_aliases(identity: &ProgramIdentity, alias_dir: &Path) -> String {
    let program = &identity.primary;
    let full_path = alias_dir.join(program);
    let aliases = identity
        .aliases
        .iter()
        .map(|alias| format!("  alias {alias}={}", full_path.display()))
        .collect::<Vec<_>>()
        .join("\n");
    let unaliases = identity
        .aliases
        .iter()
        .map(|alias| format!("  unalias {alias}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "### test method ###
{GENERATOR}-debug-{program}() {{
{aliases}
}}
{GENERATOR}-nodebug-{program}() {{
{unaliases}
}}
### tests ###"
    )
}

/// Remove every installed block of `identity` from shell rc text
///
/// Lines from a begin marker up to and including the matching end marker
/// are dropped. A begin marker without a matching end marker is left in
/// place together with everything after it.
///
/// # Returns
/// * `(String, usize)` - Remaining text and number of blocks removed
pub fn strip_blocks(text: &str, identity: &ProgramIdentity) -> (String, usize) {
    let begins: Vec<String> = identity
        .aliases
        .iter()
        .map(|alias| format!("### {alias} completion - begin"))
        .collect();

    let mut kept = Vec::new();
    // End marker of the block being skipped, with the lines held back so far
    let mut open_block: Option<(String, Vec<&str>)> = None;
    let mut removed = 0;

    for line in text.lines() {
        if let Some((end, held)) = &mut open_block {
            held.push(line);
            if line.trim_end() == end.as_str() {
                open_block = None;
                removed += 1;
            }
            continue;
        }

        let opened = identity
            .aliases
            .iter()
            .zip(&begins)
            .find(|(_, begin)| line.starts_with(begin.as_str()));
        match opened {
            Some((alias, _)) => open_block = Some((end_marker(alias), vec![line])),
            None => kept.push(line),
        }
    }

    if let Some((end, held)) = open_block {
        warn!(marker = %end, "unterminated completion block left untouched");
        kept.extend(held);
    }

    let mut stripped = kept.join("\n");
    if text.ends_with('\n') && !stripped.is_empty() {
        stripped.push('\n');
    }
    (stripped, removed)
}
