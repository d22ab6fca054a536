//! Program identity: the canonical program name and its invocable aliases.

/// The program a completion hook is installed for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramIdentity {
    /// Name used to invoke the program from the hook (first segment, unfiltered)
    pub primary: String,

    /// Every segment, filtered to `[A-Za-z0-9._-]`
    pub aliases: Vec<String>,
}

impl ProgramIdentity {
    /// Parse a program string such as `"git|g"`
    ///
    /// `primary` keeps the first segment as written (only trimmed) because it
    /// may be a path to the binary. The aliases become shell function and
    /// command names, so they are filtered.
    ///
    /// # Arguments
    /// * `programs` - Pipe-separated program names
    ///
    /// # Returns
    /// * `Self` - The identity
    pub fn parse(programs: &str) -> Self {
        let segments: Vec<&str> = programs.split('|').collect();
        let primary = segments.first().map(|s| s.trim()).unwrap_or_default().to_string();
        let aliases = segments.iter().map(|s| sanitize(s)).collect();

        Self { primary, aliases }
    }
}

/// Strip every character outside `[A-Za-z0-9._-]`
pub fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}
