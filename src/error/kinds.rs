use std::{fmt, io};

/// Crate-wide `Result` type using [`TabhookError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, TabhookError>;

/// Top-level error type for tabhook operations.
///
/// The completion engine itself never fails: everything it cannot resolve
/// degrades to an empty reply. This type covers the ambient layers around it
/// (configuration, tree loading, CLI file handling).
#[derive(Debug)]
pub enum TabhookError {
    /// Configuration errors.
    Config(ConfigError),

    /// Completion tree construction errors.
    Tree(TreeError),

    /// I/O errors.
    Io(io::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Missing required field.
    MissingField(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/// Errors raised while converting TOML or JSON documents into a completion tree.
#[derive(Debug)]
pub enum TreeError {
    /// A leaf array contained something other than a string.
    InvalidLeaf { key: String, found: String },

    /// A node was neither a table, an array nor a producer.
    InvalidNode { key: String, found: String },

    /// The document root was not a table/object.
    InvalidRoot(String),
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for TabhookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabhookError::Config(e) => write!(f, "Configuration error: {e}"),
            TabhookError::Tree(e) => write!(f, "Completion tree error: {e}"),
            TabhookError::Io(e) => write!(f, "I/O error: {e}"),
            TabhookError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::MissingField(field) => write!(f, "Missing required field: {field}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::InvalidLeaf { key, found } => {
                write!(f, "Leaf '{key}' must only contain strings, found {found}")
            }
            TreeError::InvalidNode { key, found } => {
                write!(f, "Node '{key}' must be a table or an array, found {found}")
            }
            TreeError::InvalidRoot(found) => {
                write!(f, "Tree root must be a table, found {found}")
            }
        }
    }
}

impl std::error::Error for TabhookError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TabhookError::Config(e) => Some(e),
            TabhookError::Tree(e) => Some(e),
            TabhookError::Io(e) => Some(e),
            TabhookError::Generic(_) => None,
        }
    }
}
impl std::error::Error for ConfigError {}
impl std::error::Error for TreeError {}

/* ========================= Conversions to TabhookError ========================= */

impl From<io::Error> for TabhookError {
    fn from(err: io::Error) -> Self {
        TabhookError::Io(err)
    }
}

impl From<ConfigError> for TabhookError {
    fn from(err: ConfigError) -> Self {
        TabhookError::Config(err)
    }
}

impl From<TreeError> for TabhookError {
    fn from(err: TreeError) -> Self {
        TabhookError::Tree(err)
    }
}

impl From<toml::de::Error> for TabhookError {
    fn from(err: toml::de::Error) -> Self {
        TabhookError::Config(ConfigError::InvalidFormat(err.to_string()))
    }
}

impl From<toml::ser::Error> for TabhookError {
    fn from(err: toml::ser::Error) -> Self {
        TabhookError::Generic(format!("Failed to serialize configuration: {err}"))
    }
}

impl From<serde_json::Error> for TabhookError {
    fn from(err: serde_json::Error) -> Self {
        TabhookError::Tree(TreeError::InvalidRoot(err.to_string()))
    }
}

impl From<String> for TabhookError {
    fn from(msg: String) -> Self {
        TabhookError::Generic(msg)
    }
}

impl From<&str> for TabhookError {
    fn from(msg: &str) -> Self {
        TabhookError::Generic(msg.to_owned())
    }
}
