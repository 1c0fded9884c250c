//! Configuration error types.

use std::path::PathBuf;

/// Errors that can occur when loading, saving, or parsing `config.ron`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("failed to read config: {0}")]
    ReadError(#[source] std::io::Error),

    /// Failed to write the config file to disk.
    #[error("failed to write config: {0}")]
    WriteError(#[source] std::io::Error),

    /// Failed to parse RON content.
    #[error("failed to parse config: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    /// Failed to serialize config to RON.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] ron::Error),
}

/// Errors produced by the planet preset codec.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The preset file could not be opened, read or written.
    #[error("preset I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The preset file was readable but its contents do not decode.
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Malformed preset contents. Positions are 1-based token indices for the
/// positional format and 1-based line numbers for the keyed format.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormatError {
    /// Fewer values than the schema requires.
    #[error("preset truncated: expected {expected} values, found {found}")]
    Truncated { expected: usize, found: usize },

    /// A token that should be a number is not one.
    #[error("field `{field}` at {position}: `{token}` is not a valid number")]
    InvalidNumber {
        field: &'static str,
        token: String,
        position: usize,
    },

    /// A boolean field holds something other than `0` or `1`.
    #[error("field `{field}` at {position}: `{token}` is not a 0/1 flag")]
    InvalidFlag {
        field: &'static str,
        token: String,
        position: usize,
    },

    /// The algorithm index is outside the known set.
    #[error("noise algorithm index {index} at {position} is out of range")]
    InvalidAlgorithm { index: u32, position: usize },

    /// A keyed line names a field the schema does not know.
    #[error("unknown key `{key}` on line {line}")]
    UnknownKey { key: String, line: usize },

    /// A keyed file sets the same field twice.
    #[error("duplicate key `{key}` on line {line} (first set on line {first})")]
    DuplicateKey {
        key: &'static str,
        line: usize,
        first: usize,
    },

    /// A keyed file does not mention a required field.
    #[error("missing key `{key}`")]
    MissingKey { key: &'static str },

    /// A keyed line has the wrong number of values for its field.
    #[error("key `{key}` on line {line}: expected {expected} values, found {found}")]
    Arity {
        key: &'static str,
        line: usize,
        expected: usize,
        found: usize,
    },
}
