//! Error types.
//!
//! Errors are grouped by category. Every category that can occur inside a
//! public operation records the [`Operation`] it came from, and engine and
//! I/O failures also record the phase, so a message reads like
//! `ModifyRecipients - rename backup failed: ...`.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Public operations, used to label errors and log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    EncryptFile,
    DecryptFile,
    ModifyRecipients,
    SignBytes,
    VerifyBytes,
    KeyList,
    IdentifyFile,
    EngineInfo,
}

const OPERATION_NAMES: [&str; 8] = [
    "EncryptFile",
    "DecryptFile",
    "ModifyRecipients",
    "SignBytes",
    "VerifyBytes",
    "KeyList",
    "IdentifyFile",
    "EngineInfo",
];

impl Operation {
    /// Stable display name.
    pub fn name(self) -> &'static str {
        OPERATION_NAMES[self as usize]
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Engine(#[from] EngineFailure),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The engine error underneath, if this is an engine failure.
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self {
            Error::Engine(failure) => Some(&failure.source),
            _ => None,
        }
    }
}

/// Bad arguments or an unusable source, detected before the engine runs.
#[derive(Error, Debug)]
pub enum PreconditionError {
    #[error("{op} - invalid operation: {flags:#06x}")]
    InvalidOperation { op: Operation, flags: u32 },

    #[error("{op} - file does not exist: {}", path.display())]
    SourceNotFound {
        op: Operation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{op} - file is a directory: {}", path.display())]
    SourceIsDirectory { op: Operation, path: PathBuf },

    #[error(
        "{op} - no destination filename given, and no `.gpg`, `.pgp` or `.asc` extension found: {}",
        path.display()
    )]
    UnknownExtension { op: Operation, path: PathBuf },

    #[error("{op} - no recipients given")]
    NoRecipients { op: Operation },

    #[error("{op} - empty key pattern")]
    EmptyPattern { op: Operation },
}

/// A key pattern did not resolve.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("{op} - no key found for '{pattern}'")]
    NoKeys { op: Operation, pattern: String },

    #[error("{op} - recipient lookup failed for '{recipient}': {reason}")]
    Recipient {
        op: Operation,
        recipient: String,
        reason: String,
    },
}

/// Errors reported by an engine implementation.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine initialization failed: {0}")]
    Init(String),

    #[error("engine program not found: {program}")]
    NotFound { program: String },

    #[error("engine version {found} is older than required {required}")]
    Version { required: String, found: String },

    /// The input carried no OpenPGP data. Decryption downgrades this to a
    /// warning.
    #[error("No data")]
    NoData,

    #[error("engine returned no data")]
    EmptyResult,

    #[error("{call}: {reason}")]
    Failed { call: &'static str, reason: String },

    #[error("unparsable engine output: {0}")]
    Parse(String),

    #[error("engine i/o: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Attach the operation and phase this engine error occurred in.
    pub fn during(self, op: Operation, phase: &'static str) -> EngineFailure {
        EngineFailure {
            op,
            phase,
            source: self,
        }
    }
}

/// An engine error annotated with where it happened.
#[derive(Error, Debug)]
#[error("{op} - {phase} failed: {source}")]
pub struct EngineFailure {
    pub op: Operation,
    pub phase: &'static str,
    #[source]
    pub source: EngineError,
}

/// A filesystem operation failed.
#[derive(Error, Debug)]
#[error("{op} - {phase} failed for {}: {source}", path.display())]
pub struct IoError {
    pub op: Operation,
    pub phase: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Extension for labelling `std::io::Result` values.
pub trait IoContext<T> {
    fn io_context(self, op: Operation, phase: &'static str, path: impl Into<PathBuf>)
        -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context(
        self,
        op: Operation,
        phase: &'static str,
        path: impl Into<PathBuf>,
    ) -> Result<T> {
        self.map_err(|source| {
            IoError {
                op,
                phase,
                path: path.into(),
                source,
            }
            .into()
        })
    }
}

/// The filesystem is not in the state the operation needs.
#[derive(Error, Debug)]
pub enum ConflictError {
    #[error("{op} - destination file exists: {}", path.display())]
    DestinationExists { op: Operation, path: PathBuf },

    #[error("{op} - no free temporary name next to {} after {attempts} attempts", path.display())]
    SuffixExhausted {
        op: Operation,
        path: PathBuf,
        attempts: usize,
    },
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
