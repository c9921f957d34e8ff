//! Constants used throughout gpghigh.
//!
//! Centralizes magic strings and sizes.

/// Size of one chunk when draining engine output.
pub const CHUNK_SIZE: usize = 10 * 1024;

/// Extension appended by default when encrypting a file.
pub const ENCRYPTED_EXTENSION: &str = ".gpg";

/// Extensions stripped when inferring a decryption destination.
///
/// Matched exactly and case-sensitively at the end of the file name.
pub const DECRYPT_EXTENSIONS: &[&str] = &[".gpg", ".pgp", ".asc"];

/// Extension of the transient output of a recipient change.
pub const TEMP_EXTENSION: &str = ".tmp";

/// Length of the random part of temp and backup names.
pub const SUFFIX_LEN: usize = 8;

/// Attempts to find a suffix whose temp and backup names are both free.
pub const SUFFIX_ATTEMPTS: usize = 16;

/// Backup extension used for recipient changes unless configured.
pub const DEFAULT_BACKUP_EXTENSION: &str = ".bak";

/// Default engine program.
pub const DEFAULT_PROGRAM: &str = "gpg";

/// Oldest gpg release whose machine interface we parse.
pub const DEFAULT_MIN_VERSION: &str = "2.2.0";

/// Config file name inside the per-user config directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Application directory name under the platform config directory.
pub const APP_DIR: &str = "gpghigh";

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV: &str = "GPGHIGH_CONFIG";

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "GPGHIGH_LOG";
